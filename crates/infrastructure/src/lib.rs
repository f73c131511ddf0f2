//! Infrastructure adapters for record access ports.

#![forbid(unsafe_code)]

mod in_memory_access_directory;
mod in_memory_record_repository;
mod in_memory_secret_link_repository;
mod json_file_record_repository;

pub use in_memory_access_directory::InMemoryAccessDirectory;
pub use in_memory_record_repository::InMemoryRecordRepository;
pub use in_memory_secret_link_repository::InMemorySecretLinkRepository;
pub use json_file_record_repository::JsonFileRecordRepository;
