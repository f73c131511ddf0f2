//! Application services and ports for record access.

#![forbid(unsafe_code)]

mod access_ports;
mod record_access_service;

pub use access_ports::{RecordRepository, RoleRepository, SecretLinkRepository, UserRepository};
pub use record_access_service::{
    CreateSecretLinkInput, CreatedSecretLink, RecordAccessService, hash_link_token,
};
