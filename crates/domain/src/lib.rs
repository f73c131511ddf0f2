//! Record access domain: visibility, embargo, owners, grants and secret links.

#![forbid(unsafe_code)]

mod access_error;
mod config;
mod embargo;
mod grant;
mod link;
mod owner;
mod parent_access;
mod protection;
mod record;
mod record_access;
mod resolvable;
mod values;

pub use access_error::{AccessError, AccessErrorKind};
pub use config::{AccessConfig, DEFAULT_PERMISSION_LEVELS};
pub use embargo::{Embargo, today};
pub use grant::{Grant, GrantSubject, Grants, Role, SubjectEntity, SubjectKind, SystemRole};
pub use link::{Link, LinkRef, Links, SecretLink};
pub use owner::{Owner, OwnerKind, OwnerRef, Owners, SYSTEM_USER_ID, UserAccount};
pub use parent_access::ParentRecordAccess;
pub use protection::{Protection, Visibility};
pub use record::{ParentRecord, Record};
pub use record_access::{AccessScope, AccessStatus, RecordAccess};
pub use resolvable::Resolvable;
