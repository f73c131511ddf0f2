use std::sync::Arc;

use chrono::{DateTime, Utc};
use rdm_access_core::{AppError, AppResult, Identity};
use rdm_access_domain::{AccessConfig, ParentRecord, Record, SecretLink};

use crate::{RecordRepository, RoleRepository, SecretLinkRepository, UserRepository};

mod decisions;
mod embargo;
mod resolution;
mod secret_links;
mod token_crypto;
mod validation;


pub use token_crypto::hash_link_token;

/// Input payload for secret link creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSecretLinkInput {
    /// Permission level carried by the link.
    pub permission: String,
    /// Optional human-readable description.
    pub description: Option<String>,
    /// Optional expiry timestamp.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Newly created secret link together with its one-time raw token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedSecretLink {
    /// Persisted link row.
    pub link: SecretLink,
    /// Raw token handed to the creator. Only its hash is stored.
    pub token: String,
}

/// Application service for record and parent access handling.
#[derive(Clone)]
pub struct RecordAccessService {
    users: Arc<dyn UserRepository>,
    roles: Arc<dyn RoleRepository>,
    links: Arc<dyn SecretLinkRepository>,
    records: Arc<dyn RecordRepository>,
    config: AccessConfig,
}

impl RecordAccessService {
    /// Creates a new record access service.
    #[must_use]
    pub fn new(
        users: Arc<dyn UserRepository>,
        roles: Arc<dyn RoleRepository>,
        links: Arc<dyn SecretLinkRepository>,
        records: Arc<dyn RecordRepository>,
        config: AccessConfig,
    ) -> Self {
        Self {
            users,
            roles,
            links,
            records,
            config,
        }
    }

    /// Returns the access configuration.
    #[must_use]
    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    /// Loads a record version and its parent.
    pub async fn load_record(&self, record_id: &str) -> AppResult<(Record, ParentRecord)> {
        let record = self
            .records
            .find_record(record_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("record '{record_id}'")))?;
        let parent = self
            .records
            .find_parent(record.parent_id())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("parent record '{}'", record.parent_id())))?;

        Ok((record, parent))
    }

    fn can_manage(&self, identity: &Identity, parent: &mut ParentRecord) -> AppResult<bool> {
        if identity.is_system() {
            return Ok(true);
        }

        let manage_permission = self.config.manage_permission();
        let access = parent.access(&self.config)?;
        let is_owner = identity
            .user_id()
            .is_some_and(|user_id| access.owned_by().contains_user(user_id));
        let has_manage_grant = access.grants().iter().any(|grant| {
            Some(grant.permission()) == manage_permission && grant.applies_to(identity)
        });

        Ok(is_owner || has_manage_grant)
    }

    fn require_manage(&self, identity: &Identity, parent: &mut ParentRecord) -> AppResult<()> {
        if self.can_manage(identity, parent)? {
            return Ok(());
        }

        Err(AppError::Forbidden(format!(
            "caller cannot manage access of parent record '{}'",
            parent.id()
        )))
    }
}
