use async_trait::async_trait;
use chrono::NaiveDate;
use rdm_access_core::AppResult;
use rdm_access_domain::{ParentRecord, Record, Role, SecretLink, UserAccount};
use uuid::Uuid;

/// Repository port for user account lookups.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Finds a user account by id.
    async fn find_user(&self, user_id: &str) -> AppResult<Option<UserAccount>>;
}

/// Repository port for role lookups.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Finds a role by id.
    async fn find_role(&self, role_id: &str) -> AppResult<Option<Role>>;
}

/// Repository port for persisted secret links.
#[async_trait]
pub trait SecretLinkRepository: Send + Sync {
    /// Stores a new secret link.
    async fn save_link(&self, link: SecretLink) -> AppResult<()>;

    /// Finds a secret link by id.
    async fn find_link(&self, link_id: Uuid) -> AppResult<Option<SecretLink>>;

    /// Finds a secret link by the SHA-256 hash of its token.
    async fn find_link_by_token_hash(&self, token_hash: &str) -> AppResult<Option<SecretLink>>;

    /// Deletes a secret link.
    async fn delete_link(&self, link_id: Uuid) -> AppResult<()>;
}

/// Repository port for record and parent documents.
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// Finds a record version by id.
    async fn find_record(&self, record_id: &str) -> AppResult<Option<Record>>;

    /// Stores a record version, replacing any previous document.
    async fn save_record(&self, record: Record) -> AppResult<()>;

    /// Finds a parent record by id.
    async fn find_parent(&self, parent_id: &str) -> AppResult<Option<ParentRecord>>;

    /// Stores a parent record, replacing any previous document.
    async fn save_parent(&self, parent: ParentRecord) -> AppResult<()>;

    /// Lists records whose stored embargo is flagged active but ended on or
    /// before `today`.
    async fn list_record_ids_with_expired_embargo(&self, today: NaiveDate)
    -> AppResult<Vec<String>>;
}
