use rdm_access_core::{AppError, AppResult};

use crate::owner::SYSTEM_USER_ID;
use crate::protection::Visibility;

/// Permission levels accepted on grants and secret links by default.
pub const DEFAULT_PERMISSION_LEVELS: &[&str] = &["view", "preview", "edit", "manage"];

/// Access model settings passed explicitly to the components that need them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessConfig {
    /// Whether parent grants are written back to storage.
    pub dump_parent_grants: bool,
    /// Accepted permission levels, lowest first.
    pub permission_levels: Vec<String>,
    /// User id owning records created by the system process.
    pub system_user_id: String,
    /// Visibility given to new records that do not specify one.
    pub default_visibility: Visibility,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            dump_parent_grants: false,
            permission_levels: DEFAULT_PERMISSION_LEVELS
                .iter()
                .map(|level| (*level).to_owned())
                .collect(),
            system_user_id: SYSTEM_USER_ID.to_owned(),
            default_visibility: Visibility::Public,
        }
    }
}

impl AccessConfig {
    /// Fails when the permission level is not configured.
    pub fn validate_permission(&self, permission: &str) -> AppResult<()> {
        if self
            .permission_levels
            .iter()
            .any(|level| level == permission)
        {
            return Ok(());
        }

        Err(AppError::Validation(format!(
            "unknown permission level '{permission}'"
        )))
    }

    /// Returns the highest configured level, which grants management rights.
    #[must_use]
    pub fn manage_permission(&self) -> Option<&str> {
        self.permission_levels.last().map(String::as_str)
    }
}
