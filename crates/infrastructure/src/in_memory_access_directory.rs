use std::collections::HashMap;

use async_trait::async_trait;
use rdm_access_application::{RoleRepository, UserRepository};
use rdm_access_core::AppResult;
use rdm_access_domain::{Role, UserAccount};
use tokio::sync::RwLock;

/// In-memory user and role directory.
#[derive(Debug, Default)]
pub struct InMemoryAccessDirectory {
    users: RwLock<HashMap<String, UserAccount>>,
    roles: RwLock<HashMap<String, Role>>,
}

impl InMemoryAccessDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user account.
    pub async fn insert_user(&self, user: UserAccount) {
        self.users.write().await.insert(user.id().to_owned(), user);
    }

    /// Adds or replaces a role.
    pub async fn insert_role(&self, role: Role) {
        self.roles.write().await.insert(role.id().to_owned(), role);
    }
}

#[async_trait]
impl UserRepository for InMemoryAccessDirectory {
    async fn find_user(&self, user_id: &str) -> AppResult<Option<UserAccount>> {
        Ok(self.users.read().await.get(user_id).cloned())
    }
}

#[async_trait]
impl RoleRepository for InMemoryAccessDirectory {
    async fn find_role(&self, role_id: &str) -> AppResult<Option<Role>> {
        Ok(self.roles.read().await.get(role_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use rdm_access_application::{RoleRepository, UserRepository};
    use rdm_access_core::AppResult;
    use rdm_access_domain::{Role, UserAccount};

    use super::InMemoryAccessDirectory;

    #[tokio::test]
    async fn finds_inserted_users_and_roles() -> AppResult<()> {
        let directory = InMemoryAccessDirectory::new();
        directory
            .insert_user(UserAccount::new("1", Some("alice".to_owned()), None))
            .await;
        directory.insert_role(Role::new("curators", "Curators")).await;

        assert!(directory.find_user("1").await?.is_some());
        assert!(directory.find_user("2").await?.is_none());
        assert_eq!(
            directory.find_role("curators").await?.map(|role| role.name().to_owned()),
            Some("Curators".to_owned())
        );
        Ok(())
    }
}
