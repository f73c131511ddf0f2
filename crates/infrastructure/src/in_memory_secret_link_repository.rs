use std::collections::HashMap;

use async_trait::async_trait;
use rdm_access_application::SecretLinkRepository;
use rdm_access_core::{AppError, AppResult};
use rdm_access_domain::SecretLink;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory secret link store.
#[derive(Debug, Default)]
pub struct InMemorySecretLinkRepository {
    links: RwLock<HashMap<Uuid, SecretLink>>,
}

impl InMemorySecretLinkRepository {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecretLinkRepository for InMemorySecretLinkRepository {
    async fn save_link(&self, link: SecretLink) -> AppResult<()> {
        let mut links = self.links.write().await;
        if links.contains_key(&link.id()) {
            return Err(AppError::Conflict(format!(
                "secret link '{}' already exists",
                link.id()
            )));
        }

        links.insert(link.id(), link);
        Ok(())
    }

    async fn find_link(&self, link_id: Uuid) -> AppResult<Option<SecretLink>> {
        Ok(self.links.read().await.get(&link_id).cloned())
    }

    async fn find_link_by_token_hash(&self, token_hash: &str) -> AppResult<Option<SecretLink>> {
        Ok(self
            .links
            .read()
            .await
            .values()
            .find(|link| link.token_hash() == token_hash)
            .cloned())
    }

    async fn delete_link(&self, link_id: Uuid) -> AppResult<()> {
        self.links
            .write()
            .await
            .remove(&link_id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("secret link '{link_id}'")))
    }
}
