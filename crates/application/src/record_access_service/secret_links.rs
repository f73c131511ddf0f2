use rdm_access_domain::{Link, LinkRef};
use tracing::info;
use uuid::Uuid;

use super::token_crypto::generate_token;
use super::*;

impl RecordAccessService {
    /// Creates a secret link on a parent record and persists both.
    ///
    /// The raw token is only returned here; the store keeps its hash.
    pub async fn create_secret_link(
        &self,
        identity: &Identity,
        parent: &mut ParentRecord,
        input: CreateSecretLinkInput,
    ) -> AppResult<CreatedSecretLink> {
        self.require_manage(identity, parent)?;
        self.config.validate_permission(input.permission.as_str())?;

        let now = Utc::now();
        if input.expires_at.is_some_and(|expires_at| expires_at <= now) {
            return Err(AppError::Validation(
                "secret link expiry must be in the future".to_owned(),
            ));
        }

        let (token, token_hash) = generate_token()?;
        let link = SecretLink::new(
            Uuid::new_v4(),
            token_hash,
            input.permission,
            input.description,
            now,
            input.expires_at,
        );
        self.links.save_link(link.clone()).await?;

        parent.access_mut(&self.config)?.links_mut().add(Link::Resolved {
            reference: LinkRef::new(link.id()),
            entity: link.clone(),
        });
        parent.commit(&self.config);
        self.records.save_parent(parent.clone()).await?;

        info!(
            parent_id = %parent.id(),
            link_id = %link.id(),
            permission = %link.permission(),
            "created secret link"
        );

        Ok(CreatedSecretLink { link, token })
    }

    /// Removes a secret link from a parent record and deletes it.
    pub async fn revoke_secret_link(
        &self,
        identity: &Identity,
        parent: &mut ParentRecord,
        link_id: Uuid,
    ) -> AppResult<()> {
        self.require_manage(identity, parent)?;

        if !parent.access_mut(&self.config)?.links_mut().remove(link_id) {
            return Err(AppError::NotFound(format!(
                "secret link '{link_id}' on parent record '{}'",
                parent.id()
            )));
        }

        self.links.delete_link(link_id).await?;
        parent.commit(&self.config);
        self.records.save_parent(parent.clone()).await?;

        info!(parent_id = %parent.id(), link_id = %link_id, "revoked secret link");
        Ok(())
    }
}
