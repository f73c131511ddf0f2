use rdm_access_domain::{AccessScope, today};

use super::*;

impl RecordAccessService {
    /// Returns whether the caller may read the given scope of a record version.
    ///
    /// Public visibility is enough on its own; otherwise the caller must be
    /// privileged on the parent or present the token of one of its live
    /// secret links.
    pub async fn can_read(
        &self,
        identity: &Identity,
        record: &mut Record,
        parent: &mut ParentRecord,
        scope: AccessScope,
        link_token: Option<&str>,
    ) -> AppResult<bool> {
        if record.access()?.is_public_at(scope, today()) {
            return Ok(true);
        }

        let link = match link_token {
            Some(token) => {
                self.links
                    .find_link_by_token_hash(&hash_link_token(token))
                    .await?
            }
            None => None,
        };

        Ok(parent
            .access(&self.config)?
            .allows(identity, link.as_ref(), Utc::now()))
    }

    /// Returns whether the caller may read the record metadata.
    pub async fn can_read_metadata(
        &self,
        identity: &Identity,
        record: &mut Record,
        parent: &mut ParentRecord,
        link_token: Option<&str>,
    ) -> AppResult<bool> {
        self.can_read(identity, record, parent, AccessScope::Metadata, link_token)
            .await
    }

    /// Returns whether the caller may read the record files.
    pub async fn can_read_files(
        &self,
        identity: &Identity,
        record: &mut Record,
        parent: &mut ParentRecord,
        link_token: Option<&str>,
    ) -> AppResult<bool> {
        self.can_read(identity, record, parent, AccessScope::Files, link_token)
            .await
    }

    /// Ensures the caller may read the given scope of a record version.
    pub async fn require_read(
        &self,
        identity: &Identity,
        record: &mut Record,
        parent: &mut ParentRecord,
        scope: AccessScope,
        link_token: Option<&str>,
    ) -> AppResult<()> {
        if self
            .can_read(identity, record, parent, scope, link_token)
            .await?
        {
            return Ok(());
        }

        Err(AppError::Forbidden(format!(
            "caller cannot read {} of record '{}'",
            match scope {
                AccessScope::Metadata => "metadata",
                AccessScope::Files => "files",
            },
            record.id()
        )))
    }
}
