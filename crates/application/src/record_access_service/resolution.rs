use rdm_access_domain::{
    Grant, Link, Owner, SubjectEntity, SubjectKind, SystemRole, UserAccount,
};
use tracing::warn;

use super::*;

impl RecordAccessService {
    /// Resolves one owner against the user directory.
    ///
    /// A missing user yields `Ok(None)`, or `AppError::NotFound` when
    /// `strict` is set. The configured system user resolves without a lookup.
    pub async fn resolve_owner<'a>(
        &self,
        owner: &'a mut Owner,
        strict: bool,
    ) -> AppResult<Option<&'a UserAccount>> {
        if !owner.is_resolved() {
            let reference = owner.reference().clone();
            let account = if reference.id() == self.config.system_user_id {
                Some(UserAccount::system(self.config.system_user_id.as_str()))
            } else {
                self.users.find_user(reference.id()).await?
            };

            match account {
                Some(account) => owner.resolve_with(account),
                None if strict => {
                    return Err(AppError::NotFound(format!("owner '{reference}'")));
                }
                None => warn!(owner = %reference, "owner could not be resolved"),
            }
        }

        let owner: &'a Owner = owner;
        Ok(owner.entity())
    }

    /// Resolves the subject of one grant.
    pub async fn resolve_grant_subject<'a>(
        &self,
        grant: &'a mut Grant,
        strict: bool,
    ) -> AppResult<Option<&'a SubjectEntity>> {
        if !grant.subject_mut().is_resolved() {
            let subject = grant.subject().clone();
            let entity = match subject.kind() {
                SubjectKind::User => self
                    .users
                    .find_user(subject.id())
                    .await?
                    .map(SubjectEntity::User),
                SubjectKind::Role => self
                    .roles
                    .find_role(subject.id())
                    .await?
                    .map(SubjectEntity::Role),
                SubjectKind::SystemRole => subject
                    .id()
                    .parse::<SystemRole>()
                    .ok()
                    .map(SubjectEntity::SystemRole),
            };

            match entity {
                Some(entity) => grant.subject_mut().resolve_with(entity),
                None if strict => {
                    return Err(AppError::NotFound(format!("grant subject '{subject}'")));
                }
                None => warn!(subject = %subject, "grant subject could not be resolved"),
            }
        }

        let grant: &'a Grant = grant;
        Ok(grant.subject_entity())
    }

    /// Resolves one secret link against the link store.
    pub async fn resolve_link<'a>(
        &self,
        link: &'a mut Link,
        strict: bool,
    ) -> AppResult<Option<&'a SecretLink>> {
        if !link.is_resolved() {
            let id = link.reference().id();
            match self.links.find_link(id).await? {
                Some(secret_link) => link.resolve_with(secret_link),
                None if strict => {
                    return Err(AppError::NotFound(format!("secret link '{id}'")));
                }
                None => warn!(link_id = %id, "secret link could not be resolved"),
            }
        }

        let link: &'a Link = link;
        Ok(link.entity())
    }

    /// Resolves every owner of the parent. Returns how many are resolved.
    pub async fn resolve_owners(
        &self,
        parent: &mut ParentRecord,
        strict: bool,
    ) -> AppResult<usize> {
        let mut resolved = 0;
        for owner in parent.access_mut(&self.config)?.owned_by_mut().iter_mut() {
            if self.resolve_owner(owner, strict).await?.is_some() {
                resolved += 1;
            }
        }
        Ok(resolved)
    }

    /// Resolves every grant subject of the parent. Returns how many are resolved.
    pub async fn resolve_grants(
        &self,
        parent: &mut ParentRecord,
        strict: bool,
    ) -> AppResult<usize> {
        let mut resolved = 0;
        for grant in parent.access_mut(&self.config)?.grants_mut().iter_mut() {
            if self.resolve_grant_subject(grant, strict).await?.is_some() {
                resolved += 1;
            }
        }
        Ok(resolved)
    }

    /// Resolves every secret link of the parent. Returns how many are resolved.
    pub async fn resolve_links(&self, parent: &mut ParentRecord, strict: bool) -> AppResult<usize> {
        let mut resolved = 0;
        for link in parent.access_mut(&self.config)?.links_mut().iter_mut() {
            if self.resolve_link(link, strict).await?.is_some() {
                resolved += 1;
            }
        }
        Ok(resolved)
    }
}
