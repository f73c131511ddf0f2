use chrono::{DateTime, Utc};
use rdm_access_core::{AppError, AppResult, Identity};
use serde_json::{Map, Value};

use crate::access_error::{AccessError, AccessErrorKind};
use crate::config::AccessConfig;
use crate::grant::{Grant, Grants};
use crate::link::{Link, LinkRef, Links, SecretLink};
use crate::owner::{Owner, OwnerRef, Owners};

/// Access settings shared by every version of a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentRecordAccess {
    owned_by: Owners,
    grants: Grants,
    links: Links,
    errors: Vec<AccessError>,
}

impl ParentRecordAccess {
    /// Creates parent access settings.
    #[must_use]
    pub fn new(owned_by: Owners, grants: Grants, links: Links) -> Self {
        Self {
            owned_by,
            grants,
            links,
            errors: Vec::new(),
        }
    }

    /// Returns the owners.
    #[must_use]
    pub fn owned_by(&self) -> &Owners {
        &self.owned_by
    }

    /// Returns the owners for mutation.
    pub fn owned_by_mut(&mut self) -> &mut Owners {
        &mut self.owned_by
    }

    /// Returns the grants.
    #[must_use]
    pub fn grants(&self) -> &Grants {
        &self.grants
    }

    /// Returns the grants for mutation.
    pub fn grants_mut(&mut self) -> &mut Grants {
        &mut self.grants
    }

    /// Returns the secret links.
    #[must_use]
    pub fn links(&self) -> &Links {
        &self.links
    }

    /// Returns the secret links for mutation.
    pub fn links_mut(&mut self) -> &mut Links {
        &mut self.links
    }

    /// Returns the errors collected while loading.
    #[must_use]
    pub fn errors(&self) -> &[AccessError] {
        self.errors.as_slice()
    }

    /// Returns whether the identity is privileged on the record family.
    ///
    /// Owners, the system process, grant holders and bearers of a live secret
    /// link listed on this parent qualify. `link` must already be resolved
    /// from the token the caller presented.
    #[must_use]
    pub fn allows(
        &self,
        identity: &Identity,
        link: Option<&SecretLink>,
        now: DateTime<Utc>,
    ) -> bool {
        if identity.is_system() {
            return true;
        }

        if identity
            .user_id()
            .is_some_and(|user_id| self.owned_by.contains_user(user_id))
        {
            return true;
        }

        if self.grants.iter().any(|grant| grant.applies_to(identity)) {
            return true;
        }

        link.is_some_and(|link| self.links.contains(link.id()) && !link.is_expired_at(now))
    }

    /// Builds parent access from its persisted representation.
    ///
    /// Each `owned_by`, `grants` and `links` entry is loaded on its own;
    /// malformed entries are skipped and reported through
    /// [`ParentRecordAccess::errors`]. Grants may be stored as objects or as
    /// tokens.
    pub fn from_value(value: &Value, config: &AccessConfig) -> AppResult<Self> {
        let mut access = Self::default();
        let object = match value {
            Value::Null => return Ok(access),
            Value::Object(object) => object,
            _ => {
                return Err(AppError::Validation(
                    "parent access must be an object".to_owned(),
                ));
            }
        };

        for entry in entries(object, "owned_by", AccessErrorKind::Owner, &mut access.errors) {
            match OwnerRef::from_value(entry) {
                Ok(reference) => {
                    access.owned_by.add(Owner::Unresolved(reference));
                }
                Err(error) => access
                    .errors
                    .push(AccessError::from_app_error(AccessErrorKind::Owner, &error)),
            }
        }

        for entry in entries(object, "grants", AccessErrorKind::Grant, &mut access.errors) {
            let grant = match entry {
                Value::String(token) => Grant::from_token(token),
                _ => Grant::from_value(entry),
            }
            .and_then(|grant| {
                config.validate_permission(grant.permission())?;
                Ok(grant)
            });

            match grant {
                Ok(grant) => {
                    access.grants.add(grant);
                }
                Err(error) => access
                    .errors
                    .push(AccessError::from_app_error(AccessErrorKind::Grant, &error)),
            }
        }

        for entry in entries(object, "links", AccessErrorKind::Link, &mut access.errors) {
            match LinkRef::from_value(entry) {
                Ok(reference) => {
                    access.links.add(Link::Unresolved(reference));
                }
                Err(error) => access
                    .errors
                    .push(AccessError::from_app_error(AccessErrorKind::Link, &error)),
            }
        }

        Ok(access)
    }

    /// Projects the parent access to its persisted representation.
    ///
    /// Grants are only written when [`AccessConfig::dump_parent_grants`] is set.
    #[must_use]
    pub fn dump(&self, config: &AccessConfig) -> Value {
        let mut object = Map::new();
        object.insert("owned_by".to_owned(), self.owned_by.to_value());
        if config.dump_parent_grants {
            object.insert("grants".to_owned(), self.grants.to_value());
        }
        object.insert("links".to_owned(), self.links.to_value());
        Value::Object(object)
    }
}

fn entries<'a>(
    object: &'a Map<String, Value>,
    key: &str,
    kind: AccessErrorKind,
    errors: &mut Vec<AccessError>,
) -> &'a [Value] {
    match object.get(key) {
        None | Some(Value::Null) => &[],
        Some(Value::Array(values)) => values.as_slice(),
        Some(_) => {
            errors.push(AccessError::new(kind, format!("{key} must be a list")));
            &[]
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rdm_access_core::{AppResult, Identity};
    use serde_json::json;
    use uuid::Uuid;

    use super::ParentRecordAccess;
    use crate::access_error::AccessErrorKind;
    use crate::config::AccessConfig;
    use crate::grant::{Grant, GrantSubject, SubjectKind};
    use crate::link::SecretLink;

    #[test]
    fn empty_value_yields_empty_collections() -> AppResult<()> {
        let access = ParentRecordAccess::from_value(&json!({}), &AccessConfig::default())?;
        assert!(access.owned_by().is_empty());
        assert!(access.grants().is_empty());
        assert!(access.links().is_empty());
        assert!(access.errors().is_empty());
        Ok(())
    }

    #[test]
    fn one_malformed_grant_does_not_block_the_others() -> AppResult<()> {
        let value = json!({
            "owned_by": [{"user": 1}],
            "grants": [
                {"subject": {"type": "user", "id": "2"}, "permission": "view"},
                {"subject": {"type": "group", "id": "3"}, "permission": "view"},
                {"subject": {"type": "role", "id": "curators"}, "permission": "edit"},
            ],
        });
        let access = ParentRecordAccess::from_value(&value, &AccessConfig::default())?;

        assert_eq!(access.grants().len(), 2);
        assert_eq!(access.errors().len(), 1);
        assert_eq!(access.errors()[0].kind(), AccessErrorKind::Grant);
        assert_eq!(access.owned_by().len(), 1);
        Ok(())
    }

    #[test]
    fn collects_errors_from_every_collection() -> AppResult<()> {
        let token = Grant::new(GrantSubject::new(SubjectKind::User, "5")?, "manage", None)?
            .to_token();
        let value = json!({
            "owned_by": [{"user": "1"}, {"team": "x"}],
            "grants": [token, {"subject": {"type": "user", "id": "2"}, "permission": "own"}],
            "links": [{"id": Uuid::new_v4().to_string()}, {"id": 7}],
        });
        let access = ParentRecordAccess::from_value(&value, &AccessConfig::default())?;

        assert_eq!(access.owned_by().len(), 1);
        assert_eq!(access.grants().len(), 1);
        assert_eq!(access.links().len(), 1);
        let kinds: Vec<_> = access.errors().iter().map(|error| error.kind()).collect();
        assert_eq!(
            kinds,
            vec![AccessErrorKind::Owner, AccessErrorKind::Grant, AccessErrorKind::Link]
        );
        Ok(())
    }

    #[test]
    fn non_list_collections_are_reported() -> AppResult<()> {
        let access = ParentRecordAccess::from_value(
            &json!({"owned_by": {"user": "1"}}),
            &AccessConfig::default(),
        )?;
        assert!(access.owned_by().is_empty());
        assert_eq!(access.errors().len(), 1);
        Ok(())
    }

    #[test]
    fn dump_omits_grants_unless_enabled() -> AppResult<()> {
        let value = json!({
            "owned_by": [{"user": "1"}],
            "grants": [{"subject": {"type": "user", "id": "2"}, "permission": "view"}],
            "links": [],
        });
        let config = AccessConfig::default();
        let access = ParentRecordAccess::from_value(&value, &config)?;
        assert_eq!(
            access.dump(&config),
            json!({"owned_by": [{"user": "1"}], "links": []})
        );

        let config = AccessConfig {
            dump_parent_grants: true,
            ..AccessConfig::default()
        };
        assert_eq!(access.dump(&config), value);
        Ok(())
    }

    #[test]
    fn owners_grants_and_links_allow_access() -> AppResult<()> {
        let now = Utc::now();
        let link = SecretLink::new(Uuid::new_v4(), "hash", "view", None, now, None);
        let value = json!({
            "owned_by": [{"user": "1"}],
            "grants": [{"subject": {"type": "role", "id": "curators"}, "permission": "view"}],
            "links": [{"id": link.id().to_string()}],
        });
        let access = ParentRecordAccess::from_value(&value, &AccessConfig::default())?;

        assert!(access.allows(&Identity::user("1", Vec::new()), None, now));
        assert!(access.allows(&Identity::user("2", vec!["curators".to_owned()]), None, now));
        assert!(access.allows(&Identity::system(), None, now));
        assert!(access.allows(&Identity::anonymous(), Some(&link), now));
        assert!(!access.allows(&Identity::user("3", Vec::new()), None, now));

        let expired = SecretLink::new(
            link.id(),
            "hash",
            "view",
            None,
            now - Duration::days(2),
            Some(now - Duration::days(1)),
        );
        assert!(!access.allows(&Identity::anonymous(), Some(&expired), now));

        let foreign = SecretLink::new(Uuid::new_v4(), "hash", "view", None, now, None);
        assert!(!access.allows(&Identity::anonymous(), Some(&foreign), now));
        Ok(())
    }
}
