use chrono::{DateTime, Utc};
use rdm_access_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::resolvable::Resolvable;
use crate::values::as_object;

/// Persisted secret link granting access to whoever presents its token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretLink {
    id: Uuid,
    token_hash: String,
    permission: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl SecretLink {
    /// Creates a secret link row from an already hashed token.
    #[must_use]
    pub fn new(
        id: Uuid,
        token_hash: impl Into<String>,
        permission: impl Into<String>,
        description: Option<String>,
        created_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            token_hash: token_hash.into(),
            permission: permission.into(),
            description,
            created_at,
            expires_at,
        }
    }

    /// Returns the link id.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the SHA-256 hash of the link token.
    #[must_use]
    pub fn token_hash(&self) -> &str {
        self.token_hash.as_str()
    }

    /// Returns the permission level carried by the link.
    #[must_use]
    pub fn permission(&self) -> &str {
        self.permission.as_str()
    }

    /// Returns the link description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the expiry timestamp, if any.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Returns whether the link has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// Reference to a secret link stored on a parent record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkRef(Uuid);

impl LinkRef {
    /// Creates a reference from a link id.
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the link id.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.0
    }

    /// Parses a link from its `{"id": "<uuid>"}` representation.
    pub fn from_value(value: &Value) -> AppResult<Self> {
        let object = as_object(value, "link")?;
        let id = object
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::Validation("link id is required".to_owned()))?;
        let id = Uuid::parse_str(id)
            .map_err(|error| AppError::Validation(format!("invalid link id '{id}': {error}")))?;
        Ok(Self(id))
    }

    /// Projects the link to its persisted representation.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        object.insert("id".to_owned(), Value::String(self.0.to_string()));
        Value::Object(object)
    }
}

/// Secret link, lazily resolved against the link store.
pub type Link = Resolvable<LinkRef, SecretLink>;

/// List of secret links without duplicate ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Links {
    links: Vec<Link>,
}

impl Links {
    /// Creates an empty link list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a link. Returns `false` when the id was already present.
    pub fn add(&mut self, link: Link) -> bool {
        if self.contains(link.reference().id()) {
            return false;
        }

        self.links.push(link);
        true
    }

    /// Removes a link by id. Returns `false` when it was not present.
    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.links.len();
        self.links.retain(|link| link.reference().id() != id);
        before != self.links.len()
    }

    /// Returns whether a link with the id is present.
    #[must_use]
    pub fn contains(&self, id: Uuid) -> bool {
        self.links.iter().any(|link| link.reference().id() == id)
    }

    /// Iterates over the links.
    pub fn iter(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }

    /// Iterates mutably over the links.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Link> {
        self.links.iter_mut()
    }

    /// Returns the number of links.
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Returns whether there are no links.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Projects the links to their persisted representation.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Array(
            self.links
                .iter()
                .map(|link| link.reference().to_value())
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use serde_json::json;
    use uuid::Uuid;

    use super::{Link, LinkRef, Links, SecretLink};

    #[test]
    fn links_reject_duplicate_ids() {
        let id = Uuid::new_v4();
        let mut links = Links::new();

        assert!(links.add(Link::Unresolved(LinkRef::new(id))));
        assert!(!links.add(Link::Unresolved(LinkRef::new(id))));
        assert_eq!(links.len(), 1);
        assert_eq!(links.to_value(), json!([{"id": id.to_string()}]));
    }

    #[test]
    fn link_ids_must_be_uuids() {
        assert!(LinkRef::from_value(&json!({"id": "not-a-uuid"})).is_err());
        assert!(LinkRef::from_value(&json!({})).is_err());
    }

    #[test]
    fn expiry_is_inclusive() {
        let now = Utc::now();
        let link = SecretLink::new(
            Uuid::new_v4(),
            "hash",
            "view",
            None,
            now - Duration::days(1),
            Some(now),
        );
        assert!(link.is_expired_at(now));
        assert!(!link.is_expired_at(now - Duration::seconds(1)));
    }
}
