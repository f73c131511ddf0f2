use std::fmt::{Display, Formatter};
use std::str::FromStr;

use rdm_access_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::resolvable::Resolvable;
use crate::values::{as_id, as_object};

/// Reserved user id of the system process.
pub const SYSTEM_USER_ID: &str = "system";

/// Kinds of subjects that can own a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    /// A user account.
    User,
}

impl OwnerKind {
    /// Returns the stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
        }
    }
}

impl FromStr for OwnerKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Self::User),
            _ => Err(AppError::Validation(format!(
                "unknown owner type '{value}'"
            ))),
        }
    }
}

/// Unresolved owner reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerRef {
    kind: OwnerKind,
    id: NonEmptyString,
}

impl OwnerRef {
    /// Creates a user owner reference.
    pub fn user(id: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            kind: OwnerKind::User,
            id: NonEmptyString::new(id)?,
        })
    }

    /// Creates the reference of the system owner.
    pub fn system() -> AppResult<Self> {
        Self::user(SYSTEM_USER_ID)
    }

    /// Returns the owner kind.
    #[must_use]
    pub fn kind(&self) -> OwnerKind {
        self.kind
    }

    /// Returns the owner id.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Parses an owner from its `{"user": <id>}` representation.
    pub fn from_value(value: &Value) -> AppResult<Self> {
        let object = as_object(value, "owner")?;
        let mut entries = object.iter();
        let (Some((kind, id)), None) = (entries.next(), entries.next()) else {
            return Err(AppError::Validation(
                "owner must contain exactly one entry".to_owned(),
            ));
        };

        Ok(Self {
            kind: kind.parse()?,
            id: as_id(id, "owner id")?,
        })
    }

    /// Projects the owner to its persisted representation.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        object.insert(
            self.kind.as_str().to_owned(),
            Value::String(self.id.as_str().to_owned()),
        );
        Value::Object(object)
    }
}

impl Display for OwnerRef {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}:{}", self.kind.as_str(), self.id)
    }
}

/// User account known to the user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    id: String,
    username: Option<String>,
    email: Option<String>,
}

impl UserAccount {
    /// Creates a user account projection.
    #[must_use]
    pub fn new(id: impl Into<String>, username: Option<String>, email: Option<String>) -> Self {
        Self {
            id: id.into(),
            username,
            email,
        }
    }

    /// Returns the pseudo-account of the system process under `id`.
    #[must_use]
    pub fn system(id: impl Into<String>) -> Self {
        let id = id.into();
        Self::new(id.clone(), Some(id), None)
    }

    /// Returns the account id.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the username, if set.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Returns the email, if set.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}

/// Record owner, lazily resolved against the user directory.
pub type Owner = Resolvable<OwnerRef, UserAccount>;

/// Ordered set of owners.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Owners {
    owners: Vec<Owner>,
}

impl Owners {
    /// Creates an empty owner set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an owner. Returns `false` when the owner was already present.
    pub fn add(&mut self, owner: Owner) -> bool {
        if self.contains(owner.reference()) {
            return false;
        }

        self.owners.push(owner);
        true
    }

    /// Removes an owner. Returns `false` when it was not present.
    pub fn remove(&mut self, reference: &OwnerRef) -> bool {
        let before = self.owners.len();
        self.owners.retain(|owner| owner.reference() != reference);
        before != self.owners.len()
    }

    /// Returns whether the reference is one of the owners.
    #[must_use]
    pub fn contains(&self, reference: &OwnerRef) -> bool {
        self.owners.iter().any(|owner| owner.reference() == reference)
    }

    /// Returns whether the given user id is one of the owners.
    #[must_use]
    pub fn contains_user(&self, user_id: &str) -> bool {
        self.owners.iter().any(|owner| {
            owner.reference().kind() == OwnerKind::User && owner.reference().id() == user_id
        })
    }

    /// Iterates over the owners.
    pub fn iter(&self) -> impl Iterator<Item = &Owner> {
        self.owners.iter()
    }

    /// Iterates mutably over the owners.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Owner> {
        self.owners.iter_mut()
    }

    /// Returns the number of owners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Returns whether there are no owners.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Projects the owners to their persisted representation.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Array(
            self.owners
                .iter()
                .map(|owner| owner.reference().to_value())
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Owner, OwnerRef, Owners, UserAccount};

    #[test]
    fn parses_string_and_integer_ids() {
        let from_string = OwnerRef::from_value(&json!({"user": "12"}));
        let from_integer = OwnerRef::from_value(&json!({"user": 12}));
        assert!(from_string.is_ok());
        assert_eq!(from_string.ok(), from_integer.ok());
    }

    #[test]
    fn rejects_malformed_owners() {
        assert!(OwnerRef::from_value(&json!({"group": "1"})).is_err());
        assert!(OwnerRef::from_value(&json!({"user": "1", "role": "2"})).is_err());
        assert!(OwnerRef::from_value(&json!({})).is_err());
        assert!(OwnerRef::from_value(&json!({"user": ""})).is_err());
        assert!(OwnerRef::from_value(&json!("user:1")).is_err());
    }

    #[test]
    fn owners_deduplicate_by_reference() -> rdm_access_core::AppResult<()> {
        let mut owners = Owners::new();
        assert!(owners.add(Owner::Unresolved(OwnerRef::user("1")?)));

        let mut resolved = Owner::Unresolved(OwnerRef::user("1")?);
        resolved.resolve_with(UserAccount::new("1", None, None));
        assert!(!owners.add(resolved));
        assert!(owners.add(Owner::Unresolved(OwnerRef::system()?)));

        assert_eq!(owners.len(), 2);
        assert!(owners.contains_user("system"));
        assert_eq!(owners.to_value(), json!([{"user": "1"}, {"user": "system"}]));

        assert!(owners.remove(&OwnerRef::user("1")?));
        assert!(!owners.contains_user("1"));
        Ok(())
    }
}
