use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rdm_access_core::{AppError, AppResult, Identity, NonEmptyString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::owner::UserAccount;
use crate::resolvable::Resolvable;
use crate::values::{as_id, as_object};

const TOKEN_DELIMITER: &str = ".";

/// Kinds of subjects that can receive a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    /// A single user account.
    User,
    /// A named role.
    Role,
    /// A role computed from the caller's state.
    SystemRole,
}

impl SubjectKind {
    /// Returns the stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Role => "role",
            Self::SystemRole => "system_role",
        }
    }
}

impl FromStr for SubjectKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Self::User),
            "role" => Ok(Self::Role),
            "system_role" => Ok(Self::SystemRole),
            _ => Err(AppError::Validation(format!(
                "unknown grant subject type '{value}'"
            ))),
        }
    }
}

/// Roles whose membership is derived from the caller rather than stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemRole {
    /// Every caller, authenticated or not.
    AnyUser,
    /// Every authenticated caller.
    AuthenticatedUser,
    /// The system process.
    SystemProcess,
}

impl SystemRole {
    /// Returns the stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnyUser => "any_user",
            Self::AuthenticatedUser => "authenticated_user",
            Self::SystemProcess => "system_process",
        }
    }

    /// Returns whether the identity holds this role.
    #[must_use]
    pub fn includes(&self, identity: &Identity) -> bool {
        match self {
            Self::AnyUser => true,
            Self::AuthenticatedUser => identity.is_authenticated(),
            Self::SystemProcess => identity.is_system(),
        }
    }
}

impl FromStr for SystemRole {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "any_user" => Ok(Self::AnyUser),
            "authenticated_user" => Ok(Self::AuthenticatedUser),
            "system_process" => Ok(Self::SystemProcess),
            _ => Err(AppError::NotFound(format!("system role '{value}'"))),
        }
    }
}

/// Role known to the role directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    id: String,
    name: String,
}

impl Role {
    /// Creates a role projection.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Returns the role id.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the role name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }
}

/// Entity a grant subject resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectEntity {
    /// Resolved user account.
    User(UserAccount),
    /// Resolved role.
    Role(Role),
    /// Built-in system role.
    SystemRole(SystemRole),
}

/// Unresolved grant subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GrantSubject {
    kind: SubjectKind,
    id: NonEmptyString,
}

impl GrantSubject {
    /// Creates a subject reference.
    pub fn new(kind: SubjectKind, id: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            kind,
            id: NonEmptyString::new(id)?,
        })
    }

    /// Returns the subject kind.
    #[must_use]
    pub fn kind(&self) -> SubjectKind {
        self.kind
    }

    /// Returns the subject id.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns whether the identity is covered by this subject.
    #[must_use]
    pub fn includes(&self, identity: &Identity) -> bool {
        match self.kind {
            SubjectKind::User => identity.user_id() == Some(self.id()),
            SubjectKind::Role => identity.roles().iter().any(|role| role == self.id()),
            SubjectKind::SystemRole => self
                .id()
                .parse::<SystemRole>()
                .is_ok_and(|role| role.includes(identity)),
        }
    }
}

impl Display for GrantSubject {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}:{}", self.kind.as_str(), self.id)
    }
}

/// Permission level assigned to a subject on a record family.
#[derive(Debug, Clone)]
pub struct Grant {
    subject: Resolvable<GrantSubject, SubjectEntity>,
    permission: NonEmptyString,
    origin: Option<String>,
}

impl Grant {
    /// Creates a grant for an unresolved subject.
    pub fn new(
        subject: GrantSubject,
        permission: impl Into<String>,
        origin: Option<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            subject: Resolvable::Unresolved(subject),
            permission: NonEmptyString::new(permission)?,
            origin,
        })
    }

    /// Returns the subject reference.
    #[must_use]
    pub fn subject(&self) -> &GrantSubject {
        self.subject.reference()
    }

    /// Returns the resolved subject entity, if any.
    #[must_use]
    pub fn subject_entity(&self) -> Option<&SubjectEntity> {
        self.subject.entity()
    }

    /// Returns the subject for resolution.
    pub fn subject_mut(&mut self) -> &mut Resolvable<GrantSubject, SubjectEntity> {
        &mut self.subject
    }

    /// Returns the permission level.
    #[must_use]
    pub fn permission(&self) -> &str {
        self.permission.as_str()
    }

    /// Returns where the grant came from, if recorded.
    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Returns whether the grant applies to the identity.
    #[must_use]
    pub fn applies_to(&self, identity: &Identity) -> bool {
        self.subject().includes(identity)
    }

    /// Encodes the grant as `b64(type).b64(id).b64(permission)`.
    #[must_use]
    pub fn to_token(&self) -> String {
        let subject = self.subject();
        [subject.kind().as_str(), subject.id(), self.permission()]
            .iter()
            .map(|segment| STANDARD.encode(segment))
            .collect::<Vec<_>>()
            .join(TOKEN_DELIMITER)
    }

    /// Decodes a grant from its token representation.
    pub fn from_token(token: &str) -> AppResult<Self> {
        let segments = token
            .split(TOKEN_DELIMITER)
            .map(decode_segment)
            .collect::<AppResult<Vec<_>>>()?;

        let [kind, id, permission] = segments.as_slice() else {
            return Err(AppError::Validation(format!(
                "grant token must have three segments, got {}",
                segments.len()
            )));
        };

        Self::new(
            GrantSubject::new(kind.parse()?, id.as_str())?,
            permission.as_str(),
            None,
        )
    }

    /// Parses a grant from its dictionary representation.
    pub fn from_value(value: &Value) -> AppResult<Self> {
        let object = as_object(value, "grant")?;
        let subject = as_object(
            object
                .get("subject")
                .ok_or_else(|| AppError::Validation("grant subject is required".to_owned()))?,
            "grant subject",
        )?;

        let kind = subject
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::Validation("grant subject type is required".to_owned()))?
            .parse::<SubjectKind>()?;
        let id = as_id(
            subject
                .get("id")
                .ok_or_else(|| AppError::Validation("grant subject id is required".to_owned()))?,
            "grant subject id",
        )?;
        let permission = object
            .get("permission")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::Validation("grant permission is required".to_owned()))?;
        let origin = object
            .get("origin")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned);

        Self::new(GrantSubject::new(kind, id)?, permission, origin)
    }

    /// Projects the grant to its dictionary representation.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut subject = Map::new();
        subject.insert(
            "type".to_owned(),
            Value::String(self.subject().kind().as_str().to_owned()),
        );
        subject.insert(
            "id".to_owned(),
            Value::String(self.subject().id().to_owned()),
        );

        let mut object = Map::new();
        object.insert("subject".to_owned(), Value::Object(subject));
        object.insert(
            "permission".to_owned(),
            Value::String(self.permission().to_owned()),
        );
        if let Some(origin) = &self.origin {
            object.insert("origin".to_owned(), Value::String(origin.clone()));
        }
        Value::Object(object)
    }
}

impl PartialEq for Grant {
    fn eq(&self, other: &Self) -> bool {
        self.subject() == other.subject() && self.permission == other.permission
    }
}

impl Eq for Grant {}

impl Hash for Grant {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.subject().hash(state);
        self.permission.hash(state);
    }
}

fn decode_segment(segment: &str) -> AppResult<String> {
    let bytes = STANDARD
        .decode(segment)
        .map_err(|error| AppError::Validation(format!("invalid grant token segment: {error}")))?;
    String::from_utf8(bytes)
        .map_err(|error| AppError::Validation(format!("invalid grant token segment: {error}")))
}

/// Set of grants, deduplicated by subject and permission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grants {
    grants: Vec<Grant>,
}

impl Grants {
    /// Creates an empty grant set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a grant. Returns `false` when an equal grant was already present.
    pub fn add(&mut self, grant: Grant) -> bool {
        if self.grants.contains(&grant) {
            return false;
        }

        self.grants.push(grant);
        true
    }

    /// Builds and adds a grant for the given subject.
    pub fn create(
        &mut self,
        kind: SubjectKind,
        id: impl Into<String>,
        permission: impl Into<String>,
    ) -> AppResult<bool> {
        let grant = Grant::new(GrantSubject::new(kind, id)?, permission, None)?;
        Ok(self.add(grant))
    }

    /// Removes a grant. Returns `false` when it was not present.
    pub fn remove(&mut self, grant: &Grant) -> bool {
        let before = self.grants.len();
        self.grants.retain(|stored| stored != grant);
        before != self.grants.len()
    }

    /// Iterates over the grants.
    pub fn iter(&self) -> impl Iterator<Item = &Grant> {
        self.grants.iter()
    }

    /// Iterates mutably over the grants.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Grant> {
        self.grants.iter_mut()
    }

    /// Returns the number of grants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.grants.len()
    }

    /// Returns whether there are no grants.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// Projects the grants to their dictionary representation.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Array(self.grants.iter().map(Grant::to_value).collect())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rdm_access_core::{AppResult, Identity};
    use serde_json::json;

    use super::{Grant, GrantSubject, Grants, SubjectKind};

    fn subject_kind() -> impl Strategy<Value = SubjectKind> {
        prop_oneof![
            Just(SubjectKind::User),
            Just(SubjectKind::Role),
            Just(SubjectKind::SystemRole),
        ]
    }

    proptest! {
        #[test]
        fn token_roundtrip_preserves_grant(
            kind in subject_kind(),
            id in "[^\\s]{1,24}",
            permission in "[a-z_.]{1,12}",
        ) {
            let subject = GrantSubject::new(kind, id);
            prop_assume!(subject.is_ok());
            let grant = Grant::new(subject.unwrap_or_else(|_| unreachable!()), permission, None);
            prop_assume!(grant.is_ok());
            let grant = grant.unwrap_or_else(|_| unreachable!());

            let token = grant.to_token();
            prop_assert_eq!(token.matches('.').count(), 2);
            let decoded = Grant::from_token(&token);
            prop_assert!(decoded.is_ok());
            prop_assert_eq!(decoded.unwrap_or_else(|_| unreachable!()), grant);
        }
    }

    #[test]
    fn token_uses_standard_base64_segments() -> AppResult<()> {
        let grant = Grant::new(GrantSubject::new(SubjectKind::User, "1")?, "view", None)?;
        assert_eq!(grant.to_token(), "dXNlcg==.MQ==.dmlldw==");
        Ok(())
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert!(Grant::from_token("dXNlcg==.MQ==").is_err());
        assert!(Grant::from_token("dXNlcg==.MQ==.dmlldw==.eA==").is_err());
        assert!(Grant::from_token("***.MQ==.dmlldw==").is_err());
        assert!(Grant::from_token("Z3JvdXA=.MQ==.dmlldw==").is_err());
    }

    #[test]
    fn dict_roundtrip_keeps_origin() -> AppResult<()> {
        let value = json!({
            "subject": {"type": "role", "id": "curators"},
            "permission": "manage",
            "origin": "community",
        });
        let grant = Grant::from_value(&value)?;
        assert_eq!(grant.origin(), Some("community"));
        assert_eq!(grant.to_value(), value);
        Ok(())
    }

    #[test]
    fn grants_deduplicate_by_subject_and_permission() -> AppResult<()> {
        let mut grants = Grants::new();
        assert!(grants.create(SubjectKind::User, "1", "view")?);
        assert!(!grants.create(SubjectKind::User, "1", "view")?);
        assert!(grants.create(SubjectKind::User, "1", "edit")?);
        assert_eq!(grants.len(), 2);
        Ok(())
    }

    #[test]
    fn subjects_match_identities() -> AppResult<()> {
        let alice = Identity::user("1", vec!["curators".to_owned()]);

        assert!(GrantSubject::new(SubjectKind::User, "1")?.includes(&alice));
        assert!(GrantSubject::new(SubjectKind::Role, "curators")?.includes(&alice));
        assert!(GrantSubject::new(SubjectKind::SystemRole, "authenticated_user")?.includes(&alice));
        assert!(!GrantSubject::new(SubjectKind::SystemRole, "system_process")?.includes(&alice));
        assert!(
            !GrantSubject::new(SubjectKind::SystemRole, "authenticated_user")?
                .includes(&Identity::anonymous())
        );
        Ok(())
    }
}
