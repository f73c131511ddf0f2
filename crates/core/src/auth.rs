use serde::{Deserialize, Serialize};

/// Caller identity used by access decisions.
///
/// An identity is either anonymous, an authenticated user with a set of
/// role ids, or the system process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    user_id: Option<String>,
    roles: Vec<String>,
    system: bool,
}

impl Identity {
    /// Creates an identity for an unauthenticated caller.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            roles: Vec::new(),
            system: false,
        }
    }

    /// Creates an identity for an authenticated user.
    #[must_use]
    pub fn user(user_id: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            roles,
            system: false,
        }
    }

    /// Creates the identity of the system process.
    #[must_use]
    pub fn system() -> Self {
        Self {
            user_id: None,
            roles: Vec::new(),
            system: true,
        }
    }

    /// Returns the authenticated user id, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Returns the role ids attached to the identity.
    #[must_use]
    pub fn roles(&self) -> &[String] {
        self.roles.as_slice()
    }

    /// Returns whether the identity is the system process.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.system
    }

    /// Returns whether the caller is authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.system || self.user_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::Identity;

    #[test]
    fn anonymous_identity_is_not_authenticated() {
        assert!(!Identity::anonymous().is_authenticated());
        assert!(Identity::system().is_authenticated());
        assert!(Identity::user("1", Vec::new()).is_authenticated());
    }
}
