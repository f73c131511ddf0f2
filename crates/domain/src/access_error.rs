use std::fmt::{Display, Formatter};

use rdm_access_core::AppError;

/// Sub-entry of an access document that failed to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessErrorKind {
    /// Entry of `owned_by`.
    Owner,
    /// Entry of `grants`.
    Grant,
    /// Entry of `links`.
    Link,
    /// The `embargo` block.
    Embargo,
}

impl AccessErrorKind {
    /// Returns the stable name of the sub-entry.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Grant => "grant",
            Self::Link => "link",
            Self::Embargo => "embargo",
        }
    }
}

/// Load error collected while building an access object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccessError {
    kind: AccessErrorKind,
    message: String,
}

impl AccessError {
    /// Creates a load error.
    #[must_use]
    pub fn new(kind: AccessErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Wraps an application error raised while parsing a sub-entry.
    #[must_use]
    pub fn from_app_error(kind: AccessErrorKind, error: &AppError) -> Self {
        let message = match error {
            AppError::Validation(message)
            | AppError::NotFound(message)
            | AppError::Conflict(message)
            | AppError::Unauthorized(message)
            | AppError::Forbidden(message)
            | AppError::Internal(message) => message.clone(),
        };
        Self::new(kind, message)
    }

    /// Returns the failing sub-entry kind.
    #[must_use]
    pub fn kind(&self) -> AccessErrorKind {
        self.kind
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

impl Display for AccessError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "invalid {}: {}", self.kind.as_str(), self.message)
    }
}
