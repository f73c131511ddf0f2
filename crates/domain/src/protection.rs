use std::fmt::{Display, Formatter};
use std::str::FromStr;

use rdm_access_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Visibility level of one artifact class of a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Anyone can see the artifact.
    #[default]
    Public,
    /// Only privileged subjects can see the artifact.
    Restricted,
}

impl Visibility {
    /// Returns the stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Restricted => "restricted",
        }
    }

    /// Returns whether the value is [`Visibility::Public`].
    #[must_use]
    pub fn is_public(&self) -> bool {
        matches!(self, Self::Public)
    }

    /// Returns whether the value is [`Visibility::Restricted`].
    #[must_use]
    pub fn is_restricted(&self) -> bool {
        matches!(self, Self::Restricted)
    }
}

impl FromStr for Visibility {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "public" => Ok(Self::Public),
            "restricted" => Ok(Self::Restricted),
            _ => Err(AppError::Validation(format!(
                "unknown protection value '{value}'"
            ))),
        }
    }
}

impl Display for Visibility {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Record and files visibility pair.
///
/// Files can never be more open than the record they belong to: whenever the
/// record is restricted the files are restricted too.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Protection {
    record: Visibility,
    files: Visibility,
}

impl Protection {
    /// Creates a protection pair, applying the record-to-files cascade.
    #[must_use]
    pub fn new(record: Visibility, files: Visibility) -> Self {
        let mut protection = Self::default();
        protection.set(record, Some(files));
        protection
    }

    /// Parses a protection pair from storage values.
    pub fn parse(record: &str, files: &str) -> AppResult<Self> {
        Ok(Self::new(record.parse()?, files.parse()?))
    }

    /// Returns the record metadata visibility.
    #[must_use]
    pub fn record(&self) -> Visibility {
        self.record
    }

    /// Returns the record files visibility.
    #[must_use]
    pub fn files(&self) -> Visibility {
        self.files
    }

    /// Sets the record visibility and optionally the files visibility.
    ///
    /// Record-level restriction wins over a simultaneous request to open the
    /// files.
    pub fn set(&mut self, record: Visibility, files: Option<Visibility>) {
        self.record = record;
        if record.is_restricted() {
            self.files = Visibility::Restricted;
            return;
        }

        if let Some(files) = files {
            self.files = files;
        }
    }

    /// Sets the record visibility alone.
    pub fn set_record(&mut self, record: Visibility) {
        self.set(record, None);
    }

    /// Sets the files visibility. No-op while the record is restricted.
    pub fn set_files(&mut self, files: Visibility) {
        if self.record.is_restricted() {
            return;
        }

        self.files = files;
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{Protection, Visibility};

    fn visibility() -> impl Strategy<Value = Visibility> {
        prop_oneof![Just(Visibility::Public), Just(Visibility::Restricted)]
    }

    proptest! {
        #[test]
        fn restricting_the_record_always_restricts_files(
            record in visibility(),
            files in visibility(),
            requested_files in proptest::option::of(visibility()),
        ) {
            let mut protection = Protection::new(record, files);
            protection.set(Visibility::Restricted, requested_files);

            prop_assert_eq!(protection.record(), Visibility::Restricted);
            prop_assert_eq!(protection.files(), Visibility::Restricted);
        }
    }

    #[test]
    fn restricted_record_cannot_be_created_with_public_files() {
        let protection = Protection::new(Visibility::Restricted, Visibility::Public);
        assert_eq!(protection.files(), Visibility::Restricted);
    }

    #[test]
    fn setting_files_is_ignored_while_record_is_restricted() {
        let mut protection = Protection::new(Visibility::Restricted, Visibility::Restricted);
        protection.set_files(Visibility::Public);
        assert_eq!(protection.files(), Visibility::Restricted);

        protection.set_record(Visibility::Public);
        protection.set_files(Visibility::Public);
        assert_eq!(protection.files(), Visibility::Public);
    }

    #[test]
    fn public_record_keeps_restricted_files() {
        let protection = Protection::new(Visibility::Public, Visibility::Restricted);
        assert_eq!(protection.record(), Visibility::Public);
        assert_eq!(protection.files(), Visibility::Restricted);
    }

    #[test]
    fn unknown_protection_value_is_rejected() {
        assert!("secret".parse::<Visibility>().is_err());
        assert!(Protection::parse("public", "hidden").is_err());
    }
}
