use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::NaiveDate;
use rdm_access_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::access_error::{AccessError, AccessErrorKind};
use crate::embargo::{Embargo, today};
use crate::protection::{Protection, Visibility};

/// Derived access status of a record version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessStatus {
    /// Record and files are public.
    Open,
    /// An embargo is active.
    Embargoed,
    /// Record or files are restricted.
    Restricted,
    /// Record is public and has no files.
    MetadataOnly,
}

impl AccessStatus {
    /// Returns the stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Embargoed => "embargoed",
            Self::Restricted => "restricted",
            Self::MetadataOnly => "metadata-only",
        }
    }
}

impl FromStr for AccessStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "open" => Ok(Self::Open),
            "embargoed" => Ok(Self::Embargoed),
            "restricted" => Ok(Self::Restricted),
            "metadata-only" => Ok(Self::MetadataOnly),
            _ => Err(AppError::Validation(format!(
                "unknown access status '{value}'"
            ))),
        }
    }
}

impl Display for AccessStatus {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Artifact class a read decision is made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessScope {
    /// Record metadata.
    Metadata,
    /// Record files.
    Files,
}

/// Access settings of one record version.
#[derive(Debug, Clone)]
pub struct RecordAccess {
    protection: Protection,
    embargo: Embargo,
    has_files: bool,
    errors: Vec<AccessError>,
}

impl RecordAccess {
    /// Creates record access settings.
    #[must_use]
    pub fn new(protection: Protection, embargo: Embargo, has_files: bool) -> Self {
        Self {
            protection,
            embargo,
            has_files,
            errors: Vec::new(),
        }
    }

    /// Returns the protection pair.
    #[must_use]
    pub fn protection(&self) -> &Protection {
        &self.protection
    }

    /// Returns the protection pair for mutation.
    pub fn protection_mut(&mut self) -> &mut Protection {
        &mut self.protection
    }

    /// Returns the embargo.
    #[must_use]
    pub fn embargo(&self) -> &Embargo {
        &self.embargo
    }

    /// Returns the embargo for mutation.
    pub fn embargo_mut(&mut self) -> &mut Embargo {
        &mut self.embargo
    }

    /// Replaces the embargo.
    pub fn set_embargo(&mut self, embargo: Embargo) {
        self.embargo = embargo;
    }

    /// Returns whether the record version carries files.
    #[must_use]
    pub fn has_files(&self) -> bool {
        self.has_files
    }

    /// Returns the errors collected while loading.
    #[must_use]
    pub fn errors(&self) -> &[AccessError] {
        self.errors.as_slice()
    }

    /// Returns the access status for today.
    #[must_use]
    pub fn status(&self) -> AccessStatus {
        self.status_at(today())
    }

    /// Returns the access status on the given date.
    ///
    /// An active embargo wins over the visibility flags.
    #[must_use]
    pub fn status_at(&self, today: NaiveDate) -> AccessStatus {
        let record = self.protection.record();
        if self.embargo.is_active_at(today) {
            AccessStatus::Embargoed
        } else if record.is_public() && !self.has_files {
            AccessStatus::MetadataOnly
        } else if record.is_public() && self.protection.files().is_public() {
            AccessStatus::Open
        } else {
            AccessStatus::Restricted
        }
    }

    /// Returns whether anyone may read the given scope on the given date.
    #[must_use]
    pub fn is_public_at(&self, scope: AccessScope, today: NaiveDate) -> bool {
        match scope {
            AccessScope::Metadata => self.protection.record().is_public(),
            AccessScope::Files => {
                self.protection.files().is_public() && !self.embargo.is_active_at(today)
            }
        }
    }

    /// Lifts an expired embargo and opens the record.
    pub fn lift_embargo(&mut self) -> bool {
        self.lift_embargo_at(today())
    }

    /// Lifts an expired embargo relative to the given date.
    ///
    /// Returns `true` when the embargo was lifted and protection relaxed.
    pub fn lift_embargo_at(&mut self, today: NaiveDate) -> bool {
        if !self.embargo.lift_at(today) {
            return false;
        }

        self.protection.set(Visibility::Public, Some(Visibility::Public));
        true
    }

    /// Builds record access from its persisted representation.
    ///
    /// Missing keys fall back to public visibility without embargo. The
    /// derived `status` is ignored. Unknown visibility values are fatal, a
    /// malformed embargo is collected into [`RecordAccess::errors`].
    pub fn from_value(value: &Value, has_files: bool) -> AppResult<Self> {
        let object = match value {
            Value::Null => {
                return Ok(Self::new(
                    Protection::default(),
                    Embargo::default(),
                    has_files,
                ));
            }
            Value::Object(object) => object,
            _ => {
                return Err(AppError::Validation(
                    "access must be an object".to_owned(),
                ));
            }
        };

        let protection = Protection::new(
            visibility_field(object, "record")?,
            visibility_field(object, "files")?,
        );

        let mut errors = Vec::new();
        let embargo = match object.get("embargo") {
            None => Embargo::default(),
            Some(value) => Embargo::from_value(value).unwrap_or_else(|error| {
                errors.push(AccessError::from_app_error(
                    AccessErrorKind::Embargo,
                    &error,
                ));
                Embargo::default()
            }),
        };

        Ok(Self {
            protection,
            embargo,
            has_files,
            errors,
        })
    }

    /// Projects the access settings, including the derived status.
    #[must_use]
    pub fn dump(&self) -> Value {
        self.dump_at(today())
    }

    /// Projects the access settings as of the given date.
    #[must_use]
    pub fn dump_at(&self, today: NaiveDate) -> Value {
        let mut object = Map::new();
        object.insert(
            "record".to_owned(),
            Value::String(self.protection.record().as_str().to_owned()),
        );
        object.insert(
            "files".to_owned(),
            Value::String(self.protection.files().as_str().to_owned()),
        );
        if self.embargo.exists() {
            object.insert("embargo".to_owned(), self.embargo.to_value_at(today));
        }
        object.insert(
            "status".to_owned(),
            Value::String(self.status_at(today).as_str().to_owned()),
        );
        Value::Object(object)
    }
}

impl PartialEq for RecordAccess {
    fn eq(&self, other: &Self) -> bool {
        self.protection == other.protection && self.embargo == other.embargo
    }
}

fn visibility_field(object: &Map<String, Value>, key: &str) -> AppResult<Visibility> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(Visibility::default()),
        Some(Value::String(value)) => value.parse(),
        Some(_) => Err(AppError::Validation(format!(
            "access.{key} must be a string"
        ))),
    }
}
