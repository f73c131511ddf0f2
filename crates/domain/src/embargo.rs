use chrono::{NaiveDate, Utc};
use rdm_access_core::{AppError, AppResult};
use serde_json::{Map, Value, json};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Returns the current UTC date.
#[must_use]
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Date-gated restriction on a record version.
///
/// An embargo without `until` is absent. The `active` flag is derived from
/// `until` unless an explicit value was loaded from storage.
#[derive(Debug, Clone, Default)]
pub struct Embargo {
    until: Option<NaiveDate>,
    reason: Option<String>,
    active: Option<bool>,
}

impl Embargo {
    /// Creates an embargo lasting until the given date.
    #[must_use]
    pub fn new(until: NaiveDate, reason: Option<String>) -> Self {
        Self {
            until: Some(until),
            reason,
            active: None,
        }
    }

    /// Creates an embargo with an explicit `active` value, as read from a
    /// persisted snapshot.
    #[must_use]
    pub fn with_active(
        until: Option<NaiveDate>,
        reason: Option<String>,
        active: Option<bool>,
    ) -> Self {
        Self {
            until,
            reason,
            active,
        }
    }

    /// Returns the embargo end date.
    #[must_use]
    pub fn until(&self) -> Option<NaiveDate> {
        self.until
    }

    /// Returns the embargo reason.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Returns whether an embargo was ever set.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.until.is_some()
    }

    /// Returns whether the embargo is active today.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active_at(today())
    }

    /// Returns whether the embargo is active on the given date.
    #[must_use]
    pub fn is_active_at(&self, today: NaiveDate) -> bool {
        match self.active {
            Some(active) => active,
            None => self.until.is_some_and(|until| until > today),
        }
    }

    /// Lifts the embargo if it is over but still flagged active.
    pub fn lift(&mut self) -> bool {
        self.lift_at(today())
    }

    /// Lifts the embargo relative to the given date.
    ///
    /// Returns `true` only when the stored flag changed from active to
    /// inactive.
    pub fn lift_at(&mut self, today: NaiveDate) -> bool {
        let Some(until) = self.until else {
            return false;
        };

        if until > today {
            return false;
        }

        if self.active != Some(true) {
            return false;
        }

        self.active = Some(false);
        true
    }

    /// Removes the embargo entirely.
    pub fn clear(&mut self) {
        self.until = None;
        self.reason = None;
        self.active = None;
    }

    /// Parses an embargo from its persisted representation.
    ///
    /// `null` and an object without `until` both yield an absent embargo.
    pub fn from_value(value: &Value) -> AppResult<Self> {
        let object = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(object) => object,
            _ => {
                return Err(AppError::Validation(
                    "embargo must be an object".to_owned(),
                ));
            }
        };

        let until = match object.get("until") {
            None | Some(Value::Null) => None,
            Some(Value::String(until)) => Some(parse_date(until)?),
            Some(_) => {
                return Err(AppError::Validation(
                    "embargo until must be a date string".to_owned(),
                ));
            }
        };

        let reason = match object.get("reason") {
            None | Some(Value::Null) => None,
            Some(Value::String(reason)) => Some(reason.clone()),
            Some(_) => {
                return Err(AppError::Validation(
                    "embargo reason must be a string".to_owned(),
                ));
            }
        };

        let active = match object.get("active") {
            None | Some(Value::Null) => None,
            Some(Value::Bool(active)) => Some(*active),
            Some(_) => {
                return Err(AppError::Validation(
                    "embargo active must be a boolean".to_owned(),
                ));
            }
        };

        if until.is_none() {
            return Ok(Self::default());
        }

        Ok(Self::with_active(until, reason, active))
    }

    /// Projects the embargo to its persisted representation.
    #[must_use]
    pub fn to_value_at(&self, today: NaiveDate) -> Value {
        let mut object = Map::new();
        object.insert(
            "until".to_owned(),
            self.until
                .map(|until| Value::String(until.format(DATE_FORMAT).to_string()))
                .unwrap_or(Value::Null),
        );
        object.insert("active".to_owned(), json!(self.is_active_at(today)));
        object.insert("reason".to_owned(), json!(self.reason));
        Value::Object(object)
    }
}

impl PartialEq for Embargo {
    fn eq(&self, other: &Self) -> bool {
        self.until == other.until
            && self.reason == other.reason
            && self.is_active() == other.is_active()
    }
}

fn parse_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|error| AppError::Validation(format!("invalid embargo date '{value}': {error}")))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::Embargo;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
    }

    #[test]
    fn active_follows_until_without_override() {
        let today = date(2024, 6, 1);
        assert!(Embargo::new(date(2024, 6, 2), None).is_active_at(today));
        assert!(!Embargo::new(date(2024, 6, 1), None).is_active_at(today));
        assert!(!Embargo::new(date(2023, 1, 1), None).is_active_at(today));
        assert!(!Embargo::default().is_active_at(today));
    }

    #[test]
    fn explicit_active_overrides_computed_value() {
        let today = date(2024, 6, 1);
        let stale = Embargo::with_active(Some(date(2020, 1, 1)), None, Some(true));
        assert!(stale.is_active_at(today));
    }

    #[test]
    fn lift_is_idempotent() {
        let today = date(2024, 6, 1);
        let mut embargo = Embargo::with_active(Some(date(2024, 5, 1)), None, Some(true));

        assert!(embargo.lift_at(today));
        assert!(!embargo.is_active_at(today));
        assert!(!embargo.lift_at(today));
    }

    #[test]
    fn lift_keeps_future_embargo() {
        let today = date(2024, 6, 1);
        let mut embargo = Embargo::with_active(Some(date(2030, 1, 1)), None, Some(true));

        assert!(!embargo.lift_at(today));
        assert!(embargo.is_active_at(today));
        assert!(!Embargo::default().lift_at(today));
    }

    #[test]
    fn clear_makes_embargo_absent() {
        let mut embargo = Embargo::new(date(2030, 1, 1), Some("review".to_owned()));
        embargo.clear();
        assert!(!embargo.exists());
        assert_eq!(embargo.reason(), None);
    }

    #[test]
    fn parses_persisted_shape() {
        let embargo = Embargo::from_value(&json!({
            "until": "2031-02-03",
            "active": true,
            "reason": "patent pending",
        }));
        assert!(embargo.is_ok());

        let embargo = embargo.unwrap_or_default();
        assert_eq!(embargo.until(), Some(date(2031, 2, 3)));
        assert_eq!(embargo.reason(), Some("patent pending"));
        assert_eq!(
            embargo.to_value_at(date(2024, 1, 1)),
            json!({"until": "2031-02-03", "active": true, "reason": "patent pending"})
        );
    }

    #[test]
    fn rejects_malformed_dates() {
        assert!(Embargo::from_value(&json!({"until": "03/02/2031"})).is_err());
        assert!(Embargo::from_value(&json!("2031-02-03")).is_err());
    }

    #[test]
    fn missing_until_means_no_embargo() {
        let embargo = Embargo::from_value(&json!({"active": false, "until": null}));
        assert!(embargo.is_ok_and(|embargo| !embargo.exists()));
    }
}
