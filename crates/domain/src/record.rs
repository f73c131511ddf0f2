//! Record and parent entities hosting the lazily loaded access objects.
//!
//! The access object is built from the stored `access` document on first use
//! and cached. Changes to it stay in memory until `commit` writes the dump
//! back into the stored document; until then `raw_access` still returns the
//! last committed value.

use rdm_access_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::AccessConfig;
use crate::parent_access::ParentRecordAccess;
use crate::record_access::RecordAccess;

const ACCESS_KEY: &str = "access";

/// One version of a record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    id: NonEmptyString,
    parent_id: NonEmptyString,
    data: Value,
    #[serde(skip)]
    access: Option<RecordAccess>,
}

impl Record {
    /// Creates a record from its stored JSON document.
    pub fn new(
        id: impl Into<String>,
        parent_id: impl Into<String>,
        data: Value,
    ) -> AppResult<Self> {
        if !data.is_object() {
            return Err(AppError::Validation(
                "record data must be a JSON object".to_owned(),
            ));
        }

        Ok(Self {
            id: NonEmptyString::new(id)?,
            parent_id: NonEmptyString::new(parent_id)?,
            data,
            access: None,
        })
    }

    /// Returns the record id.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the id of the parent record.
    #[must_use]
    pub fn parent_id(&self) -> &str {
        self.parent_id.as_str()
    }

    /// Returns the stored JSON document.
    #[must_use]
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Returns the stored `access` document, ignoring uncommitted changes.
    #[must_use]
    pub fn raw_access(&self) -> Option<&Value> {
        self.data.get(ACCESS_KEY)
    }

    /// Replaces the stored `access` document and drops the cached object.
    pub fn set_raw_access(&mut self, value: Value) {
        set_key(&mut self.data, ACCESS_KEY, value);
        self.access = None;
    }

    /// Returns whether the record carries files (`files.enabled`, default `true`).
    #[must_use]
    pub fn has_files(&self) -> bool {
        self.data
            .pointer("/files/enabled")
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    /// Returns whether the access object has been loaded.
    #[must_use]
    pub fn is_access_loaded(&self) -> bool {
        self.access.is_some()
    }

    /// Returns the access object, loading it on first use.
    pub fn access(&mut self) -> AppResult<&RecordAccess> {
        Ok(self.load_access()?)
    }

    /// Returns the access object for mutation, loading it on first use.
    pub fn access_mut(&mut self) -> AppResult<&mut RecordAccess> {
        self.load_access()
    }

    /// Drops the cached access object so the next read reloads it.
    pub fn refresh_access(&mut self) {
        self.access = None;
    }

    /// Writes the cached access object into the stored document.
    ///
    /// Returns `false` when nothing was loaded and the document is unchanged.
    pub fn commit(&mut self) -> bool {
        let Some(access) = &self.access else {
            return false;
        };

        let dumped = access.dump();
        set_key(&mut self.data, ACCESS_KEY, dumped);
        true
    }

    /// Projects the record for the search index with a fresh access dump.
    pub fn search_dump(&mut self) -> AppResult<Value> {
        let access = self.access()?.dump();
        let mut document = match &self.data {
            Value::Object(object) => object.clone(),
            _ => Map::new(),
        };
        document.insert("id".to_owned(), Value::String(self.id().to_owned()));
        document.insert("parent".to_owned(), parent_reference(self.parent_id()));
        document.insert(ACCESS_KEY.to_owned(), access);
        Ok(Value::Object(document))
    }

    /// Rebuilds a record from a search index document, dropping derived fields.
    pub fn from_search_dump(document: Value) -> AppResult<Self> {
        let Value::Object(mut document) = document else {
            return Err(AppError::Validation(
                "search document must be an object".to_owned(),
            ));
        };

        let id = take_string(&mut document, "id")?;
        let parent_id = document
            .remove("parent")
            .and_then(|parent| parent.get("id").and_then(Value::as_str).map(ToOwned::to_owned))
            .ok_or_else(|| {
                AppError::Validation("search document is missing parent.id".to_owned())
            })?;

        if let Some(Value::Object(access)) = document.get_mut(ACCESS_KEY) {
            access.remove("status");
        }

        Self::new(id, parent_id, Value::Object(document))
    }

    fn load_access(&mut self) -> AppResult<&mut RecordAccess> {
        let access = match self.access.take() {
            Some(access) => access,
            None => RecordAccess::from_value(
                self.data.get(ACCESS_KEY).unwrap_or(&Value::Null),
                self.has_files(),
            )?,
        };

        Ok(self.access.insert(access))
    }
}

/// Record family shared by all versions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentRecord {
    id: NonEmptyString,
    data: Value,
    #[serde(skip)]
    access: Option<ParentRecordAccess>,
}

impl ParentRecord {
    /// Creates a parent record from its stored JSON document.
    pub fn new(id: impl Into<String>, data: Value) -> AppResult<Self> {
        if !data.is_object() {
            return Err(AppError::Validation(
                "parent record data must be a JSON object".to_owned(),
            ));
        }

        Ok(Self {
            id: NonEmptyString::new(id)?,
            data,
            access: None,
        })
    }

    /// Returns the parent id.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the stored JSON document.
    #[must_use]
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Returns the stored `access` document, ignoring uncommitted changes.
    #[must_use]
    pub fn raw_access(&self) -> Option<&Value> {
        self.data.get(ACCESS_KEY)
    }

    /// Replaces the stored `access` document and drops the cached object.
    pub fn set_raw_access(&mut self, value: Value) {
        set_key(&mut self.data, ACCESS_KEY, value);
        self.access = None;
    }

    /// Returns whether the access object has been loaded.
    #[must_use]
    pub fn is_access_loaded(&self) -> bool {
        self.access.is_some()
    }

    /// Returns the access object, loading it on first use.
    pub fn access(&mut self, config: &AccessConfig) -> AppResult<&ParentRecordAccess> {
        Ok(self.load_access(config)?)
    }

    /// Returns the access object for mutation, loading it on first use.
    pub fn access_mut(&mut self, config: &AccessConfig) -> AppResult<&mut ParentRecordAccess> {
        self.load_access(config)
    }

    /// Drops the cached access object so the next read reloads it.
    pub fn refresh_access(&mut self) {
        self.access = None;
    }

    /// Writes the cached access object into the stored document.
    pub fn commit(&mut self, config: &AccessConfig) -> bool {
        let Some(access) = &self.access else {
            return false;
        };

        let dumped = access.dump(config);
        set_key(&mut self.data, ACCESS_KEY, dumped);
        true
    }

    fn load_access(&mut self, config: &AccessConfig) -> AppResult<&mut ParentRecordAccess> {
        let access = match self.access.take() {
            Some(access) => access,
            None => ParentRecordAccess::from_value(
                self.data.get(ACCESS_KEY).unwrap_or(&Value::Null),
                config,
            )?,
        };

        Ok(self.access.insert(access))
    }
}

fn set_key(data: &mut Value, key: &str, value: Value) {
    if let Value::Object(object) = data {
        object.insert(key.to_owned(), value);
    }
}

fn parent_reference(parent_id: &str) -> Value {
    let mut parent = Map::new();
    parent.insert("id".to_owned(), Value::String(parent_id.to_owned()));
    Value::Object(parent)
}

fn take_string(document: &mut Map<String, Value>, key: &str) -> AppResult<String> {
    match document.remove(key) {
        Some(Value::String(value)) => Ok(value),
        _ => Err(AppError::Validation(format!(
            "search document is missing {key}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use rdm_access_core::AppResult;
    use serde_json::json;

    use super::{ParentRecord, Record};
    use crate::config::AccessConfig;
    use crate::owner::{Owner, OwnerRef};
    use crate::protection::Visibility;
    use crate::record_access::AccessStatus;

    #[test]
    fn access_changes_stay_in_memory_until_commit() -> AppResult<()> {
        let mut record = Record::new(
            "abc-123",
            "par-1",
            json!({"access": {"record": "public", "files": "public"}}),
        )?;
        assert!(!record.is_access_loaded());

        record
            .access_mut()?
            .protection_mut()
            .set_record(Visibility::Restricted);

        assert_eq!(
            record.access()?.protection().files(),
            Visibility::Restricted
        );
        assert_eq!(
            record.raw_access(),
            Some(&json!({"record": "public", "files": "public"}))
        );

        assert!(record.commit());
        assert_eq!(
            record.raw_access(),
            Some(&json!({"record": "restricted", "files": "restricted", "status": "restricted"}))
        );
        Ok(())
    }

    #[test]
    fn commit_without_loading_is_a_no_op() -> AppResult<()> {
        let mut record = Record::new("abc-123", "par-1", json!({}))?;
        assert!(!record.commit());
        assert_eq!(record.raw_access(), None);
        Ok(())
    }

    #[test]
    fn record_without_files_is_metadata_only() -> AppResult<()> {
        let mut record = Record::new("abc-123", "par-1", json!({"files": {"enabled": false}}))?;
        assert_eq!(record.access()?.status(), AccessStatus::MetadataOnly);
        Ok(())
    }

    #[test]
    fn raw_access_replacement_drops_the_cache() -> AppResult<()> {
        let mut record = Record::new("abc-123", "par-1", json!({}))?;
        assert_eq!(record.access()?.protection().record(), Visibility::Public);

        record.set_raw_access(json!({"record": "restricted"}));
        assert_eq!(
            record.access()?.protection().record(),
            Visibility::Restricted
        );
        Ok(())
    }

    #[test]
    fn search_dump_roundtrip_strips_status() -> AppResult<()> {
        let mut record = Record::new(
            "abc-123",
            "par-1",
            json!({"metadata": {"title": "Data"}, "access": {"record": "public"}}),
        )?;
        let document = record.search_dump()?;
        assert_eq!(document["access"]["status"], json!("open"));
        assert_eq!(document["parent"]["id"], json!("par-1"));

        let restored = Record::from_search_dump(document)?;
        assert_eq!(restored.id(), "abc-123");
        assert_eq!(restored.parent_id(), "par-1");
        assert_eq!(restored.raw_access().and_then(|access| access.get("status")), None);
        assert_eq!(restored.data()["metadata"]["title"], json!("Data"));
        Ok(())
    }

    #[test]
    fn parent_owner_changes_flush_on_commit() -> AppResult<()> {
        let config = AccessConfig::default();
        let mut parent = ParentRecord::new("par-1", json!({"access": {"owned_by": []}}))?;

        parent
            .access_mut(&config)?
            .owned_by_mut()
            .add(Owner::Unresolved(OwnerRef::user("7")?));
        assert_eq!(parent.raw_access(), Some(&json!({"owned_by": []})));

        assert!(parent.commit(&config));
        assert_eq!(
            parent.raw_access(),
            Some(&json!({"owned_by": [{"user": "7"}], "links": []}))
        );
        Ok(())
    }
}
