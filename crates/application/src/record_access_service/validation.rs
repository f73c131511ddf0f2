use std::collections::BTreeSet;

use rdm_access_domain::{Owner, OwnerRef};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::*;

const RECORD_ACCESS_KEYS: &[&str] = &["record", "files", "embargo"];
const PARENT_ACCESS_KEYS: &[&str] = &["owned_by", "grants", "links"];

impl RecordAccessService {
    /// Applies the `access` block of an input document and validates the result.
    ///
    /// Record-level keys go to the record, family-wide keys to the parent.
    /// Every collected load error is reported in one validation error on the
    /// `access` field. Both documents are left untouched when validation
    /// fails.
    pub fn populate_access_and_validate(
        &self,
        record: &mut Record,
        parent: &mut ParentRecord,
        input: &Value,
    ) -> AppResult<()> {
        let Some(access) = input.get("access") else {
            return self.validate_access(record, parent);
        };
        let access = access
            .as_object()
            .ok_or_else(|| AppError::Validation("access: must be an object".to_owned()))?;

        let record_access = merge_keys(record.raw_access(), access, RECORD_ACCESS_KEYS);
        let mut populated_record = record.clone();
        populated_record.set_raw_access(record_access);

        let parent_access = merge_keys(parent.raw_access(), access, PARENT_ACCESS_KEYS);
        let mut populated_parent = parent.clone();
        populated_parent.set_raw_access(parent_access);

        self.validate_access(&mut populated_record, &mut populated_parent)?;

        debug!(
            record_id = %record.id(),
            parent_id = %parent.id(),
            "populated access from input"
        );
        *record = populated_record;
        *parent = populated_parent;
        Ok(())
    }

    /// Fails with one combined error when either access object collected load errors.
    pub fn validate_access(&self, record: &mut Record, parent: &mut ParentRecord) -> AppResult<()> {
        let mut messages = BTreeSet::new();
        messages.extend(record.access()?.errors().iter().map(ToString::to_string));
        messages.extend(
            parent
                .access(&self.config)?
                .errors()
                .iter()
                .map(ToString::to_string),
        );

        if messages.is_empty() {
            return Ok(());
        }

        warn!(
            record_id = %record.id(),
            parent_id = %parent.id(),
            error_count = messages.len(),
            "rejected access document"
        );

        Err(AppError::Validation(format!(
            "access: {}",
            messages.into_iter().collect::<Vec<_>>().join("; ")
        )))
    }

    /// Makes the caller the owner of a parent record that has none.
    ///
    /// System identities own through the configured system user. Returns
    /// whether an owner was added.
    pub fn init_owners(&self, identity: &Identity, parent: &mut ParentRecord) -> AppResult<bool> {
        let owner = if identity.is_system() {
            OwnerRef::user(self.config.system_user_id.as_str())?
        } else if let Some(user_id) = identity.user_id() {
            OwnerRef::user(user_id)?
        } else {
            return Err(AppError::Unauthorized(
                "anonymous callers cannot own records".to_owned(),
            ));
        };

        let access = parent.access_mut(&self.config)?;
        if !access.owned_by().is_empty() {
            return Ok(false);
        }

        Ok(access.owned_by_mut().add(Owner::Unresolved(owner)))
    }

    /// Creates a record version with its access settings and persists both
    /// documents.
    pub async fn create_record(
        &self,
        identity: &Identity,
        mut record: Record,
        mut parent: ParentRecord,
        input: &Value,
    ) -> AppResult<(Record, ParentRecord)> {
        if record.raw_access().is_none() {
            let mut defaults = Map::new();
            defaults.insert(
                "record".to_owned(),
                Value::String(self.config.default_visibility.as_str().to_owned()),
            );
            record.set_raw_access(Value::Object(defaults));
        }

        self.populate_access_and_validate(&mut record, &mut parent, input)?;
        self.init_owners(identity, &mut parent)?;

        record.commit();
        parent.commit(&self.config);

        self.records.save_parent(parent.clone()).await?;
        self.records.save_record(record.clone()).await?;

        Ok((record, parent))
    }
}

fn merge_keys(stored: Option<&Value>, input: &Map<String, Value>, keys: &[&str]) -> Value {
    let mut merged = match stored {
        Some(Value::Object(object)) => object.clone(),
        _ => Map::new(),
    };

    for key in keys {
        if let Some(value) = input.get(*key) {
            merged.insert((*key).to_owned(), value.clone());
        }
    }

    Value::Object(merged)
}
