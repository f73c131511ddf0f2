use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use rdm_access_application::RecordRepository;
use rdm_access_core::AppResult;
use rdm_access_domain::{ParentRecord, Record};
use serde_json::Value;
use tokio::sync::RwLock;

/// In-memory record and parent store.
#[derive(Debug, Default)]
pub struct InMemoryRecordRepository {
    records: RwLock<HashMap<String, Record>>,
    parents: RwLock<HashMap<String, ParentRecord>>,
}

impl InMemoryRecordRepository {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordRepository for InMemoryRecordRepository {
    async fn find_record(&self, record_id: &str) -> AppResult<Option<Record>> {
        Ok(self.records.read().await.get(record_id).cloned())
    }

    async fn save_record(&self, record: Record) -> AppResult<()> {
        self.records
            .write()
            .await
            .insert(record.id().to_owned(), record);
        Ok(())
    }

    async fn find_parent(&self, parent_id: &str) -> AppResult<Option<ParentRecord>> {
        Ok(self.parents.read().await.get(parent_id).cloned())
    }

    async fn save_parent(&self, parent: ParentRecord) -> AppResult<()> {
        self.parents
            .write()
            .await
            .insert(parent.id().to_owned(), parent);
        Ok(())
    }

    async fn list_record_ids_with_expired_embargo(
        &self,
        today: NaiveDate,
    ) -> AppResult<Vec<String>> {
        let records = self.records.read().await;
        Ok(expired_embargo_ids(records.values(), today))
    }
}

/// Returns the ids of records whose stored embargo is flagged active but
/// ended on or before `today`, sorted.
pub(crate) fn expired_embargo_ids<'a>(
    records: impl Iterator<Item = &'a Record>,
    today: NaiveDate,
) -> Vec<String> {
    let mut ids: Vec<String> = records
        .filter(|record| has_expired_embargo(record, today))
        .map(|record| record.id().to_owned())
        .collect();
    ids.sort();
    ids
}

fn has_expired_embargo(record: &Record, today: NaiveDate) -> bool {
    let Some(embargo) = record
        .raw_access()
        .and_then(|access| access.get("embargo"))
    else {
        return false;
    };

    if embargo.get("active") != Some(&Value::Bool(true)) {
        return false;
    }

    embargo
        .get("until")
        .and_then(Value::as_str)
        .and_then(|until| NaiveDate::parse_from_str(until, "%Y-%m-%d").ok())
        .is_some_and(|until| until <= today)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rdm_access_application::RecordRepository;
    use rdm_access_core::AppResult;
    use rdm_access_domain::{ParentRecord, Record};
    use serde_json::json;

    use super::InMemoryRecordRepository;

    #[tokio::test]
    async fn lists_only_stale_active_embargoes() -> AppResult<()> {
        let repository = InMemoryRecordRepository::new();
        let records = [
            ("a", json!({"until": "2024-01-01", "active": true})),
            ("b", json!({"until": "2024-01-01", "active": false})),
            ("c", json!({"until": "2030-01-01", "active": true})),
            ("d", json!({"until": "2024-02-01", "active": true})),
        ];
        for (id, embargo) in records {
            repository
                .save_record(Record::new(id, "p", json!({"access": {"embargo": embargo}}))?)
                .await?;
        }
        repository
            .save_record(Record::new("e", "p", json!({}))?)
            .await?;

        let today = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap_or_else(|| unreachable!());
        assert_eq!(
            repository.list_record_ids_with_expired_embargo(today).await?,
            vec!["a".to_owned(), "d".to_owned()]
        );
        Ok(())
    }

    #[tokio::test]
    async fn stores_parents_by_id() -> AppResult<()> {
        let repository = InMemoryRecordRepository::new();
        repository
            .save_parent(ParentRecord::new("p", json!({}))?)
            .await?;
        assert!(repository.find_parent("p").await?.is_some());
        assert!(repository.find_parent("q").await?.is_none());
        Ok(())
    }
}
