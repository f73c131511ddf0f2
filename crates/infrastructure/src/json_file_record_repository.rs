//! Record store persisted as a single JSON document on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use rdm_access_application::RecordRepository;
use rdm_access_core::{AppError, AppResult};
use rdm_access_domain::{ParentRecord, Record};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::in_memory_record_repository::expired_embargo_ids;

#[derive(Debug, Default, Serialize, Deserialize)]
struct RecordStoreDocument {
    #[serde(default)]
    records: BTreeMap<String, Record>,
    #[serde(default)]
    parents: BTreeMap<String, ParentRecord>,
}

/// Record store backed by a JSON file, rewritten on every save.
#[derive(Debug)]
pub struct JsonFileRecordRepository {
    path: PathBuf,
    document: RwLock<RecordStoreDocument>,
}

impl JsonFileRecordRepository {
    /// Opens the store at `path`. A missing file starts an empty store.
    pub async fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        let document = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|error| {
                AppError::Internal(format!(
                    "failed to parse record store '{}': {error}",
                    path.display()
                ))
            })?,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                RecordStoreDocument::default()
            }
            Err(error) => {
                return Err(AppError::Internal(format!(
                    "failed to read record store '{}': {error}",
                    path.display()
                )));
            }
        };

        Ok(Self {
            path,
            document: RwLock::new(document),
        })
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    async fn persist(&self, document: &RecordStoreDocument) -> AppResult<()> {
        let bytes = serde_json::to_vec_pretty(document).map_err(|error| {
            AppError::Internal(format!("failed to serialize record store: {error}"))
        })?;

        let staging_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging_path, bytes).await.map_err(|error| {
            AppError::Internal(format!(
                "failed to write record store '{}': {error}",
                staging_path.display()
            ))
        })?;
        tokio::fs::rename(&staging_path, &self.path)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to replace record store '{}': {error}",
                    self.path.display()
                ))
            })?;

        debug!(
            path = %self.path.display(),
            records = document.records.len(),
            parents = document.parents.len(),
            "persisted record store"
        );
        Ok(())
    }
}

#[async_trait]
impl RecordRepository for JsonFileRecordRepository {
    async fn find_record(&self, record_id: &str) -> AppResult<Option<Record>> {
        Ok(self.document.read().await.records.get(record_id).cloned())
    }

    async fn save_record(&self, record: Record) -> AppResult<()> {
        let mut document = self.document.write().await;
        let record_id = record.id().to_owned();
        let previous = document.records.insert(record_id.clone(), record);

        if let Err(error) = self.persist(&document).await {
            restore_entry(&mut document.records, record_id, previous);
            return Err(error);
        }
        Ok(())
    }

    async fn find_parent(&self, parent_id: &str) -> AppResult<Option<ParentRecord>> {
        Ok(self.document.read().await.parents.get(parent_id).cloned())
    }

    async fn save_parent(&self, parent: ParentRecord) -> AppResult<()> {
        let mut document = self.document.write().await;
        let parent_id = parent.id().to_owned();
        let previous = document.parents.insert(parent_id.clone(), parent);

        if let Err(error) = self.persist(&document).await {
            restore_entry(&mut document.parents, parent_id, previous);
            return Err(error);
        }
        Ok(())
    }

    async fn list_record_ids_with_expired_embargo(
        &self,
        today: NaiveDate,
    ) -> AppResult<Vec<String>> {
        let document = self.document.read().await;
        Ok(expired_embargo_ids(document.records.values(), today))
    }
}

// Undoes an insert whose write to disk failed.
fn restore_entry<V>(entries: &mut BTreeMap<String, V>, key: String, previous: Option<V>) {
    match previous {
        Some(value) => {
            entries.insert(key, value);
        }
        None => {
            entries.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rdm_access_application::RecordRepository;
    use rdm_access_core::{AppError, AppResult};
    use rdm_access_domain::{ParentRecord, Record};
    use serde_json::json;

    use super::JsonFileRecordRepository;

    #[tokio::test]
    async fn saved_records_survive_reopening() -> AppResult<()> {
        let directory = tempfile::tempdir()
            .map_err(|error| AppError::Internal(format!("tempdir: {error}")))?;
        let path = directory.path().join("records.json");

        let repository = JsonFileRecordRepository::open(&path).await?;
        repository
            .save_record(Record::new(
                "rec-1",
                "par-1",
                json!({"access": {"embargo": {"until": "2024-01-01", "active": true}}}),
            )?)
            .await?;
        repository
            .save_parent(ParentRecord::new("par-1", json!({"access": {"owned_by": []}}))?)
            .await?;

        let reopened = JsonFileRecordRepository::open(&path).await?;
        let record = reopened.find_record("rec-1").await?;
        assert_eq!(record.as_ref().map(Record::parent_id), Some("par-1"));
        assert!(reopened.find_parent("par-1").await?.is_some());

        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap_or_else(|| unreachable!());
        assert_eq!(
            reopened.list_record_ids_with_expired_embargo(today).await?,
            vec!["rec-1".to_owned()]
        );
        Ok(())
    }

    #[tokio::test]
    async fn failed_write_leaves_memory_matching_disk() -> AppResult<()> {
        let directory = tempfile::tempdir()
            .map_err(|error| AppError::Internal(format!("tempdir: {error}")))?;
        let store_directory = directory.path().join("store");
        std::fs::create_dir(&store_directory)
            .map_err(|error| AppError::Internal(format!("create dir: {error}")))?;

        let repository =
            JsonFileRecordRepository::open(store_directory.join("records.json")).await?;
        repository
            .save_record(Record::new("rec-1", "par-1", json!({"title": "kept"}))?)
            .await?;
        std::fs::remove_dir_all(&store_directory)
            .map_err(|error| AppError::Internal(format!("remove dir: {error}")))?;

        let overwrite = Record::new("rec-1", "par-1", json!({"title": "lost"}))?;
        assert!(repository.save_record(overwrite).await.is_err());
        let added = Record::new(
            "rec-2",
            "par-1",
            json!({"access": {"embargo": {"until": "2024-01-01", "active": true}}}),
        )?;
        assert!(repository.save_record(added).await.is_err());
        assert!(
            repository
                .save_parent(ParentRecord::new("par-1", json!({}))?)
                .await
                .is_err()
        );

        let kept = repository.find_record("rec-1").await?;
        assert_eq!(
            kept.as_ref().map(|record| record.data().clone()),
            Some(json!({"title": "kept"}))
        );
        assert!(repository.find_record("rec-2").await?.is_none());
        assert!(repository.find_parent("par-1").await?.is_none());

        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap_or_else(|| unreachable!());
        assert!(
            repository
                .list_record_ids_with_expired_embargo(today)
                .await?
                .is_empty()
        );
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_store_is_rejected() -> AppResult<()> {
        let directory = tempfile::tempdir()
            .map_err(|error| AppError::Internal(format!("tempdir: {error}")))?;
        let path = directory.path().join("records.json");
        std::fs::write(&path, b"not json")
            .map_err(|error| AppError::Internal(format!("write: {error}")))?;

        assert!(JsonFileRecordRepository::open(&path).await.is_err());
        Ok(())
    }
}
