use chrono::NaiveDate;
use rdm_access_domain::today;
use tracing::{debug, info, warn};

use super::*;

impl RecordAccessService {
    /// Lifts the embargo of one record if it is over.
    pub async fn lift_embargo(&self, record_id: &str) -> AppResult<bool> {
        self.lift_embargo_at(record_id, today()).await
    }

    /// Lifts the embargo of one record relative to `today` and persists the
    /// record when it changed.
    pub async fn lift_embargo_at(&self, record_id: &str, today: NaiveDate) -> AppResult<bool> {
        let mut record = self
            .records
            .find_record(record_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("record '{record_id}'")))?;

        if !record.access_mut()?.lift_embargo_at(today) {
            debug!(record_id = %record_id, "embargo not lifted");
            return Ok(false);
        }

        record.commit();
        self.records.save_record(record).await?;

        info!(record_id = %record_id, "lifted embargo");
        Ok(true)
    }

    /// Lifts every embargo that ended on or before `today`.
    ///
    /// Failures on single records are logged and skipped. Returns the ids of
    /// the lifted records.
    pub async fn lift_expired_embargoes(&self, today: NaiveDate) -> AppResult<Vec<String>> {
        let candidates = self
            .records
            .list_record_ids_with_expired_embargo(today)
            .await?;

        let mut lifted = Vec::new();
        for record_id in candidates {
            match self.lift_embargo_at(record_id.as_str(), today).await {
                Ok(true) => lifted.push(record_id),
                Ok(false) => {}
                Err(error) => warn!(
                    record_id = %record_id,
                    error = %error,
                    "failed to lift embargo"
                ),
            }
        }

        info!(lifted_count = lifted.len(), "embargo sweep finished");
        Ok(lifted)
    }
}
