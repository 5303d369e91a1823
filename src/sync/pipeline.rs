use std::sync::Arc;

use log::{debug, error, info};

use crate::models::{RecordId, RemoteRecord, Snapshot};
use crate::store::RecordStore;

use super::SyncError;

pub const DEFAULT_RECORD_TYPE: &str = "HealthDatas";

/// Clear-then-write publication against a [`RecordStore`].
#[derive(Clone)]
pub struct PublicationPipeline {
    store: Arc<dyn RecordStore>,
    record_type: String,
}

impl PublicationPipeline {
    pub fn new(store: Arc<dyn RecordStore>, record_type: impl Into<String>) -> Self {
        Self {
            store,
            record_type: record_type.into(),
        }
    }

    /// Deletes every record of the pipeline's type; returns how many were removed.
    ///
    /// An empty store succeeds without issuing a delete.
    pub async fn clear(&self) -> Result<usize, SyncError> {
        let ids = self
            .store
            .query_all(&self.record_type)
            .await
            .map_err(|err| {
                error!("Failed to query {} records: {err:#}", self.record_type);
                SyncError::StoreQuery(SyncError::cause(&err))
            })?;

        if ids.is_empty() {
            debug!("No {} records to clear", self.record_type);
            return Ok(0);
        }

        self.store.delete_all(&ids).await.map_err(|err| {
            error!(
                "Failed to delete {} {} records: {err:#}",
                ids.len(),
                self.record_type
            );
            SyncError::StoreDelete(SyncError::cause(&err))
        })?;

        info!("Cleared {} {} records", ids.len(), self.record_type);
        Ok(ids.len())
    }

    /// Inserts one record for `snapshot`. Assumes [`clear`](Self::clear) ran first.
    pub async fn publish(&self, snapshot: &Snapshot) -> Result<RecordId, SyncError> {
        let record = RemoteRecord::from_snapshot(&self.record_type, snapshot);
        match self.store.insert(&record).await {
            Ok(id) => {
                info!(
                    "Published {} record {id} (steps={}, stand={})",
                    self.record_type, record.step_count, record.stand_time
                );
                Ok(id)
            }
            Err(err) => {
                error!("Failed to insert {} record: {err:#}", self.record_type);
                Err(SyncError::StoreInsert(SyncError::cause(&err)))
            }
        }
    }
}
