use anyhow::Result;
use async_trait::async_trait;

use crate::db::Database;
use crate::models::{RecordId, RemoteRecord};

/// Remote store holding records of a named type.
///
/// Calls are independent; there is no transaction spanning a delete and the
/// insert that follows it.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn query_all(&self, record_type: &str) -> Result<Vec<RecordId>>;

    /// Removes all of `ids`, failing unless every one of them was deleted.
    async fn delete_all(&self, ids: &[RecordId]) -> Result<()>;

    async fn insert(&self, record: &RemoteRecord) -> Result<RecordId>;
}

#[async_trait]
impl RecordStore for Database {
    async fn query_all(&self, record_type: &str) -> Result<Vec<RecordId>> {
        self.get_record_ids(record_type).await
    }

    async fn delete_all(&self, ids: &[RecordId]) -> Result<()> {
        self.delete_records(ids).await.map(|_| ())
    }

    async fn insert(&self, record: &RemoteRecord) -> Result<RecordId> {
        self.insert_record(record).await
    }
}
