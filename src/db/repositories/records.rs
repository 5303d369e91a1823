use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Row};
use uuid::Uuid;

use crate::db::{
    helpers::{parse_datetime, to_i64, to_u64},
    Database,
};
use crate::models::{RecordId, RemoteRecord};

/// A record row as persisted, including bookkeeping columns.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: RecordId,
    pub record: RemoteRecord,
    pub created_at: DateTime<Utc>,
}

fn row_to_stored_record(row: &Row) -> Result<StoredRecord> {
    let created_at: String = row.get("created_at")?;
    Ok(StoredRecord {
        id: row.get("id")?,
        record: RemoteRecord {
            record_type: row.get("record_type")?,
            step_count: to_u64(row.get("step_count")?, "step_count")?,
            stand_time: row.get("stand_time")?,
        },
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    pub async fn get_record_ids(&self, record_type: &str) -> Result<Vec<RecordId>> {
        let record_type = record_type.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id FROM remote_records
                 WHERE record_type = ?1
                 ORDER BY created_at ASC",
            )?;

            let ids = stmt
                .query_map(params![record_type], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()
                .context("failed to read record ids")?;

            Ok(ids)
        })
        .await
    }

    pub async fn get_records(&self, record_type: &str) -> Result<Vec<StoredRecord>> {
        let record_type = record_type.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, record_type, step_count, stand_time, created_at
                 FROM remote_records
                 WHERE record_type = ?1
                 ORDER BY created_at ASC",
            )?;

            let mut rows = stmt.query(params![record_type])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_stored_record(row)?);
            }

            Ok(records)
        })
        .await
    }

    /// Deletes every id in one transaction; rolls back unless all of them existed.
    pub async fn delete_records(&self, ids: &[RecordId]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let ids = ids.to_vec();
        self.execute(move |conn| {
            let tx = conn
                .transaction()
                .context("failed to open delete transaction")?;

            let placeholders = vec!["?"; ids.len()].join(", ");
            let deleted = tx
                .execute(
                    &format!("DELETE FROM remote_records WHERE id IN ({placeholders})"),
                    params_from_iter(ids.iter()),
                )
                .context("failed to delete records")?;

            if deleted != ids.len() {
                bail!(
                    "expected to delete {} records but {} were present",
                    ids.len(),
                    deleted
                );
            }

            tx.commit().context("failed to commit record deletion")?;
            Ok(deleted)
        })
        .await
    }

    pub async fn insert_record(&self, record: &RemoteRecord) -> Result<RecordId> {
        let record = record.clone();
        self.execute(move |conn| {
            if !record.stand_time.is_finite() || record.stand_time < 0.0 {
                bail!("stand_time must be a non-negative number, got {}", record.stand_time);
            }

            let id = Uuid::new_v4().to_string();
            conn.execute(
                "INSERT INTO remote_records (id, record_type, step_count, stand_time, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id,
                    record.record_type,
                    to_i64(record.step_count)?,
                    record.stand_time,
                    Utc::now().to_rfc3339(),
                ],
            )
            .with_context(|| "failed to insert record")?;
            Ok(id)
        })
        .await
    }
}
