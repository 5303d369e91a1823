use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One cycle's collected metric values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub step_count: u64,
    /// Minutes.
    pub stand_time: f64,
    pub captured_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn empty(captured_at: DateTime<Utc>) -> Self {
        Self {
            step_count: 0,
            stand_time: 0.0,
            captured_at,
        }
    }

    /// Stand time with at least one decimal, so whole minutes read `39.0`.
    pub fn stand_time_display(&self) -> String {
        if self.stand_time.fract() == 0.0 {
            format!("{:.1}", self.stand_time)
        } else {
            self.stand_time.to_string()
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Step count: {}\nStand time: {}",
            self.step_count,
            self.stand_time_display()
        )
    }
}

pub type RecordId = String;

/// The single record kept in the store; mirrors a [`Snapshot`] minus its timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecord {
    pub record_type: String,
    pub step_count: u64,
    pub stand_time: f64,
}

impl RemoteRecord {
    pub fn from_snapshot(record_type: &str, snapshot: &Snapshot) -> Self {
        Self {
            record_type: record_type.to_string(),
            step_count: snapshot.step_count,
            stand_time: snapshot.stand_time,
        }
    }
}
