use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Snapshot, StatusEvent};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SyncState {
    #[default]
    Idle,
    Starting,
    Online,
    Stopping,
}

impl SyncState {
    /// Whether the UI should offer the start action.
    pub fn can_start(&self) -> bool {
        matches!(self, SyncState::Idle)
    }

    pub fn can_stop(&self) -> bool {
        matches!(self, SyncState::Online)
    }
}

/// What the UI renders: lifecycle state, the one-line log and the latest values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub state: SyncState,
    pub event: StatusEvent,
    pub step_count: u64,
    pub stand_time: f64,
    /// When `step_count` and `stand_time` were read.
    pub captured_at: DateTime<Utc>,
    pub last_published_at: Option<DateTime<Utc>>,
}

impl SyncStatus {
    pub fn new() -> Self {
        let event = StatusEvent::launched();
        let empty = Snapshot::empty(event.timestamp);
        Self {
            state: SyncState::Idle,
            event,
            step_count: empty.step_count,
            stand_time: empty.stand_time,
            captured_at: empty.captured_at,
            last_published_at: None,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            step_count: self.step_count,
            stand_time: self.stand_time,
            captured_at: self.captured_at,
        }
    }
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self::new()
    }
}
