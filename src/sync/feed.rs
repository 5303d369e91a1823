use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{error, info};
use tokio::sync::{broadcast, watch};

use crate::models::{Severity, Snapshot, StatusEvent};

use super::{SyncState, SyncStatus};

const EVENT_BUFFER: usize = 64;

/// Read-only view of the orchestrator for the UI layer.
///
/// `subscribe` yields the latest [`SyncStatus`]; `subscribe_events` yields every
/// status event as it is emitted, for consumers that print a running log.
#[derive(Clone)]
pub struct StatusFeed {
    status_tx: Arc<watch::Sender<SyncStatus>>,
    events_tx: broadcast::Sender<StatusEvent>,
}

impl StatusFeed {
    pub fn new() -> Self {
        let (status_tx, _) = watch::channel(SyncStatus::new());
        let (events_tx, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            status_tx: Arc::new(status_tx),
            events_tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status_tx.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<StatusEvent> {
        self.events_tx.subscribe()
    }

    pub fn current(&self) -> SyncStatus {
        self.status_tx.borrow().clone()
    }

    pub fn latest_event(&self) -> StatusEvent {
        self.status_tx.borrow().event.clone()
    }

    pub fn emit(&self, message: impl Into<String>, severity: Severity) {
        let event = StatusEvent::new(message, severity);
        match severity {
            Severity::Error => error!("[{}] {}", severity.as_str(), event.message),
            Severity::Info | Severity::Success => {
                info!("[{}] {}", severity.as_str(), event.message)
            }
        }

        self.status_tx.send_modify(|status| status.event = event.clone());
        // No subscribers is fine; the watch channel still holds the latest event.
        let _ = self.events_tx.send(event);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(message, Severity::Info);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.emit(message, Severity::Success);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(message, Severity::Error);
    }

    pub(crate) fn set_state(&self, state: SyncState) {
        self.status_tx.send_modify(|status| status.state = state);
    }

    pub(crate) fn set_values(&self, snapshot: &Snapshot) {
        self.status_tx.send_modify(|status| {
            status.step_count = snapshot.step_count;
            status.stand_time = snapshot.stand_time;
            status.captured_at = snapshot.captured_at;
        });
    }

    pub(crate) fn mark_published(&self, at: DateTime<Utc>) {
        self.status_tx
            .send_modify(|status| status.last_published_at = Some(at));
    }
}

impl Default for StatusFeed {
    fn default() -> Self {
        Self::new()
    }
}
