//! Sync lifecycle: collect today's metrics, publish them as the single
//! current record, and repeat on a self-paced timer.

mod collector;
mod controller;
mod error;
mod feed;
mod pipeline;
mod state;

pub use collector::{Collection, SnapshotCollector};
pub use controller::{CycleReport, SyncController, DEFAULT_SYNC_INTERVAL};
pub use error::SyncError;
pub use feed::StatusFeed;
pub use pipeline::{PublicationPipeline, DEFAULT_RECORD_TYPE};
pub use state::{SyncState, SyncStatus};
