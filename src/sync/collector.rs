use std::sync::Arc;

use chrono::Utc;
use log::debug;
use tokio::task::{JoinError, JoinHandle};

use crate::health::MetricsSource;
use crate::models::{Metric, MetricKind, Snapshot, TimeRange};

use super::{StatusFeed, SyncError};

type ReadResult = Result<Option<f64>, SyncError>;

/// Outcome of one fan-out/fan-in pass over the tracked metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collection {
    pub snapshot: Snapshot,
    pub step_count_updated: bool,
    pub stand_time_updated: bool,
}

impl Collection {
    pub fn is_complete(&self) -> bool {
        self.step_count_updated && self.stand_time_updated
    }
}

#[derive(Clone)]
pub struct SnapshotCollector {
    source: Arc<dyn MetricsSource>,
    feed: StatusFeed,
}

impl SnapshotCollector {
    pub fn new(source: Arc<dyn MetricsSource>, feed: StatusFeed) -> Self {
        Self { source, feed }
    }

    /// Reads every tracked metric concurrently and waits for all of them.
    ///
    /// A metric that cannot be read keeps its value from `previous`; the failure
    /// is reported on the status feed and never aborts the collection.
    pub async fn collect(&self, previous: &Snapshot) -> Collection {
        let window = TimeRange::today();

        let steps = self.spawn_read(MetricKind::StepCount, window);
        let stand = self.spawn_read(MetricKind::StandTime, window);
        let (steps, stand) = tokio::join!(steps, stand);

        let steps = self.resolve(MetricKind::StepCount, steps);
        let stand = self.resolve(MetricKind::StandTime, stand);

        let snapshot = Snapshot {
            // Provider sums are real-valued; step counts are truncated.
            step_count: steps.map(|v| v as u64).unwrap_or(previous.step_count),
            stand_time: stand.unwrap_or(previous.stand_time),
            captured_at: Utc::now(),
        };

        Collection {
            snapshot,
            step_count_updated: steps.is_some(),
            stand_time_updated: stand.is_some(),
        }
    }

    fn spawn_read(&self, kind: MetricKind, window: TimeRange) -> JoinHandle<ReadResult> {
        let source = Arc::clone(&self.source);
        tokio::spawn(async move { read_metric(source.as_ref(), kind, window).await })
    }

    fn resolve(&self, kind: MetricKind, joined: Result<ReadResult, JoinError>) -> Option<f64> {
        let result = joined.unwrap_or_else(|err| {
            Err(SyncError::ReadFailure {
                metric: kind,
                cause: format!("read task failed: {err}"),
            })
        });

        match result {
            Ok(Some(value)) => Some(value),
            Ok(None) => {
                debug!("No {} samples recorded yet today", kind.as_str());
                None
            }
            Err(err) => {
                self.feed.error(err.to_string());
                None
            }
        }
    }
}

async fn read_metric(source: &dyn MetricsSource, kind: MetricKind, window: TimeRange) -> ReadResult {
    if !source.is_available(kind) {
        return Err(SyncError::ProviderUnavailable(kind));
    }

    let metric = Metric::for_today(kind, window);
    let value = source
        .read_sum(&metric, window)
        .await
        .map_err(|err| SyncError::ReadFailure {
            metric: kind,
            cause: SyncError::cause(&err),
        })?;

    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(SyncError::ReadFailure {
            metric: kind,
            cause: format!("provider returned invalid sum {v}"),
        }),
        other => Ok(other),
    }
}
