use std::{sync::Arc, time::Duration};

use log::{info, warn};
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time,
};
use tokio_util::sync::CancellationToken;

use crate::health::MetricsSource;
use crate::models::{RecordId, Snapshot};
use crate::store::RecordStore;

use super::{
    Collection, PublicationPipeline, SnapshotCollector, StatusFeed, SyncError, SyncState,
    SyncStatus,
};

pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(300);

/// What one collect-then-publish pass produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub collection: Collection,
    pub published: Option<RecordId>,
}

struct RecurringTimer {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns the sync lifecycle and the timer that drives recurring cycles.
///
/// Only this type mutates [`SyncState`]; the UI observes it through
/// [`SyncController::subscribe`].
#[derive(Clone)]
pub struct SyncController {
    state: Arc<Mutex<SyncState>>,
    timer: Arc<Mutex<Option<RecurringTimer>>>,
    // Held while a stop's clear is outstanding so a retry cannot overlap it.
    stop_lock: Arc<Mutex<()>>,
    collector: SnapshotCollector,
    pipeline: PublicationPipeline,
    feed: StatusFeed,
    interval: Duration,
}

impl SyncController {
    pub fn new(
        source: Arc<dyn MetricsSource>,
        store: Arc<dyn RecordStore>,
        record_type: impl Into<String>,
        interval: Duration,
    ) -> Self {
        let feed = StatusFeed::new();
        Self {
            state: Arc::new(Mutex::new(SyncState::Idle)),
            timer: Arc::new(Mutex::new(None)),
            stop_lock: Arc::new(Mutex::new(())),
            collector: SnapshotCollector::new(source, feed.clone()),
            pipeline: PublicationPipeline::new(store, record_type),
            feed,
            interval,
        }
    }

    pub async fn get_state(&self) -> SyncState {
        *self.state.lock().await
    }

    pub fn status(&self) -> SyncStatus {
        self.feed.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.feed.subscribe()
    }

    pub fn feed(&self) -> &StatusFeed {
        &self.feed
    }

    /// Clears the store, publishes a first snapshot and goes online.
    ///
    /// A failed clear is reported on the feed and leaves the controller idle;
    /// `Err` is only returned when the controller is not idle.
    pub async fn start(&self) -> Result<SyncState, SyncError> {
        self.begin(SyncState::can_start, SyncState::Starting, "start")
            .await?;

        self.feed.info("Clearing data...");
        if let Err(err) = self.clear_store().await {
            self.feed.error(clear_failed(&err));
            self.set_state(SyncState::Idle).await;
            return Ok(SyncState::Idle);
        }

        self.run_cycle().await;

        {
            let mut state = self.state.lock().await;
            *state = SyncState::Online;
            self.feed.set_state(SyncState::Online);
            self.arm_timer().await;
        }

        info!(
            "Sync online; next cycle in {}s",
            self.interval.as_secs_f64()
        );
        Ok(SyncState::Online)
    }

    /// Disarms the timer, waits out any in-flight cycle, then clears the store.
    ///
    /// If the clear fails the controller stays in `Stopping` until
    /// [`retry_stop`](Self::retry_stop) succeeds.
    pub async fn stop(&self) -> Result<SyncState, SyncError> {
        let (timer, _stopping) = {
            let mut state = self.state.lock().await;
            if !state.can_stop() {
                return Err(SyncError::InvalidTransition {
                    from: *state,
                    action: "stop",
                });
            }
            let stopping = self.stop_lock.lock().await;
            // Cancel under the state lock so no wake-up can slip in after Stopping.
            let timer = self.timer.lock().await.take();
            if let Some(timer) = &timer {
                timer.token.cancel();
            }
            *state = SyncState::Stopping;
            self.feed.set_state(SyncState::Stopping);
            (timer, stopping)
        };

        if let Some(timer) = timer {
            if let Err(err) = timer.handle.await {
                warn!("Sync timer task ended abnormally: {err}");
            }
        }

        self.feed.info("Clearing data...");
        self.finish_stop().await
    }

    /// Re-attempts the clear of a stop that previously failed.
    pub async fn retry_stop(&self) -> Result<SyncState, SyncError> {
        let Ok(_stopping) = self.stop_lock.try_lock() else {
            return Err(SyncError::InvalidTransition {
                from: self.get_state().await,
                action: "retry stop while a clear is running",
            });
        };

        let current = self.get_state().await;
        if current != SyncState::Stopping {
            return Err(SyncError::InvalidTransition {
                from: current,
                action: "retry stop",
            });
        }

        self.feed.info("Clearing data...");
        self.finish_stop().await
    }

    async fn finish_stop(&self) -> Result<SyncState, SyncError> {
        match self.clear_store().await {
            Ok(_) => {
                self.set_state(SyncState::Idle).await;
                info!("Sync stopped");
                Ok(SyncState::Idle)
            }
            Err(err) => {
                self.feed.error(clear_failed(&err));
                Ok(SyncState::Stopping)
            }
        }
    }

    async fn clear_store(&self) -> Result<usize, SyncError> {
        let removed = self.pipeline.clear().await?;
        if removed > 0 {
            self.feed.success("Data cleared successfully.");
        }
        Ok(removed)
    }

    /// One collect-then-publish pass. Failures are reported on the feed and
    /// never abort the pass.
    async fn run_cycle(&self) -> CycleReport {
        self.feed.info("Fetching data...");
        let previous = self.feed.current().snapshot();
        let collection = self.collector.collect(&previous).await;
        let snapshot = collection.snapshot;
        self.feed.set_values(&snapshot);

        self.feed.info("Saving data...");
        let published = match self.save(&snapshot).await {
            Ok(id) => {
                self.feed.mark_published(snapshot.captured_at);
                self.feed.success(success_message(&snapshot));
                Some(id)
            }
            Err(message) => {
                self.feed.error(message);
                None
            }
        };

        CycleReport {
            collection,
            published,
        }
    }

    /// Clears before inserting so the store holds at most one record; the
    /// insert is skipped when the clear fails.
    async fn save(&self, snapshot: &Snapshot) -> Result<RecordId, String> {
        self.clear_store()
            .await
            .map_err(|err| clear_failed(&err))?;
        self.pipeline
            .publish(snapshot)
            .await
            .map_err(|err| err.to_string())
    }

    async fn arm_timer(&self) {
        let mut timer_guard = self.timer.lock().await;
        if let Some(previous) = timer_guard.take() {
            previous.token.cancel();
            previous.handle.abort();
        }

        let token = CancellationToken::new();
        let controller = self.clone();
        let handle = tokio::spawn(controller.timer_loop(token.clone()));

        *timer_guard = Some(RecurringTimer { token, handle });
    }

    /// Sleeps one interval, runs a cycle, and only then sleeps again, so the
    /// next wake-up is scheduled after the previous cycle has finished.
    async fn timer_loop(self, token: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = time::sleep(self.interval) => {}
            }

            if token.is_cancelled() {
                break;
            }

            let report = self.run_cycle().await;
            if report.published.is_none() {
                warn!("Sync cycle did not publish; will retry next interval");
            }
        }

        info!("Sync timer disarmed");
    }

    async fn begin(
        &self,
        allowed: fn(&SyncState) -> bool,
        next: SyncState,
        action: &'static str,
    ) -> Result<(), SyncError> {
        let mut state = self.state.lock().await;
        if !allowed(&*state) {
            return Err(SyncError::InvalidTransition {
                from: *state,
                action,
            });
        }
        *state = next;
        self.feed.set_state(next);
        Ok(())
    }

    async fn set_state(&self, next: SyncState) {
        let mut state = self.state.lock().await;
        *state = next;
        self.feed.set_state(next);
    }
}

fn clear_failed(err: &SyncError) -> String {
    format!("Error clearing data: {err}")
}

fn success_message(snapshot: &Snapshot) -> String {
    format!(
        "{}\n\nData fetched and saved successfully.",
        snapshot.summary()
    )
}
