mod db;
mod health;
mod models;
mod settings;
mod store;
mod sync;
#[cfg(test)]
mod testing;

use std::{io::Write, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use log::{error, info, warn};
use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};

pub use db::{Database, StoredRecord};
pub use health::{MetricsSource, SimulatedMetricsSource, SimulationSettings};
pub use models::{
    Metric, MetricKind, MetricUnit, RecordId, RemoteRecord, Severity, Snapshot, StatusEvent,
    TimeRange,
};
pub use settings::{SettingsStore, SyncSettings};
pub use store::RecordStore;
pub use sync::{
    Collection, CycleReport, PublicationPipeline, SnapshotCollector, StatusFeed, SyncController,
    SyncError, SyncState, SyncStatus, DEFAULT_RECORD_TYPE, DEFAULT_SYNC_INTERVAL,
};

const PRINTER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Headless entry point: syncs until Ctrl-C, then clears the store and exits.
pub fn run() -> Result<()> {
    // RUST_LOG overrides the default level.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("healthsync starting up...");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(serve())
}

async fn serve() -> Result<()> {
    let settings_store = SettingsStore::new(settings::settings_path())?;
    let settings = settings_store.settings();

    let database = Database::new(settings.database_path.clone())?;
    let source = Arc::new(SimulatedMetricsSource::new(settings.simulation.clone()));

    let authorized = source
        .request_authorization(&MetricKind::TRACKED)
        .await
        .unwrap_or_else(|err| {
            error!("Health authorization request failed: {err:#}");
            false
        });
    if !authorized {
        warn!("Health data access was not granted; not starting sync");
        return Ok(());
    }

    let controller = SyncController::new(
        source,
        Arc::new(database),
        settings.record_type.clone(),
        settings.interval(),
    );

    let launched = controller.feed().latest_event();
    println!("[{}] {}", launched.display_timestamp(), launched.message);
    let printer = tokio::spawn(print_events(
        controller.feed().subscribe_events(),
        std::io::stdout(),
    ));

    if controller.start().await? != SyncState::Online {
        drain_printer(controller, printer).await;
        bail!("sync could not start; see the status log above");
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("Shutdown requested");

    let mut state = controller.stop().await?;
    if state == SyncState::Stopping {
        state = controller.retry_stop().await?;
    }
    if state == SyncState::Stopping {
        warn!("Exiting with records still in the store; the next start clears them");
    }

    drain_printer(controller, printer).await;
    Ok(())
}

/// Drops the last feed sender so the printer flushes what is buffered and exits.
async fn drain_printer(controller: SyncController, printer: JoinHandle<()>) {
    drop(controller);
    if tokio::time::timeout(PRINTER_DRAIN_TIMEOUT, printer)
        .await
        .is_err()
    {
        warn!("Status printer did not finish draining");
    }
}

/// Writes each status event until every sender is gone.
async fn print_events<W: Write>(mut events: broadcast::Receiver<StatusEvent>, mut out: W) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if let Err(err) = writeln!(out, "[{}] {}", event.display_timestamp(), event.message)
                {
                    warn!("Failed to print status event: {err}");
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Status printer skipped {skipped} events");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
