mod simulated;

pub use simulated::{SimulatedMetricsSource, SimulationSettings};

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Metric, MetricKind, TimeRange};

/// Read-only access to the platform's health metrics.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Whether the provider can resolve this metric type at all.
    fn is_available(&self, kind: MetricKind) -> bool;

    /// Cumulative sum of `metric` over `window`.
    ///
    /// `Ok(None)` means the query ran but there were no samples to sum.
    async fn read_sum(&self, metric: &Metric, window: TimeRange) -> Result<Option<f64>>;

    /// Asks for read access to `kinds`; called once at process start.
    async fn request_authorization(&self, kinds: &[MetricKind]) -> Result<bool>;
}
