use std::collections::HashMap;

use anyhow::{bail, Result};
use async_trait::async_trait;
use log::{info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::models::{Metric, MetricKind, TimeRange};

use super::MetricsSource;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationSettings {
    pub steps_per_day: f64,
    pub stand_minutes_per_day: f64,
    /// Relative noise applied to each reading, e.g. `0.1` for ±10%.
    pub jitter: f64,
    pub step_count_available: bool,
    pub stand_time_available: bool,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            steps_per_day: 9_000.0,
            stand_minutes_per_day: 180.0,
            jitter: 0.1,
            step_count_available: true,
            stand_time_available: true,
        }
    }
}

/// Synthetic provider for hosts without a health store.
///
/// Readings scale with the elapsed part of the day and never decrease within
/// a day, like a real cumulative sum would.
pub struct SimulatedMetricsSource {
    settings: SimulationSettings,
    last: Mutex<HashMap<MetricKind, (TimeRange, f64)>>,
}

impl SimulatedMetricsSource {
    pub fn new(settings: SimulationSettings) -> Self {
        Self {
            settings,
            last: Mutex::new(HashMap::new()),
        }
    }

    fn daily_total(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::StepCount => self.settings.steps_per_day,
            MetricKind::StandTime => self.settings.stand_minutes_per_day,
        }
    }
}

#[async_trait]
impl MetricsSource for SimulatedMetricsSource {
    fn is_available(&self, kind: MetricKind) -> bool {
        match kind {
            MetricKind::StepCount => self.settings.step_count_available,
            MetricKind::StandTime => self.settings.stand_time_available,
        }
    }

    async fn read_sum(&self, metric: &Metric, window: TimeRange) -> Result<Option<f64>> {
        if !self.is_available(metric.kind) {
            bail!("{} is not provided by the simulator", metric.kind.as_str());
        }

        let fraction = window.elapsed_fraction_of_day();
        if fraction == 0.0 {
            return Ok(None);
        }

        let jitter = self.settings.jitter.abs();
        let noise = if jitter > 0.0 {
            rand::thread_rng().gen_range(-jitter..=jitter)
        } else {
            0.0
        };
        let mut value = (self.daily_total(metric.kind) * fraction * (1.0 + noise)).max(0.0);

        let mut last = self.last.lock().await;
        if let Some((previous_window, previous)) = last.get(&metric.kind) {
            if previous_window.start == window.start {
                value = value.max(*previous);
            }
        }
        last.insert(metric.kind, (window, value));

        Ok(Some(value))
    }

    /// Always granted; availability is checked per read, as a real provider does.
    async fn request_authorization(&self, kinds: &[MetricKind]) -> Result<bool> {
        let unavailable: Vec<_> = kinds
            .iter()
            .filter(|kind| !self.is_available(**kind))
            .collect();
        if !unavailable.is_empty() {
            warn!("Simulated provider does not offer {unavailable:?}");
        }
        info!("Simulated health authorization granted for {kinds:?}");
        Ok(true)
    }
}
