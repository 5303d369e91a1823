use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum MetricKind {
    StepCount,
    StandTime,
}

impl MetricKind {
    pub const TRACKED: [MetricKind; 2] = [MetricKind::StepCount, MetricKind::StandTime];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::StepCount => "StepCount",
            MetricKind::StandTime => "StandTime",
        }
    }

    pub fn unit(&self) -> MetricUnit {
        match self {
            MetricKind::StepCount => MetricUnit::Count,
            MetricKind::StandTime => MetricUnit::Minutes,
        }
    }

    /// Human label used in status messages ("Step Count", "Stand Time").
    pub fn label(&self) -> &'static str {
        match self {
            MetricKind::StepCount => "Step Count",
            MetricKind::StandTime => "Stand Time",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MetricUnit {
    Count,
    Minutes,
}

/// Half-open window `[start, end)` a provider sums samples over.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Start of the local calendar day up to `now`.
    pub fn today_until(now: DateTime<Utc>) -> Self {
        let local_now = now.with_timezone(&Local);
        // DST transitions can make local midnight ambiguous or missing.
        let start = local_now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .and_then(|midnight| Local.from_local_datetime(&midnight).earliest())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(now);

        Self { start, end: now }
    }

    pub fn today() -> Self {
        Self::today_until(Utc::now())
    }

    pub fn elapsed_fraction_of_day(&self) -> f64 {
        let elapsed = (self.end - self.start).num_seconds().max(0) as f64;
        (elapsed / 86_400.0).min(1.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub kind: MetricKind,
    pub unit: MetricUnit,
    pub window: TimeRange,
}

impl Metric {
    pub fn for_today(kind: MetricKind, window: TimeRange) -> Self {
        Self {
            kind,
            unit: kind.unit(),
            window,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn today_window_starts_at_or_before_now() {
        let now = Utc::now();
        let window = TimeRange::today_until(now);
        assert!(window.start <= window.end);
        assert_eq!(window.end, now);
        assert!(now - window.start < Duration::hours(25));
    }

    #[test]
    fn metric_carries_kind_unit() {
        let window = TimeRange::today();
        let steps = Metric::for_today(MetricKind::StepCount, window);
        let stand = Metric::for_today(MetricKind::StandTime, window);
        assert_eq!(steps.unit, MetricUnit::Count);
        assert_eq!(stand.unit, MetricUnit::Minutes);
    }
}
