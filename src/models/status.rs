use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Info,
    Success,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub severity: Severity,
}

impl StatusEvent {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            timestamp: Utc::now(),
            message: message.into(),
            severity,
        }
    }

    pub fn launched() -> Self {
        Self::new("App successfully launched.", Severity::Success)
    }

    /// Local wall-clock rendering, e.g. `10/17/2026, 09:41:07 AM`.
    pub fn display_timestamp(&self) -> String {
        self.timestamp
            .with_timezone(&Local)
            .format("%m/%d/%Y, %I:%M:%S %p")
            .to_string()
    }
}
