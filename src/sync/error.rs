use thiserror::Error;

use crate::models::MetricKind;

use super::SyncState;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("{0} type is unavailable.")]
    ProviderUnavailable(MetricKind),

    #[error("Error fetching {}: {cause}.", .metric.label().to_lowercase())]
    ReadFailure { metric: MetricKind, cause: String },

    #[error("querying records failed: {0}.")]
    StoreQuery(String),

    #[error("deleting records failed: {0}.")]
    StoreDelete(String),

    #[error("Error saving data: {0}.")]
    StoreInsert(String),

    #[error("cannot {action} while {from:?}")]
    InvalidTransition { from: SyncState, action: &'static str },
}

impl SyncError {
    pub(crate) fn cause(err: &anyhow::Error) -> String {
        format!("{err:#}")
    }
}
