pub mod metric;
pub mod snapshot;
pub mod status;

pub use metric::{Metric, MetricKind, MetricUnit, TimeRange};
pub use snapshot::{RecordId, RemoteRecord, Snapshot};
pub use status::{Severity, StatusEvent};
