mod config;
mod error;
mod source;
mod state;
mod monitor;

pub use config::MonitorConfig;
pub use error::{MonitorError, Result};
pub use source::{DataSource, SourceKind, SourceStatus};
pub use state::{MonitorSnapshot, SharedState, SourceStatuses};
pub use monitor::{now_millis, Monitor, TimelineChange};
