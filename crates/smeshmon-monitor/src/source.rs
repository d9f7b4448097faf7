use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// The independently polled inputs of the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Network,
    NodeStatus,
    Poet,
    Events,
    Rewards,
    Proposals,
    Eligibilities,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Network => "network info",
            SourceKind::NodeStatus => "node status",
            SourceKind::Poet => "PoET info",
            SourceKind::Events => "smesher states",
            SourceKind::Rewards => "rewards",
            SourceKind::Proposals => "proposals",
            SourceKind::Eligibilities => "eligibilities",
        };
        f.write_str(name)
    }
}

/// Latest value of one source together with its last error.
///
/// A failed poll records the error but keeps the previous data, so a
/// flapping node never blanks the timeline.
#[derive(Debug, Clone)]
pub struct DataSource<T> {
    data: Option<T>,
    error: Option<String>,
    last_update: Option<DateTime<Utc>>,
}

impl<T> Default for DataSource<T> {
    fn default() -> Self {
        DataSource {
            data: None,
            error: None,
            last_update: None,
        }
    }
}

impl<T> DataSource<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_data(&mut self, data: T) {
        self.data = Some(data);
        self.error = None;
        self.last_update = Some(Utc::now());
    }

    pub fn set_error(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.data.is_some()
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    pub fn status(&self) -> SourceStatus {
        SourceStatus {
            loaded: self.is_loaded(),
            error: self.error.clone(),
            last_update: self.last_update,
        }
    }
}

/// Serializable summary of a [`DataSource`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceStatus {
    pub loaded: bool,
    pub error: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
}
