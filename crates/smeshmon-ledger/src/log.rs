use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use smeshmon_types::{Identity, SmesherEvent};

/// Per-identity event history with a processing watermark
///
/// Each identity's log is kept in time order. Everything before
/// `processed(id)` has already been projected; `pending(id)` is the rest.
pub trait EventLog {
    /// Merge a batch of events, dropping any already known
    fn append(&mut self, batch: &[SmesherEvent]) -> AppendSummary;

    /// Identities in the order they were first seen
    fn identities(&self) -> &[Identity];

    /// Stable position of an identity in `identities()`
    fn index_of(&self, id: &Identity) -> Option<usize> {
        self.identities().iter().position(|known| known == id)
    }

    fn events(&self, id: &Identity) -> &[SmesherEvent];

    /// Events not yet marked as processed
    fn pending(&self, id: &Identity) -> &[SmesherEvent] {
        let events = self.events(id);
        &events[self.processed(id).min(events.len())..]
    }

    /// Move the watermark of `id` to `upto` (clamped to the log length)
    fn mark_processed(&mut self, id: &Identity, upto: usize);

    fn processed(&self, id: &Identity) -> usize;

    /// Total number of events across all identities
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self);

    fn snapshot(&self) -> LogSnapshot;

    fn restore(&mut self, snapshot: &LogSnapshot);
}

/// What a single `append` changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppendSummary {
    pub added: usize,
    pub duplicates: usize,
    pub new_identities: Vec<Identity>,
    /// Identities whose watermark moved back because of a late event
    pub rewound: Vec<Identity>,
}

impl AppendSummary {
    pub fn is_empty(&self) -> bool {
        self.added == 0
    }
}

/// Serializable copy of a log, watermarks included
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSnapshot {
    pub identities: Vec<Identity>,
    pub events: BTreeMap<Identity, Vec<SmesherEvent>>,
    pub processed: BTreeMap<Identity, usize>,
}
