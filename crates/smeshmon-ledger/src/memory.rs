use std::collections::{HashMap, HashSet};
use tracing::debug;

use smeshmon_types::{EventKey, Identity, SmesherEvent};

use crate::log::{AppendSummary, EventLog, LogSnapshot};

#[derive(Debug, Clone, Default)]
struct IdentityLog {
    events: Vec<SmesherEvent>,
    keys: HashSet<EventKey>,
    processed: usize,
}

impl IdentityLog {
    /// Insert in `(time, kind)` order; returns the index, or `None` for a known key
    fn insert(&mut self, event: &SmesherEvent) -> Option<usize> {
        if !self.keys.insert(event.key()) {
            return None;
        }
        let sort_key = (event.time, event.kind());
        let pos = self
            .events
            .partition_point(|e| (e.time, e.kind()) <= sort_key);
        self.events.insert(pos, event.clone());
        Some(pos)
    }
}

/// In-memory event log, one ordered history per identity
#[derive(Debug, Clone, Default)]
pub struct MemoryEventLog {
    order: Vec<Identity>,
    logs: HashMap<Identity, IdentityLog>,
    total: usize,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn log_mut(&mut self, id: &Identity, new_identities: &mut Vec<Identity>) -> &mut IdentityLog {
        if !self.logs.contains_key(id) {
            self.order.push(*id);
            new_identities.push(*id);
        }
        self.logs.entry(*id).or_default()
    }
}

impl EventLog for MemoryEventLog {
    fn append(&mut self, batch: &[SmesherEvent]) -> AppendSummary {
        let mut summary = AppendSummary::default();

        for event in batch {
            let log = self.log_mut(&event.smesher, &mut summary.new_identities);
            match log.insert(event) {
                Some(pos) => {
                    if pos < log.processed {
                        log.processed = pos;
                        if !summary.rewound.contains(&event.smesher) {
                            summary.rewound.push(event.smesher);
                        }
                    }
                    summary.added += 1;
                }
                None => summary.duplicates += 1,
            }
        }

        self.total += summary.added;
        if summary.duplicates > 0 || !summary.rewound.is_empty() {
            debug!(
                "merged {} events ({} duplicates, {} identities rewound)",
                summary.added,
                summary.duplicates,
                summary.rewound.len()
            );
        }
        summary
    }

    fn identities(&self) -> &[Identity] {
        &self.order
    }

    fn events(&self, id: &Identity) -> &[SmesherEvent] {
        self.logs.get(id).map(|log| log.events.as_slice()).unwrap_or(&[])
    }

    fn mark_processed(&mut self, id: &Identity, upto: usize) {
        if let Some(log) = self.logs.get_mut(id) {
            log.processed = upto.min(log.events.len());
        }
    }

    fn processed(&self, id: &Identity) -> usize {
        self.logs.get(id).map_or(0, |log| log.processed)
    }

    fn len(&self) -> usize {
        self.total
    }

    fn clear(&mut self) {
        self.order.clear();
        self.logs.clear();
        self.total = 0;
    }

    fn snapshot(&self) -> LogSnapshot {
        LogSnapshot {
            identities: self.order.clone(),
            events: self
                .logs
                .iter()
                .map(|(id, log)| (*id, log.events.clone()))
                .collect(),
            processed: self
                .logs
                .iter()
                .map(|(id, log)| (*id, log.processed))
                .collect(),
        }
    }

    fn restore(&mut self, snapshot: &LogSnapshot) {
        self.clear();
        let mut ignored = Vec::new();
        for id in &snapshot.identities {
            self.log_mut(id, &mut ignored);
        }
        for events in snapshot.events.values() {
            self.append(events);
        }
        for (id, processed) in &snapshot.processed {
            self.mark_processed(id, *processed);
        }
    }
}
