use serde::Serialize;
use std::collections::BTreeMap;

use smeshmon_ledger::{EventLog, MemoryEventLog};
use smeshmon_timeline::{StatusMessage, TimelineEngine, TimelineGroup};
use smeshmon_types::{
    EligibilitiesByIdentity, EpochId, Identity, Millis, NetworkInfo, NodeStatus, PoetInfo,
    ProposalsByIdentity, Rewards,
};

use crate::source::{DataSource, SourceKind, SourceStatus};

/// Status of every source at the time of a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceStatuses {
    pub network: SourceStatus,
    pub node_status: SourceStatus,
    pub poet: SourceStatus,
    pub events: SourceStatus,
    pub rewards: SourceStatus,
    pub proposals: SourceStatus,
    pub eligibilities: SourceStatus,
}

/// What a renderer needs besides the items themselves
#[derive(Debug, Clone, Serialize)]
pub struct MonitorSnapshot {
    pub generation: u64,
    pub current_epoch: Option<EpochId>,
    pub epoch_duration: Option<Millis>,
    pub genesis_time: Option<Millis>,
    pub identities: Vec<Identity>,
    pub messages: BTreeMap<Identity, StatusMessage>,
    pub groups: Vec<TimelineGroup>,
    pub revision: u64,
    pub node_status: Option<NodeStatus>,
    pub sources: SourceStatuses,
}

/// Everything one connection has learned so far
#[derive(Debug, Default)]
pub struct SharedState {
    /// Bumped on every connection change; writes from older tasks are dropped
    pub generation: u64,
    pub network: DataSource<NetworkInfo>,
    pub node_status: DataSource<NodeStatus>,
    pub poet: DataSource<PoetInfo>,
    /// Number of events merged into the log
    pub events: DataSource<usize>,
    pub rewards: DataSource<Rewards>,
    pub proposals: DataSource<ProposalsByIdentity>,
    pub eligibilities: DataSource<EligibilitiesByIdentity>,
    pub log: MemoryEventLog,
    pub engine: TimelineEngine,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything and start a new generation
    pub fn reset(&mut self) {
        let generation = self.generation + 1;
        *self = SharedState {
            generation,
            ..SharedState::default()
        };
    }

    pub fn set_error(&mut self, kind: SourceKind, error: impl Into<String>) {
        match kind {
            SourceKind::Network => self.network.set_error(error),
            SourceKind::NodeStatus => self.node_status.set_error(error),
            SourceKind::Poet => self.poet.set_error(error),
            SourceKind::Events => self.events.set_error(error),
            SourceKind::Rewards => self.rewards.set_error(error),
            SourceKind::Proposals => self.proposals.set_error(error),
            SourceKind::Eligibilities => self.eligibilities.set_error(error),
        }
    }

    /// Project events not seen by the timeline yet
    pub fn project(&mut self, now: Millis) -> usize {
        let none = Rewards::new();
        let rewards = self.rewards.data().unwrap_or(&none);
        self.engine.project(&mut self.log, rewards, now)
    }

    /// Replay the reward, proposal and eligibility books onto the timeline
    pub fn apply_books(&mut self) {
        let none = Rewards::new();
        let rewards = self.rewards.data().unwrap_or(&none);
        self.engine.apply_rewards(rewards);
        if let Some(proposals) = self.proposals.data() {
            self.engine.apply_proposals(proposals);
        }
        if let Some(eligibilities) = self.eligibilities.data() {
            self.engine.apply_eligibilities(eligibilities, rewards);
        }
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        MonitorSnapshot {
            generation: self.generation,
            current_epoch: self.engine.current_epoch(),
            epoch_duration: self.engine.epoch_duration(),
            genesis_time: self.engine.genesis_time(),
            identities: self.log.identities().to_vec(),
            messages: self.engine.messages().all().clone(),
            groups: self.engine.groups(),
            revision: self.engine.revision(),
            node_status: self.node_status.data().cloned(),
            sources: SourceStatuses {
                network: self.network.status(),
                node_status: self.node_status.status(),
                poet: self.poet.status(),
                events: self.events.status(),
                rewards: self.rewards.status(),
                proposals: self.proposals.status(),
                eligibilities: self.eligibilities.status(),
            },
        }
    }
}
