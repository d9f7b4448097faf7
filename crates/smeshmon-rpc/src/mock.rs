use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use smeshmon_types::{
    EligibilitiesByIdentity, Identity, NetworkInfo, NodeStatus, PoetInfo, ProposalsByIdentity,
    Reward, Rewards, SmesherEvent, SortOrder, WindowQuery,
};

use crate::{Result, RpcError, SmesherApi};

/// A recorded call against [`MockApi`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    NetworkInfo,
    NodeStatus,
    PoetInfo,
    States(WindowQuery),
    Rewards {
        identity: Identity,
        limit: usize,
        offset: usize,
    },
    Proposals,
    Eligibilities,
}

impl MockCall {
    fn method(&self) -> &'static str {
        match self {
            MockCall::NetworkInfo => "network_info",
            MockCall::NodeStatus => "node_status",
            MockCall::PoetInfo => "poet_info",
            MockCall::States(_) => "smesher_states_chunk",
            MockCall::Rewards { .. } => "rewards_chunk",
            MockCall::Proposals => "proposals",
            MockCall::Eligibilities => "eligibilities",
        }
    }
}

#[derive(Default)]
struct MockState {
    network: Option<NetworkInfo>,
    node_status: NodeStatus,
    poet: Option<PoetInfo>,
    events: Vec<SmesherEvent>,
    rewards: Rewards,
    proposals: ProposalsByIdentity,
    eligibilities: EligibilitiesByIdentity,
    failures: HashMap<&'static str, u32>,
    calls: Vec<MockCall>,
}

/// Scripted in-memory node for tests
///
/// Serves whatever has been loaded into it, honouring window and offset
/// semantics, and records every call. `fail_next` injects transient errors.
#[derive(Default)]
pub struct MockApi {
    state: Mutex<MockState>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_network_info(&self, info: NetworkInfo) {
        self.lock().network = Some(info);
    }

    pub fn set_node_status(&self, status: NodeStatus) {
        self.lock().node_status = status;
    }

    pub fn set_poet_info(&self, poet: PoetInfo) {
        self.lock().poet = Some(poet);
    }

    pub fn push_events(&self, events: impl IntoIterator<Item = SmesherEvent>) {
        self.lock().events.extend(events);
    }

    pub fn set_rewards(&self, identity: Identity, rewards: Vec<Reward>) {
        self.lock().rewards.insert(identity, rewards);
    }

    pub fn set_proposals(&self, proposals: ProposalsByIdentity) {
        self.lock().proposals = proposals;
    }

    pub fn set_eligibilities(&self, eligibilities: EligibilitiesByIdentity) {
        self.lock().eligibilities = eligibilities;
    }

    /// Fail the next `times` calls of `method` with a transport error
    pub fn fail_next(&self, method: &'static str, times: u32) {
        self.lock().failures.insert(method, times);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<MockCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.method() == method)
            .cloned()
            .collect()
    }

    fn record(&self, call: MockCall) -> Result<MutexGuard<'_, MockState>> {
        let mut state = self.lock();
        let method = call.method();
        state.calls.push(call);
        if let Some(remaining) = state.failures.get_mut(method) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(RpcError::Transport(format!("injected failure in {}", method)));
            }
        }
        Ok(state)
    }
}

#[async_trait]
impl SmesherApi for MockApi {
    async fn network_info(&self) -> Result<NetworkInfo> {
        let state = self.record(MockCall::NetworkInfo)?;
        state
            .network
            .clone()
            .ok_or_else(|| RpcError::Unavailable("network info".to_string()))
    }

    async fn node_status(&self) -> Result<NodeStatus> {
        let state = self.record(MockCall::NodeStatus)?;
        Ok(state.node_status.clone())
    }

    async fn poet_info(&self) -> Result<PoetInfo> {
        let state = self.record(MockCall::PoetInfo)?;
        state
            .poet
            .clone()
            .ok_or_else(|| RpcError::Unavailable("poet info".to_string()))
    }

    async fn smesher_states_chunk(&self, query: &WindowQuery) -> Result<Vec<SmesherEvent>> {
        let state = self.record(MockCall::States(*query))?;
        let mut page: Vec<SmesherEvent> = state
            .events
            .iter()
            .filter(|e| query.contains(e.time))
            .cloned()
            .collect();
        page.sort_by_key(|e| e.time);
        if query.order == SortOrder::Desc {
            page.reverse();
        }
        page.truncate(query.limit);
        Ok(page)
    }

    async fn rewards_chunk(
        &self,
        identity: &Identity,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Reward>> {
        let state = self.record(MockCall::Rewards {
            identity: *identity,
            limit,
            offset,
        })?;
        Ok(state
            .rewards
            .get(identity)
            .map(|all| all.iter().skip(offset).take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn proposals(&self) -> Result<ProposalsByIdentity> {
        let state = self.record(MockCall::Proposals)?;
        Ok(state.proposals.clone())
    }

    async fn eligibilities(&self) -> Result<EligibilitiesByIdentity> {
        let state = self.record(MockCall::Eligibilities)?;
        Ok(state.eligibilities.clone())
    }
}
