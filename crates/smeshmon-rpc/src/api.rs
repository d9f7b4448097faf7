use async_trait::async_trait;
use smeshmon_types::{
    EligibilitiesByIdentity, Identity, NetworkInfo, NodeStatus, PoetInfo, ProposalsByIdentity,
    Reward, SmesherEvent, WindowQuery,
};

use crate::Result;

/// Read-only view of a smeshing node's RPC surface
///
/// Every call is independent; callers own retry and pagination.
#[async_trait]
pub trait SmesherApi: Send + Sync {
    async fn network_info(&self) -> Result<NetworkInfo>;

    async fn node_status(&self) -> Result<NodeStatus>;

    async fn poet_info(&self) -> Result<PoetInfo>;

    /// One page of identity state events in `[from, to]`, ordered and capped at `limit`
    async fn smesher_states_chunk(&self, query: &WindowQuery) -> Result<Vec<SmesherEvent>>;

    /// One offset page of rewards for a single identity
    async fn rewards_chunk(&self, identity: &Identity, limit: usize, offset: usize)
        -> Result<Vec<Reward>>;

    async fn proposals(&self) -> Result<ProposalsByIdentity>;

    async fn eligibilities(&self) -> Result<EligibilitiesByIdentity>;
}
