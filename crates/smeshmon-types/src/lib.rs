mod identity;
mod smidge;
mod event;
mod network;
mod reward;
mod duration;
mod query;
mod error;
pub mod layers;

/// Unix time or duration in milliseconds
pub type Millis = i64;
/// Layer index (sequential counter since genesis)
pub type LayerId = u32;
/// Epoch index
pub type EpochId = u32;
/// PoET round index
pub type RoundId = u32;

pub use identity::{Identity, IDENTITY_LEN};
pub use smidge::Smidge;
pub use event::{EligibleLayer, EventDetails, EventKey, EventKind, PoetRegistration, SmesherEvent};
pub use network::{
    NetworkInfo, NetworkParameters, NodeStatus, PoetInfo, PoetParameters, MAX_LAYER_DURATION,
    MAX_POET_OFFSET,
};
pub use reward::{
    reward_for_layer, EligibilitiesByIdentity, Eligibility, Proposal, ProposalsByIdentity, Reward,
    Rewards,
};
pub use duration::parse_duration;
pub use query::{SortOrder, WindowQuery};
pub use error::{Result, SmeshmonError};
