mod api;
mod error;
mod schema;
mod http;
mod mock;

pub use api::SmesherApi;
pub use error::{Result, RpcError};
pub use http::HttpApi;
pub use mock::{MockApi, MockCall};
pub use schema::{
    EligibilitiesResponse, NetworkInfoResponse, NodeStatusResponse, PoetInfoResponse,
    ProposalsResponse, RewardsResponse, StatesResponse, WireEvent, WireReward,
};

#[cfg(test)]
mod tests;
