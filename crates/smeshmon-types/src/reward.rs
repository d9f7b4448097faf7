use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{EpochId, Identity, LayerId, Smidge};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub layer_paid: LayerId,
    pub reward_for_layer: Smidge,
    pub reward_for_fees: Smidge,
    pub coinbase: String,
    pub smesher: Identity,
}

impl Reward {
    pub fn total(&self) -> Smidge {
        self.reward_for_layer + self.reward_for_fees
    }
}

/// Rewards known for every identity
pub type Rewards = BTreeMap<Identity, Vec<Reward>>;

/// Find the reward paid for `layer` in an identity's reward list
pub fn reward_for_layer(rewards: &[Reward], layer: LayerId) -> Option<&Reward> {
    rewards.iter().find(|r| r.layer_paid == layer)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub layer: LayerId,
    pub proposal: String,
}

pub type ProposalsByIdentity = BTreeMap<Identity, Vec<Proposal>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    pub layer: LayerId,
    pub count: u32,
}

pub type EligibilitiesByIdentity = BTreeMap<Identity, BTreeMap<EpochId, Vec<Eligibility>>>;
