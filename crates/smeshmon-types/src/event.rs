use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{EpochId, Identity, LayerId, Millis};

/// Discriminant of a smesher event, named after the node's `state` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Unspecified,
    WaitForAtxSynced,
    Retrying,
    WaitingForPoetRegistrationWindow,
    PoetChallengeReady,
    PoetRegistered,
    WaitForPoetRoundEnd,
    PoetProofReceived,
    GeneratingPostProof,
    PostProofReady,
    AtxReady,
    AtxBroadcasted,
    ProposalPublished,
    ProposalPublishFailed,
    ProposalBuildFailed,
    Eligible,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Unspecified => "UNSPECIFIED",
            EventKind::WaitForAtxSynced => "WAIT_FOR_ATX_SYNCED",
            EventKind::Retrying => "RETRYING",
            EventKind::WaitingForPoetRegistrationWindow => "WAITING_FOR_POET_REGISTRATION_WINDOW",
            EventKind::PoetChallengeReady => "POET_CHALLENGE_READY",
            EventKind::PoetRegistered => "POET_REGISTERED",
            EventKind::WaitForPoetRoundEnd => "WAIT_FOR_POET_ROUND_END",
            EventKind::PoetProofReceived => "POET_PROOF_RECEIVED",
            EventKind::GeneratingPostProof => "GENERATING_POST_PROOF",
            EventKind::PostProofReady => "POST_PROOF_READY",
            EventKind::AtxReady => "ATX_READY",
            EventKind::AtxBroadcasted => "ATX_BROADCASTED",
            EventKind::ProposalPublished => "PROPOSAL_PUBLISHED",
            EventKind::ProposalPublishFailed => "PROPOSAL_PUBLISH_FAILED",
            EventKind::ProposalBuildFailed => "PROPOSAL_BUILD_FAILED",
            EventKind::Eligible => "ELIGIBLE",
        }
    }

    /// Human readable title shown on the timeline
    pub fn title(&self) -> &'static str {
        match self {
            EventKind::WaitForAtxSynced => "Wait for ATX sync",
            EventKind::Retrying => "Retrying...",
            EventKind::WaitingForPoetRegistrationWindow => "Waiting for PoET registration",
            EventKind::PoetChallengeReady => "PoET challenge ready",
            EventKind::PoetRegistered => "Registered in PoET",
            EventKind::WaitForPoetRoundEnd => "Wait for PoET round end",
            EventKind::PoetProofReceived => "PoET proof received",
            EventKind::GeneratingPostProof => "Generating PoST proof...",
            EventKind::PostProofReady => "PoST proof is ready",
            EventKind::AtxReady => "ATX is ready",
            EventKind::AtxBroadcasted => "ATX is broadcasted",
            EventKind::ProposalPublished => "Proposal published",
            EventKind::ProposalPublishFailed => "Proposal publish failed",
            EventKind::ProposalBuildFailed => "Proposal build failed",
            EventKind::Eligible => "Eligibility calculated",
            EventKind::Unspecified => "Unknown event",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoetRegistration {
    pub challenge_hash: String,
    pub address: String,
    pub round_id: String,
    pub round_end: Millis,
}

/// Eligible layer with its proposal count (weight)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibleLayer {
    pub layer: LayerId,
    pub count: u32,
}

/// Kind-specific payload of a smesher event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventDetails {
    Unspecified,
    WaitForAtxSynced,
    Retrying {
        message: String,
    },
    WaitingForPoetRegistrationWindow,
    PoetChallengeReady,
    PoetRegistered {
        registrations: Vec<PoetRegistration>,
    },
    WaitForPoetRoundEnd {
        round_end: Millis,
        publish_epoch_end: Millis,
    },
    PoetProofReceived {
        poet_url: String,
    },
    GeneratingPostProof,
    PostProofReady,
    AtxReady,
    AtxBroadcasted {
        atx_id: String,
    },
    ProposalPublished {
        proposal: String,
        layer: LayerId,
    },
    ProposalPublishFailed {
        proposal: String,
        layer: LayerId,
        message: String,
    },
    ProposalBuildFailed {
        layer: Option<LayerId>,
        message: String,
    },
    Eligible {
        epoch: Option<EpochId>,
        layers: Vec<EligibleLayer>,
    },
}

impl EventDetails {
    pub fn kind(&self) -> EventKind {
        match self {
            EventDetails::Unspecified => EventKind::Unspecified,
            EventDetails::WaitForAtxSynced => EventKind::WaitForAtxSynced,
            EventDetails::Retrying { .. } => EventKind::Retrying,
            EventDetails::WaitingForPoetRegistrationWindow => {
                EventKind::WaitingForPoetRegistrationWindow
            }
            EventDetails::PoetChallengeReady => EventKind::PoetChallengeReady,
            EventDetails::PoetRegistered { .. } => EventKind::PoetRegistered,
            EventDetails::WaitForPoetRoundEnd { .. } => EventKind::WaitForPoetRoundEnd,
            EventDetails::PoetProofReceived { .. } => EventKind::PoetProofReceived,
            EventDetails::GeneratingPostProof => EventKind::GeneratingPostProof,
            EventDetails::PostProofReady => EventKind::PostProofReady,
            EventDetails::AtxReady => EventKind::AtxReady,
            EventDetails::AtxBroadcasted { .. } => EventKind::AtxBroadcasted,
            EventDetails::ProposalPublished { .. } => EventKind::ProposalPublished,
            EventDetails::ProposalPublishFailed { .. } => EventKind::ProposalPublishFailed,
            EventDetails::ProposalBuildFailed { .. } => EventKind::ProposalBuildFailed,
            EventDetails::Eligible { .. } => EventKind::Eligible,
        }
    }
}

/// Natural key used to deduplicate events across fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKey {
    pub smesher: Identity,
    pub kind: EventKind,
    pub time: Millis,
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.smesher, self.kind, self.time)
    }
}

/// One entry of an identity's state history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmesherEvent {
    pub smesher: Identity,
    /// Unix time in milliseconds
    pub time: Millis,
    pub publish_epoch: Option<EpochId>,
    pub details: EventDetails,
}

impl SmesherEvent {
    pub fn new(smesher: Identity, time: Millis, details: EventDetails) -> Self {
        SmesherEvent {
            smesher,
            time,
            publish_epoch: None,
            details,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.details.kind()
    }

    pub fn key(&self) -> EventKey {
        EventKey {
            smesher: self.smesher,
            kind: self.kind(),
            time: self.time,
        }
    }

    /// Events rendered with failure styling on the timeline
    pub fn is_failure(&self) -> bool {
        match &self.details {
            EventDetails::Retrying { .. }
            | EventDetails::ProposalBuildFailed { .. }
            | EventDetails::ProposalPublishFailed { .. } => true,
            EventDetails::Eligible { layers, .. } => layers.is_empty(),
            _ => false,
        }
    }
}
