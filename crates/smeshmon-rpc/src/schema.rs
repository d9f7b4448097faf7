//! JSON shapes returned by the node's HTTP gateway and their conversion into
//! domain types.
//!
//! The gateway encodes 64-bit integers either as numbers or as decimal strings,
//! binary identifiers as base64 and timestamps as RFC3339. All of that is
//! normalised here so the rest of the workspace only sees `Identity`, `Millis`
//! and `Smidge`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

use smeshmon_types::layers::SECOND;
use smeshmon_types::{
    parse_duration, EligibilitiesByIdentity, Eligibility, EligibleLayer, EpochId, EventDetails,
    EventKind, Identity, LayerId, Millis, NetworkInfo, NetworkParameters, NodeStatus, PoetInfo,
    PoetParameters, PoetRegistration, Proposal, ProposalsByIdentity, Reward, SmeshmonError,
    SmesherEvent, Smidge, IDENTITY_LEN,
};

use crate::{Result, RpcError};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    String(String),
}

fn de_u64<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn de_u32<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = de_u64(deserializer)?;
    u32::try_from(value).map_err(serde::de::Error::custom)
}

fn parse_time(s: &str) -> Result<Millis> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|t| t.timestamp_millis())
        .map_err(|e| SmeshmonError::InvalidTimestamp(format!("{}: {}", s, e)).into())
}

fn base64_to_hex(s: &str) -> Result<String> {
    STANDARD
        .decode(s)
        .map(hex::encode)
        .map_err(|e| RpcError::Decode(format!("invalid base64 {:?}: {}", s, e)))
}

/// Map keys carry identities as hex; fall back to base64 for older gateways
fn parse_identity_key(s: &str) -> Result<Identity> {
    let trimmed = s.trim_start_matches("0x");
    if trimmed.len() == IDENTITY_LEN * 2 {
        Ok(Identity::from_hex(trimmed)?)
    } else {
        Ok(Identity::from_base64(s)?)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfoResponse {
    pub genesis_time: String,
    pub layer_duration: String,
    pub genesis_id: String,
    pub hrp: String,
    pub effective_genesis_layer: LayerId,
    pub layers_per_epoch: u32,
    #[serde(deserialize_with = "de_u64")]
    pub labels_per_unit: u64,
}

/// Layer durations are kept in whole seconds
fn whole_seconds(text: &str) -> Result<u64> {
    let ms = parse_duration(text)?;
    if ms <= 0 || ms % SECOND != 0 {
        return Err(SmeshmonError::InvalidNetworkParams(format!(
            "layer duration {:?} is not a positive whole number of seconds",
            text
        ))
        .into());
    }
    Ok((ms / SECOND) as u64)
}

impl NetworkInfoResponse {
    pub fn into_domain(self) -> Result<NetworkInfo> {
        let genesis_time = parse_time(&self.genesis_time)?;
        let layer_duration = whole_seconds(&self.layer_duration)?;
        let params = NetworkParameters::new(genesis_time, layer_duration, self.layers_per_epoch)?;

        Ok(NetworkInfo {
            params,
            hrp: self.hrp,
            genesis_id: base64_to_hex(&self.genesis_id)?,
            effective_genesis_layer: self.effective_genesis_layer,
            labels_per_unit: self.labels_per_unit,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatusResponse {
    #[serde(default, deserialize_with = "de_u64")]
    pub connected_peers: u64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub latest_layer: LayerId,
    #[serde(default)]
    pub applied_layer: LayerId,
    #[serde(default)]
    pub processed_layer: LayerId,
    #[serde(default)]
    pub current_layer: LayerId,
}

impl NodeStatusResponse {
    pub fn into_domain(self) -> NodeStatus {
        NodeStatus {
            connected_peers: self.connected_peers,
            is_synced: self.status == "SYNC_STATUS_SYNCED",
            current_layer: self.current_layer,
            applied_layer: self.applied_layer,
            processed_layer: self.processed_layer,
            latest_layer: self.latest_layer,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoetConfigResponse {
    pub phase_shift: String,
    pub cycle_gap: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoetInfoResponse {
    #[serde(default)]
    pub poets: Vec<String>,
    pub config: PoetConfigResponse,
}

impl PoetInfoResponse {
    pub fn into_domain(self) -> Result<PoetInfo> {
        Ok(PoetInfo {
            poets: self.poets,
            config: PoetParameters::new(
                parse_duration(&self.config.phase_shift)?,
                parse_duration(&self.config.cycle_gap)?,
            )?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireMessage {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRegistration {
    pub challenge_hash: String,
    pub address: String,
    pub round_id: String,
    pub round_end: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WirePoetRegistered {
    #[serde(default)]
    pub registrations: Vec<WireRegistration>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRoundEnd {
    pub round_end: String,
    pub publish_epoch_end: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePoetProof {
    pub poet_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireAtx {
    pub atx_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireProposalPublished {
    pub proposal: String,
    #[serde(deserialize_with = "de_u32")]
    pub layer: LayerId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireProposalPublishFailed {
    pub proposal: String,
    #[serde(deserialize_with = "de_u32")]
    pub layer: LayerId,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireProposalBuildFailed {
    #[serde(default)]
    pub layer: Option<LayerId>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireEligible {
    #[serde(default)]
    pub epoch: Option<EpochId>,
    #[serde(default)]
    pub layers: Vec<EligibleLayer>,
}

/// A single history record as sent by the node
///
/// The discriminant lives in `state`; its payload sits in a sibling field
/// named after the state in camelCase. Only one payload field is set.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEvent {
    pub smesher: String,
    pub state: EventKind,
    pub time: String,
    #[serde(default)]
    pub publish_epoch: Option<EpochId>,
    #[serde(default)]
    pub retrying: Option<WireMessage>,
    #[serde(default)]
    pub poet_registered: Option<WirePoetRegistered>,
    #[serde(default)]
    pub wait_for_poet_round_end: Option<WireRoundEnd>,
    #[serde(default)]
    pub poet_proof_received: Option<WirePoetProof>,
    #[serde(default)]
    pub atx_broadcasted: Option<WireAtx>,
    #[serde(default)]
    pub proposal_published: Option<WireProposalPublished>,
    #[serde(default)]
    pub proposal_publish_failed: Option<WireProposalPublishFailed>,
    #[serde(default)]
    pub proposal_build_failed: Option<WireProposalBuildFailed>,
    #[serde(default)]
    pub eligible: Option<WireEligible>,
}

fn missing_details(kind: EventKind) -> RpcError {
    RpcError::Decode(format!("{} event without details", kind))
}

impl WireEvent {
    pub fn into_domain(self) -> Result<SmesherEvent> {
        let kind = self.state;
        let details = match kind {
            EventKind::Unspecified => EventDetails::Unspecified,
            EventKind::WaitForAtxSynced => EventDetails::WaitForAtxSynced,
            EventKind::WaitingForPoetRegistrationWindow => {
                EventDetails::WaitingForPoetRegistrationWindow
            }
            EventKind::PoetChallengeReady => EventDetails::PoetChallengeReady,
            EventKind::GeneratingPostProof => EventDetails::GeneratingPostProof,
            EventKind::PostProofReady => EventDetails::PostProofReady,
            EventKind::AtxReady => EventDetails::AtxReady,
            EventKind::Retrying => {
                let retrying = self.retrying.ok_or_else(|| missing_details(kind))?;
                EventDetails::Retrying {
                    message: retrying.message,
                }
            }
            EventKind::PoetRegistered => {
                let registered = self.poet_registered.ok_or_else(|| missing_details(kind))?;
                let registrations = registered
                    .registrations
                    .into_iter()
                    .map(|r| {
                        Ok(PoetRegistration {
                            challenge_hash: base64_to_hex(&r.challenge_hash)?,
                            address: r.address,
                            round_id: r.round_id,
                            round_end: parse_time(&r.round_end)?,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                EventDetails::PoetRegistered { registrations }
            }
            EventKind::WaitForPoetRoundEnd => {
                let wait = self
                    .wait_for_poet_round_end
                    .ok_or_else(|| missing_details(kind))?;
                EventDetails::WaitForPoetRoundEnd {
                    round_end: parse_time(&wait.round_end)?,
                    publish_epoch_end: parse_time(&wait.publish_epoch_end)?,
                }
            }
            EventKind::PoetProofReceived => {
                let proof = self.poet_proof_received.ok_or_else(|| missing_details(kind))?;
                EventDetails::PoetProofReceived {
                    poet_url: proof.poet_url,
                }
            }
            EventKind::AtxBroadcasted => {
                let atx = self.atx_broadcasted.ok_or_else(|| missing_details(kind))?;
                EventDetails::AtxBroadcasted {
                    atx_id: base64_to_hex(&atx.atx_id)?,
                }
            }
            EventKind::ProposalPublished => {
                let published = self.proposal_published.ok_or_else(|| missing_details(kind))?;
                EventDetails::ProposalPublished {
                    proposal: base64_to_hex(&published.proposal)?,
                    layer: published.layer,
                }
            }
            EventKind::ProposalPublishFailed => {
                let failed = self
                    .proposal_publish_failed
                    .ok_or_else(|| missing_details(kind))?;
                EventDetails::ProposalPublishFailed {
                    proposal: base64_to_hex(&failed.proposal)?,
                    layer: failed.layer,
                    message: failed.message,
                }
            }
            EventKind::ProposalBuildFailed => {
                let failed = self
                    .proposal_build_failed
                    .ok_or_else(|| missing_details(kind))?;
                EventDetails::ProposalBuildFailed {
                    layer: failed.layer,
                    message: failed.message,
                }
            }
            EventKind::Eligible => {
                let eligible = self.eligible.ok_or_else(|| missing_details(kind))?;
                EventDetails::Eligible {
                    epoch: eligible.epoch,
                    layers: eligible.layers,
                }
            }
        };

        Ok(SmesherEvent {
            smesher: Identity::from_base64(&self.smesher)?,
            time: parse_time(&self.time)?,
            publish_epoch: self.publish_epoch,
            details,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatesResponse {
    #[serde(default)]
    pub states: Vec<WireEvent>,
}

impl StatesResponse {
    pub fn into_domain(self) -> Result<Vec<SmesherEvent>> {
        self.states.into_iter().map(WireEvent::into_domain).collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireReward {
    pub layer: LayerId,
    #[serde(deserialize_with = "de_u64")]
    pub layer_reward: u64,
    #[serde(deserialize_with = "de_u64")]
    pub total: u64,
    pub coinbase: String,
    pub smesher: String,
}

impl WireReward {
    pub fn into_domain(self) -> Result<Reward> {
        let total = Smidge::new(self.total);
        let reward_for_layer = Smidge::new(self.layer_reward);
        Ok(Reward {
            layer_paid: self.layer,
            reward_for_layer,
            reward_for_fees: total.checked_sub(reward_for_layer)?,
            coinbase: self.coinbase,
            smesher: Identity::from_base64(&self.smesher)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RewardsResponse {
    #[serde(default)]
    pub rewards: Vec<WireReward>,
}

impl RewardsResponse {
    pub fn into_domain(self) -> Result<Vec<Reward>> {
        self.rewards.into_iter().map(WireReward::into_domain).collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireProposals {
    #[serde(default)]
    pub proposals: Vec<Proposal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProposalsResponse {
    #[serde(default)]
    pub proposals: BTreeMap<String, WireProposals>,
}

impl ProposalsResponse {
    pub fn into_domain(self) -> Result<ProposalsByIdentity> {
        self.proposals
            .into_iter()
            .map(|(id, list)| Ok((parse_identity_key(&id)?, list.proposals)))
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireEligibilities {
    #[serde(default)]
    pub eligibilities: Vec<Eligibility>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireEpochs {
    #[serde(default)]
    pub epochs: BTreeMap<String, WireEligibilities>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EligibilitiesResponse {
    #[serde(default)]
    pub identities: BTreeMap<String, WireEpochs>,
}

impl EligibilitiesResponse {
    pub fn into_domain(self) -> Result<EligibilitiesByIdentity> {
        let mut out = EligibilitiesByIdentity::new();
        for (id, epochs) in self.identities {
            let identity = parse_identity_key(&id)?;
            let per_epoch = out.entry(identity).or_default();
            for (epoch, list) in epochs.epochs {
                let epoch: EpochId = epoch
                    .parse()
                    .map_err(|_| RpcError::Decode(format!("invalid epoch key {:?}", epoch)))?;
                per_epoch.insert(epoch, list.eligibilities);
            }
        }
        Ok(out)
    }
}
