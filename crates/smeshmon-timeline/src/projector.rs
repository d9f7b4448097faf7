//! Turns identity events into item statuses.
//!
//! Every rule writes whole per-identity statuses, never increments, so
//! replaying an event leaves the store as it was after the first pass.
//! Items a rule refers to that do not exist yet (epochs and rounds beyond the
//! lookahead window) are skipped; layers are created on demand.

use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

use smeshmon_types::layers::{poet_round_at_time, to_index};
use smeshmon_types::{
    reward_for_layer, EligibleLayer, Eligibility, EpochId, EventDetails, Identity, LayerId, Millis,
    NetworkParameters, PoetParameters, Proposal, Reward, SmesherEvent,
};

use crate::item::{Group, IdentityState, IdentityStatus, ItemKey, ItemStyle, TimelineItem};
use crate::messages::{MessageBoard, MessageKind};
use crate::store::{ItemPatch, TimelineStore};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("Event at {0} precedes genesis")]
    BeforeGenesis(Millis),

    #[error("Layer out of range at {0}")]
    OutOfRange(Millis),
}

pub type Result<T> = std::result::Result<T, ProjectionError>;

/// Clock and parameters a projection pass runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectionContext {
    pub net: NetworkParameters,
    pub poet: PoetParameters,
    pub now: Millis,
}

impl ProjectionContext {
    pub fn layer_now(&self) -> i64 {
        self.net.layer_at(self.now)
    }

    pub fn current_epoch(&self) -> EpochId {
        self.net.epoch_at(self.now)
    }

    pub fn current_round(&self) -> i64 {
        poet_round_at_time(&self.poet, &self.net, self.now)
    }
}

/// Layers an identity was found eligible in, per epoch, with their weight.
///
/// Kept for the whole connection so that a proposal event can be judged
/// against eligibilities reported in earlier batches.
#[derive(Debug, Clone, Default)]
pub struct EligibilityBook {
    entries: BTreeMap<(Identity, EpochId), BTreeMap<LayerId, u32>>,
}

impl EligibilityBook {
    pub fn record(&mut self, id: Identity, epoch: EpochId, layer: LayerId, weight: u32) {
        self.entries.entry((id, epoch)).or_default().insert(layer, weight);
    }

    pub fn layers(&self, id: &Identity, epoch: EpochId) -> Vec<LayerId> {
        self.entries
            .get(&(*id, epoch))
            .map(|layers| layers.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn weight(&self, id: &Identity, epoch: EpochId, layer: LayerId) -> Option<u32> {
        self.entries.get(&(*id, epoch))?.get(&layer).copied()
    }

    pub fn identities(&self) -> Vec<Identity> {
        let mut ids: Vec<Identity> = self.entries.keys().map(|(id, _)| *id).collect();
        ids.dedup();
        ids
    }

    /// Every recorded epoch of `id` with its layers and weights
    pub fn epochs_of(&self, id: &Identity) -> Vec<(EpochId, BTreeMap<LayerId, u32>)> {
        self.entries
            .range((*id, EpochId::MIN)..=(*id, EpochId::MAX))
            .map(|((_, epoch), layers)| (*epoch, layers.clone()))
            .collect()
    }
}

/// Reward outcome of an epoch given the layers the identity was eligible in
fn epoch_rewards_outcome(
    epoch: EpochId,
    eligible: &[LayerId],
    rewards: &[Reward],
    epoch_passed: bool,
) -> (IdentityState, String) {
    let unpaid: Vec<LayerId> = eligible
        .iter()
        .copied()
        .filter(|l| reward_for_layer(rewards, *l).is_none())
        .collect();

    if !eligible.is_empty() && unpaid.is_empty() {
        (
            IdentityState::Success,
            format!("Got all rewards for epoch {}", epoch),
        )
    } else if epoch_passed && eligible.is_empty() {
        (IdentityState::Idle, "No known eligibilities".to_string())
    } else if epoch_passed {
        (
            IdentityState::Failure,
            format!("Missed rewards for layers {}", join_layers(unpaid)),
        )
    } else {
        (IdentityState::Eligible, "Getting rewards...".to_string())
    }
}

fn join_layers(layers: impl IntoIterator<Item = LayerId>) -> String {
    layers
        .into_iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Where an event sits on the timeline
struct EventPosition {
    layer: LayerId,
    epoch: EpochId,
    round: i64,
}

/// One projection pass over the shared timeline state
pub struct Projection<'a> {
    pub store: &'a mut TimelineStore,
    pub messages: &'a mut MessageBoard,
    pub book: &'a mut EligibilityBook,
    pub ctx: ProjectionContext,
}

impl<'a> Projection<'a> {
    fn position(&self, time: Millis) -> Result<EventPosition> {
        if time < self.ctx.net.genesis_time {
            return Err(ProjectionError::BeforeGenesis(time));
        }
        let layer = to_index(self.ctx.net.layer_at(time)).ok_or(ProjectionError::OutOfRange(time))?;
        Ok(EventPosition {
            layer,
            epoch: self.ctx.net.epoch_of_layer(layer),
            round: poet_round_at_time(&self.ctx.poet, &self.ctx.net, time),
        })
    }

    /// Patch an existing item; missing items are skipped
    fn mark(&mut self, key: ItemKey, id: Identity, state: IdentityState, details: impl Into<String>) -> bool {
        let hit = self
            .store
            .patch(key, ItemPatch::status(id, IdentityStatus::new(state, details)));
        if !hit {
            debug!("{} not on the timeline yet, skipping", key);
        }
        hit
    }

    fn mark_index(&mut self, key: impl Fn(u32) -> ItemKey, index: i64, id: Identity, state: IdentityState, details: impl Into<String>) -> bool {
        match to_index(index) {
            Some(index) => self.mark(key(index), id, state, details),
            None => false,
        }
    }

    /// Patch a layer, creating its item first if needed
    fn mark_layer(&mut self, layer: LayerId, id: Identity, state: IdentityState, details: impl Into<String>) {
        let key = ItemKey::Layer(layer);
        if !self.store.contains(&key) {
            self.store.upsert([TimelineItem::layer(&self.ctx.net, layer)]);
        }
        self.mark(key, id, state, details);
    }

    fn style_of(&self, key: &ItemKey) -> Option<ItemStyle> {
        self.store.get(key).map(|item| item.style)
    }

    fn has_item(&self, key: impl Fn(u32) -> ItemKey, index: i64) -> bool {
        to_index(index).map_or(false, |i| self.store.contains(&key(i)))
    }

    /// Status of an eligible layer judged by rewards and the clock
    fn eligible_layer_status(&self, layer: LayerId, weight: u32, rewards: &[Reward]) -> IdentityStatus {
        if let Some(reward) = reward_for_layer(rewards, layer) {
            IdentityStatus::new(
                IdentityState::Success,
                format!(
                    "Got reward for Layer {}: {} to {} (weight {})",
                    layer,
                    reward.total(),
                    reward.coinbase,
                    weight
                ),
            )
        } else if self.ctx.layer_now() > layer as i64 {
            IdentityStatus::new(
                IdentityState::Failure,
                format!("Missed publishing proposal at layer {}", layer),
            )
        } else {
            IdentityStatus::new(IdentityState::Eligible, format!("Eligible in Layer {}", layer))
        }
    }

    /// Apply one event of identity `event.smesher`
    pub fn apply(&mut self, event: &SmesherEvent, rewards: &[Reward], group: Group) -> Result<()> {
        let at = self.position(event.time)?;
        let id = event.smesher;

        match &event.details {
            EventDetails::Eligible { layers, .. } => self.on_eligible(id, &at, layers, rewards),
            EventDetails::ProposalPublished { layer, .. } => {
                self.on_proposal_published(id, &at, *layer, rewards)
            }
            EventDetails::ProposalBuildFailed { message, .. } => {
                self.on_proposal_failed(id, &at, "Proposal build", message)
            }
            EventDetails::ProposalPublishFailed { message, .. } => {
                self.on_proposal_failed(id, &at, "Proposal publish", message)
            }
            EventDetails::AtxBroadcasted { .. } => self.on_atx_broadcasted(id, &at),
            EventDetails::PoetProofReceived { .. } => self.on_poet_proof(id, &at),
            EventDetails::PoetRegistered { .. } => self.on_poet_registered(id, &at),
            EventDetails::WaitingForPoetRegistrationWindow => self.on_waiting_for_window(id, &at),
            EventDetails::GeneratingPostProof => {
                self.messages
                    .set(id, MessageKind::Success, "Generating PoST proof...", false);
            }
            EventDetails::WaitForPoetRoundEnd { .. } => {
                self.messages
                    .set(id, MessageKind::Pending, "Waiting for PoET round end...", true);
            }
            EventDetails::WaitForAtxSynced => {
                self.messages
                    .set(id, MessageKind::Pending, "Waiting for ATX sync...", false);
            }
            EventDetails::Retrying { message } => {
                self.messages.set(
                    id,
                    MessageKind::Failed,
                    format!("Retrying due to error: {}", message),
                    false,
                );
            }
            EventDetails::Unspecified
            | EventDetails::PoetChallengeReady
            | EventDetails::PostProofReady
            | EventDetails::AtxReady => {}
        }

        self.store.upsert([TimelineItem::event(event, group)]);
        Ok(())
    }

    fn on_eligible(&mut self, id: Identity, at: &EventPosition, layers: &[EligibleLayer], rewards: &[Reward]) {
        for eligible in layers {
            let epoch = self.ctx.net.epoch_of_layer(eligible.layer);
            self.book.record(id, epoch, eligible.layer, eligible.count);
            let status = self.eligible_layer_status(eligible.layer, eligible.count, rewards);
            let details = status.details.unwrap_or_default();
            self.mark_layer(eligible.layer, id, status.state, details);
        }

        let epoch_key = ItemKey::Epoch(at.epoch);
        if layers.is_empty() {
            self.messages.set(
                id,
                MessageKind::Failed,
                format!("Not eligible in any layer in epoch {}", at.epoch),
                false,
            );
            // A node that just started reports no eligibility for the
            // running epoch; only flag epochs that already carry a status.
            if self.style_of(&epoch_key) == Some(ItemStyle::Neutral) {
                debug!("no eligibility in untouched epoch {}, not flagging", at.epoch);
                return;
            }
            self.mark(epoch_key, id, IdentityState::Failure, "Not eligible in any layer");
        } else {
            let listed = join_layers(layers.iter().map(|l| l.layer));
            self.messages.set(
                id,
                MessageKind::Success,
                format!("Eligible in Layers {} in epoch {}", listed, at.epoch),
                false,
            );
            self.mark(
                epoch_key,
                id,
                IdentityState::Eligible,
                format!("Eligible in Layers {}", listed),
            );
        }
    }

    fn on_proposal_published(&mut self, id: Identity, at: &EventPosition, layer: LayerId, rewards: &[Reward]) {
        self.messages.set(
            id,
            MessageKind::Success,
            format!("Proposal published for Layer {} in epoch {}", layer, at.epoch),
            false,
        );
        self.mark_layer(layer, id, IdentityState::Success, "Proposal published");

        let eligible = self.book.layers(&id, at.epoch);
        let epoch_passed = self.ctx.current_epoch() > at.epoch;
        let (state, details) = epoch_rewards_outcome(at.epoch, &eligible, rewards, epoch_passed);
        self.mark(ItemKey::Epoch(at.epoch), id, state, details);
    }

    fn on_proposal_failed(&mut self, id: Identity, at: &EventPosition, what: &str, message: &str) {
        self.messages
            .set(id, MessageKind::Failed, format!("{} failed", what), false);
        self.mark(ItemKey::Epoch(at.epoch), id, IdentityState::Failure, message);
        self.mark_layer(
            at.layer,
            id,
            IdentityState::Failure,
            format!("{} failed: {}", what, message),
        );
    }

    fn on_atx_broadcasted(&mut self, id: Identity, at: &EventPosition) {
        let affected = at.epoch + 1;
        let key = ItemKey::Epoch(affected);
        if !self.store.contains(&key) {
            debug!("{} not on the timeline yet, skipping", key);
            return;
        }
        if self.ctx.current_epoch() > affected {
            self.messages.set(
                id,
                MessageKind::Failed,
                format!("Did not publish any proposal in epoch {}", affected),
                false,
            );
            self.mark(key, id, IdentityState::Failure, "Missed publishing proposals");
        } else {
            self.messages.set(
                id,
                MessageKind::Success,
                format!("ATX is broadcasted in epoch {}", affected),
                false,
            );
            self.mark(
                key,
                id,
                IdentityState::Eligible,
                "ATX is broadcasted. Waiting for rewards...",
            );
        }
    }

    fn on_poet_proof(&mut self, id: Identity, at: &EventPosition) {
        if self.mark_index(ItemKey::PoetRound, at.round, id, IdentityState::Success, "PoET proof received") {
            self.messages.set(
                id,
                MessageKind::Success,
                format!("PoET proof received in round {}", at.round),
                false,
            );
        }

        let affected = at.round + 2;
        if self.ctx.current_epoch() as i64 > affected {
            self.mark_index(
                ItemKey::Epoch,
                affected,
                id,
                IdentityState::Failure,
                "Did not publish Activation Transaction in time",
            );
        } else {
            self.mark_index(
                ItemKey::Epoch,
                affected,
                id,
                IdentityState::Pending,
                "PoET proof received, going to publish Activation Transaction",
            );
        }
    }

    fn on_poet_registered(&mut self, id: Identity, at: &EventPosition) {
        let round = at.round + 1;
        let epoch = round + 2;
        if !self.has_item(ItemKey::PoetRound, round) {
            debug!("poet round {} not on the timeline yet, skipping", round);
            return;
        }

        if self.ctx.current_round() > round {
            let details = format!("Did not receive PoET proof for round {} in time", round);
            self.messages.set(
                id,
                MessageKind::Failed,
                format!("{}. Will not have rewards in epoch {}", details, epoch),
                false,
            );
            self.mark_index(ItemKey::PoetRound, round, id, IdentityState::Failure, details.clone());
            self.mark_index(ItemKey::Epoch, epoch, id, IdentityState::Failure, details);
        } else {
            self.messages.set(
                id,
                MessageKind::Success,
                format!("Registered in PoET round {}", round),
                false,
            );
            self.mark_index(ItemKey::PoetRound, round, id, IdentityState::Eligible, "Registered in PoET");
            self.mark_index(
                ItemKey::Epoch,
                epoch,
                id,
                IdentityState::Eligible,
                "Registered in PoET. Waiting for PoET proof...",
            );
        }
    }

    fn on_waiting_for_window(&mut self, id: Identity, at: &EventPosition) {
        let round = at.round + 1;
        let epoch = round + 2;
        if !self.has_item(ItemKey::PoetRound, round) {
            debug!("poet round {} not on the timeline yet, skipping", round);
            return;
        }

        if round < self.ctx.current_round() {
            self.messages.set(
                id,
                MessageKind::Failed,
                format!("Missed PoET registration window in round {}", round),
                false,
            );
            self.mark_index(
                ItemKey::PoetRound,
                round,
                id,
                IdentityState::Failure,
                "Missed PoET registration window",
            );
            self.mark_index(
                ItemKey::Epoch,
                epoch,
                id,
                IdentityState::Failure,
                "Missed PoET registration window",
            );
        } else {
            self.messages.set(
                id,
                MessageKind::Pending,
                format!("Waiting for PoET registration window in round {}", round),
                false,
            );
            self.mark_index(
                ItemKey::PoetRound,
                round,
                id,
                IdentityState::Pending,
                "Waiting for PoET registration window",
            );
        }
    }

    /// Settle what the clock has decided since the statuses of `id` were written.
    ///
    /// Eligible layers that have passed are judged against `rewards`, and the
    /// reward aggregate of every ended epoch in the book is settled. Only
    /// statuses still `Eligible` are rewritten, so a repeated pass is a no-op.
    pub fn expire_eligibilities(&mut self, id: Identity, rewards: &[Reward]) {
        let layer_now = self.ctx.layer_now();
        let current_epoch = self.ctx.current_epoch();

        for (epoch, layers) in self.book.epochs_of(&id) {
            for (layer, weight) in &layers {
                if *layer as i64 >= layer_now || !self.still_eligible(ItemKey::Layer(*layer), &id) {
                    continue;
                }
                let status = self.eligible_layer_status(*layer, *weight, rewards);
                let details = status.details.unwrap_or_default();
                self.mark(ItemKey::Layer(*layer), id, status.state, details);
            }

            let key = ItemKey::Epoch(epoch);
            if epoch >= current_epoch || !self.still_eligible(key, &id) {
                continue;
            }
            let eligible: Vec<LayerId> = layers.keys().copied().collect();
            let (state, details) = epoch_rewards_outcome(epoch, &eligible, rewards, true);
            self.mark(key, id, state, details);
        }
    }

    fn still_eligible(&self, key: ItemKey, id: &Identity) -> bool {
        self.store
            .get(&key)
            .map_or(false, |item| item.state_of(id) == IdentityState::Eligible)
    }

    /// Mark every rewarded layer of `id` as a success
    pub fn apply_rewards(&mut self, id: Identity, rewards: &[Reward]) {
        for reward in rewards {
            self.mark_layer(
                reward.layer_paid,
                id,
                IdentityState::Success,
                format!(
                    "Got reward for Layer {}: {} to {}",
                    reward.layer_paid,
                    reward.total(),
                    reward.coinbase
                ),
            );
        }
    }

    /// Mark layers with a published proposal, keeping richer success statuses
    pub fn apply_proposals(&mut self, id: Identity, proposals: &[Proposal]) {
        for proposal in proposals {
            let key = ItemKey::Layer(proposal.layer);
            let known = self.store.get(&key).map(|item| item.state_of(&id));
            if known == Some(IdentityState::Success) {
                continue;
            }
            self.mark_layer(proposal.layer, id, IdentityState::Success, "Proposal published");
        }
    }

    /// Record reported eligibilities and fill in layers the events have not covered
    pub fn apply_eligibilities(
        &mut self,
        id: Identity,
        epochs: &BTreeMap<EpochId, Vec<Eligibility>>,
        rewards: &[Reward],
    ) {
        for (epoch, eligibilities) in epochs {
            for eligibility in eligibilities {
                self.book.record(id, *epoch, eligibility.layer, eligibility.count);
                let key = ItemKey::Layer(eligibility.layer);
                let known = self
                    .store
                    .get(&key)
                    .map_or(false, |item| item.status_of(&id).is_some());
                if known {
                    continue;
                }
                let status = self.eligible_layer_status(eligibility.layer, eligibility.count, rewards);
                let details = status.details.unwrap_or_default();
                self.mark_layer(eligibility.layer, id, status.state, details);
            }
        }
    }
}
