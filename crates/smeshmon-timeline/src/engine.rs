use serde::Serialize;
use tracing::{debug, warn};

use smeshmon_ledger::EventLog;
use smeshmon_types::{
    EligibilitiesByIdentity, EpochId, Identity, Millis, NetworkParameters, PoetParameters,
    ProposalsByIdentity, Reward, Rewards,
};

use crate::item::{Group, ItemKey, TimelineItem};
use crate::messages::MessageBoard;
use crate::projector::{EligibilityBook, Projection, ProjectionContext};
use crate::store::TimelineStore;
use crate::window::LookaheadWindow;

/// A display group and the groups nested in it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineGroup {
    pub group: Group,
    pub content: String,
    pub class_name: Option<String>,
    pub nested: Vec<Group>,
}

impl TimelineGroup {
    fn new(group: Group, content: &str, class_name: &str) -> Self {
        TimelineGroup {
            group,
            content: content.to_string(),
            class_name: Some(class_name.to_string()),
            nested: Vec::new(),
        }
    }
}

fn own_rewards<'r>(rewards: &'r Rewards, id: &Identity) -> &'r [Reward] {
    rewards.get(id).map(Vec::as_slice).unwrap_or(&[])
}

/// Owns the timeline of one connection and keeps it in step with the
/// event log, the clock and the reward, proposal and eligibility books.
#[derive(Debug, Default)]
pub struct TimelineEngine {
    net: Option<NetworkParameters>,
    poet: Option<PoetParameters>,
    now: Millis,
    store: TimelineStore,
    window: LookaheadWindow,
    messages: MessageBoard,
    book: EligibilityBook,
    identities: Vec<Identity>,
    /// Layer the clock was in when eligible statuses were last settled
    settled_layer: Option<i64>,
}

impl TimelineEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_network(&mut self, net: NetworkParameters) {
        self.net = Some(net);
        self.advance_window();
    }

    pub fn set_poet(&mut self, poet: PoetParameters) {
        self.poet = Some(poet);
        self.advance_window();
    }

    pub fn network(&self) -> Option<&NetworkParameters> {
        self.net.as_ref()
    }

    pub fn poet(&self) -> Option<&PoetParameters> {
        self.poet.as_ref()
    }

    /// Move the clock; returns `true` when the lookahead window grew
    pub fn tick(&mut self, now: Millis) -> bool {
        self.now = now;
        self.advance_window()
    }

    fn advance_window(&mut self) -> bool {
        let Some(net) = self.net else {
            return false;
        };
        let current = net.epoch_at(self.now);
        self.window
            .advance(&mut self.store, &net, self.poet.as_ref(), current)
    }

    /// Both parameter sets are needed before events can be placed
    pub fn context(&self) -> Option<ProjectionContext> {
        Some(ProjectionContext {
            net: self.net?,
            poet: self.poet?,
            now: self.now,
        })
    }

    fn projection(&mut self, ctx: ProjectionContext) -> Projection<'_> {
        Projection {
            store: &mut self.store,
            messages: &mut self.messages,
            book: &mut self.book,
            ctx,
        }
    }

    /// Project every unprocessed event of `log` and advance its watermarks.
    ///
    /// Returns the number of events consumed. Events that cannot be placed
    /// are logged and still count as processed.
    pub fn project<L: EventLog + ?Sized>(&mut self, log: &mut L, rewards: &Rewards, now: Millis) -> usize {
        self.tick(now);
        let Some(ctx) = self.context() else {
            debug!("network or PoET parameters unknown, deferring projection");
            return 0;
        };

        let identities = log.identities().to_vec();
        let many = identities.len() > 1;
        self.identities.clone_from(&identities);

        let mut total = 0;
        for id in &identities {
            let group = if many { Group::Smesher(*id) } else { Group::Events };
            let own = own_rewards(rewards, id);

            let consumed = {
                let pending = log.pending(id);
                if pending.is_empty() {
                    continue;
                }
                let mut projection = self.projection(ctx);
                for event in pending {
                    if let Err(err) = projection.apply(event, own, group) {
                        warn!("skipping event {}: {}", event.key(), err);
                    }
                }
                projection.apply_rewards(*id, own);
                pending.len()
            };

            let upto = log.processed(id) + consumed;
            log.mark_processed(id, upto);
            total += consumed;
        }

        let layer_now = ctx.layer_now();
        if self.settled_layer.map_or(true, |layer| layer_now > layer) {
            self.expire_eligibilities(ctx, rewards);
            self.settled_layer = Some(layer_now);
        }
        total
    }

    /// Judge every booked eligibility the clock has moved past
    fn expire_eligibilities(&mut self, ctx: ProjectionContext, rewards: &Rewards) {
        let identities = self.book.identities();
        let mut projection = self.projection(ctx);
        for id in identities {
            projection.expire_eligibilities(id, own_rewards(rewards, &id));
        }
    }

    pub fn apply_rewards(&mut self, rewards: &Rewards) {
        let Some(ctx) = self.context() else { return };
        let mut projection = self.projection(ctx);
        for (id, own) in rewards {
            projection.apply_rewards(*id, own);
        }
        self.expire_eligibilities(ctx, rewards);
    }

    pub fn apply_proposals(&mut self, proposals: &ProposalsByIdentity) {
        let Some(ctx) = self.context() else { return };
        let mut projection = self.projection(ctx);
        for (id, own) in proposals {
            projection.apply_proposals(*id, own);
        }
    }

    pub fn apply_eligibilities(&mut self, eligibilities: &EligibilitiesByIdentity, rewards: &Rewards) {
        let Some(ctx) = self.context() else { return };
        let mut projection = self.projection(ctx);
        for (id, epochs) in eligibilities {
            projection.apply_eligibilities(*id, epochs, own_rewards(rewards, id));
        }
    }

    pub fn current_epoch(&self) -> Option<EpochId> {
        self.net.map(|net| net.epoch_at(self.now))
    }

    pub fn epoch_duration(&self) -> Option<Millis> {
        self.net.map(|net| net.epoch_duration())
    }

    pub fn genesis_time(&self) -> Option<Millis> {
        self.net.map(|net| net.genesis_time)
    }

    pub fn window(&self) -> &LookaheadWindow {
        &self.window
    }

    pub fn store(&self) -> &TimelineStore {
        &self.store
    }

    pub fn get(&self, key: &ItemKey) -> Option<&TimelineItem> {
        self.store.get(key)
    }

    pub fn items(&self) -> Vec<TimelineItem> {
        self.store.values().cloned().collect()
    }

    pub fn take_dirty(&mut self) -> Vec<ItemKey> {
        self.store.take_dirty()
    }

    pub fn revision(&self) -> u64 {
        self.store.revision()
    }

    pub fn messages(&self) -> &MessageBoard {
        &self.messages
    }

    /// Fixed groups, plus one nested group per identity once there are several
    pub fn groups(&self) -> Vec<TimelineGroup> {
        let mut events = TimelineGroup::new(Group::Events, "Events", "events");
        let mut smeshers = Vec::new();
        if self.identities.len() > 1 {
            let mut ids = self.identities.clone();
            ids.sort();
            events.nested = ids.iter().map(|id| Group::Smesher(*id)).collect();
            smeshers = ids
                .iter()
                .map(|id| TimelineGroup {
                    group: Group::Smesher(*id),
                    content: id.abbreviated(),
                    class_name: None,
                    nested: Vec::new(),
                })
                .collect();
        }

        let mut groups = vec![
            TimelineGroup::new(Group::Epochs, "Epochs", "epochs"),
            TimelineGroup::new(Group::Layers, "Eligible Layers", "layers"),
            TimelineGroup::new(Group::LayersOverview, "Eligible Layers", "layers optimized"),
            TimelineGroup::new(Group::Poet, "PoET", "poet"),
            events,
        ];
        groups.extend(smeshers);
        groups
    }
}
