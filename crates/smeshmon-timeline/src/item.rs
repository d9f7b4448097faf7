use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use smeshmon_types::layers::{cycle_gap_end, cycle_gap_start, poet_round_end, poet_round_start};
use smeshmon_types::{
    EpochId, EventDetails, EventKey, Identity, LayerId, Millis, NetworkParameters, PoetParameters,
    RoundId, SmesherEvent,
};

/// Deterministic key of a timeline item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemKey {
    Epoch(EpochId),
    Layer(LayerId),
    PoetRound(RoundId),
    CycleGap(RoundId),
    Event(EventKey),
    /// Placeholder bar shown when layers are too dense to draw
    LayerOverview,
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKey::Epoch(n) => write!(f, "epoch_{}", n),
            ItemKey::Layer(n) => write!(f, "layer_{}", n),
            ItemKey::PoetRound(n) => write!(f, "poet_round_{}", n),
            ItemKey::CycleGap(n) => write!(f, "poet_cycle_gap_{}", n),
            ItemKey::Event(key) => write!(f, "smeshing_{}", key),
            ItemKey::LayerOverview => f.write_str("layer_optimized"),
        }
    }
}

impl Serialize for ItemKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityState {
    Idle,
    Pending,
    Eligible,
    Success,
    Failure,
}

/// Status of one identity on one item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityStatus {
    pub state: IdentityState,
    pub details: Option<String>,
}

impl IdentityStatus {
    pub fn new(state: IdentityState, details: impl Into<String>) -> Self {
        IdentityStatus {
            state,
            details: Some(details.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Epoch,
    Layer,
    PoetRound,
    CycleGap,
    Event,
}

impl ItemKind {
    fn base_class(&self) -> &'static str {
        match self {
            ItemKind::Epoch => "epoch",
            ItemKind::Layer => "layer",
            ItemKind::PoetRound => "poet-round",
            ItemKind::CycleGap => "cycle-gap",
            ItemKind::Event => "smesher-event",
        }
    }
}

/// Aggregate styling of an item, the last status written wins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStyle {
    #[default]
    Neutral,
    Pending,
    Eligible,
    Success,
    Failure,
}

impl From<IdentityState> for ItemStyle {
    fn from(state: IdentityState) -> Self {
        match state {
            IdentityState::Idle => ItemStyle::Neutral,
            IdentityState::Pending => ItemStyle::Pending,
            IdentityState::Eligible => ItemStyle::Eligible,
            IdentityState::Success => ItemStyle::Success,
            IdentityState::Failure => ItemStyle::Failure,
        }
    }
}

/// Display group an item is rendered in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Group {
    Epochs,
    Layers,
    LayersOverview,
    Poet,
    Events,
    Smesher(Identity),
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Group::Epochs => f.write_str("epochs"),
            Group::Layers => f.write_str("layers"),
            Group::LayersOverview => f.write_str("layers_optimized"),
            Group::Poet => f.write_str("poet"),
            Group::Events => f.write_str("events"),
            Group::Smesher(id) => write!(f, "smesher_{}", id),
        }
    }
}

impl Serialize for Group {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineItem {
    pub key: ItemKey,
    pub kind: ItemKind,
    pub group: Group,
    pub subgroup: Option<String>,
    pub title: String,
    pub content: String,
    pub start: Millis,
    /// `None` for point items
    pub end: Option<Millis>,
    pub style: ItemStyle,
    pub identities: BTreeMap<Identity, IdentityStatus>,
    /// Payload of the event a point item stands for
    pub event: Option<EventDetails>,
}

impl TimelineItem {
    fn range(
        key: ItemKey,
        kind: ItemKind,
        group: Group,
        title: String,
        content: String,
        start: Millis,
        end: Millis,
    ) -> Self {
        TimelineItem {
            key,
            kind,
            group,
            subgroup: None,
            title,
            content,
            start,
            end: Some(end),
            style: ItemStyle::Neutral,
            identities: BTreeMap::new(),
            event: None,
        }
    }

    pub fn epoch(net: &NetworkParameters, epoch: EpochId) -> Self {
        TimelineItem::range(
            ItemKey::Epoch(epoch),
            ItemKind::Epoch,
            Group::Epochs,
            format!("Epoch {}", epoch),
            format!("Epoch {}", epoch),
            net.epoch_start(epoch),
            net.epoch_end(epoch),
        )
    }

    pub fn layer(net: &NetworkParameters, layer: LayerId) -> Self {
        TimelineItem::range(
            ItemKey::Layer(layer),
            ItemKind::Layer,
            Group::Layers,
            format!("Layer {}", layer),
            layer.to_string(),
            net.layer_start(layer),
            net.layer_end(layer),
        )
    }

    pub fn poet_round(poet: &PoetParameters, net: &NetworkParameters, round: RoundId) -> Self {
        let mut item = TimelineItem::range(
            ItemKey::PoetRound(round),
            ItemKind::PoetRound,
            Group::Poet,
            format!("PoET Round #{}", round),
            format!("PoET Round {}", round),
            poet_round_start(poet, net, round),
            poet_round_end(poet, net, round),
        );
        item.subgroup = Some("round".to_string());
        item
    }

    pub fn cycle_gap(poet: &PoetParameters, net: &NetworkParameters, round: RoundId) -> Self {
        let mut item = TimelineItem::range(
            ItemKey::CycleGap(round),
            ItemKind::CycleGap,
            Group::Poet,
            format!("CycleGap {}", round),
            format!("CycleGap {}", round),
            cycle_gap_start(poet, net, round),
            cycle_gap_end(poet, net, round),
        );
        item.subgroup = Some("cycleGap".to_string());
        item
    }

    /// Bar spanning every displayed layer, from genesis to the end of `layers`
    pub fn layer_overview(net: &NetworkParameters, layers: LayerId) -> Self {
        let text = "Too many layers to display. Please zoom in...".to_string();
        TimelineItem::range(
            ItemKey::LayerOverview,
            ItemKind::Layer,
            Group::LayersOverview,
            text.clone(),
            text,
            net.genesis_time,
            net.layer_end(layers),
        )
    }

    pub fn event(event: &SmesherEvent, group: Group) -> Self {
        let kind = event.kind();
        TimelineItem {
            key: ItemKey::Event(event.key()),
            kind: ItemKind::Event,
            group,
            subgroup: Some(kind.as_str().to_string()),
            title: kind.title().to_string(),
            content: kind.title().to_string(),
            start: event.time,
            end: None,
            style: if event.is_failure() {
                ItemStyle::Failure
            } else {
                ItemStyle::Neutral
            },
            identities: BTreeMap::new(),
            event: Some(event.details.clone()),
        }
    }

    pub fn status_of(&self, id: &Identity) -> Option<&IdentityStatus> {
        self.identities.get(id)
    }

    /// `Idle` for identities the item knows nothing about
    pub fn state_of(&self, id: &Identity) -> IdentityState {
        self.status_of(id).map_or(IdentityState::Idle, |s| s.state)
    }

    /// CSS-like class, e.g. `layer rewarded` or `poet-round failed`
    pub fn class_name(&self) -> String {
        let base = self.kind.base_class();
        let modifier = match (self.kind, self.style) {
            (_, ItemStyle::Neutral) => None,
            (ItemKind::Event, ItemStyle::Failure) => Some("failure"),
            (ItemKind::Event, _) => None,
            (ItemKind::PoetRound, ItemStyle::Success) => Some("success"),
            (_, ItemStyle::Success) => Some("rewarded"),
            (_, ItemStyle::Pending) => Some("pending"),
            (_, ItemStyle::Eligible) => Some("eligible"),
            (_, ItemStyle::Failure) => Some("failed"),
        };
        match modifier {
            Some(m) => format!("{} {}", base, m),
            None => base.to_string(),
        }
    }
}
