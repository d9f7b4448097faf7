use tracing::info;

use smeshmon_types::{EpochId, NetworkParameters, PoetParameters};

use crate::item::TimelineItem;
use crate::store::TimelineStore;

/// Epochs shown ahead of the current one
pub const LOOKAHEAD_EPOCHS: u32 = 5;

/// Tracks how far epoch and PoET items have been created.
///
/// Both watermarks only move forward, so a stale clock or an older
/// parameter snapshot can never shrink the window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookaheadWindow {
    epochs: EpochId,
    rounds: EpochId,
}

impl LookaheadWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of epoch items created, i.e. epochs `[0, epochs_displayed)`
    pub fn epochs_displayed(&self) -> EpochId {
        self.epochs
    }

    pub fn rounds_displayed(&self) -> EpochId {
        self.rounds
    }

    /// Create missing items up to `current_epoch + LOOKAHEAD_EPOCHS`; `true` if anything was added
    pub fn advance(
        &mut self,
        store: &mut TimelineStore,
        net: &NetworkParameters,
        poet: Option<&PoetParameters>,
        current_epoch: EpochId,
    ) -> bool {
        let target = current_epoch.saturating_add(LOOKAHEAD_EPOCHS);
        let mut changed = false;

        if target > self.epochs {
            store.upsert((self.epochs..target).map(|epoch| TimelineItem::epoch(net, epoch)));
            info!("timeline window advanced to epoch {}", target);
            self.epochs = target;
            let layers = target.saturating_mul(net.layers_per_epoch);
            store.upsert([TimelineItem::layer_overview(net, layers)]);
            changed = true;
        }

        if let Some(poet) = poet {
            if target > self.rounds {
                store.upsert((self.rounds..target).flat_map(|round| {
                    [
                        TimelineItem::cycle_gap(poet, net, round),
                        TimelineItem::poet_round(poet, net, round),
                    ]
                }));
                self.rounds = target;
                changed = true;
            }
        }

        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemKey;

    #[test]
    fn test_window_never_regresses() {
        let net = NetworkParameters::new(0, 10, 5).unwrap();
        let poet = PoetParameters {
            phase_shift: 0,
            cycle_gap: 1_000,
        };
        let mut store = TimelineStore::new();
        let mut window = LookaheadWindow::new();

        assert!(window.advance(&mut store, &net, None, 3));
        assert_eq!(window.epochs_displayed(), 8);
        assert_eq!(window.rounds_displayed(), 0);
        assert!(store.contains(&ItemKey::Epoch(7)));
        assert!(!store.contains(&ItemKey::Epoch(8)));
        assert!(!store.contains(&ItemKey::PoetRound(0)));

        // PoET parameters arrive later and catch up
        assert!(window.advance(&mut store, &net, Some(&poet), 3));
        assert!(store.contains(&ItemKey::PoetRound(7)));
        assert!(store.contains(&ItemKey::CycleGap(0)));

        // lower epoch from a stale clock: nothing changes
        let before = store.len();
        assert!(!window.advance(&mut store, &net, Some(&poet), 1));
        assert_eq!(window.epochs_displayed(), 8);
        assert_eq!(store.len(), before);

        assert!(window.advance(&mut store, &net, Some(&poet), 4));
        assert!(store.contains(&ItemKey::Epoch(8)));
        assert!(store.contains(&ItemKey::PoetRound(8)));
        let overview = store.get(&ItemKey::LayerOverview).unwrap();
        assert_eq!(overview.end, Some(net.layer_end(45)));
    }
}
