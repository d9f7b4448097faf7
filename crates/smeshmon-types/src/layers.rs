//! Layer, epoch and PoET round arithmetic.
//!
//! All results are integer milliseconds. Times returned by the `layer_*` and
//! `epoch_*` helpers are relative to genesis; the PoET helpers and the methods on
//! [`NetworkParameters`] return absolute timestamps.

use crate::network::{NetworkParameters, PoetParameters};
use crate::{EpochId, LayerId, Millis, RoundId};

pub const SECOND: Millis = 1_000;
pub const MINUTE: Millis = 60 * SECOND;
pub const HOUR: Millis = 60 * MINUTE;

pub fn epoch_of_layer(layers_per_epoch: u32, layer: LayerId) -> EpochId {
    layer / layers_per_epoch
}

pub fn first_layer_of_epoch(layers_per_epoch: u32, epoch: EpochId) -> LayerId {
    epoch * layers_per_epoch
}

pub fn last_layer_of_epoch(layers_per_epoch: u32, epoch: EpochId) -> LayerId {
    first_layer_of_epoch(layers_per_epoch, epoch + 1) - 1
}

pub fn layer_start_time(layer_duration: u64, layer: LayerId) -> Millis {
    layer as Millis * layer_duration as Millis * SECOND
}

/// Inclusive: one millisecond before the next layer starts
pub fn layer_end_time(layer_duration: u64, layer: LayerId) -> Millis {
    layer_start_time(layer_duration, layer + 1) - 1
}

pub fn epoch_start_time(layer_duration: u64, layers_per_epoch: u32, epoch: EpochId) -> Millis {
    layer_start_time(layer_duration, first_layer_of_epoch(layers_per_epoch, epoch))
}

pub fn epoch_end_time(layer_duration: u64, layers_per_epoch: u32, epoch: EpochId) -> Millis {
    layer_end_time(layer_duration, last_layer_of_epoch(layers_per_epoch, epoch))
}

pub fn time_to_next_epoch_start(
    layer_duration: u64,
    layers_per_epoch: u32,
    current_layer: LayerId,
) -> Millis {
    let next_epoch = epoch_of_layer(layers_per_epoch, current_layer) + 1;
    let next_epoch_starts_at = first_layer_of_epoch(layers_per_epoch, next_epoch);
    (next_epoch_starts_at - current_layer) as Millis * layer_duration as Millis * SECOND
}

pub fn epoch_duration(layer_duration: u64, layers_per_epoch: u32) -> Millis {
    layers_per_epoch as Millis * layer_duration as Millis * SECOND
}

/// Layer containing `time`. Negative before genesis; callers treat that as
/// "not started yet".
pub fn layer_at_time(layer_duration: u64, genesis_time: Millis, time: Millis) -> i64 {
    (time - genesis_time).div_euclid(layer_duration as Millis * SECOND)
}

// PoET offsets come from the node; saturate rather than wrap
fn poet_start(poet: &PoetParameters, net: &NetworkParameters) -> Millis {
    net.genesis_time.saturating_add(poet.phase_shift)
}

pub fn poet_round_start(poet: &PoetParameters, net: &NetworkParameters, round: RoundId) -> Millis {
    poet_start(poet, net).saturating_add((round as Millis).saturating_mul(net.epoch_duration()))
}

/// Exclusive: the instant the next round starts
pub fn poet_round_end(poet: &PoetParameters, net: &NetworkParameters, round: RoundId) -> Millis {
    poet_round_start(poet, net, round.saturating_add(1))
}

pub fn cycle_gap_start(poet: &PoetParameters, net: &NetworkParameters, round: RoundId) -> Millis {
    poet_round_start(poet, net, round).saturating_sub(poet.cycle_gap)
}

pub fn cycle_gap_end(poet: &PoetParameters, net: &NetworkParameters, round: RoundId) -> Millis {
    poet_round_start(poet, net, round)
}

/// Round running at `time`; negative before the first round starts
pub fn poet_round_at_time(poet: &PoetParameters, net: &NetworkParameters, time: Millis) -> i64 {
    time.saturating_sub(poet_start(poet, net))
        .div_euclid(net.epoch_duration())
}

/// Narrow a possibly negative index to an id, `None` before genesis
pub fn to_index(value: i64) -> Option<u32> {
    u32::try_from(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_of_layer() {
        assert_eq!(epoch_of_layer(10, 0), 0);
        assert_eq!(epoch_of_layer(10, 10), 1);
        assert_eq!(epoch_of_layer(10, 25), 2);
        assert_eq!(epoch_of_layer(10, 9), 0);
        assert_eq!(epoch_of_layer(6, 65), 10);
    }

    #[test]
    fn test_epoch_layers() {
        assert_eq!(first_layer_of_epoch(10, 0), 0);
        assert_eq!(first_layer_of_epoch(10, 3), 30);
        assert_eq!(first_layer_of_epoch(6, 3), 18);

        assert_eq!(last_layer_of_epoch(10, 0), 9);
        assert_eq!(last_layer_of_epoch(10, 2), 29);
        assert_eq!(last_layer_of_epoch(6, 6), 41);
    }

    #[test]
    fn test_layer_times() {
        assert_eq!(layer_start_time(10, 0), 0);
        assert_eq!(layer_start_time(10, 1), 10 * SECOND);
        assert_eq!(layer_start_time(10, 5), 50 * SECOND);
        assert_eq!(layer_start_time(6, 5), 30 * SECOND);

        assert_eq!(layer_end_time(10, 0), 10 * SECOND - 1);
        assert_eq!(layer_end_time(10, 4), 50 * SECOND - 1);
        assert_eq!(layer_end_time(6, 4), 30 * SECOND - 1);
    }

    #[test]
    fn test_epoch_times() {
        assert_eq!(epoch_start_time(10, 5, 0), 0);
        assert_eq!(epoch_start_time(10, 5, 1), 50 * SECOND);
        assert_eq!(epoch_start_time(6, 5, 1), 30 * SECOND);

        assert_eq!(epoch_end_time(10, 5, 0), 50 * SECOND - 1);
        assert_eq!(epoch_end_time(10, 5, 3), 200 * SECOND - 1);
        assert_eq!(epoch_end_time(6, 5, 3), 120 * SECOND - 1);
    }

    #[test]
    fn test_time_to_next_epoch_start() {
        assert_eq!(time_to_next_epoch_start(10, 5, 0), 50 * SECOND);
        assert_eq!(time_to_next_epoch_start(10, 5, 5), 50 * SECOND);
        assert_eq!(time_to_next_epoch_start(6, 5, 0), 30 * SECOND);
        assert_eq!(time_to_next_epoch_start(6, 5, 5), 30 * SECOND);
        assert_eq!(time_to_next_epoch_start(10, 5, 7), 30 * SECOND);
    }

    #[test]
    fn test_epoch_duration() {
        assert_eq!(epoch_duration(10, 5), 50 * SECOND);
        assert_eq!(epoch_duration(6, 5), 30 * SECOND);
    }

    #[test]
    fn test_layer_at_time_before_genesis() {
        let genesis = 1_000_000;
        assert_eq!(layer_at_time(10, genesis, genesis), 0);
        assert_eq!(layer_at_time(10, genesis, genesis + 9_999), 0);
        assert_eq!(layer_at_time(10, genesis, genesis + 10_000), 1);
        assert_eq!(layer_at_time(10, genesis, genesis - 1), -1);
        assert_eq!(layer_at_time(10, genesis, genesis - 10_001), -2);
        assert_eq!(to_index(-1), None);
        assert_eq!(to_index(3), Some(3));
    }

    #[test]
    fn test_poet_windows() {
        let net = NetworkParameters::new(1_000_000, 10, 5).unwrap();
        let poet = PoetParameters {
            phase_shift: 20 * SECOND,
            cycle_gap: 5 * SECOND,
        };

        assert_eq!(poet_round_start(&poet, &net, 0), 1_020_000);
        assert_eq!(poet_round_end(&poet, &net, 0), 1_070_000);
        assert_eq!(poet_round_start(&poet, &net, 2), 1_120_000);
        assert_eq!(cycle_gap_start(&poet, &net, 2), 1_115_000);
        assert_eq!(cycle_gap_end(&poet, &net, 2), 1_120_000);

        assert_eq!(poet_round_at_time(&poet, &net, 1_020_000), 0);
        assert_eq!(poet_round_at_time(&poet, &net, 1_069_999), 0);
        assert_eq!(poet_round_at_time(&poet, &net, 1_070_000), 1);
        assert_eq!(poet_round_at_time(&poet, &net, 1_000_000), -1);
    }

    #[test]
    fn test_poet_arithmetic_saturates() {
        let net = NetworkParameters::new(1_000_000, 10, 5).unwrap();
        let poet = PoetParameters {
            phase_shift: Millis::MAX,
            cycle_gap: Millis::MAX,
        };

        assert_eq!(poet_round_start(&poet, &net, 0), Millis::MAX);
        assert_eq!(poet_round_end(&poet, &net, RoundId::MAX), Millis::MAX);
        assert_eq!(cycle_gap_start(&poet, &net, 3), 0);
        assert!(poet_round_at_time(&poet, &net, 2_000_000) < 0);
    }
}
