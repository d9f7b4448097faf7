use serde::{Deserialize, Serialize};

use crate::error::{Result, SmeshmonError};
use crate::layers;
use crate::{EpochId, LayerId, Millis};

/// Longest layer duration accepted, in seconds
pub const MAX_LAYER_DURATION: u64 = 24 * 3_600;

/// The three network parameters all time arithmetic is derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkParameters {
    /// Unix time of layer 0, in milliseconds
    pub genesis_time: Millis,
    /// Layer duration in seconds
    pub layer_duration: u64,
    pub layers_per_epoch: u32,
}

impl NetworkParameters {
    pub fn new(genesis_time: Millis, layer_duration: u64, layers_per_epoch: u32) -> Result<Self> {
        if layer_duration == 0 {
            return Err(SmeshmonError::InvalidNetworkParams(
                "layer duration must be positive".to_string(),
            ));
        }
        if layer_duration > MAX_LAYER_DURATION {
            return Err(SmeshmonError::InvalidNetworkParams(format!(
                "layer duration of {}s exceeds {}s",
                layer_duration, MAX_LAYER_DURATION
            )));
        }
        if layers_per_epoch == 0 {
            return Err(SmeshmonError::InvalidNetworkParams(
                "layers per epoch must be positive".to_string(),
            ));
        }
        Ok(NetworkParameters {
            genesis_time,
            layer_duration,
            layers_per_epoch,
        })
    }

    pub fn epoch_duration(&self) -> Millis {
        layers::epoch_duration(self.layer_duration, self.layers_per_epoch)
    }

    pub fn layer_at(&self, time: Millis) -> i64 {
        layers::layer_at_time(self.layer_duration, self.genesis_time, time)
    }

    pub fn epoch_of_layer(&self, layer: LayerId) -> EpochId {
        layers::epoch_of_layer(self.layers_per_epoch, layer)
    }

    /// Epoch running at `time`, clamped to 0 before genesis
    pub fn epoch_at(&self, time: Millis) -> EpochId {
        layers::to_index(self.layer_at(time))
            .map(|layer| self.epoch_of_layer(layer))
            .unwrap_or(0)
    }

    pub fn layer_start(&self, layer: LayerId) -> Millis {
        self.genesis_time + layers::layer_start_time(self.layer_duration, layer)
    }

    pub fn layer_end(&self, layer: LayerId) -> Millis {
        self.genesis_time + layers::layer_end_time(self.layer_duration, layer)
    }

    pub fn epoch_start(&self, epoch: EpochId) -> Millis {
        self.genesis_time
            + layers::epoch_start_time(self.layer_duration, self.layers_per_epoch, epoch)
    }

    pub fn epoch_end(&self, epoch: EpochId) -> Millis {
        self.genesis_time + layers::epoch_end_time(self.layer_duration, self.layers_per_epoch, epoch)
    }

    pub fn layer_duration_ms(&self) -> Millis {
        self.layer_duration as Millis * layers::SECOND
    }
}

/// Full network info as reported by the node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub params: NetworkParameters,
    pub hrp: String,
    pub genesis_id: String,
    pub effective_genesis_layer: LayerId,
    pub labels_per_unit: u64,
}

/// Longest PoET phase shift or cycle gap accepted from a node
pub const MAX_POET_OFFSET: Millis = 365 * 24 * layers::HOUR;

/// PoET timing configuration, both values in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PoetParameters {
    pub phase_shift: Millis,
    pub cycle_gap: Millis,
}

impl PoetParameters {
    pub fn new(phase_shift: Millis, cycle_gap: Millis) -> Result<Self> {
        for (name, value) in [("phase shift", phase_shift), ("cycle gap", cycle_gap)] {
            if !(0..=MAX_POET_OFFSET).contains(&value) {
                return Err(SmeshmonError::InvalidPoetParams(format!(
                    "{} of {} ms is outside 0..={} ms",
                    name, value, MAX_POET_OFFSET
                )));
            }
        }
        Ok(PoetParameters {
            phase_shift,
            cycle_gap,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoetInfo {
    pub poets: Vec<String>,
    pub config: PoetParameters,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeStatus {
    pub connected_peers: u64,
    pub is_synced: bool,
    pub current_layer: LayerId,
    pub applied_layer: LayerId,
    pub processed_layer: LayerId,
    pub latest_layer: LayerId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_parameters() {
        assert!(NetworkParameters::new(0, 0, 10).is_err());
        assert!(NetworkParameters::new(0, 10, 0).is_err());
        assert!(NetworkParameters::new(0, 10, 10).is_ok());
        assert!(NetworkParameters::new(0, MAX_LAYER_DURATION + 1, 10).is_err());
    }

    #[test]
    fn test_poet_parameters_are_bounded() {
        assert_eq!(
            PoetParameters::new(240 * layers::HOUR, 12 * layers::HOUR).unwrap(),
            PoetParameters {
                phase_shift: 240 * layers::HOUR,
                cycle_gap: 12 * layers::HOUR,
            }
        );
        assert!(PoetParameters::new(0, 0).is_ok());
        assert!(matches!(
            PoetParameters::new(-1, 0),
            Err(SmeshmonError::InvalidPoetParams(_))
        ));
        assert!(PoetParameters::new(0, MAX_POET_OFFSET + 1).is_err());
        assert!(PoetParameters::new(Millis::MAX, 0).is_err());
    }

    #[test]
    fn test_absolute_times() {
        let net = NetworkParameters::new(1_000, 10, 5).unwrap();
        assert_eq!(net.layer_start(2), 21_000);
        assert_eq!(net.layer_end(2), 30_999);
        assert_eq!(net.epoch_start(1), 51_000);
        assert_eq!(net.epoch_end(1), 100_999);
        assert_eq!(net.epoch_at(51_000), 1);
        assert_eq!(net.epoch_at(0), 0);
    }
}
