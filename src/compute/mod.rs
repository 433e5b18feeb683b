pub mod arithmetic;

use crate::config::{HardwareConfig, ModelConfig};
use crate::error::SimError;
use crate::request::Request;

/// Evaluates the footprint and cost formulas for one hardware/model pairing
#[derive(Debug, Clone)]
pub struct ComputeEngine {
    hardware: HardwareConfig,
    model: ModelConfig,
    capacity_tiles: u64,
}

impl ComputeEngine {
    pub fn new(hardware: HardwareConfig, model: ModelConfig) -> Result<Self, SimError> {
        model.validate()?;
        let capacity_tiles = match hardware.kv_tiles_per_channel {
            Some(tiles) => tiles,
            None => arithmetic::channel_capacity_tiles(&model, &hardware)?,
        };
        Ok(Self {
            hardware,
            model,
            capacity_tiles,
        })
    }

    /// Per-channel KV-cache budget in tiles
    pub fn channel_capacity_tiles(&self) -> u64 {
        self.capacity_tiles
    }

    pub fn num_channels(&self) -> usize {
        self.hardware.num_channels
    }

    pub fn tile_footprint(&self, request: &Request) -> u64 {
        request.tile_footprint(&self.model, &self.hardware)
    }

    pub fn estimated_latency(&self, request: &Request) -> u64 {
        request.estimated_latency(&self.model, &self.hardware)
    }

    pub fn hardware(&self) -> &HardwareConfig {
        &self.hardware
    }

    pub fn model(&self) -> &ModelConfig {
        &self.model
    }
}
