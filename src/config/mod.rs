pub mod hardware;
pub mod model;
pub mod scheduler;
pub mod simulation;
pub mod workload;

pub use hardware::HardwareConfig;
pub use model::ModelConfig;
pub use scheduler::SchedulerConfig;
pub use simulation::SimulationConfig;
pub use workload::{LengthDistribution, WorkloadConfig};

use crate::compute::arithmetic;
use crate::error::SimError;
use crate::scheduler::AssignmentAlgorithm;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Top-level configuration that aggregates all sub-configs
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub hardware: HardwareConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub workload: WorkloadConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config: Config = toml::from_str(contents)?;

        // Fill preset dimensions before anything derives from them
        config.model.resolve()?;

        Ok(config)
    }

    /// Check every section; run before building a scheduler
    pub fn validate(&self) -> Result<(), SimError> {
        let hw = &self.hardware;
        if hw.num_channels == 0 || hw.dram_page_size == 0 || hw.dram_banks_per_ch == 0 {
            return Err(SimError::InvalidConfig(
                "num_channels, dram_page_size and dram_banks_per_ch must be positive".into(),
            ));
        }
        if self.scheduler.max_batch_size == 0 {
            return Err(SimError::InvalidConfig(
                "max_batch_size must be positive".into(),
            ));
        }
        if self.simulation.log_interval == 0 {
            return Err(SimError::InvalidConfig("log_interval must be positive".into()));
        }
        self.model.validate()?;
        self.workload.input_len_dist.validate()?;
        self.workload.output_len_dist.validate()?;
        self.scheduler.algorithm.parse::<AssignmentAlgorithm>()?;
        if self.hardware.kv_tiles_per_channel.is_none() {
            arithmetic::channel_capacity_tiles(&self.model, &self.hardware)?;
        }
        Ok(())
    }

    /// Get a default configuration for testing: 7B, TP=4, PP=1 on 32 channels
    #[cfg(test)]
    pub fn test_default() -> Self {
        let hardware = HardwareConfig {
            name: "Test PIM".to_string(),
            ..HardwareConfig::default()
        };

        let model = ModelConfig {
            name: "Test 7B".to_string(),
            ..ModelConfig::preset(7, 4, 1).expect("7B preset")
        };

        let scheduler = SchedulerConfig {
            max_batch_size: 256,
            algorithm: "rr".to_string(),
        };

        let workload = WorkloadConfig {
            dataset_path: None,
            seed: 42,
            num_templates: 200,
            input_len_dist: LengthDistribution::Uniform { min: 16, max: 512 },
            output_len_dist: LengthDistribution::Uniform { min: 1, max: 128 },
        };

        let simulation = SimulationConfig {
            cycles_per_step: 10,
            num_steps: 200,
            log_interval: 5,
            warmup_steps: 20,
            num_snapshots: 3,
            ..SimulationConfig::default()
        };

        Config {
            hardware,
            model,
            scheduler,
            workload,
            simulation,
        }
    }
}
