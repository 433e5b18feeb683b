use serde::Deserialize;
use std::path::PathBuf;

fn default_cycles_per_step() -> u64 {
    10
}

fn default_num_steps() -> u64 {
    50_000
}

fn default_log_interval() -> u64 {
    50
}

fn default_warmup_steps() -> u64 {
    10_000
}

fn default_num_snapshots() -> usize {
    10
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("traces")
}

fn default_trace_label() -> String {
    "synthetic".to_string()
}

/// Run-loop parameters: how long to simulate and when to take snapshots
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Decode cycles advanced per scheduler step
    #[serde(default = "default_cycles_per_step")]
    pub cycles_per_step: u64,

    /// Upper bound on scheduler steps
    #[serde(default = "default_num_steps")]
    pub num_steps: u64,

    /// Steps between samples
    #[serde(default = "default_log_interval")]
    pub log_interval: u64,

    /// Samples taken at or before this step are not written out
    #[serde(default = "default_warmup_steps")]
    pub warmup_steps: u64,

    #[serde(default = "default_num_snapshots")]
    pub num_snapshots: usize,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Prefix of every trace file name, usually the dataset name
    #[serde(default = "default_trace_label")]
    pub trace_label: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            cycles_per_step: default_cycles_per_step(),
            num_steps: default_num_steps(),
            log_interval: default_log_interval(),
            warmup_steps: default_warmup_steps(),
            num_snapshots: default_num_snapshots(),
            output_dir: default_output_dir(),
            trace_label: default_trace_label(),
        }
    }
}
