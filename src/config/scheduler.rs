use serde::Deserialize;

fn default_max_batch_size() -> usize {
    256
}

fn default_algorithm() -> String {
    "clb".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Number of requests kept in flight once the batch is warmed up
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Channel assignment algorithm: "rr", "rrn" or "clb" (long names accepted)
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            algorithm: default_algorithm(),
        }
    }
}
