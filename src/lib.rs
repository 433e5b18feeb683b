pub mod compute;
pub mod config;
pub mod dataset;
pub mod error;
pub mod kv_cache;
pub mod metrics;
pub mod request;
pub mod scheduler;
pub mod simulation;

// Re-export key types
pub use compute::ComputeEngine;
pub use config::Config;
pub use dataset::{DatasetLoader, DatasetStats, WorkloadEntry};
pub use error::{ErrorKind, SimError};
pub use kv_cache::ChannelLedger;
pub use metrics::{MetricsCollector, MetricsSummary};
pub use request::{Request, RequestGenerator};
pub use scheduler::{AssignmentAlgorithm, Scheduler};
pub use simulation::{ProgressInfo, Simulator, Snapshot, TraceEntry, TraceWriter};
