use crate::compute::ComputeEngine;
use crate::config::{Config, SimulationConfig};
use crate::dataset::{DatasetLoader, WorkloadEntry};
use crate::error::SimError;
use crate::metrics::{MetricsCollector, MetricsSummary};
use crate::request::RequestGenerator;
use crate::scheduler::Scheduler;
use serde::Serialize;

/// One row of a trace: a request's current length and the channel holding it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TraceEntry {
    pub seq_len: u32,
    pub channel: usize,
}

/// The ongoing batch captured after warm-up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// 0-based position among the snapshots of this run
    pub index: usize,
    pub step: u64,
    pub cycle: u64,
    pub entries: Vec<TraceEntry>,
}

pub struct ProgressInfo<'a> {
    pub step: u64,
    pub total_steps: u64,
    pub cycle_count: u64,
    pub ongoing: usize,
    pub completed_requests: u64,
    pub mean_seq_len: f64,
    /// NaN when no step was recorded since the previous report
    pub mean_latency_spread: f64,
    pub min_tiles_left: i64,
    pub utilization: f64,
    /// Set when this report coincides with a new snapshot
    pub snapshot: Option<&'a Snapshot>,
}

pub struct Simulator {
    scheduler: Scheduler,
    metrics: MetricsCollector,
    config: SimulationConfig,
    steps_run: u64,
}

impl Simulator {
    /// Build a simulator, importing the dataset if one is configured
    pub fn new(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        config.validate()?;

        let generator = match &config.workload.dataset_path {
            Some(path) => {
                let (entries, _stats) = DatasetLoader::load(path)?;
                RequestGenerator::from_entries(
                    &entries,
                    config.model.max_seq_len,
                    config.workload.seed,
                )?
            }
            None => RequestGenerator::synthetic(&config.workload, config.model.max_seq_len)?,
        };
        Ok(Self::new_with_generator(config, generator)?)
    }

    /// Build a simulator over already imported rows
    pub fn new_with_entries(config: Config, entries: &[WorkloadEntry]) -> Result<Self, SimError> {
        let generator =
            RequestGenerator::from_entries(entries, config.model.max_seq_len, config.workload.seed)?;
        Self::new_with_generator(config, generator)
    }

    pub fn new_with_generator(
        config: Config,
        generator: RequestGenerator,
    ) -> Result<Self, SimError> {
        config.validate()?;

        let engine = ComputeEngine::new(config.hardware, config.model)?;
        let scheduler = Scheduler::new(config.scheduler, engine, generator)?;

        Ok(Self {
            scheduler,
            metrics: MetricsCollector::new(),
            config: config.simulation,
            steps_run: 0,
        })
    }

    /// Run the simulation with progress callbacks and return the snapshots taken.
    ///
    /// The callback fires every `log_interval` steps. Once past warm-up, each
    /// of those reports also captures a snapshot; the run stops early when
    /// `num_snapshots` have been taken.
    pub fn run_with_callback<F>(&mut self, mut callback: F) -> Result<Vec<Snapshot>, SimError>
    where
        F: FnMut(ProgressInfo),
    {
        let mut snapshots = Vec::new();
        if self.config.num_snapshots == 0 {
            return Ok(snapshots);
        }

        log::info!(
            "running {} steps of {} cycles, {} snapshots after step {}",
            self.config.num_steps,
            self.config.cycles_per_step,
            self.config.num_snapshots,
            self.config.warmup_steps
        );

        for i in 0..self.config.num_steps {
            self.scheduler.step(self.config.cycles_per_step)?;
            self.steps_run += 1;

            let ledger = self.scheduler.ledger();
            self.metrics.record_step(&ledger);

            if i % self.config.log_interval != 0 {
                continue;
            }

            let max_batch_size = self.scheduler.max_batch_size();
            if self.scheduler.num_ongoing() != max_batch_size {
                return Err(SimError::BatchSizeMismatch {
                    queued: self.scheduler.num_queued(),
                    ongoing: self.scheduler.num_ongoing(),
                    max_batch_size,
                });
            }

            let mean_seq_len = self.metrics.record_interval_seq_len(self.scheduler.ongoing());
            let mean_latency_spread = self.metrics.get_interval_latency_spread();

            let (cycle, ongoing) = self.scheduler.snapshot();
            let snapshot = if i > self.config.warmup_steps {
                let entries = ongoing
                    .iter()
                    .filter_map(|r| {
                        r.channel().map(|channel| TraceEntry {
                            seq_len: r.sequence_length(),
                            channel,
                        })
                    })
                    .collect();
                snapshots.push(Snapshot {
                    index: snapshots.len(),
                    step: i,
                    cycle,
                    entries,
                });
                self.metrics.snapshots_taken += 1;
                log::info!("snapshot {} at cycle {}", snapshots.len() - 1, cycle);
                snapshots.last()
            } else {
                None
            };

            callback(ProgressInfo {
                step: i,
                total_steps: self.config.num_steps,
                cycle_count: cycle,
                ongoing: ongoing.len(),
                completed_requests: self.scheduler.completed_requests(),
                mean_seq_len,
                mean_latency_spread,
                min_tiles_left: ledger.min_tiles_left(),
                utilization: ledger.utilization(),
                snapshot,
            });

            if snapshots.len() == self.config.num_snapshots {
                break;
            }
        }

        if snapshots.len() < self.config.num_snapshots {
            log::warn!(
                "only {} of {} snapshots taken; raise num_steps or lower warmup_steps",
                snapshots.len(),
                self.config.num_snapshots
            );
        }

        Ok(snapshots)
    }

    pub fn run(&mut self) -> Result<Vec<Snapshot>, SimError> {
        self.run_with_callback(|_| {})
    }

    pub fn get_metrics_summary(&self) -> MetricsSummary {
        self.metrics.compute_summary(
            self.scheduler.completed_requests(),
            self.scheduler.assignments_per_channel(),
        )
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn steps_run(&self) -> u64 {
        self.steps_run
    }

    pub fn get_current_cycle(&self) -> u64 {
        self.scheduler.cycle_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HardwareConfig, LengthDistribution};
    use crate::error::ErrorKind;

    fn create_minimal_test_config() -> Config {
        let mut config = Config::test_default();
        config.scheduler.max_batch_size = 64;
        config
    }

    #[test]
    fn test_snapshots_after_warmup() {
        let config = create_minimal_test_config();
        let mut simulator = Simulator::new(config).unwrap();
        let snapshots = simulator.run().unwrap();

        // log_interval 5, warmup 20: samples at steps 25, 30, 35
        assert_eq!(snapshots.len(), 3);
        let steps: Vec<u64> = snapshots.iter().map(|s| s.step).collect();
        assert_eq!(steps, vec![25, 30, 35]);
        assert_eq!(simulator.steps_run(), 36);

        for (k, snapshot) in snapshots.iter().enumerate() {
            assert_eq!(snapshot.index, k);
            assert_eq!(snapshot.cycle, (snapshot.step + 1) * 10);
            assert_eq!(snapshot.entries.len(), 64);
            assert!(snapshot.entries.iter().all(|e| e.channel < 32));
        }
    }

    #[test]
    fn test_sample_at_warmup_boundary_excluded() {
        let mut config = create_minimal_test_config();
        config.simulation.warmup_steps = 25;
        config.simulation.num_snapshots = 1;
        let snapshots = Simulator::new(config).unwrap().run().unwrap();
        assert_eq!(snapshots[0].step, 30);
    }

    #[test]
    fn test_callback_cadence() {
        let config = create_minimal_test_config();
        let mut simulator = Simulator::new(config).unwrap();

        let mut reports = Vec::new();
        let mut with_snapshot = 0;
        simulator
            .run_with_callback(|progress| {
                assert_eq!(progress.ongoing, 64);
                assert!(progress.min_tiles_left >= 0);
                assert!(progress.utilization <= 1.0);
                if progress.snapshot.is_some() {
                    with_snapshot += 1;
                }
                reports.push(progress.step);
            })
            .unwrap();

        assert_eq!(reports, vec![0, 5, 10, 15, 20, 25, 30, 35]);
        assert_eq!(with_snapshot, 3);
    }

    #[test]
    fn test_runs_all_steps_when_warmup_too_long() {
        let mut config = create_minimal_test_config();
        config.simulation.num_steps = 40;
        config.simulation.warmup_steps = 1000;
        let mut simulator = Simulator::new(config).unwrap();

        let snapshots = simulator.run().unwrap();
        assert!(snapshots.is_empty());
        assert_eq!(simulator.steps_run(), 40);
        assert_eq!(simulator.get_current_cycle(), 400);

        let summary = simulator.get_metrics_summary();
        assert_eq!(summary.steps_recorded, 40);
        assert_eq!(summary.snapshots_taken, 0);
        assert_eq!(summary.assignments_per_channel.len(), 32);
    }

    #[test]
    fn test_deterministic_snapshots() {
        let run = || {
            let mut config = create_minimal_test_config();
            config.scheduler.algorithm = "clb".to_string();
            Simulator::new(config).unwrap().run().unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_seed_changes_trace() {
        let run = |seed| {
            let mut config = create_minimal_test_config();
            config.workload.seed = seed;
            Simulator::new(config).unwrap().run().unwrap()
        };
        assert_ne!(run(1), run(2));
    }

    #[test]
    fn test_with_entries() {
        let mut config = create_minimal_test_config();
        config.scheduler.max_batch_size = 8;
        let entries = vec![
            WorkloadEntry {
                prompt_tokens: 2000,
                output_tokens: 100,
            },
            WorkloadEntry {
                prompt_tokens: 50,
                output_tokens: 0,
            },
        ];

        let snapshots = Simulator::new_with_entries(config, &entries)
            .unwrap()
            .run()
            .unwrap();

        // Long prompts hit the context limit and stay there
        for snapshot in &snapshots {
            assert!(snapshot.entries.iter().all(|e| e.seq_len <= 2048));
        }
        assert!(snapshots
            .iter()
            .flat_map(|s| s.entries.iter())
            .any(|e| e.seq_len == 2048));
    }

    #[test]
    fn test_empty_workload() {
        let config = create_minimal_test_config();
        let entries = vec![WorkloadEntry {
            prompt_tokens: 10,
            output_tokens: 0,
        }];
        let err = Simulator::new_with_entries(config, &entries).err().unwrap();
        assert_eq!(err, SimError::EmptyWorkload);
    }

    #[test]
    fn test_infeasible_workload_aborts() {
        let mut config = create_minimal_test_config();
        config.hardware = HardwareConfig {
            num_channels: 3,
            kv_tiles_per_channel: Some(1000),
            ..config.hardware
        };
        config.scheduler.max_batch_size = 5;
        config.scheduler.algorithm = "rrn".to_string();
        let entries = vec![WorkloadEntry {
            prompt_tokens: 100,
            output_tokens: 50,
        }];

        let err = Simulator::new_with_entries(config, &entries).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Capacity);
    }

    #[test]
    fn test_bad_length_distribution_is_config_error() {
        let mut config = create_minimal_test_config();
        config.workload.input_len_dist = LengthDistribution::Uniform { min: 5, max: 1 };

        let err = Simulator::new(config).err().unwrap();
        let err = err.downcast_ref::<SimError>().unwrap();
        assert_eq!(err.kind(), ErrorKind::BadConfig);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = create_minimal_test_config();
        config.simulation.log_interval = 0;
        assert!(Simulator::new(config).is_err());
    }
}
