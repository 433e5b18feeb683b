use super::decision::CycleOutcome;
use super::policy::AssignmentAlgorithm;
use crate::compute::ComputeEngine;
use crate::config::SchedulerConfig;
use crate::error::SimError;
use crate::kv_cache::ChannelLedger;
use crate::request::{Request, RequestGenerator};

/// Keeps a fixed-size batch of requests in flight and places them on channels.
///
/// Three disjoint pools: the initiated templates (inside the generator), the
/// queued refills of the current step, and the ongoing batch.
pub struct Scheduler {
    config: SchedulerConfig,
    engine: ComputeEngine,
    algorithm: AssignmentAlgorithm,

    /// Initiated pool and seeded sampler
    generator: RequestGenerator,

    /// Refills awaiting placement; empty between steps
    queued: Vec<Request>,

    /// Requests on channels
    ongoing: Vec<Request>,

    /// Round-robin cursor shared by the round-robin algorithms
    rr_cursor: usize,

    /// Decode cycles simulated so far
    cycle_count: u64,

    completed_requests: u64,

    /// How many requests each channel has received
    assignments_per_channel: Vec<u64>,
}

impl Scheduler {
    /// Build a scheduler and fill the batch for the first time
    pub fn new(
        config: SchedulerConfig,
        engine: ComputeEngine,
        generator: RequestGenerator,
    ) -> Result<Self, SimError> {
        let algorithm: AssignmentAlgorithm = config.algorithm.parse()?;
        if config.max_batch_size == 0 {
            return Err(SimError::InvalidConfig(
                "max_batch_size must be positive".into(),
            ));
        }

        let num_channels = engine.num_channels();
        let mut scheduler = Self {
            config,
            engine,
            algorithm,
            generator,
            queued: Vec::new(),
            ongoing: Vec::new(),
            rr_cursor: 0,
            cycle_count: 0,
            completed_requests: 0,
            assignments_per_channel: vec![0; num_channels],
        };

        log::info!(
            "scheduler: {} channels x {} tiles, batch {}, {}",
            num_channels,
            scheduler.engine.channel_capacity_tiles(),
            scheduler.config.max_batch_size,
            scheduler.algorithm
        );

        scheduler.step(0)?;
        Ok(scheduler)
    }

    /// Advance the batch by `num_cycles` decode cycles, then refill and place.
    ///
    /// Every ongoing request generates one token per cycle until it completes.
    /// Completed requests leave the batch, capacity is checked, fresh requests
    /// are drawn to restore the batch size, placed by the active algorithm,
    /// and capacity is checked again.
    pub fn step(&mut self, num_cycles: u64) -> Result<CycleOutcome, SimError> {
        self.cycle_count += num_cycles;

        for _ in 0..num_cycles {
            for req in self.ongoing.iter_mut() {
                if !req.is_complete() {
                    req.advance()?;
                }
            }
        }

        let before = self.ongoing.len();
        self.ongoing.retain(|req| !req.is_complete());
        let completed = before - self.ongoing.len();
        self.completed_requests += completed as u64;

        self.ledger().validate()?;

        let admitted = self.refill()?;
        self.place_queued()?;

        self.ledger().validate()?;

        log::debug!(
            "cycle {}: {} completed, {} admitted, spread {}",
            self.cycle_count,
            completed,
            admitted,
            self.ledger().latency_spread()
        );

        Ok(CycleOutcome {
            cycles: num_cycles,
            completed,
            admitted,
        })
    }

    /// Draw templates into the queued pool until the batch is full again
    fn refill(&mut self) -> Result<usize, SimError> {
        if !self.queued.is_empty() || self.ongoing.len() > self.config.max_batch_size {
            return Err(self.batch_mismatch());
        }
        let n = self.config.max_batch_size - self.ongoing.len();
        self.queued = self.generator.sample(n);
        Ok(n)
    }

    /// Run the active algorithm and move every queued request into the batch
    fn place_queued(&mut self) -> Result<(), SimError> {
        if self.queued.len() + self.ongoing.len() != self.config.max_batch_size {
            return Err(self.batch_mismatch());
        }

        let mut ledger = self.ledger();
        let placement = self
            .algorithm
            .place(&self.queued, &mut ledger, self.rr_cursor, &self.engine)?;
        if placement.len() != self.queued.len() {
            return Err(self.batch_mismatch());
        }

        let mut slots: Vec<Option<Request>> = self.queued.drain(..).map(Some).collect();
        for (idx, channel) in placement.assignments {
            if let Some(mut req) = slots[idx].take() {
                req.assign_channel(channel)?;
                self.assignments_per_channel[channel] += 1;
                self.ongoing.push(req);
            }
        }
        self.rr_cursor = placement.next_cursor;

        Ok(())
    }

    fn batch_mismatch(&self) -> SimError {
        SimError::BatchSizeMismatch {
            queued: self.queued.len(),
            ongoing: self.ongoing.len(),
            max_batch_size: self.config.max_batch_size,
        }
    }

    /// Per-channel totals of the ongoing batch, recomputed on every call
    pub fn ledger(&self) -> ChannelLedger {
        ChannelLedger::from_requests(&self.ongoing, &self.engine)
    }

    /// Current cycle and the requests in flight
    pub fn snapshot(&self) -> (u64, &[Request]) {
        (self.cycle_count, &self.ongoing)
    }

    /// Get reference to ongoing requests
    pub fn ongoing(&self) -> &[Request] {
        &self.ongoing
    }

    pub fn num_ongoing(&self) -> usize {
        self.ongoing.len()
    }

    pub fn num_queued(&self) -> usize {
        self.queued.len()
    }

    pub fn max_batch_size(&self) -> usize {
        self.config.max_batch_size
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    pub fn completed_requests(&self) -> u64 {
        self.completed_requests
    }

    pub fn algorithm(&self) -> AssignmentAlgorithm {
        self.algorithm
    }

    pub fn rr_cursor(&self) -> usize {
        self.rr_cursor
    }

    pub fn assignments_per_channel(&self) -> &[u64] {
        &self.assignments_per_channel
    }

    pub fn engine(&self) -> &ComputeEngine {
        &self.engine
    }

    pub fn generator(&self) -> &RequestGenerator {
        &self.generator
    }

    #[cfg(test)]
    fn ongoing_mut(&mut self) -> &mut Vec<Request> {
        &mut self.ongoing
    }
}
