use super::summary::MetricsSummary;
use crate::kv_cache::ChannelLedger;
use crate::request::Request;
use ordered_float::OrderedFloat;

/// Per-step load statistics gathered while the simulator runs
pub struct MetricsCollector {
    // One sample per scheduler step
    latency_spread_samples: Vec<u64>,

    // One sample per log interval
    interval_seq_len_samples: Vec<f64>,

    min_tiles_left: Option<i64>,
    peak_utilization: f64,

    // Interval accumulators for O(1) mean computation
    current_interval_spread_sum: u64,
    current_interval_spread_count: u32,

    pub snapshots_taken: usize,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            latency_spread_samples: Vec::new(),
            interval_seq_len_samples: Vec::new(),
            min_tiles_left: None,
            peak_utilization: 0.0,
            current_interval_spread_sum: 0,
            current_interval_spread_count: 0,
            snapshots_taken: 0,
        }
    }

    /// Record the channel state after one scheduler step
    pub fn record_step(&mut self, ledger: &ChannelLedger) {
        let spread = ledger.latency_spread();
        self.latency_spread_samples.push(spread);
        self.current_interval_spread_sum += spread;
        self.current_interval_spread_count += 1;

        let tiles_left = ledger.min_tiles_left();
        self.min_tiles_left = Some(match self.min_tiles_left {
            Some(min) => min.min(tiles_left),
            None => tiles_left,
        });
        self.peak_utilization = self.peak_utilization.max(ledger.utilization());
    }

    /// Record the mean sequence length of the batch and return it
    pub fn record_interval_seq_len(&mut self, ongoing: &[Request]) -> f64 {
        let mean_seq_len = mean_u32(
            &ongoing
                .iter()
                .map(|r| r.sequence_length())
                .collect::<Vec<_>>(),
        );
        self.interval_seq_len_samples.push(mean_seq_len);
        mean_seq_len
    }

    /// Get mean latency spread since the last call and reset the accumulators.
    /// Returns f64::NAN if no steps were recorded in the interval.
    pub fn get_interval_latency_spread(&mut self) -> f64 {
        let mean = if self.current_interval_spread_count > 0 {
            self.current_interval_spread_sum as f64 / self.current_interval_spread_count as f64
        } else {
            f64::NAN
        };

        self.current_interval_spread_sum = 0;
        self.current_interval_spread_count = 0;

        mean
    }

    pub fn get_latency_spread_samples(&self) -> &[u64] {
        &self.latency_spread_samples
    }

    pub fn get_interval_seq_len_samples(&self) -> &[f64] {
        &self.interval_seq_len_samples
    }

    pub fn min_tiles_left(&self) -> Option<i64> {
        self.min_tiles_left
    }

    /// Compute final summary statistics
    pub fn compute_summary(
        &self,
        completed_requests: u64,
        assignments_per_channel: &[u64],
    ) -> MetricsSummary {
        let mut seq_lens: Vec<OrderedFloat<f64>> = self
            .interval_seq_len_samples
            .iter()
            .filter(|x| x.is_finite())
            .map(|&x| OrderedFloat(x))
            .collect();
        seq_lens.sort();

        let spreads: Vec<f64> = self
            .latency_spread_samples
            .iter()
            .map(|&s| s as f64)
            .collect();

        MetricsSummary {
            steps_recorded: self.latency_spread_samples.len() as u64,
            mean_latency_spread: mean(&spreads),
            max_latency_spread: self.latency_spread_samples.iter().copied().max().unwrap_or(0),

            seq_len_p50: percentile(&seq_lens, 50.0),
            seq_len_p90: percentile(&seq_lens, 90.0),
            seq_len_p99: percentile(&seq_lens, 99.0),

            min_tiles_left: self.min_tiles_left.unwrap_or(0),
            peak_utilization: self.peak_utilization,

            completed_requests,
            snapshots_taken: self.snapshots_taken,
            assignments_per_channel: assignments_per_channel.to_vec(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Nearest-rank percentile of sorted samples
fn percentile(sorted: &[OrderedFloat<f64>], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1].into_inner()
}

/// Calculate mean of samples
fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Calculate mean of u32 samples
fn mean_u32(samples: &[u32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|&x| x as f64).sum::<f64>() / samples.len() as f64
}
