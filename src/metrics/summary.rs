use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub steps_recorded: u64,

    // Spread between the busiest and idlest channel, in cycles
    pub mean_latency_spread: f64,
    pub max_latency_spread: u64,

    // Per-interval mean sequence length of the batch
    pub seq_len_p50: f64,
    pub seq_len_p90: f64,
    pub seq_len_p99: f64,

    /// Lowest per-channel tile headroom seen during the run
    pub min_tiles_left: i64,
    pub peak_utilization: f64,

    pub completed_requests: u64,
    pub snapshots_taken: usize,
    pub assignments_per_channel: Vec<u64>,
}

impl MetricsSummary {
    /// Max over min assignment count, 1.0 when perfectly even
    pub fn assignment_imbalance(&self) -> f64 {
        let max = self.assignments_per_channel.iter().copied().max().unwrap_or(0);
        let min = self.assignments_per_channel.iter().copied().min().unwrap_or(0);
        if min == 0 {
            return if max == 0 { 1.0 } else { f64::INFINITY };
        }
        max as f64 / min as f64
    }

    pub fn print(&self) {
        println!("\n=== Trace Generation Summary ===");
        println!("Steps recorded: {}", self.steps_recorded);
        println!("Snapshots taken: {}", self.snapshots_taken);
        println!("Completed requests: {}", self.completed_requests);

        println!("\nLatency spread (cycles):");
        println!("  Mean: {:.1}", self.mean_latency_spread);
        println!("  Max:  {}", self.max_latency_spread);

        println!("\nMean sequence length:");
        println!("  p50: {:.1}", self.seq_len_p50);
        println!("  p90: {:.1}", self.seq_len_p90);
        println!("  p99: {:.1}", self.seq_len_p99);

        println!("\nCapacity:");
        println!("  Min tiles left:   {}", self.min_tiles_left);
        println!("  Peak utilization: {:.1}%", self.peak_utilization * 100.0);

        println!("\nAssignments per channel:");
        for (ch, count) in self.assignments_per_channel.iter().enumerate() {
            println!("  ch{:<3} {}", ch, count);
        }
        println!("  Imbalance (max/min): {:.3}", self.assignment_imbalance());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary_with(assignments: Vec<u64>) -> MetricsSummary {
        MetricsSummary {
            steps_recorded: 10,
            mean_latency_spread: 12.5,
            max_latency_spread: 40,
            seq_len_p50: 300.0,
            seq_len_p90: 350.0,
            seq_len_p99: 360.0,
            min_tiles_left: 1024,
            peak_utilization: 0.4,
            completed_requests: 99,
            snapshots_taken: 3,
            assignments_per_channel: assignments,
        }
    }

    #[test]
    fn test_assignment_imbalance() {
        assert_eq!(summary_with(vec![4, 4, 4]).assignment_imbalance(), 1.0);
        assert_eq!(summary_with(vec![6, 3]).assignment_imbalance(), 2.0);
        assert_eq!(summary_with(vec![]).assignment_imbalance(), 1.0);
        assert!(summary_with(vec![0, 5]).assignment_imbalance().is_infinite());
    }

    #[test]
    fn test_summary_serializes() {
        let json = serde_json::to_value(summary_with(vec![1, 2])).unwrap();
        assert_eq!(json["max_latency_spread"], 40);
        assert_eq!(json["assignments_per_channel"][1], 2);
    }
}
