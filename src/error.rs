use thiserror::Error;

/// Coarse classification of a [`SimError`], stable enough to assert on in tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A channel holds more tiles than its budget, or no channel can take a request
    Capacity,
    /// A request was given a channel twice
    DoubleAllocation,
    /// A request was advanced past its output target
    OverAdvance,
    /// Rejected before any simulation proceeds
    BadConfig,
    /// Scheduler bookkeeping defect
    Logic,
}

/// Every failure the simulator can produce. None of them are recoverable
/// within a run: the caller is expected to abort and report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error(
        "channel {channel} out of memory: {tiles_used} tiles used, capacity {capacity} \
         (tiles left per channel: {tiles_left:?}, tokens per channel: {tokens_per_channel:?})"
    )]
    CapacityExceeded {
        channel: usize,
        tiles_used: u64,
        capacity: u64,
        tiles_left: Vec<i64>,
        tokens_per_channel: Vec<u64>,
    },

    #[error("out of memory: no channel has {required} free tiles (tiles left per channel: {tiles_left:?})")]
    OutOfMemory { required: u64, tiles_left: Vec<i64> },

    #[error("request already assigned to channel {current}, refused reassignment to {requested}")]
    DoubleAllocation { current: usize, requested: usize },

    #[error("request advanced past its output target of {output_tokens} tokens")]
    OverAdvance { output_tokens: u32 },

    #[error("unknown assignment algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("workload contains no usable requests")]
    EmptyWorkload,

    #[error(
        "batch size mismatch: {queued} queued + {ongoing} ongoing != max batch size {max_batch_size}"
    )]
    BatchSizeMismatch {
        queued: usize,
        ongoing: usize,
        max_batch_size: usize,
    },
}

impl SimError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SimError::CapacityExceeded { .. } | SimError::OutOfMemory { .. } => ErrorKind::Capacity,
            SimError::DoubleAllocation { .. } => ErrorKind::DoubleAllocation,
            SimError::OverAdvance { .. } => ErrorKind::OverAdvance,
            SimError::UnknownAlgorithm(_) | SimError::InvalidConfig(_) | SimError::EmptyWorkload => {
                ErrorKind::BadConfig
            }
            SimError::BatchSizeMismatch { .. } => ErrorKind::Logic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let oom = SimError::OutOfMemory {
            required: 10,
            tiles_left: vec![1, 2],
        };
        assert_eq!(oom.kind(), ErrorKind::Capacity);
        assert_eq!(
            SimError::UnknownAlgorithm("fifo".to_string()).kind(),
            ErrorKind::BadConfig
        );
        assert_eq!(
            SimError::OverAdvance { output_tokens: 3 }.kind(),
            ErrorKind::OverAdvance
        );
    }

    #[test]
    fn test_capacity_message_includes_diagnostics() {
        let err = SimError::CapacityExceeded {
            channel: 2,
            tiles_used: 120,
            capacity: 100,
            tiles_left: vec![10, 0, -20],
            tokens_per_channel: vec![5, 7, 9],
        };
        let msg = err.to_string();
        assert!(msg.contains("channel 2"));
        assert!(msg.contains("[10, 0, -20]"));
        assert!(msg.contains("[5, 7, 9]"));
    }
}
