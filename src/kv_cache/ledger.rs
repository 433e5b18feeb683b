use crate::compute::ComputeEngine;
use crate::error::SimError;
use crate::request::Request;

/// Per-channel running totals, derived from the in-flight requests.
///
/// Channels store nothing themselves; a ledger is rebuilt from the ongoing
/// pool whenever it is needed, and placement algorithms charge it as they go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelLedger {
    /// KV-cache tile budget of every channel
    capacity_tiles: u64,

    tiles_used: Vec<u64>,

    /// Sum of estimated decode latency of the requests on each channel
    latency: Vec<u64>,

    /// Sum of sequence lengths on each channel
    tokens: Vec<u64>,
}

impl ChannelLedger {
    /// Create an empty ledger
    pub fn new(num_channels: usize, capacity_tiles: u64) -> Self {
        Self {
            capacity_tiles,
            tiles_used: vec![0; num_channels],
            latency: vec![0; num_channels],
            tokens: vec![0; num_channels],
        }
    }

    /// Sum the footprint and cost of every assigned request per channel
    pub fn from_requests(requests: &[Request], engine: &ComputeEngine) -> Self {
        let mut ledger = Self::new(engine.num_channels(), engine.channel_capacity_tiles());
        for req in requests {
            if let Some(channel) = req.channel() {
                ledger.charge(channel, req, engine);
            }
        }
        ledger
    }

    #[cfg(test)]
    pub(crate) fn from_parts(capacity_tiles: u64, tiles_used: Vec<u64>, latency: Vec<u64>) -> Self {
        let tokens = vec![0; tiles_used.len()];
        Self {
            capacity_tiles,
            tiles_used,
            latency,
            tokens,
        }
    }

    /// Add a request's footprint and cost to a channel
    pub fn charge(&mut self, channel: usize, request: &Request, engine: &ComputeEngine) {
        self.tiles_used[channel] += engine.tile_footprint(request);
        self.latency[channel] += engine.estimated_latency(request);
        self.tokens[channel] += request.sequence_length() as u64;
    }

    pub fn num_channels(&self) -> usize {
        self.tiles_used.len()
    }

    pub fn capacity_tiles(&self) -> u64 {
        self.capacity_tiles
    }

    pub fn tiles_used(&self) -> &[u64] {
        &self.tiles_used
    }

    pub fn latency(&self) -> &[u64] {
        &self.latency
    }

    pub fn tokens(&self) -> &[u64] {
        &self.tokens
    }

    /// Remaining budget of a channel, negative when oversubscribed
    pub fn tiles_left(&self, channel: usize) -> i64 {
        self.capacity_tiles as i64 - self.tiles_used[channel] as i64
    }

    pub fn tiles_left_per_channel(&self) -> Vec<i64> {
        (0..self.num_channels()).map(|ch| self.tiles_left(ch)).collect()
    }

    /// Smallest remaining budget over all channels
    pub fn min_tiles_left(&self) -> i64 {
        (0..self.num_channels())
            .map(|ch| self.tiles_left(ch))
            .min()
            .unwrap_or(self.capacity_tiles as i64)
    }

    /// Whether `tiles` more fit on `channel`
    pub fn fits(&self, channel: usize, tiles: u64) -> bool {
        tiles as i64 <= self.tiles_left(channel)
    }

    /// Channel with the smallest accumulated latency; lowest index on ties
    pub fn least_loaded_channel(&self) -> usize {
        let mut best = 0;
        for ch in 1..self.latency.len() {
            if self.latency[ch] < self.latency[best] {
                best = ch;
            }
        }
        best
    }

    /// Max minus min accumulated latency over channels
    pub fn latency_spread(&self) -> u64 {
        let max = self.latency.iter().copied().max().unwrap_or(0);
        let min = self.latency.iter().copied().min().unwrap_or(0);
        max - min
    }

    /// Fraction of all tiles in use (0.0 to 1.0 unless oversubscribed)
    pub fn utilization(&self) -> f64 {
        let total = self.capacity_tiles * self.num_channels() as u64;
        if total == 0 {
            return 0.0;
        }
        self.tiles_used.iter().sum::<u64>() as f64 / total as f64
    }

    /// Fail on the first channel whose usage exceeds its budget
    pub fn validate(&self) -> Result<(), SimError> {
        for (channel, &used) in self.tiles_used.iter().enumerate() {
            if used > self.capacity_tiles {
                return Err(SimError::CapacityExceeded {
                    channel,
                    tiles_used: used,
                    capacity: self.capacity_tiles,
                    tiles_left: self.tiles_left_per_channel(),
                    tokens_per_channel: self.tokens.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::ErrorKind;

    fn create_test_engine() -> ComputeEngine {
        let config = Config::test_default();
        ComputeEngine::new(config.hardware, config.model).unwrap()
    }

    fn assigned(prompt: u32, channel: usize) -> Request {
        let mut req = Request::new(0, prompt, 10, 2048);
        req.assign_channel(channel).unwrap();
        req
    }

    #[test]
    fn test_empty_ledger() {
        let engine = create_test_engine();
        let ledger = ChannelLedger::from_requests(&[], &engine);

        assert_eq!(ledger.num_channels(), 32);
        assert_eq!(ledger.capacity_tiles(), 29_184);
        assert_eq!(ledger.utilization(), 0.0);
        assert_eq!(ledger.min_tiles_left(), 29_184);
        assert_eq!(ledger.latency_spread(), 0);
        assert!(ledger.validate().is_ok());
    }

    #[test]
    fn test_totals_per_channel() {
        let engine = create_test_engine();
        let requests = vec![assigned(100, 0), assigned(100, 0), assigned(100, 5)];
        let ledger = ChannelLedger::from_requests(&requests, &engine);

        assert_eq!(ledger.tiles_used()[0], 2560);
        assert_eq!(ledger.tiles_used()[5], 1280);
        assert_eq!(ledger.tiles_used()[1], 0);
        assert_eq!(ledger.latency()[0], 2 * 8360);
        assert_eq!(ledger.tokens()[5], 100);
        assert_eq!(ledger.tiles_left(0), 29_184 - 2560);
        assert_eq!(ledger.latency_spread(), 2 * 8360);
    }

    #[test]
    fn test_unassigned_requests_ignored() {
        let engine = create_test_engine();
        let requests = vec![Request::new(0, 100, 10, 2048)];
        let ledger = ChannelLedger::from_requests(&requests, &engine);
        assert_eq!(ledger.tiles_used().iter().sum::<u64>(), 0);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let engine = create_test_engine();
        let requests: Vec<Request> = (0..40).map(|i| assigned(50 + i * 7, i as usize % 32)).collect();
        let first = ChannelLedger::from_requests(&requests, &engine);
        let second = ChannelLedger::from_requests(&requests, &engine);
        assert_eq!(first, second);
    }

    #[test]
    fn test_least_loaded_tie_breaks_low_index() {
        let engine = create_test_engine();
        let requests = vec![assigned(100, 0), assigned(100, 2)];
        let ledger = ChannelLedger::from_requests(&requests, &engine);
        assert_eq!(ledger.least_loaded_channel(), 1);

        let empty = ChannelLedger::new(4, 10);
        assert_eq!(empty.least_loaded_channel(), 0);
    }

    #[test]
    fn test_validate_reports_overflowing_channel() {
        let engine = create_test_engine();
        let mut ledger = ChannelLedger::new(3, 2000);
        ledger.charge(1, &Request::new(0, 100, 1, 2048), &engine);
        ledger.charge(1, &Request::new(0, 100, 1, 2048), &engine);
        assert!(!ledger.fits(1, 1));

        let err = ledger.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Capacity);
        match err {
            SimError::CapacityExceeded {
                channel,
                tiles_used,
                tiles_left,
                ..
            } => {
                assert_eq!(channel, 1);
                assert_eq!(tiles_used, 2560);
                assert_eq!(tiles_left, vec![2000, -560, 2000]);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
