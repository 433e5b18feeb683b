use crate::compute::arithmetic;
use crate::config::{HardwareConfig, ModelConfig};
use crate::error::SimError;

/// A single generation request.
///
/// Templates in the initiated pool are never assigned or advanced; the
/// scheduler works on clones of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Index of the template this request was cloned from
    pub template_id: usize,

    pub num_prompt_tokens: u32,

    /// Number of tokens to generate before completing
    pub max_output_tokens: u32,

    pub num_generated_tokens: u32,

    /// Model context limit; the sequence length is clamped to it
    pub max_seq_len: u32,

    channel: Option<usize>,
}

impl Request {
    pub fn new(
        template_id: usize,
        num_prompt_tokens: u32,
        max_output_tokens: u32,
        max_seq_len: u32,
    ) -> Self {
        Self {
            template_id,
            num_prompt_tokens,
            max_output_tokens,
            num_generated_tokens: 0,
            max_seq_len,
            channel: None,
        }
    }

    /// Current sequence length (prompt + generated), never beyond the context limit
    pub fn sequence_length(&self) -> u32 {
        self.num_prompt_tokens
            .saturating_add(self.num_generated_tokens)
            .min(self.max_seq_len)
    }

    /// Generate one more token
    pub fn advance(&mut self) -> Result<(), SimError> {
        if self.num_generated_tokens >= self.max_output_tokens {
            return Err(SimError::OverAdvance {
                output_tokens: self.max_output_tokens,
            });
        }
        self.num_generated_tokens += 1;
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.num_generated_tokens == self.max_output_tokens
    }

    /// Pin the request to a channel. A request is placed at most once.
    pub fn assign_channel(&mut self, channel: usize) -> Result<(), SimError> {
        if let Some(current) = self.channel {
            return Err(SimError::DoubleAllocation {
                current,
                requested: channel,
            });
        }
        self.channel = Some(channel);
        Ok(())
    }

    pub fn channel(&self) -> Option<usize> {
        self.channel
    }

    pub fn is_assigned(&self) -> bool {
        self.channel.is_some()
    }

    /// KV-cache tiles held at the current sequence length
    pub fn tile_footprint(&self, model: &ModelConfig, hardware: &HardwareConfig) -> u64 {
        arithmetic::tile_footprint(self.sequence_length(), model, hardware)
    }

    /// Relative attention cost of the next decode step
    pub fn estimated_latency(&self, model: &ModelConfig, hardware: &HardwareConfig) -> u64 {
        arithmetic::estimated_latency(self.sequence_length(), model, hardware)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::ErrorKind;

    fn create_test_request(prompt: u32, output: u32) -> Request {
        Request::new(0, prompt, output, 2048)
    }

    #[test]
    fn test_sequence_length_grows() {
        let mut req = create_test_request(100, 10);
        assert_eq!(req.sequence_length(), 100);
        req.advance().unwrap();
        req.advance().unwrap();
        assert_eq!(req.sequence_length(), 102);
        assert!(!req.is_complete());
    }

    #[test]
    fn test_sequence_length_clamped_to_context() {
        let mut req = create_test_request(2000, 100);
        for _ in 0..60 {
            req.advance().unwrap();
        }
        assert_eq!(req.num_generated_tokens, 60);
        assert_eq!(req.sequence_length(), 2048);
    }

    #[test]
    fn test_huge_prompt_saturates() {
        let mut req = Request::new(0, u32::MAX, 3, 2048);
        req.advance().unwrap();
        req.advance().unwrap();
        assert_eq!(req.sequence_length(), 2048);
    }

    #[test]
    fn test_completion_and_over_advance() {
        let mut req = create_test_request(10, 2);
        req.advance().unwrap();
        req.advance().unwrap();
        assert!(req.is_complete());

        let err = req.advance().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OverAdvance);
        assert_eq!(req.num_generated_tokens, 2);
    }

    #[test]
    fn test_assign_channel_once() {
        let mut req = create_test_request(10, 2);
        assert!(!req.is_assigned());
        req.assign_channel(3).unwrap();
        assert_eq!(req.channel(), Some(3));

        let err = req.assign_channel(5).unwrap_err();
        assert_eq!(
            err,
            SimError::DoubleAllocation {
                current: 3,
                requested: 5
            }
        );
        assert_eq!(req.channel(), Some(3));
    }

    #[test]
    fn test_clone_is_independent() {
        let template = create_test_request(50, 5);
        let mut copy = template.clone();
        copy.advance().unwrap();
        copy.assign_channel(1).unwrap();

        assert_eq!(template.num_generated_tokens, 0);
        assert!(!template.is_assigned());
    }

    #[test]
    fn test_footprint_and_latency_follow_sequence_length() {
        let config = Config::test_default();
        let req = create_test_request(100, 10);
        assert_eq!(req.tile_footprint(&config.model, &config.hardware), 1280);
        assert_eq!(req.estimated_latency(&config.model, &config.hardware), 8360);
    }
}
