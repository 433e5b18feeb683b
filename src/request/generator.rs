use super::Request;
use crate::config::WorkloadConfig;
use crate::dataset::WorkloadEntry;
use crate::error::SimError;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Owns the initiated (template) pool and draws batch refills from it.
///
/// Sampling is uniform with replacement. Every draw is an independent
/// clone, so templates are never mutated and can be drawn again.
pub struct RequestGenerator {
    templates: Vec<Request>,
    rng: StdRng,
    requests_generated: usize,
}

impl RequestGenerator {
    /// Build the template pool from imported (prompt, output) pairs
    pub fn from_entries(
        entries: &[WorkloadEntry],
        max_seq_len: u32,
        seed: u64,
    ) -> Result<Self, SimError> {
        let templates: Vec<Request> = entries
            .iter()
            .filter(|e| e.output_tokens > 0)
            .enumerate()
            .map(|(id, e)| Request::new(id, e.prompt_tokens, e.output_tokens, max_seq_len))
            .collect();

        let skipped = entries.len() - templates.len();
        if skipped > 0 {
            log::warn!("dropped {} workload entries with no output tokens", skipped);
        }

        Self::from_templates(templates, seed)
    }

    /// Build a synthetic template pool from the workload's length distributions
    pub fn synthetic(workload: &WorkloadConfig, max_seq_len: u32) -> Result<Self, SimError> {
        workload.input_len_dist.validate()?;
        workload.output_len_dist.validate()?;

        let mut rng = StdRng::seed_from_u64(workload.seed);

        let templates: Vec<Request> = (0..workload.num_templates)
            .map(|id| {
                let prompt = workload.input_len_dist.sample(&mut rng);
                // A template must generate at least one token to ever complete
                let output = workload.output_len_dist.sample(&mut rng).max(1);
                Request::new(id, prompt, output, max_seq_len)
            })
            .collect();

        if templates.is_empty() {
            return Err(SimError::EmptyWorkload);
        }

        Ok(Self {
            templates,
            rng,
            requests_generated: 0,
        })
    }

    pub fn from_templates(templates: Vec<Request>, seed: u64) -> Result<Self, SimError> {
        if templates.is_empty() {
            return Err(SimError::EmptyWorkload);
        }
        Ok(Self {
            templates,
            rng: StdRng::seed_from_u64(seed),
            requests_generated: 0,
        })
    }

    /// Draw `n` fresh requests, with replacement
    pub fn sample(&mut self, n: usize) -> Vec<Request> {
        let mut sampled = Vec::with_capacity(n);
        for _ in 0..n {
            let idx = self.rng.gen_range(0..self.templates.len());
            sampled.push(self.templates[idx].clone());
        }
        self.requests_generated += n;
        sampled
    }

    pub fn templates(&self) -> &[Request] {
        &self.templates
    }

    pub fn num_templates(&self) -> usize {
        self.templates.len()
    }

    /// Get number of requests drawn so far
    pub fn num_generated(&self) -> usize {
        self.requests_generated
    }
}
