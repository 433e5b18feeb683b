use crate::error::SimError;
use rand::Rng;
use rand_distr::{Distribution, LogNormal, Normal};
use serde::Deserialize;
use std::path::PathBuf;

fn default_seed() -> u64 {
    42
}

fn default_num_templates() -> usize {
    1000
}

fn default_input_len_dist() -> LengthDistribution {
    LengthDistribution::Uniform { min: 32, max: 1024 }
}

fn default_output_len_dist() -> LengthDistribution {
    LengthDistribution::Uniform { min: 16, max: 512 }
}

/// Token-length distribution used when no dataset is given
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LengthDistribution {
    Fixed { value: u32 },
    Uniform { min: u32, max: u32 },
    Normal { mean: f64, std_dev: f64 },
    LogNormal { mean: f64, std_dev: f64 },
}

impl LengthDistribution {
    /// Draw one length. Continuous distributions are rounded and floored at 0.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        match *self {
            LengthDistribution::Fixed { value } => value,
            LengthDistribution::Uniform { min, max } => rng.gen_range(min..=max),
            LengthDistribution::Normal { mean, std_dev } => match Normal::new(mean, std_dev) {
                Ok(dist) => dist.sample(rng).round().max(0.0) as u32,
                Err(_) => mean.max(0.0) as u32,
            },
            LengthDistribution::LogNormal { mean, std_dev } => {
                // Parameters are given for the resulting distribution, not the underlying normal
                let variance = std_dev * std_dev;
                let sigma2 = (1.0 + variance / (mean * mean)).ln();
                let mu = mean.ln() - sigma2 / 2.0;
                match LogNormal::new(mu, sigma2.sqrt()) {
                    Ok(dist) => dist.sample(rng).round().max(0.0) as u32,
                    Err(_) => mean.max(0.0) as u32,
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), SimError> {
        let ok = match *self {
            LengthDistribution::Fixed { .. } => true,
            LengthDistribution::Uniform { min, max } => min <= max,
            LengthDistribution::Normal { mean, std_dev } => {
                mean.is_finite() && std_dev.is_finite() && std_dev >= 0.0
            }
            LengthDistribution::LogNormal { mean, std_dev } => {
                mean.is_finite() && mean > 0.0 && std_dev.is_finite() && std_dev >= 0.0
            }
        };
        if ok {
            Ok(())
        } else {
            Err(SimError::InvalidConfig(format!(
                "invalid length distribution {:?}",
                self
            )))
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkloadConfig {
    /// Tab-separated (prompt, output) token table. Synthetic templates are used when unset.
    #[serde(default)]
    pub dataset_path: Option<PathBuf>,

    /// Seed for template generation and batch refills
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Size of the synthetic template pool
    #[serde(default = "default_num_templates")]
    pub num_templates: usize,

    #[serde(default = "default_input_len_dist")]
    pub input_len_dist: LengthDistribution,

    #[serde(default = "default_output_len_dist")]
    pub output_len_dist: LengthDistribution,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            dataset_path: None,
            seed: default_seed(),
            num_templates: default_num_templates(),
            input_len_dist: default_input_len_dist(),
            output_len_dist: default_output_len_dist(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_fixed_and_uniform_sampling() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(LengthDistribution::Fixed { value: 12 }.sample(&mut rng), 12);

        let dist = LengthDistribution::Uniform { min: 10, max: 20 };
        for _ in 0..100 {
            let v = dist.sample(&mut rng);
            assert!((10..=20).contains(&v));
        }
    }

    #[test]
    fn test_lognormal_mean_is_close() {
        let mut rng = StdRng::seed_from_u64(7);
        let dist = LengthDistribution::LogNormal {
            mean: 200.0,
            std_dev: 50.0,
        };
        let n = 20_000;
        let total: u64 = (0..n).map(|_| dist.sample(&mut rng) as u64).sum();
        let mean = total as f64 / n as f64;
        assert!((mean - 200.0).abs() < 5.0, "mean was {}", mean);
    }

    #[test]
    fn test_validate_distribution() {
        assert!(LengthDistribution::Uniform { min: 5, max: 1 }.validate().is_err());
        assert!(LengthDistribution::Normal {
            mean: 10.0,
            std_dev: -1.0
        }
        .validate()
        .is_err());
        assert!(LengthDistribution::Fixed { value: 0 }.validate().is_ok());
    }

    #[test]
    fn test_parse_tagged_distribution() {
        let w: WorkloadConfig = toml::from_str(
            r#"
            seed = 3
            input_len_dist = { type = "normal", mean = 100.0, std_dev = 10.0 }
            output_len_dist = { type = "fixed", value = 8 }
            "#,
        )
        .unwrap();
        assert_eq!(w.seed, 3);
        assert_eq!(w.output_len_dist, LengthDistribution::Fixed { value: 8 });
        assert!(w.dataset_path.is_none());
    }
}
