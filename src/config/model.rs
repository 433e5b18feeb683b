use crate::error::SimError;
use serde::Deserialize;

fn default_max_seq_len() -> u32 {
    2048
}

fn default_parallel() -> u32 {
    1
}

/// Model shape and its sharding over devices.
///
/// Either name a `preset` (parameter count in billions) and let
/// [`ModelConfig::resolve`] fill the dimensions, or give them explicitly.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub name: String,

    /// One of 7, 13, 30, 175
    #[serde(default)]
    pub preset: Option<u32>,

    /// Parameter count in billions
    #[serde(default)]
    pub num_parameters_b: f64,

    /// Hidden dimension (E)
    #[serde(default)]
    pub hidden_dim: u32,

    #[serde(default)]
    pub num_heads: u32,

    #[serde(default)]
    pub num_layers: u32,

    /// Context limit; sequence lengths never exceed it
    #[serde(default = "default_max_seq_len")]
    pub max_seq_len: u32,

    #[serde(default = "default_parallel")]
    pub tensor_parallel: u32,

    #[serde(default = "default_parallel")]
    pub pipeline_parallel: u32,
}

impl ModelConfig {
    /// Build one of the known GPT-style shapes
    pub fn preset(size_b: u32, tensor_parallel: u32, pipeline_parallel: u32) -> Result<Self, SimError> {
        let mut model = Self {
            name: String::new(),
            preset: Some(size_b),
            num_parameters_b: 0.0,
            hidden_dim: 0,
            num_heads: 0,
            num_layers: 0,
            max_seq_len: default_max_seq_len(),
            tensor_parallel,
            pipeline_parallel,
        };
        model.resolve()?;
        Ok(model)
    }

    /// Fill dimensions from `preset` when one is set
    pub fn resolve(&mut self) -> Result<(), SimError> {
        let Some(size) = self.preset else {
            if self.name.is_empty() {
                self.name = format!("{}B", self.num_parameters_b);
            }
            return Ok(());
        };

        let (hidden_dim, num_heads, num_layers) = match size {
            7 => (4096, 32, 32),
            13 => (5120, 40, 40),
            30 => (7168, 56, 48),
            175 => (12288, 96, 96),
            other => {
                return Err(SimError::InvalidConfig(format!(
                    "unknown model preset {}B (expected 7, 13, 30 or 175)",
                    other
                )))
            }
        };

        self.num_parameters_b = size as f64;
        self.hidden_dim = hidden_dim;
        self.num_heads = num_heads;
        self.num_layers = num_layers;
        if self.name.is_empty() {
            self.name = format!("{}B", size);
        }
        Ok(())
    }

    /// Per-head dimension (dk = E / nh)
    pub fn head_dim(&self) -> u32 {
        self.hidden_dim / self.num_heads
    }

    /// Hidden dimension held by one tensor-parallel shard
    pub fn effective_hidden_dim(&self) -> u32 {
        self.hidden_dim / self.tensor_parallel
    }

    /// Attention heads held by one tensor-parallel shard, rounded down
    pub fn heads_per_shard(&self) -> u32 {
        self.num_heads / self.tensor_parallel
    }

    pub fn validate(&self) -> Result<(), SimError> {
        let invalid = |msg: String| Err(SimError::InvalidConfig(msg));

        if self.tensor_parallel == 0 || self.pipeline_parallel == 0 {
            return invalid("tensor and pipeline parallel degrees must be at least 1".into());
        }
        if self.hidden_dim == 0 || self.num_heads == 0 || self.num_layers == 0 {
            return invalid(format!(
                "model {} has no shape (hidden_dim={}, num_heads={}, num_layers={})",
                self.name, self.hidden_dim, self.num_heads, self.num_layers
            ));
        }
        if self.num_parameters_b <= 0.0 {
            return invalid("num_parameters_b must be positive".into());
        }
        if self.max_seq_len == 0 {
            return invalid("max_seq_len must be positive".into());
        }
        if self.hidden_dim % self.num_heads != 0 {
            return invalid(format!(
                "hidden_dim {} is not divisible by num_heads {}",
                self.hidden_dim, self.num_heads
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let m = ModelConfig::preset(7, 4, 1).unwrap();
        assert_eq!(m.hidden_dim, 4096);
        assert_eq!(m.head_dim(), 128);
        assert_eq!(m.effective_hidden_dim(), 1024);
        assert_eq!(m.heads_per_shard(), 8);

        let m = ModelConfig::preset(175, 8, 8).unwrap();
        assert_eq!((m.hidden_dim, m.num_heads, m.num_layers), (12288, 96, 96));
        assert_eq!(m.head_dim(), 128);
        assert_eq!(m.name, "175B");
    }

    #[test]
    fn test_unknown_preset() {
        let err = ModelConfig::preset(65, 1, 1).unwrap_err();
        assert!(matches!(err, SimError::InvalidConfig(_)));
    }

    #[test]
    fn test_validate_rejects_zero_parallelism() {
        let mut m = ModelConfig::preset(13, 8, 1).unwrap();
        assert!(m.validate().is_ok());
        m.tensor_parallel = 0;
        assert!(m.validate().is_err());
        m.tensor_parallel = 8;
        m.pipeline_parallel = 0;
        assert!(m.validate().is_err());
    }

    #[test]
    fn test_uneven_head_split_floors() {
        // 56 heads over 16 shards
        let m = ModelConfig::preset(30, 16, 1).unwrap();
        assert!(m.validate().is_ok());
        assert_eq!(m.heads_per_shard(), 3);
        assert_eq!(m.effective_hidden_dim(), 448);
    }
}
