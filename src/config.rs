use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

/// Hyper-parameters of [`ConvDqnAgent`](crate::agent::ConvDqnAgent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DqnConfig {
    pub batch_size: usize,
    pub learning_rate: f64,
    pub discount: f64,
    /// Probability of taking a uniformly random action when not greedy.
    pub epsilon: f64,
    pub memory_capacity: usize,
    /// Rescale gradients whose global L2 norm exceeds this value.
    pub max_grad_norm: Option<f32>,
}

impl Default for DqnConfig {
    fn default() -> Self {
        Self {
            batch_size: 128,
            learning_rate: 1e-3,
            discount: 1.0,
            epsilon: 0.05,
            memory_capacity: 100_000,
            max_grad_norm: None,
        }
    }
}

impl DqnConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: DqnConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(AgentError::InvalidConfig("batch_size must be positive".into()));
        }
        if self.memory_capacity < self.batch_size {
            return Err(AgentError::InvalidConfig(format!(
                "memory_capacity ({}) is smaller than batch_size ({})",
                self.memory_capacity, self.batch_size
            )));
        }
        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(AgentError::InvalidConfig(format!(
                "epsilon must be in [0, 1], got {}",
                self.epsilon
            )));
        }
        if !(self.discount >= 0.0) {
            return Err(AgentError::InvalidConfig(format!(
                "discount must be non-negative, got {}",
                self.discount
            )));
        }
        if !(self.learning_rate > 0.0) {
            return Err(AgentError::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if let Some(max) = self.max_grad_norm {
            if !(max > 0.0) {
                return Err(AgentError::InvalidConfig(format!(
                    "max_grad_norm must be positive, got {max}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = DqnConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.batch_size, 128);
        assert_eq!(config.memory_capacity, 100_000);
    }

    #[test]
    fn rejects_bad_values() {
        let bad = [
            DqnConfig { batch_size: 0, ..Default::default() },
            DqnConfig { memory_capacity: 10, batch_size: 32, ..Default::default() },
            DqnConfig { epsilon: 1.5, ..Default::default() },
            DqnConfig { discount: -0.1, ..Default::default() },
            DqnConfig { learning_rate: 0.0, ..Default::default() },
            DqnConfig { max_grad_norm: Some(0.0), ..Default::default() },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(AgentError::InvalidConfig(_))));
        }
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"batch_size": 32, "discount": 0.99}}"#).unwrap();
        let config = DqnConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.discount, 0.99);
        assert_eq!(config.epsilon, 0.05);
    }

    #[test]
    fn invalid_json_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"batch_size": 0}}"#).unwrap();
        assert!(DqnConfig::from_json_file(file.path()).is_err());
    }
}
