//! Error type shared by the agents, the Q-network and the environments.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    /// The learning agent only handles a finite set of actions.
    #[error("action space should be discrete, got {0}")]
    NonDiscreteActionSpace(String),

    #[error("observation shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("invalid action {action}: must be less than {n}")]
    InvalidAction { action: usize, n: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("parameter map lock poisoned")]
    PoisonedParameters,

    #[error(transparent)]
    Candle(#[from] candle_core::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;
