//! Deep Q-learning on pixel observations, with a random baseline agent.
//!
//! An episode loop asks an [`Agent`] to `act` on an observation, applies the
//! action to an [`Environment`], then hands the outcome back through `learn`
//! together with the [`Pending`] value returned by `act`.

pub mod agent;
pub mod config;
pub mod convnet;
pub mod device;
pub mod environment;
pub mod error;
pub mod experience;
pub mod memory;
pub mod preprocess;
pub mod random_agent;
pub mod runner;
pub mod space;

pub use agent::{Agent, AnyAgent, ConvDqnAgent, LearnStats, Pending, bootstrap_targets};
pub use config::DqnConfig;
pub use environment::{CatchEnv, Environment, Step};
pub use error::{AgentError, Result};
pub use experience::Transition;
pub use memory::ReplayMemory;
pub use random_agent::RandomAgent;
pub use runner::{EpisodeStats, run_episode};
pub use space::{BoxSpace, Discrete, Space};
