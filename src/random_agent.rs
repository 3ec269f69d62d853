use candle_core::Tensor;
use rand::rngs::StdRng;

use crate::{
    agent::{Agent, LearnStats, Pending},
    error::{AgentError, Result},
    space::{Discrete, Space},
};

/// Baseline that ignores observations and never learns.
pub struct RandomAgent {
    action_space: Discrete,
    rng: StdRng,
}

impl RandomAgent {
    pub fn new(action_space: &Space, rng: StdRng) -> Result<Self> {
        let action_space = *action_space
            .as_discrete()
            .ok_or_else(|| AgentError::NonDiscreteActionSpace(action_space.to_string()))?;
        Ok(Self { action_space, rng })
    }
}

impl Agent for RandomAgent {
    fn act(&mut self, observation: &Tensor, _greedy: bool) -> Result<(usize, Pending)> {
        let action = self.action_space.sample(&mut self.rng);
        Ok((action, Pending::new(observation.clone(), action)))
    }

    fn learn(
        &mut self,
        _pending: Pending,
        _reward: f32,
        _next_observation: &Tensor,
        _done: bool,
    ) -> Result<Option<LearnStats>> {
        Ok(None)
    }
}
