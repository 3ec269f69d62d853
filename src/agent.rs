use candle_core::{D, Tensor};
use candle_nn::{Optimizer, loss};
use rand::{Rng, rngs::StdRng};
use tracing::debug;

use crate::{
    config::DqnConfig,
    convnet::{ConvNet, INPUT_SIZE, clip_gradients},
    device::DEVICE,
    error::{AgentError, Result},
    experience::Transition,
    memory::ReplayMemory,
    random_agent::RandomAgent,
    space::{BoxSpace, Discrete, Space},
};

/// The observation an agent acted on and the action it chose. Handed back to
/// [`Agent::learn`] together with the outcome of that action.
#[derive(Debug, Clone)]
pub struct Pending {
    observation: Tensor,
    action: usize,
}

impl Pending {
    /// Records an action that was chosen outside the agent, e.g. by a
    /// scripted policy whose experience should still be replayed.
    pub fn new(observation: Tensor, action: usize) -> Self {
        Self {
            observation,
            action,
        }
    }

    pub fn observation(&self) -> &Tensor {
        &self.observation
    }

    pub fn action(&self) -> usize {
        self.action
    }
}

/// Outcome of a gradient step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearnStats {
    pub loss: f32,
    /// Global gradient L2 norm before clipping.
    pub grad_norm: f32,
}

pub trait Agent {
    fn act(&mut self, observation: &Tensor, greedy: bool) -> Result<(usize, Pending)>;

    /// Returns `None` when no parameter update happened.
    fn learn(
        &mut self,
        pending: Pending,
        reward: f32,
        next_observation: &Tensor,
        done: bool,
    ) -> Result<Option<LearnStats>>;
}

/// `reward + discount * max_a' q_next[a'] * (1 - done)`, element-wise over the batch.
pub fn bootstrap_targets(
    q_next: &Tensor,
    rewards: &Tensor,
    dones: &Tensor,
    discount: f64,
) -> Result<Tensor> {
    let max_next = q_next.max(D::Minus1)?;
    let futures = max_next.mul(&dones.affine(-1.0, 1.0)?)?;
    Ok(rewards.add(&futures.affine(discount, 0.0)?)?)
}

/// Deep Q-learning agent over stacked image observations with experience replay.
pub struct ConvDqnAgent {
    action_space: Discrete,
    observation_space: BoxSpace,
    config: DqnConfig,
    q_network: ConvNet,
    memory: ReplayMemory,
    rng: StdRng,
}

impl ConvDqnAgent {
    pub fn new(
        action_space: &Space,
        observation_space: &BoxSpace,
        config: DqnConfig,
        rng: StdRng,
    ) -> Result<Self> {
        let action_space = *action_space
            .as_discrete()
            .ok_or_else(|| AgentError::NonDiscreteActionSpace(action_space.to_string()))?;
        config.validate()?;

        let num_channels = match observation_space.shape() {
            [channels, _, _] => *channels,
            other => {
                return Err(AgentError::ShapeMismatch {
                    expected: vec![1, INPUT_SIZE, INPUT_SIZE],
                    actual: other.to_vec(),
                });
            }
        };
        let q_network = ConvNet::new(num_channels, action_space.n(), config.learning_rate)?;

        Ok(Self {
            action_space,
            observation_space: observation_space.clone(),
            memory: ReplayMemory::new(config.memory_capacity),
            config,
            q_network,
            rng,
        })
    }

    pub fn config(&self) -> &DqnConfig {
        &self.config
    }

    pub fn memory(&self) -> &ReplayMemory {
        &self.memory
    }

    pub fn q_network(&self) -> &ConvNet {
        &self.q_network
    }

    /// Value estimates for a single observation, shape `(num_actions,)`.
    pub fn q_values(&self, observation: &Tensor) -> Result<Tensor> {
        self.observation_space.check_shape(observation)?;
        let q = self.q_network.forward(&observation.unsqueeze(0)?)?;
        Ok(q.squeeze(0)?.detach())
    }

    fn replay(&mut self) -> Result<LearnStats> {
        let batch = self.memory.sample(self.config.batch_size, &mut self.rng);
        let n = batch.len();

        let observations: Vec<&Tensor> = batch.iter().map(|t| &t.observation).collect();
        let next_observations: Vec<&Tensor> = batch.iter().map(|t| &t.next_observation).collect();
        let rewards: Vec<f32> = batch.iter().map(|t| t.reward).collect();
        let dones: Vec<f32> = batch.iter().map(|t| if t.done { 1.0 } else { 0.0 }).collect();
        let actions: Vec<u32> = batch.iter().map(|t| t.action as u32).collect();

        let observation_batch = Tensor::stack(&observations, 0)?;
        let next_observation_batch = Tensor::stack(&next_observations, 0)?;
        let reward_tensor = Tensor::from_vec(rewards, n, &DEVICE)?;
        let done_tensor = Tensor::from_vec(dones, n, &DEVICE)?;
        let action_tensor = Tensor::from_vec(actions, (n, 1), &DEVICE)?;

        let q_next = self.q_network.forward(&next_observation_batch)?.detach();
        let targets =
            bootstrap_targets(&q_next, &reward_tensor, &done_tensor, self.config.discount)?;

        let q_taken = self
            .q_network
            .forward(&observation_batch)?
            .gather(&action_tensor, 1)?
            .squeeze(1)?;
        let loss = loss::mse(&q_taken, &targets)?;

        let mut grads = loss.backward()?;
        let grad_norm =
            clip_gradients(&mut grads, &self.q_network.var_map, self.config.max_grad_norm)?;
        self.q_network.optimiser.step(&grads)?;

        let loss = loss.to_scalar::<f32>()?;
        debug!(loss, grad_norm, batch = n, "applied gradient step");
        Ok(LearnStats { loss, grad_norm })
    }
}

impl Agent for ConvDqnAgent {
    /// Epsilon-greedy over the network's value estimates; `greedy` disables exploration.
    fn act(&mut self, observation: &Tensor, greedy: bool) -> Result<(usize, Pending)> {
        let q_values = self.q_values(observation)?;
        let greedy_action = q_values.argmax(0)?.to_scalar::<u32>()? as usize;
        let action = if greedy || self.rng.random::<f64>() >= self.config.epsilon {
            greedy_action
        } else {
            self.action_space.sample(&mut self.rng)
        };
        Ok((action, Pending::new(observation.clone(), action)))
    }

    fn learn(
        &mut self,
        pending: Pending,
        reward: f32,
        next_observation: &Tensor,
        done: bool,
    ) -> Result<Option<LearnStats>> {
        if !self.action_space.contains(pending.action) {
            return Err(AgentError::InvalidAction {
                action: pending.action,
                n: self.action_space.n(),
            });
        }
        self.observation_space.check_shape(&pending.observation)?;
        self.observation_space.check_shape(next_observation)?;

        self.memory.push(Transition {
            observation: pending.observation,
            action: pending.action,
            reward,
            next_observation: next_observation.clone(),
            done,
        });
        if self.memory.len() < self.config.batch_size {
            return Ok(None);
        }
        self.replay().map(Some)
    }
}

/// Either agent behind the shared `act`/`learn` contract.
pub enum AnyAgent {
    ConvDqn(ConvDqnAgent),
    Random(RandomAgent),
}

impl Agent for AnyAgent {
    fn act(&mut self, observation: &Tensor, greedy: bool) -> Result<(usize, Pending)> {
        match self {
            AnyAgent::ConvDqn(agent) => agent.act(observation, greedy),
            AnyAgent::Random(agent) => agent.act(observation, greedy),
        }
    }

    fn learn(
        &mut self,
        pending: Pending,
        reward: f32,
        next_observation: &Tensor,
        done: bool,
    ) -> Result<Option<LearnStats>> {
        match self {
            AnyAgent::ConvDqn(agent) => agent.learn(pending, reward, next_observation, done),
            AnyAgent::Random(agent) => agent.learn(pending, reward, next_observation, done),
        }
    }
}
