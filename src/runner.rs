use tracing::debug;

use crate::{agent::Agent, environment::Environment, error::Result};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EpisodeStats {
    pub total_reward: f32,
    pub steps: usize,
    /// Number of steps on which the agent applied a gradient update.
    pub learn_steps: usize,
    pub mean_loss: Option<f32>,
}

/// Plays one episode, stopping at `done` or after `max_steps`. With `train`
/// set every step is fed back through `learn`; otherwise the agent acts
/// greedily and is never updated.
pub fn run_episode<A, E>(agent: &mut A, env: &mut E, train: bool, max_steps: usize) -> Result<EpisodeStats>
where
    A: Agent + ?Sized,
    E: Environment + ?Sized,
{
    let mut stats = EpisodeStats::default();
    let mut loss_sum = 0.0;
    let mut observation = env.reset()?;

    while stats.steps < max_steps {
        let (action, pending) = agent.act(&observation, !train)?;
        let step = env.step(action)?;
        stats.total_reward += step.reward;
        stats.steps += 1;

        if train {
            if let Some(learned) = agent.learn(pending, step.reward, &step.observation, step.done)? {
                stats.learn_steps += 1;
                loss_sum += learned.loss;
            }
        }

        if step.done {
            break;
        }
        observation = step.observation;
    }

    if stats.learn_steps > 0 {
        stats.mean_loss = Some(loss_sum / stats.learn_steps as f32);
    }
    debug!(?stats, train, "episode finished");
    Ok(stats)
}
