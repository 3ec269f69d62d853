use std::{error::Error, path::PathBuf, time::Instant};

use clap::{Parser, ValueEnum};
use pixel_dqn::{
    AnyAgent, CatchEnv, ConvDqnAgent, DqnConfig, Environment, RandomAgent, preprocess::Preprocessed,
    run_episode,
};
use rand::{SeedableRng, rngs::StdRng};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AgentKind {
    Dqn,
    Random,
}

/// Train an agent on the pixel catch game.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    #[arg(long, value_enum, default_value_t = AgentKind::Dqn)]
    agent: AgentKind,

    #[arg(long, default_value_t = 500)]
    episodes: usize,

    /// JSON file with DQN hyper-parameters; missing keys keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Run a greedy evaluation episode every N training episodes (0 disables).
    #[arg(long, default_value_t = 50)]
    eval_every: usize,

    #[arg(long, default_value_t = 1_000)]
    max_steps: usize,

    /// Side length in pixels of the rendered RGB frames.
    #[arg(long, default_value_t = 84)]
    frame_size: usize,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => DqnConfig::from_json_file(path)?,
        None => DqnConfig::default(),
    };

    let mut env = Preprocessed::new(CatchEnv::new(
        args.frame_size,
        StdRng::seed_from_u64(args.seed),
    )?)?;
    let agent_rng = StdRng::seed_from_u64(args.seed.wrapping_add(1));
    let mut agent = match args.agent {
        AgentKind::Dqn => AnyAgent::ConvDqn(ConvDqnAgent::new(
            &env.action_space(),
            &env.observation_space(),
            config.clone(),
            agent_rng,
        )?),
        AgentKind::Random => AnyAgent::Random(RandomAgent::new(&env.action_space(), agent_rng)?),
    };
    info!(agent = ?args.agent, ?config, "starting training");

    let start = Instant::now();
    let mut recent_reward = 0.0;
    for episode in 1..=args.episodes {
        let stats = run_episode(&mut agent, &mut env, true, args.max_steps)?;
        recent_reward += stats.total_reward;

        if args.eval_every > 0 && episode % args.eval_every == 0 {
            let eval = run_episode(&mut agent, &mut env, false, args.max_steps)?;
            info!(
                episode,
                mean_train_reward = recent_reward / args.eval_every as f32,
                eval_reward = eval.total_reward,
                mean_loss = ?stats.mean_loss,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "evaluation"
            );
            recent_reward = 0.0;
        }
    }

    info!(
        episodes = args.episodes,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "training finished"
    );
    Ok(())
}
