//! Actor - episode runner for the simultaneous-move MCTS planner
//!
//! A batch process that:
//! 1. Splits `num_episodes` evenly over `num_runners` runner threads
//! 2. Lets runner i plan every move of seat i % 4 with MCTS
//! 3. Logs each finished episode and the aggregate results
//! 4. Writes `<data_dir>/actor_stats.json`

use anyhow::{anyhow, Result};
use clap::Parser;
use std::sync::mpsc;
use std::thread;
use tracing::{error, info};

mod actor;
mod config;
mod stats;

use crate::actor::run_runner;
use crate::config::Config;
use crate::stats::ActorStats;

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    Ok(())
}

fn main() -> Result<()> {
    let config = Config::parse().with_file_fallbacks();
    config.validate()?;

    init_tracing(&config.log_level)?;
    info!(log_level = %config.log_level, "Tracing initialized");

    games_skirmish::register_skirmish();

    let episodes_per_runner = config.episodes_per_runner();
    info!(
        env_id = %config.env_id,
        algorithm = %config.algorithm,
        iterations = config.iterations,
        num_episodes = config.num_episodes,
        num_runners = config.num_runners,
        episodes_per_runner,
        "Starting actor"
    );

    let stats = ActorStats::new(&config.data_dir, &config.env_id, &config.algorithm);
    let (tx, rx) = mpsc::channel();

    let mut handles = Vec::with_capacity(config.num_runners as usize);
    for id in 0..config.num_runners {
        let tx = tx.clone();
        let runner_config = config.clone();
        let handle = thread::Builder::new()
            .name(format!("runner-{}", id))
            .spawn(move || run_runner(runner_config, id, episodes_per_runner, tx))?;
        handles.push(handle);
    }
    // Only runner threads hold senders now, so the loop ends when they finish
    drop(tx);

    let mut failures = 0u32;
    for message in rx {
        match message {
            Ok(outcome) => {
                info!(
                    runner = outcome.runner,
                    episode = outcome.episode,
                    agent = outcome.agent_id,
                    length = outcome.length,
                    reward = outcome.reward,
                    rewards = ?outcome.rewards,
                    elapsed_ms = outcome.elapsed.as_millis() as u64,
                    "Episode finished"
                );
                stats.record_episode(outcome.length, outcome.reward, outcome.elapsed);
                stats.record_search_stats(
                    outcome.search.searches,
                    outcome.search.total_time_us,
                    outcome.search.env_steps,
                );
            }
            Err(e) => {
                error!("Episode failed: {:#}", e);
                failures += 1;
            }
        }
    }

    for handle in handles {
        handle
            .join()
            .map_err(|_| anyhow!("runner thread panicked"))?;
    }

    let snapshot = stats.snapshot();
    info!(
        episodes = snapshot.episodes_completed,
        wins = snapshot.wins,
        losses = snapshot.losses,
        draws = snapshot.draws,
        avg_reward = format!("{:.3}", snapshot.avg_reward),
        avg_length = format!("{:.1}", snapshot.avg_episode_length),
        ms_per_step = format!("{:.2}", snapshot.avg_step_ms),
        "Actor completed"
    );
    stats.write_stats();

    if failures > 0 {
        return Err(anyhow!("{} runner(s) reported a failed episode", failures));
    }
    Ok(())
}
