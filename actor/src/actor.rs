//! Episode runners driving the planner against a live environment

use anyhow::{anyhow, Context, Result};
use engine_core::{create_env, joint_action, Environment, RewardVector, NUM_AGENTS};
use games_skirmish::Skirmish;
use mcts::{plan, MctsConfig, PersistentTree, SearchStats};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

use crate::config::Config;

/// Result of one finished episode, reported by a runner thread.
#[derive(Debug, Clone)]
pub struct EpisodeOutcome {
    pub runner: u32,
    pub episode: u32,
    /// Seat the planner controlled
    pub agent_id: usize,
    /// Real steps played
    pub length: u32,
    /// Final reward of the planning seat
    pub reward: f32,
    /// Final reward vector for every seat
    pub rewards: RewardVector,
    pub elapsed: Duration,
    pub search: EpisodeSearchStats,
}

/// Search effort accumulated over an episode.
#[derive(Debug, Clone, Default)]
pub struct EpisodeSearchStats {
    /// Number of planning calls
    pub searches: u32,
    /// Total wall-clock time across all searches (microseconds)
    pub total_time_us: u64,
    /// Simulator steps taken by the searches
    pub env_steps: u64,
    /// Rollouts stopped by the step cap
    pub capped_rollouts: u32,
    /// Iterations whose selection ended on a terminal node
    pub terminal_selections: u32,
}

impl EpisodeSearchStats {
    /// Add stats from a single search.
    fn add(&mut self, stats: &SearchStats) {
        self.searches += 1;
        self.total_time_us += stats.elapsed_us;
        self.env_steps += stats.env_steps;
        self.capped_rollouts += stats.capped_rollouts;
        self.terminal_selections += stats.terminal_selections;
    }

    /// Log a summary of the episode's search effort.
    fn log_summary(&self, runner: u32, episode: u32) {
        if self.searches == 0 {
            return;
        }

        let total_ms = self.total_time_us as f64 / 1000.0;
        debug!(
            runner,
            episode,
            searches = self.searches,
            total_ms = format!("{:.1}", total_ms),
            avg_search_ms = format!("{:.2}", total_ms / self.searches as f64),
            env_steps = self.env_steps,
            capped_rollouts = self.capped_rollouts,
            terminal_selections = self.terminal_selections,
            "Episode search stats"
        );
    }
}

/// Build the environment a runner plays in.
///
/// Skirmish is built directly so the configured step limit applies; any other
/// id goes through the registry with that game's own defaults.
pub fn make_env(config: &Config, seat: usize, seed: u64) -> Result<Box<dyn Environment>> {
    if config.env_id == "skirmish" {
        return Ok(Box::new(Skirmish::with_max_steps(seat, seed, config.max_steps)));
    }
    create_env(&config.env_id, seat, seed)
        .ok_or_else(|| anyhow!("Environment '{}' is not registered", config.env_id))
}

/// One runner: a fixed seat, its own environments, its own search tree.
pub struct Runner {
    id: u32,
    seat: usize,
    config: Config,
    search: MctsConfig,
    tree: PersistentTree,
    rng: ChaCha20Rng,
}

impl Runner {
    pub fn new(config: &Config, id: u32) -> Result<Self> {
        let seat = id as usize % NUM_AGENTS;
        let search = config.mcts_config()?;
        // Probe the environment once for its action space
        let probe = make_env(config, seat, config.seed)?;
        let tree = PersistentTree::new(seat, probe.num_actions()).with_capacity(search.tree_capacity);

        Ok(Self {
            id,
            seat,
            config: config.clone(),
            search,
            tree,
            rng: ChaCha20Rng::seed_from_u64(config.seed.wrapping_add(id as u64)),
        })
    }

    pub fn seat(&self) -> usize {
        self.seat
    }

    /// Seed of the `episode`-th episode of this runner, unique across runners.
    fn episode_seed(&self, episode: u32) -> u64 {
        let global = episode as u64 * self.config.num_runners as u64 + self.id as u64;
        self.config.seed.wrapping_add(global)
    }

    /// Play one full episode, planning every move for this runner's seat.
    pub fn play_episode(&mut self, episode: u32) -> Result<EpisodeOutcome> {
        let start = Instant::now();
        let mut env = make_env(&self.config, self.seat, self.episode_seed(episode))?;
        let metadata = env.metadata();
        self.tree.clear();

        let initial = env.serialize_state();
        let mut obs = env.reset(&initial)?;
        let mut length = 0u32;
        let mut search_stats = EpisodeSearchStats::default();

        debug!(
            runner = self.id,
            episode,
            seat = self.seat,
            env_id = %self.config.env_id,
            "Starting episode"
        );

        let rewards = loop {
            let root = env.serialize_state();
            let result = plan(&mut *env, &mut self.tree, &self.search, &root, &mut self.rng)
                .with_context(|| format!("planning failed at step {}", length))?;
            search_stats.add(&result.stats);

            let others = env.act(&obs)?;
            let actions = joint_action(&others, self.seat, result.action)?;
            let step = env.step(&actions)?;
            length += 1;

            trace!(
                runner = self.id,
                step = length,
                actions = %metadata.describe_joint(&actions),
                rewards = ?step.rewards,
                "Step"
            );

            if step.done {
                break step.rewards;
            }
            obs = step.obs;
        };

        search_stats.log_summary(self.id, episode);

        Ok(EpisodeOutcome {
            runner: self.id,
            episode,
            agent_id: self.seat,
            length,
            reward: rewards[self.seat],
            rewards,
            elapsed: start.elapsed(),
            search: search_stats,
        })
    }
}

/// Thread body: play `episodes` episodes and report each over `tx`.
///
/// Stops at the first failed episode after reporting the error.
pub fn run_runner(config: Config, id: u32, episodes: u32, tx: Sender<Result<EpisodeOutcome>>) {
    let mut runner = match Runner::new(&config, id) {
        Ok(runner) => runner,
        Err(e) => {
            let _ = tx.send(Err(e.context(format!("runner {} failed to start", id))));
            return;
        }
    };

    info!(runner = id, seat = runner.seat(), episodes, "Runner started");

    for episode in 0..episodes {
        let outcome = runner
            .play_episode(episode)
            .with_context(|| format!("runner {} episode {}", id, episode));
        let failed = outcome.is_err();
        if tx.send(outcome).is_err() || failed {
            return;
        }
    }
}
