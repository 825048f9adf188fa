//! Configuration for the actor binary
//!
//! Configuration is loaded from config.toml with environment variable overrides.
//! CLI arguments take highest priority, followed by env vars, then config.toml.

use anyhow::{anyhow, Result};
use clap::{ArgAction, Parser};
use engine_config::{load_config, CentralConfig};
use mcts::{MctsConfig, PolicyKind};
use once_cell::sync::Lazy;
use tracing::level_filters::LevelFilter;

// Load central config once at startup
static CENTRAL_CONFIG: Lazy<CentralConfig> = Lazy::new(load_config);

// Default value functions that read from central config
fn default_env_id() -> String {
    CENTRAL_CONFIG.common.env_id.clone()
}

fn default_data_dir() -> String {
    CENTRAL_CONFIG.common.data_dir.clone()
}

fn default_log_level() -> String {
    CENTRAL_CONFIG.common.log_level.clone()
}

fn default_num_episodes() -> u32 {
    CENTRAL_CONFIG.actor.num_episodes
}

fn default_num_runners() -> u32 {
    CENTRAL_CONFIG.actor.num_runners
}

fn default_seed() -> u64 {
    CENTRAL_CONFIG.actor.seed
}

fn default_max_steps() -> u16 {
    CENTRAL_CONFIG.actor.max_steps
}

fn default_iterations() -> u32 {
    CENTRAL_CONFIG.search.iterations
}

fn default_algorithm() -> String {
    CENTRAL_CONFIG.search.algorithm.clone()
}

fn default_ucb_exploration() -> f64 {
    CENTRAL_CONFIG.search.ucb_exploration
}

fn default_rollout_step_cap() -> u32 {
    CENTRAL_CONFIG.search.rollout_step_cap
}

fn default_print_tree() -> bool {
    CENTRAL_CONFIG.search.print_tree
}

#[derive(Parser, Debug, Clone)]
#[command(name = "actor")]
#[command(about = "Plays episodes with the simultaneous-move MCTS planner")]
#[command(
    long_about = "Runs full episodes in parallel runner threads. Runner i controls seat i % 4
and plans every move with MCTS; the other seats follow the game's built-in policy.

Configuration is loaded from config.toml with environment variable overrides.
CLI arguments take highest priority."
)]
pub struct Config {
    /// Environment ID to run (e.g., skirmish)
    #[arg(long, default_value_t = default_env_id())]
    pub env_id: String,

    /// Directory for the statistics snapshot
    #[arg(long, default_value_t = default_data_dir())]
    pub data_dir: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value_t = default_log_level())]
    pub log_level: String,

    /// Total episodes to play across all runners
    #[arg(long, default_value_t = default_num_episodes())]
    pub num_episodes: u32,

    /// Number of parallel runner threads
    #[arg(long, default_value_t = default_num_runners())]
    pub num_runners: u32,

    /// Base seed; runner and episode indices are added to it
    #[arg(long, default_value_t = default_seed())]
    pub seed: u64,

    /// Episode step limit for the skirmish environment
    #[arg(long, default_value_t = default_max_steps())]
    pub max_steps: u16,

    /// MCTS iterations per decision
    #[arg(long, default_value_t = default_iterations())]
    pub iterations: u32,

    /// Selection algorithm (ucb1 or exp3)
    #[arg(long, default_value_t = default_algorithm())]
    pub algorithm: String,

    /// UCB1 exploration constant
    #[arg(long, default_value_t = default_ucb_exploration())]
    pub ucb_exploration: f64,

    /// EXP3 exploration floor (defaults to 1 / number of actions)
    #[arg(long)]
    pub exp3_gamma: Option<f64>,

    /// Maximum random steps per rollout
    #[arg(long, default_value_t = default_rollout_step_cap())]
    pub rollout_step_cap: u32,

    /// Maximum remembered states per runner tree (unbounded if unset)
    #[arg(long)]
    pub tree_capacity: Option<usize>,

    /// Log the whole search tree after every decision (at debug level)
    #[arg(long, action = ArgAction::Set, default_value_t = default_print_tree())]
    pub print_tree: bool,
}

impl Config {
    /// Fill optional settings left unset on the command line from config.toml.
    pub fn with_file_fallbacks(mut self) -> Self {
        self.exp3_gamma = self.exp3_gamma.or(CENTRAL_CONFIG.search.exp3_gamma);
        self.tree_capacity = self.tree_capacity.or(CENTRAL_CONFIG.search.tree_capacity);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.env_id.is_empty() {
            return Err(anyhow!("env_id cannot be empty"));
        }

        if self.num_runners == 0 {
            return Err(anyhow!("num_runners must be greater than 0"));
        }

        if self.num_episodes == 0 {
            return Err(anyhow!("num_episodes must be greater than 0"));
        }

        if self.num_episodes % self.num_runners != 0 {
            return Err(anyhow!(
                "num_episodes ({}) must be divisible by num_runners ({})",
                self.num_episodes,
                self.num_runners
            ));
        }

        if self.max_steps == 0 {
            return Err(anyhow!("max_steps must be greater than 0"));
        }

        if self.log_level.parse::<LevelFilter>().is_err() {
            return Err(anyhow!(
                "invalid log level '{}', expected one of trace, debug, info, warn, error",
                self.log_level
            ));
        }

        self.mcts_config()?.validate()?;

        Ok(())
    }

    /// Episodes each runner plays.
    pub fn episodes_per_runner(&self) -> u32 {
        self.num_episodes / self.num_runners.max(1)
    }

    /// Search settings for the planner.
    pub fn mcts_config(&self) -> Result<MctsConfig> {
        let policy: PolicyKind = self.algorithm.parse()?;
        let mut config = MctsConfig::default()
            .with_iterations(self.iterations)
            .with_policy(policy)
            .with_ucb_exploration(self.ucb_exploration as f32)
            .with_rollout_step_cap(self.rollout_step_cap)
            .with_tree_capacity(self.tree_capacity)
            .with_log_tree(self.print_tree);
        if let Some(gamma) = self.exp3_gamma {
            config = config.with_exp3_gamma(gamma as f32);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            env_id: "skirmish".into(),
            data_dir: "../data".into(),
            log_level: "info".into(),
            num_episodes: 4,
            num_runners: 2,
            seed: 0,
            max_steps: 100,
            iterations: 20,
            algorithm: "exp3".into(),
            ucb_exploration: 2.0,
            exp3_gamma: None,
            rollout_step_cap: 1000,
            tree_capacity: None,
            print_tree: false,
        }
    }

    #[test]
    fn validate_accepts_valid_configuration() {
        let cfg = base_config();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_env_id() {
        let mut cfg = base_config();
        cfg.env_id.clear();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("env_id"));
    }

    #[test]
    fn validate_rejects_zero_runners() {
        let mut cfg = base_config();
        cfg.num_runners = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("num_runners"));
    }

    #[test]
    fn validate_rejects_uneven_episode_split() {
        let mut cfg = base_config();
        cfg.num_episodes = 5;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("divisible"));
    }

    #[test]
    fn validate_rejects_zero_episodes() {
        let mut cfg = base_config();
        cfg.num_episodes = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("num_episodes"));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut cfg = base_config();
        cfg.log_level = "nope".into();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("invalid log level"));
    }

    #[test]
    fn validate_rejects_unknown_algorithm() {
        let mut cfg = base_config();
        cfg.algorithm = "alphazero".into();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("unknown algorithm"));
    }

    #[test]
    fn validate_rejects_zero_iterations() {
        let mut cfg = base_config();
        cfg.iterations = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("iterations"));
    }

    #[test]
    fn validate_rejects_out_of_range_gamma() {
        let mut cfg = base_config();
        cfg.exp3_gamma = Some(1.5);
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("exp3_gamma"));
    }

    #[test]
    fn mcts_config_carries_search_settings() {
        let mut cfg = base_config();
        cfg.algorithm = "UCT".into();
        cfg.iterations = 64;
        cfg.ucb_exploration = 0.5;
        cfg.exp3_gamma = Some(0.25);
        cfg.tree_capacity = Some(128);
        cfg.print_tree = true;

        let search = cfg.mcts_config().unwrap();
        assert_eq!(search.policy, PolicyKind::Ucb1);
        assert_eq!(search.iterations, 64);
        assert!((search.ucb_exploration - 0.5).abs() < 1e-6);
        assert_eq!(search.exp3_gamma, Some(0.25));
        assert_eq!(search.rollout_step_cap, 1000);
        assert_eq!(search.tree_capacity, Some(128));
        assert!(search.log_tree);
    }

    #[test]
    fn episodes_are_split_evenly() {
        let mut cfg = base_config();
        cfg.num_episodes = 12;
        cfg.num_runners = 4;
        assert_eq!(cfg.episodes_per_runner(), 3);
    }

    #[test]
    fn cli_arguments_override_defaults() {
        let cfg = Config::try_parse_from([
            "actor",
            "--algorithm",
            "ucb1",
            "--iterations",
            "7",
            "--num-runners",
            "3",
            "--tree-capacity",
            "50",
            "--print-tree",
            "true",
        ])
        .unwrap();

        assert_eq!(cfg.algorithm, "ucb1");
        assert_eq!(cfg.iterations, 7);
        assert_eq!(cfg.num_runners, 3);
        assert_eq!(cfg.tree_capacity, Some(50));
        assert!(cfg.print_tree);
        assert!(cfg.exp3_gamma.is_none());
    }
}
