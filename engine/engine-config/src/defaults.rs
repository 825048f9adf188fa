//! Default configuration values loaded from config.defaults.toml.
//!
//! This module loads defaults from the shared TOML file at compile time,
//! so the binary and the documented defaults can never drift apart.

use once_cell::sync::Lazy;
use serde::Deserialize;

/// The embedded defaults TOML file (loaded at compile time)
const DEFAULTS_TOML: &str = include_str!("../../../config.defaults.toml");

/// Parsed defaults structure (parsed once at first use)
static DEFAULTS: Lazy<DefaultsConfig> = Lazy::new(|| {
    toml::from_str(DEFAULTS_TOML).expect("config.defaults.toml should be valid TOML")
});

// ============================================================================
// Internal structs for parsing config.defaults.toml
// ============================================================================

#[derive(Debug, Deserialize)]
struct DefaultsConfig {
    common: CommonDefaults,
    search: SearchDefaults,
    actor: ActorDefaults,
}

#[derive(Debug, Deserialize)]
struct CommonDefaults {
    data_dir: String,
    env_id: String,
    log_level: String,
}

#[derive(Debug, Deserialize)]
struct SearchDefaults {
    iterations: u32,
    algorithm: String,
    ucb_exploration: f64,
    rollout_step_cap: u32,
    print_tree: bool,
}

#[derive(Debug, Deserialize)]
struct ActorDefaults {
    num_episodes: u32,
    num_runners: u32,
    seed: u64,
    max_steps: u16,
}

// ============================================================================
// Public accessor functions
// ============================================================================

// Common
pub fn data_dir() -> &'static str {
    &DEFAULTS.common.data_dir
}
pub fn env_id() -> &'static str {
    &DEFAULTS.common.env_id
}
pub fn log_level() -> &'static str {
    &DEFAULTS.common.log_level
}

// Search
pub fn iterations() -> u32 {
    DEFAULTS.search.iterations
}
pub fn algorithm() -> &'static str {
    &DEFAULTS.search.algorithm
}
pub fn ucb_exploration() -> f64 {
    DEFAULTS.search.ucb_exploration
}
pub fn rollout_step_cap() -> u32 {
    DEFAULTS.search.rollout_step_cap
}
pub fn print_tree() -> bool {
    DEFAULTS.search.print_tree
}

// Actor
pub fn num_episodes() -> u32 {
    DEFAULTS.actor.num_episodes
}
pub fn num_runners() -> u32 {
    DEFAULTS.actor.num_runners
}
pub fn seed() -> u64 {
    DEFAULTS.actor.seed
}
pub fn max_steps() -> u16 {
    DEFAULTS.actor.max_steps
}
