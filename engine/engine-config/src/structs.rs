//! Configuration struct definitions.
//!
//! All config structs with serde deserialization support and default values.

use crate::defaults;
use serde::Deserialize;

// ============================================================================
// Serde default functions (required for #[serde(default = "...")])
// These call the accessor functions from defaults module
// ============================================================================

fn d_data_dir() -> String {
    defaults::data_dir().into()
}
fn d_env_id() -> String {
    defaults::env_id().into()
}
fn d_log_level() -> String {
    defaults::log_level().into()
}
fn d_iterations() -> u32 {
    defaults::iterations()
}
fn d_algorithm() -> String {
    defaults::algorithm().into()
}
fn d_ucb_exploration() -> f64 {
    defaults::ucb_exploration()
}
fn d_rollout_step_cap() -> u32 {
    defaults::rollout_step_cap()
}
fn d_print_tree() -> bool {
    defaults::print_tree()
}
fn d_num_episodes() -> u32 {
    defaults::num_episodes()
}
fn d_num_runners() -> u32 {
    defaults::num_runners()
}
fn d_seed() -> u64 {
    defaults::seed()
}
fn d_max_steps() -> u16 {
    defaults::max_steps()
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Root configuration structure matching config.toml
#[derive(Debug, Deserialize, Default, Clone)]
pub struct CentralConfig {
    #[serde(default)]
    pub common: CommonConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub actor: ActorConfig,
}

/// Common configuration shared by all components
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CommonConfig {
    #[serde(default = "d_data_dir")]
    pub data_dir: String,
    #[serde(default = "d_env_id")]
    pub env_id: String,
    #[serde(default = "d_log_level")]
    pub log_level: String,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir().into(),
            env_id: defaults::env_id().into(),
            log_level: defaults::log_level().into(),
        }
    }
}

/// Planner configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    #[serde(default = "d_iterations")]
    pub iterations: u32,
    /// "ucb1" or "exp3"
    #[serde(default = "d_algorithm")]
    pub algorithm: String,
    #[serde(default = "d_ucb_exploration")]
    pub ucb_exploration: f64,
    /// EXP3 exploration floor (None = 1/k)
    #[serde(default)]
    pub exp3_gamma: Option<f64>,
    #[serde(default = "d_rollout_step_cap")]
    pub rollout_step_cap: u32,
    /// Maximum number of remembered states (None = unbounded)
    #[serde(default)]
    pub tree_capacity: Option<usize>,
    #[serde(default = "d_print_tree")]
    pub print_tree: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            iterations: defaults::iterations(),
            algorithm: defaults::algorithm().into(),
            ucb_exploration: defaults::ucb_exploration(),
            exp3_gamma: None,
            rollout_step_cap: defaults::rollout_step_cap(),
            tree_capacity: None,
            print_tree: defaults::print_tree(),
        }
    }
}

/// Episode runner configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ActorConfig {
    #[serde(default = "d_num_episodes")]
    pub num_episodes: u32,
    #[serde(default = "d_num_runners")]
    pub num_runners: u32,
    /// Base seed; runner i uses seed + i
    #[serde(default = "d_seed")]
    pub seed: u64,
    /// Episode length limit passed to the environment
    #[serde(default = "d_max_steps")]
    pub max_steps: u16,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            num_episodes: defaults::num_episodes(),
            num_runners: defaults::num_runners(),
            seed: defaults::seed(),
            max_steps: defaults::max_steps(),
        }
    }
}
