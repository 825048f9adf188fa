//! Configuration loading logic.
//!
//! Handles loading config from files and applying environment variable overrides.

use crate::CentralConfig;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Standard locations to search for config.toml
pub const CONFIG_SEARCH_PATHS: &[&str] = &[
    "config.toml",    // Current directory
    "../config.toml", // Parent directory (when running from a crate directory)
];

/// Load the central configuration from config.toml.
///
/// Searches for config.toml in the following order:
/// 1. Path specified by SKIRMISH_CONFIG environment variable
/// 2. Current directory (config.toml)
/// 3. Parent directory (../config.toml)
///
/// After loading, environment variable overrides are applied.
pub fn load_config() -> CentralConfig {
    // Check for explicit config path
    if let Ok(path) = std::env::var("SKIRMISH_CONFIG") {
        let path = PathBuf::from(&path);
        if path.exists() {
            info!("Loading config from SKIRMISH_CONFIG: {}", path.display());
            return load_from_path(&path);
        }
        warn!(
            "SKIRMISH_CONFIG={} not found, searching defaults",
            path.display()
        );
    }

    for path_str in CONFIG_SEARCH_PATHS {
        let path = PathBuf::from(path_str);
        if path.exists() {
            info!("Loading config from {}", path.display());
            return load_from_path(&path);
        }
    }

    debug!("No config.toml found, using built-in defaults");
    apply_env_overrides(CentralConfig::default())
}

/// Load configuration from a specific path.
pub fn load_from_path(path: &Path) -> CentralConfig {
    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => apply_env_overrides(config),
            Err(e) => {
                warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                apply_env_overrides(CentralConfig::default())
            }
        },
        Err(e) => {
            warn!("Failed to read {}: {}, using defaults", path.display(), e);
            apply_env_overrides(CentralConfig::default())
        }
    }
}

/// Macro to reduce env override boilerplate
macro_rules! env_override {
    // String field
    ($config:expr, $section:ident . $field:ident, $key:expr) => {
        if let Ok(v) = std::env::var($key) {
            $config.$section.$field = v;
        }
    };
    // Parseable field (u32, u64, f64, bool, etc.)
    ($config:expr, $section:ident . $field:ident, $key:expr, parse) => {
        if let Ok(v) =
            std::env::var($key).and_then(|s| s.parse().map_err(|_| std::env::VarError::NotPresent))
        {
            $config.$section.$field = v;
        }
    };
    // Optional parseable field (Option<f64>, Option<usize>, etc.)
    ($config:expr, $section:ident . $field:ident, $key:expr, optional_parse) => {
        if let Ok(v) =
            std::env::var($key).and_then(|s| s.parse().map_err(|_| std::env::VarError::NotPresent))
        {
            $config.$section.$field = Some(v);
        }
    };
}

/// Apply environment variable overrides to a configuration.
///
/// Environment variables follow the pattern: SKIRMISH_<SECTION>_<KEY>
pub fn apply_env_overrides(mut config: CentralConfig) -> CentralConfig {
    // Common
    env_override!(config, common.env_id, "SKIRMISH_COMMON_ENV_ID");
    env_override!(config, common.data_dir, "SKIRMISH_COMMON_DATA_DIR");
    env_override!(config, common.log_level, "SKIRMISH_COMMON_LOG_LEVEL");

    // Search
    env_override!(
        config,
        search.iterations,
        "SKIRMISH_SEARCH_ITERATIONS",
        parse
    );
    env_override!(config, search.algorithm, "SKIRMISH_SEARCH_ALGORITHM");
    env_override!(
        config,
        search.ucb_exploration,
        "SKIRMISH_SEARCH_UCB_EXPLORATION",
        parse
    );
    env_override!(
        config,
        search.exp3_gamma,
        "SKIRMISH_SEARCH_EXP3_GAMMA",
        optional_parse
    );
    env_override!(
        config,
        search.rollout_step_cap,
        "SKIRMISH_SEARCH_ROLLOUT_STEP_CAP",
        parse
    );
    env_override!(
        config,
        search.tree_capacity,
        "SKIRMISH_SEARCH_TREE_CAPACITY",
        optional_parse
    );
    env_override!(
        config,
        search.print_tree,
        "SKIRMISH_SEARCH_PRINT_TREE",
        parse
    );

    // Actor
    env_override!(
        config,
        actor.num_episodes,
        "SKIRMISH_ACTOR_NUM_EPISODES",
        parse
    );
    env_override!(
        config,
        actor.num_runners,
        "SKIRMISH_ACTOR_NUM_RUNNERS",
        parse
    );
    env_override!(config, actor.seed, "SKIRMISH_ACTOR_SEED", parse);
    env_override!(
        config,
        actor.max_steps,
        "SKIRMISH_ACTOR_MAX_STEPS",
        parse
    );

    config
}
