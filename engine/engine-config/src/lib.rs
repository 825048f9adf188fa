//! Centralized configuration loading from config.toml.
//!
//! This crate provides the configuration structs and loading logic shared
//! by the planner binaries.
//!
//! # Configuration Priority
//!
//! Settings are loaded with the following priority (highest to lowest):
//! 1. Environment variables (`SKIRMISH_<SECTION>_<KEY>`)
//! 2. config.toml file
//! 3. Built-in defaults (config.defaults.toml)
//!
//! # Environment Variable Override Pattern
//!
//! ```text
//! SKIRMISH_<SECTION>_<KEY>=value
//!
//! Examples:
//!     SKIRMISH_COMMON_LOG_LEVEL=debug
//!     SKIRMISH_SEARCH_ITERATIONS=200
//!     SKIRMISH_SEARCH_ALGORITHM=ucb1
//!     SKIRMISH_SEARCH_TREE_CAPACITY=10000
//!     SKIRMISH_ACTOR_NUM_RUNNERS=4
//! ```

mod defaults;
mod loader;
mod structs;

pub use defaults::*;
pub use loader::{apply_env_overrides, load_config, load_from_path, CONFIG_SEARCH_PATHS};
pub use structs::*;
