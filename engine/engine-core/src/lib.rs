//! Core contract between the planner and the games it plans in
//!
//! This crate provides the fundamental abstractions for simulation:
//! - `Environment`: object-safe, rewindable simulator interface
//! - `StateKey`: opaque comparable state snapshot (tree-reuse key)
//! - `game_utils`: joint-action assembly and shared reward layouts
//! - `registry`: static registration of environment factories by env_id
//! - `EnvMetadata`: display information (action names, board size)

pub mod env;
pub mod game_utils;
pub mod metadata;
pub mod registry;

// Re-export main types for convenience
pub use env::{Action, EnvError, Environment, RewardVector, StateKey, StepResult, NUM_AGENTS};
pub use game_utils::{ffa_rewards, joint_action};
pub use metadata::EnvMetadata;
pub use registry::{clear_registry, create_env, is_registered, list_registered_envs, register_env, EnvFactory};
