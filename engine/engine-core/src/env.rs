//! Environment adapter contract used by the search engine
//!
//! The planner treats the game as a black-box simulator that it can rewind
//! and replay at will. Everything crossing this boundary is plain bytes or
//! small scalars so that the trait stays object-safe and environments can be
//! stored in the registry as `Box<dyn Environment>`.

use std::fmt;

use crate::metadata::EnvMetadata;

/// Number of seats in every supported game.
pub const NUM_AGENTS: usize = 4;

/// A single agent's discrete action (index into the fixed action set).
pub type Action = u8;

/// One reward per seat, in seat order.
pub type RewardVector = [f32; NUM_AGENTS];

/// Runtime error for environment operations
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Invalid action: {0}")]
    InvalidAction(String),
    #[error("Decoding error: {0}")]
    Decoding(String),
    #[error("Game logic error: {0}")]
    GameLogic(String),
}

/// Opaque, comparable snapshot of the full environment state.
///
/// Used both to rewind the simulator and as the lookup key of the
/// persistent search tree, so two keys compare equal exactly when the
/// underlying states are identical.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct StateKey(Vec<u8>);

impl StateKey {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for StateKey {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateKey(")?;
        for b in self.0.iter().take(16) {
            write!(f, "{:02x}", b)?;
        }
        if self.0.len() > 16 {
            write!(f, "..+{}", self.0.len() - 16)?;
        }
        write!(f, ")")
    }
}

/// Result of advancing the environment by one joint action
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Observation after the step
    pub obs: Vec<u8>,
    /// Reward for every seat
    pub rewards: RewardVector,
    /// Whether the episode has terminated
    pub done: bool,
    /// Additional packed info bits (game specific)
    pub info: u64,
}

/// Simulator interface required by the planner.
///
/// Implementations must be deterministic: resetting or restoring to the same
/// [`StateKey`] and replaying the same joint actions must reproduce the same
/// observations, rewards and terminal flags. Search statistics silently
/// become approximate otherwise.
pub trait Environment: Send + fmt::Debug {
    /// Environment identifier (e.g. "skirmish")
    fn env_id(&self) -> &str;

    /// Display-oriented information about the environment
    fn metadata(&self) -> EnvMetadata;

    /// Size of the fixed discrete action set (k)
    fn num_actions(&self) -> usize;

    /// Seat controlled by the caller; every other seat is driven by [`Environment::act`]
    fn training_agent(&self) -> usize;

    /// Put the environment into `state` and return the observation there
    fn reset(&mut self, state: &StateKey) -> Result<Vec<u8>, EnvError>;

    /// Actions for every seat except the training agent, in seat order
    fn act(&mut self, obs: &[u8]) -> Result<Vec<Action>, EnvError>;

    /// Apply a full joint action (one entry per seat)
    fn step(&mut self, actions: &[Action]) -> Result<StepResult, EnvError>;

    /// Snapshot of the complete current state
    fn serialize_state(&self) -> StateKey;

    /// Rewind to a state previously produced by [`Environment::serialize_state`]
    fn restore_state(&mut self, state: &StateKey) -> Result<(), EnvError>;
}
