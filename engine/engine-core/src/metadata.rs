//! Environment metadata for logging and configuration
//!
//! Display-oriented information about an environment that callers (the
//! planner's tree dump, the actor's episode logs) use to render actions and
//! size their buffers without knowing the concrete game type.

use serde::{Deserialize, Serialize};

use crate::env::{Action, NUM_AGENTS};

/// Metadata about an environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvMetadata {
    /// Environment identifier (e.g., "skirmish")
    pub env_id: String,

    /// Human-readable display name
    pub display_name: String,

    /// Board width in cells
    pub board_width: usize,

    /// Board height in cells
    pub board_height: usize,

    /// Number of possible actions per seat
    pub num_actions: usize,

    /// Display name for each action index
    pub action_names: Vec<String>,

    /// Number of seats
    pub player_count: usize,

    /// Brief description of the rules
    pub description: String,
}

impl EnvMetadata {
    /// Create a new EnvMetadata with required fields
    pub fn new(env_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            env_id: env_id.into(),
            display_name: display_name.into(),
            board_width: 0,
            board_height: 0,
            num_actions: 0,
            action_names: Vec::new(),
            player_count: NUM_AGENTS,
            description: String::new(),
        }
    }

    /// Builder method for board dimensions
    pub fn with_board(mut self, width: usize, height: usize) -> Self {
        self.board_width = width;
        self.board_height = height;
        self
    }

    /// Builder method for the action set
    pub fn with_actions<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.action_names = names.into_iter().map(Into::into).collect();
        self.num_actions = self.action_names.len();
        self
    }

    /// Builder method for description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Name of an action, falling back to its index when unnamed
    pub fn action_name(&self, action: Action) -> String {
        self.action_names
            .get(action as usize)
            .cloned()
            .unwrap_or_else(|| action.to_string())
    }

    /// Render a joint action as `[Name, Name, ...]`
    pub fn describe_joint(&self, actions: &[Action]) -> String {
        let names: Vec<String> = actions.iter().map(|&a| self.action_name(a)).collect();
        format!("[{}]", names.join(", "))
    }
}
