//! MCTS configuration parameters.

use std::fmt;
use std::str::FromStr;

use crate::search::SearchError;

/// Bandit rule used to descend through fully expanded nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolicyKind {
    /// Deterministic upper-confidence-bound selection, most-visited final choice
    Ucb1,
    /// Exponential-weights sampling for adversarial bandits
    #[default]
    Exp3,
}

impl PolicyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PolicyKind::Ucb1 => "ucb1",
            PolicyKind::Exp3 => "exp3",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ucb1" | "uct" | "duct" => Ok(PolicyKind::Ucb1),
            "exp3" => Ok(PolicyKind::Exp3),
            other => Err(SearchError::InvalidConfig(format!(
                "unknown algorithm '{}' (expected ucb1 or exp3)",
                other
            ))),
        }
    }
}

/// Configuration for one planning call.
#[derive(Debug, Clone)]
pub struct MctsConfig {
    /// Number of select/expand/rollout/backpropagate iterations per decision.
    pub iterations: u32,

    /// Selection policy (and matching final action chooser).
    pub policy: PolicyKind,

    /// Constant `c` in the UCB1 bonus `sqrt(c * ln(N) / n)`.
    pub ucb_exploration: f32,

    /// EXP3 exploration floor. `None` derives `1 / k` from the action count;
    /// the learning rate is always `gamma / k`.
    pub exp3_gamma: Option<f32>,

    /// Maximum number of random steps in one rollout. A rollout that hits
    /// the cap backpropagates whatever rewards the last step reported.
    pub rollout_step_cap: u32,

    /// Maximum number of remembered states in the persistent tree.
    /// `None` keeps every state for the whole episode.
    pub tree_capacity: Option<usize>,

    /// Log the whole tree after each search instead of the root children only.
    pub log_tree: bool,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            iterations: 20,
            policy: PolicyKind::Exp3,
            ucb_exploration: 2.0,
            exp3_gamma: None,
            rollout_step_cap: 1000,
            tree_capacity: None,
            log_tree: false,
        }
    }
}

impl MctsConfig {
    /// Create a fast config for testing.
    pub fn for_testing() -> Self {
        Self {
            iterations: 30,
            rollout_step_cap: 50,
            ..Self::default()
        }
    }

    /// Builder pattern: set number of iterations.
    pub fn with_iterations(mut self, n: u32) -> Self {
        self.iterations = n;
        self
    }

    /// Builder pattern: set selection policy.
    pub fn with_policy(mut self, policy: PolicyKind) -> Self {
        self.policy = policy;
        self
    }

    /// Builder pattern: set UCB1 exploration constant.
    pub fn with_ucb_exploration(mut self, c: f32) -> Self {
        self.ucb_exploration = c;
        self
    }

    /// Builder pattern: set EXP3 exploration floor.
    pub fn with_exp3_gamma(mut self, gamma: f32) -> Self {
        self.exp3_gamma = Some(gamma);
        self
    }

    /// Builder pattern: set rollout step cap.
    pub fn with_rollout_step_cap(mut self, cap: u32) -> Self {
        self.rollout_step_cap = cap;
        self
    }

    /// Builder pattern: bound the persistent tree.
    pub fn with_tree_capacity(mut self, capacity: Option<usize>) -> Self {
        self.tree_capacity = capacity;
        self
    }

    /// Builder pattern: dump the whole tree after each search.
    pub fn with_log_tree(mut self, log_tree: bool) -> Self {
        self.log_tree = log_tree;
        self
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        if self.iterations == 0 {
            return Err(SearchError::InvalidConfig(
                "iterations must be positive".to_string(),
            ));
        }
        if !self.ucb_exploration.is_finite() || self.ucb_exploration < 0.0 {
            return Err(SearchError::InvalidConfig(format!(
                "ucb_exploration must be a non-negative number, got {}",
                self.ucb_exploration
            )));
        }
        if let Some(gamma) = self.exp3_gamma {
            if !(gamma > 0.0 && gamma <= 1.0) {
                return Err(SearchError::InvalidConfig(format!(
                    "exp3_gamma must be in (0, 1], got {}",
                    gamma
                )));
            }
        }
        if self.tree_capacity == Some(0) {
            return Err(SearchError::InvalidConfig(
                "tree_capacity must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}
