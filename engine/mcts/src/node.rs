//! Search tree node representation.
//!
//! Each node is one decision point for the searching agent: the state reached
//! after a specific sequence of its own actions from the root. Nodes store
//! visit statistics and the set of actions not yet expanded.

use engine_core::{Action, RewardVector, NUM_AGENTS};

/// Index into the node arena. Using a newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    pub fn is_some(self) -> bool {
        !self.is_none()
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A node in the search tree.
#[derive(Debug, Clone)]
pub struct SearchNode {
    /// Parent node index (NONE for a root). Not an ownership edge.
    pub parent: NodeId,

    /// Action of the searching agent that led here (None for a root)
    pub action: Option<Action>,

    /// Seat of the searching agent, fixed for the whole tree
    pub agent_id: usize,

    /// Children as (action, NodeId) pairs in expansion order
    pub children: Vec<(Action, NodeId)>,

    /// Actions not yet expanded here. Starts as the full action space and
    /// only ever shrinks.
    pub untried_actions: Vec<Action>,

    /// Number of backpropagation passes through this node
    pub visits: u32,

    /// Accumulated corrected reward (importance weighted under EXP3)
    pub reward_sum: f32,

    /// Raw reward vector from the most recent update
    pub last_rewards: RewardVector,

    /// Whether reaching this node ended the simulated episode
    pub is_terminal: bool,

    /// Probability with which the parent last sampled this node (EXP3)
    pub sample_probability: f32,
}

impl SearchNode {
    /// Create a new root node with every action untried.
    pub fn new_root(agent_id: usize, num_actions: usize) -> Self {
        Self {
            parent: NodeId::NONE,
            action: None,
            agent_id,
            children: Vec::new(),
            untried_actions: (0..num_actions).map(|a| a as Action).collect(),
            visits: 0,
            reward_sum: 0.0,
            last_rewards: [0.0; NUM_AGENTS],
            is_terminal: false,
            sample_probability: 1.0 / num_actions.max(1) as f32,
        }
    }

    /// Create a new child node.
    pub fn new_child(
        parent: NodeId,
        action: Action,
        agent_id: usize,
        num_actions: usize,
        is_terminal: bool,
    ) -> Self {
        Self {
            parent,
            action: Some(action),
            is_terminal,
            ..Self::new_root(agent_id, num_actions)
        }
    }

    /// Fold a reward vector into one score from the searching agent's view:
    /// every other seat's reward is negated, then all four are summed.
    #[inline]
    pub fn corrected_reward(&self, rewards: &RewardVector) -> f32 {
        rewards
            .iter()
            .enumerate()
            .map(|(seat, &r)| if seat == self.agent_id { r } else { -r })
            .sum()
    }

    /// Record one backpropagation pass crediting `credit` to this node.
    pub fn update(&mut self, rewards: &RewardVector, credit: f32) {
        self.visits += 1;
        self.last_rewards = *rewards;
        self.reward_sum += credit;
    }

    /// Calculate mean reward = reward_sum / visits.
    /// Returns 0.0 if never visited.
    #[inline]
    pub fn mean_reward(&self) -> f32 {
        if self.visits == 0 {
            0.0
        } else {
            self.reward_sum / self.visits as f32
        }
    }

    /// Non-terminal with nothing left to expand: descend via the policy.
    #[inline]
    pub fn is_fully_expanded(&self) -> bool {
        self.untried_actions.is_empty() && !self.is_terminal
    }

    /// Non-terminal with at least one untried action.
    #[inline]
    pub fn is_expandable(&self) -> bool {
        !self.untried_actions.is_empty() && !self.is_terminal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_none() {
        assert!(NodeId::NONE.is_none());
        assert!(!NodeId::NONE.is_some());
        assert!(!NodeId(0).is_none());
        assert!(NodeId(0).is_some());
    }

    #[test]
    fn test_new_root() {
        let node = SearchNode::new_root(2, 6);

        assert!(node.parent.is_none());
        assert!(node.action.is_none());
        assert_eq!(node.agent_id, 2);
        assert_eq!(node.untried_actions, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(node.visits, 0);
        assert!(!node.is_terminal);
        assert!((node.sample_probability - 1.0 / 6.0).abs() < 1e-6);
        assert!(node.is_expandable());
        assert!(!node.is_fully_expanded());
    }

    #[test]
    fn test_new_child() {
        let node = SearchNode::new_child(NodeId(0), 3, 1, 6, true);
        assert_eq!(node.parent, NodeId(0));
        assert_eq!(node.action, Some(3));
        assert!(node.is_terminal);
        assert_eq!(node.untried_actions.len(), 6);
        // Terminal nodes are never expanded nor descended through
        assert!(!node.is_expandable());
        assert!(!node.is_fully_expanded());
    }

    #[test]
    fn test_corrected_reward() {
        let seat0 = SearchNode::new_root(0, 6);
        assert!((seat0.corrected_reward(&[1.0, -1.0, -1.0, -1.0]) - 4.0).abs() < 1e-6);

        // Own -1 plus three negated +1s
        let seat2 = SearchNode::new_root(2, 6);
        assert!((seat2.corrected_reward(&[1.0, 1.0, -1.0, 1.0]) - (-4.0)).abs() < 1e-6);

        let seat1 = SearchNode::new_root(1, 6);
        assert!((seat1.corrected_reward(&[-1.0, 1.0, 0.0, 0.0]) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_update_and_mean() {
        let mut node = SearchNode::new_root(0, 6);

        // Unvisited
        assert!(node.mean_reward().abs() < 1e-6);

        node.update(&[1.0, -1.0, 0.0, 0.0], 2.0);
        node.update(&[0.0, 0.0, 0.0, 0.0], 0.0);
        assert_eq!(node.visits, 2);
        assert_eq!(node.last_rewards, [0.0; NUM_AGENTS]);
        assert!((node.mean_reward() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_fully_expanded() {
        let mut node = SearchNode::new_root(0, 2);
        node.untried_actions.clear();
        assert!(node.is_fully_expanded());

        node.is_terminal = true;
        assert!(!node.is_fully_expanded());
    }
}
