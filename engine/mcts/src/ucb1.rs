//! UCB1 selection: deterministic upper-confidence-bound descent.
//!
//! Children are scored by `mean + sqrt(c * ln(N) / n)` and the final move is
//! the most visited root child. Ties go to the last maximum in expansion
//! order.

use engine_core::Action;
use rand_chacha::ChaCha20Rng;

use crate::node::{NodeId, SearchNode};
use crate::policy::{root_children, selectable_children, SelectionPolicy};
use crate::search::SearchError;
use crate::tree::SearchTree;

/// UCB1 selection policy.
#[derive(Debug, Clone, Copy)]
pub struct Ucb1 {
    exploration: f32,
}

impl Ucb1 {
    pub fn new(exploration: f32) -> Self {
        Self { exploration }
    }

    /// UCB1 score of `child` given `ln(parent visits)`.
    ///
    /// Unvisited children score `+inf` so they are always tried first.
    #[inline]
    pub fn score(&self, child: &SearchNode, ln_parent_visits: f32) -> f32 {
        if child.visits == 0 {
            return f32::INFINITY;
        }
        let bonus = (self.exploration * ln_parent_visits / child.visits as f32).sqrt();
        child.mean_reward() + bonus
    }
}

impl Default for Ucb1 {
    fn default() -> Self {
        Self::new(2.0)
    }
}

impl SelectionPolicy for Ucb1 {
    fn name(&self) -> &'static str {
        "ucb1"
    }

    fn select_child(
        &self,
        tree: &mut SearchTree,
        node: NodeId,
        _rng: &mut ChaCha20Rng,
    ) -> Result<NodeId, SearchError> {
        let parent_visits = tree.get(node).visits;
        // ln(0) is undefined; an unvisited parent gives no exploration bonus
        let ln_parent = if parent_visits > 0 {
            (parent_visits as f32).ln()
        } else {
            0.0
        };

        let tree = &*tree;
        selectable_children(tree, node)?
            .iter()
            .max_by(|(_, a), (_, b)| {
                let score_a = self.score(tree.get(*a), ln_parent);
                let score_b = self.score(tree.get(*b), ln_parent);
                score_a
                    .partial_cmp(&score_b)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|&(_, id)| id)
            .ok_or(SearchError::NoChildren)
    }

    fn choose_action(
        &self,
        tree: &SearchTree,
        root: NodeId,
        _rng: &mut ChaCha20Rng,
    ) -> Result<Action, SearchError> {
        root_children(tree, root)?
            .iter()
            .max_by_key(|(_, id)| tree.get(*id).visits)
            .map(|&(action, _)| action)
            .ok_or(SearchError::NoChildren)
    }
}
