//! Selection policy interface shared by the bandit rules.
//!
//! A policy decides three things: which child to descend into from a fully
//! expanded node, how much credit a backpropagated reward vector is worth at
//! a node, and which root action to actually play once the search is over.

use engine_core::{Action, RewardVector};
use rand::Rng;
use rand_chacha::ChaCha20Rng;

use crate::node::{NodeId, SearchNode};
use crate::search::SearchError;
use crate::tree::SearchTree;

/// Bandit rule driving tree descent and the final action choice.
pub trait SelectionPolicy {
    /// Short name for logging.
    fn name(&self) -> &'static str;

    /// Pick the child of `node` to descend into.
    ///
    /// `node` must be fully expanded (no untried actions, not terminal).
    /// Takes the tree mutably so policies can record selection state on the
    /// chosen child.
    fn select_child(
        &self,
        tree: &mut SearchTree,
        node: NodeId,
        rng: &mut ChaCha20Rng,
    ) -> Result<NodeId, SearchError>;

    /// Scalar added to `node.reward_sum` when `rewards` pass through it.
    fn credit(&self, node: &SearchNode, rewards: &RewardVector) -> f32 {
        node.corrected_reward(rewards)
    }

    /// Convert the root children's statistics into the action to play.
    fn choose_action(
        &self,
        tree: &SearchTree,
        root: NodeId,
        rng: &mut ChaCha20Rng,
    ) -> Result<Action, SearchError>;
}

/// Children of a node the policy may descend from.
pub(crate) fn selectable_children(
    tree: &SearchTree,
    node: NodeId,
) -> Result<&[(Action, NodeId)], SearchError> {
    let node = tree.get(node);
    if !node.is_fully_expanded() {
        return Err(SearchError::NodeNotExpandable);
    }
    if node.children.is_empty() {
        return Err(SearchError::NoChildren);
    }
    Ok(&node.children)
}

/// Children of a search root the chooser picks among.
pub(crate) fn root_children(
    tree: &SearchTree,
    root: NodeId,
) -> Result<&[(Action, NodeId)], SearchError> {
    let children = &tree.get(root).children;
    if children.is_empty() {
        return Err(SearchError::NoChildren);
    }
    Ok(children)
}

/// Sample an index from a probability distribution.
///
/// Returns `None` only when every entry is zero (or the slice is empty).
pub fn sample_index(probabilities: &[f32], rng: &mut ChaCha20Rng) -> Option<usize> {
    let r: f32 = rng.gen();
    let mut cumsum = 0.0;

    for (i, &p) in probabilities.iter().enumerate() {
        cumsum += p;
        if r < cumsum {
            return Some(i);
        }
    }

    // Fallback to last non-zero entry (handles floating point issues)
    probabilities.iter().rposition(|&p| p > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_sample_index_respects_zero_mass() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        for _ in 0..200 {
            let i = sample_index(&[0.0, 0.5, 0.0, 0.5], &mut rng).unwrap();
            assert!(i == 1 || i == 3);
        }
    }

    #[test]
    fn test_sample_index_degenerate() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        assert!(sample_index(&[], &mut rng).is_none());
        assert!(sample_index(&[0.0, 0.0], &mut rng).is_none());
        // Mass short of 1.0 still returns the last non-zero entry
        assert_eq!(sample_index(&[0.0, 1e-9, 0.0], &mut rng), Some(1));
    }

    #[test]
    fn test_sample_index_frequencies() {
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let mut counts = [0u32; 2];
        for _ in 0..10_000 {
            counts[sample_index(&[0.25, 0.75], &mut rng).unwrap()] += 1;
        }
        let frac = counts[1] as f32 / 10_000.0;
        assert!((frac - 0.75).abs() < 0.03, "got {}", frac);
    }

    #[test]
    fn test_selectable_children_guards() {
        let mut tree = SearchTree::new(0, 2);
        let root = tree.add_root();
        assert!(matches!(
            selectable_children(&tree, root),
            Err(SearchError::NodeNotExpandable)
        ));
        assert!(matches!(root_children(&tree, root), Err(SearchError::NoChildren)));

        tree.expand(root, 0, false).unwrap();
        tree.expand(root, 1, false).unwrap();
        assert_eq!(selectable_children(&tree, root).unwrap().len(), 2);
        assert_eq!(root_children(&tree, root).unwrap().len(), 2);
    }
}
