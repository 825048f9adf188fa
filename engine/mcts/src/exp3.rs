//! EXP3 selection: exponential weights for adversarial bandits.
//!
//! Descent samples a child from
//! `p(c) = (1 - gamma) * w(c) / sum(w) + gamma / k` with
//! `w(c) = exp(nu * (reward_sum(c) - max reward_sum))`, and records the drawn
//! probability on the chosen child so its next update can be importance
//! weighted. The final move is sampled from the visit counts with the
//! `gamma / k` exploration floor removed again.

use engine_core::{Action, RewardVector};
use rand_chacha::ChaCha20Rng;
use tracing::trace;

use crate::node::{NodeId, SearchNode};
use crate::policy::{root_children, sample_index, selectable_children, SelectionPolicy};
use crate::search::SearchError;
use crate::tree::SearchTree;

/// EXP3 selection policy.
#[derive(Debug, Clone, Copy)]
pub struct Exp3 {
    /// Exploration floor
    gamma: f32,
    /// Learning rate
    nu: f32,
    /// Size of the action space
    num_actions: usize,
}

impl Exp3 {
    /// Parameters for an action space of size `num_actions`: `gamma`
    /// defaults to `1 / k` and `nu` is always `gamma / k`.
    pub fn new(num_actions: usize, gamma: Option<f32>) -> Self {
        let num_actions = num_actions.max(1);
        let k = num_actions as f32;
        let gamma = gamma.unwrap_or(1.0 / k);
        Self {
            gamma,
            nu: gamma / k,
            num_actions,
        }
    }

    pub fn gamma(&self) -> f32 {
        self.gamma
    }

    pub fn nu(&self) -> f32 {
        self.nu
    }

    pub fn num_actions(&self) -> usize {
        self.num_actions
    }
}

/// Sampling distribution over children with raw scores `scores`.
///
/// Sums to 1 and every entry is at least `gamma / scores.len()`.
pub fn exp3_distribution(scores: &[f32], gamma: f32, nu: f32) -> Vec<f32> {
    if scores.is_empty() {
        return Vec::new();
    }
    let k = scores.len() as f32;
    let max_score = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);

    let weights: Vec<f32> = scores
        .iter()
        .map(|&s| (nu * (s - max_score)).exp())
        .collect();
    // The maximum contributes exp(0) = 1, so the sum is never zero
    let sum: f32 = weights.iter().sum();

    weights
        .iter()
        .map(|&w| (1.0 - gamma) * w / sum + gamma / k)
        .collect()
}

/// Final move distribution from root child visit counts.
///
/// Each child gets `max(0, visits - gamma / k * total) / total`, then the
/// entries are renormalized. `k` is the size of the action space, which
/// exceeds `visits.len()` while the root is only partly expanded. Falls back
/// to uniform over the children when none clears the floor.
pub fn final_distribution(visits: &[u32], gamma: f32, num_actions: usize) -> Vec<f32> {
    if visits.is_empty() {
        return Vec::new();
    }
    let uniform = vec![1.0 / visits.len() as f32; visits.len()];
    let k = num_actions.max(1) as f32;

    let total: u32 = visits.iter().sum();
    if total == 0 {
        return uniform;
    }
    let total = total as f32;
    let floor = gamma / k * total;

    let raw: Vec<f32> = visits
        .iter()
        .map(|&v| (v as f32 - floor).max(0.0) / total)
        .collect();
    let sum: f32 = raw.iter().sum();
    if sum <= 0.0 {
        return uniform;
    }
    raw.into_iter().map(|p| p / sum).collect()
}

impl SelectionPolicy for Exp3 {
    fn name(&self) -> &'static str {
        "exp3"
    }

    fn select_child(
        &self,
        tree: &mut SearchTree,
        node: NodeId,
        rng: &mut ChaCha20Rng,
    ) -> Result<NodeId, SearchError> {
        let children = selectable_children(tree, node)?;
        let scores: Vec<f32> = children
            .iter()
            .map(|(_, id)| tree.get(*id).reward_sum)
            .collect();
        let distribution = exp3_distribution(&scores, self.gamma, self.nu);
        let index = sample_index(&distribution, rng).ok_or(SearchError::NoChildren)?;
        let (action, chosen) = children[index];

        trace!(action, probability = distribution[index], "EXP3 descent");
        tree.get_mut(chosen).sample_probability = distribution[index];
        Ok(chosen)
    }

    /// Corrected reward divided by the probability the node was sampled with.
    fn credit(&self, node: &SearchNode, rewards: &RewardVector) -> f32 {
        node.corrected_reward(rewards) / node.sample_probability
    }

    fn choose_action(
        &self,
        tree: &SearchTree,
        root: NodeId,
        rng: &mut ChaCha20Rng,
    ) -> Result<Action, SearchError> {
        let children = root_children(tree, root)?;
        let visits: Vec<u32> = children.iter().map(|(_, id)| tree.get(*id).visits).collect();
        let distribution = final_distribution(&visits, self.gamma, self.num_actions);
        let index = sample_index(&distribution, rng).ok_or(SearchError::NoChildren)?;
        Ok(children[index].0)
    }
}
