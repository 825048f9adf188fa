//! Rollout policies for the simulation phase.
//!
//! During a rollout the searching agent's action is chosen by a rollout
//! policy instead of the tree; the other seats keep acting through the
//! environment's own collaborator policy.

use engine_core::Action;
use rand::Rng;
use rand_chacha::ChaCha20Rng;

/// Trait for choosing the searching agent's action during rollouts.
pub trait RolloutPolicy {
    /// Pick an action given the current observation.
    fn choose(&self, obs: &[u8], num_actions: usize, rng: &mut ChaCha20Rng) -> Action;
}

/// Uniform random rollouts over the full action space.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformRollout;

impl UniformRollout {
    pub fn new() -> Self {
        Self
    }
}

impl RolloutPolicy for UniformRollout {
    fn choose(&self, _obs: &[u8], num_actions: usize, rng: &mut ChaCha20Rng) -> Action {
        rng.gen_range(0..num_actions.max(1)) as Action
    }
}
