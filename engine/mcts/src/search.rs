//! MCTS search implementation.
//!
//! One planning call runs a fixed number of iterations, each of which
//! rewinds the environment to the root state and then:
//! 1. Selection: descend through fully expanded nodes via the policy
//! 2. Expansion: add one child for a random untried action
//! 3. Rollout: play uniformly random actions until the episode ends or the
//!    step cap is hit
//! 4. Backpropagation: credit the final reward vector from the new node up to
//!    the search root

use std::time::Instant;

use engine_core::{joint_action, Action, EnvError, Environment, StateKey, StepResult};
use rand::Rng;
use rand_chacha::ChaCha20Rng;
use thiserror::Error;
use tracing::{debug, trace, Level};

use crate::config::{MctsConfig, PolicyKind};
use crate::exp3::Exp3;
use crate::node::NodeId;
use crate::persistent::PersistentTree;
use crate::policy::SelectionPolicy;
use crate::rollout::{RolloutPolicy, UniformRollout};
use crate::ucb1::Ucb1;

/// Errors that can occur during MCTS search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Seat mismatch: tree plans for agent {expected} but the environment trains agent {actual}")]
    SeatMismatch { expected: usize, actual: usize },

    #[error("Action {action} is not untried at this node")]
    ActionNotUntried { action: Action },

    #[error("Node has no children")]
    NoChildren,

    #[error("Node is terminal or not fully expanded")]
    NodeNotExpandable,

    #[error("Environment error: {0}")]
    Environment(#[from] EnvError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Counters gathered during one planning call.
#[derive(Debug, Clone, Default)]
pub struct SearchStats {
    /// Total environment steps (selection + expansion + rollout)
    pub env_steps: u64,
    /// Steps taken during rollouts only
    pub rollout_steps: u64,
    /// Rollouts stopped by the step cap before the episode ended
    pub capped_rollouts: u32,
    /// Iterations whose selection ended on a terminal node
    pub terminal_selections: u32,
    /// Nodes created
    pub expansions: u32,
    /// Wall-clock time of the whole call
    pub elapsed_us: u64,
}

/// Result of an MCTS search.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Action to play
    pub action: Action,

    /// Root child visit fractions indexed by action (length k)
    pub visit_distribution: Vec<f32>,

    /// Root visit count, including visits from earlier calls that reused it
    pub root_visits: u32,

    /// Number of iterations performed
    pub iterations: u32,

    pub stats: SearchStats,
}

/// MCTS search state for one planning call.
pub struct MctsSearch<'a, P: SelectionPolicy, R: RolloutPolicy = UniformRollout> {
    env: &'a mut dyn Environment,
    tree: &'a mut PersistentTree,
    policy: P,
    rollout: R,
    config: MctsConfig,
    agent_id: usize,
    num_actions: usize,
    stats: SearchStats,
}

impl<'a, P: SelectionPolicy, R: RolloutPolicy> MctsSearch<'a, P, R> {
    /// Bind a search to an environment and a persistent tree.
    ///
    /// Fails if the environment trains a different seat than the tree plans
    /// for, or if the action spaces disagree.
    pub fn new(
        env: &'a mut dyn Environment,
        tree: &'a mut PersistentTree,
        policy: P,
        rollout: R,
        config: MctsConfig,
    ) -> Result<Self, SearchError> {
        config.validate()?;

        let agent_id = tree.agent_id();
        let actual = env.training_agent();
        if actual != agent_id {
            return Err(SearchError::SeatMismatch {
                expected: agent_id,
                actual,
            });
        }

        let num_actions = env.num_actions();
        if num_actions == 0 || num_actions != tree.num_actions() {
            return Err(SearchError::InvalidConfig(format!(
                "environment has {} actions, tree expects {}",
                num_actions,
                tree.num_actions()
            )));
        }

        tree.set_capacity(config.tree_capacity);

        Ok(Self {
            env,
            tree,
            policy,
            rollout,
            config,
            agent_id,
            num_actions,
            stats: SearchStats::default(),
        })
    }

    /// Run the configured number of iterations from `root_state` and pick
    /// the action to play.
    ///
    /// The environment is restored to `root_state` before returning, also
    /// when an iteration fails.
    pub fn run(
        &mut self,
        root_state: &StateKey,
        rng: &mut ChaCha20Rng,
    ) -> Result<SearchResult, SearchError> {
        let start = Instant::now();
        self.stats = SearchStats::default();

        self.tree.compact();
        let root = self.tree.root_for(root_state);

        let outcome = self.run_iterations(root, root_state, rng);
        self.env.restore_state(root_state)?;
        outcome?;

        self.log_tree(root);

        let action = self.policy.choose_action(self.tree.tree(), root, rng)?;
        let visit_distribution = self.visit_distribution(root);
        let tree_stats = self.tree.tree().stats(root);
        let root_visits = tree_stats.root_visits;
        self.stats.elapsed_us = start.elapsed().as_micros() as u64;

        debug!(
            policy = self.policy.name(),
            agent = self.agent_id,
            action,
            iterations = self.config.iterations,
            root_visits,
            root_mean_reward = tree_stats.root_mean_reward,
            max_depth = tree_stats.max_depth,
            env_steps = self.stats.env_steps,
            capped_rollouts = self.stats.capped_rollouts,
            tree_states = self.tree.len(),
            tree_nodes = tree_stats.total_nodes,
            elapsed_us = self.stats.elapsed_us,
            "Search complete"
        );

        Ok(SearchResult {
            action,
            visit_distribution,
            root_visits,
            iterations: self.config.iterations,
            stats: self.stats.clone(),
        })
    }

    /// Counters of the last run.
    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    fn run_iterations(
        &mut self,
        root: NodeId,
        root_state: &StateKey,
        rng: &mut ChaCha20Rng,
    ) -> Result<(), SearchError> {
        for _ in 0..self.config.iterations {
            self.iterate(root, root_state, rng)?;
        }
        Ok(())
    }

    /// One select -> expand -> rollout -> backpropagate pass.
    fn iterate(
        &mut self,
        root: NodeId,
        root_state: &StateKey,
        rng: &mut ChaCha20Rng,
    ) -> Result<(), SearchError> {
        let mut obs = self.env.reset(root_state)?;
        let mut node = root;
        let root_node = self.tree.tree().get(root);
        let mut done = root_node.is_terminal;
        let mut rewards = root_node.last_rewards;
        let mut depth = 0u32;

        // Selection
        while !done && self.tree.tree().get(node).is_fully_expanded() {
            node = self.policy.select_child(self.tree.tree_mut(), node, rng)?;
            let action = self
                .tree
                .tree()
                .get(node)
                .action
                .ok_or(SearchError::NoChildren)?;
            let step = self.step_with(action, &obs)?;
            obs = step.obs;
            rewards = step.rewards;
            done = step.done;
            depth += 1;
        }
        if self.tree.tree().get(node).is_terminal {
            self.stats.terminal_selections += 1;
        }

        // Expansion
        if !done && self.tree.tree().get(node).is_expandable() {
            let untried = &self.tree.tree().get(node).untried_actions;
            let action = untried[rng.gen_range(0..untried.len())];
            let step = self.step_with(action, &obs)?;
            node = self.tree.tree_mut().expand(node, action, step.done)?;
            let key = self.env.serialize_state();
            self.tree.record(key, node);
            self.stats.expansions += 1;
            obs = step.obs;
            rewards = step.rewards;
            done = step.done;
            depth += 1;
        }

        // Rollout
        let mut rollout_steps = 0u32;
        while !done && rollout_steps < self.config.rollout_step_cap {
            let action = self.rollout.choose(&obs, self.num_actions, rng);
            let step = self.step_with(action, &obs)?;
            obs = step.obs;
            rewards = step.rewards;
            done = step.done;
            rollout_steps += 1;
        }
        self.stats.rollout_steps += rollout_steps as u64;
        if !done {
            self.stats.capped_rollouts += 1;
        }

        // Backpropagation
        let updated = self
            .tree
            .tree_mut()
            .backpropagate(node, root, &rewards, &self.policy);

        trace!(
            leaf = node.0,
            depth,
            rollout_steps,
            updated,
            ?rewards,
            "MCTS iteration complete"
        );

        Ok(())
    }

    /// Step the environment with `own` for the searching seat and the
    /// collaborator policy's actions for everybody else.
    fn step_with(&mut self, own: Action, obs: &[u8]) -> Result<StepResult, SearchError> {
        let others = self.env.act(obs)?;
        let actions = joint_action(&others, self.agent_id, own)?;
        let step = self.env.step(&actions)?;
        self.stats.env_steps += 1;
        Ok(step)
    }

    fn visit_distribution(&self, root: NodeId) -> Vec<f32> {
        let tree = self.tree.tree();
        let mut distribution = vec![0.0; self.num_actions];
        let children = &tree.get(root).children;
        let total: u32 = children.iter().map(|(_, id)| tree.get(*id).visits).sum();
        if total == 0 {
            return distribution;
        }
        for &(action, id) in children {
            distribution[action as usize] = tree.get(id).visits as f32 / total as f32;
        }
        distribution
    }

    fn log_tree(&self, root: NodeId) {
        if !tracing::enabled!(Level::DEBUG) {
            return;
        }
        let names = self.env.metadata().action_names;
        let max_depth = if self.config.log_tree { None } else { Some(1) };
        debug!(
            "Search tree after {} iterations:\n{}",
            self.config.iterations,
            self.tree.tree().render(root, max_depth, &names)
        );
    }
}

/// Convenience function to run a single planning call with the policy named
/// by `config.policy` and uniform rollouts.
pub fn plan(
    env: &mut dyn Environment,
    tree: &mut PersistentTree,
    config: &MctsConfig,
    root_state: &StateKey,
    rng: &mut ChaCha20Rng,
) -> Result<SearchResult, SearchError> {
    match config.policy {
        PolicyKind::Ucb1 => {
            let policy = Ucb1::new(config.ucb_exploration);
            MctsSearch::new(env, tree, policy, UniformRollout, config.clone())?.run(root_state, rng)
        }
        PolicyKind::Exp3 => {
            let policy = Exp3::new(env.num_actions(), config.exp3_gamma);
            MctsSearch::new(env, tree, policy, UniformRollout, config.clone())?.run(root_state, rng)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::{EnvMetadata, NUM_AGENTS};
    use games_skirmish::Skirmish;
    use rand::SeedableRng;

    /// One simultaneous step ends the episode; the searching seat wins iff it
    /// played `winning`.
    #[derive(Debug)]
    struct OneShotEnv {
        seat: usize,
        winning: Action,
        /// 0 before the step, 1 + own action after it
        state: u8,
        fail_steps: bool,
    }

    impl OneShotEnv {
        fn new(seat: usize, winning: Action) -> Self {
            Self {
                seat,
                winning,
                state: 0,
                fail_steps: false,
            }
        }
    }

    impl Environment for OneShotEnv {
        fn env_id(&self) -> &str {
            "one-shot"
        }

        fn metadata(&self) -> EnvMetadata {
            EnvMetadata::new("one-shot", "One Shot").with_actions((0..6).map(|a| format!("A{}", a)))
        }

        fn num_actions(&self) -> usize {
            6
        }

        fn training_agent(&self) -> usize {
            self.seat
        }

        fn reset(&mut self, state: &StateKey) -> Result<Vec<u8>, EnvError> {
            self.restore_state(state)?;
            Ok(vec![self.state])
        }

        fn act(&mut self, _obs: &[u8]) -> Result<Vec<Action>, EnvError> {
            Ok(vec![0; NUM_AGENTS - 1])
        }

        fn step(&mut self, actions: &[Action]) -> Result<StepResult, EnvError> {
            if self.fail_steps {
                return Err(EnvError::GameLogic("simulator broke".to_string()));
            }
            if self.state != 0 {
                return Err(EnvError::GameLogic("episode is over".to_string()));
            }
            if actions.len() != NUM_AGENTS {
                return Err(EnvError::InvalidAction(format!("{} actions", actions.len())));
            }
            let own = actions[self.seat];
            self.state = 1 + own;
            let own_reward = if own == self.winning { 1.0 } else { -1.0 };
            let mut rewards = [-own_reward; NUM_AGENTS];
            rewards[self.seat] = own_reward;
            Ok(StepResult {
                obs: vec![self.state],
                rewards,
                done: true,
                info: 0,
            })
        }

        fn serialize_state(&self) -> StateKey {
            StateKey::new(vec![self.state])
        }

        fn restore_state(&mut self, state: &StateKey) -> Result<(), EnvError> {
            match state.as_bytes() {
                [b] => {
                    self.state = *b;
                    Ok(())
                }
                other => Err(EnvError::Decoding(format!("expected 1 byte, got {}", other.len()))),
            }
        }
    }

    /// Never terminates and pays nothing; every step bumps a counter.
    #[derive(Debug)]
    struct EndlessEnv {
        counter: u32,
    }

    impl Environment for EndlessEnv {
        fn env_id(&self) -> &str {
            "endless"
        }

        fn metadata(&self) -> EnvMetadata {
            EnvMetadata::new("endless", "Endless")
        }

        fn num_actions(&self) -> usize {
            6
        }

        fn training_agent(&self) -> usize {
            0
        }

        fn reset(&mut self, state: &StateKey) -> Result<Vec<u8>, EnvError> {
            self.restore_state(state)?;
            Ok(self.counter.to_le_bytes().to_vec())
        }

        fn act(&mut self, _obs: &[u8]) -> Result<Vec<Action>, EnvError> {
            Ok(vec![0; NUM_AGENTS - 1])
        }

        fn step(&mut self, _actions: &[Action]) -> Result<StepResult, EnvError> {
            self.counter += 1;
            Ok(StepResult {
                obs: self.counter.to_le_bytes().to_vec(),
                rewards: [0.0; NUM_AGENTS],
                done: false,
                info: 0,
            })
        }

        fn serialize_state(&self) -> StateKey {
            StateKey::new(self.counter.to_le_bytes().to_vec())
        }

        fn restore_state(&mut self, state: &StateKey) -> Result<(), EnvError> {
            let bytes: [u8; 4] = state
                .as_bytes()
                .try_into()
                .map_err(|_| EnvError::Decoding("expected 4 bytes".to_string()))?;
            self.counter = u32::from_le_bytes(bytes);
            Ok(())
        }
    }

    fn root_child_visits(tree: &PersistentTree, root: NodeId) -> Vec<(Action, u32)> {
        tree.tree()
            .get(root)
            .children
            .iter()
            .map(|&(action, id)| (action, tree.tree().get(id).visits))
            .collect()
    }

    #[test]
    fn test_six_iterations_expand_every_action() {
        for policy in [PolicyKind::Ucb1, PolicyKind::Exp3] {
            let mut env = OneShotEnv::new(0, 3);
            let mut tree = PersistentTree::new(0, 6);
            let root_state = env.serialize_state();
            let config = MctsConfig::for_testing()
                .with_iterations(6)
                .with_policy(policy);

            let mut rng = ChaCha20Rng::seed_from_u64(42);
            let result = plan(&mut env, &mut tree, &config, &root_state, &mut rng).unwrap();

            let root = tree.get(&root_state).unwrap();
            let node = tree.tree().get(root);
            assert!(node.untried_actions.is_empty(), "{}", policy);
            assert_eq!(node.children.len(), 6);
            for (_, visits) in root_child_visits(&tree, root) {
                assert!(visits >= 1);
            }
            assert!(result.action < 6);
            assert_eq!(result.stats.expansions, 6);
            assert_eq!(result.root_visits, 6);
        }
    }

    #[test]
    fn test_seat_mismatch_is_rejected() {
        let mut env = OneShotEnv::new(1, 3);
        let mut tree = PersistentTree::new(0, 6);
        let root_state = env.serialize_state();
        let mut rng = ChaCha20Rng::seed_from_u64(0);

        let err = plan(&mut env, &mut tree, &MctsConfig::for_testing(), &root_state, &mut rng)
            .unwrap_err();
        assert!(matches!(
            err,
            SearchError::SeatMismatch {
                expected: 0,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_action_space_mismatch_is_rejected() {
        let mut env = OneShotEnv::new(0, 3);
        let mut tree = PersistentTree::new(0, 5);
        let root_state = env.serialize_state();
        let mut rng = ChaCha20Rng::seed_from_u64(0);

        let err = plan(&mut env, &mut tree, &MctsConfig::for_testing(), &root_state, &mut rng)
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidConfig(_)));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut env = OneShotEnv::new(0, 3);
        let mut tree = PersistentTree::new(0, 6);
        let root_state = env.serialize_state();
        let mut rng = ChaCha20Rng::seed_from_u64(0);

        let config = MctsConfig::for_testing().with_iterations(0);
        let err = plan(&mut env, &mut tree, &config, &root_state, &mut rng).unwrap_err();
        assert!(matches!(err, SearchError::InvalidConfig(_)));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_ucb1_finds_winning_action() {
        for seat in 0..NUM_AGENTS {
            let mut env = OneShotEnv::new(seat, 3);
            let mut tree = PersistentTree::new(seat, 6);
            let root_state = env.serialize_state();
            let config = MctsConfig::for_testing()
                .with_iterations(60)
                .with_policy(PolicyKind::Ucb1);

            let mut rng = ChaCha20Rng::seed_from_u64(7);
            let result = plan(&mut env, &mut tree, &config, &root_state, &mut rng).unwrap();
            assert_eq!(result.action, 3, "seat {}", seat);
            assert!(result.visit_distribution[3] > 0.5);

            // Winning child carries the corrected reward 1 + 3 * 1 per visit
            let root = tree.get(&root_state).unwrap();
            let winner = tree
                .tree()
                .get(root)
                .children
                .iter()
                .find(|(action, _)| *action == 3)
                .map(|&(_, id)| tree.tree().get(id))
                .unwrap();
            assert!((winner.mean_reward() - 4.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_exp3_concentrates_visits_on_winning_action() {
        let mut env = OneShotEnv::new(2, 3);
        let mut tree = PersistentTree::new(2, 6);
        let root_state = env.serialize_state();
        let config = MctsConfig::for_testing()
            .with_iterations(200)
            .with_policy(PolicyKind::Exp3);

        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let result = plan(&mut env, &mut tree, &config, &root_state, &mut rng).unwrap();

        let root = tree.get(&root_state).unwrap();
        let visits = root_child_visits(&tree, root);
        let best = visits.iter().max_by_key(|(_, v)| *v).unwrap();
        assert_eq!(best.0, 3, "visits {:?}", visits);
        let sum: f32 = result.visit_distribution.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_capped_rollouts_are_counted() {
        let mut env = EndlessEnv { counter: 0 };
        let mut tree = PersistentTree::new(0, 6);
        let root_state = env.serialize_state();
        let config = MctsConfig::for_testing()
            .with_iterations(4)
            .with_rollout_step_cap(5)
            .with_policy(PolicyKind::Ucb1);

        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let result = plan(&mut env, &mut tree, &config, &root_state, &mut rng).unwrap();

        // Root still has untried actions, so every iteration expands once
        assert_eq!(result.stats.expansions, 4);
        assert_eq!(result.stats.capped_rollouts, 4);
        assert_eq!(result.stats.rollout_steps, 20);
        assert_eq!(result.stats.env_steps, 24);
        assert_eq!(env.counter, 0);
    }

    #[test]
    fn test_env_error_still_restores_root_state() {
        let mut env = OneShotEnv::new(0, 3);
        let mut tree = PersistentTree::new(0, 6);
        let root_state = env.serialize_state();
        env.fail_steps = true;
        // Leave the env somewhere else to prove the restore happened
        env.state = 5;

        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let err = plan(&mut env, &mut tree, &MctsConfig::for_testing(), &root_state, &mut rng)
            .unwrap_err();
        assert!(matches!(err, SearchError::Environment(EnvError::GameLogic(_))));
        assert_eq!(env.serialize_state(), root_state);
    }

    #[test]
    fn test_planning_from_terminal_state_has_no_children() {
        let mut env = OneShotEnv::new(0, 3);
        let mut tree = PersistentTree::new(0, 6);
        let root_state = env.serialize_state();
        let config = MctsConfig::for_testing().with_iterations(6);
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        plan(&mut env, &mut tree, &config, &root_state, &mut rng).unwrap();

        // State after playing action 3 was recorded as a terminal child
        let terminal_state = StateKey::new(vec![4]);
        let node = tree.get(&terminal_state).unwrap();
        assert!(tree.tree().get(node).is_terminal);

        env.restore_state(&terminal_state).unwrap();
        let err = plan(&mut env, &mut tree, &config, &terminal_state, &mut rng).unwrap_err();
        assert!(matches!(err, SearchError::NoChildren));
        assert_eq!(env.serialize_state(), terminal_state);
    }

    #[test]
    fn test_skirmish_search_restores_state_exactly() {
        for policy in [PolicyKind::Ucb1, PolicyKind::Exp3] {
            let mut env = Skirmish::new(1, 42);
            let mut tree = PersistentTree::new(1, env.num_actions());
            let before = env.serialize_state();
            let config = MctsConfig::for_testing().with_policy(policy);

            let mut rng = ChaCha20Rng::seed_from_u64(42);
            let result = plan(&mut env, &mut tree, &config, &before, &mut rng).unwrap();

            assert_eq!(env.serialize_state(), before);
            assert!((result.action as usize) < env.num_actions());
            assert_eq!(result.iterations, config.iterations);
            assert_eq!(result.root_visits, config.iterations);
            assert_eq!(result.visit_distribution.len(), env.num_actions());
        }
    }

    #[test]
    fn test_skirmish_tree_is_reused_across_decisions() {
        let mut env = Skirmish::new(0, 7);
        let mut tree = PersistentTree::new(0, env.num_actions());
        let config = MctsConfig::for_testing().with_policy(PolicyKind::Ucb1);
        let mut rng = ChaCha20Rng::seed_from_u64(3);

        let root_state = env.serialize_state();
        let obs = env.reset(&root_state).unwrap();
        let result = plan(&mut env, &mut tree, &config, &root_state, &mut rng).unwrap();

        // Play the chosen action for real
        let others = env.act(&obs).unwrap();
        let joint = joint_action(&others, 0, result.action).unwrap();
        env.step(&joint).unwrap();
        let next_state = env.serialize_state();

        // The search already expanded the chosen action, so its state is known
        let root = tree.get(&root_state).unwrap();
        let reused = tree.get(&next_state).unwrap();
        assert!(tree
            .tree()
            .get(root)
            .children
            .iter()
            .any(|&(_, id)| id == reused));
        let prior_visits = tree.tree().get(reused).visits;
        assert!(prior_visits >= 1);

        let second = plan(&mut env, &mut tree, &config, &next_state, &mut rng).unwrap();
        assert_eq!(second.root_visits, prior_visits + config.iterations);
        assert_eq!(env.serialize_state(), next_state);
    }

    #[test]
    fn test_every_node_accounts_for_every_action() {
        for policy in [PolicyKind::Ucb1, PolicyKind::Exp3] {
            let mut env = Skirmish::new(3, 21);
            let k = env.num_actions();
            let mut tree = PersistentTree::new(3, k);
            let config = MctsConfig::for_testing()
                .with_iterations(60)
                .with_policy(policy);
            let mut rng = ChaCha20Rng::seed_from_u64(8);

            // Two decisions so the second search extends a reused subtree
            let root_state = env.serialize_state();
            let obs = env.reset(&root_state).unwrap();
            let first = plan(&mut env, &mut tree, &config, &root_state, &mut rng).unwrap();
            let others = env.act(&obs).unwrap();
            env.step(&joint_action(&others, 3, first.action).unwrap()).unwrap();
            let next_state = env.serialize_state();
            plan(&mut env, &mut tree, &config, &next_state, &mut rng).unwrap();

            let arena = tree.tree();
            assert!(arena.len() > k);
            for index in 0..arena.len() {
                let node = arena.get(NodeId(index as u32));
                assert_eq!(
                    node.untried_actions.len() + node.children.len(),
                    k,
                    "node {} under {:?}",
                    index,
                    policy
                );
                for &(action, child) in &node.children {
                    assert!(!node.untried_actions.contains(&action));
                    assert_eq!(arena.get(child).action, Some(action));
                }
            }
        }
    }

    #[test]
    fn test_repeated_calls_accumulate_root_visits() {
        let mut env = OneShotEnv::new(0, 3);
        let mut tree = PersistentTree::new(0, 6);
        let root_state = env.serialize_state();
        let config = MctsConfig::for_testing()
            .with_iterations(10)
            .with_policy(PolicyKind::Ucb1);
        let mut rng = ChaCha20Rng::seed_from_u64(0);

        plan(&mut env, &mut tree, &config, &root_state, &mut rng).unwrap();
        let second = plan(&mut env, &mut tree, &config, &root_state, &mut rng).unwrap();
        assert_eq!(second.root_visits, 20);
        // Six children plus the root, nothing duplicated
        assert_eq!(tree.node_count(), 7);
    }

    #[test]
    fn test_search_is_reproducible_with_seed() {
        let run = || {
            let mut env = Skirmish::new(2, 11);
            let mut tree = PersistentTree::new(2, env.num_actions());
            let root_state = env.serialize_state();
            let mut rng = ChaCha20Rng::seed_from_u64(99);
            let result = plan(&mut env, &mut tree, &MctsConfig::for_testing(), &root_state, &mut rng)
                .unwrap();
            (result.action, result.visit_distribution, tree.node_count())
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_tree_capacity_from_config_bounds_states() {
        let mut env = Skirmish::new(0, 5);
        let mut tree = PersistentTree::new(0, env.num_actions());
        let root_state = env.serialize_state();
        let config = MctsConfig::for_testing().with_tree_capacity(Some(4));
        let mut rng = ChaCha20Rng::seed_from_u64(5);

        let first = plan(&mut env, &mut tree, &config, &root_state, &mut rng).unwrap();
        assert_eq!(tree.capacity(), Some(4));
        assert!(tree.len() <= 4);
        // More iterations than capacity, yet the root keeps its statistics
        assert!(config.iterations > 4);
        let root = tree.get(&root_state).unwrap();
        assert_eq!(tree.tree().get(root).visits, first.root_visits);

        let second = plan(&mut env, &mut tree, &config, &root_state, &mut rng).unwrap();
        assert_eq!(second.root_visits, first.root_visits + config.iterations);
        assert!(tree.len() <= 4);
    }
}
