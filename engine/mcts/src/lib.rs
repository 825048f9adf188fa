//! Decision-time Monte Carlo Tree Search for simultaneous-move games.
//!
//! This crate plans one seat's action in a 4-player game by searching a tree
//! over that seat's own actions only. The other three seats are folded into
//! the environment: each simulated step asks the environment's collaborator
//! policy for their actions and combines them with the planned one.
//!
//! # Overview
//!
//! Every planning call runs a fixed number of iterations, each consisting of:
//!
//! 1. **Selection**: Descend from the root through fully expanded nodes with
//!    a bandit rule ([`Ucb1`] or [`Exp3`])
//! 2. **Expansion**: Add one child for a random untried action
//! 3. **Rollout**: Play uniform random actions until the episode ends or the
//!    step cap is hit
//! 4. **Backpropagation**: Credit the final reward vector, corrected to the
//!    searching seat's point of view, along the path back to the root
//!
//! The tree lives in a [`PersistentTree`] keyed by serialized state, so a
//! later decision that lands on an already searched state continues from the
//! earlier statistics.
//!
//! # Usage
//!
//! ```rust,ignore
//! use engine_core::Environment;
//! use games_skirmish::Skirmish;
//! use mcts::{plan, MctsConfig, PersistentTree, PolicyKind};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha20Rng;
//!
//! let mut env = Skirmish::new(0, 42);
//! let mut tree = PersistentTree::new(0, env.num_actions());
//! let config = MctsConfig::default().with_policy(PolicyKind::Ucb1);
//!
//! let mut rng = ChaCha20Rng::seed_from_u64(42);
//! let root_state = env.serialize_state();
//! let result = plan(&mut env, &mut tree, &config, &root_state, &mut rng).unwrap();
//!
//! println!("Best action: {}", result.action);
//! println!("Visits: {:?}", result.visit_distribution);
//! ```
//!
//! # Configuration
//!
//! The [`MctsConfig`] struct controls search behavior:
//!
//! - `iterations`: Iterations per planning call (default: 20)
//! - `policy`: Selection rule, UCB1 or EXP3 (default: EXP3)
//! - `ucb_exploration`: UCB1 exploration constant c (default: 2.0)
//! - `exp3_gamma`: EXP3 exploration floor (default: 1/k)
//! - `rollout_step_cap`: Maximum rollout length (default: 1000)
//! - `tree_capacity`: Optional LRU bound on remembered states

pub mod config;
pub mod exp3;
pub mod node;
pub mod persistent;
pub mod policy;
pub mod rollout;
pub mod search;
pub mod tree;
pub mod ucb1;

// Re-export main types
pub use config::{MctsConfig, PolicyKind};
pub use exp3::{exp3_distribution, final_distribution, Exp3};
pub use node::{NodeId, SearchNode};
pub use persistent::PersistentTree;
pub use policy::{sample_index, SelectionPolicy};
pub use rollout::{RolloutPolicy, UniformRollout};
pub use search::{plan, MctsSearch, SearchError, SearchResult, SearchStats};
pub use tree::{SearchTree, TreeStats};
pub use ucb1::Ucb1;
