//! Search tree structure with arena allocation.
//!
//! Nodes are stored in a contiguous Vec and referenced by NodeId indices.
//! Parent links are plain indices, so a child never owns its parent and the
//! arena can be compacted by remapping ids.

use std::fmt::Write as _;

use engine_core::{Action, RewardVector};

use crate::node::{NodeId, SearchNode};
use crate::policy::SelectionPolicy;
use crate::search::SearchError;

/// Search tree with arena-based node storage.
///
/// One arena may hold several roots: every planning call of an episode adds
/// (or reuses) a root, and they all share the same storage.
#[derive(Debug)]
pub struct SearchTree {
    /// Arena storing all nodes
    nodes: Vec<SearchNode>,

    /// Seat of the searching agent
    agent_id: usize,

    /// Size of the action space (k)
    num_actions: usize,
}

impl SearchTree {
    /// Create an empty tree for `agent_id` over `num_actions` actions.
    pub fn new(agent_id: usize, num_actions: usize) -> Self {
        Self {
            nodes: Vec::new(),
            agent_id,
            num_actions,
        }
    }

    #[inline]
    pub fn agent_id(&self) -> usize {
        self.agent_id
    }

    #[inline]
    pub fn num_actions(&self) -> usize {
        self.num_actions
    }

    /// Get a reference to a node by ID.
    #[inline]
    pub fn get(&self, id: NodeId) -> &SearchNode {
        &self.nodes[id.index()]
    }

    /// Get a mutable reference to a node by ID.
    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut SearchNode {
        &mut self.nodes[id.index()]
    }

    /// Allocate a new node and return its ID.
    fn allocate(&mut self, node: SearchNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Allocate a fresh parentless root.
    pub fn add_root(&mut self) -> NodeId {
        self.allocate(SearchNode::new_root(self.agent_id, self.num_actions))
    }

    /// Get the total number of nodes in the arena.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop every node.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Expand `parent` with `action`, creating exactly one child.
    ///
    /// Fails without touching the tree if `parent` is terminal or `action`
    /// is not among its untried actions.
    pub fn expand(
        &mut self,
        parent: NodeId,
        action: Action,
        is_terminal: bool,
    ) -> Result<NodeId, SearchError> {
        let node = self.get(parent);
        if node.is_terminal {
            return Err(SearchError::NodeNotExpandable);
        }
        let position = node
            .untried_actions
            .iter()
            .position(|&a| a == action)
            .ok_or(SearchError::ActionNotUntried { action })?;

        self.get_mut(parent).untried_actions.remove(position);
        let child = SearchNode::new_child(
            parent,
            action,
            self.agent_id,
            self.num_actions,
            is_terminal,
        );
        let child_id = self.allocate(child);
        self.get_mut(parent).children.push((action, child_id));

        Ok(child_id)
    }

    /// Backpropagate a reward vector from `leaf` up to `root` inclusive.
    ///
    /// `root` is the root of the current search; it may itself have a parent
    /// from an earlier decision, which is left untouched.
    /// Returns the number of updated nodes.
    pub fn backpropagate<P: SelectionPolicy + ?Sized>(
        &mut self,
        leaf: NodeId,
        root: NodeId,
        rewards: &RewardVector,
        policy: &P,
    ) -> u32 {
        let mut current = leaf;
        let mut updated = 0;

        while current.is_some() {
            let credit = policy.credit(self.get(current), rewards);
            let node = self.get_mut(current);
            node.update(rewards, credit);
            updated += 1;

            if current == root {
                break;
            }
            current = node.parent;
        }

        updated
    }

    /// Keep only the nodes reachable from `keep` (and their descendants).
    ///
    /// Returns a table mapping every old index to its new id, or
    /// `NodeId::NONE` when the node was dropped. Parent links that point at
    /// dropped nodes become `NONE`.
    pub fn retain_reachable(&mut self, keep: &[NodeId]) -> Vec<NodeId> {
        let len = self.nodes.len();
        let mut reachable = vec![false; len];
        let mut stack: Vec<NodeId> = keep
            .iter()
            .copied()
            .filter(|id| id.is_some() && id.index() < len)
            .collect();

        while let Some(id) = stack.pop() {
            if reachable[id.index()] {
                continue;
            }
            reachable[id.index()] = true;
            stack.extend(self.nodes[id.index()].children.iter().map(|&(_, child)| child));
        }

        let mut remap = vec![NodeId::NONE; len];
        let mut next = 0u32;
        for (old, _) in reachable.iter().enumerate().filter(|(_, r)| **r) {
            remap[old] = NodeId(next);
            next += 1;
        }

        let old_nodes = std::mem::take(&mut self.nodes);
        self.nodes = old_nodes
            .into_iter()
            .zip(reachable)
            .filter(|(_, r)| *r)
            .map(|(mut node, _)| {
                if node.parent.is_some() {
                    node.parent = remap[node.parent.index()];
                }
                for (_, child) in &mut node.children {
                    *child = remap[child.index()];
                }
                node
            })
            .collect();

        remap
    }

    /// Indented text dump of the subtree under `node`.
    ///
    /// One line per node: action, `reward_sum/visits` and untried actions.
    /// `max_depth` of `Some(1)` prints the node and its children only.
    pub fn render(&self, node: NodeId, max_depth: Option<usize>, action_names: &[String]) -> String {
        let mut out = String::new();
        self.render_into(&mut out, node, 0, max_depth, action_names);
        out
    }

    fn render_into(
        &self,
        out: &mut String,
        id: NodeId,
        depth: usize,
        max_depth: Option<usize>,
        action_names: &[String],
    ) {
        let name = |a: Action| {
            action_names
                .get(a as usize)
                .cloned()
                .unwrap_or_else(|| a.to_string())
        };
        let node = self.get(id);
        let label = node.action.map_or_else(|| "Root".to_string(), name);
        let untried: Vec<String> = node.untried_actions.iter().map(|&a| name(a)).collect();

        let _ = writeln!(
            out,
            "{}[{} W/V:{:.2}/{} Untried:{}{}]",
            "| ".repeat(depth),
            label,
            node.reward_sum,
            node.visits,
            untried.join(","),
            if node.is_terminal { " Terminal" } else { "" }
        );

        if max_depth.map_or(true, |max| depth < max) {
            for &(_, child) in &node.children {
                self.render_into(out, child, depth + 1, max_depth, action_names);
            }
        }
    }

    /// Get statistics about the subtree under `root` for debugging.
    pub fn stats(&self, root: NodeId) -> TreeStats {
        let node = self.get(root);
        TreeStats {
            total_nodes: self.nodes.len(),
            root_visits: node.visits,
            root_mean_reward: node.mean_reward(),
            max_depth: self.compute_max_depth(root, 0),
        }
    }

    fn compute_max_depth(&self, node_id: NodeId, current_depth: u32) -> u32 {
        let node = self.get(node_id);
        node.children
            .iter()
            .map(|&(_, id)| self.compute_max_depth(id, current_depth + 1))
            .max()
            .unwrap_or(current_depth)
    }
}

/// Statistics about a search tree.
#[derive(Debug, Clone)]
pub struct TreeStats {
    pub total_nodes: usize,
    pub root_visits: u32,
    pub root_mean_reward: f32,
    pub max_depth: u32,
}
