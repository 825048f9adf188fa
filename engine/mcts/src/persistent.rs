//! State-keyed tree reused across the decisions of one episode.
//!
//! Every planning call looks its root up by the serialized environment state,
//! and every expansion records the state it reached, so a later decision that
//! lands in an already explored state continues from the statistics gathered
//! by earlier searches.

use std::num::NonZeroUsize;

use engine_core::StateKey;
use lru::LruCache;
use tracing::{debug, warn};

use crate::node::NodeId;
use crate::tree::SearchTree;

/// Arena tree plus the `StateKey -> NodeId` map threaded through successive
/// planning calls.
///
/// Unbounded by default: no entry is removed until [`PersistentTree::clear`].
/// With a capacity, the least-recently-used keys are evicted once more than
/// `capacity` are held, and [`PersistentTree::compact`] reclaims the nodes no
/// remaining key can reach. The key last returned by
/// [`PersistentTree::root_for`] is never evicted.
#[derive(Debug)]
pub struct PersistentTree {
    tree: SearchTree,
    index: LruCache<StateKey, NodeId>,
    capacity: Option<usize>,
    /// Key of the current search root
    pinned: Option<StateKey>,
    evicted_since_compact: usize,
    capacity_warned: bool,
}

impl PersistentTree {
    /// Create an empty, unbounded tree for `agent_id` over `num_actions` actions.
    pub fn new(agent_id: usize, num_actions: usize) -> Self {
        Self {
            tree: SearchTree::new(agent_id, num_actions),
            index: LruCache::unbounded(),
            capacity: None,
            pinned: None,
            evicted_since_compact: 0,
            capacity_warned: false,
        }
    }

    /// Builder pattern: bound the number of remembered states.
    pub fn with_capacity(mut self, capacity: Option<usize>) -> Self {
        self.set_capacity(capacity);
        self
    }

    /// Change the bound, evicting immediately if the tree already holds more.
    ///
    /// A bound of zero is treated as one.
    pub fn set_capacity(&mut self, capacity: Option<usize>) {
        let capacity = capacity.map(|c| c.max(1));
        self.capacity = capacity;
        let pinned = self
            .pinned
            .clone()
            .and_then(|key| self.index.pop(&key).map(|node| (key, node)));
        if let Some(capacity) = capacity {
            let room = capacity - usize::from(pinned.is_some());
            while self.index.len() > room {
                let Some((key, node)) = self.index.pop_lru() else {
                    break;
                };
                self.on_evicted(key, node);
            }
        }
        let cap = capacity
            .and_then(NonZeroUsize::new)
            .unwrap_or(NonZeroUsize::MAX);
        self.index.resize(cap);
        if let Some((key, node)) = pinned {
            self.index.push(key, node);
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    #[inline]
    pub fn agent_id(&self) -> usize {
        self.tree.agent_id()
    }

    #[inline]
    pub fn num_actions(&self) -> usize {
        self.tree.num_actions()
    }

    #[inline]
    pub fn tree(&self) -> &SearchTree {
        &self.tree
    }

    #[inline]
    pub fn tree_mut(&mut self) -> &mut SearchTree {
        &mut self.tree
    }

    /// Number of remembered states.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of nodes in the arena (including unreachable ones not yet compacted).
    pub fn node_count(&self) -> usize {
        self.tree.len()
    }

    /// Look up the node recorded for `key` without touching recency.
    pub fn get(&self, key: &StateKey) -> Option<NodeId> {
        self.index.peek(key).copied()
    }

    /// Retrieve the node recorded for `key`, or create a fresh root for it.
    ///
    /// The key stays pinned against eviction until the next call or
    /// [`PersistentTree::clear`].
    pub fn root_for(&mut self, key: &StateKey) -> NodeId {
        self.pinned = Some(key.clone());
        if let Some(&node) = self.index.get(key) {
            return node;
        }
        let root = self.tree.add_root();
        self.record(key.clone(), root);
        root
    }

    /// Remember `node` as the node for `key`, replacing any earlier entry.
    pub fn record(&mut self, key: StateKey, node: NodeId) {
        self.insert(key, node);
    }

    /// Forget everything (start of a new episode).
    pub fn clear(&mut self) {
        self.tree.clear();
        self.index.clear();
        self.pinned = None;
        self.evicted_since_compact = 0;
        self.capacity_warned = false;
    }

    /// Drop arena nodes unreachable from any remembered state.
    ///
    /// Invalidates every `NodeId` handed out before the call. Does nothing
    /// unless keys were evicted since the last compaction.
    pub fn compact(&mut self) {
        if self.evicted_since_compact == 0 {
            return;
        }
        let before = self.tree.len();
        let keep: Vec<NodeId> = self.index.iter().map(|(_, &node)| node).collect();
        let remap = self.tree.retain_reachable(&keep);
        for (_, node) in self.index.iter_mut() {
            *node = remap[node.index()];
        }
        debug!(
            evicted_keys = self.evicted_since_compact,
            nodes_before = before,
            nodes_after = self.tree.len(),
            "Compacted search tree"
        );
        self.evicted_since_compact = 0;
    }

    fn insert(&mut self, key: StateKey, node: NodeId) {
        // `push` hands back either the replaced entry for `key` or the evicted LRU entry
        if let Some((old_key, old_node)) = self.index.push(key.clone(), node) {
            if old_key != key {
                self.on_evicted(old_key, old_node);
            }
        }
    }

    fn on_evicted(&mut self, key: StateKey, node: NodeId) {
        if self.pinned.as_ref() == Some(&key) {
            // Put the search root back; this evicts the next oldest entry instead
            self.insert(key, node);
            return;
        }
        if !self.capacity_warned {
            warn!(
                capacity = self.capacity.unwrap_or_default(),
                "Search tree capacity reached, evicting least recently used states"
            );
            self.capacity_warned = true;
        }
        self.evicted_since_compact += 1;
    }
}
