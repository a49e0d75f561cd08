//! In-memory node store backed by a hashmap.
//!
//! The default backing container. Fresh numeric ids are drawn from a
//! monotonic per-store counter; tests must rely only on their uniqueness.

use std::collections::HashMap;

use crate::error::{StoreError, StoreResult};
use crate::node::Node;
use crate::nodeid::{Identifier, NodeId};

use super::NodeStore;

/// Numeric ids below this are reserved for model builders; assigned ids
/// start here.
const FIRST_ASSIGNED_ID: u32 = 50_000;

/// Hashmap-backed node store with monotonic fresh-id assignment.
#[derive(Debug, Default)]
pub struct MemNodeStore {
    nodes: HashMap<NodeId, Node>,
    next_numeric: u32,
}

impl MemNodeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            next_numeric: FIRST_ASSIGNED_ID,
        }
    }

    /// Create a store with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: HashMap::with_capacity(capacity),
            next_numeric: FIRST_ASSIGNED_ID,
        }
    }

    /// The next unused numeric id in the given namespace.
    fn fresh_id(&mut self, namespace: u16) -> NodeId {
        loop {
            let candidate = NodeId::numeric(namespace, self.next_numeric);
            self.next_numeric = self.next_numeric.wrapping_add(1).max(FIRST_ASSIGNED_ID);
            if !self.nodes.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}

impl NodeStore for MemNodeStore {
    fn insert(&mut self, mut node: Node) -> StoreResult<NodeId> {
        let requested = node.node_id().clone();
        let id = if matches!(requested.identifier, Identifier::Numeric(0)) {
            let id = self.fresh_id(requested.namespace);
            node.head_mut().node_id = id.clone();
            id
        } else {
            if self.nodes.contains_key(&requested) {
                return Err(StoreError::NodeIdExists { node_id: requested });
            }
            requested
        };
        self.nodes.insert(id.clone(), node);
        Ok(id)
    }

    fn get(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    fn get_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    fn remove(&mut self, id: &NodeId) -> StoreResult<Node> {
        self.nodes.remove(id).ok_or_else(|| super::unknown(id))
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().cloned().collect()
    }
}
