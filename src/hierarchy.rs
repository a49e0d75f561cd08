//! Type-hierarchy walking over the HasSubtype tree.
//!
//! The walker climbs inverse HasSubtype edges, producing the supertype chain
//! the instantiator copies children from, and answers the subsumption
//! queries the validators ask ("is this reference type hierarchical", "is
//! this data type compatible with the template's").

use std::collections::{HashSet, VecDeque};

use crate::error::{UaError, UaResult};
use crate::node::Node;
use crate::nodeid::NodeId;
use crate::ns0;
use crate::store::NodeStore;

/// Upper bound on the supertype chain; a well-formed address space stays far
/// below it, so hitting it means a HasSubtype cycle.
const MAX_TYPE_DEPTH: usize = 256;

/// The transitive supertype chain `[start, super, super², …]`, most-derived
/// first, obtained by following inverse HasSubtype edges to a fixed point.
pub fn supertype_chain(store: &dyn NodeStore, start: &NodeId) -> UaResult<Vec<NodeId>> {
    let mut chain = vec![start.clone()];
    let mut visited: HashSet<NodeId> = chain.iter().cloned().collect();
    let mut queue: VecDeque<NodeId> = VecDeque::new();
    queue.push_back(start.clone());

    while let Some(current) = queue.pop_front() {
        let Some(node) = store.get(&current) else {
            continue;
        };
        for entry in supertype_edges(node) {
            let target = entry.clone();
            if visited.insert(target.clone()) {
                chain.push(target.clone());
                queue.push_back(target);
            }
        }
        if chain.len() > MAX_TYPE_DEPTH {
            return Err(UaError::Internal {
                message: format!("HasSubtype chain above {start} exceeds {MAX_TYPE_DEPTH} nodes"),
            });
        }
    }
    Ok(chain)
}

/// Direct supertypes of a node: the targets of its inverse HasSubtype edges.
fn supertype_edges(node: &Node) -> impl Iterator<Item = &NodeId> {
    node.head()
        .references
        .iter()
        .filter(|r| r.is_inverse && r.reference_type_id == ns0::HAS_SUBTYPE && r.target_id.is_local())
        .map(|r| &r.target_id.node_id)
}

/// Whether `sub` equals `superr` or lies below it in the HasSubtype tree.
pub fn is_subtype_of(store: &dyn NodeStore, sub: &NodeId, superr: &NodeId) -> bool {
    is_node_in_tree(store, sub, superr, &[ns0::HAS_SUBTYPE])
}

/// Whether `root` is reachable from `start` by climbing edges whose
/// reference type is one of `allowed_reference_types` or a subtype thereof.
///
/// `start == root` counts as reachable. Missing nodes terminate the search
/// rather than erroring; an unreachable root simply yields `false`.
pub fn is_node_in_tree(
    store: &dyn NodeStore,
    start: &NodeId,
    root: &NodeId,
    allowed_reference_types: &[NodeId],
) -> bool {
    if start == root {
        return true;
    }
    let mut visited: HashSet<NodeId> = HashSet::new();
    visited.insert(start.clone());
    let mut queue: VecDeque<NodeId> = VecDeque::new();
    queue.push_back(start.clone());

    while let Some(current) = queue.pop_front() {
        let Some(node) = store.get(&current) else {
            continue;
        };
        for entry in &node.head().references {
            if !entry.is_inverse || !entry.target_id.is_local() {
                continue;
            }
            if !reference_type_allowed(store, &entry.reference_type_id, allowed_reference_types) {
                continue;
            }
            let target = &entry.target_id.node_id;
            if target == root {
                return true;
            }
            if visited.insert(target.clone()) {
                queue.push_back(target.clone());
            }
        }
    }
    false
}

/// Whether a concrete edge's reference type matches the allowed set, either
/// directly or as a subtype.
fn reference_type_allowed(store: &dyn NodeStore, actual: &NodeId, allowed: &[NodeId]) -> bool {
    for candidate in allowed {
        if actual == candidate {
            return true;
        }
        // Subtype matching must itself only use exact HasSubtype edges, or
        // the recursion would never bottom out.
        if *candidate != ns0::HAS_SUBTYPE && exact_subtype_walk(store, actual, candidate) {
            return true;
        }
    }
    false
}

/// Climb exact HasSubtype edges from `sub` looking for `superr`.
fn exact_subtype_walk(store: &dyn NodeStore, sub: &NodeId, superr: &NodeId) -> bool {
    let mut visited: HashSet<NodeId> = HashSet::new();
    visited.insert(sub.clone());
    let mut queue: VecDeque<NodeId> = VecDeque::new();
    queue.push_back(sub.clone());

    while let Some(current) = queue.pop_front() {
        let Some(node) = store.get(&current) else {
            continue;
        };
        for target in supertype_edges(node) {
            if target == superr {
                return true;
            }
            if visited.insert(target.clone()) {
                queue.push_back(target.clone());
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Node, NodeClass, ReferenceEntry};
    use crate::nodeid::ExpandedNodeId;
    use crate::store::mem::MemNodeStore;

    /// Insert a bare node and link it under `parent` with an exact
    /// HasSubtype pair (both directions written directly).
    fn add_type(store: &mut MemNodeStore, id: NodeId, parent: Option<&NodeId>) {
        let mut node = Node::zeroed(NodeClass::ObjectType);
        node.head_mut().node_id = id.clone();
        if let Some(parent) = parent {
            node.head_mut().references.push(ReferenceEntry {
                reference_type_id: ns0::HAS_SUBTYPE,
                target_id: ExpandedNodeId::local(parent.clone()),
                is_inverse: true,
            });
        }
        store.insert(node).unwrap();
        if let Some(parent) = parent {
            store
                .get_mut(parent)
                .unwrap()
                .head_mut()
                .references
                .push(ReferenceEntry {
                    reference_type_id: ns0::HAS_SUBTYPE,
                    target_id: ExpandedNodeId::local(id),
                    is_inverse: false,
                });
        }
    }

    #[test]
    fn chain_is_most_derived_first() {
        let mut store = MemNodeStore::new();
        let a = NodeId::numeric(1, 1);
        let b = NodeId::numeric(1, 2);
        let c = NodeId::numeric(1, 3);
        add_type(&mut store, a.clone(), None);
        add_type(&mut store, b.clone(), Some(&a));
        add_type(&mut store, c.clone(), Some(&b));

        let chain = supertype_chain(&store, &c).unwrap();
        assert_eq!(chain, vec![c, b, a]);
    }

    #[test]
    fn chain_of_root_is_itself() {
        let mut store = MemNodeStore::new();
        let a = NodeId::numeric(1, 1);
        add_type(&mut store, a.clone(), None);
        assert_eq!(supertype_chain(&store, &a).unwrap(), vec![a]);
    }

    #[test]
    fn cycle_is_reported() {
        let mut store = MemNodeStore::new();
        let a = NodeId::numeric(1, 1);
        let b = NodeId::numeric(1, 2);
        add_type(&mut store, a.clone(), None);
        add_type(&mut store, b.clone(), Some(&a));
        // Close the loop a -> b by hand.
        store
            .get_mut(&a)
            .unwrap()
            .head_mut()
            .references
            .push(ReferenceEntry {
                reference_type_id: ns0::HAS_SUBTYPE,
                target_id: ExpandedNodeId::local(b.clone()),
                is_inverse: true,
            });
        // The visited set still terminates the walk; both nodes appear once.
        let chain = supertype_chain(&store, &b).unwrap();
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn subtype_reachability() {
        let mut store = MemNodeStore::new();
        let a = NodeId::numeric(1, 1);
        let b = NodeId::numeric(1, 2);
        let c = NodeId::numeric(1, 3);
        add_type(&mut store, a.clone(), None);
        add_type(&mut store, b.clone(), Some(&a));
        add_type(&mut store, c.clone(), Some(&b));

        assert!(is_subtype_of(&store, &c, &a));
        assert!(is_subtype_of(&store, &c, &c));
        assert!(!is_subtype_of(&store, &a, &c));
    }

    #[test]
    fn missing_nodes_are_not_reachable() {
        let store = MemNodeStore::new();
        let a = NodeId::numeric(1, 1);
        let b = NodeId::numeric(1, 2);
        assert!(!is_subtype_of(&store, &a, &b));
        assert!(is_subtype_of(&store, &a, &a));
    }
}
