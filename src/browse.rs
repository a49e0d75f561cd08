//! The single-item browse entry point consumed by the mutation core.
//!
//! The full Browse service (continuation points, result masks, views) lives
//! in the service layer; the core only needs filtered reference listings to
//! find aggregated children, type definitions, and destructor chains.

use serde::{Deserialize, Serialize};

use crate::error::StoreResult;
use crate::hierarchy::is_subtype_of;
use crate::node::{NodeClass, NODE_CLASS_MASK_ALL};
use crate::nodeid::{ExpandedNodeId, NodeId, QualifiedName};
use crate::store::{unknown, NodeStore};

/// Which reference directions to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrowseDirection {
    Forward,
    Inverse,
    Both,
}

/// A filtered view of one node's references.
#[derive(Debug, Clone)]
pub struct BrowseSpec {
    /// The node whose references are listed.
    pub node_id: NodeId,
    /// Only follow edges of this reference type; `None` follows all.
    pub reference_type_id: Option<NodeId>,
    /// Also follow edges whose type is a subtype of `reference_type_id`.
    pub include_subtypes: bool,
    pub direction: BrowseDirection,
    /// Bitmask of admitted target node classes ([`NodeClass::bit`]).
    pub node_class_mask: u32,
}

impl BrowseSpec {
    /// Browse every reference of a node, in both directions.
    pub fn all(node_id: NodeId) -> Self {
        Self {
            node_id,
            reference_type_id: None,
            include_subtypes: false,
            direction: BrowseDirection::Both,
            node_class_mask: NODE_CLASS_MASK_ALL,
        }
    }

    /// Forward browse through one reference type and its subtypes.
    pub fn forward(node_id: NodeId, reference_type_id: NodeId) -> Self {
        Self {
            node_id,
            reference_type_id: Some(reference_type_id),
            include_subtypes: true,
            direction: BrowseDirection::Forward,
            node_class_mask: NODE_CLASS_MASK_ALL,
        }
    }

    /// Inverse browse through one reference type and its subtypes.
    pub fn inverse(node_id: NodeId, reference_type_id: NodeId) -> Self {
        Self {
            node_id,
            reference_type_id: Some(reference_type_id),
            include_subtypes: true,
            direction: BrowseDirection::Inverse,
            node_class_mask: NODE_CLASS_MASK_ALL,
        }
    }

    /// Restrict the admitted target classes.
    pub fn with_class_mask(mut self, mask: u32) -> Self {
        self.node_class_mask = mask;
        self
    }
}

/// One matched reference of a browsed node.
#[derive(Debug, Clone)]
pub struct ReferenceDescription {
    pub reference_type_id: NodeId,
    pub is_forward: bool,
    pub node_id: ExpandedNodeId,
    pub browse_name: QualifiedName,
    pub node_class: NodeClass,
}

/// List the references of one node matching the spec.
///
/// Targets without a local node (foreign namespaces, remote servers) are
/// omitted, since their browse name and class cannot be resolved locally.
pub fn browse_single(
    store: &dyn NodeStore,
    spec: &BrowseSpec,
) -> StoreResult<Vec<ReferenceDescription>> {
    let node = store.get(&spec.node_id).ok_or_else(|| unknown(&spec.node_id))?;

    let mut results = Vec::new();
    for entry in &node.head().references {
        let direction_ok = match spec.direction {
            BrowseDirection::Forward => !entry.is_inverse,
            BrowseDirection::Inverse => entry.is_inverse,
            BrowseDirection::Both => true,
        };
        if !direction_ok {
            continue;
        }
        if let Some(ref filter) = spec.reference_type_id {
            let matches = entry.reference_type_id == *filter
                || (spec.include_subtypes
                    && is_subtype_of(store, &entry.reference_type_id, filter));
            if !matches {
                continue;
            }
        }
        if !entry.target_id.is_local() {
            continue;
        }
        let Some(target) = store.get(&entry.target_id.node_id) else {
            continue;
        };
        if target.node_class().bit() & spec.node_class_mask == 0 {
            continue;
        }
        results.push(ReferenceDescription {
            reference_type_id: entry.reference_type_id.clone(),
            is_forward: !entry.is_inverse,
            node_id: entry.target_id.clone(),
            browse_name: target.browse_name().clone(),
            node_class: target.node_class(),
        });
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Node, ReferenceEntry};
    use crate::ns0;
    use crate::store::mem::MemNodeStore;

    fn insert(store: &mut MemNodeStore, class: NodeClass, id: NodeId, name: &str) {
        let mut node = Node::zeroed(class);
        node.head_mut().node_id = id;
        node.head_mut().browse_name = QualifiedName::new(1, name);
        store.insert(node).unwrap();
    }

    fn link(store: &mut MemNodeStore, source: &NodeId, reftype: &NodeId, target: &NodeId) {
        store
            .get_mut(source)
            .unwrap()
            .head_mut()
            .references
            .push(ReferenceEntry {
                reference_type_id: reftype.clone(),
                target_id: ExpandedNodeId::local(target.clone()),
                is_inverse: false,
            });
        store
            .get_mut(target)
            .unwrap()
            .head_mut()
            .references
            .push(ReferenceEntry {
                reference_type_id: reftype.clone(),
                target_id: ExpandedNodeId::local(source.clone()),
                is_inverse: true,
            });
    }

    fn reftype_store() -> (MemNodeStore, NodeId, NodeId) {
        // Aggregates <- HasComponent subtype edge so subtype filtering has
        // something to resolve.
        let mut store = MemNodeStore::new();
        insert(
            &mut store,
            NodeClass::ReferenceType,
            ns0::AGGREGATES,
            "Aggregates",
        );
        insert(
            &mut store,
            NodeClass::ReferenceType,
            ns0::HAS_COMPONENT,
            "HasComponent",
        );
        link(
            &mut store,
            &ns0::AGGREGATES,
            &ns0::HAS_SUBTYPE,
            &ns0::HAS_COMPONENT,
        );
        (store, ns0::AGGREGATES, ns0::HAS_COMPONENT)
    }

    #[test]
    fn forward_browse_with_subtypes() {
        let (mut store, aggregates, has_component) = reftype_store();
        let parent = NodeId::numeric(1, 10);
        let child = NodeId::numeric(1, 11);
        insert(&mut store, NodeClass::Object, parent.clone(), "Parent");
        insert(&mut store, NodeClass::Variable, child.clone(), "Child");
        link(&mut store, &parent, &has_component, &child);

        let spec = BrowseSpec::forward(parent.clone(), aggregates);
        let refs = browse_single(&store, &spec).unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].node_id.node_id, child);
        assert_eq!(refs[0].node_class, NodeClass::Variable);
        assert!(refs[0].is_forward);
        assert_eq!(refs[0].browse_name, QualifiedName::new(1, "Child"));
    }

    #[test]
    fn class_mask_filters_targets() {
        let (mut store, aggregates, has_component) = reftype_store();
        let parent = NodeId::numeric(1, 10);
        let child = NodeId::numeric(1, 11);
        insert(&mut store, NodeClass::Object, parent.clone(), "Parent");
        insert(&mut store, NodeClass::Variable, child.clone(), "Child");
        link(&mut store, &parent, &has_component, &child);

        let spec = BrowseSpec::forward(parent, aggregates)
            .with_class_mask(NodeClass::Object.bit() | NodeClass::Method.bit());
        assert!(browse_single(&store, &spec).unwrap().is_empty());
    }

    #[test]
    fn inverse_browse_sees_the_mirror_entry() {
        let (mut store, _, has_component) = reftype_store();
        let parent = NodeId::numeric(1, 10);
        let child = NodeId::numeric(1, 11);
        insert(&mut store, NodeClass::Object, parent.clone(), "Parent");
        insert(&mut store, NodeClass::Variable, child.clone(), "Child");
        link(&mut store, &parent, &has_component, &child);

        let spec = BrowseSpec::inverse(child, has_component);
        let refs = browse_single(&store, &spec).unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].node_id.node_id, parent);
        assert!(!refs[0].is_forward);
    }

    #[test]
    fn browsing_a_missing_node_errors() {
        let store = MemNodeStore::new();
        let spec = BrowseSpec::all(NodeId::numeric(1, 99));
        assert!(browse_single(&store, &spec).is_err());
    }
}
