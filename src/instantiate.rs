//! Type-driven instantiation: materializing the aggregated children of a
//! type (and its supertypes) into a new Object or Variable instance.
//!
//! The supertype chain is walked most-derived first, so a subtype's child
//! claims its browse-name slot and ancestor children deep-merge into it.
//! Cloned children are stripped of their identity and references and re-added
//! through the full add pipeline, which recursively instantiates them and
//! keeps every reference bidirectional.

use tracing::debug;

use crate::browse::{browse_single, BrowseSpec};
use crate::error::{StoreError, TypeCheckError, UaError, UaResult};
use crate::hierarchy::supertype_chain;
use crate::node::{Node, NodeClass};
use crate::nodeid::{ExpandedNodeId, NodeId, QualifiedName};
use crate::ns0;
use crate::server::{add_node_local, add_reference_local, Inner};
use crate::service::AddReferencesItem;
use crate::store::NodeStore;

/// Bound on the child-merge recursion; a well-formed Aggregates tree stays
/// far below it.
const MAX_INSTANTIATION_DEPTH: usize = 64;

/// Node classes considered during child copying.
fn aggregate_mask() -> u32 {
    NodeClass::Object.bit() | NodeClass::Variable.bit() | NodeClass::Method.bit()
}

/// The target of a node's forward HasTypeDefinition reference.
pub(crate) fn type_definition_of(store: &dyn NodeStore, node_id: &NodeId) -> Option<NodeId> {
    let node = store.get(node_id)?;
    node.head()
        .references
        .iter()
        .find(|r| !r.is_inverse && r.reference_type_id == ns0::HAS_TYPE_DEFINITION && r.target_id.is_local())
        .map(|r| r.target_id.node_id.clone())
}

/// Instantiate a freshly inserted Object or Variable from its type.
///
/// Children are copied before the constructor runs, so the constructor
/// observes its mandated subtree. Other node classes pass through untouched.
pub(crate) fn instantiate_node(
    inner: &mut Inner,
    node_id: &NodeId,
    node_class: NodeClass,
    type_id: &NodeId,
    hook: &mut dyn FnMut(&NodeId, &NodeId),
) -> UaResult<()> {
    if node_class != NodeClass::Object && node_class != NodeClass::Variable {
        return Ok(());
    }

    // Resolve the type and reject wrong-class or abstract definitions.
    let invalid = || {
        UaError::from(TypeCheckError::TypeDefinitionInvalid {
            type_id: type_id.clone(),
        })
    };
    let (constructor, type_class) = match (node_class, inner.store.get(type_id)) {
        (NodeClass::Variable, Some(Node::VariableType(vt))) if !vt.is_abstract => {
            (None, NodeClass::VariableType)
        }
        (NodeClass::Object, Some(Node::ObjectType(ot))) if !ot.is_abstract => {
            (ot.lifecycle.constructor.clone(), NodeClass::ObjectType)
        }
        _ => return Err(invalid()),
    };

    // Copy members of the type and all its supertypes, most-derived first.
    let chain = supertype_chain(inner.store.as_ref(), type_id)?;
    debug!(node = %node_id, ty = %type_id, supertypes = chain.len() - 1, "instantiating node");
    for source in &chain {
        copy_child_nodes(inner, source, node_id, hook, 0)?;
    }

    // The constructor of the most-derived type attaches the instance handle.
    if let Some(constructor) = constructor {
        let needs_handle = inner
            .store
            .get(node_id)
            .and_then(Node::as_object)
            .map(|o| o.instance_handle.is_none())
            .unwrap_or(false);
        if needs_handle {
            let handle = constructor(node_id);
            if let Some(object) = inner.store.get_mut(node_id).and_then(Node::as_object_mut) {
                object.instance_handle = handle;
            }
        }
    }

    // Tie the instance to its type.
    add_reference_local(
        inner,
        &AddReferencesItem {
            source_node_id: node_id.clone(),
            reference_type_id: ns0::HAS_TYPE_DEFINITION,
            is_forward: true,
            target_server_uri: None,
            target_node_id: ExpandedNodeId::local(type_id.clone()),
            target_node_class: Some(type_class),
        },
    )?;

    hook(node_id, type_id);
    Ok(())
}

/// Search the destination's aggregates for a child with the given browse
/// name.
fn find_aggregate_by_browse_name(
    store: &dyn NodeStore,
    search_instance: &NodeId,
    browse_name: &QualifiedName,
) -> UaResult<Option<NodeId>> {
    let spec = BrowseSpec::forward(search_instance.clone(), ns0::AGGREGATES)
        .with_class_mask(aggregate_mask());
    let refs = browse_single(store, &spec)?;
    Ok(refs
        .into_iter()
        .find(|rd| rd.browse_name == *browse_name)
        .map(|rd| rd.node_id.node_id))
}

/// Copy the aggregated children of `source_id` onto `dest_id`.
///
/// A child whose browse name already exists on the destination keeps its
/// identity and is deep-merged; Methods are shared by reference; missing
/// Variables and Objects are cloned and re-added through the full pipeline.
pub(crate) fn copy_child_nodes(
    inner: &mut Inner,
    source_id: &NodeId,
    dest_id: &NodeId,
    hook: &mut dyn FnMut(&NodeId, &NodeId),
    depth: usize,
) -> UaResult<()> {
    if depth > MAX_INSTANTIATION_DEPTH {
        return Err(UaError::Internal {
            message: format!("aggregation tree below {source_id} exceeds depth {MAX_INSTANTIATION_DEPTH}"),
        });
    }

    let spec =
        BrowseSpec::forward(source_id.clone(), ns0::AGGREGATES).with_class_mask(aggregate_mask());
    let children = browse_single(inner.store.as_ref(), &spec)?;

    for rd in children {
        let child_id = rd.node_id.node_id.clone();
        let existing = find_aggregate_by_browse_name(inner.store.as_ref(), dest_id, &rd.browse_name)?;

        match existing {
            None => match rd.node_class {
                NodeClass::Method => {
                    // Methods are never duplicated; the instance just refers
                    // to the type's method node.
                    add_reference_local(
                        inner,
                        &AddReferencesItem {
                            source_node_id: dest_id.clone(),
                            reference_type_id: rd.reference_type_id.clone(),
                            is_forward: true,
                            target_server_uri: None,
                            target_node_id: ExpandedNodeId::local(child_id),
                            target_node_class: Some(NodeClass::Method),
                        },
                    )?;
                }
                NodeClass::Variable | NodeClass::Object => {
                    let Some(mut node) = inner.store.get_copy(&child_id) else {
                        return Err(StoreError::NodeIdUnknown { node_id: child_id }.into());
                    };
                    // Strip the clone's identity and carried references; the
                    // add pipeline rebuilds the parent and type edges and the
                    // store assigns a fresh id in the destination's namespace.
                    node.head_mut().node_id = NodeId::numeric(dest_id.namespace, 0);
                    node.head_mut().references.clear();
                    if let Some(object) = node.as_object_mut() {
                        object.instance_handle = None;
                    }
                    let type_id = type_definition_of(inner.store.as_ref(), &child_id)
                        .unwrap_or(NodeId::NULL);
                    let new_id = add_node_local(
                        inner,
                        node,
                        dest_id,
                        &rd.reference_type_id,
                        &type_id,
                        &mut *hook,
                    )?;
                    // Carry over children defined on the source node itself.
                    copy_child_nodes(inner, &child_id, &new_id, hook, depth + 1)?;
                }
                _ => {}
            },
            Some(existing_id) => {
                // Shared child keeps its identity; reconcile its subtree.
                if rd.node_class == NodeClass::Variable || rd.node_class == NodeClass::Object {
                    copy_child_nodes(inner, &child_id, &existing_id, hook, depth + 1)?;
                }
            }
        }
    }
    Ok(())
}
