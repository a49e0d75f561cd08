//! The node-management service surface: AddNodes, AddReferences,
//! DeleteNodes, DeleteReferences.
//!
//! Each request is a list of items; each item yields one result, in request
//! order. Empty requests report `BadNothingToDo` at the top level. Items
//! whose source namespace is claimed by a registered external manager are
//! dispatched there; the remainder is handled against the local store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::attributes::AddNodesItem;
use crate::error::StatusCode;
use crate::node::NodeClass;
use crate::nodeid::{ExpandedNodeId, NodeId};
use crate::server::AddressSpace;

// ---------------------------------------------------------------------------
// Items and results
// ---------------------------------------------------------------------------

/// One reference to add.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddReferencesItem {
    pub source_node_id: NodeId,
    pub reference_type_id: NodeId,
    pub is_forward: bool,
    /// URI of a foreign server holding the target; unsupported when set.
    pub target_server_uri: Option<String>,
    pub target_node_id: ExpandedNodeId,
    /// Declared class of the target, when the caller knows it.
    pub target_node_class: Option<NodeClass>,
}

/// One node to delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteNodesItem {
    pub node_id: NodeId,
    /// Also remove the inverse entries this node's references left on its
    /// peers.
    pub delete_target_references: bool,
}

/// One reference to delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteReferencesItem {
    pub source_node_id: NodeId,
    pub reference_type_id: NodeId,
    pub is_forward: bool,
    pub target_node_id: ExpandedNodeId,
    /// Also remove the inverse entry on the target.
    pub delete_bidirectional: bool,
}

/// Per-item result of AddNodes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddNodesResult {
    pub status: StatusCode,
    /// The assigned id on success, null otherwise.
    pub added_node_id: NodeId,
}

/// Request/response envelopes. The `service_result` covers the request as a
/// whole; per-item outcomes live in `results`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddNodesRequest {
    pub nodes_to_add: Vec<AddNodesItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddNodesResponse {
    pub service_result: StatusCode,
    pub results: Vec<AddNodesResult>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddReferencesRequest {
    pub references_to_add: Vec<AddReferencesItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddReferencesResponse {
    pub service_result: StatusCode,
    pub results: Vec<StatusCode>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteNodesRequest {
    pub nodes_to_delete: Vec<DeleteNodesItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteNodesResponse {
    pub service_result: StatusCode,
    pub results: Vec<StatusCode>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteReferencesRequest {
    pub references_to_delete: Vec<DeleteReferencesItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteReferencesResponse {
    pub service_result: StatusCode,
    pub results: Vec<StatusCode>,
}

// ---------------------------------------------------------------------------
// External namespaces
// ---------------------------------------------------------------------------

/// Strategy interface for namespaces served by a foreign node manager.
///
/// Each method receives the full item slice plus the indices this manager is
/// responsible for, and writes per-item outcomes into `results` at those
/// indices.
pub trait ExternalNodeManager: Send + Sync {
    fn add_nodes(&self, items: &[AddNodesItem], indices: &[usize], results: &mut [AddNodesResult]);

    fn add_references(
        &self,
        items: &[AddReferencesItem],
        indices: &[usize],
        results: &mut [StatusCode],
    );

    fn delete_nodes(&self, items: &[DeleteNodesItem], indices: &[usize], results: &mut [StatusCode]);

    fn delete_references(
        &self,
        items: &[DeleteReferencesItem],
        indices: &[usize],
        results: &mut [StatusCode],
    );
}

/// One entry of the external-namespace table.
#[derive(Clone)]
pub struct ExternalNamespace {
    /// Items whose source namespace index matches are routed to `manager`.
    pub namespace: u16,
    pub manager: Arc<dyn ExternalNodeManager>,
}

/// Partition items between the external managers and the local handler.
///
/// Returns the flags marking externally handled items. `namespace_of`
/// extracts the routing namespace from an item.
fn dispatch_external<T, R>(
    externals: &[ExternalNamespace],
    items: &[T],
    namespace_of: impl Fn(&T) -> u16,
    results: &mut [R],
    call: impl Fn(&dyn ExternalNodeManager, &[T], &[usize], &mut [R]),
) -> Vec<bool> {
    let mut is_external = vec![false; items.len()];
    for entry in externals {
        let indices: Vec<usize> = items
            .iter()
            .enumerate()
            .filter(|(_, item)| namespace_of(item) == entry.namespace)
            .map(|(i, _)| i)
            .collect();
        if indices.is_empty() {
            continue;
        }
        for &i in &indices {
            is_external[i] = true;
        }
        call(entry.manager.as_ref(), items, &indices, results);
    }
    is_external
}

// ---------------------------------------------------------------------------
// Service loops
// ---------------------------------------------------------------------------

impl AddressSpace {
    /// The AddNodes service: one status and assigned id per item.
    pub fn service_add_nodes(&self, request: &AddNodesRequest) -> AddNodesResponse {
        debug!(items = request.nodes_to_add.len(), "processing AddNodesRequest");
        if request.nodes_to_add.is_empty() {
            return AddNodesResponse {
                service_result: StatusCode::BAD_NOTHING_TO_DO,
                results: Vec::new(),
            };
        }

        let mut results = vec![AddNodesResult::default(); request.nodes_to_add.len()];
        let is_external = dispatch_external(
            &self.external_namespaces(),
            &request.nodes_to_add,
            |item| item.requested_new_node_id.namespace,
            &mut results,
            |manager, items, indices, results| manager.add_nodes(items, indices, results),
        );

        for (i, item) in request.nodes_to_add.iter().enumerate() {
            if is_external[i] {
                continue;
            }
            results[i] = match self.add_node(item) {
                Ok(added_node_id) => AddNodesResult {
                    status: StatusCode::GOOD,
                    added_node_id,
                },
                Err(e) => AddNodesResult {
                    status: e.status_code(),
                    added_node_id: NodeId::NULL,
                },
            };
        }
        AddNodesResponse {
            service_result: StatusCode::GOOD,
            results,
        }
    }

    /// The AddReferences service: one status per item.
    pub fn service_add_references(&self, request: &AddReferencesRequest) -> AddReferencesResponse {
        debug!(
            items = request.references_to_add.len(),
            "processing AddReferencesRequest"
        );
        if request.references_to_add.is_empty() {
            return AddReferencesResponse {
                service_result: StatusCode::BAD_NOTHING_TO_DO,
                results: Vec::new(),
            };
        }

        let mut results = vec![StatusCode::GOOD; request.references_to_add.len()];
        let is_external = dispatch_external(
            &self.external_namespaces(),
            &request.references_to_add,
            |item| item.source_node_id.namespace,
            &mut results,
            |manager, items, indices, results| manager.add_references(items, indices, results),
        );

        for (i, item) in request.references_to_add.iter().enumerate() {
            if is_external[i] {
                continue;
            }
            results[i] = match self.add_reference_item(item) {
                Ok(()) => StatusCode::GOOD,
                Err(e) => e.status_code(),
            };
        }
        AddReferencesResponse {
            service_result: StatusCode::GOOD,
            results,
        }
    }

    /// The DeleteNodes service: one status per item.
    pub fn service_delete_nodes(&self, request: &DeleteNodesRequest) -> DeleteNodesResponse {
        debug!(
            items = request.nodes_to_delete.len(),
            "processing DeleteNodesRequest"
        );
        if request.nodes_to_delete.is_empty() {
            return DeleteNodesResponse {
                service_result: StatusCode::BAD_NOTHING_TO_DO,
                results: Vec::new(),
            };
        }

        let mut results = vec![StatusCode::GOOD; request.nodes_to_delete.len()];
        let is_external = dispatch_external(
            &self.external_namespaces(),
            &request.nodes_to_delete,
            |item| item.node_id.namespace,
            &mut results,
            |manager, items, indices, results| manager.delete_nodes(items, indices, results),
        );

        for (i, item) in request.nodes_to_delete.iter().enumerate() {
            if is_external[i] {
                continue;
            }
            results[i] = match self.delete_node(&item.node_id, item.delete_target_references) {
                Ok(()) => StatusCode::GOOD,
                Err(e) => e.status_code(),
            };
        }
        DeleteNodesResponse {
            service_result: StatusCode::GOOD,
            results,
        }
    }

    /// The DeleteReferences service: one status per item.
    pub fn service_delete_references(
        &self,
        request: &DeleteReferencesRequest,
    ) -> DeleteReferencesResponse {
        debug!(
            items = request.references_to_delete.len(),
            "processing DeleteReferencesRequest"
        );
        if request.references_to_delete.is_empty() {
            return DeleteReferencesResponse {
                service_result: StatusCode::BAD_NOTHING_TO_DO,
                results: Vec::new(),
            };
        }

        let mut results = vec![StatusCode::GOOD; request.references_to_delete.len()];
        let is_external = dispatch_external(
            &self.external_namespaces(),
            &request.references_to_delete,
            |item| item.source_node_id.namespace,
            &mut results,
            |manager, items, indices, results| manager.delete_references(items, indices, results),
        );

        for (i, item) in request.references_to_delete.iter().enumerate() {
            if is_external[i] {
                continue;
            }
            results[i] = match self.delete_reference_item(item) {
                Ok(()) => StatusCode::GOOD,
                Err(e) => e.status_code(),
            };
        }
        DeleteReferencesResponse {
            service_result: StatusCode::GOOD,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_requests_yield_nothing_to_do() {
        let space = crate::server::AddressSpace::new(Default::default()).unwrap();
        assert_eq!(
            space.service_add_nodes(&AddNodesRequest::default()).service_result,
            StatusCode::BAD_NOTHING_TO_DO
        );
        assert_eq!(
            space
                .service_add_references(&AddReferencesRequest::default())
                .service_result,
            StatusCode::BAD_NOTHING_TO_DO
        );
        assert_eq!(
            space
                .service_delete_nodes(&DeleteNodesRequest::default())
                .service_result,
            StatusCode::BAD_NOTHING_TO_DO
        );
        assert_eq!(
            space
                .service_delete_references(&DeleteReferencesRequest::default())
                .service_result,
            StatusCode::BAD_NOTHING_TO_DO
        );
    }
}
