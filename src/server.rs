//! The address-space facade: the public mutation surface and its pipeline.
//!
//! [`AddressSpace`] owns the node store behind a writer lock. Public entry
//! points acquire the lock; the `*_local` helpers assume it is held, which
//! lets the instantiator re-enter the add pipeline without deadlocking.
//! User callbacks (constructors, destructors, data sources, hooks) run
//! synchronously inside the writer section and must not call back into the
//! public API.
//!
//! The add pipeline is two-phase: `add_node_begin` inserts the raw node so
//! its final id exists, `add_node_finish` validates, type-checks,
//! instantiates, and links it. Any failure after `begin` tears the partial
//! node down again, so a failed add leaves no observable trace.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use crate::attributes::{
    create_node_from_attributes, method_node_from_attributes, AddNodesItem, MethodAttributes,
    NodeAttributes, VariableAttributes,
};
use crate::browse::{browse_single, BrowseSpec, ReferenceDescription};
use crate::error::{
    AttributeError, ReferenceError, ReferenceResult, StatusCode, StoreError, TypeCheckError,
    UaError, UaResult,
};
use crate::hierarchy::supertype_chain;
use crate::instantiate::{instantiate_node, type_definition_of};
use crate::node::{
    DataSource, MethodCallback, Node, NodeClass, ObjectLifecycle, ReferenceEntry, ValueCallback,
    ValueStorage, VariableNode,
};
use crate::nodeid::{ExpandedNodeId, LocalizedText, NodeId, QualifiedName};
use crate::ns0;
use crate::service::{AddReferencesItem, DeleteReferencesItem, ExternalNamespace, ExternalNodeManager};
use crate::store::mem::MemNodeStore;
use crate::store::NodeStore;
use crate::typecheck::{check_parent_reference, type_check_node};
use crate::value::{Argument, DataValue, Scalar, Variant};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Construction-time settings for an [`AddressSpace`].
#[derive(Debug, Clone)]
pub struct AddressSpaceConfig {
    /// The namespace URI table. Index 0 is the OPC UA namespace; node ids
    /// must stay below the table length.
    pub namespace_uris: Vec<String>,
    /// Seed the minimal base model (reference types, base types, folders).
    pub bootstrap_base_model: bool,
}

impl Default for AddressSpaceConfig {
    fn default() -> Self {
        Self {
            namespace_uris: vec![
                "http://opcfoundation.org/UA/".into(),
                "urn:ua-addrspace:server".into(),
            ],
            bootstrap_base_model: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Value attribute access (the Read/Write single-item seams)
// ---------------------------------------------------------------------------

/// Read the current value of a Variable or VariableType, honoring the data
/// source and the on-read notification.
pub(crate) fn read_value_attribute(
    store: &dyn NodeStore,
    node_id: &NodeId,
) -> Result<DataValue, TypeCheckError> {
    let Some(node) = store.get(node_id) else {
        return Err(TypeCheckError::ValueAccess {
            status: StatusCode::BAD_NODE_ID_UNKNOWN,
        });
    };
    let Some(common) = node.variable_common() else {
        return Err(TypeCheckError::ValueAccess {
            status: StatusCode::BAD_NODE_CLASS_INVALID,
        });
    };
    match &common.value {
        ValueStorage::Data { value, callback } => {
            if let Some(on_read) = callback.as_ref().and_then(|cb| cb.on_read.as_ref()) {
                on_read(node_id, value);
            }
            Ok(value.clone())
        }
        ValueStorage::Source(source) => source
            .read(node_id)
            .map_err(|status| TypeCheckError::ValueAccess { status }),
    }
}

/// Write a new value through the node's normal write path: inline storage
/// plus on-write notification, or the data source.
pub(crate) fn write_value_attribute(
    store: &mut dyn NodeStore,
    node_id: &NodeId,
    new_value: &Variant,
) -> Result<(), StatusCode> {
    let Some(node) = store.get_mut(node_id) else {
        return Err(StatusCode::BAD_NODE_ID_UNKNOWN);
    };
    let Some(common) = node.variable_common_mut() else {
        return Err(StatusCode::BAD_NODE_CLASS_INVALID);
    };
    match &mut common.value {
        ValueStorage::Data { value, callback } => {
            value.value = new_value.clone();
            value.status = StatusCode::GOOD;
            if let Some(on_write) = callback.as_ref().and_then(|cb| cb.on_write.as_ref()) {
                on_write(node_id, value);
            }
            Ok(())
        }
        ValueStorage::Source(source) => {
            let source = Arc::clone(source);
            source.write(node_id, new_value)
        }
    }
}

// ---------------------------------------------------------------------------
// One-way reference maintenance
// ---------------------------------------------------------------------------

/// Append one direction of a reference, rejecting duplicates: at most one
/// entry per (type, target, direction) triple.
pub(crate) fn add_one_way_reference(
    node: &mut Node,
    reference_type_id: &NodeId,
    target_id: &ExpandedNodeId,
    is_inverse: bool,
) -> ReferenceResult<()> {
    let source_id = node.node_id().clone();
    let references = &mut node.head_mut().references;
    let duplicate = references.iter().any(|r| {
        r.is_inverse == is_inverse
            && r.reference_type_id == *reference_type_id
            && r.target_id.node_id == target_id.node_id
    });
    if duplicate {
        return Err(ReferenceError::Duplicate {
            source_id,
            reference_type_id: reference_type_id.clone(),
            target_id: target_id.node_id.clone(),
        });
    }
    references.push(ReferenceEntry {
        reference_type_id: reference_type_id.clone(),
        target_id: target_id.clone(),
        is_inverse,
    });
    Ok(())
}

/// Remove one direction of a reference by swap-remove; entry order is not
/// preserved. The scan runs from the end so deletion during iteration over
/// a snapshot stays stable.
pub(crate) fn delete_one_way_reference(
    node: &mut Node,
    target_id: &NodeId,
    reference_type_id: &NodeId,
    is_inverse: bool,
) -> ReferenceResult<()> {
    let source_id = node.node_id().clone();
    let references = &mut node.head_mut().references;
    for i in (0..references.len()).rev() {
        let r = &references[i];
        if r.target_id.node_id == *target_id
            && r.reference_type_id == *reference_type_id
            && r.is_inverse == is_inverse
        {
            references.swap_remove(i);
            if references.is_empty() {
                // Release the backing storage of reference-free nodes.
                *references = Vec::new();
            }
            return Ok(());
        }
    }
    Err(ReferenceError::NotDeleted { source_id })
}

// ---------------------------------------------------------------------------
// Locked state and the non-locking mutation helpers
// ---------------------------------------------------------------------------

/// Everything behind the writer lock.
pub(crate) struct Inner {
    pub(crate) store: Box<dyn NodeStore>,
    pub(crate) namespace_uris: Vec<String>,
}

fn node_unknown(node_id: &NodeId) -> StoreError {
    StoreError::NodeIdUnknown {
        node_id: node_id.clone(),
    }
}

/// Add both directions of a reference; the pair is atomic. When the inverse
/// side fails, the forward entry is removed again.
pub(crate) fn add_reference_local(inner: &mut Inner, item: &AddReferencesItem) -> ReferenceResult<()> {
    if item
        .target_server_uri
        .as_deref()
        .is_some_and(|uri| !uri.is_empty())
    {
        return Err(ReferenceError::ForeignServer);
    }

    let source = inner
        .store
        .get_mut(&item.source_node_id)
        .ok_or_else(|| node_unknown(&item.source_node_id))?;
    add_one_way_reference(
        source,
        &item.reference_type_id,
        &item.target_node_id,
        !item.is_forward,
    )?;

    let inverse_target = ExpandedNodeId::local(item.source_node_id.clone());
    let second = match inner.store.get_mut(&item.target_node_id.node_id) {
        Some(target) => add_one_way_reference(
            target,
            &item.reference_type_id,
            &inverse_target,
            item.is_forward,
        ),
        None => Err(node_unknown(&item.target_node_id.node_id).into()),
    };
    if let Err(e) = second {
        if let Some(source) = inner.store.get_mut(&item.source_node_id) {
            let _ = delete_one_way_reference(
                source,
                &item.target_node_id.node_id,
                &item.reference_type_id,
                !item.is_forward,
            );
        }
        return Err(e);
    }
    Ok(())
}

/// Delete a reference from the source and, when requested and local, its
/// inverse from the target. A failing inverse side is surfaced but does not
/// restore the forward entry.
pub(crate) fn delete_reference_local(
    inner: &mut Inner,
    item: &DeleteReferencesItem,
) -> ReferenceResult<()> {
    let source = inner
        .store
        .get_mut(&item.source_node_id)
        .ok_or_else(|| node_unknown(&item.source_node_id))?;
    delete_one_way_reference(
        source,
        &item.target_node_id.node_id,
        &item.reference_type_id,
        !item.is_forward,
    )?;

    if !item.delete_bidirectional || item.target_node_id.server_index != 0 {
        return Ok(());
    }
    let target = inner
        .store
        .get_mut(&item.target_node_id.node_id)
        .ok_or_else(|| node_unknown(&item.target_node_id.node_id))?;
    delete_one_way_reference(
        target,
        &item.source_node_id,
        &item.reference_type_id,
        item.is_forward,
    )
}

/// Delete a node: run the destructor chain for Objects, tear down the
/// inverse entries on every peer (best-effort), and remove from the store.
pub(crate) fn delete_node_local(
    inner: &mut Inner,
    node_id: &NodeId,
    delete_references: bool,
) -> UaResult<()> {
    let Some(node) = inner.store.get(node_id) else {
        return Err(node_unknown(node_id).into());
    };
    let node_class = node.node_class();
    let instance_handle = node.as_object().and_then(|o| o.instance_handle.clone());
    let references = node.head().references.clone();

    // Objects run every destructor registered along the type chain.
    if node_class == NodeClass::Object {
        if let Some(type_definition) = type_definition_of(inner.store.as_ref(), node_id) {
            let chain = supertype_chain(inner.store.as_ref(), &type_definition)?;
            for type_id in &chain {
                let destructor = inner
                    .store
                    .get(type_id)
                    .and_then(Node::as_object_type)
                    .and_then(|ot| ot.lifecycle.destructor.clone());
                if let Some(destructor) = destructor {
                    destructor(node_id, instance_handle.clone());
                }
            }
        }
    }

    if delete_references {
        for entry in &references {
            if !entry.target_id.is_local() {
                continue;
            }
            let Some(peer) = inner.store.get_mut(&entry.target_id.node_id) else {
                continue;
            };
            // Missing mirror entries are not rolled back.
            let _ = delete_one_way_reference(
                peer,
                node_id,
                &entry.reference_type_id,
                !entry.is_inverse,
            );
        }
    }

    inner.store.remove(node_id)?;
    Ok(())
}

/// Phase one of the add pipeline: namespace check and store insertion.
pub(crate) fn add_node_begin_local(inner: &mut Inner, node: Node) -> UaResult<NodeId> {
    let namespace = node.node_id().namespace;
    if namespace as usize >= inner.namespace_uris.len() {
        info!(namespace, "AddNodes: namespace index invalid");
        return Err(StoreError::NamespaceInvalid {
            namespace,
            count: inner.namespace_uris.len(),
        }
        .into());
    }
    Ok(inner.store.insert(node)?)
}

fn finish_steps(
    inner: &mut Inner,
    node_id: &NodeId,
    parent_id: &NodeId,
    reference_type_id: &NodeId,
    type_definition: &NodeId,
    hook: &mut dyn FnMut(&NodeId, &NodeId),
) -> UaResult<()> {
    let node_class = inner
        .store
        .get(node_id)
        .map(Node::node_class)
        .ok_or_else(|| node_unknown(node_id))?;

    // Objects may be orphans; everything else needs a valid parent edge.
    let orphan_object =
        node_class == NodeClass::Object && parent_id.is_null() && reference_type_id.is_null();
    if !orphan_object {
        check_parent_reference(inner.store.as_ref(), node_class, parent_id, reference_type_id)?;
    }

    // Default type definitions for the instance classes.
    let type_definition = if type_definition.is_null() {
        match node_class {
            NodeClass::Variable => ns0::BASE_DATA_VARIABLE_TYPE,
            NodeClass::Object => ns0::BASE_OBJECT_TYPE,
            _ => type_definition.clone(),
        }
    } else {
        type_definition.clone()
    };

    type_check_node(
        inner.store.as_mut(),
        node_id,
        node_class,
        parent_id,
        &type_definition,
    )?;

    instantiate_node(inner, node_id, node_class, &type_definition, hook)?;

    if !parent_id.is_null() {
        add_reference_local(
            inner,
            &AddReferencesItem {
                source_node_id: node_id.clone(),
                reference_type_id: reference_type_id.clone(),
                is_forward: false,
                target_server_uri: None,
                target_node_id: ExpandedNodeId::local(parent_id.clone()),
                target_node_class: None,
            },
        )?;
    }
    Ok(())
}

/// Phase two of the add pipeline: validation, type check, instantiation,
/// parent linking. On failure the partial node is deleted again, honoring
/// the no-trace-on-failure contract.
pub(crate) fn add_node_finish_local(
    inner: &mut Inner,
    node_id: &NodeId,
    parent_id: &NodeId,
    reference_type_id: &NodeId,
    type_definition: &NodeId,
    hook: &mut dyn FnMut(&NodeId, &NodeId),
) -> UaResult<()> {
    let result = finish_steps(
        inner,
        node_id,
        parent_id,
        reference_type_id,
        type_definition,
        hook,
    );
    if let Err(ref e) = result {
        debug!(node = %node_id, error = %e, "AddNodes: unwinding partial node");
        let _ = delete_node_local(inner, node_id, true);
    }
    result
}

/// The single-phase add: begin plus finish.
pub(crate) fn add_node_local(
    inner: &mut Inner,
    node: Node,
    parent_id: &NodeId,
    reference_type_id: &NodeId,
    type_definition: &NodeId,
    hook: &mut dyn FnMut(&NodeId, &NodeId),
) -> UaResult<NodeId> {
    let node_id = add_node_begin_local(inner, node)?;
    add_node_finish_local(
        inner,
        &node_id,
        parent_id,
        reference_type_id,
        type_definition,
        hook,
    )?;
    Ok(node_id)
}

// ---------------------------------------------------------------------------
// The facade
// ---------------------------------------------------------------------------

/// The typed, bidirectionally linked object graph and its mutation surface.
///
/// All mutation entry points are serialized through an internal writer lock;
/// each call is atomic with respect to concurrent readers.
pub struct AddressSpace {
    inner: RwLock<Inner>,
    external: RwLock<Vec<ExternalNamespace>>,
}

impl AddressSpace {
    /// Create an address space with the in-memory store.
    pub fn new(config: AddressSpaceConfig) -> UaResult<Self> {
        Self::with_store(Box::new(MemNodeStore::new()), config)
    }

    /// Create an address space on a caller-supplied store.
    pub fn with_store(mut store: Box<dyn NodeStore>, config: AddressSpaceConfig) -> UaResult<Self> {
        if config.namespace_uris.is_empty() {
            return Err(UaError::InvalidConfig {
                message: "the namespace table needs at least the OPC UA namespace".into(),
            });
        }
        if config.namespace_uris.len() > u16::MAX as usize {
            return Err(UaError::InvalidConfig {
                message: "namespace indices are 16 bit".into(),
            });
        }
        info!(
            namespaces = config.namespace_uris.len(),
            bootstrap = config.bootstrap_base_model,
            "initializing address space"
        );
        if config.bootstrap_base_model {
            ns0::bootstrap(store.as_mut())?;
        }
        Ok(Self {
            inner: RwLock::new(Inner {
                store,
                namespace_uris: config.namespace_uris,
            }),
            external: RwLock::new(Vec::new()),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().expect("address space lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().expect("address space lock poisoned")
    }

    /// Number of namespaces in the URI table.
    pub fn namespace_count(&self) -> u16 {
        self.read().namespace_uris.len() as u16
    }

    /// Register a namespace URI, returning its index. Re-registering an
    /// existing URI returns the existing index.
    pub fn register_namespace(&self, uri: &str) -> UaResult<u16> {
        let mut inner = self.write();
        if let Some(index) = inner.namespace_uris.iter().position(|u| u == uri) {
            return Ok(index as u16);
        }
        if inner.namespace_uris.len() >= u16::MAX as usize {
            return Err(UaError::InvalidConfig {
                message: "namespace table is full".into(),
            });
        }
        inner.namespace_uris.push(uri.to_string());
        Ok((inner.namespace_uris.len() - 1) as u16)
    }

    /// Route mutations whose source namespace matches `namespace` to a
    /// foreign manager instead of the local store.
    pub fn register_external_namespace(
        &self,
        namespace: u16,
        manager: Arc<dyn ExternalNodeManager>,
    ) -> UaResult<()> {
        if namespace as usize >= self.read().namespace_uris.len() {
            return Err(UaError::InvalidConfig {
                message: format!("namespace index {namespace} is not in the table"),
            });
        }
        let mut external = self.external.write().expect("external table lock poisoned");
        if external.iter().any(|e| e.namespace == namespace) {
            return Err(UaError::InvalidConfig {
                message: format!("namespace index {namespace} already has a manager"),
            });
        }
        external.push(ExternalNamespace { namespace, manager });
        Ok(())
    }

    pub(crate) fn external_namespaces(&self) -> Vec<ExternalNamespace> {
        self.external
            .read()
            .expect("external table lock poisoned")
            .clone()
    }

    // -- node addition -----------------------------------------------------

    /// Add one node described by an [`AddNodesItem`], returning its id.
    pub fn add_node(&self, item: &AddNodesItem) -> UaResult<NodeId> {
        self.add_node_with_hook(item, None)
    }

    /// [`AddressSpace::add_node`] with an instantiation hook invoked for the
    /// node and every child materialized for it.
    pub fn add_node_with_hook(
        &self,
        item: &AddNodesItem,
        hook: Option<&mut dyn FnMut(&NodeId, &NodeId)>,
    ) -> UaResult<NodeId> {
        let node = create_node_from_attributes(item)?;
        let mut inner = self.write();
        let mut noop = |_: &NodeId, _: &NodeId| {};
        let hook = hook.unwrap_or(&mut noop);
        add_node_local(
            &mut inner,
            node,
            &item.parent_node_id,
            &item.reference_type_id,
            &item.type_definition,
            hook,
        )
    }

    /// Insert a raw node without validation or instantiation, returning the
    /// assigned id. Pair with [`AddressSpace::add_node_finish`]; a node left
    /// unfinished is unvalidated and unlinked.
    pub fn add_node_begin(&self, node: Node) -> UaResult<NodeId> {
        add_node_begin_local(&mut self.write(), node)
    }

    /// Validate, type-check, instantiate, and link a node inserted by
    /// [`AddressSpace::add_node_begin`]. On failure the node is removed.
    pub fn add_node_finish(
        &self,
        node_id: &NodeId,
        parent_id: &NodeId,
        reference_type_id: &NodeId,
        type_definition: &NodeId,
        hook: Option<&mut dyn FnMut(&NodeId, &NodeId)>,
    ) -> UaResult<()> {
        let mut inner = self.write();
        let mut noop = |_: &NodeId, _: &NodeId| {};
        let hook = hook.unwrap_or(&mut noop);
        add_node_finish_local(
            &mut inner,
            node_id,
            parent_id,
            reference_type_id,
            type_definition,
            hook,
        )
    }

    /// Add a Variable whose value is served by a data source instead of
    /// inline storage. The source is read once up front so an unusable
    /// source fails before the node exists.
    #[allow(clippy::too_many_arguments)]
    pub fn add_data_source_variable_node(
        &self,
        requested_new_node_id: NodeId,
        parent_node_id: NodeId,
        reference_type_id: NodeId,
        browse_name: QualifiedName,
        type_definition: NodeId,
        attr: VariableAttributes,
        data_source: Arc<dyn DataSource>,
    ) -> UaResult<NodeId> {
        data_source
            .read(&requested_new_node_id)
            .map_err(|status| TypeCheckError::ValueAccess { status })?;

        let item = AddNodesItem {
            requested_new_node_id,
            parent_node_id,
            reference_type_id,
            browse_name,
            node_class: NodeClass::Variable,
            type_definition,
            attributes: NodeAttributes::Variable(attr),
        };
        let mut node = create_node_from_attributes(&item)?;
        if let Some(common) = node.variable_common_mut() {
            common.value = ValueStorage::Source(data_source);
        }

        let mut inner = self.write();
        let mut noop = |_: &NodeId, _: &NodeId| {};
        add_node_local(
            &mut inner,
            node,
            &item.parent_node_id,
            &item.reference_type_id,
            &item.type_definition,
            &mut noop,
        )
    }

    /// Add a Method node with an optional call handler. Non-empty argument
    /// lists become `InputArguments` / `OutputArguments` property Variables
    /// under the method.
    #[allow(clippy::too_many_arguments)]
    pub fn add_method_node(
        &self,
        requested_new_node_id: NodeId,
        parent_node_id: NodeId,
        reference_type_id: NodeId,
        browse_name: QualifiedName,
        attr: MethodAttributes,
        callback: Option<MethodCallback>,
        input_arguments: &[Argument],
        output_arguments: &[Argument],
    ) -> UaResult<NodeId> {
        let mut method = method_node_from_attributes(&requested_new_node_id, &browse_name, &attr);
        method.callback = callback;

        let mut inner = self.write();
        let mut noop = |_: &NodeId, _: &NodeId| {};
        let method_id = add_node_local(
            &mut inner,
            Node::Method(method),
            &parent_node_id,
            &reference_type_id,
            &NodeId::NULL,
            &mut noop,
        )?;

        // Everything created so far; a failure deletes all of it, so the
        // whole composite add leaves no partial residue.
        let mut created = vec![method_id.clone()];
        let arguments = [
            ("InputArguments", input_arguments),
            ("OutputArguments", output_arguments),
        ];
        for (name, args) in arguments {
            if args.is_empty() {
                continue;
            }
            match add_argument_property(&mut inner, &method_id, name, args) {
                Ok(property_id) => created.push(property_id),
                Err(e) => {
                    for node_id in created.iter().rev() {
                        let _ = delete_node_local(&mut inner, node_id, true);
                    }
                    return Err(e);
                }
            }
        }
        Ok(method_id)
    }

    // -- references --------------------------------------------------------

    /// Add a bidirectional reference described by an item.
    pub fn add_reference_item(&self, item: &AddReferencesItem) -> UaResult<()> {
        Ok(add_reference_local(&mut self.write(), item)?)
    }

    /// Add a bidirectional reference between two local nodes.
    pub fn add_reference(
        &self,
        source_id: NodeId,
        reference_type_id: NodeId,
        target_id: ExpandedNodeId,
        is_forward: bool,
    ) -> UaResult<()> {
        self.add_reference_item(&AddReferencesItem {
            source_node_id: source_id,
            reference_type_id,
            is_forward,
            target_server_uri: None,
            target_node_id: target_id,
            target_node_class: None,
        })
    }

    /// Delete a reference described by an item.
    pub fn delete_reference_item(&self, item: &DeleteReferencesItem) -> UaResult<()> {
        Ok(delete_reference_local(&mut self.write(), item)?)
    }

    /// Delete one direction of a reference and, when `delete_bidirectional`,
    /// its inverse on the target.
    pub fn delete_reference(
        &self,
        source_id: NodeId,
        reference_type_id: NodeId,
        target_id: ExpandedNodeId,
        is_forward: bool,
        delete_bidirectional: bool,
    ) -> UaResult<()> {
        self.delete_reference_item(&DeleteReferencesItem {
            source_node_id: source_id,
            reference_type_id,
            is_forward,
            target_node_id: target_id,
            delete_bidirectional,
        })
    }

    // -- deletion ----------------------------------------------------------

    /// Delete a node, optionally tearing down the inverse entries its
    /// references left on other nodes.
    pub fn delete_node(&self, node_id: &NodeId, delete_references: bool) -> UaResult<()> {
        delete_node_local(&mut self.write(), node_id, delete_references)
    }

    // -- attribute-edit hooks ----------------------------------------------

    /// Attach read/write notifications to a Variable's inline value.
    pub fn set_variable_value_callback(
        &self,
        node_id: &NodeId,
        callback: ValueCallback,
    ) -> UaResult<()> {
        let mut inner = self.write();
        let node = inner
            .store
            .get_mut(node_id)
            .ok_or_else(|| node_unknown(node_id))?;
        let node_class = node.node_class();
        let Some(variable) = node.as_variable_mut() else {
            return Err(AttributeError::NodeClassInvalid { node_class }.into());
        };
        match &mut variable.common.value {
            ValueStorage::Data { callback: slot, .. } => {
                *slot = Some(callback);
                Ok(())
            }
            ValueStorage::Source(_) => Err(AttributeError::ValueNotInline {
                node_id: node_id.clone(),
            }
            .into()),
        }
    }

    /// Replace a Variable's value storage with a data source. An inline
    /// value is dropped.
    pub fn set_variable_data_source(
        &self,
        node_id: &NodeId,
        data_source: Arc<dyn DataSource>,
    ) -> UaResult<()> {
        let mut inner = self.write();
        let node = inner
            .store
            .get_mut(node_id)
            .ok_or_else(|| node_unknown(node_id))?;
        let node_class = node.node_class();
        let Some(variable) = node.as_variable_mut() else {
            return Err(AttributeError::NodeClassInvalid { node_class }.into());
        };
        variable.common.value = ValueStorage::Source(data_source);
        Ok(())
    }

    /// Register the constructor/destructor pair of an ObjectType.
    pub fn set_object_type_lifecycle(
        &self,
        node_id: &NodeId,
        lifecycle: ObjectLifecycle,
    ) -> UaResult<()> {
        let mut inner = self.write();
        let node = inner
            .store
            .get_mut(node_id)
            .ok_or_else(|| node_unknown(node_id))?;
        let Some(object_type) = node.as_object_type_mut() else {
            return Err(AttributeError::NodeClassInvalid {
                node_class: node.node_class(),
            }
            .into());
        };
        object_type.lifecycle = lifecycle;
        Ok(())
    }

    /// Attach the call handler of a Method node.
    pub fn set_method_callback(&self, node_id: &NodeId, callback: MethodCallback) -> UaResult<()> {
        let mut inner = self.write();
        let node = inner
            .store
            .get_mut(node_id)
            .ok_or_else(|| node_unknown(node_id))?;
        let Some(method) = node.as_method_mut() else {
            return Err(AttributeError::NodeClassInvalid {
                node_class: node.node_class(),
            }
            .into());
        };
        method.callback = Some(callback);
        Ok(())
    }

    // -- reads -------------------------------------------------------------

    /// An owned copy of a node.
    pub fn get_node(&self, node_id: &NodeId) -> Option<Node> {
        self.read().store.get_copy(node_id)
    }

    /// List a node's references through the single-item browse.
    pub fn browse(&self, spec: &BrowseSpec) -> UaResult<Vec<ReferenceDescription>> {
        Ok(browse_single(self.read().store.as_ref(), spec)?)
    }

    /// Read a Variable's current value (inline or via its data source).
    pub fn read_value(&self, node_id: &NodeId) -> UaResult<DataValue> {
        Ok(read_value_attribute(self.read().store.as_ref(), node_id)?)
    }

    /// Write a Variable's value through its normal write path.
    pub fn write_value(&self, node_id: &NodeId, value: &Variant) -> UaResult<()> {
        write_value_attribute(self.write().store.as_mut(), node_id, value)
            .map_err(|status| TypeCheckError::ValueAccess { status }.into())
    }

    /// Number of nodes in the store.
    pub fn node_count(&self) -> usize {
        self.read().store.len()
    }

    /// Snapshot of every node id in the store (order unspecified).
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.read().store.node_ids()
    }
}

impl std::fmt::Debug for AddressSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.read();
        f.debug_struct("AddressSpace")
            .field("nodes", &inner.store.len())
            .field("namespaces", &inner.namespace_uris.len())
            .finish()
    }
}

/// The method argument properties the wire model expects next to a Method.
/// Returns the created property's id.
fn add_argument_property(
    inner: &mut Inner,
    method_id: &NodeId,
    name: &str,
    arguments: &[Argument],
) -> UaResult<NodeId> {
    let mut node = VariableNode::default();
    node.head.node_id = NodeId::numeric(method_id.namespace, 0);
    node.head.browse_name = QualifiedName::new(0, name);
    node.head.display_name = LocalizedText::en(name);
    node.head.description = LocalizedText::en(name);
    // Clients commonly monitor the argument properties.
    node.minimum_sampling_interval = 10_000.0;
    node.common.data_type = ns0::BASE_DATA_TYPE;
    node.common.value_rank = 1;
    node.common.value = ValueStorage::Data {
        value: DataValue::new(Variant::Array {
            element_type: ns0::ARGUMENT,
            elements: arguments.iter().cloned().map(Scalar::Argument).collect(),
            dimensions: Vec::new(),
        }),
        callback: None,
    };
    let mut noop = |_: &NodeId, _: &NodeId| {};
    add_node_local(
        inner,
        Node::Variable(node),
        method_id,
        &ns0::HAS_PROPERTY,
        &ns0::PROPERTY_TYPE,
        &mut noop,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeClass;

    fn space() -> AddressSpace {
        AddressSpace::new(AddressSpaceConfig::default()).unwrap()
    }

    #[test]
    fn config_needs_a_namespace() {
        let result = AddressSpace::new(AddressSpaceConfig {
            namespace_uris: vec![],
            bootstrap_base_model: false,
        });
        assert!(result.is_err());
    }

    #[test]
    fn namespace_registration_is_idempotent() {
        let space = space();
        let a = space.register_namespace("urn:test:one").unwrap();
        let b = space.register_namespace("urn:test:one").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, space.namespace_count() - 1);
    }

    #[test]
    fn begin_rejects_out_of_range_namespace() {
        let space = space();
        let mut node = Node::zeroed(NodeClass::Object);
        node.head_mut().node_id = NodeId::numeric(9, 1);
        let before = space.node_count();
        assert!(space.add_node_begin(node).is_err());
        assert_eq!(space.node_count(), before);
    }

    #[test]
    fn one_way_duplicate_rejected() {
        let mut node = Node::zeroed(NodeClass::Object);
        node.head_mut().node_id = NodeId::numeric(1, 1);
        let target = ExpandedNodeId::local(NodeId::numeric(1, 2));
        add_one_way_reference(&mut node, &ns0::HAS_COMPONENT, &target, false).unwrap();
        let err = add_one_way_reference(&mut node, &ns0::HAS_COMPONENT, &target, false).unwrap_err();
        assert!(matches!(err, ReferenceError::Duplicate { .. }));
        assert_eq!(node.head().references.len(), 1);
        // The inverse direction is a distinct entry.
        add_one_way_reference(&mut node, &ns0::HAS_COMPONENT, &target, true).unwrap();
        assert_eq!(node.head().references.len(), 2);
    }

    #[test]
    fn one_way_delete_matches_direction() {
        let mut node = Node::zeroed(NodeClass::Object);
        node.head_mut().node_id = NodeId::numeric(1, 1);
        let target = ExpandedNodeId::local(NodeId::numeric(1, 2));
        add_one_way_reference(&mut node, &ns0::HAS_COMPONENT, &target, false).unwrap();

        let wrong_direction =
            delete_one_way_reference(&mut node, &target.node_id, &ns0::HAS_COMPONENT, true);
        assert!(matches!(
            wrong_direction,
            Err(ReferenceError::NotDeleted { .. })
        ));

        delete_one_way_reference(&mut node, &target.node_id, &ns0::HAS_COMPONENT, false).unwrap();
        assert!(node.head().references.is_empty());
    }
}
