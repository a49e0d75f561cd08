//! End-to-end integration tests for the address-space mutation core.
//!
//! These tests drive the full add/delete pipeline against a bootstrapped
//! base model: type creation, instantiation with child copying, lifecycle
//! callbacks, reference-pair atomicity, and the no-trace-on-failure
//! contract of failed adds.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ua_addrspace::attributes::{
    AddNodesItem, BaseAttributes, MethodAttributes, NodeAttributes, ObjectAttributes,
    ObjectTypeAttributes, VariableAttributes, VariableTypeAttributes,
};
use ua_addrspace::browse::BrowseSpec;
use ua_addrspace::error::{StatusCode, UaError};
use ua_addrspace::node::{
    DataSource, InstanceHandle, Node, NodeClass, ObjectLifecycle, ValueCallback,
    VALUE_RANK_SCALAR,
};
use ua_addrspace::nodeid::{ExpandedNodeId, NodeId, QualifiedName};
use ua_addrspace::ns0;
use ua_addrspace::server::{AddressSpace, AddressSpaceConfig};
use ua_addrspace::service::{
    AddNodesRequest, AddReferencesItem, AddReferencesRequest, DeleteNodesItem, DeleteNodesRequest,
};
use ua_addrspace::store::mem::MemNodeStore;
use ua_addrspace::store::NodeStore;
use ua_addrspace::typecheck::type_check_node;
use ua_addrspace::value::{DataValue, Scalar, Variant};

fn space() -> AddressSpace {
    AddressSpace::new(AddressSpaceConfig::default()).unwrap()
}

fn object_type_item(node_id: NodeId, name: &str, parent: NodeId) -> AddNodesItem {
    AddNodesItem {
        requested_new_node_id: node_id,
        parent_node_id: parent,
        reference_type_id: ns0::HAS_SUBTYPE,
        browse_name: QualifiedName::new(1, name),
        node_class: NodeClass::ObjectType,
        type_definition: NodeId::NULL,
        attributes: NodeAttributes::ObjectType(ObjectTypeAttributes {
            base: BaseAttributes::with_display_name(name),
            is_abstract: false,
        }),
    }
}

fn variable_item(
    node_id: NodeId,
    name: &str,
    parent: NodeId,
    reference_type: NodeId,
    data_type: NodeId,
    value: Variant,
) -> AddNodesItem {
    AddNodesItem {
        requested_new_node_id: node_id,
        parent_node_id: parent,
        reference_type_id: reference_type,
        browse_name: QualifiedName::new(1, name),
        node_class: NodeClass::Variable,
        type_definition: ns0::BASE_DATA_VARIABLE_TYPE,
        attributes: NodeAttributes::Variable(VariableAttributes {
            base: BaseAttributes::with_display_name(name),
            data_type,
            value_rank: VALUE_RANK_SCALAR,
            value,
            ..Default::default()
        }),
    }
}

fn object_item(node_id: NodeId, name: &str, parent: NodeId, type_definition: NodeId) -> AddNodesItem {
    AddNodesItem {
        requested_new_node_id: node_id,
        parent_node_id: parent,
        reference_type_id: ns0::ORGANIZES,
        browse_name: QualifiedName::new(1, name),
        node_class: NodeClass::Object,
        type_definition,
        attributes: NodeAttributes::Object(ObjectAttributes {
            base: BaseAttributes::with_display_name(name),
            event_notifier: 0,
        }),
    }
}

/// MyType (ns=1, id=1000) with an aggregated Variable child "Temp".
fn add_my_type_with_temp(space: &AddressSpace) -> NodeId {
    let my_type = NodeId::numeric(1, 1000);
    space
        .add_node(&object_type_item(my_type.clone(), "MyType", ns0::BASE_OBJECT_TYPE))
        .unwrap();
    space
        .add_node(&variable_item(
            NodeId::numeric(1, 1001),
            "Temp",
            my_type.clone(),
            ns0::HAS_COMPONENT,
            ns0::DOUBLE,
            Variant::Scalar(Scalar::Double(0.0)),
        ))
        .unwrap();
    my_type
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn add_object_type_as_subtype() {
    // S1: a new ObjectType under BaseObjectType via HasSubtype.
    let space = space();
    let my_type = NodeId::numeric(1, 1000);
    let assigned = space
        .add_node(&object_type_item(my_type.clone(), "MyType", ns0::BASE_OBJECT_TYPE))
        .unwrap();
    assert_eq!(assigned, my_type);

    let subtypes = space
        .browse(&BrowseSpec::forward(ns0::BASE_OBJECT_TYPE, ns0::HAS_SUBTYPE))
        .unwrap();
    assert!(subtypes.iter().any(|rd| rd.node_id.node_id == my_type));
}

#[test]
fn add_variable_under_objects_folder() {
    // S2: scalar Int32 variable organized under the Objects folder.
    let space = space();
    let var_id = NodeId::numeric(1, 2000);
    space
        .add_node(&variable_item(
            var_id.clone(),
            "Answer",
            ns0::OBJECTS_FOLDER,
            ns0::ORGANIZES,
            ns0::INT32,
            Variant::Scalar(Scalar::Int32(42)),
        ))
        .unwrap();

    let value = space.read_value(&var_id).unwrap();
    assert_eq!(value.value, Variant::Scalar(Scalar::Int32(42)));

    // The inverse Organizes edge lands on the Objects folder.
    let inverse = space
        .browse(&BrowseSpec::inverse(var_id, ns0::ORGANIZES))
        .unwrap();
    assert_eq!(inverse.len(), 1);
    assert_eq!(inverse[0].node_id.node_id, ns0::OBJECTS_FOLDER);
}

#[test]
fn instantiate_object_copies_type_children() {
    // S3: instantiating MyType materializes the "Temp" child.
    let space = space();
    let my_type = add_my_type_with_temp(&space);

    let instance = space
        .add_node(&object_item(
            NodeId::numeric(1, 0),
            "Sensor",
            ns0::OBJECTS_FOLDER,
            my_type,
        ))
        .unwrap();
    assert_eq!(instance.namespace, 1);

    let children = space
        .browse(
            &BrowseSpec::forward(instance.clone(), ns0::AGGREGATES)
                .with_class_mask(NodeClass::Variable.bit()),
        )
        .unwrap();
    assert_eq!(children.len(), 1);
    let temp = &children[0];
    assert_eq!(temp.browse_name, QualifiedName::new(1, "Temp"));
    assert_eq!(temp.node_class, NodeClass::Variable);
    // Fresh id in the instance's namespace, distinct from the template's.
    assert_eq!(temp.node_id.node_id.namespace, 1);
    assert_ne!(temp.node_id.node_id, NodeId::numeric(1, 1001));

    let value = space.read_value(&temp.node_id.node_id).unwrap();
    assert_eq!(value.value, Variant::Scalar(Scalar::Double(0.0)));

    // The copy is tied to its own variable type.
    let typedefs = space
        .browse(&BrowseSpec::forward(
            temp.node_id.node_id.clone(),
            ns0::HAS_TYPE_DEFINITION,
        ))
        .unwrap();
    assert_eq!(typedefs.len(), 1);
    assert_eq!(typedefs[0].node_id.node_id, ns0::BASE_DATA_VARIABLE_TYPE);
}

#[test]
fn delete_node_runs_destructors_and_tears_down_references() {
    // S4: destructor invoked once with the constructor's handle; no
    // dangling references afterwards.
    let space = space();
    let my_type = add_my_type_with_temp(&space);

    let destructor_calls = Arc::new(AtomicUsize::new(0));
    let seen_handle = Arc::new(Mutex::new(None::<u32>));
    let calls = Arc::clone(&destructor_calls);
    let seen = Arc::clone(&seen_handle);
    space
        .set_object_type_lifecycle(
            &my_type,
            ObjectLifecycle {
                constructor: Some(Arc::new(|_id| -> Option<InstanceHandle> {
                    Some(Arc::new(7u32))
                })),
                destructor: Some(Arc::new(move |_id, handle| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    let value = handle
                        .as_ref()
                        .and_then(|h| h.downcast_ref::<u32>())
                        .copied();
                    *seen.lock().unwrap() = value;
                })),
            },
        )
        .unwrap();

    let instance = space
        .add_node(&object_item(
            NodeId::numeric(1, 0),
            "Sensor",
            ns0::OBJECTS_FOLDER,
            my_type,
        ))
        .unwrap();

    space.delete_node(&instance, true).unwrap();
    assert_eq!(destructor_calls.load(Ordering::SeqCst), 1);
    assert_eq!(*seen_handle.lock().unwrap(), Some(7));
    assert!(space.get_node(&instance).is_none());

    // The Objects folder holds no edge to the deleted instance.
    let children = space
        .browse(&BrowseSpec::forward(ns0::OBJECTS_FOLDER, ns0::ORGANIZES))
        .unwrap();
    assert!(children.iter().all(|rd| rd.node_id.node_id != instance));
}

#[test]
fn duplicate_reference_is_rejected() {
    // S5: the second identical addReference fails without growing the
    // source's reference list.
    let space = space();
    let a = space
        .add_node(&object_item(NodeId::numeric(1, 10), "A", ns0::OBJECTS_FOLDER, NodeId::NULL))
        .unwrap();
    let b = space
        .add_node(&object_item(NodeId::numeric(1, 11), "B", ns0::OBJECTS_FOLDER, NodeId::NULL))
        .unwrap();

    space
        .add_reference(
            a.clone(),
            ns0::HAS_COMPONENT,
            ExpandedNodeId::local(b.clone()),
            true,
        )
        .unwrap();
    let before = space.get_node(&a).unwrap().head().references.len();

    let err = space
        .add_reference(a.clone(), ns0::HAS_COMPONENT, ExpandedNodeId::local(b), true)
        .unwrap_err();
    assert_eq!(
        err.status_code(),
        StatusCode::BAD_DUPLICATE_REFERENCE_NOT_ALLOWED
    );
    assert_eq!(space.get_node(&a).unwrap().head().references.len(), before);
}

#[test]
fn data_type_mismatch_leaves_no_node() {
    // S6: a String variable under an Int32-typed VariableType.
    let space = space();
    let int32_vt = NodeId::numeric(1, 3000);
    space
        .add_node(&AddNodesItem {
            requested_new_node_id: int32_vt.clone(),
            parent_node_id: ns0::BASE_DATA_VARIABLE_TYPE,
            reference_type_id: ns0::HAS_SUBTYPE,
            browse_name: QualifiedName::new(1, "Int32VarType"),
            node_class: NodeClass::VariableType,
            type_definition: NodeId::NULL,
            attributes: NodeAttributes::VariableType(VariableTypeAttributes {
                base: BaseAttributes::with_display_name("Int32VarType"),
                data_type: ns0::INT32,
                ..Default::default()
            }),
        })
        .unwrap();

    let var_id = NodeId::numeric(1, 3001);
    let err = space
        .add_node(&AddNodesItem {
            requested_new_node_id: var_id.clone(),
            parent_node_id: ns0::OBJECTS_FOLDER,
            reference_type_id: ns0::ORGANIZES,
            browse_name: QualifiedName::new(1, "Broken"),
            node_class: NodeClass::Variable,
            type_definition: int32_vt,
            attributes: NodeAttributes::Variable(VariableAttributes {
                data_type: ns0::STRING,
                value_rank: VALUE_RANK_SCALAR,
                value: Variant::Scalar(Scalar::String("oops".into())),
                ..Default::default()
            }),
        })
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_TYPE_MISMATCH);
    assert!(space.get_node(&var_id).is_none());
}

// ---------------------------------------------------------------------------
// Invariants
// ---------------------------------------------------------------------------

#[test]
fn successful_add_satisfies_graph_invariants() {
    let space = space();
    let var_id = space
        .add_node(&variable_item(
            NodeId::numeric(1, 2100),
            "Pressure",
            ns0::OBJECTS_FOLDER,
            ns0::ORGANIZES,
            ns0::DOUBLE,
            Variant::Scalar(Scalar::Double(1.25)),
        ))
        .unwrap();

    let node = space.get_node(&var_id).unwrap();
    assert_eq!(node.browse_name(), &QualifiedName::new(1, "Pressure"));
    let typedefs: Vec<_> = node
        .head()
        .references
        .iter()
        .filter(|r| r.reference_type_id == ns0::HAS_TYPE_DEFINITION && !r.is_inverse)
        .collect();
    assert_eq!(typedefs.len(), 1);

    // Round trip: the parent sees the node forward, the node sees the
    // parent inverse, through the same reference type.
    let forward = space
        .browse(&BrowseSpec::forward(ns0::OBJECTS_FOLDER, ns0::ORGANIZES))
        .unwrap();
    assert!(forward.iter().any(|rd| rd.node_id.node_id == var_id));
    let inverse = space
        .browse(&BrowseSpec::inverse(var_id, ns0::ORGANIZES))
        .unwrap();
    assert!(inverse.iter().any(|rd| rd.node_id.node_id == ns0::OBJECTS_FOLDER));
}

#[test]
fn failed_add_leaves_no_trace() {
    let space = space();
    let var_id = NodeId::numeric(1, 2200);
    let before = space.node_count();
    // Missing parent fails the parent-reference check after insertion.
    let err = space
        .add_node(&variable_item(
            var_id.clone(),
            "Orphan",
            NodeId::numeric(1, 424242),
            ns0::ORGANIZES,
            ns0::INT32,
            Variant::Scalar(Scalar::Int32(1)),
        ))
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_PARENT_NODE_ID_INVALID);
    assert!(space.get_node(&var_id).is_none());
    assert_eq!(space.node_count(), before);
}

#[test]
fn reference_pair_is_atomic() {
    let space = space();
    let a = space
        .add_node(&object_item(NodeId::numeric(1, 20), "A", ns0::OBJECTS_FOLDER, NodeId::NULL))
        .unwrap();

    let before = space.get_node(&a).unwrap().head().references.len();
    // The target does not exist, so neither direction may remain.
    let err = space
        .add_reference(
            a.clone(),
            ns0::HAS_COMPONENT,
            ExpandedNodeId::local(NodeId::numeric(1, 999_999)),
            true,
        )
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_NODE_ID_UNKNOWN);
    assert_eq!(space.get_node(&a).unwrap().head().references.len(), before);
}

#[test]
fn delete_with_references_leaves_no_dangling_edges() {
    let space = space();
    let my_type = add_my_type_with_temp(&space);
    let instance = space
        .add_node(&object_item(NodeId::numeric(1, 0), "Sensor", ns0::OBJECTS_FOLDER, my_type))
        .unwrap();

    space.delete_node(&instance, true).unwrap();

    for id in space.node_ids() {
        let node = space.get_node(&id).unwrap();
        assert!(
            node.head()
                .references
                .iter()
                .all(|r| r.target_id.node_id != instance),
            "{id} still references the deleted instance"
        );
    }
}

#[test]
fn type_check_is_idempotent_on_a_valid_variable() {
    let mut store = MemNodeStore::new();
    ns0::bootstrap(&mut store).unwrap();

    let var_id = NodeId::numeric(0, 60_000);
    let mut node = Node::zeroed(NodeClass::Variable);
    node.head_mut().node_id = var_id.clone();
    node.head_mut().browse_name = QualifiedName::new(0, "Checked");
    let common = node.variable_common_mut().unwrap();
    common.data_type = ns0::INT32;
    common.value_rank = VALUE_RANK_SCALAR;
    store.insert(node).unwrap();

    type_check_node(
        &mut store,
        &var_id,
        NodeClass::Variable,
        &NodeId::NULL,
        &ns0::BASE_DATA_VARIABLE_TYPE,
    )
    .unwrap();
    let after_first = store.get_copy(&var_id).unwrap();

    type_check_node(
        &mut store,
        &var_id,
        NodeClass::Variable,
        &NodeId::NULL,
        &ns0::BASE_DATA_VARIABLE_TYPE,
    )
    .unwrap();
    let after_second = store.get_copy(&var_id).unwrap();

    let first = after_first.variable_common().unwrap();
    let second = after_second.variable_common().unwrap();
    assert_eq!(first.data_type, second.data_type);
    assert_eq!(first.value_rank, second.value_rank);
    assert_eq!(first.array_dimensions, second.array_dimensions);
}

#[test]
fn abstract_types_cannot_be_instantiated() {
    let space = space();
    let abstract_type = NodeId::numeric(1, 4000);
    space
        .add_node(&AddNodesItem {
            requested_new_node_id: abstract_type.clone(),
            parent_node_id: ns0::BASE_OBJECT_TYPE,
            reference_type_id: ns0::HAS_SUBTYPE,
            browse_name: QualifiedName::new(1, "AbstractThing"),
            node_class: NodeClass::ObjectType,
            type_definition: NodeId::NULL,
            attributes: NodeAttributes::ObjectType(ObjectTypeAttributes {
                base: BaseAttributes::with_display_name("AbstractThing"),
                is_abstract: true,
            }),
        })
        .unwrap();

    let instance_id = NodeId::numeric(1, 4001);
    let err = space
        .add_node(&object_item(
            instance_id.clone(),
            "Impossible",
            ns0::OBJECTS_FOLDER,
            abstract_type,
        ))
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_TYPE_DEFINITION_INVALID);
    assert!(space.get_node(&instance_id).is_none());
}

#[test]
fn non_hierarchical_parent_reference_is_rejected() {
    let space = space();
    let err = space
        .add_node(&AddNodesItem {
            reference_type_id: ns0::HAS_TYPE_DEFINITION,
            ..object_item(
                NodeId::numeric(1, 30),
                "Misparented",
                ns0::OBJECTS_FOLDER,
                NodeId::NULL,
            )
        })
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_REFERENCE_TYPE_ID_INVALID);
}

// ---------------------------------------------------------------------------
// Services and programmatic surface
// ---------------------------------------------------------------------------

#[test]
fn add_nodes_service_reports_per_item_results_in_order() {
    let space = space();
    let good = variable_item(
        NodeId::numeric(1, 2300),
        "Good",
        ns0::OBJECTS_FOLDER,
        ns0::ORGANIZES,
        ns0::INT32,
        Variant::Scalar(Scalar::Int32(1)),
    );
    // Same id again: NodeIdExists.
    let duplicate = variable_item(
        NodeId::numeric(1, 2300),
        "Duplicate",
        ns0::OBJECTS_FOLDER,
        ns0::ORGANIZES,
        ns0::INT32,
        Variant::Scalar(Scalar::Int32(2)),
    );
    let response = space.service_add_nodes(&AddNodesRequest {
        nodes_to_add: vec![good, duplicate],
    });
    assert_eq!(response.service_result, StatusCode::GOOD);
    assert_eq!(response.results.len(), 2);
    assert_eq!(response.results[0].status, StatusCode::GOOD);
    assert_eq!(response.results[0].added_node_id, NodeId::numeric(1, 2300));
    assert_eq!(response.results[1].status, StatusCode::BAD_NODE_ID_EXISTS);
    assert!(response.results[1].added_node_id.is_null());
}

#[test]
fn foreign_server_references_are_not_implemented() {
    let space = space();
    let a = space
        .add_node(&object_item(NodeId::numeric(1, 40), "A", ns0::OBJECTS_FOLDER, NodeId::NULL))
        .unwrap();
    let response = space.service_add_references(&AddReferencesRequest {
        references_to_add: vec![AddReferencesItem {
            source_node_id: a,
            reference_type_id: ns0::HAS_COMPONENT,
            is_forward: true,
            target_server_uri: Some("opc.tcp://elsewhere:4840".into()),
            target_node_id: ExpandedNodeId::local(NodeId::numeric(1, 41)),
            target_node_class: None,
        }],
    });
    assert_eq!(response.results[0], StatusCode::BAD_NOT_IMPLEMENTED);
}

#[test]
fn delete_nodes_service_flags_unknown_ids() {
    let space = space();
    let response = space.service_delete_nodes(&DeleteNodesRequest {
        nodes_to_delete: vec![DeleteNodesItem {
            node_id: NodeId::numeric(1, 999),
            delete_target_references: true,
        }],
    });
    assert_eq!(response.results[0], StatusCode::BAD_NODE_ID_UNKNOWN);
}

struct FixedSource {
    value: Mutex<Variant>,
}

impl DataSource for FixedSource {
    fn read(&self, _node_id: &NodeId) -> Result<DataValue, StatusCode> {
        Ok(DataValue::new(self.value.lock().unwrap().clone()))
    }

    fn write(&self, _node_id: &NodeId, value: &Variant) -> Result<(), StatusCode> {
        *self.value.lock().unwrap() = value.clone();
        Ok(())
    }
}

#[test]
fn data_source_variable_reads_through_the_source() {
    let space = space();
    let source = Arc::new(FixedSource {
        value: Mutex::new(Variant::Scalar(Scalar::Double(21.5))),
    });
    let var_id = space
        .add_data_source_variable_node(
            NodeId::numeric(1, 2400),
            ns0::OBJECTS_FOLDER,
            ns0::ORGANIZES,
            QualifiedName::new(1, "Outside"),
            ns0::BASE_DATA_VARIABLE_TYPE,
            VariableAttributes {
                base: BaseAttributes::with_display_name("Outside"),
                data_type: ns0::DOUBLE,
                value_rank: VALUE_RANK_SCALAR,
                ..Default::default()
            },
            Arc::clone(&source) as Arc<dyn DataSource>,
        )
        .unwrap();

    let value = space.read_value(&var_id).unwrap();
    assert_eq!(value.value, Variant::Scalar(Scalar::Double(21.5)));

    space
        .write_value(&var_id, &Variant::Scalar(Scalar::Double(-3.0)))
        .unwrap();
    let value = space.read_value(&var_id).unwrap();
    assert_eq!(value.value, Variant::Scalar(Scalar::Double(-3.0)));
}

#[test]
fn value_callback_observes_writes() {
    let space = space();
    let var_id = space
        .add_node(&variable_item(
            NodeId::numeric(1, 2500),
            "Watched",
            ns0::OBJECTS_FOLDER,
            ns0::ORGANIZES,
            ns0::INT32,
            Variant::Scalar(Scalar::Int32(0)),
        ))
        .unwrap();

    let writes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&writes);
    space
        .set_variable_value_callback(
            &var_id,
            ValueCallback {
                on_read: None,
                on_write: Some(Arc::new(move |_id, _value| {
                    counter.fetch_add(1, Ordering::SeqCst);
                })),
            },
        )
        .unwrap();

    space
        .write_value(&var_id, &Variant::Scalar(Scalar::Int32(5)))
        .unwrap();
    assert_eq!(writes.load(Ordering::SeqCst), 1);
    assert_eq!(
        space.read_value(&var_id).unwrap().value,
        Variant::Scalar(Scalar::Int32(5))
    );
}

#[test]
fn method_node_gains_argument_properties() {
    let space = space();
    let parent = space
        .add_node(&object_item(NodeId::numeric(1, 50), "Device", ns0::OBJECTS_FOLDER, NodeId::NULL))
        .unwrap();

    let method_id = space
        .add_method_node(
            NodeId::numeric(1, 51),
            parent,
            ns0::HAS_COMPONENT,
            QualifiedName::new(1, "Reset"),
            MethodAttributes {
                base: BaseAttributes::with_display_name("Reset"),
                executable: true,
            },
            Some(Arc::new(|_id, _args| Ok(Vec::new()))),
            &[ua_addrspace::value::Argument {
                name: "Delay".into(),
                data_type: ns0::DOUBLE,
                value_rank: VALUE_RANK_SCALAR,
                ..Default::default()
            }],
            &[],
        )
        .unwrap();

    let properties = space
        .browse(&BrowseSpec::forward(method_id, ns0::HAS_PROPERTY))
        .unwrap();
    assert_eq!(properties.len(), 1);
    assert_eq!(properties[0].browse_name, QualifiedName::new(0, "InputArguments"));
}

#[test]
fn hook_fires_for_instance_and_children() {
    let space = space();
    let my_type = add_my_type_with_temp(&space);

    let mut instantiated: Vec<(NodeId, NodeId)> = Vec::new();
    let mut hook = |instance: &NodeId, type_id: &NodeId| {
        instantiated.push((instance.clone(), type_id.clone()));
    };
    let instance = space
        .add_node_with_hook(
            &object_item(NodeId::numeric(1, 0), "Sensor", ns0::OBJECTS_FOLDER, my_type.clone()),
            Some(&mut hook),
        )
        .unwrap();

    // Once for the Temp child (against BaseDataVariableType), once for the
    // instance itself (against MyType).
    assert_eq!(instantiated.len(), 2);
    assert_eq!(instantiated[1], (instance, my_type));
    assert_eq!(instantiated[0].1, ns0::BASE_DATA_VARIABLE_TYPE);
}

#[test]
fn two_phase_add_interleaves() {
    let space = space();
    let mut node = Node::zeroed(NodeClass::Object);
    node.head_mut().node_id = NodeId::numeric(1, 0);
    node.head_mut().browse_name = QualifiedName::new(1, "Staged");

    let node_id = space.add_node_begin(node).unwrap();
    // The id exists before validation completes.
    assert!(space.get_node(&node_id).is_some());

    space
        .add_node_finish(
            &node_id,
            &ns0::OBJECTS_FOLDER,
            &ns0::ORGANIZES,
            &ns0::BASE_OBJECT_TYPE,
            None,
        )
        .unwrap();
    let inverse = space
        .browse(&BrowseSpec::inverse(node_id, ns0::ORGANIZES))
        .unwrap();
    assert_eq!(inverse.len(), 1);
}

#[test]
fn service_items_serialize() {
    let item = AddReferencesItem {
        source_node_id: NodeId::numeric(1, 1),
        reference_type_id: ns0::HAS_COMPONENT,
        is_forward: true,
        target_server_uri: None,
        target_node_id: ExpandedNodeId::local(NodeId::numeric(1, 2)),
        target_node_class: Some(NodeClass::Object),
    };
    let json = serde_json::to_string(&item).unwrap();
    let back: AddReferencesItem = serde_json::from_str(&json).unwrap();
    assert_eq!(back.source_node_id, item.source_node_id);
    assert_eq!(back.target_node_id, item.target_node_id);
}

#[test]
fn errors_carry_their_status_codes() {
    let space = space();
    let err = space.delete_node(&NodeId::numeric(1, 7777), true).unwrap_err();
    assert!(matches!(err, UaError::Store(_)));
    assert_eq!(err.status_code(), StatusCode::BAD_NODE_ID_UNKNOWN);
}
