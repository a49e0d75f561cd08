//! Well-known namespace-zero identifiers and the minimal base model.
//!
//! The mutation core needs a skeleton of the OPC UA base information model
//! to operate: the reference-type tree it validates against, the base
//! object/variable types used as default type definitions, and the primitive
//! data-type tree used for value checking. [`bootstrap`] seeds exactly that
//! into a fresh store, writing both directions of every reference directly
//! (the same shortcut the full namespace-zero generation takes).

use crate::nodeid::NodeId;

// ---------------------------------------------------------------------------
// Well-known numeric ids (namespace 0)
// ---------------------------------------------------------------------------

// Data types.
pub const BASE_DATA_TYPE: NodeId = NodeId::numeric(0, 24);
pub const BOOLEAN: NodeId = NodeId::numeric(0, 1);
pub const SBYTE: NodeId = NodeId::numeric(0, 2);
pub const BYTE: NodeId = NodeId::numeric(0, 3);
pub const INT16: NodeId = NodeId::numeric(0, 4);
pub const UINT16: NodeId = NodeId::numeric(0, 5);
pub const INT32: NodeId = NodeId::numeric(0, 6);
pub const UINT32: NodeId = NodeId::numeric(0, 7);
pub const INT64: NodeId = NodeId::numeric(0, 8);
pub const UINT64: NodeId = NodeId::numeric(0, 9);
pub const FLOAT: NodeId = NodeId::numeric(0, 10);
pub const DOUBLE: NodeId = NodeId::numeric(0, 11);
pub const STRING: NodeId = NodeId::numeric(0, 12);
pub const DATE_TIME: NodeId = NodeId::numeric(0, 13);
pub const GUID: NodeId = NodeId::numeric(0, 14);
pub const BYTE_STRING: NodeId = NodeId::numeric(0, 15);
pub const NODE_ID_TYPE: NodeId = NodeId::numeric(0, 17);
pub const QUALIFIED_NAME_TYPE: NodeId = NodeId::numeric(0, 20);
pub const LOCALIZED_TEXT_TYPE: NodeId = NodeId::numeric(0, 21);
pub const STRUCTURE: NodeId = NodeId::numeric(0, 22);
pub const NUMBER: NodeId = NodeId::numeric(0, 26);
pub const INTEGER: NodeId = NodeId::numeric(0, 27);
pub const UINTEGER: NodeId = NodeId::numeric(0, 28);
pub const ARGUMENT: NodeId = NodeId::numeric(0, 296);

// Reference types.
pub const REFERENCES: NodeId = NodeId::numeric(0, 31);
pub const NON_HIERARCHICAL_REFERENCES: NodeId = NodeId::numeric(0, 32);
pub const HIERARCHICAL_REFERENCES: NodeId = NodeId::numeric(0, 33);
pub const HAS_CHILD: NodeId = NodeId::numeric(0, 34);
pub const ORGANIZES: NodeId = NodeId::numeric(0, 35);
pub const AGGREGATES: NodeId = NodeId::numeric(0, 44);
pub const HAS_SUBTYPE: NodeId = NodeId::numeric(0, 45);
pub const HAS_PROPERTY: NodeId = NodeId::numeric(0, 46);
pub const HAS_COMPONENT: NodeId = NodeId::numeric(0, 47);
pub const HAS_TYPE_DEFINITION: NodeId = NodeId::numeric(0, 40);

// Object types.
pub const BASE_OBJECT_TYPE: NodeId = NodeId::numeric(0, 58);
pub const FOLDER_TYPE: NodeId = NodeId::numeric(0, 61);

// Variable types.
pub const BASE_VARIABLE_TYPE: NodeId = NodeId::numeric(0, 62);
pub const BASE_DATA_VARIABLE_TYPE: NodeId = NodeId::numeric(0, 63);
pub const PROPERTY_TYPE: NodeId = NodeId::numeric(0, 68);

// Standard objects.
pub const ROOT_FOLDER: NodeId = NodeId::numeric(0, 84);
pub const OBJECTS_FOLDER: NodeId = NodeId::numeric(0, 85);
pub const TYPES_FOLDER: NodeId = NodeId::numeric(0, 86);

// ---------------------------------------------------------------------------
// Minimal base model
// ---------------------------------------------------------------------------

use crate::error::StoreResult;
use crate::node::{
    DataTypeNode, Node, NodeHead, ObjectNode, ObjectTypeNode, ReferenceEntry, ReferenceTypeNode,
    VariableTypeNode, VALUE_RANK_ANY,
};
use crate::nodeid::{ExpandedNodeId, LocalizedText, QualifiedName};
use crate::store::NodeStore;

fn head(id: NodeId, name: &str) -> NodeHead {
    NodeHead {
        node_id: id,
        browse_name: QualifiedName::new(0, name),
        display_name: LocalizedText::en(name),
        ..Default::default()
    }
}

/// Write both directions of a reference straight into the store.
fn link(store: &mut dyn NodeStore, source: &NodeId, reference_type: &NodeId, target: &NodeId) {
    if let Some(node) = store.get_mut(source) {
        node.head_mut().references.push(ReferenceEntry {
            reference_type_id: reference_type.clone(),
            target_id: ExpandedNodeId::local(target.clone()),
            is_inverse: false,
        });
    }
    if let Some(node) = store.get_mut(target) {
        node.head_mut().references.push(ReferenceEntry {
            reference_type_id: reference_type.clone(),
            target_id: ExpandedNodeId::local(source.clone()),
            is_inverse: true,
        });
    }
}

fn reference_type(
    store: &mut dyn NodeStore,
    id: NodeId,
    name: &str,
    inverse_name: &str,
    is_abstract: bool,
    symmetric: bool,
    supertype: Option<&NodeId>,
) -> StoreResult<()> {
    store.insert(Node::ReferenceType(ReferenceTypeNode {
        head: head(id.clone(), name),
        is_abstract,
        symmetric,
        inverse_name: LocalizedText::en(inverse_name),
    }))?;
    if let Some(supertype) = supertype {
        link(store, supertype, &HAS_SUBTYPE, &id);
    }
    Ok(())
}

fn data_type(
    store: &mut dyn NodeStore,
    id: NodeId,
    name: &str,
    is_abstract: bool,
    supertype: Option<&NodeId>,
) -> StoreResult<()> {
    store.insert(Node::DataType(DataTypeNode {
        head: head(id.clone(), name),
        is_abstract,
    }))?;
    if let Some(supertype) = supertype {
        link(store, supertype, &HAS_SUBTYPE, &id);
    }
    Ok(())
}

fn object_type(
    store: &mut dyn NodeStore,
    id: NodeId,
    name: &str,
    is_abstract: bool,
    supertype: Option<&NodeId>,
) -> StoreResult<()> {
    store.insert(Node::ObjectType(ObjectTypeNode {
        head: head(id.clone(), name),
        is_abstract,
        lifecycle: Default::default(),
    }))?;
    if let Some(supertype) = supertype {
        link(store, supertype, &HAS_SUBTYPE, &id);
    }
    Ok(())
}

fn variable_type(
    store: &mut dyn NodeStore,
    id: NodeId,
    name: &str,
    is_abstract: bool,
    supertype: Option<&NodeId>,
) -> StoreResult<()> {
    let mut node = VariableTypeNode {
        head: head(id.clone(), name),
        is_abstract,
        common: Default::default(),
    };
    node.common.data_type = BASE_DATA_TYPE;
    node.common.value_rank = VALUE_RANK_ANY;
    store.insert(Node::VariableType(node))?;
    if let Some(supertype) = supertype {
        link(store, supertype, &HAS_SUBTYPE, &id);
    }
    Ok(())
}

fn folder(
    store: &mut dyn NodeStore,
    id: NodeId,
    name: &str,
    organizer: Option<&NodeId>,
) -> StoreResult<()> {
    store.insert(Node::Object(ObjectNode {
        head: head(id.clone(), name),
        event_notifier: 0,
        instance_handle: None,
    }))?;
    link(store, &id, &HAS_TYPE_DEFINITION, &FOLDER_TYPE);
    if let Some(organizer) = organizer {
        link(store, organizer, &ORGANIZES, &id);
    }
    Ok(())
}

/// Seed the minimal base model the mutation core depends on.
///
/// Both directions of every reference are written directly, bypassing the
/// consistency checks — the same shortcut the full namespace-zero
/// generation takes, acceptable because the seeded graph is fixed and known
/// to be well-formed.
pub fn bootstrap(store: &mut dyn NodeStore) -> StoreResult<()> {
    // Reference-type tree.
    reference_type(store, REFERENCES, "References", "References", true, true, None)?;
    reference_type(
        store,
        HIERARCHICAL_REFERENCES,
        "HierarchicalReferences",
        "InverseHierarchicalReferences",
        true,
        false,
        Some(&REFERENCES),
    )?;
    reference_type(
        store,
        NON_HIERARCHICAL_REFERENCES,
        "NonHierarchicalReferences",
        "InverseNonHierarchicalReferences",
        true,
        false,
        Some(&REFERENCES),
    )?;
    reference_type(
        store,
        HAS_CHILD,
        "HasChild",
        "ChildOf",
        true,
        false,
        Some(&HIERARCHICAL_REFERENCES),
    )?;
    reference_type(
        store,
        ORGANIZES,
        "Organizes",
        "OrganizedBy",
        false,
        false,
        Some(&HIERARCHICAL_REFERENCES),
    )?;
    reference_type(
        store,
        AGGREGATES,
        "Aggregates",
        "AggregatedBy",
        true,
        false,
        Some(&HAS_CHILD),
    )?;
    reference_type(
        store,
        HAS_COMPONENT,
        "HasComponent",
        "ComponentOf",
        false,
        false,
        Some(&AGGREGATES),
    )?;
    reference_type(
        store,
        HAS_PROPERTY,
        "HasProperty",
        "PropertyOf",
        false,
        false,
        Some(&AGGREGATES),
    )?;
    reference_type(
        store,
        HAS_SUBTYPE,
        "HasSubtype",
        "HasSupertype",
        false,
        false,
        Some(&HAS_CHILD),
    )?;
    reference_type(
        store,
        HAS_TYPE_DEFINITION,
        "HasTypeDefinition",
        "TypeDefinitionOf",
        false,
        false,
        Some(&NON_HIERARCHICAL_REFERENCES),
    )?;

    // Data-type tree.
    data_type(store, BASE_DATA_TYPE, "BaseDataType", true, None)?;
    data_type(store, BOOLEAN, "Boolean", false, Some(&BASE_DATA_TYPE))?;
    data_type(store, NUMBER, "Number", true, Some(&BASE_DATA_TYPE))?;
    data_type(store, INTEGER, "Integer", true, Some(&NUMBER))?;
    data_type(store, UINTEGER, "UInteger", true, Some(&INTEGER))?;
    data_type(store, SBYTE, "SByte", false, Some(&INTEGER))?;
    data_type(store, INT16, "Int16", false, Some(&INTEGER))?;
    data_type(store, INT32, "Int32", false, Some(&INTEGER))?;
    data_type(store, INT64, "Int64", false, Some(&INTEGER))?;
    data_type(store, BYTE, "Byte", false, Some(&UINTEGER))?;
    data_type(store, UINT16, "UInt16", false, Some(&UINTEGER))?;
    data_type(store, UINT32, "UInt32", false, Some(&UINTEGER))?;
    data_type(store, UINT64, "UInt64", false, Some(&UINTEGER))?;
    data_type(store, FLOAT, "Float", false, Some(&NUMBER))?;
    data_type(store, DOUBLE, "Double", false, Some(&NUMBER))?;
    data_type(store, STRING, "String", false, Some(&BASE_DATA_TYPE))?;
    data_type(store, DATE_TIME, "DateTime", false, Some(&BASE_DATA_TYPE))?;
    data_type(store, GUID, "Guid", false, Some(&BASE_DATA_TYPE))?;
    data_type(store, BYTE_STRING, "ByteString", false, Some(&BASE_DATA_TYPE))?;
    data_type(store, NODE_ID_TYPE, "NodeId", false, Some(&BASE_DATA_TYPE))?;
    data_type(
        store,
        QUALIFIED_NAME_TYPE,
        "QualifiedName",
        false,
        Some(&BASE_DATA_TYPE),
    )?;
    data_type(
        store,
        LOCALIZED_TEXT_TYPE,
        "LocalizedText",
        false,
        Some(&BASE_DATA_TYPE),
    )?;
    data_type(store, STRUCTURE, "Structure", true, Some(&BASE_DATA_TYPE))?;
    data_type(store, ARGUMENT, "Argument", false, Some(&STRUCTURE))?;

    // Object types.
    object_type(store, BASE_OBJECT_TYPE, "BaseObjectType", false, None)?;
    object_type(store, FOLDER_TYPE, "FolderType", false, Some(&BASE_OBJECT_TYPE))?;

    // Variable types.
    variable_type(store, BASE_VARIABLE_TYPE, "BaseVariableType", true, None)?;
    variable_type(
        store,
        BASE_DATA_VARIABLE_TYPE,
        "BaseDataVariableType",
        false,
        Some(&BASE_VARIABLE_TYPE),
    )?;
    variable_type(store, PROPERTY_TYPE, "PropertyType", false, Some(&BASE_VARIABLE_TYPE))?;

    // Standard folders.
    folder(store, ROOT_FOLDER, "Root", None)?;
    folder(store, OBJECTS_FOLDER, "Objects", Some(&ROOT_FOLDER))?;
    folder(store, TYPES_FOLDER, "Types", Some(&ROOT_FOLDER))?;

    Ok(())
}
