//! Attribute blocks for AddNodes and the class-specific attribute copier.
//!
//! An [`AddNodesItem`] carries one [`NodeAttributes`] variant; the copier
//! verifies it matches the requested node class and projects it into a
//! freshly allocated node. Values are deep-cloned; the resulting variable
//! always starts with inline value storage.

use serde::{Deserialize, Serialize};

use crate::error::AttributeError;
use crate::node::{
    DataTypeNode, MethodNode, Node, NodeClass, NodeHead, ObjectNode, ObjectTypeNode,
    ReferenceTypeNode, ValueStorage, VariableCommon, VariableNode, VariableTypeNode, ViewNode,
};
use crate::nodeid::{LocalizedText, NodeId, QualifiedName};
use crate::value::{DataValue, Variant};

// ---------------------------------------------------------------------------
// Attribute blocks
// ---------------------------------------------------------------------------

/// The attributes every node class accepts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseAttributes {
    pub display_name: LocalizedText,
    pub description: LocalizedText,
    pub write_mask: u32,
    pub user_write_mask: u32,
}

impl BaseAttributes {
    pub fn with_display_name(name: impl Into<String>) -> Self {
        Self {
            display_name: LocalizedText::en(name),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectAttributes {
    pub base: BaseAttributes,
    pub event_notifier: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableAttributes {
    pub base: BaseAttributes,
    pub data_type: NodeId,
    pub value_rank: i32,
    pub array_dimensions: Vec<u32>,
    pub value: Variant,
    pub access_level: u8,
    pub user_access_level: u8,
    pub minimum_sampling_interval: f64,
    pub historizing: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableTypeAttributes {
    pub base: BaseAttributes,
    pub data_type: NodeId,
    pub value_rank: i32,
    pub array_dimensions: Vec<u32>,
    pub value: Variant,
    pub is_abstract: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectTypeAttributes {
    pub base: BaseAttributes,
    pub is_abstract: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceTypeAttributes {
    pub base: BaseAttributes,
    pub is_abstract: bool,
    pub symmetric: bool,
    pub inverse_name: LocalizedText,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataTypeAttributes {
    pub base: BaseAttributes,
    pub is_abstract: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewAttributes {
    pub base: BaseAttributes,
    pub contains_no_loops: bool,
    pub event_notifier: u8,
}

/// Attributes for the programmatic method entry point; Methods cannot be
/// created through the wire service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodAttributes {
    pub base: BaseAttributes,
    pub executable: bool,
}

/// The decoded attribute block of an [`AddNodesItem`], tagged by class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeAttributes {
    Object(ObjectAttributes),
    Variable(VariableAttributes),
    VariableType(VariableTypeAttributes),
    ObjectType(ObjectTypeAttributes),
    ReferenceType(ReferenceTypeAttributes),
    DataType(DataTypeAttributes),
    View(ViewAttributes),
    Method(MethodAttributes),
}

impl NodeAttributes {
    /// The node class this attribute block belongs to.
    pub fn node_class(&self) -> NodeClass {
        match self {
            NodeAttributes::Object(_) => NodeClass::Object,
            NodeAttributes::Variable(_) => NodeClass::Variable,
            NodeAttributes::VariableType(_) => NodeClass::VariableType,
            NodeAttributes::ObjectType(_) => NodeClass::ObjectType,
            NodeAttributes::ReferenceType(_) => NodeClass::ReferenceType,
            NodeAttributes::DataType(_) => NodeClass::DataType,
            NodeAttributes::View(_) => NodeClass::View,
            NodeAttributes::Method(_) => NodeClass::Method,
        }
    }

    /// The common attribute prefix.
    pub fn base(&self) -> &BaseAttributes {
        match self {
            NodeAttributes::Object(a) => &a.base,
            NodeAttributes::Variable(a) => &a.base,
            NodeAttributes::VariableType(a) => &a.base,
            NodeAttributes::ObjectType(a) => &a.base,
            NodeAttributes::ReferenceType(a) => &a.base,
            NodeAttributes::DataType(a) => &a.base,
            NodeAttributes::View(a) => &a.base,
            NodeAttributes::Method(a) => &a.base,
        }
    }
}

// ---------------------------------------------------------------------------
// AddNodes item
// ---------------------------------------------------------------------------

/// One node to add, as received by the AddNodes service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddNodesItem {
    /// Requested id; a numeric identifier of 0 asks the store to assign one.
    pub requested_new_node_id: NodeId,
    /// Parent to hang the node under; null for orphan Objects.
    pub parent_node_id: NodeId,
    /// Reference type of the parent edge; null together with the parent.
    pub reference_type_id: NodeId,
    pub browse_name: QualifiedName,
    pub node_class: NodeClass,
    /// Type definition; null picks the base type for Objects and Variables.
    pub type_definition: NodeId,
    pub attributes: NodeAttributes,
}

// ---------------------------------------------------------------------------
// Attribute copier
// ---------------------------------------------------------------------------

fn copy_head(item: &AddNodesItem) -> NodeHead {
    let base = item.attributes.base();
    NodeHead {
        node_id: item.requested_new_node_id.clone(),
        browse_name: item.browse_name.clone(),
        display_name: base.display_name.clone(),
        description: base.description.clone(),
        write_mask: base.write_mask,
        user_write_mask: base.user_write_mask,
        references: Vec::new(),
    }
}

fn copy_variable_common(
    data_type: &NodeId,
    value_rank: i32,
    array_dimensions: &[u32],
    value: &Variant,
) -> VariableCommon {
    VariableCommon {
        data_type: data_type.clone(),
        value_rank,
        array_dimensions: array_dimensions.to_vec(),
        value: ValueStorage::Data {
            value: DataValue::new(value.clone()),
            callback: None,
        },
    }
}

/// Project an [`AddNodesItem`] into a freshly allocated node.
///
/// Fails with [`AttributeError::NodeAttributesInvalid`] when the attribute
/// variant does not match the item's node class, and with
/// [`AttributeError::NodeClassInvalid`] for Methods (which have their own
/// entry point).
pub fn create_node_from_attributes(item: &AddNodesItem) -> Result<Node, AttributeError> {
    if item.attributes.node_class() != item.node_class {
        return Err(AttributeError::NodeAttributesInvalid {
            node_class: item.node_class,
        });
    }

    let head = copy_head(item);
    let node = match &item.attributes {
        NodeAttributes::Object(attr) => Node::Object(ObjectNode {
            head,
            event_notifier: attr.event_notifier,
            instance_handle: None,
        }),
        NodeAttributes::Variable(attr) => Node::Variable(VariableNode {
            head,
            common: copy_variable_common(
                &attr.data_type,
                attr.value_rank,
                &attr.array_dimensions,
                &attr.value,
            ),
            access_level: attr.access_level,
            user_access_level: attr.user_access_level,
            minimum_sampling_interval: attr.minimum_sampling_interval,
            historizing: attr.historizing,
        }),
        NodeAttributes::VariableType(attr) => Node::VariableType(VariableTypeNode {
            head,
            common: copy_variable_common(
                &attr.data_type,
                attr.value_rank,
                &attr.array_dimensions,
                &attr.value,
            ),
            is_abstract: attr.is_abstract,
        }),
        NodeAttributes::ObjectType(attr) => Node::ObjectType(ObjectTypeNode {
            head,
            is_abstract: attr.is_abstract,
            lifecycle: Default::default(),
        }),
        NodeAttributes::ReferenceType(attr) => Node::ReferenceType(ReferenceTypeNode {
            head,
            is_abstract: attr.is_abstract,
            symmetric: attr.symmetric,
            inverse_name: attr.inverse_name.clone(),
        }),
        NodeAttributes::DataType(attr) => Node::DataType(DataTypeNode {
            head,
            is_abstract: attr.is_abstract,
        }),
        NodeAttributes::View(attr) => Node::View(ViewNode {
            head,
            contains_no_loops: attr.contains_no_loops,
            event_notifier: attr.event_notifier,
        }),
        NodeAttributes::Method(_) => {
            return Err(AttributeError::NodeClassInvalid {
                node_class: NodeClass::Method,
            });
        }
    };
    Ok(node)
}

/// Build a method node for the programmatic entry point.
pub(crate) fn method_node_from_attributes(
    requested_new_node_id: &NodeId,
    browse_name: &QualifiedName,
    attr: &MethodAttributes,
) -> MethodNode {
    MethodNode {
        head: NodeHead {
            node_id: requested_new_node_id.clone(),
            browse_name: browse_name.clone(),
            display_name: attr.base.display_name.clone(),
            description: attr.base.description.clone(),
            write_mask: attr.base.write_mask,
            user_write_mask: attr.base.user_write_mask,
            references: Vec::new(),
        },
        executable: attr.executable,
        callback: None,
    }
}
