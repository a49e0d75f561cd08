//! Node classes, the tagged node type, and its reference entries.
//!
//! Every node shares a common header ([`NodeHead`]) carrying identity,
//! naming, and the bidirectional reference list. The class-specific
//! attribute blocks hang off the [`Node`] sum type, tagged by [`NodeClass`];
//! dispatch on the tag replaces the pointer casts of C-style node stores.
//!
//! User extension points (value callbacks, data sources, object lifecycle,
//! method callbacks) are trait objects and `Arc` closures. They run
//! synchronously under the address-space writer section and must not call
//! back into the public mutation API.

use std::any::Any;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::StatusCode;
use crate::nodeid::{ExpandedNodeId, LocalizedText, NodeId, QualifiedName};
use crate::value::{DataValue, Variant};

// ---------------------------------------------------------------------------
// Node class
// ---------------------------------------------------------------------------

/// The eight node classes of the information model.
///
/// The discriminants are the wire-level bit values, so a set of classes can
/// be expressed as a `u32` mask (see [`NodeClass::bit`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum NodeClass {
    Object = 1,
    Variable = 2,
    Method = 4,
    ObjectType = 8,
    VariableType = 16,
    ReferenceType = 32,
    DataType = 64,
    View = 128,
}

impl NodeClass {
    /// The bit value of this class inside a node-class mask.
    pub fn bit(self) -> u32 {
        self as u32
    }

    /// Whether this is one of the four type classes.
    pub fn is_type(self) -> bool {
        matches!(
            self,
            NodeClass::ObjectType
                | NodeClass::VariableType
                | NodeClass::ReferenceType
                | NodeClass::DataType
        )
    }
}

impl std::fmt::Display for NodeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NodeClass::Object => "Object",
            NodeClass::Variable => "Variable",
            NodeClass::Method => "Method",
            NodeClass::ObjectType => "ObjectType",
            NodeClass::VariableType => "VariableType",
            NodeClass::ReferenceType => "ReferenceType",
            NodeClass::DataType => "DataType",
            NodeClass::View => "View",
        };
        write!(f, "{name}")
    }
}

/// Mask matching every node class.
pub const NODE_CLASS_MASK_ALL: u32 = 0xFF;

// ---------------------------------------------------------------------------
// Value ranks
// ---------------------------------------------------------------------------

/// The value may have any shape.
pub const VALUE_RANK_ANY: i32 = -3;
/// The value is a scalar or an array; the shape is not fixed.
pub const VALUE_RANK_SCALAR_OR_ARRAY: i32 = -2;
/// The value is a scalar.
pub const VALUE_RANK_SCALAR: i32 = -1;
/// The value is an array with one or more dimensions.
pub const VALUE_RANK_ONE_OR_MORE_DIMENSIONS: i32 = 0;

// ---------------------------------------------------------------------------
// References
// ---------------------------------------------------------------------------

/// One direction of a reference, stored on the source node.
///
/// Every committed reference exists twice: once on the source with
/// `is_inverse = false` and once on the target with `is_inverse = true`
/// (unless the target lives on a foreign server). No two entries on one node
/// may share (type, target, direction). Entry order is unspecified; deletion
/// uses swap-remove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub reference_type_id: NodeId,
    pub target_id: ExpandedNodeId,
    pub is_inverse: bool,
}

// ---------------------------------------------------------------------------
// User callbacks
// ---------------------------------------------------------------------------

/// Opaque per-instance state produced by an ObjectType constructor.
pub type InstanceHandle = Arc<dyn Any + Send + Sync>;

/// Constructor invoked when an Object of the owning type is instantiated.
/// Runs after the type-mandated children exist.
pub type Constructor = Arc<dyn Fn(&NodeId) -> Option<InstanceHandle> + Send + Sync>;

/// Destructor invoked when an instance of the owning type is deleted.
pub type Destructor = Arc<dyn Fn(&NodeId, Option<InstanceHandle>) + Send + Sync>;

/// Constructor/destructor pair registered on an ObjectType.
#[derive(Clone, Default)]
pub struct ObjectLifecycle {
    pub constructor: Option<Constructor>,
    pub destructor: Option<Destructor>,
}

impl std::fmt::Debug for ObjectLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectLifecycle")
            .field("constructor", &self.constructor.is_some())
            .field("destructor", &self.destructor.is_some())
            .finish()
    }
}

/// Notification hooks around reads and writes of an inline variable value.
#[derive(Clone, Default)]
pub struct ValueCallback {
    /// Called before the stored value is read.
    pub on_read: Option<Arc<dyn Fn(&NodeId, &DataValue) + Send + Sync>>,
    /// Called after a new value has been written.
    pub on_write: Option<Arc<dyn Fn(&NodeId, &DataValue) + Send + Sync>>,
}

impl std::fmt::Debug for ValueCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueCallback")
            .field("on_read", &self.on_read.is_some())
            .field("on_write", &self.on_write.is_some())
            .finish()
    }
}

/// External value storage: a read/write pair replacing the inline value.
pub trait DataSource: Send + Sync {
    /// Produce the current value.
    fn read(&self, node_id: &NodeId) -> Result<DataValue, StatusCode>;

    /// Accept a new value.
    fn write(&self, node_id: &NodeId, value: &Variant) -> Result<(), StatusCode>;
}

/// Handler invoked when a Method node is called.
pub type MethodCallback =
    Arc<dyn Fn(&NodeId, &[Variant]) -> Result<Vec<Variant>, StatusCode> + Send + Sync>;

// ---------------------------------------------------------------------------
// Common header
// ---------------------------------------------------------------------------

/// Attributes shared by every node class.
#[derive(Debug, Clone, Default)]
pub struct NodeHead {
    pub node_id: NodeId,
    pub browse_name: QualifiedName,
    pub display_name: LocalizedText,
    pub description: LocalizedText,
    pub write_mask: u32,
    pub user_write_mask: u32,
    pub references: Vec<ReferenceEntry>,
}

// ---------------------------------------------------------------------------
// Class-specific bodies
// ---------------------------------------------------------------------------

/// Where a variable's value lives.
#[derive(Clone)]
pub enum ValueStorage {
    /// Inline value with optional read/write notification hooks.
    Data {
        value: DataValue,
        callback: Option<ValueCallback>,
    },
    /// Value served by user callbacks.
    Source(Arc<dyn DataSource>),
}

impl ValueStorage {
    pub fn is_inline(&self) -> bool {
        matches!(self, ValueStorage::Data { .. })
    }
}

impl Default for ValueStorage {
    fn default() -> Self {
        ValueStorage::Data {
            value: DataValue::default(),
            callback: None,
        }
    }
}

impl std::fmt::Debug for ValueStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueStorage::Data { value, callback } => f
                .debug_struct("Data")
                .field("value", value)
                .field("callback", &callback.is_some())
                .finish(),
            ValueStorage::Source(_) => f.write_str("Source"),
        }
    }
}

/// The attributes Variables and VariableTypes share.
#[derive(Debug, Clone, Default)]
pub struct VariableCommon {
    pub data_type: NodeId,
    pub value_rank: i32,
    pub array_dimensions: Vec<u32>,
    pub value: ValueStorage,
}

#[derive(Debug, Clone, Default)]
pub struct ObjectNode {
    pub head: NodeHead,
    pub event_notifier: u8,
    /// Opaque state attached by the type's constructor.
    pub instance_handle: Option<InstanceHandle>,
}

#[derive(Debug, Clone, Default)]
pub struct VariableNode {
    pub head: NodeHead,
    pub common: VariableCommon,
    pub access_level: u8,
    pub user_access_level: u8,
    pub minimum_sampling_interval: f64,
    pub historizing: bool,
}

#[derive(Debug, Clone, Default)]
pub struct VariableTypeNode {
    pub head: NodeHead,
    pub common: VariableCommon,
    pub is_abstract: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ObjectTypeNode {
    pub head: NodeHead,
    pub is_abstract: bool,
    pub lifecycle: ObjectLifecycle,
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceTypeNode {
    pub head: NodeHead,
    pub is_abstract: bool,
    pub symmetric: bool,
    pub inverse_name: LocalizedText,
}

#[derive(Debug, Clone, Default)]
pub struct DataTypeNode {
    pub head: NodeHead,
    pub is_abstract: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ViewNode {
    pub head: NodeHead,
    pub contains_no_loops: bool,
    pub event_notifier: u8,
}

#[derive(Clone, Default)]
pub struct MethodNode {
    pub head: NodeHead,
    pub executable: bool,
    pub callback: Option<MethodCallback>,
}

impl std::fmt::Debug for MethodNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodNode")
            .field("head", &self.head)
            .field("executable", &self.executable)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// The node sum type
// ---------------------------------------------------------------------------

/// A node of the address space, tagged by its node class.
#[derive(Debug, Clone)]
pub enum Node {
    Object(ObjectNode),
    Variable(VariableNode),
    VariableType(VariableTypeNode),
    ObjectType(ObjectTypeNode),
    ReferenceType(ReferenceTypeNode),
    DataType(DataTypeNode),
    View(ViewNode),
    Method(MethodNode),
}

impl Node {
    /// Allocate a node of the given class with zero-initialized attributes.
    pub fn zeroed(class: NodeClass) -> Node {
        match class {
            NodeClass::Object => Node::Object(ObjectNode::default()),
            NodeClass::Variable => Node::Variable(VariableNode::default()),
            NodeClass::VariableType => Node::VariableType(VariableTypeNode::default()),
            NodeClass::ObjectType => Node::ObjectType(ObjectTypeNode::default()),
            NodeClass::ReferenceType => Node::ReferenceType(ReferenceTypeNode::default()),
            NodeClass::DataType => Node::DataType(DataTypeNode::default()),
            NodeClass::View => Node::View(ViewNode::default()),
            NodeClass::Method => Node::Method(MethodNode::default()),
        }
    }

    pub fn node_class(&self) -> NodeClass {
        match self {
            Node::Object(_) => NodeClass::Object,
            Node::Variable(_) => NodeClass::Variable,
            Node::VariableType(_) => NodeClass::VariableType,
            Node::ObjectType(_) => NodeClass::ObjectType,
            Node::ReferenceType(_) => NodeClass::ReferenceType,
            Node::DataType(_) => NodeClass::DataType,
            Node::View(_) => NodeClass::View,
            Node::Method(_) => NodeClass::Method,
        }
    }

    pub fn head(&self) -> &NodeHead {
        match self {
            Node::Object(n) => &n.head,
            Node::Variable(n) => &n.head,
            Node::VariableType(n) => &n.head,
            Node::ObjectType(n) => &n.head,
            Node::ReferenceType(n) => &n.head,
            Node::DataType(n) => &n.head,
            Node::View(n) => &n.head,
            Node::Method(n) => &n.head,
        }
    }

    pub fn head_mut(&mut self) -> &mut NodeHead {
        match self {
            Node::Object(n) => &mut n.head,
            Node::Variable(n) => &mut n.head,
            Node::VariableType(n) => &mut n.head,
            Node::ObjectType(n) => &mut n.head,
            Node::ReferenceType(n) => &mut n.head,
            Node::DataType(n) => &mut n.head,
            Node::View(n) => &mut n.head,
            Node::Method(n) => &mut n.head,
        }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.head().node_id
    }

    pub fn browse_name(&self) -> &QualifiedName {
        &self.head().browse_name
    }

    /// `isAbstract` for the four type classes, `None` for instances.
    pub fn is_abstract(&self) -> Option<bool> {
        match self {
            Node::VariableType(n) => Some(n.is_abstract),
            Node::ObjectType(n) => Some(n.is_abstract),
            Node::ReferenceType(n) => Some(n.is_abstract),
            Node::DataType(n) => Some(n.is_abstract),
            _ => None,
        }
    }

    /// The variable attribute block shared by Variables and VariableTypes.
    pub fn variable_common(&self) -> Option<&VariableCommon> {
        match self {
            Node::Variable(n) => Some(&n.common),
            Node::VariableType(n) => Some(&n.common),
            _ => None,
        }
    }

    pub fn variable_common_mut(&mut self) -> Option<&mut VariableCommon> {
        match self {
            Node::Variable(n) => Some(&mut n.common),
            Node::VariableType(n) => Some(&mut n.common),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectNode> {
        match self {
            Node::Object(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut ObjectNode> {
        match self {
            Node::Object(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&VariableNode> {
        match self {
            Node::Variable(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_variable_mut(&mut self) -> Option<&mut VariableNode> {
        match self {
            Node::Variable(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_variable_type(&self) -> Option<&VariableTypeNode> {
        match self {
            Node::VariableType(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_object_type(&self) -> Option<&ObjectTypeNode> {
        match self {
            Node::ObjectType(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_object_type_mut(&mut self) -> Option<&mut ObjectTypeNode> {
        match self {
            Node::ObjectType(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_reference_type(&self) -> Option<&ReferenceTypeNode> {
        match self {
            Node::ReferenceType(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_method_mut(&mut self) -> Option<&mut MethodNode> {
        match self {
            Node::Method(n) => Some(n),
            _ => None,
        }
    }
}
