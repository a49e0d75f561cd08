//! Rich diagnostic error types for the address-space core.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]`
//! derives, providing error codes, help text, and source chains. Every
//! variant maps to exactly one OPC UA status code via [`StatusCode`], which
//! is what the per-item service results carry on the wire.

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::node::NodeClass;
use crate::nodeid::NodeId;

// ---------------------------------------------------------------------------
// Status codes
// ---------------------------------------------------------------------------

/// OPC UA status code: the 32-bit per-item result value.
///
/// Only the codes the mutation core can produce are named here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(pub u32);

impl StatusCode {
    pub const GOOD: StatusCode = StatusCode(0x0000_0000);
    pub const UNCERTAIN_REFERENCE_NOT_DELETED: StatusCode = StatusCode(0x40BC_0000);
    pub const BAD_INTERNAL_ERROR: StatusCode = StatusCode(0x8002_0000);
    pub const BAD_OUT_OF_MEMORY: StatusCode = StatusCode(0x8003_0000);
    pub const BAD_NOTHING_TO_DO: StatusCode = StatusCode(0x800F_0000);
    pub const BAD_NODE_ID_INVALID: StatusCode = StatusCode(0x8033_0000);
    pub const BAD_NODE_ID_UNKNOWN: StatusCode = StatusCode(0x8034_0000);
    pub const BAD_NOT_IMPLEMENTED: StatusCode = StatusCode(0x8040_0000);
    pub const BAD_REFERENCE_TYPE_ID_INVALID: StatusCode = StatusCode(0x804C_0000);
    pub const BAD_PARENT_NODE_ID_INVALID: StatusCode = StatusCode(0x805B_0000);
    pub const BAD_REFERENCE_NOT_ALLOWED: StatusCode = StatusCode(0x805C_0000);
    pub const BAD_NODE_ID_EXISTS: StatusCode = StatusCode(0x805E_0000);
    pub const BAD_NODE_CLASS_INVALID: StatusCode = StatusCode(0x805F_0000);
    pub const BAD_NODE_ATTRIBUTES_INVALID: StatusCode = StatusCode(0x8062_0000);
    pub const BAD_TYPE_DEFINITION_INVALID: StatusCode = StatusCode(0x8063_0000);
    pub const BAD_DUPLICATE_REFERENCE_NOT_ALLOWED: StatusCode = StatusCode(0x8066_0000);
    pub const BAD_TYPE_MISMATCH: StatusCode = StatusCode(0x8074_0000);
    pub const BAD_INVALID_STATE: StatusCode = StatusCode(0x80AF_0000);

    /// Whether the severity bits signal success (good or uncertain).
    pub fn is_good(self) -> bool {
        self.0 & 0x8000_0000 == 0
    }

    /// Whether the severity bits signal failure.
    pub fn is_bad(self) -> bool {
        self.0 & 0x8000_0000 != 0
    }

    /// Symbolic name of the code, or `None` for codes the core never emits.
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            StatusCode::GOOD => "Good",
            StatusCode::UNCERTAIN_REFERENCE_NOT_DELETED => "UncertainReferenceNotDeleted",
            StatusCode::BAD_INTERNAL_ERROR => "BadInternalError",
            StatusCode::BAD_OUT_OF_MEMORY => "BadOutOfMemory",
            StatusCode::BAD_NOTHING_TO_DO => "BadNothingToDo",
            StatusCode::BAD_NODE_ID_INVALID => "BadNodeIdInvalid",
            StatusCode::BAD_NODE_ID_UNKNOWN => "BadNodeIdUnknown",
            StatusCode::BAD_NOT_IMPLEMENTED => "BadNotImplemented",
            StatusCode::BAD_REFERENCE_TYPE_ID_INVALID => "BadReferenceTypeIdInvalid",
            StatusCode::BAD_PARENT_NODE_ID_INVALID => "BadParentNodeIdInvalid",
            StatusCode::BAD_REFERENCE_NOT_ALLOWED => "BadReferenceNotAllowed",
            StatusCode::BAD_NODE_ID_EXISTS => "BadNodeIdExists",
            StatusCode::BAD_NODE_CLASS_INVALID => "BadNodeClassInvalid",
            StatusCode::BAD_NODE_ATTRIBUTES_INVALID => "BadNodeAttributesInvalid",
            StatusCode::BAD_TYPE_DEFINITION_INVALID => "BadTypeDefinitionInvalid",
            StatusCode::BAD_DUPLICATE_REFERENCE_NOT_ALLOWED => "BadDuplicateReferenceNotAllowed",
            StatusCode::BAD_TYPE_MISMATCH => "BadTypeMismatch",
            StatusCode::BAD_INVALID_STATE => "BadInvalidState",
            _ => return None,
        };
        Some(name)
    }
}

impl Default for StatusCode {
    fn default() -> Self {
        StatusCode::GOOD
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "0x{:08X}", self.0),
        }
    }
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("node id {node_id} already exists in the store")]
    #[diagnostic(
        code(ua::store::node_id_exists),
        help(
            "Every node id must be unique within its namespace. Request a \
             different id, or use a numeric id of 0 to let the store assign \
             a fresh one."
        )
    )]
    NodeIdExists { node_id: NodeId },

    #[error("node id {node_id} is not in the store")]
    #[diagnostic(
        code(ua::store::node_id_unknown),
        help("The node does not exist (or was already deleted). Check the id.")
    )]
    NodeIdUnknown { node_id: NodeId },

    #[error("namespace index {namespace} is out of range (table has {count} entries)")]
    #[diagnostic(
        code(ua::store::namespace_invalid),
        help(
            "Register the namespace URI on the address space first; the \
             returned index is the one to use in node ids."
        )
    )]
    NamespaceInvalid { namespace: u16, count: usize },

    #[error("out of memory")]
    #[diagnostic(
        code(ua::store::out_of_memory),
        help("The backing container could not allocate storage for the node.")
    )]
    OutOfMemory,
}

impl StoreError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            StoreError::NodeIdExists { .. } => StatusCode::BAD_NODE_ID_EXISTS,
            StoreError::NodeIdUnknown { .. } => StatusCode::BAD_NODE_ID_UNKNOWN,
            StoreError::NamespaceInvalid { .. } => StatusCode::BAD_NODE_ID_INVALID,
            StoreError::OutOfMemory => StatusCode::BAD_OUT_OF_MEMORY,
        }
    }
}

// ---------------------------------------------------------------------------
// Attribute errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum AttributeError {
    #[error("attribute block does not match node class {node_class}")]
    #[diagnostic(
        code(ua::attributes::mismatch),
        help(
            "An AddNodesItem must carry the attribute variant matching its \
             nodeClass, e.g. VariableAttributes for NodeClass::Variable."
        )
    )]
    NodeAttributesInvalid { node_class: NodeClass },

    #[error("node class {node_class} cannot be created through AddNodes")]
    #[diagnostic(
        code(ua::attributes::node_class),
        help(
            "Methods are added through the dedicated add_method_node entry \
             point; the remaining classes must be one of the eight defined \
             by the information model."
        )
    )]
    NodeClassInvalid { node_class: NodeClass },

    #[error("variable {node_id} serves its value from a data source")]
    #[diagnostic(
        code(ua::attributes::not_inline),
        help(
            "Value callbacks attach to the inline value. Switch the variable \
             back to inline storage before registering one."
        )
    )]
    ValueNotInline { node_id: NodeId },
}

impl AttributeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AttributeError::NodeAttributesInvalid { .. } => {
                StatusCode::BAD_NODE_ATTRIBUTES_INVALID
            }
            AttributeError::NodeClassInvalid { .. } => StatusCode::BAD_NODE_CLASS_INVALID,
            AttributeError::ValueNotInline { .. } => StatusCode::BAD_INVALID_STATE,
        }
    }
}

// ---------------------------------------------------------------------------
// Type-check errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum TypeCheckError {
    #[error("type definition {type_id} is missing, abstract, or has the wrong node class")]
    #[diagnostic(
        code(ua::typecheck::type_definition),
        help(
            "Objects need a non-abstract ObjectType and Variables a \
             non-abstract VariableType as their type definition."
        )
    )]
    TypeDefinitionInvalid { type_id: NodeId },

    #[error("data type {data_type} is not a subtype of the template's {template_data_type}")]
    #[diagnostic(
        code(ua::typecheck::data_type),
        help(
            "The variable's dataType must be in the HasSubtype tree below \
             the variable type's dataType."
        )
    )]
    DataTypeMismatch {
        data_type: NodeId,
        template_data_type: NodeId,
    },

    #[error("value rank {value_rank} does not admit {dimensions} array dimension(s)")]
    #[diagnostic(
        code(ua::typecheck::rank_dimensions),
        help(
            "Scalar ranks take no array dimensions; a fixed positive rank n \
             requires exactly n dimensions."
        )
    )]
    RankDimensionsMismatch { value_rank: i32, dimensions: usize },

    #[error("value rank {value_rank} is not admitted by the template's rank {template_rank}")]
    #[diagnostic(
        code(ua::typecheck::rank),
        help(
            "The variable's valueRank must be equal to or more restrictive \
             than the variable type's."
        )
    )]
    RankMismatch { value_rank: i32, template_rank: i32 },

    #[error("array dimensions are incompatible with the template's")]
    #[diagnostic(
        code(ua::typecheck::dimensions),
        help(
            "Dimension lists must have the same length, and every entry must \
             match the template's unless the template entry is 0 \
             (unconstrained)."
        )
    )]
    DimensionsMismatch,

    #[error("stored value cannot be represented as data type {data_type}")]
    #[diagnostic(
        code(ua::typecheck::value),
        help(
            "The value's type must equal the declared dataType, be one of \
             its subtypes, or convert to it without loss."
        )
    )]
    ValueMismatch { data_type: NodeId },

    #[error("value access through the variable's storage failed with {status}")]
    #[diagnostic(
        code(ua::typecheck::value_access),
        help("The data source or write path returned a failure status.")
    )]
    ValueAccess { status: StatusCode },
}

impl TypeCheckError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            TypeCheckError::TypeDefinitionInvalid { .. } => {
                StatusCode::BAD_TYPE_DEFINITION_INVALID
            }
            TypeCheckError::ValueAccess { status } => *status,
            _ => StatusCode::BAD_TYPE_MISMATCH,
        }
    }
}

// ---------------------------------------------------------------------------
// Reference errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ReferenceError {
    #[error("parent node {parent_id} is missing or has the wrong node class")]
    #[diagnostic(
        code(ua::reference::parent),
        help(
            "The parent must exist, and for a type node it must have the \
             same node class as the node being added."
        )
    )]
    ParentInvalid { parent_id: NodeId },

    #[error("reference type {reference_type_id} is unknown, not a ReferenceType, or not hierarchical")]
    #[diagnostic(
        code(ua::reference::type_id),
        help(
            "Parent references for instances must use a subtype of \
             HierarchicalReferences; check that the id names a ReferenceType \
             node."
        )
    )]
    TypeIdInvalid { reference_type_id: NodeId },

    #[error("reference type {reference_type_id} is not allowed here")]
    #[diagnostic(
        code(ua::reference::not_allowed),
        help(
            "Abstract reference types cannot be instantiated, and type nodes \
             accept only HasSubtype as their parent reference."
        )
    )]
    NotAllowed { reference_type_id: NodeId },

    #[error("duplicate reference ({reference_type_id} -> {target_id}) on {source_id}")]
    #[diagnostic(
        code(ua::reference::duplicate),
        help(
            "A node may hold at most one reference entry per (type, target, \
             direction) triple. The existing entry already expresses this \
             relation."
        )
    )]
    Duplicate {
        source_id: NodeId,
        reference_type_id: NodeId,
        target_id: NodeId,
    },

    #[error("no matching reference to delete on {source_id}")]
    #[diagnostic(
        code(ua::reference::not_deleted),
        help(
            "No entry with the given (type, target, direction) exists on the \
             source node. The graph is unchanged."
        )
    )]
    NotDeleted { source_id: NodeId },

    #[error("references to foreign servers are not supported")]
    #[diagnostic(
        code(ua::reference::foreign_server),
        help(
            "The target's serverUri names another server. Only server-local \
             references can be materialized."
        )
    )]
    ForeignServer,

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

impl ReferenceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ReferenceError::ParentInvalid { .. } => StatusCode::BAD_PARENT_NODE_ID_INVALID,
            ReferenceError::TypeIdInvalid { .. } => StatusCode::BAD_REFERENCE_TYPE_ID_INVALID,
            ReferenceError::NotAllowed { .. } => StatusCode::BAD_REFERENCE_NOT_ALLOWED,
            ReferenceError::Duplicate { .. } => {
                StatusCode::BAD_DUPLICATE_REFERENCE_NOT_ALLOWED
            }
            ReferenceError::NotDeleted { .. } => {
                StatusCode::UNCERTAIN_REFERENCE_NOT_DELETED
            }
            ReferenceError::ForeignServer => StatusCode::BAD_NOT_IMPLEMENTED,
            ReferenceError::Store(e) => e.status_code(),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Top-level error type for the address-space core.
///
/// Each variant wraps a subsystem-specific error, preserving the full
/// diagnostic chain (error codes, help text) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum UaError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Attribute(#[from] AttributeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    TypeCheck(#[from] TypeCheckError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Reference(#[from] ReferenceError),

    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(ua::config::invalid),
        help("Check the AddressSpaceConfig fields. {message}")
    )]
    InvalidConfig { message: String },

    #[error("internal error: {message}")]
    #[diagnostic(
        code(ua::internal),
        help(
            "The address space violated one of its own invariants (e.g. a \
             cycle in the HasSubtype tree). This is a bug; please report it."
        )
    )]
    Internal { message: String },
}

impl UaError {
    /// The OPC UA status code this error is reported as in per-item results.
    pub fn status_code(&self) -> StatusCode {
        match self {
            UaError::Store(e) => e.status_code(),
            UaError::Attribute(e) => e.status_code(),
            UaError::TypeCheck(e) => e.status_code(),
            UaError::Reference(e) => e.status_code(),
            UaError::InvalidConfig { .. } => StatusCode::BAD_INTERNAL_ERROR,
            UaError::Internal { .. } => StatusCode::BAD_INTERNAL_ERROR,
        }
    }
}

/// Convenience alias for functions returning address-space results.
pub type UaResult<T> = std::result::Result<T, UaError>;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type for reference operations.
pub type ReferenceResult<T> = std::result::Result<T, ReferenceError>;

/// Result type for type-check operations.
pub type TypeCheckResult<T> = std::result::Result<T, TypeCheckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_converts_to_ua_error() {
        let err = StoreError::NodeIdUnknown {
            node_id: NodeId::numeric(1, 42),
        };
        let ua: UaError = err.into();
        assert!(matches!(ua, UaError::Store(StoreError::NodeIdUnknown { .. })));
        assert_eq!(ua.status_code(), StatusCode::BAD_NODE_ID_UNKNOWN);
    }

    #[test]
    fn reference_error_wraps_store_error() {
        let err = StoreError::NodeIdUnknown {
            node_id: NodeId::numeric(0, 85),
        };
        let re: ReferenceError = err.into();
        assert_eq!(re.status_code(), StatusCode::BAD_NODE_ID_UNKNOWN);
    }

    #[test]
    fn every_type_mismatch_flavor_maps_to_one_code() {
        let flavors = [
            TypeCheckError::DataTypeMismatch {
                data_type: NodeId::numeric(0, 12),
                template_data_type: NodeId::numeric(0, 6),
            },
            TypeCheckError::RankDimensionsMismatch {
                value_rank: -1,
                dimensions: 2,
            },
            TypeCheckError::RankMismatch {
                value_rank: 2,
                template_rank: -1,
            },
            TypeCheckError::DimensionsMismatch,
            TypeCheckError::ValueMismatch {
                data_type: NodeId::numeric(0, 6),
            },
        ];
        for f in flavors {
            assert_eq!(f.status_code(), StatusCode::BAD_TYPE_MISMATCH);
        }
    }

    #[test]
    fn status_code_severity() {
        assert!(StatusCode::GOOD.is_good());
        assert!(StatusCode::UNCERTAIN_REFERENCE_NOT_DELETED.is_good());
        assert!(!StatusCode::UNCERTAIN_REFERENCE_NOT_DELETED.is_bad());
        assert!(StatusCode::BAD_TYPE_MISMATCH.is_bad());
    }

    #[test]
    fn status_code_display() {
        assert_eq!(StatusCode::GOOD.to_string(), "Good");
        assert_eq!(StatusCode::BAD_TYPE_MISMATCH.to_string(), "BadTypeMismatch");
        assert_eq!(StatusCode(0xDEAD_0000).to_string(), "0xDEAD0000");
    }

    #[test]
    fn error_display_messages_are_descriptive() {
        let err = StoreError::NamespaceInvalid {
            namespace: 7,
            count: 2,
        };
        let msg = format!("{err}");
        assert!(msg.contains('7'));
        assert!(msg.contains('2'));
    }
}
