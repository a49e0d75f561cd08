//! Consistency checks for new nodes: parent references and variable typing.
//!
//! [`check_parent_reference`] gates the edge that hangs a new node into the
//! hierarchy. [`type_check_node`] validates a Variable or VariableType
//! against its template: data-type subsumption, value-rank/array-dimension
//! compatibility, and coercion of the stored value to the declared data
//! type. Both run inside the add pipeline; any failure aborts the enclosing
//! add with no residual node.

use tracing::info;

use crate::error::{ReferenceError, TypeCheckError};
use crate::hierarchy::{is_node_in_tree, is_subtype_of};
use crate::node::{Node, NodeClass, VALUE_RANK_ANY, VALUE_RANK_ONE_OR_MORE_DIMENSIONS,
    VALUE_RANK_SCALAR, VALUE_RANK_SCALAR_OR_ARRAY};
use crate::nodeid::NodeId;
use crate::ns0;
use crate::server::{read_value_attribute, write_value_attribute};
use crate::store::NodeStore;
use crate::value::{Scalar, Variant};

// ---------------------------------------------------------------------------
// Parent reference validation
// ---------------------------------------------------------------------------

/// Check that the prospective parent exists, has the right node class, and
/// is referenced with an allowed reference type. Type nodes take only
/// HasSubtype edges to a parent of the same class; instances take any
/// non-abstract subtype of HierarchicalReferences.
pub fn check_parent_reference(
    store: &dyn NodeStore,
    node_class: NodeClass,
    parent_id: &NodeId,
    reference_type_id: &NodeId,
) -> Result<(), ReferenceError> {
    let Some(parent) = store.get(parent_id) else {
        info!(parent = %parent_id, "AddNodes: parent node not found");
        return Err(ReferenceError::ParentInvalid {
            parent_id: parent_id.clone(),
        });
    };

    let Some(reference_type) = store.get(reference_type_id) else {
        info!(reference_type = %reference_type_id, "AddNodes: reference type to the parent not found");
        return Err(ReferenceError::TypeIdInvalid {
            reference_type_id: reference_type_id.clone(),
        });
    };
    let Node::ReferenceType(rt) = reference_type else {
        info!(reference_type = %reference_type_id, "AddNodes: reference type to the parent invalid");
        return Err(ReferenceError::TypeIdInvalid {
            reference_type_id: reference_type_id.clone(),
        });
    };
    if rt.is_abstract {
        info!(reference_type = %reference_type_id, "AddNodes: abstract reference type to the parent not allowed");
        return Err(ReferenceError::NotAllowed {
            reference_type_id: reference_type_id.clone(),
        });
    }

    if node_class.is_type() {
        // A type node hangs under its supertype via HasSubtype.
        if *reference_type_id != ns0::HAS_SUBTYPE {
            info!(reference_type = %reference_type_id, "AddNodes: new type node needs a HasSubtype reference");
            return Err(ReferenceError::NotAllowed {
                reference_type_id: reference_type_id.clone(),
            });
        }
        if parent.node_class() != node_class {
            info!(parent = %parent_id, "AddNodes: new type node needs a parent of the same node class");
            return Err(ReferenceError::ParentInvalid {
                parent_id: parent_id.clone(),
            });
        }
        return Ok(());
    }

    if !is_node_in_tree(
        store,
        reference_type_id,
        &ns0::HIERARCHICAL_REFERENCES,
        &[ns0::HAS_SUBTYPE],
    ) {
        info!(reference_type = %reference_type_id, "AddNodes: reference to the parent is not hierarchical");
        return Err(ReferenceError::TypeIdInvalid {
            reference_type_id: reference_type_id.clone(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Rank / dimension compatibility
// ---------------------------------------------------------------------------

/// Whether a value rank admits the given number of array dimensions.
pub fn compatible_value_rank_dims(value_rank: i32, dimensions: usize) -> bool {
    match value_rank {
        VALUE_RANK_ANY => true,
        VALUE_RANK_SCALAR_OR_ARRAY | VALUE_RANK_SCALAR => dimensions == 0,
        // An empty dimension list leaves the per-dimension sizes open.
        VALUE_RANK_ONE_OR_MORE_DIMENSIONS => true,
        n if n > 0 => dimensions == n as usize,
        _ => false,
    }
}

/// Whether a node's value rank is admitted by its template's.
pub fn compatible_value_ranks(value_rank: i32, template_rank: i32) -> bool {
    match template_rank {
        VALUE_RANK_ANY => true,
        VALUE_RANK_SCALAR_OR_ARRAY => value_rank != VALUE_RANK_ANY,
        VALUE_RANK_SCALAR => value_rank == VALUE_RANK_SCALAR,
        VALUE_RANK_ONE_OR_MORE_DIMENSIONS => value_rank >= VALUE_RANK_ONE_OR_MORE_DIMENSIONS,
        n => value_rank == n,
    }
}

/// Whether a node's array dimensions are admitted by its template's. A
/// template entry of 0 leaves that dimension unconstrained; an empty
/// template list leaves the whole shape unconstrained.
pub fn compatible_array_dimensions(dimensions: &[u32], template: &[u32]) -> bool {
    if template.is_empty() {
        return true;
    }
    dimensions.len() == template.len()
        && dimensions
            .iter()
            .zip(template)
            .all(|(d, t)| *t == 0 || d == t)
}

// ---------------------------------------------------------------------------
// Variable type checking
// ---------------------------------------------------------------------------

/// Pick the template and run the variable checks. Variables check against
/// their type definition, VariableTypes against their supertype; other
/// classes pass unchanged.
pub fn type_check_node(
    store: &mut dyn NodeStore,
    node_id: &NodeId,
    node_class: NodeClass,
    parent_id: &NodeId,
    type_definition: &NodeId,
) -> Result<(), TypeCheckError> {
    let template = match node_class {
        NodeClass::Variable => type_definition,
        NodeClass::VariableType => parent_id,
        _ => return Ok(()),
    };
    type_check_variable_node(store, node_id, template)
}

/// Validate a Variable or VariableType node against its template.
fn type_check_variable_node(
    store: &mut dyn NodeStore,
    node_id: &NodeId,
    template_id: &NodeId,
) -> Result<(), TypeCheckError> {
    // Workaround for nodes created without a data type.
    let needs_default = store
        .get(node_id)
        .and_then(Node::variable_common)
        .map(|c| c.data_type.is_null())
        .unwrap_or(false);
    if needs_default {
        info!(node = %node_id, "TypeCheck: no data type defined, defaulting to BaseDataType");
        if let Some(common) = store.get_mut(node_id).and_then(Node::variable_common_mut) {
            common.data_type = ns0::BASE_DATA_TYPE;
        }
    }

    // The root variable type is checked against nothing (bootstrap).
    if *node_id == ns0::BASE_DATA_VARIABLE_TYPE {
        return Ok(());
    }

    let node_class = store
        .get(node_id)
        .map(Node::node_class)
        .unwrap_or(NodeClass::Variable);

    // Resolve the template.
    let Some(Node::VariableType(vt)) = store.get(template_id) else {
        return Err(TypeCheckError::TypeDefinitionInvalid {
            type_id: template_id.clone(),
        });
    };
    if node_class == NodeClass::Variable && vt.is_abstract {
        return Err(TypeCheckError::TypeDefinitionInvalid {
            type_id: template_id.clone(),
        });
    }
    let vt_data_type = vt.common.data_type.clone();
    let vt_value_rank = vt.common.value_rank;
    let vt_dimensions = vt.common.array_dimensions.clone();

    let data_type = store
        .get(node_id)
        .and_then(Node::variable_common)
        .map(|c| c.data_type.clone())
        .unwrap_or_default();

    // The data type must sit below the template's in the HasSubtype tree.
    if !is_subtype_of(store, &data_type, &vt_data_type) {
        return Err(TypeCheckError::DataTypeMismatch {
            data_type,
            template_data_type: vt_data_type,
        });
    }

    // The remaining checks need the current value, wherever it lives.
    let mut value = read_value_attribute(store, node_id)?.value;

    // Workaround: a concrete data type with no value gets a synthesized
    // "null" value written through the normal write path.
    let value_rank = store
        .get(node_id)
        .and_then(Node::variable_common)
        .map(|c| c.value_rank)
        .unwrap_or_default();
    if value.is_empty() {
        if let Some(null_value) = Variant::null_for(&data_type, value_rank) {
            info!(
                node = %node_id,
                "TypeCheck: empty value on a concrete data type, creating a null value"
            );
            write_value_attribute(store, node_id, &null_value)
                .map_err(|status| TypeCheckError::ValueAccess { status })?;
            value = null_value;
        }
    }

    // Reconcile the value rank with the value shape.
    let dimensions = store
        .get(node_id)
        .and_then(Node::variable_common)
        .map(|c| c.array_dimensions.clone())
        .unwrap_or_default();
    let mut value_rank = value_rank;
    let mut effective_dims = dimensions.len();
    if effective_dims == 0 {
        if value.is_scalar() && value_rank == 0 {
            info!(
                node = %node_id,
                template_rank = vt_value_rank,
                "TypeCheck: value rank does not match the scalar value, adopting the template's"
            );
            value_rank = vt_value_rank;
            if let Some(common) = store.get_mut(node_id).and_then(Node::variable_common_mut) {
                common.value_rank = value_rank;
            }
        } else if !value.is_empty() && !value.is_scalar() && value_rank == 1 {
            // An array with no explicit dimensions has one.
            effective_dims = 1;
        }
    }

    if !compatible_value_rank_dims(value_rank, effective_dims) {
        return Err(TypeCheckError::RankDimensionsMismatch {
            value_rank,
            dimensions: effective_dims,
        });
    }
    if !compatible_value_ranks(value_rank, vt_value_rank) {
        return Err(TypeCheckError::RankMismatch {
            value_rank,
            template_rank: vt_value_rank,
        });
    }
    if !compatible_array_dimensions(&dimensions, &vt_dimensions) {
        return Err(TypeCheckError::DimensionsMismatch);
    }

    // Coerce the inline value to the declared data type.
    let is_inline = store
        .get(node_id)
        .and_then(Node::variable_common)
        .map(|c| c.value.is_inline())
        .unwrap_or(false);
    if is_inline {
        type_check_value(store, node_id, &data_type, &value)?;
    }
    Ok(())
}

/// Verify the stored value against the declared data type, converting it in
/// place when a lossless conversion exists.
fn type_check_value(
    store: &mut dyn NodeStore,
    node_id: &NodeId,
    declared: &NodeId,
    value: &Variant,
) -> Result<(), TypeCheckError> {
    let Some(value_type) = value.data_type_id() else {
        return Ok(());
    };
    if value_type == *declared || is_subtype_of(store, &value_type, declared) {
        return Ok(());
    }

    let converted = convert_variant(value, declared).ok_or(TypeCheckError::ValueMismatch {
        data_type: declared.clone(),
    })?;
    write_value_attribute(store, node_id, &converted)
        .map_err(|status| TypeCheckError::ValueAccess { status })?;
    Ok(())
}

/// Lossless conversion of a whole variant to a built-in data type.
fn convert_variant(value: &Variant, declared: &NodeId) -> Option<Variant> {
    match value {
        Variant::Empty => Some(Variant::Empty),
        Variant::Scalar(s) => s.convert_to(declared).map(Variant::Scalar),
        Variant::Array {
            elements,
            dimensions,
            ..
        } => {
            let converted: Option<Vec<Scalar>> =
                elements.iter().map(|e| e.convert_to(declared)).collect();
            Some(Variant::Array {
                element_type: declared.clone(),
                elements: converted?,
                dimensions: dimensions.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_admits_dimension_count() {
        // Scalar ranks take no dimensions.
        assert!(compatible_value_rank_dims(VALUE_RANK_SCALAR, 0));
        assert!(!compatible_value_rank_dims(VALUE_RANK_SCALAR, 1));
        assert!(compatible_value_rank_dims(VALUE_RANK_SCALAR_OR_ARRAY, 0));
        assert!(!compatible_value_rank_dims(VALUE_RANK_SCALAR_OR_ARRAY, 2));
        // Any admits everything.
        assert!(compatible_value_rank_dims(VALUE_RANK_ANY, 0));
        assert!(compatible_value_rank_dims(VALUE_RANK_ANY, 3));
        // A fixed positive rank pins the count.
        assert!(compatible_value_rank_dims(2, 2));
        assert!(!compatible_value_rank_dims(2, 1));
        // One-or-more leaves the count open.
        assert!(compatible_value_rank_dims(VALUE_RANK_ONE_OR_MORE_DIMENSIONS, 0));
        assert!(compatible_value_rank_dims(VALUE_RANK_ONE_OR_MORE_DIMENSIONS, 4));
    }

    #[test]
    fn rank_subsumption() {
        // Any admits every child rank.
        assert!(compatible_value_ranks(VALUE_RANK_SCALAR, VALUE_RANK_ANY));
        assert!(compatible_value_ranks(5, VALUE_RANK_ANY));
        // Scalar-or-array admits all but "any".
        assert!(compatible_value_ranks(VALUE_RANK_SCALAR, VALUE_RANK_SCALAR_OR_ARRAY));
        assert!(compatible_value_ranks(1, VALUE_RANK_SCALAR_OR_ARRAY));
        assert!(!compatible_value_ranks(VALUE_RANK_ANY, VALUE_RANK_SCALAR_OR_ARRAY));
        // Scalar admits only scalar.
        assert!(compatible_value_ranks(VALUE_RANK_SCALAR, VALUE_RANK_SCALAR));
        assert!(!compatible_value_ranks(1, VALUE_RANK_SCALAR));
        // One-or-more admits fixed positive ranks.
        assert!(compatible_value_ranks(2, VALUE_RANK_ONE_OR_MORE_DIMENSIONS));
        assert!(!compatible_value_ranks(
            VALUE_RANK_SCALAR,
            VALUE_RANK_ONE_OR_MORE_DIMENSIONS
        ));
        // Fixed positive ranks admit only themselves.
        assert!(compatible_value_ranks(3, 3));
        assert!(!compatible_value_ranks(2, 3));
    }

    #[test]
    fn dimension_subsumption() {
        // Empty template leaves the shape open.
        assert!(compatible_array_dimensions(&[2, 3], &[]));
        // Zero entries are wildcards.
        assert!(compatible_array_dimensions(&[2, 3], &[0, 3]));
        assert!(compatible_array_dimensions(&[2, 3], &[0, 0]));
        // Fixed entries must match.
        assert!(!compatible_array_dimensions(&[2, 3], &[2, 4]));
        // Lengths must agree.
        assert!(!compatible_array_dimensions(&[2], &[2, 3]));
    }
}
