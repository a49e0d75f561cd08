//! The variable value model: scalars, variants, and data values.
//!
//! A [`Variant`] is what a Variable holds: empty, a single [`Scalar`], or an
//! array of scalars with optional dimensions. The type checker relies on the
//! queries here (value data type, scalar-ness) and on [`Variant::null_for`]
//! to synthesize an initial value for a concrete data type.

use serde::{Deserialize, Serialize};

use crate::error::StatusCode;
use crate::nodeid::{LocalizedText, NodeId, QualifiedName};
use crate::ns0;

/// A method argument description, stored in the `InputArguments` /
/// `OutputArguments` properties of a Method node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    pub data_type: NodeId,
    pub value_rank: i32,
    pub array_dimensions: Vec<u32>,
    pub description: LocalizedText,
}

/// A single value of one of the built-in types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Boolean(bool),
    SByte(i8),
    Byte(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(String),
    /// Hundred-nanosecond intervals since 1601-01-01 (UTC).
    DateTime(i64),
    Guid([u8; 16]),
    ByteString(Vec<u8>),
    NodeId(NodeId),
    QualifiedName(QualifiedName),
    LocalizedText(LocalizedText),
    Argument(Argument),
}

impl Scalar {
    /// The namespace-zero data type node describing this scalar.
    pub fn data_type_id(&self) -> NodeId {
        match self {
            Scalar::Boolean(_) => ns0::BOOLEAN,
            Scalar::SByte(_) => ns0::SBYTE,
            Scalar::Byte(_) => ns0::BYTE,
            Scalar::Int16(_) => ns0::INT16,
            Scalar::UInt16(_) => ns0::UINT16,
            Scalar::Int32(_) => ns0::INT32,
            Scalar::UInt32(_) => ns0::UINT32,
            Scalar::Int64(_) => ns0::INT64,
            Scalar::UInt64(_) => ns0::UINT64,
            Scalar::Float(_) => ns0::FLOAT,
            Scalar::Double(_) => ns0::DOUBLE,
            Scalar::String(_) => ns0::STRING,
            Scalar::DateTime(_) => ns0::DATE_TIME,
            Scalar::Guid(_) => ns0::GUID,
            Scalar::ByteString(_) => ns0::BYTE_STRING,
            Scalar::NodeId(_) => ns0::NODE_ID_TYPE,
            Scalar::QualifiedName(_) => ns0::QUALIFIED_NAME_TYPE,
            Scalar::LocalizedText(_) => ns0::LOCALIZED_TEXT_TYPE,
            Scalar::Argument(_) => ns0::ARGUMENT,
        }
    }

    /// A zero-initialized scalar of the given concrete data type, or `None`
    /// when the data type does not name a built-in type.
    pub fn zeroed(data_type: &NodeId) -> Option<Scalar> {
        let dt = data_type;
        let scalar = if *dt == ns0::BOOLEAN {
            Scalar::Boolean(false)
        } else if *dt == ns0::SBYTE {
            Scalar::SByte(0)
        } else if *dt == ns0::BYTE {
            Scalar::Byte(0)
        } else if *dt == ns0::INT16 {
            Scalar::Int16(0)
        } else if *dt == ns0::UINT16 {
            Scalar::UInt16(0)
        } else if *dt == ns0::INT32 {
            Scalar::Int32(0)
        } else if *dt == ns0::UINT32 {
            Scalar::UInt32(0)
        } else if *dt == ns0::INT64 {
            Scalar::Int64(0)
        } else if *dt == ns0::UINT64 {
            Scalar::UInt64(0)
        } else if *dt == ns0::FLOAT {
            Scalar::Float(0.0)
        } else if *dt == ns0::DOUBLE {
            Scalar::Double(0.0)
        } else if *dt == ns0::STRING {
            Scalar::String(String::new())
        } else if *dt == ns0::DATE_TIME {
            Scalar::DateTime(0)
        } else if *dt == ns0::GUID {
            Scalar::Guid([0; 16])
        } else if *dt == ns0::BYTE_STRING {
            Scalar::ByteString(Vec::new())
        } else if *dt == ns0::NODE_ID_TYPE {
            Scalar::NodeId(NodeId::NULL)
        } else if *dt == ns0::QUALIFIED_NAME_TYPE {
            Scalar::QualifiedName(QualifiedName::default())
        } else if *dt == ns0::LOCALIZED_TEXT_TYPE {
            Scalar::LocalizedText(LocalizedText::default())
        } else if *dt == ns0::ARGUMENT {
            Scalar::Argument(Argument::default())
        } else {
            return None;
        };
        Some(scalar)
    }

    /// Convert to the given built-in data type without loss, or `None` when
    /// the conversion would truncate or the types are unrelated.
    pub fn convert_to(&self, data_type: &NodeId) -> Option<Scalar> {
        if self.data_type_id() == *data_type {
            return Some(self.clone());
        }
        // Integer widening and integer-to-float promotion only.
        let signed: Option<i64> = match *self {
            Scalar::SByte(v) => Some(v.into()),
            Scalar::Int16(v) => Some(v.into()),
            Scalar::Int32(v) => Some(v.into()),
            Scalar::Int64(v) => Some(v),
            _ => None,
        };
        let unsigned: Option<u64> = match *self {
            Scalar::Byte(v) => Some(v.into()),
            Scalar::UInt16(v) => Some(v.into()),
            Scalar::UInt32(v) => Some(v.into()),
            Scalar::UInt64(v) => Some(v),
            _ => None,
        };
        if *data_type == ns0::INT16 {
            let v = signed.or_else(|| unsigned.map(|u| u as i64))?;
            i16::try_from(v).ok().map(Scalar::Int16)
        } else if *data_type == ns0::INT32 {
            let v = signed.or_else(|| unsigned.map(|u| u as i64))?;
            i32::try_from(v).ok().map(Scalar::Int32)
        } else if *data_type == ns0::INT64 {
            match (signed, unsigned) {
                (Some(v), _) => Some(Scalar::Int64(v)),
                (_, Some(u)) => i64::try_from(u).ok().map(Scalar::Int64),
                _ => None,
            }
        } else if *data_type == ns0::UINT16 {
            let u = unsigned.or_else(|| signed.and_then(|v| u64::try_from(v).ok()))?;
            u16::try_from(u).ok().map(Scalar::UInt16)
        } else if *data_type == ns0::UINT32 {
            let u = unsigned.or_else(|| signed.and_then(|v| u64::try_from(v).ok()))?;
            u32::try_from(u).ok().map(Scalar::UInt32)
        } else if *data_type == ns0::UINT64 {
            match (unsigned, signed) {
                (Some(u), _) => Some(Scalar::UInt64(u)),
                (_, Some(v)) => u64::try_from(v).ok().map(Scalar::UInt64),
                _ => None,
            }
        } else if *data_type == ns0::DOUBLE {
            match *self {
                Scalar::Float(v) => Some(Scalar::Double(v.into())),
                _ => None,
            }
        } else {
            None
        }
    }
}

/// The value held by a Variable or VariableType node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Variant {
    /// No value set.
    #[default]
    Empty,
    /// A single scalar.
    Scalar(Scalar),
    /// An array of scalars of one element type.
    ///
    /// `dimensions` may be empty for a one-dimensional array of unspecified
    /// length; when present, the element count must equal the product.
    Array {
        element_type: NodeId,
        elements: Vec<Scalar>,
        dimensions: Vec<u32>,
    },
}

impl Variant {
    /// An empty one-dimensional array of the given element type.
    pub fn empty_array(element_type: NodeId) -> Self {
        Variant::Array {
            element_type,
            elements: Vec::new(),
            dimensions: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Variant::Empty)
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Variant::Scalar(_))
    }

    /// The data type node of the value, `None` when empty.
    pub fn data_type_id(&self) -> Option<NodeId> {
        match self {
            Variant::Empty => None,
            Variant::Scalar(s) => Some(s.data_type_id()),
            Variant::Array { element_type, .. } => Some(element_type.clone()),
        }
    }

    /// Synthesize the "null" value for a concrete data type: an empty array
    /// when `value_rank` is 1, a zero-initialized scalar otherwise.
    ///
    /// Returns `None` when the data type is not a built-in type.
    pub fn null_for(data_type: &NodeId, value_rank: i32) -> Option<Variant> {
        if value_rank == 1 {
            return Some(Variant::empty_array(data_type.clone()));
        }
        Scalar::zeroed(data_type).map(Variant::Scalar)
    }
}

/// A variant plus quality and timing metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataValue {
    pub value: Variant,
    pub status: StatusCode,
    /// Source timestamp in hundred-nanosecond intervals since 1601-01-01,
    /// when the source supplies one.
    pub source_timestamp: Option<i64>,
}

impl DataValue {
    /// Wrap a variant with Good status and no timestamp.
    pub fn new(value: Variant) -> Self {
        Self {
            value,
            status: StatusCode::GOOD,
            source_timestamp: None,
        }
    }
}

impl From<Scalar> for Variant {
    fn from(s: Scalar) -> Self {
        Variant::Scalar(s)
    }
}
