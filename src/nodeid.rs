//! Core identifier types for the address space.
//!
//! Every node is keyed by a [`NodeId`]: a namespace index plus an identifier
//! of one of four kinds (numeric, string, GUID, byte string). References may
//! point across servers via [`ExpandedNodeId`]. Child lookup during
//! instantiation goes through the namespace-qualified [`QualifiedName`].

use serde::{Deserialize, Serialize};

/// The identifier part of a [`NodeId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Identifier {
    /// Numeric identifier. The value 0 means "null" and, on insert,
    /// "assign a fresh id in this namespace".
    Numeric(u32),
    /// String identifier.
    String(String),
    /// 16-byte GUID identifier.
    Guid([u8; 16]),
    /// Opaque byte-string identifier.
    ByteString(Vec<u8>),
}

/// Unique node identifier: namespace index plus identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    /// Index into the server's namespace URI table.
    pub namespace: u16,
    /// The identifier within that namespace.
    pub identifier: Identifier,
}

impl NodeId {
    /// The null node id: namespace 0, numeric 0.
    pub const NULL: NodeId = NodeId::numeric(0, 0);

    /// Create a numeric node id.
    pub const fn numeric(namespace: u16, value: u32) -> Self {
        Self {
            namespace,
            identifier: Identifier::Numeric(value),
        }
    }

    /// Create a string node id.
    pub fn string(namespace: u16, value: impl Into<String>) -> Self {
        Self {
            namespace,
            identifier: Identifier::String(value.into()),
        }
    }

    /// A node id is null when it is numeric 0 in namespace 0.
    pub fn is_null(&self) -> bool {
        self.namespace == 0 && matches!(self.identifier, Identifier::Numeric(0))
    }

    /// Whether the identifier part is numeric 0 (any namespace).
    ///
    /// On insert this signals the store to assign a fresh numeric id.
    pub fn has_zero_identifier(&self) -> bool {
        matches!(self.identifier, Identifier::Numeric(0))
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::NULL
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.identifier {
            Identifier::Numeric(v) => write!(f, "ns={};i={v}", self.namespace),
            Identifier::String(s) => write!(f, "ns={};s={s}", self.namespace),
            Identifier::Guid(g) => {
                write!(f, "ns={};g=", self.namespace)?;
                for b in g {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            Identifier::ByteString(b) => write!(f, "ns={};b=<{} bytes>", self.namespace, b.len()),
        }
    }
}

/// Node id extended with an optional remote-server coordinate.
///
/// A `server_index` of 0 means the local server. The core refuses to
/// materialize references to foreign servers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExpandedNodeId {
    /// The node id on the target server.
    pub node_id: NodeId,
    /// URI of the namespace on the target server, when it differs from the
    /// local table.
    pub namespace_uri: Option<String>,
    /// Index into the server table; 0 is the local server.
    pub server_index: u32,
}

impl ExpandedNodeId {
    /// Wrap a local node id.
    pub fn local(node_id: NodeId) -> Self {
        Self {
            node_id,
            namespace_uri: None,
            server_index: 0,
        }
    }

    /// Whether this id points at the local server.
    pub fn is_local(&self) -> bool {
        self.server_index == 0
    }
}

impl From<NodeId> for ExpandedNodeId {
    fn from(node_id: NodeId) -> Self {
        Self::local(node_id)
    }
}

impl std::fmt::Display for ExpandedNodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.server_index != 0 {
            write!(f, "svr={};", self.server_index)?;
        }
        write!(f, "{}", self.node_id)
    }
}

/// Namespace-qualified name, unique among the aggregates of one parent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    pub namespace: u16,
    pub name: String,
}

impl QualifiedName {
    pub fn new(namespace: u16, name: impl Into<String>) -> Self {
        Self {
            namespace,
            name: name.into(),
        }
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

/// Human-readable text with a locale tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText {
    pub locale: String,
    pub text: String,
}

impl LocalizedText {
    /// English text, the default locale for server-generated nodes.
    pub fn en(text: impl Into<String>) -> Self {
        Self {
            locale: "en".into(),
            text: text.into(),
        }
    }
}

impl std::fmt::Display for LocalizedText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}
