//! # ua-addrspace
//!
//! The address-space mutation core of an OPC UA server: a typed,
//! hierarchical, bidirectionally linked object graph with the
//! AddNodes / AddReferences / DeleteNodes / DeleteReferences service family
//! and the consistency machinery around it.
//!
//! ## Architecture
//!
//! - **Node model** (`node`, `nodeid`, `value`): sum-type nodes with a
//!   common header, keyed by `NodeId` in an abstract store
//! - **Store** (`store`): the typed map owning every node; references hold
//!   peer ids, never pointers, so the ownership graph stays a forest
//! - **Validation** (`typecheck`, `hierarchy`): parent-reference rules and
//!   the Variable/VariableType template checks over the HasSubtype tree
//! - **Instantiation** (`instantiate`): recursive materialization of
//!   type-mandated children with browse-name merging
//! - **Facade** (`server`, `service`): the locking public surface, the
//!   two-phase add pipeline, and the four wire services
//!
//! ## Library usage
//!
//! ```no_run
//! use ua_addrspace::attributes::{AddNodesItem, NodeAttributes, VariableAttributes};
//! use ua_addrspace::node::NodeClass;
//! use ua_addrspace::nodeid::{NodeId, QualifiedName};
//! use ua_addrspace::server::{AddressSpace, AddressSpaceConfig};
//! use ua_addrspace::value::{Scalar, Variant};
//! use ua_addrspace::{ns0, node::VALUE_RANK_SCALAR};
//!
//! let space = AddressSpace::new(AddressSpaceConfig::default()).unwrap();
//! let item = AddNodesItem {
//!     requested_new_node_id: NodeId::numeric(1, 2000),
//!     parent_node_id: ns0::OBJECTS_FOLDER,
//!     reference_type_id: ns0::ORGANIZES,
//!     browse_name: QualifiedName::new(1, "Answer"),
//!     node_class: NodeClass::Variable,
//!     type_definition: ns0::BASE_DATA_VARIABLE_TYPE,
//!     attributes: NodeAttributes::Variable(VariableAttributes {
//!         data_type: ns0::INT32,
//!         value_rank: VALUE_RANK_SCALAR,
//!         value: Variant::Scalar(Scalar::Int32(42)),
//!         ..Default::default()
//!     }),
//! };
//! let node_id = space.add_node(&item).unwrap();
//! assert_eq!(node_id, NodeId::numeric(1, 2000));
//! ```

pub mod attributes;
pub mod browse;
pub mod error;
pub mod hierarchy;
mod instantiate;
pub mod node;
pub mod nodeid;
pub mod ns0;
pub mod server;
pub mod service;
pub mod store;
pub mod typecheck;
pub mod value;
