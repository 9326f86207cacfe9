//! Data model and error taxonomy shared by every configurator storage crate.
//!
//! This crate holds no I/O: it is the vocabulary that [`configurator-store`] traits
//! are expressed in terms of, and that [`configurator-postgres`] persists.
//!
//! [`configurator-store`]: https://docs.rs/configurator-store
//! [`configurator-postgres`]: https://docs.rs/configurator-postgres

pub mod acl;
pub mod deadline;
pub mod entity;
pub mod error;
pub mod identifier;
pub mod network;
pub mod update;

pub use self::{
    acl::{Acl, AclPermission, AclScope, AclTypeFilter, Wildcard},
    deadline::Deadline,
    entity::{
        AclPatch, EntityGraph, EntityLoadCriteria, EntityLoadFilter, EntityLoadResult,
        EntityUpdateCriteria, GraphEdge, NetworkEntity,
    },
    error::{ConfiguratorError, ErrorKind},
    identifier::{AclId, EntityKey, GraphId, INTERNAL_NETWORK_ID},
    network::{
        FailedOperations, Network, NetworkLoadCriteria, NetworkLoadResult, NetworkUpdateCriteria,
    },
    update::Update,
};
