//! CRUD on [`NetworkEntity`]s, plus whole-graph loads for a queried entity.

use async_trait::async_trait;
use configurator_types::{
    error::{InsertionError, QueryError, UpdateError},
    EntityGraph, EntityKey, EntityLoadCriteria, EntityLoadFilter, EntityLoadResult,
    EntityUpdateCriteria, NetworkEntity,
};
use error_stack::Result;

/// Describes the storage API for [`NetworkEntity`] objects, their associations, and their ACLs.
///
/// ACL mutations are not a separate trait: per the specification's ACL Engine (§4.5), permissions
/// are only ever created, changed, or removed as part of an [`EntityStore::update_entity`] call.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Loads the entities of `network_id` selected by `filter`.
    ///
    /// `not_found` in the result only ever reports IDs that were explicitly named in
    /// `filter.ids` and absent; a type/key filter that matches nothing returns an empty list.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::NotFound`](configurator_types::ErrorKind::NotFound) if `network_id` itself
    ///   does not exist.
    async fn load_entities(
        &self,
        network_id: &str,
        filter: EntityLoadFilter,
        criteria: EntityLoadCriteria,
    ) -> Result<EntityLoadResult, QueryError>;

    /// Creates a new entity, resolving its outgoing associations and assigning it a `graph_id`
    /// and fresh ACL IDs.
    ///
    /// `network_id` equal to
    /// [`INTERNAL_NETWORK_ID`](configurator_types::INTERNAL_NETWORK_ID) is lazily provisioned if
    /// absent, rather than failing *not-found*, per the reserved internal network's invariant.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::Validation`](configurator_types::ErrorKind::Validation) if `entity_type` or
    ///   `key` is empty.
    /// - [`ErrorKind::NotFound`](configurator_types::ErrorKind::NotFound) if `network_id` does
    ///   not exist and is not the reserved internal network.
    /// - [`ErrorKind::AlreadyExists`](configurator_types::ErrorKind::AlreadyExists) on a
    ///   duplicate `(type, key)` or `physical_id` within the network.
    /// - [`ErrorKind::DanglingReference`](configurator_types::ErrorKind::DanglingReference) if an
    ///   association target does not resolve within the network.
    /// - [`ErrorKind::Cycle`](configurator_types::ErrorKind::Cycle) if the new associations would
    ///   introduce a cycle.
    async fn create_entity(
        &mut self,
        network_id: &str,
        entity: NetworkEntity,
    ) -> Result<NetworkEntity, InsertionError>;

    /// Applies one patch document to an existing entity, re-partitioning the graph if
    /// associations changed.
    ///
    /// The returned entity always carries its identity fields; every other field is populated
    /// only if it changed (plus any system-generated ACL IDs).
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::NotFound`](configurator_types::ErrorKind::NotFound) if the entity, or an
    ///   ACL named in `permissions_to_update`, does not exist.
    /// - [`ErrorKind::DanglingReference`](configurator_types::ErrorKind::DanglingReference) if an
    ///   added association target does not resolve within the network.
    /// - [`ErrorKind::Cycle`](configurator_types::ErrorKind::Cycle) if the new associations would
    ///   introduce a cycle.
    async fn update_entity(
        &mut self,
        network_id: &str,
        update: EntityUpdateCriteria,
    ) -> Result<NetworkEntity, UpdateError>;

    /// Loads the full connected component containing `entity_id`.
    ///
    /// Association-related fields of `criteria` are ignored: both edge directions are always
    /// materialized on every entity in the returned graph. Other criteria fields still apply.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::NotFound`](configurator_types::ErrorKind::NotFound) if `entity_id` does not
    ///   resolve within `network_id`.
    async fn load_graph_for_entity(
        &self,
        network_id: &str,
        entity_id: &EntityKey,
        criteria: EntityLoadCriteria,
    ) -> Result<EntityGraph, QueryError>;
}
