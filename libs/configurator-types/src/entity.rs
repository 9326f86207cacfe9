//! Typed, keyed objects within a network, and the DAG they form via their associations.

use crate::{
    acl::Acl,
    identifier::{EntityKey, GraphId},
    update::Update,
};

/// A typed, keyed logical component within a network; a node in its association graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkEntity {
    pub entity_type: String,
    pub key: String,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Non-empty when this entity corresponds to a physical asset; unique within its network.
    pub physical_id: Option<String>,
    pub config: Vec<u8>,
    /// System-generated; identifies the connected component this entity belongs to. Ignored on
    /// creation and always populated on load.
    pub graph_id: GraphId,
    /// Outgoing edges: `(type, key)` references to other entities in the same network.
    pub associations: Vec<EntityKey>,
    /// Read-only: incoming edges, computed from other entities' `associations`.
    pub parent_associations: Vec<EntityKey>,
    pub permissions: Vec<Acl>,
    pub version: u64,
}

impl NetworkEntity {
    #[must_use]
    pub fn identity(&self) -> EntityKey {
        EntityKey::new(self.entity_type.clone(), self.key.clone())
    }

    /// Deduplicated outgoing edges, preserving first-seen order.
    #[must_use]
    pub fn graph_edges(&self) -> Vec<GraphEdge> {
        let from = self.identity();
        let mut seen = std::collections::HashSet::new();
        self.associations
            .iter()
            .filter(|target| seen.insert((*target).clone()))
            .map(|target| GraphEdge {
                from: from.clone(),
                to: target.clone(),
            })
            .collect()
    }
}

/// A directed edge between two entities of the same network. Derived from `associations`, never
/// independently persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GraphEdge {
    pub from: EntityKey,
    pub to: EntityKey,
}

/// Selects which entities of a network to load, evaluated with this precedence:
/// `ids` (if non-empty) > `type_filter`/`key_filter` conjunction > everything in the network.
#[derive(Debug, Clone, Default)]
pub struct EntityLoadFilter {
    pub ids: Vec<EntityKey>,
    pub type_filter: Option<String>,
    pub key_filter: Option<String>,
}

impl EntityLoadFilter {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn by_ids(ids: Vec<EntityKey>) -> Self {
        Self {
            ids,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn is_load_all(&self) -> bool {
        self.ids.is_empty() && self.type_filter.is_none() && self.key_filter.is_none()
    }
}

/// Selects which columns of a [`NetworkEntity`] to materialize on a load.
///
/// `(type, key)`, `graph_id`, and `version` are always returned regardless of these flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntityLoadCriteria {
    pub load_metadata: bool,
    pub load_config: bool,
    pub load_assocs_from_this: bool,
    pub load_assocs_to_this: bool,
    pub load_permissions: bool,
}

impl EntityLoadCriteria {
    /// A criteria that materializes every field.
    #[must_use]
    pub const fn full() -> Self {
        Self {
            load_metadata: true,
            load_config: true,
            load_assocs_from_this: true,
            load_assocs_to_this: true,
            load_permissions: true,
        }
    }
}

/// The result of a [`LoadEntities`](crate) call.
#[derive(Debug, Clone, Default)]
pub struct EntityLoadResult {
    pub entities: Vec<NetworkEntity>,
    /// Only IDs that were explicitly requested via `filter.ids` and not found.
    pub not_found: Vec<EntityKey>,
}

/// A new ACL to attach during [`UpdateEntity`](crate); the system assigns its ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclPatch {
    pub scope: crate::acl::AclScope,
    pub type_filter: crate::acl::AclTypeFilter,
    pub permission: crate::acl::AclPermission,
    pub id_filter: Vec<String>,
}

/// A patch document describing one entity mutation.
#[derive(Debug, Clone, Default)]
pub struct EntityUpdateCriteria {
    pub entity_type: String,
    pub key: String,
    /// When `true`, every other field is ignored and the entity (with its outgoing edges and
    /// ACLs) is removed.
    pub delete_entity: bool,
    pub new_name: Update<String>,
    pub new_description: Update<String>,
    pub new_physical_id: Update<String>,
    pub new_config: Update<Vec<u8>>,
    pub associations_to_add: Vec<EntityKey>,
    pub associations_to_delete: Vec<EntityKey>,
    pub permissions_to_create: Vec<AclPatch>,
    /// Matched by `Acl::id`; a missing ID fails the whole operation.
    pub permissions_to_update: Vec<Acl>,
    /// Missing ACL IDs are ignored.
    pub permissions_to_delete: Vec<crate::identifier::AclId>,
}

impl EntityUpdateCriteria {
    #[must_use]
    pub fn identity(&self) -> EntityKey {
        EntityKey::new(self.entity_type.clone(), self.key.clone())
    }

    #[must_use]
    pub fn delete(entity_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            key: key.into(),
            delete_entity: true,
            ..Self::default()
        }
    }
}

/// A DAG of associated network entities: every entity sharing one `graph_id`.
#[derive(Debug, Clone, Default)]
pub struct EntityGraph {
    pub entities: Vec<NetworkEntity>,
    /// Entities in the graph with no incoming edges.
    pub root_entities: Vec<EntityKey>,
    pub edges: Vec<GraphEdge>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_edges_collapse_duplicate_targets() {
        let entity = NetworkEntity {
            entity_type: "cbsd".to_owned(),
            key: "a".to_owned(),
            name: None,
            description: None,
            physical_id: None,
            config: vec![],
            graph_id: GraphId::new("g1"),
            associations: vec![
                EntityKey::new("cbsd", "b"),
                EntityKey::new("cbsd", "b"),
                EntityKey::new("cbsd", "c"),
            ],
            parent_associations: vec![],
            permissions: vec![],
            version: 0,
        };
        assert_eq!(entity.graph_edges().len(), 2);
    }

    #[test]
    fn load_filter_precedence_prefers_ids_over_type_and_key() {
        let filter = EntityLoadFilter {
            ids: vec![EntityKey::new("cbsd", "a")],
            type_filter: Some("cbsd".to_owned()),
            key_filter: None,
        };
        assert!(!filter.is_load_all());
        assert_eq!(filter.ids.len(), 1);
    }
}
