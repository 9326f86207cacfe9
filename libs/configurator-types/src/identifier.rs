//! Composite identifiers and opaque allocated IDs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The reserved network which holds entities that do not belong to any tenant.
///
/// Created lazily on first use by the entity store; callers can never delete it.
pub const INTERNAL_NETWORK_ID: &str = "network_magma_internal";

/// The composite identifier of a [`NetworkEntity`](crate::entity::NetworkEntity) within one
/// network: a type tag plus a key unique among entities of that type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    pub entity_type: String,
    pub key: String,
}

impl EntityKey {
    #[must_use]
    pub fn new(entity_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.key)
    }
}

/// The opaque, system-minted identifier shared by every entity in one connected component of a
/// network's association graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GraphId(String);

impl GraphId {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Mints a fresh, process-wide-unique graph ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for GraphId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// The opaque, system-minted identifier of an [`Acl`](crate::acl::Acl), unique within its
/// owning entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AclId(String);

impl AclId {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for AclId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_ids_are_ordered_lexicographically() {
        let a = GraphId::new("aaa");
        let b = GraphId::new("bbb");
        assert!(a < b);
    }

    #[test]
    fn entity_key_display_round_trips_fields() {
        let key = EntityKey::new("cbsd", "abc123");
        assert_eq!(key.to_string(), "cbsd:abc123");
    }
}
