//! Access-control entries attached to a [`NetworkEntity`](crate::entity::NetworkEntity).

use serde::{Deserialize, Serialize};

use crate::identifier::AclId;

/// A value that is either a wildcard covering everything, or a specific list of values.
///
/// Used for both [`Acl::scope`] (network IDs) and [`Acl::type_filter`] (a single entity type),
/// replacing the source's two-parallel-fields representation, which allowed the nonsensical
/// state of "wildcard is set *and* the list is non-empty".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Wildcard<T> {
    All,
    Specific(T),
}

impl<T> Wildcard<T> {
    #[must_use]
    pub const fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

/// The set of networks an ACL applies to.
pub type AclScope = Wildcard<Vec<String>>;

impl AclScope {
    #[must_use]
    pub fn covers(&self, network_id: &str) -> bool {
        match self {
            Self::All => true,
            Self::Specific(ids) => ids.iter().any(|id| id == network_id),
        }
    }
}

/// The entity type an ACL applies to.
pub type AclTypeFilter = Wildcard<String>;

impl AclTypeFilter {
    #[must_use]
    pub fn covers(&self, entity_type: &str) -> bool {
        match self {
            Self::All => true,
            Self::Specific(expected) => expected == entity_type,
        }
    }
}

/// The strength of access an [`Acl`] grants, totally ordered `None < Read < Write < Owner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(i16)]
pub enum AclPermission {
    None = 0,
    Read = 1,
    Write = 2,
    Owner = 3,
}

impl AclPermission {
    #[must_use]
    pub const fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Read),
            2 => Some(Self::Write),
            3 => Some(Self::Owner),
            _ => None,
        }
    }
}

/// A scoped, typed permission record attached to an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acl {
    pub id: AclId,
    pub scope: AclScope,
    pub type_filter: AclTypeFilter,
    pub permission: AclPermission,
    /// Empty means "every key of the applicable type(s)".
    pub id_filter: Vec<String>,
    pub version: u64,
}

impl Acl {
    /// Whether this ACL applies to `key` at all, given it already matched on scope and type.
    #[must_use]
    pub fn applies_to_key(&self, key: &str) -> bool {
        self.id_filter.is_empty() || self.id_filter.iter().any(|candidate| candidate == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_order_is_none_lt_read_lt_write_lt_owner() {
        assert!(AclPermission::None < AclPermission::Read);
        assert!(AclPermission::Read < AclPermission::Write);
        assert!(AclPermission::Write < AclPermission::Owner);
    }

    #[test]
    fn wildcard_covers_everything_specific_only_named_values() {
        let scope: AclScope = Wildcard::Specific(vec!["net1".to_owned()]);
        assert!(Wildcard::<Vec<String>>::All.covers("net1"));
        assert!(scope.covers("net1"));
        assert!(!scope.covers("net2"));
    }

    #[test]
    fn acl_round_trips_through_json() {
        let acl = Acl {
            id: AclId::new("acl-1"),
            scope: Wildcard::Specific(vec!["net1".to_owned()]),
            type_filter: Wildcard::All,
            permission: AclPermission::Write,
            id_filter: vec!["a".to_owned()],
            version: 3,
        };
        let json = serde_json::to_string(&acl).expect("acl should serialize");
        let restored: Acl = serde_json::from_str(&json).expect("acl should deserialize");
        assert_eq!(acl, restored);
    }

    #[test]
    fn empty_id_filter_applies_to_every_key() {
        let acl = Acl {
            id: AclId::new("acl-1"),
            scope: Wildcard::All,
            type_filter: Wildcard::All,
            permission: AclPermission::Read,
            id_filter: vec![],
            version: 0,
        };
        assert!(acl.applies_to_key("anything"));
    }
}
