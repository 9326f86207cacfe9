//! Access-decision logic for [`configurator-store`] entities.
//!
//! The storage core persists ACLs byte-for-byte and never evaluates them (§4.5 of the
//! specification: "queries and mutations go through `LoadEntities`/`UpdateEntity`"). This crate
//! is where the evaluation lives instead, so that a façade can compute an effective permission
//! against an already-loaded [`NetworkEntity`] without opening a transaction of its own.
//!
//! [`configurator-store`]: https://docs.rs/configurator-store

use configurator_types::{Acl, AclPermission, NetworkEntity};

/// Computes the strongest permission granted to `(network_id, entity_type, key)` by any ACL in
/// `acls`.
///
/// An ACL applies iff its scope covers `network_id`, its type filter covers `entity_type`, and
/// its `id_filter` is empty or contains `key`. The effective permission is the strongest
/// (`None < Read < Write < Owner`) permission among every applicable ACL, or `None` if none apply.
/// Pure and allocation-free.
#[must_use]
pub fn effective_permission(
    acls: &[Acl],
    network_id: &str,
    entity_type: &str,
    key: &str,
) -> AclPermission {
    acls.iter()
        .filter(|acl| {
            acl.scope.covers(network_id)
                && acl.type_filter.covers(entity_type)
                && acl.applies_to_key(key)
        })
        .map(|acl| acl.permission)
        .max()
        .unwrap_or(AclPermission::None)
}

/// Convenience wrapper over [`effective_permission`] that reads the entity's own identity and
/// `permissions` list, for a façade that already holds a [`NetworkEntity`] from a `LoadEntities`
/// call.
#[must_use]
pub fn effective_permission_for_entity(entity: &NetworkEntity, network_id: &str) -> AclPermission {
    effective_permission(
        &entity.permissions,
        network_id,
        &entity.entity_type,
        &entity.key,
    )
}

/// Whether `acls` grant at least `required` permission for `(network_id, entity_type, key)`.
#[must_use]
pub fn is_authorized(
    acls: &[Acl],
    network_id: &str,
    entity_type: &str,
    key: &str,
    required: AclPermission,
) -> bool {
    effective_permission(acls, network_id, entity_type, key) >= required
}

#[cfg(test)]
mod tests {
    use configurator_types::{AclId, AclScope, AclTypeFilter, Wildcard};

    use super::*;

    fn acl(
        scope: AclScope,
        type_filter: AclTypeFilter,
        permission: AclPermission,
        id_filter: Vec<String>,
    ) -> Acl {
        Acl {
            id: AclId::new("acl-1"),
            scope,
            type_filter,
            permission,
            id_filter,
            version: 0,
        }
    }

    #[test]
    fn wildcard_scope_and_type_grant_access_everywhere() {
        let acls = vec![acl(Wildcard::All, Wildcard::All, AclPermission::Read, vec![])];
        assert_eq!(
            effective_permission(&acls, "net1", "cbsd", "abc"),
            AclPermission::Read
        );
    }

    #[test]
    fn id_filter_restricts_to_named_keys() {
        let acls = vec![acl(
            Wildcard::All,
            Wildcard::Specific("cbsd".to_owned()),
            AclPermission::Write,
            vec!["abc".to_owned()],
        )];
        assert_eq!(
            effective_permission(&acls, "net1", "cbsd", "abc"),
            AclPermission::Write
        );
        assert_eq!(
            effective_permission(&acls, "net1", "cbsd", "xyz"),
            AclPermission::None
        );
    }

    #[test]
    fn effective_permission_is_the_strongest_applicable_acl() {
        let acls = vec![
            acl(Wildcard::All, Wildcard::All, AclPermission::Read, vec![]),
            acl(
                Wildcard::Specific(vec!["net1".to_owned()]),
                Wildcard::All,
                AclPermission::Owner,
                vec![],
            ),
        ];
        assert_eq!(
            effective_permission(&acls, "net1", "cbsd", "abc"),
            AclPermission::Owner
        );
        assert_eq!(
            effective_permission(&acls, "net2", "cbsd", "abc"),
            AclPermission::Read
        );
    }

    #[test]
    fn non_matching_scope_excludes_the_acl() {
        let acls = vec![acl(
            Wildcard::Specific(vec!["net1".to_owned()]),
            Wildcard::All,
            AclPermission::Owner,
            vec![],
        )];
        assert_eq!(
            effective_permission(&acls, "net2", "cbsd", "abc"),
            AclPermission::None
        );
    }

    #[test]
    fn is_authorized_checks_against_the_required_threshold() {
        let acls = vec![acl(Wildcard::All, Wildcard::All, AclPermission::Write, vec![])];
        assert!(is_authorized(&acls, "net1", "cbsd", "abc", AclPermission::Read));
        assert!(!is_authorized(&acls, "net1", "cbsd", "abc", AclPermission::Owner));
    }
}
