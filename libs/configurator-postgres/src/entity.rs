//! Postgres persistence for [`NetworkEntity`] objects, their associations, and their ACLs
//! (components 4–6 of the design: the Entity Store, the Association & Graph Engine, and the ACL
//! Engine).

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use configurator_types::{
    error::{InsertionError, QueryError, UpdateError},
    Acl, AclId, AclPermission, ConfiguratorError, EntityGraph, EntityKey, EntityLoadCriteria,
    EntityLoadFilter, EntityLoadResult, EntityUpdateCriteria, ErrorKind, GraphEdge, GraphId,
    NetworkEntity, Update, Wildcard, INTERNAL_NETWORK_ID,
};
use error_stack::{Report, Result, ResultExt};
use tokio_postgres::tls::MakeTlsConnect;
use tracing::instrument;

use crate::{convert::version_from_sql, graph, transaction::PostgresTransaction};

fn resolve_optional_field(update: &Update<String>, current: Option<String>) -> Option<String> {
    match update {
        Update::Unchanged => current,
        Update::Set(value) if value.is_empty() => None,
        Update::Set(value) => Some(value.clone()),
    }
}

impl<'pool, Tls> PostgresTransaction<'pool, Tls>
where
    Tls: MakeTlsConnect<tokio_postgres::Socket> + Clone + Send + Sync + 'static,
    Tls::Stream: Send + Sync,
    Tls::TlsConnect: Send,
    <Tls::TlsConnect as tokio_postgres::tls::TlsConnect<tokio_postgres::Socket>>::Future: Send,
{
    async fn raw_network_exists(&self, network_id: &str) -> std::result::Result<bool, tokio_postgres::Error> {
        Ok(self
            .conn
            .query_opt("SELECT 1 FROM networks WHERE id = $1", &[&network_id])
            .await?
            .is_some())
    }

    /// Ensures `network_id` can receive an entity, lazily provisioning the reserved internal
    /// network (per §3's invariant) instead of failing *not-found* for it.
    async fn ensure_entity_target_network(
        &mut self,
        network_id: &str,
    ) -> std::result::Result<bool, tokio_postgres::Error> {
        if self.raw_network_exists(network_id).await? {
            return Ok(true);
        }
        if network_id != INTERNAL_NETWORK_ID {
            return Ok(false);
        }
        self.conn
            .execute(
                "INSERT INTO networks (id, name, description, version) VALUES ($1, $2, $3, 0) \
                 ON CONFLICT (id) DO NOTHING",
                &[
                    &network_id,
                    &Some("Internal Magma Network"),
                    &Some("Internal network to hold non-network entities"),
                ],
            )
            .await?;
        Ok(true)
    }

    async fn raw_all_edges(
        &self,
        network_id: &str,
    ) -> std::result::Result<Vec<graph::Edge>, tokio_postgres::Error> {
        let rows = self
            .conn
            .query(
                "SELECT from_type, from_key, to_type, to_key FROM associations WHERE network_id = $1",
                &[&network_id],
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| graph::Edge {
                from: EntityKey::new(row.get::<_, String>(0), row.get::<_, String>(1)),
                to: EntityKey::new(row.get::<_, String>(2), row.get::<_, String>(3)),
            })
            .collect())
    }

    async fn raw_all_entity_graph_ids(
        &self,
        network_id: &str,
    ) -> std::result::Result<HashMap<EntityKey, GraphId>, tokio_postgres::Error> {
        let rows = self
            .conn
            .query(
                "SELECT type, key, graph_id FROM entities WHERE network_id = $1",
                &[&network_id],
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let key = EntityKey::new(row.get::<_, String>(0), row.get::<_, String>(1));
                (key, GraphId::new(row.get::<_, String>(2)))
            })
            .collect())
    }

    async fn raw_entities_with_graph_id(
        &self,
        network_id: &str,
        graph_id: &GraphId,
    ) -> std::result::Result<Vec<EntityKey>, tokio_postgres::Error> {
        let rows = self
            .conn
            .query(
                "SELECT type, key FROM entities WHERE network_id = $1 AND graph_id = $2",
                &[&network_id, &graph_id.as_str()],
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| EntityKey::new(row.get::<_, String>(0), row.get::<_, String>(1)))
            .collect())
    }

    async fn raw_outgoing_edges(
        &self,
        network_id: &str,
        entity_type: &str,
        key: &str,
    ) -> std::result::Result<Vec<EntityKey>, tokio_postgres::Error> {
        let rows = self
            .conn
            .query(
                "SELECT to_type, to_key FROM associations \
                 WHERE network_id = $1 AND from_type = $2 AND from_key = $3",
                &[&network_id, &entity_type, &key],
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| EntityKey::new(row.get::<_, String>(0), row.get::<_, String>(1)))
            .collect())
    }

    async fn raw_incoming_edges(
        &self,
        network_id: &str,
        entity_type: &str,
        key: &str,
    ) -> std::result::Result<Vec<EntityKey>, tokio_postgres::Error> {
        let rows = self
            .conn
            .query(
                "SELECT from_type, from_key FROM associations \
                 WHERE network_id = $1 AND to_type = $2 AND to_key = $3",
                &[&network_id, &entity_type, &key],
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| EntityKey::new(row.get::<_, String>(0), row.get::<_, String>(1)))
            .collect())
    }

    async fn raw_acls(
        &self,
        network_id: &str,
        entity_type: &str,
        key: &str,
    ) -> std::result::Result<Vec<Acl>, tokio_postgres::Error> {
        let rows = self
            .conn
            .query(
                "SELECT id, scope_wildcard, scope_network_ids, type_wildcard, type_entity_type, \
                        permission, id_filter, version \
                 FROM acls WHERE owner_network_id = $1 AND owner_type = $2 AND owner_key = $3",
                &[&network_id, &entity_type, &key],
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let scope = if row.get::<_, bool>(1) {
                    Wildcard::All
                } else {
                    Wildcard::Specific(row.get(2))
                };
                let type_filter = if row.get::<_, bool>(3) {
                    Wildcard::All
                } else {
                    Wildcard::Specific(row.get::<_, Option<String>>(4).unwrap_or_default())
                };
                Acl {
                    id: AclId::new(row.get::<_, String>(0)),
                    scope,
                    type_filter,
                    permission: AclPermission::from_i16(row.get(5)).unwrap_or(AclPermission::None),
                    id_filter: row.get(6),
                    version: version_from_sql(row.get(7)),
                }
            })
            .collect())
    }

    async fn load_entity(
        &self,
        network_id: &str,
        entity_key: &EntityKey,
        criteria: EntityLoadCriteria,
        force_both_associations: bool,
    ) -> std::result::Result<Option<NetworkEntity>, tokio_postgres::Error> {
        let row = self
            .conn
            .query_opt(
                "SELECT name, description, physical_id, config, graph_id, version \
                 FROM entities WHERE network_id = $1 AND type = $2 AND key = $3",
                &[&network_id, &entity_key.entity_type, &entity_key.key],
            )
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let mut entity = NetworkEntity {
            entity_type: entity_key.entity_type.clone(),
            key: entity_key.key.clone(),
            name: if criteria.load_metadata { row.get(0) } else { None },
            description: if criteria.load_metadata { row.get(1) } else { None },
            physical_id: if criteria.load_metadata { row.get(2) } else { None },
            config: if criteria.load_config { row.get(3) } else { Vec::new() },
            graph_id: GraphId::new(row.get::<_, String>(4)),
            associations: Vec::new(),
            parent_associations: Vec::new(),
            permissions: Vec::new(),
            version: version_from_sql(row.get(5)),
        };

        if criteria.load_assocs_from_this || force_both_associations {
            entity.associations = self
                .raw_outgoing_edges(network_id, &entity_key.entity_type, &entity_key.key)
                .await?;
        }
        if criteria.load_assocs_to_this || force_both_associations {
            entity.parent_associations = self
                .raw_incoming_edges(network_id, &entity_key.entity_type, &entity_key.key)
                .await?;
        }
        if criteria.load_permissions {
            entity.permissions = self
                .raw_acls(network_id, &entity_key.entity_type, &entity_key.key)
                .await?;
        }

        Ok(Some(entity))
    }

    /// Recomputes the connected components of `graph_id` after an edge removal or entity
    /// deletion, re-stamping every entity whose component lost the old ID.
    async fn repartition_after_removal(
        &mut self,
        network_id: &str,
        graph_id: &GraphId,
    ) -> std::result::Result<(), tokio_postgres::Error> {
        let members = self.raw_entities_with_graph_id(network_id, graph_id).await?;
        if members.len() <= 1 {
            return Ok(());
        }

        let all_edges = self.raw_all_edges(network_id).await?;
        let edges_within: Vec<graph::Edge> = all_edges
            .into_iter()
            .filter(|edge| members.contains(&edge.from) && members.contains(&edge.to))
            .collect();

        let components = graph::connected_components(&members, &edges_within);
        if components.len() <= 1 {
            return Ok(());
        }

        let assignment = graph::assign_graph_ids_after_split(components, graph_id.clone(), GraphId::generate);
        for (entity_key, assigned) in assignment {
            if &assigned != graph_id {
                self.conn
                    .execute(
                        "UPDATE entities SET graph_id = $4 \
                         WHERE network_id = $1 AND type = $2 AND key = $3",
                        &[&network_id, &entity_key.entity_type, &entity_key.key, &assigned.as_str()],
                    )
                    .await?;
            }
        }
        Ok(())
    }

    /// Merges the components reachable from `graph_ids` (which must include the entity's own
    /// current `graph_id`) into the winning one, re-stamping every other member.
    async fn merge_graph_ids(
        &mut self,
        network_id: &str,
        graph_ids: HashSet<GraphId>,
    ) -> std::result::Result<GraphId, tokio_postgres::Error> {
        let winner = graph::merge_winner(graph_ids.iter().cloned())
            .unwrap_or_else(GraphId::generate);
        for losing in graph_ids.iter().filter(|id| **id != winner) {
            self.conn
                .execute(
                    "UPDATE entities SET graph_id = $3 WHERE network_id = $1 AND graph_id = $2",
                    &[&network_id, &losing.as_str(), &winner.as_str()],
                )
                .await?;
        }
        Ok(winner)
    }
}

#[async_trait]
impl<'pool, Tls> configurator_store::EntityStore for PostgresTransaction<'pool, Tls>
where
    Tls: MakeTlsConnect<tokio_postgres::Socket> + Clone + Send + Sync + 'static,
    Tls::Stream: Send + Sync,
    Tls::TlsConnect: Send,
    <Tls::TlsConnect as tokio_postgres::tls::TlsConnect<tokio_postgres::Socket>>::Future: Send,
{
    #[instrument(skip(self, filter, criteria), fields(%network_id))]
    async fn load_entities(
        &self,
        network_id: &str,
        filter: EntityLoadFilter,
        criteria: EntityLoadCriteria,
    ) -> Result<EntityLoadResult, QueryError> {
        self.ensure_usable().change_context(QueryError)?;

        if !self.raw_network_exists(network_id).await.change_context(QueryError)? {
            return Err(Report::new(QueryError)
                .attach_printable(ConfiguratorError::new(ErrorKind::NotFound)));
        }

        let candidate_ids: Vec<EntityKey> = if !filter.ids.is_empty() {
            filter.ids.clone()
        } else {
            let rows = match (&filter.type_filter, &filter.key_filter) {
                (Some(entity_type), Some(key)) => {
                    self.conn
                        .query(
                            "SELECT type, key FROM entities \
                             WHERE network_id = $1 AND type = $2 AND key = $3",
                            &[&network_id, entity_type, key],
                        )
                        .await
                }
                (Some(entity_type), None) => {
                    self.conn
                        .query(
                            "SELECT type, key FROM entities WHERE network_id = $1 AND type = $2",
                            &[&network_id, entity_type],
                        )
                        .await
                }
                (None, Some(key)) => {
                    self.conn
                        .query(
                            "SELECT type, key FROM entities WHERE network_id = $1 AND key = $2",
                            &[&network_id, key],
                        )
                        .await
                }
                (None, None) => {
                    self.conn
                        .query("SELECT type, key FROM entities WHERE network_id = $1", &[&network_id])
                        .await
                }
            }
            .change_context(QueryError)?;
            rows.into_iter()
                .map(|row| EntityKey::new(row.get::<_, String>(0), row.get::<_, String>(1)))
                .collect()
        };

        let mut entities = Vec::with_capacity(candidate_ids.len());
        let mut not_found = Vec::new();
        for id in &candidate_ids {
            match self.load_entity(network_id, id, criteria, false).await.change_context(QueryError)? {
                Some(entity) => entities.push(entity),
                None if !filter.ids.is_empty() => not_found.push(id.clone()),
                None => {}
            }
        }

        Ok(EntityLoadResult { entities, not_found })
    }

    #[instrument(skip(self, entity), fields(%network_id, entity = %entity.identity()))]
    async fn create_entity(
        &mut self,
        network_id: &str,
        entity: NetworkEntity,
    ) -> Result<NetworkEntity, InsertionError> {
        self.ensure_usable().change_context(InsertionError)?;

        if entity.entity_type.is_empty() || entity.key.is_empty() {
            self.poison();
            return Err(Report::new(InsertionError)
                .attach_printable(ConfiguratorError::new(ErrorKind::Validation)));
        }

        if !self
            .ensure_entity_target_network(network_id)
            .await
            .change_context(InsertionError)
            .inspect_err(|_| self.poison())?
        {
            self.poison();
            return Err(Report::new(InsertionError)
                .attach_printable(ConfiguratorError::new(ErrorKind::NotFound)));
        }

        let all_graph_ids = self
            .raw_all_entity_graph_ids(network_id)
            .await
            .change_context(InsertionError)
            .inspect_err(|_| self.poison())?;

        let targets = entity.graph_edges();
        let own_identity = entity.identity();
        let mut target_graph_ids = HashSet::new();
        for edge in &targets {
            if edge.to == own_identity {
                // Self-loop: the target is this not-yet-inserted entity itself, so it can never
                // resolve against `all_graph_ids`. Permitted, no separate component to merge.
                continue;
            }
            match all_graph_ids.get(&edge.to) {
                Some(graph_id) => {
                    target_graph_ids.insert(graph_id.clone());
                }
                None => {
                    self.poison();
                    return Err(Report::new(InsertionError)
                        .attach_printable(ConfiguratorError::new(ErrorKind::DanglingReference)));
                }
            }
        }

        let all_edges = self
            .raw_all_edges(network_id)
            .await
            .change_context(InsertionError)
            .inspect_err(|_| self.poison())?;
        let new_edges: Vec<graph::Edge> = targets
            .iter()
            .map(|edge| graph::Edge { from: edge.from.clone(), to: edge.to.clone() })
            .collect();
        if graph::would_introduce_cycle(&all_edges, &new_edges) {
            self.poison();
            return Err(Report::new(InsertionError)
                .attach_printable(ConfiguratorError::new(ErrorKind::Cycle)));
        }

        let new_graph_id =
            graph::merge_winner(target_graph_ids.iter().cloned()).unwrap_or_else(GraphId::generate);

        let physical_id = entity.physical_id.filter(|id| !id.is_empty());

        if let Err(error) = self
            .conn
            .execute(
                "INSERT INTO entities (network_id, type, key, name, description, physical_id, \
                                        config, graph_id, version) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0)",
                &[
                    &network_id,
                    &entity.entity_type,
                    &entity.key,
                    &entity.name,
                    &entity.description,
                    &physical_id,
                    &entity.config,
                    &new_graph_id.as_str(),
                ],
            )
            .await
        {
            self.poison();
            let by_pkey = crate::error::classify_unique_violation(&error, "entities_pkey");
            let cause = if by_pkey.kind() == ErrorKind::AlreadyExists {
                by_pkey
            } else {
                crate::error::classify_unique_violation(&error, "entities_network_id_physical_id_key")
            };
            return Err(Report::new(error).change_context(InsertionError).attach_printable(cause));
        }

        for edge in &targets {
            self.conn
                .execute(
                    "INSERT INTO associations (network_id, from_type, from_key, to_type, to_key) \
                     VALUES ($1, $2, $3, $4, $5)",
                    &[&network_id, &edge.from.entity_type, &edge.from.key, &edge.to.entity_type, &edge.to.key],
                )
                .await
                .change_context(InsertionError)
                .inspect_err(|_| self.poison())?;
        }

        for losing in target_graph_ids.iter().filter(|id| **id != new_graph_id) {
            self.conn
                .execute(
                    "UPDATE entities SET graph_id = $3 WHERE network_id = $1 AND graph_id = $2",
                    &[&network_id, &losing.as_str(), &new_graph_id.as_str()],
                )
                .await
                .change_context(InsertionError)
                .inspect_err(|_| self.poison())?;
        }

        let mut created_permissions = Vec::with_capacity(entity.permissions.len());
        for acl in &entity.permissions {
            let id = AclId::generate();
            let (scope_wildcard, scope_network_ids) = match &acl.scope {
                Wildcard::All => (true, Vec::new()),
                Wildcard::Specific(ids) => (false, ids.clone()),
            };
            let (type_wildcard, type_entity_type) = match &acl.type_filter {
                Wildcard::All => (true, None),
                Wildcard::Specific(entity_type) => (false, Some(entity_type.clone())),
            };
            self.conn
                .execute(
                    "INSERT INTO acls (owner_network_id, owner_type, owner_key, id, \
                                        scope_wildcard, scope_network_ids, type_wildcard, \
                                        type_entity_type, permission, id_filter, version) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 0)",
                    &[
                        &network_id,
                        &entity.entity_type,
                        &entity.key,
                        &id.as_str(),
                        &scope_wildcard,
                        &scope_network_ids,
                        &type_wildcard,
                        &type_entity_type,
                        &(acl.permission as i16),
                        &acl.id_filter,
                    ],
                )
                .await
                .change_context(InsertionError)
                .inspect_err(|_| self.poison())?;
            created_permissions.push(Acl {
                id,
                scope: acl.scope.clone(),
                type_filter: acl.type_filter.clone(),
                permission: acl.permission,
                id_filter: acl.id_filter.clone(),
                version: 0,
            });
        }

        Ok(NetworkEntity {
            entity_type: entity.entity_type,
            key: entity.key,
            name: entity.name,
            description: entity.description,
            physical_id: entity.physical_id,
            config: entity.config,
            graph_id: new_graph_id,
            associations: targets.into_iter().map(|edge| edge.to).collect(),
            parent_associations: Vec::new(),
            permissions: created_permissions,
            version: 0,
        })
    }

    #[instrument(skip(self, update), fields(%network_id, entity = %update.identity()))]
    async fn update_entity(
        &mut self,
        network_id: &str,
        update: EntityUpdateCriteria,
    ) -> Result<NetworkEntity, UpdateError> {
        self.ensure_usable().change_context(UpdateError)?;

        let current_row = self
            .conn
            .query_opt(
                "SELECT name, description, physical_id, config, graph_id, version \
                 FROM entities WHERE network_id = $1 AND type = $2 AND key = $3 FOR UPDATE",
                &[&network_id, &update.entity_type, &update.key],
            )
            .await
            .change_context(UpdateError)?;

        let Some(current_row) = current_row else {
            self.poison();
            return Err(Report::new(UpdateError)
                .attach_printable(ConfiguratorError::new(ErrorKind::NotFound)));
        };

        if update.delete_entity {
            let old_graph_id = GraphId::new(current_row.get::<_, String>(4));
            self.conn
                .execute(
                    "DELETE FROM entities WHERE network_id = $1 AND type = $2 AND key = $3",
                    &[&network_id, &update.entity_type, &update.key],
                )
                .await
                .change_context(UpdateError)
                .inspect_err(|_| self.poison())?;

            self.repartition_after_removal(network_id, &old_graph_id)
                .await
                .change_context(UpdateError)
                .inspect_err(|_| self.poison())?;

            return Ok(NetworkEntity {
                entity_type: update.entity_type,
                key: update.key,
                name: None,
                description: None,
                physical_id: None,
                config: Vec::new(),
                graph_id: GraphId::new(String::new()),
                associations: Vec::new(),
                parent_associations: Vec::new(),
                permissions: Vec::new(),
                version: 0,
            });
        }

        let identity = update.identity();

        let new_name = resolve_optional_field(&update.new_name, current_row.get(0));
        let new_description = resolve_optional_field(&update.new_description, current_row.get(1));
        let new_physical_id = resolve_optional_field(&update.new_physical_id, current_row.get(2));
        let (new_config, config_changed) = match &update.new_config {
            Update::Unchanged => (current_row.get::<_, Vec<u8>>(3), false),
            Update::Set(bytes) => (bytes.clone(), true),
        };

        let all_edges = self.raw_all_edges(network_id).await.change_context(UpdateError)?;
        let all_graph_ids = self
            .raw_all_entity_graph_ids(network_id)
            .await
            .change_context(UpdateError)?;

        let existing_targets: HashSet<&EntityKey> = all_edges
            .iter()
            .filter(|edge| edge.from == identity)
            .map(|edge| &edge.to)
            .collect();

        let mut to_add = Vec::new();
        let mut seen_to_add = HashSet::new();
        for target in &update.associations_to_add {
            if existing_targets.contains(target) || !seen_to_add.insert(target.clone()) {
                continue;
            }
            if !all_graph_ids.contains_key(target) {
                self.poison();
                return Err(Report::new(UpdateError)
                    .attach_printable(ConfiguratorError::new(ErrorKind::DanglingReference)));
            }
            to_add.push(target.clone());
        }

        let new_edges: Vec<graph::Edge> = to_add
            .iter()
            .map(|target| graph::Edge { from: identity.clone(), to: target.clone() })
            .collect();
        if graph::would_introduce_cycle(&all_edges, &new_edges) {
            self.poison();
            return Err(Report::new(UpdateError)
                .attach_printable(ConfiguratorError::new(ErrorKind::Cycle)));
        }

        let to_delete: Vec<EntityKey> = update
            .associations_to_delete
            .iter()
            .filter(|target| existing_targets.contains(target))
            .cloned()
            .collect();

        let associations_changed = !to_add.is_empty() || !to_delete.is_empty();

        self.conn
            .execute(
                "UPDATE entities SET name = $4, description = $5, physical_id = $6, config = $7, \
                                     version = version + 1 \
                 WHERE network_id = $1 AND type = $2 AND key = $3",
                &[
                    &network_id,
                    &update.entity_type,
                    &update.key,
                    &new_name,
                    &new_description,
                    &new_physical_id,
                    &new_config,
                ],
            )
            .await
            .change_context(UpdateError)
            .inspect_err(|_| self.poison())?;

        for target in &to_delete {
            self.conn
                .execute(
                    "DELETE FROM associations \
                     WHERE network_id = $1 AND from_type = $2 AND from_key = $3 \
                       AND to_type = $4 AND to_key = $5",
                    &[&network_id, &update.entity_type, &update.key, &target.entity_type, &target.key],
                )
                .await
                .change_context(UpdateError)
                .inspect_err(|_| self.poison())?;
        }

        for target in &to_add {
            self.conn
                .execute(
                    "INSERT INTO associations (network_id, from_type, from_key, to_type, to_key) \
                     VALUES ($1, $2, $3, $4, $5)",
                    &[&network_id, &update.entity_type, &update.key, &target.entity_type, &target.key],
                )
                .await
                .change_context(UpdateError)
                .inspect_err(|_| self.poison())?;
        }

        let mut current_graph_id = GraphId::new(current_row.get::<_, String>(4));
        if !to_delete.is_empty() {
            self.repartition_after_removal(network_id, &current_graph_id)
                .await
                .change_context(UpdateError)
                .inspect_err(|_| self.poison())?;
            if let Some(refreshed) = self
                .raw_all_entity_graph_ids(network_id)
                .await
                .change_context(UpdateError)?
                .get(&identity)
            {
                current_graph_id = refreshed.clone();
            }
        }
        if !to_add.is_empty() {
            let mut merge_set: HashSet<GraphId> = to_add
                .iter()
                .filter_map(|target| all_graph_ids.get(target).cloned())
                .collect();
            merge_set.insert(current_graph_id.clone());
            current_graph_id = self
                .merge_graph_ids(network_id, merge_set)
                .await
                .change_context(UpdateError)
                .inspect_err(|_| self.poison())?;
        }

        let mut permissions_touched = Vec::new();

        for patch in &update.permissions_to_create {
            let id = AclId::generate();
            let (scope_wildcard, scope_network_ids) = match &patch.scope {
                Wildcard::All => (true, Vec::new()),
                Wildcard::Specific(ids) => (false, ids.clone()),
            };
            let (type_wildcard, type_entity_type) = match &patch.type_filter {
                Wildcard::All => (true, None),
                Wildcard::Specific(entity_type) => (false, Some(entity_type.clone())),
            };
            self.conn
                .execute(
                    "INSERT INTO acls (owner_network_id, owner_type, owner_key, id, \
                                        scope_wildcard, scope_network_ids, type_wildcard, \
                                        type_entity_type, permission, id_filter, version) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 0)",
                    &[
                        &network_id,
                        &update.entity_type,
                        &update.key,
                        &id.as_str(),
                        &scope_wildcard,
                        &scope_network_ids,
                        &type_wildcard,
                        &type_entity_type,
                        &(patch.permission as i16),
                        &patch.id_filter,
                    ],
                )
                .await
                .change_context(UpdateError)
                .inspect_err(|_| self.poison())?;
            permissions_touched.push(Acl {
                id,
                scope: patch.scope.clone(),
                type_filter: patch.type_filter.clone(),
                permission: patch.permission,
                id_filter: patch.id_filter.clone(),
                version: 0,
            });
        }

        for acl in &update.permissions_to_update {
            let (scope_wildcard, scope_network_ids) = match &acl.scope {
                Wildcard::All => (true, Vec::new()),
                Wildcard::Specific(ids) => (false, ids.clone()),
            };
            let (type_wildcard, type_entity_type) = match &acl.type_filter {
                Wildcard::All => (true, None),
                Wildcard::Specific(entity_type) => (false, Some(entity_type.clone())),
            };
            let affected = self
                .conn
                .execute(
                    "UPDATE acls SET scope_wildcard = $5, scope_network_ids = $6, \
                                     type_wildcard = $7, type_entity_type = $8, \
                                     permission = $9, id_filter = $10, version = version + 1 \
                     WHERE owner_network_id = $1 AND owner_type = $2 AND owner_key = $3 AND id = $4",
                    &[
                        &network_id,
                        &update.entity_type,
                        &update.key,
                        &acl.id.as_str(),
                        &scope_wildcard,
                        &scope_network_ids,
                        &type_wildcard,
                        &type_entity_type,
                        &(acl.permission as i16),
                        &acl.id_filter,
                    ],
                )
                .await
                .change_context(UpdateError)
                .inspect_err(|_| self.poison())?;

            if affected == 0 {
                self.poison();
                return Err(Report::new(UpdateError)
                    .attach_printable(ConfiguratorError::new(ErrorKind::NotFound)));
            }
            permissions_touched.push(Acl {
                version: acl.version + 1,
                ..acl.clone()
            });
        }

        for acl_id in &update.permissions_to_delete {
            self.conn
                .execute(
                    "DELETE FROM acls \
                     WHERE owner_network_id = $1 AND owner_type = $2 AND owner_key = $3 AND id = $4",
                    &[&network_id, &update.entity_type, &update.key, &acl_id.as_str()],
                )
                .await
                .change_context(UpdateError)
                .inspect_err(|_| self.poison())?;
        }

        Ok(NetworkEntity {
            entity_type: update.entity_type,
            key: update.key,
            name: if update.new_name.is_unchanged() { None } else { new_name },
            description: if update.new_description.is_unchanged() { None } else { new_description },
            physical_id: if update.new_physical_id.is_unchanged() { None } else { new_physical_id },
            config: if config_changed { new_config } else { Vec::new() },
            graph_id: current_graph_id,
            associations: if associations_changed { to_add } else { Vec::new() },
            parent_associations: Vec::new(),
            permissions: permissions_touched,
            version: version_from_sql(current_row.get::<_, i64>(5)) + 1,
        })
    }

    #[instrument(skip(self, criteria), fields(%network_id, %entity_id))]
    async fn load_graph_for_entity(
        &self,
        network_id: &str,
        entity_id: &EntityKey,
        criteria: EntityLoadCriteria,
    ) -> Result<EntityGraph, QueryError> {
        self.ensure_usable().change_context(QueryError)?;

        let graph_ids = self
            .raw_all_entity_graph_ids(network_id)
            .await
            .change_context(QueryError)?;
        let Some(graph_id) = graph_ids.get(entity_id).cloned() else {
            return Err(Report::new(QueryError)
                .attach_printable(ConfiguratorError::new(ErrorKind::NotFound)));
        };

        let members = self
            .raw_entities_with_graph_id(network_id, &graph_id)
            .await
            .change_context(QueryError)?;
        let all_edges = self.raw_all_edges(network_id).await.change_context(QueryError)?;
        let edges_within: Vec<graph::Edge> = all_edges
            .into_iter()
            .filter(|edge| members.contains(&edge.from) && members.contains(&edge.to))
            .collect();

        let mut entities = Vec::with_capacity(members.len());
        for member in &members {
            if let Some(entity) = self
                .load_entity(network_id, member, criteria, true)
                .await
                .change_context(QueryError)?
            {
                entities.push(entity);
            }
        }

        let root_entities = members
            .iter()
            .filter(|member| !edges_within.iter().any(|edge| &edge.to == *member))
            .cloned()
            .collect();
        let edges = edges_within
            .into_iter()
            .map(|edge| GraphEdge { from: edge.from, to: edge.to })
            .collect();

        Ok(EntityGraph { entities, root_entities, edges })
    }
}
