//! Postgres persistence for [`Network`] objects (component 3 of the design).

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use configurator_types::{
    error::{InsertionError, QueryError, UpdateError},
    ConfiguratorError, ErrorKind, FailedOperations, Network, NetworkLoadCriteria,
    NetworkLoadResult, NetworkUpdateCriteria, Update, INTERNAL_NETWORK_ID,
};
use error_stack::{Report, Result, ResultExt};
use tokio_postgres::tls::MakeTlsConnect;
use tracing::instrument;

use crate::{convert::version_from_sql, transaction::PostgresTransaction};

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
    async fn load_network_configs(
        &self,
        network_id: &str,
    ) -> Result<HashMap<String, Vec<u8>>, QueryError> {
        let rows = self
            .conn
            .query(
                "SELECT type, value FROM network_configs WHERE network_id = $1",
                &[&network_id],
            )
            .await
            .change_context(QueryError)?;
        Ok(rows
            .into_iter()
            .map(|row| (row.get(0), row.get(1)))
            .collect())
    }

    /// Applies one item of an `UpdateNetworks` batch. Run inside a savepoint by the caller so a
    /// failure here can be rolled back without discarding the rest of the batch.
    async fn apply_network_update(
        &mut self,
        update: &NetworkUpdateCriteria,
    ) -> Result<(), UpdateError> {
        let current = self
            .conn
            .query_opt(
                "SELECT name, description FROM networks WHERE id = $1 FOR UPDATE",
                &[&update.id],
            )
            .await
            .change_context(UpdateError)?;

        let Some(current) = current else {
            return Err(
                Report::new(UpdateError).attach_printable(ConfiguratorError::new(ErrorKind::NotFound))
            );
        };

        if update.delete_network {
            if update.id == INTERNAL_NETWORK_ID {
                return Err(Report::new(UpdateError)
                    .attach_printable(ConfiguratorError::new(ErrorKind::Validation)));
            }
            self.conn
                .execute("DELETE FROM networks WHERE id = $1", &[&update.id])
                .await
                .change_context(UpdateError)?;
            return Ok(());
        }

        let new_name = resolve_optional_field(&update.new_name, current.get(0));
        let new_description = resolve_optional_field(&update.new_description, current.get(1));

        self.conn
            .execute(
                "UPDATE networks SET name = $2, description = $3, version = version + 1 \
                 WHERE id = $1",
                &[&update.id, &new_name, &new_description],
            )
            .await
            .change_context(UpdateError)?;

        for (type_tag, value) in &update.configs_to_add_or_update {
            self.conn
                .execute(
                    "INSERT INTO network_configs (network_id, type, value) \
                     VALUES ($1, $2, $3) \
                     ON CONFLICT (network_id, type) DO UPDATE SET value = EXCLUDED.value",
                    &[&update.id, type_tag, value],
                )
                .await
                .change_context(UpdateError)?;
        }

        for type_tag in &update.configs_to_delete {
            self.conn
                .execute(
                    "DELETE FROM network_configs WHERE network_id = $1 AND type = $2",
                    &[&update.id, type_tag],
                )
                .await
                .change_context(UpdateError)?;
        }

        Ok(())
    }
}

#[async_trait]
impl<'pool, Tls> configurator_store::NetworkStore for PostgresTransaction<'pool, Tls>
where
    Tls: MakeTlsConnect<tokio_postgres::Socket> + Clone + Send + Sync + 'static,
    Tls::Stream: Send + Sync,
    Tls::TlsConnect: Send,
    <Tls::TlsConnect as tokio_postgres::tls::TlsConnect<tokio_postgres::Socket>>::Future: Send,
{
    #[instrument(skip(self, criteria), fields(count = ids.len()))]
    async fn load_networks(
        &self,
        ids: &[String],
        criteria: NetworkLoadCriteria,
    ) -> Result<NetworkLoadResult, QueryError> {
        self.ensure_usable().change_context(QueryError)?;

        let rows = if ids.is_empty() {
            self.conn
                .query("SELECT id, name, description, version FROM networks", &[])
                .await
        } else {
            self.conn
                .query(
                    "SELECT id, name, description, version FROM networks WHERE id = ANY($1)",
                    &[&ids],
                )
                .await
        }
        .change_context(QueryError)?;

        let mut networks: Vec<Network> = rows
            .into_iter()
            .map(|row| Network {
                id: row.get(0),
                name: if criteria.load_metadata { row.get(1) } else { None },
                description: if criteria.load_metadata { row.get(2) } else { None },
                configs: HashMap::new(),
                version: version_from_sql(row.get(3)),
            })
            .collect();

        if criteria.load_configs {
            for network in &mut networks {
                network.configs = self.load_network_configs(&network.id).await?;
            }
        }

        let not_found = if ids.is_empty() {
            Vec::new()
        } else {
            let found: HashSet<&str> = networks.iter().map(|network| network.id.as_str()).collect();
            ids.iter()
                .filter(|id| !found.contains(id.as_str()))
                .cloned()
                .collect()
        };

        Ok(NetworkLoadResult { networks, not_found })
    }

    #[instrument(skip(self, network), fields(network_id = %network.id))]
    async fn create_network(&mut self, network: Network) -> Result<Network, InsertionError> {
        self.ensure_usable().change_context(InsertionError)?;

        if network.id.is_empty() {
            self.poison();
            return Err(Report::new(InsertionError)
                .attach_printable(ConfiguratorError::new(ErrorKind::Validation)));
        }

        if let Err(error) = self
            .conn
            .execute(
                "INSERT INTO networks (id, name, description, version) VALUES ($1, $2, $3, 0)",
                &[&network.id, &network.name, &network.description],
            )
            .await
        {
            self.poison();
            let cause = crate::error::classify_unique_violation(&error, "networks_pkey");
            return Err(Report::new(error)
                .change_context(InsertionError)
                .attach_printable(cause));
        }

        for (type_tag, value) in &network.configs {
            self.conn
                .execute(
                    "INSERT INTO network_configs (network_id, type, value) VALUES ($1, $2, $3)",
                    &[&network.id, type_tag, value],
                )
                .await
                .change_context(InsertionError)
                .inspect_err(|_| self.poison())?;
        }

        Ok(Network { version: 0, ..network })
    }

    #[instrument(skip(self, updates), fields(count = updates.len()))]
    async fn update_networks(
        &mut self,
        updates: Vec<NetworkUpdateCriteria>,
    ) -> Result<FailedOperations, UpdateError> {
        self.ensure_usable().change_context(UpdateError)?;

        let mut failed = FailedOperations::new();
        for (index, update) in updates.into_iter().enumerate() {
            let savepoint = format!("sp_network_update_{index}");
            self.conn
                .batch_execute(&format!("SAVEPOINT {savepoint}"))
                .await
                .change_context(UpdateError)?;

            match self.apply_network_update(&update).await {
                Ok(()) => {
                    self.conn
                        .batch_execute(&format!("RELEASE SAVEPOINT {savepoint}"))
                        .await
                        .change_context(UpdateError)?;
                }
                Err(error) => {
                    self.conn
                        .batch_execute(&format!("ROLLBACK TO SAVEPOINT {savepoint}"))
                        .await
                        .change_context(UpdateError)?;
                    let kind = error
                        .frames()
                        .find_map(|frame| frame.downcast_ref::<ConfiguratorError>())
                        .map_or(ErrorKind::Internal, ConfiguratorError::kind);
                    failed.insert(update.id.clone(), ConfiguratorError::new(kind));
                }
            }
        }

        Ok(failed)
    }
}
