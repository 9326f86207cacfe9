//! The pooled entry point: builds connections, runs migrations, and hands out transactions.

use std::str::FromStr;

use bb8::Pool;
use bb8_postgres::PostgresConnectionManager;
use configurator_types::{
    error::{MigrationError, TransactionError},
    Deadline,
};
use error_stack::{Result, ResultExt};
use tokio_postgres::{tls::MakeTlsConnect, Config};
use tracing::instrument;

use crate::{config::DatabaseConnectionInfo, migration, transaction::PostgresTransaction, DatabasePoolConfig};

/// A [`configurator_store::StorageFactory`] backed by a [`bb8`] pool of `tokio_postgres`
/// connections.
///
/// One `PostgresStorageFactory` is created once at process startup (see
/// `apps/configurator-cli`) and shared across every request; each
/// [`start_transaction`](Self::start_transaction) call checks out a connection from the pool and
/// returns a move-only [`PostgresTransaction`] bound to it.
pub struct PostgresStorageFactory<Tls>
where
    Tls: MakeTlsConnect<tokio_postgres::Socket>,
{
    pool: Pool<PostgresConnectionManager<Tls>>,
}

impl<Tls> PostgresStorageFactory<Tls>
where
    Tls: MakeTlsConnect<tokio_postgres::Socket> + Clone + Send + Sync + 'static,
    Tls::Stream: Send + Sync,
    Tls::TlsConnect: Send,
    <Tls::TlsConnect as tokio_postgres::tls::TlsConnect<tokio_postgres::Socket>>::Future: Send,
{
    /// Builds the connection pool. Does not open a connection eagerly; the first real I/O
    /// happens on the first [`start_transaction`](Self::start_transaction) or
    /// [`initialize_service_storage`](configurator_store::StorageFactory::initialize_service_storage)
    /// call.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionError`] if `connection_info` does not parse into a valid
    /// `tokio_postgres::Config`.
    #[instrument(skip(tls, pool_config), fields(host = connection_info.host(), database = connection_info.database()))]
    pub async fn new(
        connection_info: &DatabaseConnectionInfo,
        pool_config: DatabasePoolConfig,
        tls: Tls,
    ) -> Result<Self, TransactionError> {
        let config = Config::from_str(&connection_info.connection_string())
            .change_context(TransactionError)?;
        let manager = PostgresConnectionManager::new(config, tls);
        let pool = Pool::builder()
            .max_size(pool_config.max_connections.get())
            .build(manager)
            .await
            .change_context(TransactionError)?;
        Ok(Self { pool })
    }
}

#[async_trait::async_trait]
impl<Tls> configurator_store::StorageFactory for PostgresStorageFactory<Tls>
where
    Tls: MakeTlsConnect<tokio_postgres::Socket> + Clone + Send + Sync + 'static,
    Tls::Stream: Send + Sync,
    Tls::TlsConnect: Send,
    <Tls::TlsConnect as tokio_postgres::tls::TlsConnect<tokio_postgres::Socket>>::Future: Send,
{
    type Store<'pool>
        = PostgresTransaction<'pool, Tls>
    where
        Self: 'pool;

    #[instrument(skip(self))]
    async fn initialize_service_storage(&self) -> Result<(), MigrationError> {
        let mut conn = self.pool.get().await.change_context(MigrationError)?;
        migration::run(&mut *conn).await
    }

    #[instrument(skip(self))]
    async fn start_transaction(
        &self,
        read_only: bool,
        deadline: Deadline,
    ) -> Result<Self::Store<'_>, TransactionError> {
        deadline.check().change_context(TransactionError)?;
        let conn = self.pool.get().await.change_context(TransactionError)?;
        let mut transaction = PostgresTransaction::new(conn, deadline);
        let begin = if read_only {
            "BEGIN ISOLATION LEVEL REPEATABLE READ READ ONLY"
        } else {
            "BEGIN ISOLATION LEVEL SERIALIZABLE"
        };
        transaction
            .conn
            .batch_execute(begin)
            .await
            .change_context(TransactionError)?;
        Ok(transaction)
    }
}
