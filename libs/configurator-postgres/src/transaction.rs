//! The single [`configurator_store::Store`] implementation in this crate: one handle bound to
//! one backend transaction.

use std::sync::atomic::{AtomicBool, Ordering};

use bb8::PooledConnection;
use bb8_postgres::PostgresConnectionManager;
use configurator_types::{error::TransactionError, ConfiguratorError, Deadline, ErrorKind};
use error_stack::{Result, ResultExt};
use tokio_postgres::tls::MakeTlsConnect;

/// A store handle bound to one open Postgres transaction.
///
/// Single-owner: [`commit`](configurator_store::StoreHandle::commit) and
/// [`rollback`](configurator_store::StoreHandle::rollback) both take `self` by value, so the type
/// system (not a runtime flag) enforces that at most one of them is ever called — the "move-only
/// handle" of the design notes. The `poisoned` flag covers the other way a handle can become
/// unusable: an operation that observed an expired deadline or an unrecoverable backend error
/// mid-transaction, after which every later call on the same handle fails fast with
/// [`ErrorKind::TransactionClosed`] instead of attempting more backend I/O on a transaction the
/// server has likely already abandoned.
pub struct PostgresTransaction<'pool, Tls>
where
    Tls: MakeTlsConnect<tokio_postgres::Socket>,
{
    pub(crate) conn: PooledConnection<'pool, PostgresConnectionManager<Tls>>,
    deadline: Deadline,
    poisoned: AtomicBool,
}

impl<'pool, Tls> PostgresTransaction<'pool, Tls>
where
    Tls: MakeTlsConnect<tokio_postgres::Socket>,
{
    pub(crate) const fn new(
        conn: PooledConnection<'pool, PostgresConnectionManager<Tls>>,
        deadline: Deadline,
    ) -> Self {
        Self {
            conn,
            deadline,
            poisoned: AtomicBool::new(false),
        }
    }

    /// Checks the deadline and the poison flag; every trait method on this type calls this
    /// first.
    pub(crate) fn ensure_usable(&self) -> std::result::Result<(), ConfiguratorError> {
        if self.poisoned.load(Ordering::Acquire) {
            return Err(ConfiguratorError::new(ErrorKind::TransactionClosed));
        }
        self.deadline.check()
    }

    /// Marks this handle unusable for any further operation. Called whenever an operation fails
    /// in a way that leaves the backend transaction's state uncertain.
    pub(crate) fn poison(&self) {
        self.poisoned.store(true, Ordering::Release);
    }
}

#[async_trait::async_trait]
impl<'pool, Tls> configurator_store::StoreHandle for PostgresTransaction<'pool, Tls>
where
    Tls: MakeTlsConnect<tokio_postgres::Socket> + Clone + Send + Sync + 'static,
    Tls::Stream: Send + Sync,
    Tls::TlsConnect: Send,
    <Tls::TlsConnect as tokio_postgres::tls::TlsConnect<tokio_postgres::Socket>>::Future: Send,
{
    async fn commit(self) -> Result<(), TransactionError> {
        self.ensure_usable().change_context(TransactionError)?;
        self.conn
            .batch_execute("COMMIT")
            .await
            .change_context(TransactionError)
    }

    async fn rollback(self) -> Result<(), TransactionError> {
        self.ensure_usable().change_context(TransactionError)?;
        self.conn
            .batch_execute("ROLLBACK")
            .await
            .change_context(TransactionError)
    }
}
