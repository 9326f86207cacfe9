//! Schema bootstrap and transaction acquisition.

use async_trait::async_trait;
use configurator_types::{
    error::{MigrationError, TransactionError},
    Deadline,
};
use error_stack::Result;

use crate::Store;

/// Creates [`Store`] handles bound to fresh backend transactions.
///
/// Implementations are expected to wrap a pooled connection manager (see `configurator-postgres`'s
/// `PostgresStorePool`) so that `start_transaction` only pays for a transaction `BEGIN`, not a
/// fresh network connection.
#[async_trait]
pub trait StorageFactory: Send + Sync {
    type Store<'pool>: Store + 'pool
    where
        Self: 'pool;

    /// Idempotently provisions the tables and indices the store components depend on.
    ///
    /// Safe to call repeatedly; a second call against an up-to-date schema is a no-op.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::Internal`](configurator_types::ErrorKind::Internal) if the backend
    ///   connection fails or a migration cannot be applied.
    async fn initialize_service_storage(&self) -> Result<(), MigrationError>;

    /// Opens a transaction and returns a [`Store`] handle bound to it.
    ///
    /// Read-only transactions may be served with snapshot isolation by the backend; read/write
    /// transactions must be serializable with respect to writes that trigger graph repartitioning.
    ///
    /// `deadline` is the ambient cancellation carrier (§5): every operation issued against the
    /// returned handle checks it before starting backend I/O, surfacing
    /// [`ErrorKind::DeadlineExceeded`](configurator_types::ErrorKind::DeadlineExceeded) unchanged
    /// rather than letting the call block past expiry.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::Internal`](configurator_types::ErrorKind::Internal) if the backend cannot
    ///   start a transaction.
    /// - [`ErrorKind::DeadlineExceeded`](configurator_types::ErrorKind::DeadlineExceeded) if
    ///   `deadline` has already passed.
    async fn start_transaction(
        &self,
        read_only: bool,
        deadline: Deadline,
    ) -> Result<Self::Store<'_>, TransactionError>;
}
