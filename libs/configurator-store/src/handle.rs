//! Transaction lifecycle for a single [`Store`](crate::Store) handle.

use async_trait::async_trait;
use configurator_types::error::TransactionError;
use error_stack::Result;

/// The transaction-lifecycle surface every store handle exposes.
///
/// A handle is single-owner: exactly one of [`commit`](StoreHandle::commit) or
/// [`rollback`](StoreHandle::rollback) must be called, after which any further operation on the
/// handle fails with [`ErrorKind::TransactionClosed`](configurator_types::ErrorKind::TransactionClosed).
#[async_trait]
pub trait StoreHandle: Send {
    /// Commits the underlying transaction.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::Conflict`](configurator_types::ErrorKind::Conflict) if the backend detects
    ///   a serialization failure.
    /// - [`ErrorKind::TransactionClosed`](configurator_types::ErrorKind::TransactionClosed) if
    ///   already committed or rolled back.
    async fn commit(self) -> Result<(), TransactionError>;

    /// Rolls back the underlying transaction.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::TransactionClosed`](configurator_types::ErrorKind::TransactionClosed) if
    ///   already committed or rolled back.
    async fn rollback(self) -> Result<(), TransactionError>;
}
