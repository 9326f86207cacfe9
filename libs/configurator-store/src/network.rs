//! CRUD on [`Network`]s and their configuration-blob map.

use async_trait::async_trait;
use configurator_types::{
    error::{InsertionError, QueryError, UpdateError},
    FailedOperations, Network, NetworkLoadCriteria, NetworkLoadResult, NetworkUpdateCriteria,
};
use error_stack::Result;

/// Describes the storage API for [`Network`] objects.
#[async_trait]
pub trait NetworkStore: Send + Sync {
    /// Loads the networks named by `ids`, or every network if `ids` is empty.
    ///
    /// Missing IDs are reported in [`NetworkLoadResult::not_found`]; this never fails the
    /// transaction on a missing ID.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::Internal`](configurator_types::ErrorKind::Internal) on backend I/O failure.
    async fn load_networks(
        &self,
        ids: &[String],
        criteria: NetworkLoadCriteria,
    ) -> Result<NetworkLoadResult, QueryError>;

    /// Creates a new network with `version` initialized to 0.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::Validation`](configurator_types::ErrorKind::Validation) if `network.id` is
    ///   empty.
    /// - [`ErrorKind::AlreadyExists`](configurator_types::ErrorKind::AlreadyExists) if
    ///   `network.id` is already in use.
    async fn create_network(&mut self, network: Network) -> Result<Network, InsertionError>;

    /// Applies a batch of updates in input order, isolating per-item failures.
    ///
    /// The returned map contains only the updates that failed; an empty map means every update
    /// in `updates` succeeded. A failure on one item never aborts the rest of the batch, and
    /// never leaves partial state for the failed item.
    ///
    /// A delete targeting [`INTERNAL_NETWORK_ID`](configurator_types::INTERNAL_NETWORK_ID) always
    /// fails that item: the reserved internal network is never removable.
    ///
    /// # Errors
    ///
    /// This call only fails outright on conditions that make the whole batch meaningless (e.g.
    /// the backend connection drops); per-item domain errors are returned in
    /// [`FailedOperations`], not as an `Err`.
    async fn update_networks(
        &mut self,
        updates: Vec<NetworkUpdateCriteria>,
    ) -> Result<FailedOperations, UpdateError>;
}
