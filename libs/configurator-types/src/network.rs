//! The tenant object: [`Network`] and its load/update criteria.

use std::collections::HashMap;

use crate::{error::ConfiguratorError, update::Update};

/// A tenant. Networks partition all entities and carry their own type-tagged config blobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Type tag -> opaque serialized config. Never inspected by the store.
    pub configs: HashMap<String, Vec<u8>>,
    pub version: u64,
}

impl Network {
    /// Builds a new network shell ready for [`CreateNetwork`](crate); `version` starts at 0.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            description: None,
            configs: HashMap::new(),
            version: 0,
        }
    }
}

/// Selects which columns of a [`Network`] to materialize on a load.
///
/// `id` and `version` are always returned regardless of these flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetworkLoadCriteria {
    pub load_metadata: bool,
    pub load_configs: bool,
}

impl NetworkLoadCriteria {
    /// A criteria that materializes every field.
    #[must_use]
    pub const fn full() -> Self {
        Self {
            load_metadata: true,
            load_configs: true,
        }
    }
}

/// The result of a [`LoadNetworks`](crate) call.
#[derive(Debug, Clone, Default)]
pub struct NetworkLoadResult {
    pub networks: Vec<Network>,
    /// IDs that were explicitly requested and not found. Never populated when `ids` was empty.
    pub not_found: Vec<String>,
}

/// A patch document describing one network mutation.
#[derive(Debug, Clone, Default)]
pub struct NetworkUpdateCriteria {
    pub id: String,
    /// When `true`, every other field is ignored and the network (with all its entities) is
    /// removed.
    pub delete_network: bool,
    pub new_name: Update<String>,
    pub new_description: Update<String>,
    pub configs_to_add_or_update: HashMap<String, Vec<u8>>,
    pub configs_to_delete: Vec<String>,
}

impl NetworkUpdateCriteria {
    #[must_use]
    pub fn delete(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            delete_network: true,
            ..Self::default()
        }
    }
}

/// Maps the ID of a [`NetworkUpdateCriteria`] that failed to apply onto the reason it failed.
///
/// An empty map means every update in the batch succeeded. Entries here carry the taxonomy-tagged
/// [`ConfiguratorError`] context describing what went wrong with that one item; the rest of the
/// batch is unaffected.
pub type FailedOperations = HashMap<String, ConfiguratorError>;
