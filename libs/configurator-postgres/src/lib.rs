//! A Postgres-backed implementation of the `configurator-store` traits.
//!
//! [`PostgresStorageFactory`] wraps a [`bb8`] connection pool; [`StorageFactory::start_transaction`]
//! hands back a [`PostgresTransaction`], the only type in this crate that implements
//! [`configurator_store::Store`]. Every SQL statement lives in [`network`] or [`entity`]; the
//! graph-partition algorithm in [`graph`] is pure and has no knowledge of SQL at all, so it is
//! tested independently of a running database.

mod config;
mod convert;
mod entity;
mod error;
mod graph;
mod migration;
mod network;
mod pool;
mod transaction;

pub use self::{
    config::{DatabaseConnectionInfo, DatabasePoolConfig},
    pool::PostgresStorageFactory,
    transaction::PostgresTransaction,
};
