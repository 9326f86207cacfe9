//! The error taxonomy shared by every storage operation.
//!
//! Operations return `error_stack::Result<T, {Insertion,Query,Update,Transaction}Error>`; the
//! outer context says *which operation* failed, while a [`ConfiguratorError`] attached
//! partway down the report says *why*, tagged with one of the nine [`ErrorKind`]s. Callers that
//! only care about the taxonomy can pull it back out with
//! `report.downcast_ref::<ConfiguratorError>()`.

use std::fmt;

use error_stack::Context;

/// The reason a storage operation failed, independent of which operation it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An empty required field, an invalid enum value, or a missing identifier on an update.
    Validation,
    /// The target network, entity, or ACL does not exist.
    NotFound,
    /// A network ID, `(type, key)`, or physical ID collided with an existing row.
    AlreadyExists,
    /// An association target does not resolve within the network.
    DanglingReference,
    /// The proposed edge set would introduce a cycle into the association DAG.
    Cycle,
    /// The operation was attempted on a transaction that already committed or rolled back.
    TransactionClosed,
    /// The backend reported a serialization failure; the caller should retry.
    Conflict,
    /// The ambient deadline/cancellation carrier signalled expiry mid-operation.
    DeadlineExceeded,
    /// Backend I/O failure or a constraint violation that does not map to another kind.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Validation => "validation",
            Self::NotFound => "not-found",
            Self::AlreadyExists => "already-exists",
            Self::DanglingReference => "dangling-reference",
            Self::Cycle => "cycle",
            Self::TransactionClosed => "transaction-closed",
            Self::Conflict => "conflict",
            Self::DeadlineExceeded => "deadline-exceeded",
            Self::Internal => "internal",
        };
        f.write_str(label)
    }
}

/// A taxonomy-tagged cause, attached to an operation-level report as context.
///
/// # Errors
///
/// This type never returns an error itself; it *is* the error attached via
/// `error_stack::Report::attach` or `change_context`.
#[derive(Debug)]
#[must_use]
pub struct ConfiguratorError {
    kind: ErrorKind,
}

impl ConfiguratorError {
    pub const fn new(kind: ErrorKind) -> Self {
        Self { kind }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for ConfiguratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "configurator store error ({})", self.kind)
    }
}

impl Context for ConfiguratorError {}

/// Top-level context for any operation that inserts new rows (`CreateNetwork`, `CreateEntity`).
#[derive(Debug)]
#[must_use]
pub struct InsertionError;

impl fmt::Display for InsertionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("could not insert into the configurator store")
    }
}

impl Context for InsertionError {}

/// Top-level context for any read-only operation (`LoadNetworks`, `LoadEntities`,
/// `LoadGraphForEntity`).
#[derive(Debug)]
#[must_use]
pub struct QueryError;

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("could not query the configurator store")
    }
}

impl Context for QueryError {}

/// Top-level context for any mutating operation on existing rows (`UpdateNetworks`,
/// `UpdateEntity`).
#[derive(Debug)]
#[must_use]
pub struct UpdateError;

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("could not update the configurator store")
    }
}

impl Context for UpdateError {}

/// Top-level context for transaction lifecycle operations (`StartTransaction`, `Commit`,
/// `Rollback`) and schema bootstrap.
#[derive(Debug)]
#[must_use]
pub struct TransactionError;

impl fmt::Display for TransactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("the configurator store transaction failed")
    }
}

impl Context for TransactionError {}

/// Top-level context for `InitializeServiceStorage` and its underlying migrations.
#[derive(Debug)]
#[must_use]
pub struct MigrationError;

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("could not initialize configurator storage schema")
    }
}

impl Context for MigrationError {}

#[cfg(test)]
mod tests {
    use error_stack::Report;

    use super::*;

    #[test]
    fn kind_survives_attachment_to_an_operation_report() {
        let report = Report::new(InsertionError)
            .attach_printable(ConfiguratorError::new(ErrorKind::AlreadyExists));
        let attached = report
            .frames()
            .find_map(|frame| frame.downcast_ref::<ConfiguratorError>());
        assert_eq!(attached.map(ConfiguratorError::kind), Some(ErrorKind::AlreadyExists));
    }
}
