//! Maps `tokio_postgres` failures onto the storage-core error taxonomy.

use configurator_types::{ConfiguratorError, ErrorKind};
use tokio_postgres::error::SqlState;

/// Classifies a raw `tokio_postgres::Error` by its `SqlState`, falling back to
/// [`ErrorKind::Internal`] for anything this store doesn't give special meaning to.
///
/// Named-constraint classification (e.g. "this particular unique violation means
/// already-exists, not internal") is layered on top by the caller via
/// [`classify_unique_violation`]; this function only handles the cases that are unambiguous from
/// the `SqlState` alone.
#[must_use]
pub fn classify(error: &tokio_postgres::Error) -> ConfiguratorError {
    let Some(code) = error.code() else {
        return ConfiguratorError::new(ErrorKind::Internal);
    };

    let kind = match *code {
        SqlState::UNIQUE_VIOLATION => ErrorKind::AlreadyExists,
        SqlState::FOREIGN_KEY_VIOLATION => ErrorKind::DanglingReference,
        SqlState::T_R_SERIALIZATION_FAILURE | SqlState::T_R_DEADLOCK_DETECTED => {
            ErrorKind::Conflict
        }
        _ => ErrorKind::Internal,
    };
    ConfiguratorError::new(kind)
}

/// Classifies a unique-violation error as [`ErrorKind::AlreadyExists`] only if its constraint
/// name matches `constraint_name`; anything else (including non-unique-violation errors) falls
/// back to [`ErrorKind::Internal`], so a caller can distinguish "the row I was inserting already
/// exists" from "some unrelated unique index on this table was violated".
#[must_use]
pub fn classify_unique_violation(
    error: &tokio_postgres::Error,
    constraint_name: &str,
) -> ConfiguratorError {
    let is_named_violation = error.code() == Some(&SqlState::UNIQUE_VIOLATION)
        && error
            .as_db_error()
            .and_then(|db_error| db_error.constraint())
            .is_some_and(|name| name == constraint_name);

    if is_named_violation {
        ConfiguratorError::new(ErrorKind::AlreadyExists)
    } else {
        classify(error)
    }
}
