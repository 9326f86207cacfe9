//! Forward-only SQL migrations, embedded into the binary at compile time.
//!
//! `refinery` tracks applied migrations in its own `refinery_schema_history` table, so
//! `initialize_service_storage` is idempotent: running it against an already-current database is
//! a no-op.

use configurator_types::error::MigrationError;
use error_stack::{Result, ResultExt};
use tokio_postgres::GenericClient;

mod embedded {
    refinery::embed_migrations!("migrations");
}

/// Applies every migration under `migrations/` that the target database hasn't seen yet.
pub(crate) async fn run(client: &mut impl GenericClient) -> Result<(), MigrationError> {
    embedded::migrations::runner()
        .run_async(client)
        .await
        .change_context(MigrationError)?;
    Ok(())
}
