mod migrate;

pub use self::migrate::{migrate, MigrateArgs};

/// Subcommand for the program.
///
/// `InitializeServiceStorage` is the only domain operation this binary is allowed to perform
/// (§4.9); everything else lives behind `configurator-store`'s `Store` trait, reached only by
/// callers embedding these crates directly.
#[derive(Debug, clap::Subcommand)]
pub enum Subcommand {
    /// Provisions (or brings up to date) the schema the store depends on, then exits.
    Migrate(MigrateArgs),
}
