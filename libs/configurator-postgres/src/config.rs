//! Connection and pool configuration, populated from the environment with CLI overrides.

use core::fmt;
use std::num::NonZeroU32;

/// Connection parameters for the backing Postgres instance.
///
/// The [`Display`](fmt::Display) impl redacts the password; use [`password`](Self::password)
/// when the real value is needed (e.g. to build a connection string for `tokio_postgres`).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::Args))]
pub struct DatabaseConnectionInfo {
    /// Database username.
    #[cfg_attr(
        feature = "clap",
        clap(long, default_value = "configurator", env = "CONFIGURATOR_PG_USER")
    )]
    user: String,

    /// Database password for authentication.
    #[cfg_attr(
        feature = "clap",
        clap(long, default_value = "configurator", env = "CONFIGURATOR_PG_PASSWORD")
    )]
    password: String,

    /// The host to connect to.
    #[cfg_attr(
        feature = "clap",
        clap(long, default_value = "localhost", env = "CONFIGURATOR_PG_HOST")
    )]
    host: String,

    /// The port to connect to.
    #[cfg_attr(
        feature = "clap",
        clap(long, default_value = "5432", env = "CONFIGURATOR_PG_PORT")
    )]
    port: u16,

    /// The database name to use.
    #[cfg_attr(
        feature = "clap",
        clap(long, default_value = "configurator", env = "CONFIGURATOR_PG_DATABASE")
    )]
    database: String,
}

impl DatabaseConnectionInfo {
    #[must_use]
    pub const fn new(
        user: String,
        password: String,
        host: String,
        port: u16,
        database: String,
    ) -> Self {
        Self {
            user,
            password,
            host,
            port,
            database,
        }
    }

    /// The local-development defaults this struct falls back to when neither a CLI flag nor the
    /// matching environment variable is present.
    #[must_use]
    pub fn local_development() -> Self {
        Self::new(
            "configurator".to_owned(),
            "configurator".to_owned(),
            "localhost".to_owned(),
            5432,
            "configurator".to_owned(),
        )
    }

    /// Builds a `postgres://` connection string, password included.
    ///
    /// Reveals the password; the returned value must never be logged. Use the [`Display`] impl
    /// for anything that reaches a log line.
    ///
    /// [`Display`]: fmt::Display
    #[must_use]
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }

    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Returns the password in plain text. Never print the return value.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }
}

impl fmt::Display for DatabaseConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "postgres://{}:***@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }
}

/// Tuning knobs for the [`bb8`] pool, independent of any one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::Args))]
pub struct DatabasePoolConfig {
    /// Maximum number of concurrently open connections.
    #[cfg_attr(
        feature = "clap",
        clap(
            long,
            default_value = "10",
            env = "CONFIGURATOR_PG_MAX_CONNECTIONS"
        )
    )]
    pub max_connections: NonZeroU32,
}

impl Default for DatabasePoolConfig {
    fn default() -> Self {
        Self {
            max_connections: NonZeroU32::new(10).unwrap_or(NonZeroU32::MIN),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_redacts_the_password_but_connection_string_does_not() {
        let info = DatabaseConnectionInfo::local_development();
        assert!(!info.to_string().contains("configurator:configurator"));
        assert!(info.to_string().contains("***"));
        assert!(info.connection_string().contains("configurator:configurator"));
    }
}
