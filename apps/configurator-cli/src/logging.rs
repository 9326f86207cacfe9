//! Logging initialization (component 9 of the design).
//!
//! Verbosity is an `EnvFilter` directive, settable by flag or by `RUST_LOG`, defaulting to
//! `debug` in debug builds and `warn` otherwise — the same fallback the storage crates' own
//! `tracing` spans assume a caller has wired up. Format is a separate flag: compact human-readable
//! output for interactive use, JSON for anything feeding a log aggregator.

use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Full,
    Compact,
    Json,
}

#[derive(Debug, Parser)]
pub struct LoggingArgs {
    /// Verbosity filter, e.g. `info` or `configurator_postgres=debug`. Falls back to `RUST_LOG`.
    #[clap(long, env = "CONFIGURATOR_LOG")]
    pub log_level: Option<String>,

    /// Output format for log lines.
    #[clap(long, value_enum, default_value_t = LogFormat::Full, env = "CONFIGURATOR_LOG_FORMAT")]
    pub log_format: LogFormat,
}

/// Initializes the global `tracing` subscriber. Must be called exactly once, before the storage
/// factory is constructed, so schema initialization is itself observed.
pub fn init_logger(args: &LoggingArgs) {
    let filter = args.log_level.clone().map_or_else(
        || {
            std::env::var("RUST_LOG").map_or_else(
                |_| EnvFilter::new(if cfg!(debug_assertions) { "debug" } else { "warn" }),
                EnvFilter::new,
            )
        },
        EnvFilter::new,
    );

    let registry = tracing_subscriber::registry().with(filter);
    match args.log_format {
        LogFormat::Full => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Compact => registry.with(tracing_subscriber::fmt::layer().compact()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
}
