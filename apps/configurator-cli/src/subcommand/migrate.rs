use clap::Parser;
use configurator_postgres::{DatabaseConnectionInfo, DatabasePoolConfig, PostgresStorageFactory};
use configurator_store::StorageFactory;
use error_stack::{Result, ResultExt};
use tokio_postgres::NoTls;

use crate::{error::CliError, logging::LoggingArgs};

#[derive(Debug, Parser)]
#[clap(version, author, about, long_about = None)]
pub struct MigrateArgs {
    #[clap(flatten)]
    pub log_config: LoggingArgs,

    #[clap(flatten)]
    pub db_info: DatabaseConnectionInfo,

    #[clap(flatten)]
    pub pool_config: DatabasePoolConfig,
}

pub async fn migrate(args: MigrateArgs) -> Result<(), CliError> {
    crate::logging::init_logger(&args.log_config);

    let factory = PostgresStorageFactory::new(&args.db_info, args.pool_config, NoTls)
        .await
        .change_context(CliError)
        .map_err(|report| {
            tracing::error!("{report:?}");
            report
        })?;

    factory
        .initialize_service_storage()
        .await
        .change_context(CliError)
        .map_err(|report| {
            tracing::error!("{report:?}");
            report
        })?;

    tracing::info!(
        host = args.db_info.host(),
        database = args.db_info.database(),
        "schema is up to date"
    );

    Ok(())
}
