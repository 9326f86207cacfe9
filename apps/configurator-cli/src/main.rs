mod args;
mod error;
mod logging;
mod subcommand;

use error_stack::Result;

use self::{args::Args, error::CliError, subcommand::Subcommand};

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let Args { subcommand } = Args::parse_args();

    match subcommand {
        Subcommand::Migrate(args) => subcommand::migrate(args).await,
    }
}
