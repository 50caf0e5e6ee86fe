use super::args::{Cli, Commands, ConfigCommand};
use super::handlers;
use super::logging;
use anyhow::Result;

/// Dispatch a parsed command line. Returns the process exit code.
pub fn run(cli: Cli) -> Result<i32> {
    logging::init(cli.log_level);

    match cli.command {
        Commands::Run(args) => {
            handlers::run::handle(args, cli.config.as_deref(), &cli.bucket_root)
        }

        Commands::Config { command } => match command {
            ConfigCommand::Check => handlers::config::handle_check(cli.config.as_deref()),
        },

        Commands::Expand(args) => handlers::expand::handle(args),
    }
}
