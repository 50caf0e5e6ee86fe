// watchmen CLI
// Thin layer over watchmen-runtime: argument parsing, logging setup, and
// one handler per subcommand. Checks always run against the filesystem store
// rooted at --bucket-root.

mod args;
mod commands;
mod handlers;
mod logging;

pub use args::{Cli, Commands, ConfigCommand, ExpandArgs, LogLevel, RunArgs};
pub use commands::run;
