use chrono::{DateTime, Utc};
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use std::fmt;
use std::path::PathBuf;
use watchmen_types::Cadence;

#[derive(Parser)]
#[command(name = "watchmen")]
#[command(about = "Check that expected data landed in object storage", long_about = None)]
#[command(version)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        help = "Configuration file (default: $WATCHMEN_CONFIG, then the user config directory)"
    )]
    pub config: Option<String>,

    #[arg(
        long,
        default_value = ".",
        global = true,
        help = "Directory whose subdirectories are buckets"
    )]
    pub bucket_root: PathBuf,

    #[arg(long, default_value = "info", global = true)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the checks scheduled for one trigger event")]
    Run(RunArgs),

    #[command(about = "Inspect the configuration")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    #[command(about = "Print the keys a path template expands to")]
    Expand(ExpandArgs),
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Load and validate the configuration, then list its schedules")]
    Check,
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("source").required(true).args(["event", "event_file"])))]
pub struct RunArgs {
    #[arg(long, help = r#"Trigger event, e.g. '{"Type": {"Daily": "15:00"}}'"#)]
    pub event: Option<String>,

    #[arg(long, help = "Read the trigger event from a file")]
    pub event_file: Option<PathBuf>,

    #[arg(long, help = "Write results under this directory (overrides settings.results_dir)")]
    pub results_dir: Option<PathBuf>,

    #[arg(long, value_parser = parse_time, help = "Reference time (RFC 3339, default: now)")]
    pub now: Option<DateTime<Utc>>,

    #[arg(long, help = "Exit with status 2 unless every target passed")]
    pub fail_on_error: bool,
}

#[derive(Debug, Args)]
pub struct ExpandArgs {
    #[arg(long)]
    pub template: String,

    #[arg(
        long = "var",
        value_name = "NAME=V1,V2",
        help = "Placeholder values; a bare list binds {path_var}"
    )]
    pub vars: Vec<String>,

    #[arg(long, requires = "offset")]
    pub cadence: Option<Cadence>,

    #[arg(long, requires = "cadence")]
    pub offset: Option<u32>,

    #[arg(long, requires = "cadence", help = "Expand every unit from now back to the offset")]
    pub span: bool,

    #[arg(long, value_parser = parse_time, help = "Reference time (RFC 3339, default: now)")]
    pub now: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

fn parse_time(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {}", e))
}
