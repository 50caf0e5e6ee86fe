
pub mod check;
pub mod config;
pub mod error;
pub mod notify;
pub mod persist;
pub mod processor;
pub mod run;

pub use check::{CheckContext, CheckError, check_multiple, check_single};
pub use config::{CONFIG_ENV, Config, Schedule, Settings, Topics, resolve_config_path};
pub use error::{Error, Result};
pub use notify::{
    DispatchSummary, Dispatcher, LogNotifier, Notifier, RecordingNotifier, TopicRegistry,
};
pub use persist::{JsonFileSink, MemorySink, ResultSink};
pub use processor::TargetProcessor;
pub use run::{ConfigSource, FileConfig, RunReport, Watchman};
