use crate::args::RunArgs;
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use watchmen_runtime::{FileConfig, JsonFileSink, Watchman, resolve_config_path};
use watchmen_store::FsStore;
use watchmen_types::State;

/// Exit status for `--fail-on-error` when the run was not a clean success.
pub const EXIT_CHECKS_FAILED: i32 = 2;

pub fn handle(args: RunArgs, config: Option<&str>, bucket_root: &Path) -> Result<i32> {
    let event = match (&args.event, &args.event_file) {
        (Some(event), _) => event.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read event file {}", path.display()))?,
        (None, None) => anyhow::bail!("either --event or --event-file is required"),
    };

    let config_path = resolve_config_path(config)?;
    let store = Arc::new(FsStore::new(bucket_root));
    let mut watchman = Watchman::new(store, FileConfig::new(config_path));
    if let Some(dir) = &args.results_dir {
        watchman = watchman.with_sink(Arc::new(JsonFileSink::new(dir)));
    }

    let now = args.now.unwrap_or_else(Utc::now);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let report = runtime.block_on(watchman.run_at(&event, now));

    println!("{}", serde_json::to_string_pretty(&report)?);

    let clean = report
        .generic()
        .is_some_and(|record| record.state == State::Success);
    if args.fail_on_error && !clean {
        return Ok(EXIT_CHECKS_FAILED);
    }
    Ok(0)
}
