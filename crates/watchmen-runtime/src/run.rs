use crate::check::CheckContext;
use crate::config::Config;
use crate::notify::{Dispatcher, LogNotifier, Notifier, TopicRegistry};
use crate::persist::{JsonFileSink, ResultSink};
use crate::processor::TargetProcessor;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use watchmen_engine::{RunContext, RunFault, aggregate, fault_record};
use watchmen_store::ObjectStore;
use watchmen_types::{ResultRecord, RunOutcome, Trigger};

/// Supplies the configuration for one run.
pub trait ConfigSource: Send + Sync {
    fn load(&self) -> Result<Config>;
}

/// Reads the configuration from a TOML file on every run.
#[derive(Debug, Clone)]
pub struct FileConfig {
    path: PathBuf,
}

impl FileConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigSource for FileConfig {
    fn load(&self) -> Result<Config> {
        Config::load_from(&self.path)
    }
}

impl ConfigSource for Config {
    fn load(&self) -> Result<Config> {
        self.validate()?;
        Ok(self.clone())
    }
}

/// Everything a run produced. The generic record is always last.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub reference_time: DateTime<Utc>,
    pub trigger: Option<Trigger>,
    pub records: Vec<ResultRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persisted_to: Option<String>,
}

impl RunReport {
    /// The rolled-up record.
    pub fn generic(&self) -> Option<&ResultRecord> {
        self.records.last()
    }

    pub fn record(&self, target: &str) -> Option<&ResultRecord> {
        self.records.iter().find(|record| record.target == target)
    }
}

/// One invocation: parse the trigger, load configuration, check the matching
/// targets, then notify and persist.
pub struct Watchman {
    store: Arc<dyn ObjectStore>,
    config: Box<dyn ConfigSource>,
    notifier: Arc<dyn Notifier>,
    sink: Option<Arc<dyn ResultSink>>,
}

impl Watchman {
    pub fn new(store: Arc<dyn ObjectStore>, config: impl ConfigSource + 'static) -> Self {
        Self {
            store,
            config: Box::new(config),
            notifier: Arc::new(LogNotifier),
            sink: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Overrides the JSON sink derived from `settings.results_dir`.
    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub async fn run(&self, event: &str) -> RunReport {
        self.run_at(event, Utc::now()).await
    }

    /// Run with an explicit reference time.
    pub async fn run_at(&self, event: &str, now: DateTime<Utc>) -> RunReport {
        let mut ctx = RunContext {
            run_id: uuid::Uuid::new_v4().to_string(),
            reference_time: now,
            trigger: None,
            generic_target: Config::default().settings.generic_target,
        };
        info!(run_id = %ctx.run_id, store = self.store.name(), "run started");

        let trigger = match Trigger::from_event_str(event) {
            Ok(trigger) => trigger,
            Err(err) => {
                warn!(run_id = %ctx.run_id, error = %err, "rejecting event");
                let record = fault_record(RunFault::InvalidEvent, &err.to_string(), &ctx);
                return self.finish(ctx, None, vec![record]).await;
            }
        };
        ctx.trigger = Some(trigger.clone());

        let config = match self.config.load() {
            Ok(config) => config,
            Err(err) => {
                warn!(run_id = %ctx.run_id, error = %err, "configuration load failed");
                let record = fault_record(RunFault::ConfigLoad, &err.to_string(), &ctx);
                return self.finish(ctx, None, vec![record]).await;
            }
        };
        ctx.generic_target = config.settings.generic_target.clone();

        let targets = config.targets_for(&trigger);
        info!(
            run_id = %ctx.run_id,
            trigger = %trigger,
            targets = targets.len(),
            "resolved targets"
        );

        let outcomes = if targets.is_empty() {
            RunOutcome::new()
        } else {
            let check_ctx = CheckContext {
                store: Arc::clone(&self.store),
                now,
                cadence: trigger.cadence,
                page_size: config.settings.page_size,
            };
            TargetProcessor::new(check_ctx, config.settings.deadline(trigger.cadence))
                .with_concurrency(config.settings.concurrency, config.settings.item_concurrency)
                .process(targets)
                .await
        };

        let (mut records, generic) = aggregate(&outcomes, &ctx);
        records.push(generic);
        self.finish(ctx, Some(&config), records).await
    }

    async fn finish(
        &self,
        ctx: RunContext,
        config: Option<&Config>,
        records: Vec<ResultRecord>,
    ) -> RunReport {
        let (registry, notify_on_success) = match config {
            Some(config) => (
                TopicRegistry::from(&config.topics),
                config.settings.notify_on_success,
            ),
            None => (TopicRegistry::default(), false),
        };
        let summary = Dispatcher::new(self.notifier.as_ref(), registry, notify_on_success)
            .dispatch(&records)
            .await;
        info!(
            run_id = %ctx.run_id,
            sent = summary.sent,
            suppressed = summary.suppressed,
            unrouted = summary.unrouted,
            failed = summary.failed,
            "notifications dispatched"
        );

        let sink: Option<Arc<dyn ResultSink>> = self.sink.clone().or_else(|| {
            config
                .and_then(|c| c.settings.results_dir.as_ref())
                .map(|dir| Arc::new(JsonFileSink::new(dir)) as Arc<dyn ResultSink>)
        });
        let persisted_to = match sink {
            Some(sink) => match sink.persist(&ctx.run_id, ctx.reference_time, &records).await {
                Ok(location) => Some(location),
                Err(err) => {
                    warn!(run_id = %ctx.run_id, error = %err, "failed to persist results");
                    None
                }
            },
            None => None,
        };

        if let Some(generic) = records.last() {
            info!(run_id = %ctx.run_id, state = %generic.state, "run finished");
        }

        RunReport {
            run_id: ctx.run_id,
            reference_time: ctx.reference_time,
            trigger: ctx.trigger,
            records,
            persisted_to,
        }
    }
}
