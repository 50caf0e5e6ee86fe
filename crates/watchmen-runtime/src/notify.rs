use crate::config::Topics;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::{debug, info, warn};
use watchmen_types::{ResultRecord, State};

/// Delivers a result record to a notification topic.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, topic: &str, record: &ResultRecord) -> Result<()>;
}

/// Maps target names to topics, falling back to a default topic.
#[derive(Debug, Clone, Default)]
pub struct TopicRegistry {
    default: Option<String>,
    topics: BTreeMap<String, String>,
}

impl TopicRegistry {
    pub fn new(default: Option<String>) -> Self {
        Self {
            default,
            topics: BTreeMap::new(),
        }
    }

    pub fn with_topic(mut self, target: &str, topic: &str) -> Self {
        self.topics.insert(target.to_string(), topic.to_string());
        self
    }

    pub fn lookup(&self, target: &str) -> Option<&str> {
        self.topics
            .get(target)
            .or(self.default.as_ref())
            .map(String::as_str)
    }
}

impl From<&Topics> for TopicRegistry {
    fn from(topics: &Topics) -> Self {
        Self {
            default: topics.default.clone(),
            topics: topics.targets.clone(),
        }
    }
}

/// Counts from one dispatch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub sent: usize,
    pub suppressed: usize,
    pub unrouted: usize,
    pub failed: usize,
}

/// Routes records to the notifier and applies the suppression policy.
/// Delivery errors are logged and counted, never returned.
pub struct Dispatcher<'a> {
    notifier: &'a dyn Notifier,
    registry: TopicRegistry,
    notify_on_success: bool,
}

impl<'a> Dispatcher<'a> {
    pub fn new(notifier: &'a dyn Notifier, registry: TopicRegistry, notify_on_success: bool) -> Self {
        Self {
            notifier,
            registry,
            notify_on_success,
        }
    }

    pub async fn dispatch(&self, records: &[ResultRecord]) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        for record in records {
            if record.state == State::Success && !self.notify_on_success {
                summary.suppressed += 1;
                continue;
            }
            let Some(topic) = self.registry.lookup(&record.target) else {
                debug!(name = %record.target, "no topic registered, skipping notification");
                summary.unrouted += 1;
                continue;
            };
            match self.notifier.notify(topic, record).await {
                Ok(()) => summary.sent += 1,
                Err(err) => {
                    warn!(name = %record.target, topic, error = %err, "notification failed");
                    summary.failed += 1;
                }
            }
        }
        summary
    }
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, topic: &str, record: &ResultRecord) -> Result<()> {
        info!(
            topic,
            name = %record.target,
            state = %record.state,
            subject = %record.subject,
            "{}",
            record.short_message
        );
        Ok(())
    }
}

/// Keeps every notification in memory. Topics listed with
/// [`RecordingNotifier::failing_on`] reject delivery.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, ResultRecord)>>,
    failing_topics: Vec<String>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, topic: &str) -> Self {
        self.failing_topics.push(topic.to_string());
        self
    }

    pub fn sent(&self) -> Vec<(String, ResultRecord)> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, topic: &str, record: &ResultRecord) -> Result<()> {
        if self.failing_topics.iter().any(|t| t == topic) {
            return Err(Error::Notify(format!("topic '{}' rejected the message", topic)));
        }
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| Error::Notify("recording notifier poisoned".to_string()))?;
        sent.push((topic.to_string(), record.clone()));
        Ok(())
    }
}
