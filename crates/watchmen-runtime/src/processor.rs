use crate::check::{CheckContext, check_multiple, check_single};
use futures::{StreamExt, stream};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use watchmen_types::{CheckOutcome, Findings, Item, RunOutcome, Target};

/// Runs every target's items against the store with bounded concurrency and
/// a shared deadline.
#[derive(Debug, Clone)]
pub struct TargetProcessor {
    ctx: CheckContext,
    concurrency: usize,
    item_concurrency: usize,
    deadline: Duration,
}

impl TargetProcessor {
    pub fn new(ctx: CheckContext, deadline: Duration) -> Self {
        Self {
            ctx,
            concurrency: 4,
            item_concurrency: 4,
            deadline,
        }
    }

    pub fn with_concurrency(mut self, targets: usize, items: usize) -> Self {
        self.concurrency = targets.max(1);
        self.item_concurrency = items.max(1);
        self
    }

    /// Evaluate `targets` and classify each one.
    ///
    /// Targets still running when the deadline passes are reported as
    /// exception outcomes.
    pub async fn process(&self, targets: Vec<Target>) -> RunOutcome {
        let deadline = Instant::now() + self.deadline;
        info!(
            targets = targets.len(),
            concurrency = self.concurrency,
            deadline_secs = self.deadline.as_secs(),
            "processing targets"
        );

        stream::iter(targets)
            .map(|target| async move {
                let outcome =
                    match tokio::time::timeout_at(deadline, self.process_target(&target)).await {
                        Ok(outcome) => outcome,
                        Err(_) => {
                            warn!(name = %target.name, "target did not complete before deadline");
                            CheckOutcome::from_findings(Findings::exception(format!(
                                "Target {} did not complete before deadline ({}s)",
                                target.name,
                                self.deadline.as_secs()
                            )))
                        }
                    };
                (target.name, outcome)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await
    }

    async fn process_target(&self, target: &Target) -> CheckOutcome {
        let mut findings = Findings::new();
        let results: Vec<Findings> = stream::iter(&target.items)
            .map(|item| self.check_item(item))
            .buffered(self.item_concurrency)
            .collect()
            .await;
        for result in results {
            findings.merge(result);
        }

        let outcome = CheckOutcome::from_findings(findings);
        info!(
            name = %target.name,
            state = %outcome.state(),
            failures = outcome.failure_strings.len(),
            exceptions = outcome.exception_strings.len(),
            "target checked"
        );
        outcome
    }

    async fn check_item(&self, item: &Item) -> Findings {
        let bucket = item.bucket();
        debug!(bucket, template = item.template(), "checking item");

        match self.ctx.store.bucket_exists(bucket).await {
            Ok(true) => {}
            Ok(false) => {
                return Findings::exception(format!(
                    "Bucket {} does not exist or is not accessible (item {})",
                    bucket,
                    item.describe()
                ));
            }
            Err(err) => {
                return Findings::exception(format!(
                    "{} while checking bucket {} (item {}): {}",
                    err.kind(),
                    bucket,
                    item.describe(),
                    err
                ));
            }
        }

        match item {
            Item::FullPath(item) => check_single(&self.ctx, item).await,
            Item::Prefix(item) => check_multiple(&self.ctx, item).await,
        }
    }
}
