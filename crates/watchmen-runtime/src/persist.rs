use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use watchmen_types::ResultRecord;

/// Stores the full record list of a run.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Persist `records` and return where they were written.
    async fn persist(
        &self,
        run_id: &str,
        reference_time: DateTime<Utc>,
        records: &[ResultRecord],
    ) -> Result<String>;
}

/// Writes pretty JSON to `<root>/YYYY/MM/DD/<run_id>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    root: PathBuf,
}

impl JsonFileSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, run_id: &str, reference_time: DateTime<Utc>) -> PathBuf {
        self.root
            .join(reference_time.format("%Y/%m/%d").to_string())
            .join(format!("{}.json", run_id))
    }
}

#[async_trait]
impl ResultSink for JsonFileSink {
    async fn persist(
        &self,
        run_id: &str,
        reference_time: DateTime<Utc>,
        records: &[ResultRecord],
    ) -> Result<String> {
        let path = self.path_for(run_id, reference_time);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(records)?;
        tokio::fs::write(&path, content).await?;
        Ok(path.display().to_string())
    }
}

/// Keeps persisted runs in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    runs: Mutex<Vec<(String, Vec<ResultRecord>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runs(&self) -> Vec<(String, Vec<ResultRecord>)> {
        self.runs.lock().map(|runs| runs.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn persist(
        &self,
        run_id: &str,
        _reference_time: DateTime<Utc>,
        records: &[ResultRecord],
    ) -> Result<String> {
        let mut runs = self
            .runs
            .lock()
            .map_err(|_| Error::Persist("memory sink poisoned".to_string()))?;
        runs.push((run_id.to_string(), records.to_vec()));
        Ok(format!("memory://{}", run_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;
    use watchmen_types::State;

    #[tokio::test]
    async fn test_json_sink_partitions_by_date() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let sink = JsonFileSink::new(temp_dir.path());
        let when = Utc.with_ymd_and_hms(2025, 3, 7, 15, 0, 0).unwrap();
        let record = ResultRecord {
            target: "generic".to_string(),
            subject: "[watchmen] All targets passed".to_string(),
            details: String::new(),
            short_message: "All targets passed".to_string(),
            state: State::Success,
            success: Some(true),
            snapshot: serde_json::json!({"run_id": "run-1"}),
        };

        let written = sink.persist("run-1", when, &[record]).await?;
        let expected = temp_dir.path().join("2025/03/07/run-1.json");
        assert_eq!(written, expected.display().to_string());

        let stored: Vec<ResultRecord> = serde_json::from_str(&std::fs::read_to_string(&expected)?)?;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].state, State::Success);
        Ok(())
    }
}
