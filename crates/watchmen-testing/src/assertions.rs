//! Assertions over the JSON report printed by `watchmen run`.

use anyhow::{Context, Result};
use serde_json::Value;

/// Find the record published for `target`.
pub fn find_record<'a>(report: &'a Value, target: &str) -> Result<&'a Value> {
    let records = report["records"]
        .as_array()
        .context("Expected 'records' array in JSON")?;

    records
        .iter()
        .find(|record| record["target"] == target)
        .with_context(|| format!("No record for target '{}'", target))
}

/// Assert the state of `target`'s record.
pub fn assert_state(report: &Value, target: &str, expected: &str) -> Result<()> {
    let record = find_record(report, target)?;
    let state = record["state"]
        .as_str()
        .with_context(|| format!("Record for '{}' has no state", target))?;

    if state != expected {
        anyhow::bail!(
            "Expected {} to be {} but was {}: {}",
            target,
            expected,
            state,
            record["details"]
        );
    }

    Ok(())
}

/// Assert how many records the report holds.
pub fn assert_record_count(report: &Value, expected: usize) -> Result<()> {
    let records = report["records"]
        .as_array()
        .context("Expected 'records' array in JSON")?;

    if records.len() != expected {
        anyhow::bail!("Expected {} records, got {}", expected, records.len());
    }

    Ok(())
}
