//! Event payloads and configuration snippets shared by integration tests.

/// Trigger event for `cadence` at `slot`, e.g. `event("Daily", "15:00")`.
pub fn event(cadence: &str, slot: &str) -> String {
    let mut kind = serde_json::Map::new();
    kind.insert(cadence.to_string(), serde_json::Value::from(slot));
    serde_json::json!({ "Type": kind }).to_string()
}

/// A single daily schedule at 15:00 holding one full-path target.
pub fn daily_full_path_config(target: &str, bucket: &str, template: &str) -> String {
    format!(
        r#"[[schedules]]
cadence = "Daily"
at = "15:00"

[[schedules.targets]]
name = "{target}"

[[schedules.targets.items]]
type = "full_path"
bucket = "{bucket}"
full_path_template = "{template}"
"#
    )
}
