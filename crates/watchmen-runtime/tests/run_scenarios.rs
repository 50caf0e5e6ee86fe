use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use watchmen_runtime::{
    Config, MemorySink, RecordingNotifier, ResultSink, RunReport, Watchman,
};
use watchmen_store::MemoryStore;
use watchmen_testing::fixtures::event;
use watchmen_types::State;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 15, 0, 0).unwrap()
}

const CONFIG: &str = r#"
[topics]
default = "data-alerts"

[[schedules]]
cadence = "Daily"
at = "15:00"

[[schedules.targets]]
name = "orders"

[[schedules.targets.items]]
type = "full_path"
bucket = "b"
full_path = "f.json"
min_total_size_kb = 50

[[schedules.targets]]
name = "exports"

[[schedules.targets.items]]
type = "prefix"
bucket = "b"
prefix = "exports/"
suffix = ".parquet"

[[schedules.targets]]
name = "parts"

[[schedules.targets.items]]
type = "prefix"
bucket = "b"
prefix = "parts/"
min_total_files = 10

[[schedules.targets]]
name = "clicks"

[[schedules.targets.items]]
type = "prefix"
bucket = "b"
prefix = "clicks/"

[[schedules.targets]]
name = "healthy"

[[schedules.targets.items]]
type = "full_path"
bucket = "b"
full_path = "healthy.json"
"#;

fn store() -> MemoryStore {
    let ts = now() - TimeDelta::hours(1);
    let mut store = MemoryStore::new()
        .with_object("b", "f.json", 10 * 1024, ts)
        .with_object("b", "exports/1.parquet", 1, ts)
        .with_object("b", "exports/2.parquet", 1, ts)
        .with_object("b", "exports/3.parquet", 1, ts)
        .with_object("b", "exports/schema.json", 1, ts)
        .with_object("b", "clicks/a.csv", 1, ts)
        .with_object("b", "healthy.json", 1, ts);
    for i in 0..5 {
        store = store.with_object("b", &format!("parts/{}.csv", i), 1, ts);
    }
    store.with_fault("b", "clicks/", "connection reset by peer")
}

struct Harness {
    watchman: Watchman,
    notifier: Arc<RecordingNotifier>,
    sink: Arc<MemorySink>,
}

fn harness(store: MemoryStore, config: Config) -> Harness {
    let notifier = Arc::new(RecordingNotifier::new());
    let sink = Arc::new(MemorySink::new());
    let watchman = Watchman::new(Arc::new(store), config)
        .with_notifier(notifier.clone())
        .with_sink(sink.clone() as Arc<dyn ResultSink>);
    Harness {
        watchman,
        notifier,
        sink,
    }
}

async fn daily_run() -> (RunReport, Harness) {
    let harness = harness(store(), Config::from_toml(CONFIG).unwrap());
    let report = harness
        .watchman
        .run_at(&event("Daily", "15:00"), now())
        .await;
    (report, harness)
}

#[tokio::test]
async fn test_undersized_object_fails() {
    let (report, _) = daily_run().await;
    let orders = report.record("orders").unwrap();
    assert_eq!(orders.state, State::Failure);
    assert_eq!(orders.success, Some(false));
    assert!(orders.details.contains("50"));
    assert!(orders.details.contains("b/f.json"));
}

#[tokio::test]
async fn test_wrong_suffix_is_listed() {
    let (report, _) = daily_run().await;
    let exports = report.record("exports").unwrap();
    assert_eq!(exports.success, Some(false));
    assert!(exports.details.contains("exports/schema.json"));
    assert!(!exports.details.contains("1.parquet"));
}

#[tokio::test]
async fn test_too_few_files() {
    let (report, _) = daily_run().await;
    let parts = report.record("parts").unwrap();
    assert_eq!(parts.success, Some(false));
    assert!(parts.details.contains("Found 5 file(s)"));
    assert!(parts.details.contains("at least 10"));
}

#[tokio::test]
async fn test_listing_error_is_isolated() {
    let (report, _) = daily_run().await;
    let clicks = report.record("clicks").unwrap();
    assert_eq!(clicks.state, State::Exception);
    assert_eq!(clicks.success, None);
    assert!(clicks.details.starts_with("--- exceptions ---"));
    assert!(clicks.details.contains("connection reset by peer"));

    assert_eq!(report.record("healthy").unwrap().success, Some(true));
}

#[tokio::test]
async fn test_generic_record_rolls_up() {
    let (report, _) = daily_run().await;
    assert_eq!(report.records.len(), 6);

    let generic = report.generic().unwrap();
    assert_eq!(generic.target, "generic");
    assert_eq!(generic.state, State::Exception);
    assert_eq!(generic.success, None);
    assert_eq!(generic.subject, "[watchmen] Data check failures and exceptions");
    assert!(generic.details.starts_with("clicks:\n"));
    assert!(!generic.details.contains("healthy"));
    assert_eq!(generic.snapshot["targets"]["failure"], 3);
}

#[tokio::test]
async fn test_records_are_dispatched_and_persisted() {
    let (report, harness) = daily_run().await;

    let sent = harness.notifier.sent();
    assert_eq!(sent.len(), 5);
    assert!(sent.iter().all(|(topic, _)| topic == "data-alerts"));
    assert!(sent.iter().all(|(_, record)| record.target != "healthy"));

    let runs = harness.sink.runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].0, report.run_id);
    assert_eq!(runs[0].1.len(), report.records.len());
    assert_eq!(report.persisted_to, Some(format!("memory://{}", report.run_id)));
}

#[tokio::test]
async fn test_weekly_offset_crosses_month_boundary() {
    let now = Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap();
    let store = MemoryStore::new().with_object(
        "b",
        "weekly/2025-02-24.csv",
        1,
        now - TimeDelta::days(2),
    );
    let config = Config::from_toml(
        r#"
[[schedules]]
cadence = "Weekly"
at = "Mon,09:00"

[[schedules.targets]]
name = "weekly"

[[schedules.targets.items]]
type = "full_path"
bucket = "b"
full_path = "weekly/%Y-%m-%d.csv"
time_offset = 1
"#,
    )
    .unwrap();

    let harness = harness(store, config);
    let report = harness
        .watchman
        .run_at(&event("Weekly", "Mon,09:00"), now)
        .await;
    let weekly = report.record("weekly").unwrap();
    assert_eq!(weekly.state, State::Success, "{}", weekly.details);
}

#[tokio::test]
async fn test_invalid_event() {
    let harness = harness(store(), Config::from_toml(CONFIG).unwrap());
    let report = harness
        .watchman
        .run_at(r#"{"Type": {"Fortnightly": "15:00"}}"#, now())
        .await;

    assert_eq!(report.records.len(), 1);
    let record = &report.records[0];
    assert_eq!(record.subject, "[watchmen] Invalid event");
    assert_eq!(record.state, State::Exception);
    assert_eq!(record.success, None);
    assert!(report.trigger.is_none());
}

#[tokio::test]
async fn test_config_load_failure() {
    let notifier = Arc::new(RecordingNotifier::new());
    let watchman = Watchman::new(
        Arc::new(store()),
        watchmen_runtime::FileConfig::new("/nonexistent/watchmen.toml"),
    )
    .with_notifier(notifier.clone());

    let report = watchman.run_at(&event("Daily", "15:00"), now()).await;
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].subject, "[watchmen] Configuration load failed");
    assert!(report.records[0].details.contains("not found"));
    assert!(report.persisted_to.is_none());
}

#[tokio::test]
async fn test_no_matching_schedule() {
    let harness = harness(store(), Config::from_toml(CONFIG).unwrap());
    let report = harness
        .watchman
        .run_at(&event("Hourly", "05"), now())
        .await;

    assert_eq!(report.records.len(), 1);
    let generic = report.generic().unwrap();
    assert_eq!(generic.state, State::Success);
    assert_eq!(generic.details, "");
    assert!(harness.notifier.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_deadline_reports_unfinished_targets() {
    let store = MemoryStore::new()
        .with_object("b", "healthy.json", 1, now())
        .with_latency(Duration::from_secs(120));
    let mut config = Config::from_toml(CONFIG).unwrap();
    config.settings.deadline_secs = Some(60);

    let harness = harness(store, config);
    let report = harness
        .watchman
        .run_at(&event("Daily", "15:00"), now())
        .await;

    let healthy = report.record("healthy").unwrap();
    assert_eq!(healthy.success, None);
    assert!(healthy.details.contains("did not complete before deadline"));
    assert_eq!(report.generic().unwrap().state, State::Exception);
}

const MISSING_ITEM: &str = r#"
[[schedules.targets.items]]
type = "full_path"
bucket = "b"
full_path = "absent.json"
"#;

const UNDERSIZED_ITEM: &str = r#"
[[schedules.targets.items]]
type = "full_path"
bucket = "b"
full_path = "f.json"
min_total_size_kb = 50
"#;

const FAULTY_ITEM: &str = r#"
[[schedules.targets.items]]
type = "prefix"
bucket = "b"
prefix = "clicks/"
"#;

fn mixed_config(items: &[&str]) -> Config {
    let header = r#"
[[schedules]]
cadence = "Daily"
at = "15:00"

[[schedules.targets]]
name = "mixed"
"#;
    Config::from_toml(&format!("{}{}", header, items.concat())).unwrap()
}

#[tokio::test]
async fn test_item_order_does_not_change_outcome() {
    let mut outcomes = Vec::new();
    for items in [
        [MISSING_ITEM, FAULTY_ITEM, UNDERSIZED_ITEM],
        [FAULTY_ITEM, UNDERSIZED_ITEM, MISSING_ITEM],
        [UNDERSIZED_ITEM, MISSING_ITEM, FAULTY_ITEM],
    ] {
        let harness = harness(store(), mixed_config(&items));
        let report = harness
            .watchman
            .run_at(&event("Daily", "15:00"), now())
            .await;
        let mixed = report.record("mixed").unwrap();
        assert_eq!(mixed.success, None);
        assert_eq!(mixed.state, State::Exception);
        outcomes.push(mixed.snapshot["outcome"].clone());
    }

    let failures = |outcome: &serde_json::Value| -> BTreeSet<String> {
        serde_json::from_value(outcome["failure_strings"].clone()).unwrap()
    };
    for outcome in &outcomes[1..] {
        assert_eq!(outcome["success"], outcomes[0]["success"]);
        assert_eq!(outcome["exception_strings"], outcomes[0]["exception_strings"]);
        assert_eq!(failures(outcome), failures(&outcomes[0]));
    }
    assert_eq!(failures(&outcomes[0]).len(), 2);
    assert!(outcomes[0]["success"].is_null());
}

#[tokio::test]
async fn test_lenient_slot_spelling_still_selects_schedule() {
    let config = Config::from_toml(
        r#"
[[schedules]]
cadence = "Weekly"
at = "Mon,10:45"

[[schedules.targets]]
name = "weekly"

[[schedules.targets.items]]
type = "full_path"
bucket = "b"
full_path = "weekly/report.csv"
"#,
    )
    .unwrap();

    let harness = harness(MemoryStore::new().with_bucket("b"), config);
    let report = harness
        .watchman
        .run_at(&event("Weekly", "mon, 10:45"), now())
        .await;

    assert_eq!(report.records.len(), 2);
    let weekly = report.record("weekly").unwrap();
    assert_eq!(weekly.state, State::Failure);
    assert_eq!(weekly.details, "Object b/weekly/report.csv does not exist");
    assert_eq!(report.generic().unwrap().state, State::Failure);
}
