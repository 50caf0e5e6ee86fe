use super::{CheckContext, CheckError, capture, kilobytes};
use watchmen_engine::{Offset, expand};
use watchmen_types::{Findings, FullPathItem, Item, OffsetSpec, PathVars};

/// Check one fully addressed item: every expanded key must exist, be fresh
/// when an offset is declared, and meet the minimum size when one is set.
pub async fn check_single(ctx: &CheckContext, item: &FullPathItem) -> Findings {
    let mut findings = Findings::new();
    let result = evaluate(ctx, item, &mut findings).await;
    capture(&mut findings, result, || Item::FullPath(item.clone()).describe());
    findings
}

async fn evaluate(
    ctx: &CheckContext,
    item: &FullPathItem,
    findings: &mut Findings,
) -> Result<(), CheckError> {
    let spec = OffsetSpec {
        offset_type: item.offset_type.as_deref(),
        time_offset: item.time_offset.as_ref(),
    };
    let offset = Offset::from_spec(spec, ctx.cadence)?;
    let (timestamp, window) = match offset {
        Some(offset) => (offset.resolve(ctx.now)?, Some(offset.window(ctx.now)?)),
        None => (ctx.now, None),
    };
    let vars = item.path_vars.as_ref().map(PathVars::to_map);
    // A single timestamp, so one key per variable combination.
    let keys = expand(&item.full_path_template, &[timestamp], vars.as_ref())?;

    let store = ctx.store.as_ref();
    let bucket = item.bucket.as_str();

    for key in &keys {
        if !store.exists(bucket, key).await? {
            findings.push_failure(format!("Object {}/{} does not exist", bucket, key));
            continue;
        }

        if let Some(window) = &window {
            let modified = store.last_modified(bucket, key).await?;
            if !window.contains(modified) {
                findings.push_failure(format!(
                    "Object {}/{} was not modified within {} (last modified {})",
                    bucket,
                    key,
                    window,
                    modified.to_rfc3339()
                ));
                continue;
            }
        }

        if let Some(min_kb) = item.min_total_size_kb {
            let size = store.size(bucket, key).await?;
            if size < min_kb.saturating_mul(1024) {
                findings.push_failure(format!(
                    "Object {}/{} is {} KB, below the required {} KB",
                    bucket,
                    key,
                    kilobytes(size),
                    min_kb
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::sync::Arc;
    use watchmen_store::MemoryStore;
    use watchmen_types::{Cadence, OffsetValue};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 15, 0, 0).unwrap()
    }

    fn ctx(store: MemoryStore) -> CheckContext {
        CheckContext {
            store: Arc::new(store),
            now: now(),
            cadence: Cadence::Daily,
            page_size: 100,
        }
    }

    fn item(template: &str) -> FullPathItem {
        FullPathItem {
            bucket: "b".to_string(),
            full_path_template: template.to_string(),
            path_vars: None,
            time_offset: None,
            offset_type: None,
            min_total_size_kb: None,
        }
    }

    #[tokio::test]
    async fn test_existing_object_passes() {
        let ctx = ctx(MemoryStore::new().with_object("b", "f.json", 1, now()));
        let findings = check_single(&ctx, &item("f.json")).await;
        assert!(findings.is_clean());
    }

    #[tokio::test]
    async fn test_undersized_object_fails() {
        let ctx = ctx(MemoryStore::new().with_object("b", "f.json", 10 * 1024, now()));
        let mut item = item("f.json");
        item.min_total_size_kb = Some(50);

        let findings = check_single(&ctx, &item).await;
        assert!(findings.exceptions.is_empty());
        assert_eq!(
            findings.failures,
            vec!["Object b/f.json is 10.00 KB, below the required 50 KB"]
        );
    }

    #[tokio::test]
    async fn test_missing_keys_are_each_reported() {
        let ctx = ctx(MemoryStore::new().with_object("b", "eu/f.json", 1, now()));
        let mut item = item("{region}/f.json");
        item.path_vars = Some(PathVars::Named(
            [(
                "region".to_string(),
                vec!["eu".to_string(), "us".to_string(), "ap".to_string()],
            )]
            .into(),
        ));

        let findings = check_single(&ctx, &item).await;
        assert_eq!(
            findings.failures,
            vec!["Object b/ap/f.json does not exist", "Object b/us/f.json does not exist"]
        );
    }

    #[tokio::test]
    async fn test_stale_object_fails_with_offset() {
        let store = MemoryStore::new()
            .with_object("b", "orders/2025/03/09.json", 1, now() - Duration::days(3));
        let ctx = ctx(store);
        let mut item = item("orders/%Y/%m/%d.json");
        item.time_offset = Some(OffsetValue::Int(1));

        let findings = check_single(&ctx, &item).await;
        assert_eq!(findings.failures.len(), 1);
        assert!(findings.failures[0].contains("orders/2025/03/09.json"));
        assert!(findings.failures[0].contains("modified within"));
    }

    #[tokio::test]
    async fn test_fresh_object_passes_with_offset() {
        let store = MemoryStore::new()
            .with_object("b", "orders/2025/03/09.json", 1, now() - Duration::hours(2));
        let ctx = ctx(store);
        let mut item = item("orders/%Y/%m/%d.json");
        item.time_offset = Some(OffsetValue::Int(1));
        item.offset_type = Some("Daily".to_string());

        assert!(check_single(&ctx, &item).await.is_clean());
    }

    #[tokio::test]
    async fn test_offset_checks_every_var_combination() {
        let store = MemoryStore::new()
            .with_object("b", "eu/orders.json", 1, now() - Duration::hours(2))
            .with_object("b", "ap/orders.json", 1, now() - Duration::days(4));
        let ctx = ctx(store);
        let mut item = item("{region}/orders.json");
        item.path_vars = Some(PathVars::Named(
            [(
                "region".to_string(),
                vec!["eu".to_string(), "us".to_string(), "ap".to_string()],
            )]
            .into(),
        ));
        item.time_offset = Some(OffsetValue::Int(1));

        let findings = check_single(&ctx, &item).await;
        assert!(findings.exceptions.is_empty());
        assert_eq!(findings.failures.len(), 2);
        assert!(
            findings.failures[0]
                .starts_with("Object b/ap/orders.json was not modified within [2025-03-09T15:00:00+00:00")
        );
        assert_eq!(findings.failures[1], "Object b/us/orders.json does not exist");
    }

    #[tokio::test]
    async fn test_missing_key_with_offset_is_reported() {
        let ctx = ctx(MemoryStore::new().with_bucket("b"));
        let mut item = item("orders/%Y/%m/%d.json");
        item.time_offset = Some(OffsetValue::Int(1));

        let findings = check_single(&ctx, &item).await;
        assert_eq!(
            findings.failures,
            vec!["Object b/orders/2025/03/09.json does not exist"]
        );
    }

    #[tokio::test]
    async fn test_bad_offset_is_an_exception() {
        let ctx = ctx(MemoryStore::new().with_bucket("b"));
        let mut item = item("f.json");
        item.offset_type = Some("Fortnightly".to_string());

        let findings = check_single(&ctx, &item).await;
        assert!(findings.failures.is_empty());
        assert_eq!(findings.exceptions.len(), 1);
        assert!(findings.exceptions[0].starts_with("ConfigurationError"));
        assert!(findings.exceptions[0].contains("\"type\":\"full_path\""));
        assert!(findings.exceptions[0].contains("\"full_path_template\":\"f.json\""));
    }

    #[tokio::test]
    async fn test_store_error_keeps_earlier_failures() {
        let store = MemoryStore::new()
            .with_bucket("b")
            .with_fault("b", "z/", "connection reset");
        let ctx = ctx(store);
        let mut item = item("{p}/f.json");
        item.path_vars = Some(PathVars::Named(
            [("p".to_string(), vec!["a".to_string(), "z".to_string()])].into(),
        ));

        let findings = check_single(&ctx, &item).await;
        assert_eq!(findings.failures, vec!["Object b/a/f.json does not exist"]);
        assert_eq!(findings.exceptions.len(), 1);
        assert!(findings.exceptions[0].contains("connection reset"));
    }
}
