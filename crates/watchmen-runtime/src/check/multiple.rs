use super::{CheckContext, CheckError, capture, kilobytes};
use std::collections::BTreeSet;
use watchmen_engine::{Offset, TimeWindow, expand_grouped};
use watchmen_store::{Lister, ObjectMeta};
use watchmen_types::{Findings, Item, OffsetSpec, PathVars, PrefixItem};

/// Check a prefix item.
///
/// Each combination of `path_vars` is judged on its own. With an offset the
/// date span expands to several prefixes per combination, and their objects
/// are pooled before judging, so data landing in any unit of the window
/// counts.
pub async fn check_multiple(ctx: &CheckContext, item: &PrefixItem) -> Findings {
    let mut findings = Findings::new();
    let result = evaluate(ctx, item, &mut findings).await;
    capture(&mut findings, result, || Item::Prefix(item.clone()).describe());
    findings
}

async fn evaluate(
    ctx: &CheckContext,
    item: &PrefixItem,
    findings: &mut Findings,
) -> Result<(), CheckError> {
    let spec = OffsetSpec {
        offset_type: item.offset_type.as_deref(),
        time_offset: item.time_offset.as_ref(),
    };
    let (timestamps, window) = match Offset::from_spec(spec, ctx.cadence)? {
        Some(offset) => (offset.resolve_span(ctx.now)?, Some(offset.window(ctx.now)?)),
        None => (vec![ctx.now], None),
    };
    let vars = item.path_vars.as_ref().map(PathVars::to_map);
    let groups = expand_grouped(&item.prefix_template, &timestamps, vars.as_ref())?;

    for prefixes in &groups {
        let mut objects = pooled(ctx, item, prefixes).await?;
        if let Some(window) = &window {
            objects.retain(|object| window.contains(object.last_modified));
        }
        let location = location(&item.bucket, prefixes);
        tracing::debug!(
            location = %location,
            objects = objects.len(),
            "listed prefixes"
        );
        judge(item, &location, &objects, window.as_ref(), findings);
    }

    Ok(())
}

/// Objects under every prefix of one group, in key order, capped at
/// `max_items` after whitelisting.
async fn pooled(
    ctx: &CheckContext,
    item: &PrefixItem,
    prefixes: &BTreeSet<String>,
) -> Result<Vec<ObjectMeta>, CheckError> {
    let limit = item.max_items.unwrap_or(usize::MAX);
    let mut objects = Vec::new();
    for prefix in prefixes {
        objects.extend(collect(ctx, item, prefix, limit).await?);
    }

    // Prefixes of one group can nest, e.g. hour tokens without a separator.
    objects.sort_by(|a, b| a.key.cmp(&b.key));
    objects.dedup_by(|a, b| a.key == b.key);
    objects.truncate(limit);
    Ok(objects)
}

/// List `prefix` page by page, skipping whitelisted keys and stopping once
/// `limit` objects have been kept.
async fn collect(
    ctx: &CheckContext,
    item: &PrefixItem,
    prefix: &str,
    limit: usize,
) -> Result<Vec<ObjectMeta>, CheckError> {
    let mut lister = Lister::new(ctx.store.as_ref(), &item.bucket, prefix, ctx.page_size);
    let mut kept = Vec::new();

    while kept.len() < limit {
        let Some(page) = lister.next_page().await? else {
            break;
        };
        let room = limit - kept.len();
        kept.extend(
            page.into_iter()
                .filter(|object| !item.is_whitelisted(&object.key))
                .take(room),
        );
    }

    Ok(kept)
}

fn location(bucket: &str, prefixes: &BTreeSet<String>) -> String {
    let paths: Vec<String> = prefixes
        .iter()
        .map(|prefix| format!("{}/{}", bucket, prefix))
        .collect();
    match paths.as_slice() {
        [single] => format!("prefix {}", single),
        _ => format!("prefixes {}", paths.join(", ")),
    }
}

fn judge(
    item: &PrefixItem,
    location: &str,
    objects: &[ObjectMeta],
    window: Option<&TimeWindow>,
    findings: &mut Findings,
) {
    if objects.is_empty() {
        match window {
            Some(window) => findings.push_failure(format!(
                "No files found under {} modified within {}",
                location, window
            )),
            None => findings.push_failure(format!("No files found under {}", location)),
        }
        return;
    }

    if let Some(suffix) = &item.suffix {
        let offending: Vec<&str> = objects
            .iter()
            .filter(|object| !object.key.ends_with(suffix.as_str()))
            .map(|object| object.key.as_str())
            .collect();
        if !offending.is_empty() {
            findings.push_failure(format!(
                "{} file(s) under {} do not end with '{}': {}",
                offending.len(),
                location,
                suffix,
                offending.join(", ")
            ));
        }
    }

    if let Some(min_kb) = item.min_total_size_kb {
        let total: u64 = objects.iter().map(|object| object.size).sum();
        if total < min_kb.saturating_mul(1024) {
            let mut message = format!(
                "Total size under {} is {} KB, below the required {} KB",
                location,
                kilobytes(total),
                min_kb
            );
            let empty: Vec<&str> = objects
                .iter()
                .filter(|object| object.size == 0)
                .map(|object| object.key.as_str())
                .collect();
            if !empty.is_empty() {
                message.push_str(&format!("; empty files: {}", empty.join(", ")));
            }
            findings.push_failure(message);
        }
    }

    if let Some(min_files) = item.min_total_files
        && objects.len() < min_files
    {
        findings.push_failure(format!(
            "Found {} file(s) under {}, expected at least {}",
            objects.len(),
            location,
            min_files
        ));
    }
}
