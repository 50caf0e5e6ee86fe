use chrono::{DateTime, TimeZone, Utc};
use std::collections::BTreeMap;
use watchmen_engine::{Offset, expand};
use watchmen_types::{Cadence, PathVars};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 2, 1, 15, 0).unwrap()
}

#[test]
fn test_span_feeds_template_across_month_boundary() {
    let offset = Offset::new(Cadence::Daily, 2).unwrap();
    let timestamps = offset.resolve_span(now()).unwrap();

    let prefixes = expand("events/%Y/%m/%d/", &timestamps, None).unwrap();
    let prefixes: Vec<_> = prefixes.into_iter().collect();
    assert_eq!(
        prefixes,
        vec!["events/2025/02/28/", "events/2025/03/01/", "events/2025/03/02/"]
    );
}

#[test]
fn test_cross_product_count_is_product_of_value_counts() {
    let vars = PathVars::Named(BTreeMap::from([
        ("region".to_string(), vec!["eu".into(), "us".into()]),
        ("tier".to_string(), vec!["a".into(), "b".into(), "c".into()]),
        ("fmt".to_string(), vec!["csv".into(), "json".into()]),
    ]));
    let map = vars.to_map();

    let timestamps = vec![now()];
    let paths = expand("{region}/{tier}/%Y%m%d.{fmt}", &timestamps, Some(&map)).unwrap();
    assert_eq!(paths.len(), 2 * 3 * 2);

    let two_days = Offset::new(Cadence::Daily, 1).unwrap().resolve_span(now()).unwrap();
    let paths = expand("{region}/{tier}/%Y%m%d.{fmt}", &two_days, Some(&map)).unwrap();
    assert_eq!(paths.len(), 2 * 2 * 3 * 2);
}

#[test]
fn test_bare_list_vars_expand_default_placeholder() {
    let vars = PathVars::List(vec!["alpha".into(), "beta".into()]).to_map();
    let paths = expand("feeds/{path_var}/latest.json", &[now()], Some(&vars)).unwrap();
    assert!(paths.contains("feeds/alpha/latest.json"));
    assert!(paths.contains("feeds/beta/latest.json"));
}
