use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Placeholder name bound by a bare `path_vars` list.
pub const DEFAULT_PATH_VAR: &str = "path_var";

/// A named monitored feed composed of one or more checkable items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Target {
    pub name: String,
    #[serde(default)]
    pub items: Vec<Item>,
}

/// One checkable unit of storage.
///
/// The variant decides the addressing mode, so an item can never carry both a
/// full path and a prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Item {
    FullPath(FullPathItem),
    Prefix(PrefixItem),
}

impl Item {
    pub fn bucket(&self) -> &str {
        match self {
            Item::FullPath(item) => &item.bucket,
            Item::Prefix(item) => &item.bucket,
        }
    }

    pub fn template(&self) -> &str {
        match self {
            Item::FullPath(item) => &item.full_path_template,
            Item::Prefix(item) => &item.prefix_template,
        }
    }

    pub fn offset(&self) -> OffsetSpec<'_> {
        match self {
            Item::FullPath(item) => OffsetSpec {
                offset_type: item.offset_type.as_deref(),
                time_offset: item.time_offset.as_ref(),
            },
            Item::Prefix(item) => OffsetSpec {
                offset_type: item.offset_type.as_deref(),
                time_offset: item.time_offset.as_ref(),
            },
        }
    }

    /// Item configuration rendered as compact JSON, used in exception text.
    pub fn describe(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}

/// A single fully addressed object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FullPathItem {
    pub bucket: String,
    #[serde(alias = "full_path")]
    pub full_path_template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_vars: Option<PathVars>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_offset: Option<OffsetValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_total_size_kb: Option<u64>,
}

/// A set of objects under a key prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrefixItem {
    pub bucket: String,
    #[serde(alias = "prefix")]
    pub prefix_template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_vars: Option<PathVars>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_total_size_kb: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_total_files: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub whitelist: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_offset: Option<OffsetValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_type: Option<String>,
}

impl PrefixItem {
    /// Whether `key` is excluded by the whitelist, either by full key or by
    /// its final path segment.
    pub fn is_whitelisted(&self, key: &str) -> bool {
        let file_name = key.rsplit('/').next().unwrap_or(key);
        self.whitelist
            .iter()
            .any(|entry| entry == key || entry == file_name)
    }
}

/// Values substituted into `{name}` placeholders of a path template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathVars {
    Named(BTreeMap<String, Vec<String>>),
    List(Vec<String>),
}

impl PathVars {
    pub fn to_map(&self) -> BTreeMap<String, Vec<String>> {
        match self {
            PathVars::Named(map) => map.clone(),
            PathVars::List(values) => {
                BTreeMap::from([(DEFAULT_PATH_VAR.to_string(), values.clone())])
            }
        }
    }
}

/// Raw `time_offset` as written in configuration.
///
/// Kept loose so that a malformed offset surfaces as an item-level
/// exception at check time instead of failing the whole configuration load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OffsetValue {
    Int(i64),
    Text(String),
}

impl std::fmt::Display for OffsetValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OffsetValue::Int(v) => write!(f, "{}", v),
            OffsetValue::Text(v) => write!(f, "{:?}", v),
        }
    }
}

/// Borrowed view of an item's offset declaration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetSpec<'a> {
    pub offset_type: Option<&'a str>,
    pub time_offset: Option<&'a OffsetValue>,
}

impl OffsetSpec<'_> {
    pub fn is_declared(&self) -> bool {
        self.offset_type.is_some() || self.time_offset.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefix_item(whitelist: &[&str]) -> PrefixItem {
        PrefixItem {
            bucket: "lake".to_string(),
            prefix_template: "events/".to_string(),
            path_vars: None,
            suffix: None,
            min_total_size_kb: None,
            min_total_files: None,
            max_items: None,
            whitelist: whitelist.iter().map(|s| s.to_string()).collect(),
            time_offset: None,
            offset_type: None,
        }
    }

    #[test]
    fn test_whitelist_matches_key_or_file_name() {
        let item = prefix_item(&["_SUCCESS", "events/manifest.json"]);
        assert!(item.is_whitelisted("events/2025/_SUCCESS"));
        assert!(item.is_whitelisted("events/manifest.json"));
        assert!(!item.is_whitelisted("events/part-0.parquet"));
        assert!(!item.is_whitelisted("events/not_SUCCESS"));
    }

    #[test]
    fn test_bare_path_vars_list_binds_default_placeholder() {
        let vars = PathVars::List(vec!["eu".to_string(), "us".to_string()]);
        let map = vars.to_map();
        assert_eq!(map.len(), 1);
        assert_eq!(map[DEFAULT_PATH_VAR], vec!["eu", "us"]);
    }

    #[test]
    fn test_offset_spec_declared() {
        let item = Item::Prefix(prefix_item(&[]));
        assert!(!item.offset().is_declared());

        let mut with_offset = prefix_item(&[]);
        with_offset.time_offset = Some(OffsetValue::Int(2));
        assert!(Item::Prefix(with_offset).offset().is_declared());
    }

    #[test]
    fn test_describe_is_json() {
        let item = Item::Prefix(prefix_item(&[]));
        let described = item.describe();
        assert!(described.contains(r#""type":"prefix""#));
        assert!(described.contains(r#""bucket":"lake""#));
    }
}
