use crate::{Error, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use regex::{Captures, Regex};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

/// Names of every `{name}` placeholder referenced by `template`.
pub fn placeholders(template: &str) -> BTreeSet<String> {
    PLACEHOLDER_REGEX
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Expand a path template into concrete keys.
///
/// Date tokens (`%Y`, `%m`, `%d`, ...) are rendered once per timestamp and
/// every `{name}` placeholder is substituted with every value in `vars`, so
/// the result is the cross product of both. Duplicates collapse.
pub fn expand(
    template: &str,
    timestamps: &[DateTime<Utc>],
    vars: Option<&BTreeMap<String, Vec<String>>>,
) -> Result<BTreeSet<String>> {
    Ok(expand_grouped(template, timestamps, vars)?
        .into_iter()
        .flatten()
        .collect())
}

/// Expand a path template keeping each variable combination apart.
///
/// Returns one set per assignment of `vars`, holding that assignment's path
/// for every timestamp. Without variables there is exactly one group.
pub fn expand_grouped(
    template: &str,
    timestamps: &[DateTime<Utc>],
    vars: Option<&BTreeMap<String, Vec<String>>>,
) -> Result<Vec<BTreeSet<String>>> {
    let empty = BTreeMap::new();
    let vars = vars.unwrap_or(&empty);
    check_vars(template, vars)?;

    let items = parse_date_tokens(template)?;
    let dated: Vec<String> = timestamps
        .iter()
        .map(|ts| ts.format_with_items(items.iter()).to_string())
        .collect();

    Ok(combinations(vars)
        .iter()
        .map(|combination| {
            dated
                .iter()
                .map(|path| substitute(path, combination))
                .collect()
        })
        .collect())
}

fn check_vars(template: &str, vars: &BTreeMap<String, Vec<String>>) -> Result<()> {
    let referenced = placeholders(template);

    if let Some(missing) = referenced.iter().find(|name| !vars.contains_key(*name)) {
        return Err(Error::Template(format!(
            "template '{}' references undeclared variable '{}'",
            template, missing
        )));
    }

    for (name, values) in vars {
        if !referenced.contains(name) {
            return Err(Error::Template(format!(
                "variable '{}' is never referenced by template '{}'",
                name, template
            )));
        }
        if values.is_empty() {
            return Err(Error::Template(format!("variable '{}' has no values", name)));
        }
    }

    Ok(())
}

fn parse_date_tokens(template: &str) -> Result<Vec<Item<'_>>> {
    let items: Vec<Item<'_>> = StrftimeItems::new(template).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(Error::Template(format!(
            "template '{}' contains an invalid date token",
            template
        )));
    }
    Ok(items)
}

/// Every assignment of one value per variable. A single empty assignment
/// when there are no variables.
fn combinations(vars: &BTreeMap<String, Vec<String>>) -> Vec<BTreeMap<&str, &str>> {
    let mut acc = vec![BTreeMap::new()];
    for (name, values) in vars {
        let mut next = Vec::with_capacity(acc.len() * values.len());
        for partial in &acc {
            for value in values {
                let mut extended = partial.clone();
                extended.insert(name.as_str(), value.as_str());
                next.push(extended);
            }
        }
        acc = next;
    }
    acc
}

fn substitute(path: &str, assignment: &BTreeMap<&str, &str>) -> String {
    PLACEHOLDER_REGEX
        .replace_all(path, |caps: &Captures<'_>| {
            assignment
                .get(&caps[1])
                .map(|v| v.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
