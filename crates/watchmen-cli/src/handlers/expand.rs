use crate::args::ExpandArgs;
use anyhow::Result;
use chrono::Utc;
use std::collections::BTreeMap;
use watchmen_engine::{Offset, expand};
use watchmen_types::DEFAULT_PATH_VAR;

pub fn handle(args: ExpandArgs) -> Result<i32> {
    let now = args.now.unwrap_or_else(Utc::now);

    let timestamps = match (args.cadence, args.offset) {
        (Some(cadence), Some(units)) => {
            let offset = Offset::new(cadence, units)?;
            if args.span {
                offset.resolve_span(now)?
            } else {
                vec![offset.resolve(now)?]
            }
        }
        _ => vec![now],
    };

    let vars = parse_vars(&args.vars);
    let vars = (!vars.is_empty()).then_some(vars);
    for key in expand(&args.template, &timestamps, vars.as_ref())? {
        println!("{}", key);
    }

    Ok(0)
}

/// `name=v1,v2` binds `{name}`; a bare `v1,v2` binds the default placeholder.
fn parse_vars(raw: &[String]) -> BTreeMap<String, Vec<String>> {
    let mut vars: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for entry in raw {
        let (name, values) = entry
            .split_once('=')
            .unwrap_or((DEFAULT_PATH_VAR, entry.as_str()));
        vars.entry(name.trim().to_string()).or_default().extend(
            values
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
        );
    }
    vars
}
