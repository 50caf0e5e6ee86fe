use anyhow::{Context, Result};
use watchmen_runtime::{Config, resolve_config_path};

pub fn handle_check(config: Option<&str>) -> Result<i32> {
    let path = resolve_config_path(config)?;
    let config = Config::load_from(&path)
        .with_context(|| format!("Invalid configuration at {}", path.display()))?;

    println!("Configuration OK: {}", path.display());
    println!(
        "Settings: concurrency={} item_concurrency={} page_size={} generic_target={}",
        config.settings.concurrency,
        config.settings.item_concurrency,
        config.settings.page_size,
        config.settings.generic_target
    );

    if config.schedules.is_empty() {
        println!("No schedules defined.");
        return Ok(0);
    }

    for schedule in &config.schedules {
        let names: Vec<&str> = schedule.targets.iter().map(|t| t.name.as_str()).collect();
        let items: usize = schedule.targets.iter().map(|t| t.items.len()).sum();
        println!(
            "  {} {}: {} target(s), {} item(s) [{}]",
            schedule.cadence,
            schedule.at,
            names.len(),
            items,
            names.join(", ")
        );
    }

    Ok(0)
}
