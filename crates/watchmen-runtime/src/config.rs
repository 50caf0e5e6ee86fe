use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use watchmen_engine::default_deadline;
use watchmen_types::{Cadence, Target, Trigger};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "WATCHMEN_CONFIG";

/// Resolve the configuration file path based on priority:
/// 1. Explicit path (with tilde expansion)
/// 2. WATCHMEN_CONFIG environment variable (with tilde expansion)
/// 3. XDG config directory
/// 4. ~/.watchmen/config.toml
pub fn resolve_config_path(explicit_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(expand_tilde(path));
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        return Ok(expand_tilde(&env_path));
    }

    if let Some(config_dir) = dirs::config_dir() {
        return Ok(config_dir.join("watchmen").join("config.toml"));
    }

    if let Some(home) = std::env::var_os("HOME") {
        return Ok(PathBuf::from(home).join(".watchmen").join("config.toml"));
    }

    Err(Error::Config(
        "Could not determine config path: no HOME directory or XDG config directory found"
            .to_string(),
    ))
}

/// Expand tilde (~) in paths to the user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

fn default_concurrency() -> usize {
    4
}

fn default_page_size() -> usize {
    1000
}

fn default_generic_target() -> String {
    "generic".to_string()
}

/// Run-wide tunables. Built once per run and passed down explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Targets processed at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Items of one target processed at once.
    #[serde(default = "default_concurrency")]
    pub item_concurrency: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Overrides the cadence-derived run deadline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_secs: Option<u64>,
    #[serde(default = "default_generic_target")]
    pub generic_target: String,
    #[serde(default)]
    pub notify_on_success: bool,
    /// Root of the JSON result sink. Results are not persisted when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            item_concurrency: default_concurrency(),
            page_size: default_page_size(),
            deadline_secs: None,
            generic_target: default_generic_target(),
            notify_on_success: false,
            results_dir: None,
        }
    }
}

impl Settings {
    pub fn deadline(&self, cadence: Cadence) -> Duration {
        self.deadline_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| default_deadline(cadence))
    }
}

/// Notification routing: target name to topic, with a fallback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Topics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub targets: BTreeMap<String, String>,
}

/// Targets evaluated when a trigger with this cadence and slot arrives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Schedule {
    pub cadence: Cadence,
    pub at: String,
    #[serde(default)]
    pub targets: Vec<Target>,
}

impl Schedule {
    /// Compares canonical slots, so `"mon, 10:45"` and `"Mon,10:45"` match.
    pub fn matches(&self, trigger: &Trigger) -> bool {
        self.cadence == trigger.cadence
            && self
                .cadence
                .normalize_slot(&self.at)
                .is_ok_and(|at| at == trigger.slot)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub topics: Topics,
    #[serde(default)]
    pub schedules: Vec<Schedule>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::default_path()?;
        Self::load_from(&config_path)
    }

    /// Read, parse and validate a configuration file. A missing file is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Config(format!(
                "configuration file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        config.validate()?;
        for schedule in &mut config.schedules {
            schedule.at = schedule.cadence.normalize_slot(&schedule.at)?;
        }
        Ok(config)
    }

    pub fn default_path() -> Result<PathBuf> {
        resolve_config_path(None)
    }

    pub fn validate(&self) -> Result<()> {
        if self.settings.concurrency == 0 || self.settings.item_concurrency == 0 {
            return Err(Error::Config(
                "concurrency and item_concurrency must be at least 1".to_string(),
            ));
        }
        if self.settings.page_size == 0 {
            return Err(Error::Config("page_size must be at least 1".to_string()));
        }

        for schedule in &self.schedules {
            schedule.cadence.normalize_slot(&schedule.at)?;
            if let Some(target) = schedule.targets.iter().find(|t| t.name.trim().is_empty()) {
                return Err(Error::Config(format!(
                    "schedule {} {} has a target without a name ({} items)",
                    schedule.cadence,
                    schedule.at,
                    target.items.len()
                )));
            }
        }
        Ok(())
    }

    /// Targets of every schedule matching `trigger`, merged by name in
    /// first-seen order.
    pub fn targets_for(&self, trigger: &Trigger) -> Vec<Target> {
        let mut merged: Vec<Target> = Vec::new();
        for target in self
            .schedules
            .iter()
            .filter(|s| s.matches(trigger))
            .flat_map(|s| s.targets.iter())
        {
            match merged.iter_mut().find(|t| t.name == target.name) {
                Some(existing) => existing.items.extend(target.items.iter().cloned()),
                None => merged.push(target.clone()),
            }
        }
        merged
    }
}
