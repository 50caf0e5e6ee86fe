use crate::{Error, Result};
use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Scheduling granularity of a run, also used as the unit of item offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Cadence {
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

impl Cadence {
    pub const ALL: [Cadence; 4] = [
        Cadence::Hourly,
        Cadence::Daily,
        Cadence::Weekly,
        Cadence::Monthly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Cadence::Hourly => "Hourly",
            Cadence::Daily => "Daily",
            Cadence::Weekly => "Weekly",
            Cadence::Monthly => "Monthly",
        }
    }

    /// Validate `slot` for this cadence and return its canonical form.
    ///
    /// Hourly slots are a two-digit minute (`"05"`), Daily slots are `HH:MM`,
    /// Weekly slots are `Ddd,HH:MM` and Monthly slots are `DD,HH:MM`.
    /// Surrounding whitespace, one-digit fields and any weekday spelling
    /// chrono understands are accepted and rewritten, so `"mon, 9:05"`
    /// becomes `"Mon,09:05"`.
    pub fn normalize_slot(&self, slot: &str) -> Result<String> {
        let canonical = match self {
            Cadence::Hourly => small_number(slot)
                .filter(|m| *m < 60)
                .map(|m| format!("{:02}", m)),
            Cadence::Daily => clock(slot),
            Cadence::Weekly => slot.split_once(',').and_then(|(day, time)| {
                let day = day.trim().parse::<Weekday>().ok()?;
                Some(format!("{},{}", day, clock(time)?))
            }),
            Cadence::Monthly => slot.split_once(',').and_then(|(day, time)| {
                let day = small_number(day).filter(|d| (1..=31).contains(d))?;
                Some(format!("{:02},{}", day, clock(time)?))
            }),
        };

        canonical.ok_or_else(|| Error::InvalidSlot {
            cadence: self.to_string(),
            slot: slot.to_string(),
        })
    }
}

/// One or two plain digits.
fn small_number(value: &str) -> Option<u32> {
    let value = value.trim();
    if value.is_empty() || value.len() > 2 || !value.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

fn clock(value: &str) -> Option<String> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .ok()
        .map(|time| time.format("%H:%M").to_string())
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cadence {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Cadence::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownCadence(s.to_string()))
    }
}

/// The cadence descriptor carried by an invocation event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub cadence: Cadence,
    pub slot: String,
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "Type")]
    kind: BTreeMap<String, serde_json::Value>,
}

impl Trigger {
    /// Build a trigger holding the canonical form of `slot`.
    pub fn new(cadence: Cadence, slot: &str) -> Result<Self> {
        let slot = cadence.normalize_slot(slot)?;
        Ok(Self { cadence, slot })
    }

    /// Parse an event such as `{"Type": {"Daily": "15:00"}}`.
    pub fn from_event_str(event: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(event)?;
        Self::from_event_value(&value)
    }

    pub fn from_event_value(event: &serde_json::Value) -> Result<Self> {
        let raw: RawEvent = serde_json::from_value(event.clone())
            .map_err(|e| Error::InvalidEvent(format!("expected a 'Type' object ({})", e)))?;

        let mut entries = raw.kind.into_iter();
        let (name, slot) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            (None, _) => return Err(Error::InvalidEvent("'Type' is empty".to_string())),
            (Some(_), Some(_)) => {
                return Err(Error::InvalidEvent(
                    "'Type' must name exactly one cadence".to_string(),
                ));
            }
        };

        let cadence: Cadence = name.parse()?;
        let slot = slot.as_str().ok_or_else(|| {
            Error::InvalidEvent(format!("{} slot must be a string, got {}", cadence, slot))
        })?;

        Self::new(cadence, slot)
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.cadence, self.slot)
    }
}
