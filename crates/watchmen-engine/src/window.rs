use crate::{Error, Result};
use chrono::{DateTime, Months, TimeDelta, Utc};
use std::time::Duration;
use watchmen_types::{Cadence, OffsetSpec, OffsetValue};

/// Upper bound on offset units, keeps span enumeration finite and small.
pub const MAX_OFFSET_UNITS: u32 = 10_000;

/// Offset used when an item names a cadence but no `time_offset`.
pub const DEFAULT_OFFSET_UNITS: u32 = 1;

/// A validated `(offset_type, time_offset)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offset {
    pub cadence: Cadence,
    pub units: u32,
}

/// Closed interval `[start, end]` of acceptable last-modified times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts <= self.end
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

impl Offset {
    pub fn new(cadence: Cadence, units: u32) -> Result<Self> {
        if units > MAX_OFFSET_UNITS {
            return Err(Error::Configuration(format!(
                "time_offset {} exceeds the maximum of {}",
                units, MAX_OFFSET_UNITS
            )));
        }
        Ok(Self { cadence, units })
    }

    /// Interpret an item's declaration, filling whichever half is missing.
    ///
    /// Returns `None` when the item declares no offset at all.
    pub fn from_spec(spec: OffsetSpec<'_>, run_cadence: Cadence) -> Result<Option<Self>> {
        if !spec.is_declared() {
            return Ok(None);
        }

        let cadence = match spec.offset_type {
            Some(name) => name.parse::<Cadence>().map_err(|_| {
                Error::Configuration(format!("unrecognized offset_type '{}'", name))
            })?,
            None => run_cadence,
        };

        let units = match spec.time_offset {
            Some(value) => parse_units(value)?,
            None => DEFAULT_OFFSET_UNITS,
        };

        Self::new(cadence, units).map(Some)
    }

    /// The single instant `units` cadence steps before `now`.
    pub fn resolve(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        step_back(self.cadence, self.units, now)
    }

    /// One instant per cadence step from `now` back to `resolve(now)`, newest first.
    pub fn resolve_span(&self, now: DateTime<Utc>) -> Result<Vec<DateTime<Utc>>> {
        (0..=self.units)
            .map(|step| step_back(self.cadence, step, now))
            .collect()
    }

    pub fn window(&self, now: DateTime<Utc>) -> Result<TimeWindow> {
        Ok(TimeWindow {
            start: self.resolve(now)?,
            end: now,
        })
    }
}

/// Convenience form of [`Offset::resolve`] taking raw parts.
pub fn resolve(cadence: Cadence, units: u32, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    Offset::new(cadence, units)?.resolve(now)
}

/// Convenience form of [`Offset::resolve_span`] taking raw parts.
pub fn resolve_span(
    cadence: Cadence,
    units: u32,
    now: DateTime<Utc>,
) -> Result<Vec<DateTime<Utc>>> {
    Offset::new(cadence, units)?.resolve_span(now)
}

/// How long a run triggered at `cadence` may take before the next one is due.
pub fn default_deadline(cadence: Cadence) -> Duration {
    let hours = match cadence {
        Cadence::Hourly => 1,
        Cadence::Daily => 24,
        Cadence::Weekly => 24 * 7,
        Cadence::Monthly => 24 * 28,
    };
    Duration::from_secs(hours * 3600)
}

fn parse_units(value: &OffsetValue) -> Result<u32> {
    let invalid = || {
        Error::Configuration(format!(
            "time_offset {} is not a non-negative integer",
            value
        ))
    };
    match value {
        OffsetValue::Int(v) => u32::try_from(*v).map_err(|_| invalid()),
        OffsetValue::Text(s) => s.trim().parse::<u32>().map_err(|_| invalid()),
    }
}

fn step_back(cadence: Cadence, units: u32, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let out_of_range =
        || Error::Configuration(format!("{} offset of {} is out of range", cadence, units));

    let units_i64 = i64::from(units);
    let resolved = match cadence {
        Cadence::Hourly => TimeDelta::try_hours(units_i64).and_then(|d| now.checked_sub_signed(d)),
        Cadence::Daily => TimeDelta::try_days(units_i64).and_then(|d| now.checked_sub_signed(d)),
        Cadence::Weekly => TimeDelta::try_weeks(units_i64).and_then(|d| now.checked_sub_signed(d)),
        Cadence::Monthly => now.checked_sub_months(Months::new(units)),
    };

    resolved.ok_or_else(out_of_range)
}
