//! Item checks: expand an item into concrete keys or prefixes and evaluate
//! them against the object store.
//!
//! Checkers never return errors. Anything that goes wrong while evaluating an
//! item becomes an exception string carrying the item's configuration, and
//! any failures found before that point are kept.

mod multiple;
mod single;

pub use multiple::check_multiple;
pub use single::check_single;

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use watchmen_store::ObjectStore;
use watchmen_types::{Cadence, Findings};

/// What every check needs from the run: the store, the reference time and
/// the cadence used when an item leaves `offset_type` out.
#[derive(Clone)]
pub struct CheckContext {
    pub store: Arc<dyn ObjectStore>,
    pub now: DateTime<Utc>,
    pub cadence: Cadence,
    pub page_size: usize,
}

impl fmt::Debug for CheckContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckContext")
            .field("store", &self.store.name())
            .field("now", &self.now)
            .field("cadence", &self.cadence)
            .field("page_size", &self.page_size)
            .finish()
    }
}

/// Error raised while evaluating one item.
#[derive(Debug)]
pub enum CheckError {
    /// Offset or template problem in the item's configuration
    Engine(watchmen_engine::Error),

    /// Store call failed
    Store(watchmen_store::Error),
}

impl CheckError {
    /// Error class named in exception strings.
    pub fn kind(&self) -> &'static str {
        match self {
            CheckError::Engine(err) => err.kind(),
            CheckError::Store(err) => err.kind(),
        }
    }
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckError::Engine(err) => write!(f, "{}", err),
            CheckError::Store(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for CheckError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CheckError::Engine(err) => Some(err),
            CheckError::Store(err) => Some(err),
        }
    }
}

impl From<watchmen_engine::Error> for CheckError {
    fn from(err: watchmen_engine::Error) -> Self {
        CheckError::Engine(err)
    }
}

impl From<watchmen_store::Error> for CheckError {
    fn from(err: watchmen_store::Error) -> Self {
        CheckError::Store(err)
    }
}

pub(crate) fn exception_string(item: &str, err: &CheckError) -> String {
    format!("{} while checking item {}: {}", err.kind(), item, err)
}

/// Record `result`'s error, if any, as an exception on `findings`.
/// `describe` renders the item's configuration and only runs on error.
pub(crate) fn capture(
    findings: &mut Findings,
    result: std::result::Result<(), CheckError>,
    describe: impl FnOnce() -> String,
) {
    if let Err(err) = result {
        tracing::warn!(error = %err, kind = err.kind(), "item check raised an exception");
        findings.push_exception(exception_string(&describe(), &err));
    }
}

/// Kilobytes with two decimals, as used in size failure messages.
pub(crate) fn kilobytes(bytes: u64) -> String {
    format!("{:.2}", bytes as f64 / 1024.0)
}
