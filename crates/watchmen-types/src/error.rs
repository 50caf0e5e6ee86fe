use std::fmt;

/// Result type for watchmen-types operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the types layer
#[derive(Debug)]
pub enum Error {
    /// Event payload is not valid JSON
    Json(serde_json::Error),

    /// Event parsed but does not describe a known trigger
    InvalidEvent(String),

    /// Cadence name is not one of Hourly/Daily/Weekly/Monthly
    UnknownCadence(String),

    /// Slot string does not match the cadence's format
    InvalidSlot { cadence: String, slot: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Json(err) => write!(f, "Event is not valid JSON: {}", err),
            Error::InvalidEvent(msg) => write!(f, "Invalid event: {}", msg),
            Error::UnknownCadence(name) => write!(
                f,
                "Unknown cadence '{}' (expected Hourly, Daily, Weekly or Monthly)",
                name
            ),
            Error::InvalidSlot { cadence, slot } => {
                write!(f, "Invalid {} slot '{}'", cadence, slot)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Json(err) => Some(err),
            Error::InvalidEvent(_) | Error::UnknownCadence(_) | Error::InvalidSlot { .. } => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}
