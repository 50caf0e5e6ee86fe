use std::fmt;

/// Result type for watchmen-runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the runtime layer
#[derive(Debug)]
pub enum Error {
    /// Object store layer error
    Store(watchmen_store::Error),

    /// Event or cadence error from the types layer
    Types(watchmen_types::Error),

    /// IO operation failed
    Io(std::io::Error),

    /// Configuration error
    Config(String),

    /// Notification delivery failed
    Notify(String),

    /// Result persistence failed
    Persist(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Store(err) => write!(f, "Store error: {}", err),
            Error::Types(err) => write!(f, "{}", err),
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Notify(msg) => write!(f, "Notification error: {}", msg),
            Error::Persist(msg) => write!(f, "Persistence error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Store(err) => Some(err),
            Error::Types(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Config(_) | Error::Notify(_) | Error::Persist(_) => None,
        }
    }
}

impl From<watchmen_store::Error> for Error {
    fn from(err: watchmen_store::Error) -> Self {
        Error::Store(err)
    }
}

impl From<watchmen_types::Error> for Error {
    fn from(err: watchmen_types::Error) -> Self {
        Error::Types(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Persist(err.to_string())
    }
}
