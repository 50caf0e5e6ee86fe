use std::fmt;

/// Result type for watchmen-store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while talking to an object store
#[derive(Debug)]
pub enum Error {
    /// IO operation failed
    Io(std::io::Error),

    /// Object metadata was requested for a key that does not exist
    NotFound { bucket: String, key: String },

    /// Key cannot be mapped onto the backend (e.g. escapes the bucket)
    InvalidKey(String),

    /// Backend reported an error (network, throttling, malformed response)
    Backend(String),
}

impl Error {
    /// Short class name used in exception strings.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Io(_) => "IoError",
            Error::NotFound { .. } => "NotFound",
            Error::InvalidKey(_) => "InvalidKey",
            Error::Backend(_) => "BackendError",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::NotFound { bucket, key } => write!(f, "Object not found: {}/{}", bucket, key),
            Error::InvalidKey(key) => write!(f, "Invalid key: {}", key),
            Error::Backend(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::NotFound { .. } | Error::InvalidKey(_) | Error::Backend(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::Io(err.into())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Backend(format!("background task failed: {}", err))
    }
}
