use std::fmt;

/// Result type for watchmen-engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types raised while resolving windows or expanding templates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Offset declaration cannot be interpreted
    Configuration(String),

    /// Path template is malformed or inconsistent with its variables
    Template(String),
}

impl Error {
    /// Short class name used in exception strings.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Configuration(_) => "ConfigurationError",
            Error::Template(_) => "TemplateError",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            Error::Template(msg) => write!(f, "Template error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<watchmen_types::Error> for Error {
    fn from(err: watchmen_types::Error) -> Self {
        Error::Configuration(err.to_string())
    }
}
