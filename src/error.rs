//! Error types for embedpy.

use thiserror::Error;

/// Result type alias for embedpy operations.
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Why a `config.ini` lookup failed.
///
/// The user-facing message is identical for every kind; the kind is kept
/// for callers and logs that want to tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorKind {
    /// The file, the section, or the `py_env` key is missing.
    NotFound,
    /// The key exists but holds an empty value.
    Empty,
    /// The file could not be read or parsed.
    Parse,
}

/// Errors that can occur while provisioning an environment.
#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("No python env in config.ini, check project name if in the config.ini")]
    Config(ConfigErrorKind),

    #[error("Response from {url} has no Content-Length header")]
    MissingContentLength { url: String },

    #[error("Response from {url} has an invalid Content-Length header: {value}")]
    InvalidContentLength { url: String, value: String },

    #[error("Failed to install pip. Error: {0}")]
    Bootstrap(String),

    #[error("Failed to install package '{package}'. Error: {message}")]
    Install { package: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl EmbedError {
    /// The config lookup failure kind, if this is a configuration error.
    pub fn config_kind(&self) -> Option<ConfigErrorKind> {
        match self {
            Self::Config(kind) => Some(*kind),
            _ => None,
        }
    }
}
