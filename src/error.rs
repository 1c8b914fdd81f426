//! S3 Console Error Types

use thiserror::Error;

/// Result type alias for console operations
pub type Result<T> = std::result::Result<T, Error>;

/// Console error types
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Configuration serialization error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    // Provider errors
    /// No usable storage client could be constructed from the environment
    #[error("Storage credentials not found. Please configure them.")]
    CredentialsUnavailable,

    /// The remote call failed; carries the provider's error text verbatim
    #[error("{0}")]
    Provider(String),

    // Request errors
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Network errors
    #[error("Network error: {0}")]
    Network(String),
}

impl Error {
    /// Check if this error means no client could be resolved
    pub fn is_credentials(&self) -> bool {
        matches!(self, Error::CredentialsUnavailable)
    }

    /// Check if this error was reported by the storage provider
    pub fn is_provider(&self) -> bool {
        matches!(self, Error::Provider(_))
    }
}

impl From<s3::error::S3Error> for Error {
    fn from(e: s3::error::S3Error) -> Self {
        Error::Provider(e.to_string())
    }
}
