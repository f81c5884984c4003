//! Error types for the docchat pipeline

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Search service error: {0}")]
    SearchError(String),

    #[error("Completion service error: {0}")]
    CompletionError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}
