//! Common error types for echotag

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for echotag operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors shared by the echotag crates
///
/// Component-specific failures (decoding, classification, fetching) have their
/// own error enums next to the component; this type covers the plumbing they
/// all sit on.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML configuration file could not be parsed
    #[error("Failed to parse {path}: {source}")]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// JSON (de)serialization of a stored document failed
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
