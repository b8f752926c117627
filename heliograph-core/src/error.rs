//! Error types for heliograph-core

use thiserror::Error;

/// Main error type for the heliograph-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Session store error
    #[error("session store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Backend client error
    #[error("backend client error: {0}")]
    Client(String),
}

/// Result type alias for heliograph-core
pub type Result<T> = std::result::Result<T, Error>;
