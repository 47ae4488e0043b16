//! Error types for binkv
//!
//! `CodecError` carries the two codec failure kinds. `BinKvError` is the
//! unified error for the built-in stores and configuration.

use thiserror::Error;

/// Result type alias using BinKvError
pub type Result<T> = std::result::Result<T, BinKvError>;

/// Failure of the value codec
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The primary format rejected the value and the fallback was disabled
    /// or rejected it too
    #[error("Encode error: {0}")]
    Encode(String),

    /// The primary format rejected the bytes and the fallback was disabled
    /// or rejected them too
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Unified error type for binkv operations
#[derive(Debug, Error)]
pub enum BinKvError {
    // -------------------------------------------------------------------------
    // Codec Errors
    // -------------------------------------------------------------------------
    #[error(transparent)]
    Codec(#[from] CodecError),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    /// Connection failure or error reply from the store
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
