//! Error types for the polysign library

use thiserror::Error;

/// Custom error type for polysign operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or ambiguous request body, surfaced before any network call
    #[error("Validation error: {0}")]
    Validation(String),

    /// The request demands a capability the adapter or chain does not support
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Mnemonic error: {0}")]
    Mnemonic(String),

    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Failure of an underlying chain adapter or hosted service call,
    /// propagated unchanged
    #[error("Adapter failure: {0}")]
    Adapter(String),
}

impl Error {
    /// Wrap an arbitrary adapter-side failure
    pub fn adapter<E: std::fmt::Display>(err: E) -> Self {
        Self::Adapter(err.to_string())
    }
}

/// Result type for polysign operations
pub type Result<T> = std::result::Result<T, Error>;
