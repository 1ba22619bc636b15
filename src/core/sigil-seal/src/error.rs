//! Sealed value error types.

use thiserror::Error;

/// Errors that can occur while sealing or unsealing values.
#[derive(Debug, Error)]
pub enum SealError {
    /// The sealed bytes or text are malformed.
    #[error("invalid sealed value: {0}")]
    InvalidFormat(String),

    /// The sealed object could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Cryptographic error.
    #[error("crypto error: {0}")]
    Crypto(#[from] sigil_crypto::CryptoError),
}
