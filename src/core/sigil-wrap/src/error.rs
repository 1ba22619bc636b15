//! Key wrapping error types.

use thiserror::Error;

/// Errors that can occur while wrapping or unwrapping keys.
#[derive(Debug, Error)]
pub enum WrapError {
    /// The unwrapped key is not the algorithm or kind the caller expected.
    #[error("unwrap mismatch: expected {expected}, found {found}")]
    UnwrapMismatch {
        /// Expected `algorithm/kind`.
        expected: String,
        /// Actual `algorithm/kind` recorded in the wrapped key.
        found: String,
    },

    /// The key cannot be used to wrap other keys.
    #[error("unsupported wrapping key: {0}")]
    UnsupportedWrappingKey(String),

    /// The wrapped bytes are malformed.
    #[error("invalid wrapped key: {0}")]
    InvalidWrappedKey(String),

    /// Cryptographic error.
    #[error("crypto error: {0}")]
    Crypto(#[from] sigil_crypto::CryptoError),
}
