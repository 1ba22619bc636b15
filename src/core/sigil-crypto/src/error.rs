//! Cryptographic error types.

use thiserror::Error;

/// Errors that can occur during cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The algorithm/mode/padding combination is not implemented.
    #[error("unsupported transformation: {0}")]
    UnsupportedTransformation(String),

    /// The key cannot be used with the requested algorithm or direction.
    #[error("key algorithm mismatch: {0}")]
    KeyAlgorithmMismatch(String),

    /// Key components or key size are invalid.
    #[error("invalid key spec: {0}")]
    InvalidKeySpec(String),

    /// Padding bytes were malformed after decryption.
    #[error("padding validation failed")]
    PaddingValidationError,

    /// An operation was called out of sequence on a stateful session.
    #[error("session state error: {0}")]
    SessionStateError(String),

    /// Mode parameters (IV) are missing or malformed.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Invalid input data.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Key generation failed.
    #[error("key generation failed: {0}")]
    KeyGenerationFailed(String),

    /// Encryption failed.
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed.
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// Signature creation failed.
    #[error("signature creation failed: {0}")]
    SignatureFailed(String),

    /// Reading from a source or writing to a sink failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
