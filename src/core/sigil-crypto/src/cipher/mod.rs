//! # Cipher engine
//!
//! Symmetric (AES, DES, DESede) and asymmetric (RSA) encryption driven through
//! a [`CipherSession`]:
//!
//! ```text
//! Uninitialized --init--> Initialized --update--> Accumulating --finalize--> Finalized
//!                                    \-----------------finalize-----------/
//! ```
//!
//! [`encrypt`] and [`decrypt`] compose `init`, one `update` and `finalize`.
//! The [`stream`] adapters drive a session from `Read`/`Write` in bounded chunks.

mod asymmetric;
mod block;
mod session;
mod spec;
pub mod stream;

use zeroize::Zeroizing;

pub use session::{CipherSession, SessionState};
pub use spec::{
    AlgorithmParameters, AlgorithmSpec, CipherAlgorithm, Direction, Mode, Padding, Transformation,
};

use crate::algorithm::{KeyAlgorithm, KeyKind};
use crate::error::CryptoError;
use crate::keys::KeyMaterial;

/// Algorithm-specific half of a session.
pub(crate) trait CipherCore: Send {
    fn update(&mut self, input: &[u8]) -> Result<Vec<u8>, CryptoError>;
    fn finalize(&mut self) -> Result<Vec<u8>, CryptoError>;
}

/// Builds session cores for one transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherFactory {
    transformation: Transformation,
}

/// Looks up the engine for a transformation.
///
/// Transformations are validated when parsed, so resolution cannot fail.
pub fn resolve(transformation: &Transformation) -> CipherFactory {
    CipherFactory {
        transformation: *transformation,
    }
}

impl CipherFactory {
    /// Transformation this factory builds.
    pub fn transformation(&self) -> &Transformation {
        &self.transformation
    }

    /// Key algorithm the engine accepts.
    pub fn key_algorithm(&self) -> KeyAlgorithm {
        self.transformation.algorithm().key_algorithm()
    }

    /// Block size in bytes, `None` for RSA.
    pub fn block_size(&self) -> Option<usize> {
        self.transformation.algorithm().block_size()
    }

    pub(crate) fn create(
        &self,
        direction: Direction,
        key: &KeyMaterial,
        parameters: Option<&AlgorithmParameters>,
    ) -> Result<(Box<dyn CipherCore>, Option<AlgorithmParameters>), CryptoError> {
        key.expect_algorithm(self.key_algorithm())?;

        match self.transformation.algorithm() {
            CipherAlgorithm::Rsa => {
                if parameters.is_some() {
                    return Err(CryptoError::InvalidParameters(
                        "RSA does not take mode parameters".into(),
                    ));
                }
                let core =
                    asymmetric::RsaCore::new(key, direction, self.transformation.padding())?;
                Ok((Box::new(core), None))
            },
            _ => {
                if key.kind() != KeyKind::Secret {
                    return Err(CryptoError::KeyAlgorithmMismatch(format!(
                        "{} requires a secret key",
                        self.transformation
                    )));
                }
                let (core, parameters) = block::BlockCore::new(
                    &self.transformation,
                    direction,
                    key.secret_bytes()?,
                    parameters,
                )?;
                Ok((Box::new(core), parameters))
            },
        }
    }
}

/// Creates a session already bound to `key` and `spec`.
pub fn init(
    direction: Direction,
    key: &KeyMaterial,
    spec: &AlgorithmSpec,
) -> Result<CipherSession, CryptoError> {
    let mut session = CipherSession::new();
    session.init(direction, key, spec)?;
    Ok(session)
}

/// Result of a one-shot encryption.
#[derive(Debug, Clone)]
pub struct CipherOutput {
    /// Ciphertext.
    pub bytes: Vec<u8>,
    /// Parameters needed to decrypt, including a generated IV.
    pub parameters: Option<AlgorithmParameters>,
}

/// Encrypts `data` in one call.
pub fn encrypt(
    key: &KeyMaterial,
    spec: &AlgorithmSpec,
    data: &[u8],
) -> Result<CipherOutput, CryptoError> {
    let mut session = init(Direction::Encrypt, key, spec)?;
    let mut bytes = session.update(data)?;
    bytes.extend(session.finalize()?);

    Ok(CipherOutput {
        bytes,
        parameters: session.parameters().cloned(),
    })
}

/// Decrypts `data` in one call.
///
/// `spec.parameters` must carry the IV returned by the encrypting side.
pub fn decrypt(
    key: &KeyMaterial,
    spec: &AlgorithmSpec,
    data: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let mut session = init(Direction::Decrypt, key, spec)?;
    let mut plaintext = Zeroizing::new(session.update(data)?);
    plaintext.extend(session.finalize()?);
    Ok(plaintext)
}
