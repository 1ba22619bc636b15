//! RSA encryption engine.
//!
//! RSA is not a streaming cipher: `update` only accumulates, and `finalize`
//! performs the single public or private key operation over everything fed.

use rand::rngs::OsRng;
use rsa::{Oaep, Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use sha2::Sha256;
use zeroize::Zeroizing;

use super::spec::{Direction, Padding};
use super::CipherCore;
use crate::error::CryptoError;
use crate::keys::KeyMaterial;

enum RsaKey {
    Public(RsaPublicKey),
    Private(RsaPrivateKey),
}

/// Session core for RSA.
pub(crate) struct RsaCore {
    key: RsaKey,
    padding: Padding,
    buffer: Zeroizing<Vec<u8>>,
}

impl RsaCore {
    /// Encryption uses the public half of `key`; decryption requires the private key.
    pub(crate) fn new(
        key: &KeyMaterial,
        direction: Direction,
        padding: Padding,
    ) -> Result<Self, CryptoError> {
        let rsa_key = match direction {
            Direction::Encrypt => key.rsa_public().map(RsaKey::Public),
            _ => key.rsa_private().cloned().map(RsaKey::Private),
        };
        let key = rsa_key.ok_or_else(|| {
            CryptoError::KeyAlgorithmMismatch(format!(
                "RSA {direction:?} cannot use a {} {} key",
                key.algorithm(),
                key.kind()
            ))
        })?;

        Ok(Self {
            key,
            padding,
            buffer: Zeroizing::new(Vec::new()),
        })
    }
}

fn encrypt_with(key: &RsaPublicKey, padding: Padding, msg: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut rng = OsRng;
    let result = match padding {
        Padding::Pkcs1 => key.encrypt(&mut rng, Pkcs1v15Encrypt, msg),
        Padding::OaepSha1 => key.encrypt(&mut rng, Oaep::new::<Sha1>(), msg),
        Padding::OaepSha256 => key.encrypt(&mut rng, Oaep::new::<Sha256>(), msg),
        other => {
            return Err(CryptoError::UnsupportedTransformation(format!(
                "RSA does not support {other:?}"
            )));
        },
    };

    result.map_err(|e| match e {
        rsa::Error::MessageTooLong => CryptoError::InvalidInput(format!(
            "{} byte message is too long for this RSA key and padding",
            msg.len()
        )),
        other => CryptoError::EncryptionFailed(other.to_string()),
    })
}

fn decrypt_with(
    key: &RsaPrivateKey,
    padding: Padding,
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    use rsa::traits::PublicKeyParts;

    if ciphertext.len() != key.size() {
        return Err(CryptoError::InvalidInput(format!(
            "RSA ciphertext must be {} bytes, got {}",
            key.size(),
            ciphertext.len()
        )));
    }

    let result = match padding {
        Padding::Pkcs1 => key.decrypt(Pkcs1v15Encrypt, ciphertext),
        Padding::OaepSha1 => key.decrypt(Oaep::new::<Sha1>(), ciphertext),
        Padding::OaepSha256 => key.decrypt(Oaep::new::<Sha256>(), ciphertext),
        other => {
            return Err(CryptoError::UnsupportedTransformation(format!(
                "RSA does not support {other:?}"
            )));
        },
    };

    result.map_err(|_| CryptoError::DecryptionFailed("RSA decryption failed".into()))
}

impl CipherCore for RsaCore {
    fn update(&mut self, input: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.buffer.extend_from_slice(input);
        Ok(Vec::new())
    }

    fn finalize(&mut self) -> Result<Vec<u8>, CryptoError> {
        let input = std::mem::take(&mut *self.buffer);
        let input = Zeroizing::new(input);

        match &self.key {
            RsaKey::Public(key) => encrypt_with(key, self.padding, &input),
            RsaKey::Private(key) => decrypt_with(key, self.padding, &input),
        }
    }
}
