//! AES-GCM authenticated encryption.
//!
//! Used by the key wrapping layer to protect serialized key material under an
//! AES key. The key size (16, 24 or 32 bytes) selects AES-128, AES-192 or
//! AES-256.

use aes_gcm::{
    aead::{consts::U12, Aead, KeyInit, Payload},
    Aes128Gcm, Aes256Gcm, AesGcm, Nonce,
};
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::random::generate_nonce;

type Aes192Gcm = AesGcm<aes::Aes192, U12>;

/// Size of a GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// Size of a GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

fn seal_with<C: Aead + KeyInit>(
    key: &[u8],
    nonce: &[u8; NONCE_SIZE],
    payload: Payload<'_, '_>,
) -> Result<Vec<u8>, CryptoError> {
    let cipher = C::new_from_slice(key).map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
    cipher
        .encrypt(Nonce::from_slice(nonce), payload)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))
}

fn open_with<C: Aead + KeyInit>(
    key: &[u8],
    nonce: &[u8],
    payload: Payload<'_, '_>,
) -> Result<Vec<u8>, CryptoError> {
    let cipher = C::new_from_slice(key).map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;
    cipher
        .decrypt(Nonce::from_slice(nonce), payload)
        .map_err(|_| CryptoError::DecryptionFailed("authentication failed".to_string()))
}

fn check_key_len(key: &[u8]) -> Result<(), CryptoError> {
    match key.len() {
        16 | 24 | 32 => Ok(()),
        n => Err(CryptoError::InvalidKeySpec(format!(
            "AES-GCM key must be 16, 24 or 32 bytes, got {n}"
        ))),
    }
}

/// Encrypts plaintext using AES-GCM.
///
/// The nonce is automatically generated and prepended to the ciphertext.
/// Format: `nonce (12 bytes) || ciphertext || tag (16 bytes)`
///
/// # Arguments
///
/// * `key` - 16, 24 or 32-byte encryption key
/// * `plaintext` - Data to encrypt
/// * `associated_data` - Optional additional data to authenticate (not encrypted)
pub fn encrypt(
    key: &[u8],
    plaintext: &[u8],
    associated_data: Option<&[u8]>,
) -> Result<Vec<u8>, CryptoError> {
    check_key_len(key)?;

    let nonce = generate_nonce();
    let payload = Payload {
        msg: plaintext,
        aad: associated_data.unwrap_or_default(),
    };

    let ciphertext = match key.len() {
        16 => seal_with::<Aes128Gcm>(key, &nonce, payload)?,
        24 => seal_with::<Aes192Gcm>(key, &nonce, payload)?,
        _ => seal_with::<Aes256Gcm>(key, &nonce, payload)?,
    };

    let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(&nonce);
    result.extend_from_slice(&ciphertext);

    Ok(result)
}

/// Decrypts ciphertext produced by [`encrypt`].
///
/// Returns the plaintext wrapped in `Zeroizing`. Any tampering with the
/// ciphertext, nonce or associated data fails with `DecryptionFailed`.
pub fn decrypt(
    key: &[u8],
    ciphertext: &[u8],
    associated_data: Option<&[u8]>,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    check_key_len(key)?;

    if ciphertext.len() < NONCE_SIZE + TAG_SIZE {
        return Err(CryptoError::InvalidInput(
            "ciphertext too short".to_string(),
        ));
    }

    let (nonce, encrypted) = ciphertext.split_at(NONCE_SIZE);
    let payload = Payload {
        msg: encrypted,
        aad: associated_data.unwrap_or_default(),
    };

    let plaintext = match key.len() {
        16 => open_with::<Aes128Gcm>(key, nonce, payload)?,
        24 => open_with::<Aes192Gcm>(key, nonce, payload)?,
        _ => open_with::<Aes256Gcm>(key, nonce, payload)?,
    };

    Ok(Zeroizing::new(plaintext))
}
