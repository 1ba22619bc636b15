//! # Sigil Key Wrapping
//!
//! Encrypts one key under another so it can be stored or transported without
//! exposing its raw bytes.
//!
//! ## Schemes
//!
//! The scheme is chosen by the wrapping key:
//!
//! | Wrapping key   | Scheme                                                  |
//! |----------------|---------------------------------------------------------|
//! | AES            | AES-GCM, wrapping key algorithm bound as associated data |
//! | DES, DESede    | CBC with PKCS#5 padding and a fresh IV                  |
//! | RSA            | AES-256-GCM under an ephemeral key, itself RSA-OAEP (SHA-1) encrypted |
//!
//! ## Wrapped Format
//!
//! `scheme (1) || scheme body`. The plaintext inside every scheme is a key
//! envelope recording the wrapped key's algorithm and kind, so unwrapping
//! needs no extra input and can report [`WrapError::UnwrapMismatch`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod envelope;
pub mod error;

pub use error::WrapError;

use sigil_crypto::cipher::{self, AlgorithmSpec, CipherAlgorithm, Direction, Mode, Padding};
use sigil_crypto::{aead, KeyAlgorithm, KeyKind, KeyMaterial, Transformation};
use tracing::debug;
use zeroize::Zeroizing;

const SCHEME_AES_GCM: u8 = 1;
const SCHEME_BLOCK_CBC: u8 = 2;
const SCHEME_RSA_HYBRID: u8 = 3;

const RSA_TRANSFORMATION: &str = "RSA/ECB/OAEPWithSHA-1AndMGF1Padding";

/// A freshly generated key together with its wrapped form.
#[derive(Debug, Clone)]
pub struct DataKey {
    /// Plaintext key for immediate use.
    pub key: KeyMaterial,
    /// The same key wrapped under the wrapping key, for storage.
    pub wrapped: Vec<u8>,
}

fn describe(algorithm: KeyAlgorithm, kind: KeyKind) -> String {
    format!("{algorithm}/{kind}")
}

fn aad(wrapping_algorithm: KeyAlgorithm) -> Vec<u8> {
    format!("sigil-wrap:v1:{wrapping_algorithm}").into_bytes()
}

fn cbc_spec(algorithm: KeyAlgorithm) -> Result<AlgorithmSpec, WrapError> {
    let cipher_algorithm = match algorithm {
        KeyAlgorithm::Des => CipherAlgorithm::Des,
        KeyAlgorithm::DesEde => CipherAlgorithm::DesEde,
        other => {
            return Err(WrapError::UnsupportedWrappingKey(format!(
                "{other} has no CBC wrapping scheme"
            )));
        },
    };
    let transformation = Transformation::new(cipher_algorithm, Mode::Cbc, Padding::Pkcs5)?;
    Ok(AlgorithmSpec::new(transformation))
}

fn scheme_for(wrapping_key: &KeyMaterial) -> Result<u8, WrapError> {
    match (wrapping_key.algorithm(), wrapping_key.kind()) {
        (KeyAlgorithm::Aes, KeyKind::Secret) => Ok(SCHEME_AES_GCM),
        (KeyAlgorithm::Des | KeyAlgorithm::DesEde, KeyKind::Secret) => Ok(SCHEME_BLOCK_CBC),
        (KeyAlgorithm::Rsa, _) => Ok(SCHEME_RSA_HYBRID),
        (algorithm, kind) => Err(WrapError::UnsupportedWrappingKey(describe(algorithm, kind))),
    }
}

/// Runs a whole buffer through a cipher session in the given direction.
fn run_session(
    direction: Direction,
    key: &KeyMaterial,
    spec: &AlgorithmSpec,
    input: &[u8],
) -> Result<(Zeroizing<Vec<u8>>, Option<cipher::AlgorithmParameters>), WrapError> {
    let mut session = cipher::init(direction, key, spec)?;
    let mut output = Zeroizing::new(session.update(input)?);
    output.extend(session.finalize()?);
    Ok((output, session.parameters().cloned()))
}

/// Wraps `key` under `wrapping_key`.
///
/// # Errors
///
/// Returns `UnsupportedWrappingKey` for HMAC and DSA wrapping keys.
pub fn wrap(wrapping_key: &KeyMaterial, key: &KeyMaterial) -> Result<Vec<u8>, WrapError> {
    let scheme = scheme_for(wrapping_key)?;
    let payload = envelope::encode(key)?;

    let mut wrapped = vec![scheme];
    match scheme {
        SCHEME_AES_GCM => {
            let sealed = aead::encrypt(
                wrapping_key.secret_bytes()?,
                &payload,
                Some(aad(wrapping_key.algorithm()).as_slice()),
            )?;
            wrapped.extend_from_slice(&sealed);
        },
        SCHEME_BLOCK_CBC => {
            let spec = cbc_spec(wrapping_key.algorithm())?;
            let (ciphertext, parameters) =
                run_session(Direction::Wrap, wrapping_key, &spec, &payload)?;
            let parameters = parameters.ok_or_else(|| {
                WrapError::InvalidWrappedKey("CBC session produced no IV".into())
            })?;
            wrapped.extend_from_slice(parameters.iv());
            wrapped.extend_from_slice(&ciphertext);
        },
        _ => {
            let ephemeral = KeyMaterial::generate(KeyAlgorithm::Aes, Some(256), None)?;
            let spec = AlgorithmSpec::parse(RSA_TRANSFORMATION)?;
            let (encrypted_key, _) = run_session(
                Direction::Wrap,
                wrapping_key,
                &spec,
                ephemeral.secret_bytes()?,
            )?;
            let sealed = aead::encrypt(
                ephemeral.secret_bytes()?,
                &payload,
                Some(aad(wrapping_key.algorithm()).as_slice()),
            )?;

            let len = u16::try_from(encrypted_key.len())
                .map_err(|_| WrapError::InvalidWrappedKey("RSA block too large".into()))?;
            wrapped.extend_from_slice(&len.to_be_bytes());
            wrapped.extend_from_slice(&encrypted_key);
            wrapped.extend_from_slice(&sealed);
        },
    }

    debug!(
        wrapping = %wrapping_key.algorithm(),
        target = %key.algorithm(),
        kind = %key.kind(),
        "key wrapped"
    );
    Ok(wrapped)
}

/// Decrypts a wrapped key without checking what it is.
fn open(wrapping_key: &KeyMaterial, wrapped: &[u8]) -> Result<envelope::Decoded, WrapError> {
    let scheme = scheme_for(wrapping_key)?;
    let (&found_scheme, body) = wrapped
        .split_first()
        .ok_or_else(|| WrapError::InvalidWrappedKey("empty input".into()))?;
    if found_scheme != scheme {
        return Err(WrapError::InvalidWrappedKey(format!(
            "wrapped with scheme {found_scheme}, but a {} key uses scheme {scheme}",
            wrapping_key.algorithm()
        )));
    }

    let payload = match scheme {
        SCHEME_AES_GCM => aead::decrypt(
            wrapping_key.secret_bytes()?,
            body,
            Some(aad(wrapping_key.algorithm()).as_slice()),
        )?,
        SCHEME_BLOCK_CBC => {
            let spec = cbc_spec(wrapping_key.algorithm())?;
            let iv_len = spec.transformation.algorithm().block_size().unwrap_or(8);
            if body.len() < iv_len {
                return Err(WrapError::InvalidWrappedKey("missing IV".into()));
            }
            let (iv, ciphertext) = body.split_at(iv_len);
            let spec = spec.with_iv(iv);
            run_session(Direction::Unwrap, wrapping_key, &spec, ciphertext)?.0
        },
        _ => {
            if body.len() < 2 {
                return Err(WrapError::InvalidWrappedKey("missing RSA block".into()));
            }
            let (len, rest) = body.split_at(2);
            let len = u16::from_be_bytes([len[0], len[1]]) as usize;
            if rest.len() < len {
                return Err(WrapError::InvalidWrappedKey("truncated RSA block".into()));
            }
            let (encrypted_key, sealed) = rest.split_at(len);

            let spec = AlgorithmSpec::parse(RSA_TRANSFORMATION)?;
            let (ephemeral, _) =
                run_session(Direction::Unwrap, wrapping_key, &spec, encrypted_key)?;
            aead::decrypt(&ephemeral, sealed, Some(aad(wrapping_key.algorithm()).as_slice()))?
        },
    };

    envelope::decode(&payload)
}

/// Unwraps a key and checks that it is the expected algorithm and kind.
///
/// # Errors
///
/// Returns `UnwrapMismatch` if the wrapped key is not `expected_algorithm`
/// / `expected_kind`.
pub fn unwrap(
    wrapping_key: &KeyMaterial,
    wrapped: &[u8],
    expected_algorithm: KeyAlgorithm,
    expected_kind: KeyKind,
) -> Result<KeyMaterial, WrapError> {
    let decoded = open(wrapping_key, wrapped)?;

    if decoded.algorithm != expected_algorithm || decoded.kind != expected_kind {
        return Err(WrapError::UnwrapMismatch {
            expected: describe(expected_algorithm, expected_kind),
            found: describe(decoded.algorithm, decoded.kind),
        });
    }

    let key = decoded.into_key()?;
    debug!(
        wrapping = %wrapping_key.algorithm(),
        target = %key.algorithm(),
        kind = %key.kind(),
        "key unwrapped"
    );
    Ok(key)
}

/// Moves a wrapped key from `old_wrapping_key` to `new_wrapping_key`.
///
/// The key is never handed to the caller in plaintext.
pub fn rewrap(
    old_wrapping_key: &KeyMaterial,
    new_wrapping_key: &KeyMaterial,
    wrapped: &[u8],
) -> Result<Vec<u8>, WrapError> {
    scheme_for(new_wrapping_key)?;
    let key = open(old_wrapping_key, wrapped)?.into_key()?;
    wrap(new_wrapping_key, &key)
}

/// Generates a fresh key and wraps it under `wrapping_key` (envelope encryption).
pub fn generate_data_key(
    wrapping_key: &KeyMaterial,
    algorithm: KeyAlgorithm,
    bit_length: Option<usize>,
) -> Result<DataKey, WrapError> {
    scheme_for(wrapping_key)?;
    let key = KeyMaterial::generate(algorithm, bit_length, None)?;
    let wrapped = wrap(wrapping_key, &key)?;
    Ok(DataKey { key, wrapped })
}
