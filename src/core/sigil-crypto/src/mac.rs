//! HMAC message authentication codes.
//!
//! A MAC key must be a secret key tagged with the matching HMAC algorithm;
//! anything else fails with `KeyAlgorithmMismatch`. Verification recomputes
//! the tag and compares in constant time.

use std::str::FromStr;

use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;
use sha2::{Sha256, Sha512};

use crate::algorithm::{KeyAlgorithm, KeyKind};
use crate::error::CryptoError;
use crate::keys::KeyMaterial;

type HmacMd5 = Hmac<Md5>;
type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;

/// Supported MAC algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacAlgorithm {
    /// HMAC-MD5.
    HmacMd5,
    /// HMAC-SHA1.
    HmacSha1,
    /// HMAC-SHA256.
    HmacSha256,
    /// HMAC-SHA512.
    HmacSha512,
}

impl MacAlgorithm {
    /// Key algorithm a MAC key must carry.
    pub fn key_algorithm(&self) -> KeyAlgorithm {
        match self {
            Self::HmacMd5 => KeyAlgorithm::HmacMd5,
            Self::HmacSha1 => KeyAlgorithm::HmacSha1,
            Self::HmacSha256 => KeyAlgorithm::HmacSha256,
            Self::HmacSha512 => KeyAlgorithm::HmacSha512,
        }
    }

    /// Length of the tag in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            Self::HmacMd5 => 16,
            Self::HmacSha1 => 20,
            Self::HmacSha256 => 32,
            Self::HmacSha512 => 64,
        }
    }
}

impl std::fmt::Display for MacAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key_algorithm().name())
    }
}

impl FromStr for MacAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<KeyAlgorithm>() {
            Ok(KeyAlgorithm::HmacMd5) => Ok(Self::HmacMd5),
            Ok(KeyAlgorithm::HmacSha1) => Ok(Self::HmacSha1),
            Ok(KeyAlgorithm::HmacSha256) => Ok(Self::HmacSha256),
            Ok(KeyAlgorithm::HmacSha512) => Ok(Self::HmacSha512),
            _ => Err(CryptoError::UnsupportedTransformation(format!(
                "unknown MAC algorithm: {s}"
            ))),
        }
    }
}

enum MacState {
    Md5(HmacMd5),
    Sha1(HmacSha1),
    Sha256(HmacSha256),
    Sha512(HmacSha512),
}

/// Streaming MAC computation (`start` → `feed`* → `finish`).
pub struct MacHandle {
    algorithm: MacAlgorithm,
    state: MacState,
}

impl MacHandle {
    /// Starts a MAC computation keyed with `key`.
    ///
    /// # Errors
    ///
    /// Returns `KeyAlgorithmMismatch` if `key` is not a secret key for `algorithm`.
    pub fn start(key: &KeyMaterial, algorithm: MacAlgorithm) -> Result<Self, CryptoError> {
        if key.kind() != KeyKind::Secret {
            return Err(CryptoError::KeyAlgorithmMismatch(format!(
                "{algorithm} requires a secret key, got a {} key",
                key.kind()
            )));
        }
        key.expect_algorithm(algorithm.key_algorithm())?;

        let bytes = key.secret_bytes()?;
        let invalid = |e: hmac::digest::InvalidLength| CryptoError::InvalidKeySpec(e.to_string());
        let state = match algorithm {
            MacAlgorithm::HmacMd5 => {
                MacState::Md5(HmacMd5::new_from_slice(bytes).map_err(invalid)?)
            },
            MacAlgorithm::HmacSha1 => {
                MacState::Sha1(HmacSha1::new_from_slice(bytes).map_err(invalid)?)
            },
            MacAlgorithm::HmacSha256 => {
                MacState::Sha256(HmacSha256::new_from_slice(bytes).map_err(invalid)?)
            },
            MacAlgorithm::HmacSha512 => {
                MacState::Sha512(HmacSha512::new_from_slice(bytes).map_err(invalid)?)
            },
        };

        Ok(Self { algorithm, state })
    }

    /// Algorithm of this handle.
    pub fn algorithm(&self) -> MacAlgorithm {
        self.algorithm
    }

    /// Feeds a chunk of input.
    pub fn feed(&mut self, chunk: &[u8]) {
        match &mut self.state {
            MacState::Md5(m) => m.update(chunk),
            MacState::Sha1(m) => m.update(chunk),
            MacState::Sha256(m) => m.update(chunk),
            MacState::Sha512(m) => m.update(chunk),
        }
    }

    /// Completes the computation and returns the tag.
    pub fn finish(self) -> Vec<u8> {
        match self.state {
            MacState::Md5(m) => m.finalize().into_bytes().to_vec(),
            MacState::Sha1(m) => m.finalize().into_bytes().to_vec(),
            MacState::Sha256(m) => m.finalize().into_bytes().to_vec(),
            MacState::Sha512(m) => m.finalize().into_bytes().to_vec(),
        }
    }

    /// Completes the computation and checks it against `tag` in constant time.
    pub fn verify(self, tag: &[u8]) -> bool {
        match self.state {
            MacState::Md5(m) => m.verify_slice(tag).is_ok(),
            MacState::Sha1(m) => m.verify_slice(tag).is_ok(),
            MacState::Sha256(m) => m.verify_slice(tag).is_ok(),
            MacState::Sha512(m) => m.verify_slice(tag).is_ok(),
        }
    }
}

impl std::fmt::Debug for MacHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MacHandle")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

/// Computes the MAC of `data` under `key`.
pub fn compute(
    key: &KeyMaterial,
    algorithm: MacAlgorithm,
    data: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let mut handle = MacHandle::start(key, algorithm)?;
    handle.feed(data);
    Ok(handle.finish())
}

/// Recomputes the MAC of `data` and compares it with `tag`.
///
/// A mismatch is `Ok(false)`, not an error.
pub fn verify(
    key: &KeyMaterial,
    algorithm: MacAlgorithm,
    data: &[u8],
    tag: &[u8],
) -> Result<bool, CryptoError> {
    let mut handle = MacHandle::start(key, algorithm)?;
    handle.feed(data);
    Ok(handle.verify(tag))
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    fn key(algorithm: KeyAlgorithm, bytes: &[u8]) -> KeyMaterial {
        KeyMaterial::from_secret_bytes(algorithm, bytes).unwrap()
    }

    #[test]
    fn test_hmac_md5_rfc2202_vector() {
        let key = key(KeyAlgorithm::HmacMd5, &[0x0b; 16]);
        let tag = compute(&key, MacAlgorithm::HmacMd5, b"Hi There").unwrap();
        assert_eq!(hex::encode(tag), "9294727a3638bb1c13f48ef8158bfc9d");
    }

    #[test]
    fn test_hmac_sha1_rfc2202_vector() {
        let key = key(KeyAlgorithm::HmacSha1, &[0x0b; 20]);
        let tag = compute(&key, MacAlgorithm::HmacSha1, b"Hi There").unwrap();
        assert_eq!(hex::encode(tag), "b617318655057264e28bc0b6fb378c8ef146be00");
    }

    #[test]
    fn test_hmac_sha256_rfc4231_vector() {
        let key = key(KeyAlgorithm::HmacSha256, &[0x0b; 20]);
        let tag = compute(&key, MacAlgorithm::HmacSha256, b"Hi There").unwrap();
        assert_eq!(
            hex::encode(tag),
            "b0344c61d8db38535ca8afceaf0bf12b881dc200c9833da726e9376c2e32cff7"
        );
    }

    #[test]
    fn test_output_lengths() {
        for alg in [
            MacAlgorithm::HmacMd5,
            MacAlgorithm::HmacSha1,
            MacAlgorithm::HmacSha256,
            MacAlgorithm::HmacSha512,
        ] {
            let key = KeyMaterial::generate(alg.key_algorithm(), None, None).unwrap();
            assert_eq!(compute(&key, alg, b"abc456").unwrap().len(), alg.output_len());
        }
    }

    #[test]
    fn test_streaming_matches_one_shot() {
        let key = KeyMaterial::generate(KeyAlgorithm::HmacSha256, None, None).unwrap();
        let data = b"streamed message authentication";

        let mut handle = MacHandle::start(&key, MacAlgorithm::HmacSha256).unwrap();
        for chunk in data.chunks(5) {
            handle.feed(chunk);
        }

        assert_eq!(
            handle.finish(),
            compute(&key, MacAlgorithm::HmacSha256, data).unwrap()
        );
    }

    #[test]
    fn test_verify() {
        let key = KeyMaterial::generate(KeyAlgorithm::HmacMd5, None, None).unwrap();
        let tag = compute(&key, MacAlgorithm::HmacMd5, b"Hi There").unwrap();

        assert!(verify(&key, MacAlgorithm::HmacMd5, b"Hi There", &tag).unwrap());
        assert!(!verify(&key, MacAlgorithm::HmacMd5, b"Hi there", &tag).unwrap());

        let mut tampered = tag.clone();
        tampered[0] ^= 0x01;
        assert!(!verify(&key, MacAlgorithm::HmacMd5, b"Hi There", &tampered).unwrap());
        assert!(!verify(&key, MacAlgorithm::HmacMd5, b"Hi There", &tag[..8]).unwrap());
    }

    #[test]
    fn test_wrong_key_algorithm() {
        let key = KeyMaterial::generate(KeyAlgorithm::HmacSha1, None, None).unwrap();
        let result = compute(&key, MacAlgorithm::HmacSha256, b"data");
        assert!(matches!(result, Err(CryptoError::KeyAlgorithmMismatch(_))));

        let aes = KeyMaterial::generate(KeyAlgorithm::Aes, None, None).unwrap();
        let result = compute(&aes, MacAlgorithm::HmacMd5, b"data");
        assert!(matches!(result, Err(CryptoError::KeyAlgorithmMismatch(_))));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("HmacMD5".parse::<MacAlgorithm>().unwrap(), MacAlgorithm::HmacMd5);
        assert_eq!("hmac-sha512".parse::<MacAlgorithm>().unwrap(), MacAlgorithm::HmacSha512);
        assert!("AES".parse::<MacAlgorithm>().is_err());
    }
}
