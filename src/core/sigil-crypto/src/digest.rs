//! One-way message digests.
//!
//! Supports one-shot hashing through [`digest`] and streaming through
//! [`DigestHandle`] (`start` → `feed`* → `finish`).

use std::str::FromStr;

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::error::CryptoError;

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// MD5 (128-bit). Broken for collision resistance; kept for compatibility.
    #[serde(rename = "MD5")]
    Md5,
    /// SHA-1 (160-bit). Deprecated for new signatures.
    #[serde(rename = "SHA-1")]
    Sha1,
    /// SHA-256.
    #[serde(rename = "SHA-256")]
    Sha256,
    /// SHA-384.
    #[serde(rename = "SHA-384")]
    Sha384,
    /// SHA-512.
    #[serde(rename = "SHA-512")]
    Sha512,
}

impl DigestAlgorithm {
    /// Canonical algorithm name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        }
    }

    /// Length of the digest output in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "").as_str() {
            "MD5" => Ok(Self::Md5),
            "SHA1" | "SHA" => Ok(Self::Sha1),
            "SHA256" => Ok(Self::Sha256),
            "SHA384" => Ok(Self::Sha384),
            "SHA512" => Ok(Self::Sha512),
            _ => Err(CryptoError::UnsupportedTransformation(format!(
                "unknown digest algorithm: {s}"
            ))),
        }
    }
}

/// Running hash state, one variant per algorithm.
#[derive(Clone)]
pub(crate) enum DigestState {
    Md5(Md5),
    Sha1(Sha1),
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
}

impl DigestState {
    pub(crate) fn new(algorithm: DigestAlgorithm) -> Self {
        match algorithm {
            DigestAlgorithm::Md5 => Self::Md5(Md5::new()),
            DigestAlgorithm::Sha1 => Self::Sha1(Sha1::new()),
            DigestAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
            DigestAlgorithm::Sha384 => Self::Sha384(Sha384::new()),
            DigestAlgorithm::Sha512 => Self::Sha512(Sha512::new()),
        }
    }

    pub(crate) fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md5(d) => d.update(data),
            Self::Sha1(d) => d.update(data),
            Self::Sha256(d) => d.update(data),
            Self::Sha384(d) => d.update(data),
            Self::Sha512(d) => d.update(data),
        }
    }

    pub(crate) fn finalize(self) -> Vec<u8> {
        match self {
            Self::Md5(d) => d.finalize().to_vec(),
            Self::Sha1(d) => d.finalize().to_vec(),
            Self::Sha256(d) => d.finalize().to_vec(),
            Self::Sha384(d) => d.finalize().to_vec(),
            Self::Sha512(d) => d.finalize().to_vec(),
        }
    }
}

/// Streaming digest computation.
///
/// A handle accumulates input sequentially and is not meant to be shared
/// between threads without external synchronization.
#[derive(Clone)]
pub struct DigestHandle {
    algorithm: DigestAlgorithm,
    state: DigestState,
}

impl DigestHandle {
    /// Starts a new digest computation.
    pub fn start(algorithm: DigestAlgorithm) -> Self {
        Self {
            algorithm,
            state: DigestState::new(algorithm),
        }
    }

    /// Algorithm of this handle.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Feeds a chunk of input.
    pub fn feed(&mut self, chunk: &[u8]) {
        self.state.update(chunk);
    }

    /// Discards all input fed so far.
    pub fn reset(&mut self) {
        self.state = DigestState::new(self.algorithm);
    }

    /// Completes the computation and returns the digest.
    pub fn finish(self) -> Vec<u8> {
        self.state.finalize()
    }

    /// Completes the computation and returns the digest as lowercase hex.
    pub fn finish_hex(self) -> String {
        hex::encode(self.finish())
    }
}

impl std::fmt::Debug for DigestHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigestHandle")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

/// Computes the digest of `data`.
///
/// Pure and deterministic; the output is exactly
/// [`DigestAlgorithm::output_len`] bytes.
pub fn digest(algorithm: DigestAlgorithm, data: &[u8]) -> Vec<u8> {
    let mut handle = DigestHandle::start(algorithm);
    handle.feed(data);
    handle.finish()
}

/// Computes the digest of `data` as lowercase hex.
pub fn digest_hex(algorithm: DigestAlgorithm, data: &[u8]) -> String {
    hex::encode(digest(algorithm, data))
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    const ALL: [DigestAlgorithm; 5] = [
        DigestAlgorithm::Md5,
        DigestAlgorithm::Sha1,
        DigestAlgorithm::Sha256,
        DigestAlgorithm::Sha384,
        DigestAlgorithm::Sha512,
    ];

    #[test]
    fn test_md5_rfc1321_vector() {
        assert_eq!(
            digest_hex(DigestAlgorithm::Md5, b"abc"),
            "900150983cd24fb0d6963f7d28e17f72"
        );
        assert_eq!(
            digest_hex(DigestAlgorithm::Md5, b""),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
    }

    #[test]
    fn test_sha1_vector() {
        assert_eq!(
            digest_hex(DigestAlgorithm::Sha1, b"abc"),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn test_sha256_vector() {
        assert_eq!(
            digest_hex(DigestAlgorithm::Sha256, b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_output_lengths() {
        for alg in ALL {
            assert_eq!(digest(alg, b"abc456").len(), alg.output_len());
        }
    }

    #[test]
    fn test_digest_deterministic() {
        for alg in ALL {
            assert_eq!(digest(alg, b"abc456"), digest(alg, b"abc456"));
        }
    }

    #[test]
    fn test_streaming_matches_one_shot() {
        let data = b"The quick brown fox jumps over the lazy dog";
        for alg in ALL {
            let mut handle = DigestHandle::start(alg);
            for chunk in data.chunks(7) {
                handle.feed(chunk);
            }
            assert_eq!(handle.finish(), digest(alg, data));
        }
    }

    #[test]
    fn test_reset_discards_input() {
        let mut handle = DigestHandle::start(DigestAlgorithm::Sha256);
        handle.feed(b"garbage");
        handle.reset();
        handle.feed(b"abc");
        assert_eq!(handle.finish(), digest(DigestAlgorithm::Sha256, b"abc"));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("md5".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Md5);
        assert_eq!("SHA1".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha1);
        assert_eq!("sha-512".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha512);
        assert!("whirlpool".parse::<DigestAlgorithm>().is_err());
    }
}
