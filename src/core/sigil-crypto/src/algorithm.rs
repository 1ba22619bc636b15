//! Key algorithm and key kind tags.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CryptoError;

/// Algorithm a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyAlgorithm {
    /// AES block cipher (128, 192 or 256-bit keys).
    #[serde(rename = "AES")]
    Aes,
    /// Single DES (64-bit keys, 56 effective bits).
    #[serde(rename = "DES")]
    Des,
    /// Three-key triple DES (192-bit keys).
    #[serde(rename = "DESede")]
    DesEde,
    /// RSA key pair.
    #[serde(rename = "RSA")]
    Rsa,
    /// DSA key pair.
    #[serde(rename = "DSA")]
    Dsa,
    /// HMAC over MD5.
    #[serde(rename = "HmacMD5")]
    HmacMd5,
    /// HMAC over SHA-1.
    #[serde(rename = "HmacSHA1")]
    HmacSha1,
    /// HMAC over SHA-256.
    #[serde(rename = "HmacSHA256")]
    HmacSha256,
    /// HMAC over SHA-512.
    #[serde(rename = "HmacSHA512")]
    HmacSha512,
}

impl KeyAlgorithm {
    /// All supported key algorithms.
    pub const ALL: [KeyAlgorithm; 9] = [
        Self::Aes,
        Self::Des,
        Self::DesEde,
        Self::Rsa,
        Self::Dsa,
        Self::HmacMd5,
        Self::HmacSha1,
        Self::HmacSha256,
        Self::HmacSha512,
    ];

    /// Canonical algorithm name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Aes => "AES",
            Self::Des => "DES",
            Self::DesEde => "DESede",
            Self::Rsa => "RSA",
            Self::Dsa => "DSA",
            Self::HmacMd5 => "HmacMD5",
            Self::HmacSha1 => "HmacSHA1",
            Self::HmacSha256 => "HmacSHA256",
            Self::HmacSha512 => "HmacSHA512",
        }
    }

    /// Returns `true` for algorithms whose keys come in public/private pairs.
    pub fn is_asymmetric(&self) -> bool {
        matches!(self, Self::Rsa | Self::Dsa)
    }

    /// Key size used when the caller does not request one.
    pub fn default_bit_length(&self) -> usize {
        match self {
            Self::Aes => 128,
            Self::Des => 64,
            Self::DesEde => 192,
            Self::Rsa | Self::Dsa => 2048,
            Self::HmacMd5 | Self::HmacSha1 | Self::HmacSha256 => 512,
            Self::HmacSha512 => 1024,
        }
    }
}

impl std::fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KeyAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.name().eq_ignore_ascii_case(s))
            .or_else(|| match s.to_ascii_uppercase().as_str() {
                "TRIPLEDES" | "3DES" | "DES-EDE" => Some(Self::DesEde),
                "HMAC-MD5" => Some(Self::HmacMd5),
                "HMAC-SHA1" => Some(Self::HmacSha1),
                "HMAC-SHA256" => Some(Self::HmacSha256),
                "HMAC-SHA512" => Some(Self::HmacSha512),
                _ => None,
            })
            .ok_or_else(|| {
                CryptoError::UnsupportedTransformation(format!("unknown key algorithm: {s}"))
            })
    }
}

/// Role of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyKind {
    /// Symmetric secret key.
    Secret,
    /// Public half of an asymmetric pair.
    Public,
    /// Private half of an asymmetric pair.
    Private,
}

impl std::fmt::Display for KeyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Secret => write!(f, "secret"),
            Self::Public => write!(f, "public"),
            Self::Private => write!(f, "private"),
        }
    }
}
