//! Transformations and algorithm parameters.
//!
//! A [`Transformation`] is the validated `Algorithm/Mode/Padding` triple. Every
//! combination that parses is one the engine implements, so sessions never
//! discover an unsupported combination halfway through.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::algorithm::KeyAlgorithm;
use crate::error::CryptoError;

/// Cipher algorithm of a transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherAlgorithm {
    /// AES, 16-byte blocks.
    Aes,
    /// Single DES, 8-byte blocks.
    Des,
    /// Triple DES (EDE, three keys), 8-byte blocks.
    DesEde,
    /// RSA public-key encryption.
    Rsa,
}

impl CipherAlgorithm {
    /// Key algorithm a key must carry to be used with this cipher.
    pub fn key_algorithm(&self) -> KeyAlgorithm {
        match self {
            Self::Aes => KeyAlgorithm::Aes,
            Self::Des => KeyAlgorithm::Des,
            Self::DesEde => KeyAlgorithm::DesEde,
            Self::Rsa => KeyAlgorithm::Rsa,
        }
    }

    /// Block size in bytes, `None` for RSA.
    pub fn block_size(&self) -> Option<usize> {
        match self {
            Self::Aes => Some(16),
            Self::Des | Self::DesEde => Some(8),
            Self::Rsa => None,
        }
    }

    fn name(&self) -> &'static str {
        self.key_algorithm().name()
    }
}

/// Block cipher mode of operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Electronic codebook. Also used as the nominal mode for RSA.
    Ecb,
    /// Cipher block chaining with an IV.
    Cbc,
}

impl Mode {
    fn name(&self) -> &'static str {
        match self {
            Self::Ecb => "ECB",
            Self::Cbc => "CBC",
        }
    }
}

/// Padding scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Padding {
    /// No padding; input must be block aligned.
    NoPadding,
    /// PKCS#5/PKCS#7 block padding.
    Pkcs5,
    /// RSA PKCS#1 v1.5 encryption padding.
    Pkcs1,
    /// RSA OAEP with SHA-1 and MGF1.
    OaepSha1,
    /// RSA OAEP with SHA-256 and MGF1.
    OaepSha256,
}

impl Padding {
    fn name(&self) -> &'static str {
        match self {
            Self::NoPadding => "NoPadding",
            Self::Pkcs5 => "PKCS5Padding",
            Self::Pkcs1 => "PKCS1Padding",
            Self::OaepSha1 => "OAEPWithSHA-1AndMGF1Padding",
            Self::OaepSha256 => "OAEPWithSHA-256AndMGF1Padding",
        }
    }

    fn is_rsa(&self) -> bool {
        matches!(self, Self::Pkcs1 | Self::OaepSha1 | Self::OaepSha256)
    }
}

/// A validated `Algorithm/Mode/Padding` triple such as `DES/CBC/PKCS5Padding`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Transformation {
    algorithm: CipherAlgorithm,
    mode: Mode,
    padding: Padding,
}

impl Transformation {
    /// Builds a transformation, rejecting combinations the engine does not implement.
    pub fn new(
        algorithm: CipherAlgorithm,
        mode: Mode,
        padding: Padding,
    ) -> Result<Self, CryptoError> {
        let supported = match algorithm {
            CipherAlgorithm::Rsa => mode == Mode::Ecb && padding.is_rsa(),
            _ => !padding.is_rsa(),
        };
        if !supported {
            return Err(CryptoError::UnsupportedTransformation(format!(
                "{}/{}/{}",
                algorithm.name(),
                mode.name(),
                padding.name()
            )));
        }

        Ok(Self {
            algorithm,
            mode,
            padding,
        })
    }

    /// Cipher algorithm.
    pub fn algorithm(&self) -> CipherAlgorithm {
        self.algorithm
    }

    /// Mode of operation.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Padding scheme.
    pub fn padding(&self) -> Padding {
        self.padding
    }

    /// Returns `true` if the mode needs an IV.
    pub fn requires_iv(&self) -> bool {
        self.mode == Mode::Cbc
    }

    fn defaults(algorithm: CipherAlgorithm) -> Self {
        match algorithm {
            CipherAlgorithm::Rsa => Self {
                algorithm,
                mode: Mode::Ecb,
                padding: Padding::Pkcs1,
            },
            _ => Self {
                algorithm,
                mode: Mode::Ecb,
                padding: Padding::Pkcs5,
            },
        }
    }
}

impl std::fmt::Display for Transformation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.algorithm.name(),
            self.mode.name(),
            self.padding.name()
        )
    }
}

impl FromStr for Transformation {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unsupported = || CryptoError::UnsupportedTransformation(s.to_string());
        let parts: Vec<String> = s.split('/').map(|p| p.trim().to_ascii_uppercase()).collect();

        let algorithm = match parts[0].as_str() {
            "AES" => CipherAlgorithm::Aes,
            "DES" => CipherAlgorithm::Des,
            "DESEDE" | "TRIPLEDES" | "3DES" => CipherAlgorithm::DesEde,
            "RSA" => CipherAlgorithm::Rsa,
            _ => return Err(unsupported()),
        };

        let (mode, padding) = match parts.as_slice() {
            [_] => return Ok(Self::defaults(algorithm)),
            [_, mode, padding] => (mode.as_str(), padding.as_str()),
            _ => return Err(unsupported()),
        };

        let mode = match (algorithm, mode) {
            (_, "ECB") => Mode::Ecb,
            (CipherAlgorithm::Rsa, "NONE") => Mode::Ecb,
            (_, "CBC") => Mode::Cbc,
            _ => return Err(unsupported()),
        };

        let padding = match padding {
            "NOPADDING" => Padding::NoPadding,
            "PKCS5PADDING" | "PKCS7PADDING" => Padding::Pkcs5,
            "PKCS1PADDING" => Padding::Pkcs1,
            "OAEPPADDING" | "OAEPWITHSHA-1ANDMGF1PADDING" | "OAEPWITHSHA1ANDMGF1PADDING" => {
                Padding::OaepSha1
            },
            "OAEPWITHSHA-256ANDMGF1PADDING" | "OAEPWITHSHA256ANDMGF1PADDING" => Padding::OaepSha256,
            _ => return Err(unsupported()),
        };

        Self::new(algorithm, mode, padding)
    }
}

impl TryFrom<String> for Transformation {
    type Error = CryptoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Transformation> for String {
    fn from(value: Transformation) -> Self {
        value.to_string()
    }
}

/// Mode-specific parameters, currently the IV for CBC.
#[derive(Clone, PartialEq, Eq)]
pub struct AlgorithmParameters {
    iv: Vec<u8>,
}

impl AlgorithmParameters {
    /// Wraps an IV.
    pub fn from_iv(iv: impl Into<Vec<u8>>) -> Self {
        Self { iv: iv.into() }
    }

    /// Initialization vector bytes.
    pub fn iv(&self) -> &[u8] {
        &self.iv
    }
}

impl std::fmt::Debug for AlgorithmParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlgorithmParameters")
            .field("iv", &hex::encode(&self.iv))
            .finish()
    }
}

/// What a session is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Encrypt plaintext.
    Encrypt,
    /// Decrypt ciphertext.
    Decrypt,
    /// Produce a signature.
    Sign,
    /// Check a signature.
    Verify,
    /// Encrypt serialized key material.
    Wrap,
    /// Decrypt serialized key material.
    Unwrap,
}

impl Direction {
    /// Maps wrap/unwrap onto the cipher direction they use.
    ///
    /// Sign and verify are not cipher directions and fail with
    /// `UnsupportedTransformation`.
    pub(crate) fn cipher_direction(self) -> Result<Self, CryptoError> {
        match self {
            Self::Encrypt | Self::Wrap => Ok(Self::Encrypt),
            Self::Decrypt | Self::Unwrap => Ok(Self::Decrypt),
            Self::Sign | Self::Verify => Err(CryptoError::UnsupportedTransformation(format!(
                "{self:?} is not a cipher direction"
            ))),
        }
    }
}

/// A transformation plus the parameters to run it with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmSpec {
    /// Algorithm, mode and padding.
    pub transformation: Transformation,
    /// IV or other mode parameters. May be omitted when encrypting.
    pub parameters: Option<AlgorithmParameters>,
}

impl AlgorithmSpec {
    /// Creates a spec without parameters.
    pub fn new(transformation: Transformation) -> Self {
        Self {
            transformation,
            parameters: None,
        }
    }

    /// Parses a transformation string into a spec without parameters.
    pub fn parse(transformation: &str) -> Result<Self, CryptoError> {
        Ok(Self::new(transformation.parse()?))
    }

    /// Sets the IV.
    pub fn with_iv(mut self, iv: impl Into<Vec<u8>>) -> Self {
        self.parameters = Some(AlgorithmParameters::from_iv(iv));
        self
    }

    /// Replaces the parameters, typically with those returned by an encrypting session.
    pub fn with_parameters(mut self, parameters: Option<AlgorithmParameters>) -> Self {
        self.parameters = parameters;
        self
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_triple() {
        let t: Transformation = "DES/CBC/PKCS5Padding".parse().unwrap();
        assert_eq!(t.algorithm(), CipherAlgorithm::Des);
        assert_eq!(t.mode(), Mode::Cbc);
        assert_eq!(t.padding(), Padding::Pkcs5);
        assert!(t.requires_iv());
        assert_eq!(t.to_string(), "DES/CBC/PKCS5Padding");
    }

    #[test]
    fn test_parse_case_insensitive() {
        let t: Transformation = "des/cbc/pkcs5padding".parse().unwrap();
        assert_eq!(t.to_string(), "DES/CBC/PKCS5Padding");

        let t: Transformation = "desede/ecb/nopadding".parse().unwrap();
        assert_eq!(t.to_string(), "DESede/ECB/NoPadding");
    }

    #[test]
    fn test_bare_algorithm_defaults() {
        assert_eq!(
            "AES".parse::<Transformation>().unwrap().to_string(),
            "AES/ECB/PKCS5Padding"
        );
        assert_eq!(
            "RSA".parse::<Transformation>().unwrap().to_string(),
            "RSA/ECB/PKCS1Padding"
        );
    }

    #[test]
    fn test_rsa_modes() {
        let t: Transformation = "RSA/NONE/OAEPWithSHA-256AndMGF1Padding".parse().unwrap();
        assert_eq!(t.mode(), Mode::Ecb);
        assert_eq!(t.padding(), Padding::OaepSha256);
        assert!(!t.requires_iv());
    }

    #[test]
    fn test_invalid_combinations_rejected_at_parse() {
        for s in [
            "RSA/CBC/PKCS1Padding",
            "RSA/ECB/NoPadding",
            "RSA/ECB/PKCS5Padding",
            "AES/ECB/PKCS1Padding",
            "AES/NONE/NoPadding",
            "AES/GCM/NoPadding",
            "Blowfish/ECB/PKCS5Padding",
            "AES/CBC",
            "AES/CBC/PKCS5Padding/extra",
            "",
        ] {
            assert!(
                matches!(
                    s.parse::<Transformation>(),
                    Err(CryptoError::UnsupportedTransformation(_))
                ),
                "{s} should be rejected"
            );
        }
    }

    #[test]
    fn test_serde_as_string() {
        let t: Transformation = "AES/CBC/PKCS5Padding".parse().unwrap();
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "\"AES/CBC/PKCS5Padding\"");

        let back: Transformation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);

        assert!(serde_json::from_str::<Transformation>("\"RSA/CBC/NoPadding\"").is_err());
    }

    #[test]
    fn test_direction_mapping() {
        assert_eq!(Direction::Wrap.cipher_direction().unwrap(), Direction::Encrypt);
        assert_eq!(Direction::Unwrap.cipher_direction().unwrap(), Direction::Decrypt);
        assert!(Direction::Sign.cipher_direction().is_err());
    }

    #[test]
    fn test_spec_builders() {
        let spec = AlgorithmSpec::parse("AES/CBC/PKCS5Padding")
            .unwrap()
            .with_iv(vec![7u8; 16]);
        assert_eq!(spec.parameters.as_ref().unwrap().iv(), &[7u8; 16]);

        let spec = spec.with_parameters(None);
        assert!(spec.parameters.is_none());
    }
}
