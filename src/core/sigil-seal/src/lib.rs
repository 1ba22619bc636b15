//! # Sigil Seal
//!
//! A [`SealedValue`] bundles ciphertext with the transformation and IV used
//! to produce it, so decrypting needs nothing but the key.
//!
//! ## Encodings
//!
//! - JSON through `serde`, with binary fields in base64
//! - Binary through [`SealedValue::to_bytes`]:
//!   `version (1) | transformation length (1) | transformation | IV length (1) | IV | ciphertext`
//! - Text through `Display`/`FromStr`: `sigil:v{version}:{base64 of the binary form}`

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;

pub use error::SealError;

use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sigil_crypto::{
    cipher, AlgorithmParameters, AlgorithmSpec, KeyMaterial, Transformation,
};
use tracing::debug;
use zeroize::Zeroizing;

/// Current sealed value format version.
pub const SEALED_VERSION: u8 = 1;

const TEXT_PREFIX: &str = "sigil";

/// Ciphertext plus everything needed to decrypt it except the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedValue {
    version: u8,
    transformation: Transformation,
    #[serde(with = "base64_opt", default, skip_serializing_if = "Option::is_none")]
    iv: Option<Vec<u8>>,
    #[serde(with = "base64_bytes")]
    ciphertext: Vec<u8>,
}

impl SealedValue {
    /// Encrypts `value` and captures the parameters used.
    pub fn seal(key: &KeyMaterial, spec: &AlgorithmSpec, value: &[u8]) -> Result<Self, SealError> {
        let output = cipher::encrypt(key, spec, value)?;
        debug!(transformation = %spec.transformation, len = value.len(), "value sealed");

        Ok(Self {
            version: SEALED_VERSION,
            transformation: spec.transformation,
            iv: output.parameters.map(|p| p.iv().to_vec()),
            ciphertext: output.bytes,
        })
    }

    /// Serializes `value` as JSON and seals it.
    pub fn seal_object<T: Serialize>(
        key: &KeyMaterial,
        spec: &AlgorithmSpec,
        value: &T,
    ) -> Result<Self, SealError> {
        let json = Zeroizing::new(serde_json::to_vec(value)?);
        Self::seal(key, spec, &json)
    }

    /// Decrypts the sealed bytes.
    ///
    /// # Errors
    ///
    /// Fails with the cipher's errors, e.g. `PaddingValidationError` for a
    /// wrong key or corrupted ciphertext and `KeyAlgorithmMismatch` for a key
    /// of the wrong algorithm.
    pub fn unseal(&self, key: &KeyMaterial) -> Result<Zeroizing<Vec<u8>>, SealError> {
        Ok(cipher::decrypt(key, &self.spec(), &self.ciphertext)?)
    }

    /// Decrypts and deserializes an object sealed with [`SealedValue::seal_object`].
    pub fn unseal_object<T: DeserializeOwned>(&self, key: &KeyMaterial) -> Result<T, SealError> {
        let json = self.unseal(key)?;
        Ok(serde_json::from_slice(&json)?)
    }

    /// Format version.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Transformation used to seal.
    pub fn transformation(&self) -> &Transformation {
        &self.transformation
    }

    /// Parameters used to seal, if the mode has any.
    pub fn parameters(&self) -> Option<AlgorithmParameters> {
        self.iv.as_deref().map(AlgorithmParameters::from_iv)
    }

    /// Raw ciphertext.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// The spec needed to decrypt.
    pub fn spec(&self) -> AlgorithmSpec {
        AlgorithmSpec::new(self.transformation).with_parameters(self.parameters())
    }

    /// Encodes to the binary form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let transformation = self.transformation.to_string();
        let iv = self.iv.as_deref().unwrap_or_default();

        let mut out =
            Vec::with_capacity(3 + transformation.len() + iv.len() + self.ciphertext.len());
        out.push(self.version);
        out.push(transformation.len() as u8);
        out.extend_from_slice(transformation.as_bytes());
        out.push(iv.len() as u8);
        out.extend_from_slice(iv);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Decodes the binary form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SealError> {
        let truncated = || SealError::InvalidFormat("truncated sealed value".into());

        let (&version, rest) = bytes.split_first().ok_or_else(truncated)?;
        if version != SEALED_VERSION {
            return Err(SealError::InvalidFormat(format!(
                "unsupported version {version}"
            )));
        }

        let (&t_len, rest) = rest.split_first().ok_or_else(truncated)?;
        let t_len = t_len as usize;
        if rest.len() < t_len {
            return Err(truncated());
        }
        let (transformation, rest) = rest.split_at(t_len);
        let transformation = std::str::from_utf8(transformation)
            .map_err(|_| SealError::InvalidFormat("transformation is not UTF-8".into()))?
            .parse::<Transformation>()?;

        let (&iv_len, rest) = rest.split_first().ok_or_else(truncated)?;
        let iv_len = iv_len as usize;
        if rest.len() < iv_len {
            return Err(truncated());
        }
        let (iv, ciphertext) = rest.split_at(iv_len);

        Ok(Self {
            version,
            transformation,
            iv: (!iv.is_empty()).then(|| iv.to_vec()),
            ciphertext: ciphertext.to_vec(),
        })
    }
}

impl std::fmt::Display for SealedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{TEXT_PREFIX}:v{}:{}",
            self.version,
            BASE64.encode(self.to_bytes())
        )
    }
}

impl FromStr for SealedValue {
    type Err = SealError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SealError::InvalidFormat("expected sigil:v{n}:{base64}".into());
        let parts: Vec<&str> = s.trim().splitn(3, ':').collect();

        if parts.len() != 3 || parts[0] != TEXT_PREFIX {
            return Err(invalid());
        }
        let version: u8 = parts[1]
            .strip_prefix('v')
            .ok_or_else(invalid)?
            .parse()
            .map_err(|_| invalid())?;

        let bytes = BASE64.decode(parts[2]).map_err(|_| invalid())?;
        let sealed = Self::from_bytes(&bytes)?;
        if sealed.version != version {
            return Err(SealError::InvalidFormat(format!(
                "text says v{version}, payload says v{}",
                sealed.version
            )));
        }
        Ok(sealed)
    }
}

mod base64_bytes {
    use super::{Engine, BASE64};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        BASE64.decode(s).map_err(serde::de::Error::custom)
    }
}

mod base64_opt {
    use super::{Engine, BASE64};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        bytes: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => serializer.serialize_some(&BASE64.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|s| BASE64.decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
