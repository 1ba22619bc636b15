//! # Digital signatures
//!
//! Signature algorithms bind a digest to a public-key transform
//! (`SHA1withDSA`, `SHA256withRSA`, ...). The message is hashed incrementally
//! by a [`SignatureSession`]; the asymmetric operation runs once at the end.
//!
//! DSA signatures are DER encoded and deterministic (RFC 6979). RSA signatures
//! use PKCS#1 v1.5 with the digest's algorithm identifier.
//!
//! A signature that does not verify, including one that cannot even be
//! decoded, is reported as `Ok(false)`. Errors are reserved for keys that
//! cannot be used with the requested algorithm.

use std::str::FromStr;

use md5::Md5;
use rsa::{
    pkcs1v15,
    signature::{DigestSigner as _, DigestVerifier as _, SignatureEncoding as _},
    RsaPrivateKey, RsaPublicKey,
};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{
    digest::{const_oid::AssociatedOid, core_api::BlockSizeUser, FixedOutputReset},
    Digest, Sha256, Sha384, Sha512,
};
use tracing::debug;

use crate::algorithm::KeyAlgorithm;
use crate::cipher::Direction;
use crate::digest::{DigestAlgorithm, DigestState};
use crate::error::CryptoError;
use crate::keys::KeyMaterial;

/// Supported signature algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    /// DSA over SHA-1.
    #[serde(rename = "SHA1withDSA")]
    Sha1WithDsa,
    /// DSA over SHA-256.
    #[serde(rename = "SHA256withDSA")]
    Sha256WithDsa,
    /// RSA PKCS#1 v1.5 over MD5.
    #[serde(rename = "MD5withRSA")]
    Md5WithRsa,
    /// RSA PKCS#1 v1.5 over SHA-1.
    #[serde(rename = "SHA1withRSA")]
    Sha1WithRsa,
    /// RSA PKCS#1 v1.5 over SHA-256.
    #[serde(rename = "SHA256withRSA")]
    Sha256WithRsa,
    /// RSA PKCS#1 v1.5 over SHA-384.
    #[serde(rename = "SHA384withRSA")]
    Sha384WithRsa,
    /// RSA PKCS#1 v1.5 over SHA-512.
    #[serde(rename = "SHA512withRSA")]
    Sha512WithRsa,
}

impl SignatureAlgorithm {
    /// All supported signature algorithms.
    pub const ALL: [SignatureAlgorithm; 7] = [
        Self::Sha1WithDsa,
        Self::Sha256WithDsa,
        Self::Md5WithRsa,
        Self::Sha1WithRsa,
        Self::Sha256WithRsa,
        Self::Sha384WithRsa,
        Self::Sha512WithRsa,
    ];

    /// Canonical algorithm name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha1WithDsa => "SHA1withDSA",
            Self::Sha256WithDsa => "SHA256withDSA",
            Self::Md5WithRsa => "MD5withRSA",
            Self::Sha1WithRsa => "SHA1withRSA",
            Self::Sha256WithRsa => "SHA256withRSA",
            Self::Sha384WithRsa => "SHA384withRSA",
            Self::Sha512WithRsa => "SHA512withRSA",
        }
    }

    /// Digest applied to the message before signing.
    pub fn digest(&self) -> DigestAlgorithm {
        match self {
            Self::Md5WithRsa => DigestAlgorithm::Md5,
            Self::Sha1WithDsa | Self::Sha1WithRsa => DigestAlgorithm::Sha1,
            Self::Sha256WithDsa | Self::Sha256WithRsa => DigestAlgorithm::Sha256,
            Self::Sha384WithRsa => DigestAlgorithm::Sha384,
            Self::Sha512WithRsa => DigestAlgorithm::Sha512,
        }
    }

    /// Key algorithm required by this signature algorithm.
    pub fn key_algorithm(&self) -> KeyAlgorithm {
        match self {
            Self::Sha1WithDsa | Self::Sha256WithDsa => KeyAlgorithm::Dsa,
            _ => KeyAlgorithm::Rsa,
        }
    }
}

impl std::fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("DSA") {
            return Ok(Self::Sha1WithDsa);
        }
        Self::ALL
            .into_iter()
            .find(|alg| alg.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                CryptoError::UnsupportedTransformation(format!("unknown signature algorithm: {s}"))
            })
    }
}

/// A signature together with the algorithm that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureValue {
    /// Encoded signature.
    pub bytes: Vec<u8>,
    /// Algorithm used.
    pub algorithm: SignatureAlgorithm,
}

/// Incremental signing or verification.
///
/// Created with [`SignatureSession::signer`] or [`SignatureSession::verifier`],
/// fed with [`update`](SignatureSession::update), and completed with
/// [`sign`](SignatureSession::sign) or [`verify`](SignatureSession::verify)
/// respectively.
pub struct SignatureSession {
    algorithm: SignatureAlgorithm,
    direction: Direction,
    key: KeyMaterial,
    digest: DigestState,
}

impl SignatureSession {
    /// Starts a signing session. Requires a private key.
    pub fn signer(key: &KeyMaterial, algorithm: SignatureAlgorithm) -> Result<Self, CryptoError> {
        key.expect_algorithm(algorithm.key_algorithm())?;
        if key.rsa_private().is_none() && key.dsa_signing().is_none() {
            return Err(CryptoError::KeyAlgorithmMismatch(format!(
                "{algorithm} signing requires a private key, got a {} key",
                key.kind()
            )));
        }
        Ok(Self::start(key.clone(), algorithm, Direction::Sign))
    }

    /// Starts a verification session. Accepts a public key or a private key,
    /// whose public half is used.
    pub fn verifier(key: &KeyMaterial, algorithm: SignatureAlgorithm) -> Result<Self, CryptoError> {
        key.expect_algorithm(algorithm.key_algorithm())?;
        Ok(Self::start(key.public_key()?, algorithm, Direction::Verify))
    }

    fn start(key: KeyMaterial, algorithm: SignatureAlgorithm, direction: Direction) -> Self {
        debug!(%algorithm, ?direction, "signature session started");
        Self {
            algorithm,
            direction,
            key,
            digest: DigestState::new(algorithm.digest()),
        }
    }

    /// Algorithm of this session.
    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    /// Feeds a chunk of the message.
    pub fn update(&mut self, chunk: &[u8]) {
        self.digest.update(chunk);
    }

    /// Signs everything fed so far.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError` on a verification session.
    pub fn sign(self) -> Result<SignatureValue, CryptoError> {
        if self.direction != Direction::Sign {
            return Err(CryptoError::SessionStateError(
                "cannot sign with a verification session".into(),
            ));
        }

        let bytes = match (self.key.rsa_private(), self.key.dsa_signing()) {
            (Some(key), _) => rsa_sign_state(key, self.digest)?,
            (_, Some(key)) => dsa_sign_state(key, self.digest)?,
            _ => {
                return Err(CryptoError::KeyAlgorithmMismatch(
                    "signing requires a private key".into(),
                ));
            },
        };

        Ok(SignatureValue {
            bytes,
            algorithm: self.algorithm,
        })
    }

    /// Checks `signature` against everything fed so far.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError` on a signing session. A signature made
    /// with a different algorithm does not verify and gives `Ok(false)`.
    pub fn verify(self, signature: &SignatureValue) -> Result<bool, CryptoError> {
        if self.direction != Direction::Verify {
            return Err(CryptoError::SessionStateError(
                "cannot verify with a signing session".into(),
            ));
        }
        if signature.algorithm != self.algorithm {
            debug!(
                signed = %signature.algorithm,
                requested = %self.algorithm,
                "signature algorithm differs from the verifying session"
            );
            return Ok(false);
        }

        match (self.key.rsa_public(), self.key.dsa_verifying()) {
            (Some(key), _) => rsa_verify_state(&key, self.digest, &signature.bytes),
            (_, Some(key)) => dsa_verify_state(key, self.digest, &signature.bytes),
            _ => Err(CryptoError::KeyAlgorithmMismatch(
                "verification requires an RSA or DSA key".into(),
            )),
        }
    }
}

impl std::fmt::Debug for SignatureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureSession")
            .field("algorithm", &self.algorithm)
            .field("direction", &self.direction)
            .finish()
    }
}

/// Signs `data` with `private_key`.
pub fn sign(
    private_key: &KeyMaterial,
    algorithm: SignatureAlgorithm,
    data: &[u8],
) -> Result<SignatureValue, CryptoError> {
    let mut session = SignatureSession::signer(private_key, algorithm)?;
    session.update(data);
    session.sign()
}

/// Verifies `signature` over `data` with `public_key`.
///
/// Returns `Ok(false)` on mismatch; never mutates its inputs.
pub fn verify(
    public_key: &KeyMaterial,
    algorithm: SignatureAlgorithm,
    data: &[u8],
    signature: &SignatureValue,
) -> Result<bool, CryptoError> {
    let mut session = SignatureSession::verifier(public_key, algorithm)?;
    session.update(data);
    session.verify(signature)
}

fn unsupported_digest() -> CryptoError {
    CryptoError::UnsupportedTransformation("digest is not supported with this key type".into())
}

fn rsa_sign<D: Digest + AssociatedOid>(
    key: &RsaPrivateKey,
    digest: D,
) -> Result<Vec<u8>, CryptoError> {
    let signer = pkcs1v15::SigningKey::<D>::new(key.clone());
    let signature = signer
        .try_sign_digest(digest)
        .map_err(|e| CryptoError::SignatureFailed(e.to_string()))?;
    Ok(signature.to_vec())
}

fn rsa_verify<D: Digest + AssociatedOid>(
    key: &RsaPublicKey,
    digest: D,
    signature: &[u8],
) -> bool {
    let Ok(signature) = pkcs1v15::Signature::try_from(signature) else {
        return false;
    };
    pkcs1v15::VerifyingKey::<D>::new(key.clone())
        .verify_digest(digest, &signature)
        .is_ok()
}

fn rsa_sign_state(key: &RsaPrivateKey, state: DigestState) -> Result<Vec<u8>, CryptoError> {
    match state {
        DigestState::Md5(d) => rsa_sign::<Md5>(key, d),
        DigestState::Sha1(d) => rsa_sign::<Sha1>(key, d),
        DigestState::Sha256(d) => rsa_sign::<Sha256>(key, d),
        DigestState::Sha384(d) => rsa_sign::<Sha384>(key, d),
        DigestState::Sha512(d) => rsa_sign::<Sha512>(key, d),
    }
}

fn rsa_verify_state(
    key: &RsaPublicKey,
    state: DigestState,
    signature: &[u8],
) -> Result<bool, CryptoError> {
    Ok(match state {
        DigestState::Md5(d) => rsa_verify::<Md5>(key, d, signature),
        DigestState::Sha1(d) => rsa_verify::<Sha1>(key, d, signature),
        DigestState::Sha256(d) => rsa_verify::<Sha256>(key, d, signature),
        DigestState::Sha384(d) => rsa_verify::<Sha384>(key, d, signature),
        DigestState::Sha512(d) => rsa_verify::<Sha512>(key, d, signature),
    })
}

fn dsa_sign<D>(key: &dsa::SigningKey, digest: D) -> Result<Vec<u8>, CryptoError>
where
    D: Digest + BlockSizeUser + FixedOutputReset,
{
    let signature: dsa::Signature = key
        .try_sign_digest(digest)
        .map_err(|e| CryptoError::SignatureFailed(e.to_string()))?;
    Ok(signature.to_vec())
}

fn dsa_verify<D>(key: &dsa::VerifyingKey, digest: D, signature: &[u8]) -> bool
where
    D: Digest + BlockSizeUser + FixedOutputReset,
{
    let Ok(signature) = dsa::Signature::try_from(signature) else {
        return false;
    };
    key.verify_digest(digest, &signature).is_ok()
}

fn dsa_sign_state(key: &dsa::SigningKey, state: DigestState) -> Result<Vec<u8>, CryptoError> {
    match state {
        DigestState::Sha1(d) => dsa_sign::<Sha1>(key, d),
        DigestState::Sha256(d) => dsa_sign::<Sha256>(key, d),
        _ => Err(unsupported_digest()),
    }
}

fn dsa_verify_state(
    key: &dsa::VerifyingKey,
    state: DigestState,
    signature: &[u8],
) -> Result<bool, CryptoError> {
    match state {
        DigestState::Sha1(d) => Ok(dsa_verify::<Sha1>(key, d, signature)),
        DigestState::Sha256(d) => Ok(dsa_verify::<Sha256>(key, d, signature)),
        _ => Err(unsupported_digest()),
    }
}
