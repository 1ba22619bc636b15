//! Key material with automatic memory zeroization.
//!
//! A [`KeyMaterial`] is an immutable value: an algorithm tag, a kind
//! (secret, public or private) and the key itself. Keys are created by
//! generation (random or, for tests, seeded) or by reconstruction from explicit
//! components. Secret bytes live in `Zeroizing` buffers; RSA and DSA private keys
//! wipe themselves on drop.

use dsa::{
    Components as DsaDomain, KeySize, SigningKey as DsaSigningKey,
    VerifyingKey as DsaVerifyingKey,
};
use num_bigint_dig::prime::probably_prime;
use rand::{CryptoRng, RngCore};
use rsa::{
    traits::{PrivateKeyParts, PublicKeyParts},
    BigUint, RsaPrivateKey, RsaPublicKey,
};
use tracing::debug;
use zeroize::Zeroizing;

use crate::algorithm::{KeyAlgorithm, KeyKind};
use crate::error::CryptoError;
use crate::random::RandomSource;

/// Smallest RSA modulus accepted for generation.
pub const RSA_MIN_BITS: usize = 512;

/// Largest RSA modulus accepted for generation.
pub const RSA_MAX_BITS: usize = 4096;

#[derive(Clone)]
enum KeyInner {
    Secret(Zeroizing<Vec<u8>>),
    RsaPublic(RsaPublicKey),
    RsaPrivate(RsaPrivateKey),
    DsaPublic(DsaVerifyingKey),
    DsaPrivate(DsaSigningKey),
}

/// An immutable cryptographic key.
#[derive(Clone)]
pub struct KeyMaterial {
    algorithm: KeyAlgorithm,
    inner: KeyInner,
}

/// Both halves of an asymmetric key pair.
#[derive(Clone, Debug)]
pub struct KeyPair {
    /// Public key.
    pub public: KeyMaterial,
    /// Private key.
    pub private: KeyMaterial,
}

impl KeyPair {
    /// Generates a fresh RSA or DSA key pair.
    pub fn generate<R: RngCore + CryptoRng>(
        algorithm: KeyAlgorithm,
        bit_length: Option<usize>,
        rng: &mut R,
    ) -> Result<Self, CryptoError> {
        if !algorithm.is_asymmetric() {
            return Err(CryptoError::KeyAlgorithmMismatch(format!(
                "{algorithm} keys are not generated in pairs"
            )));
        }

        let private = KeyMaterial::generate_with(algorithm, bit_length, rng)?;
        let public = private.public_key()?;

        Ok(Self { public, private })
    }
}

impl KeyMaterial {
    /// Generates a fresh key.
    ///
    /// For RSA and DSA the private key is returned; its public half is available
    /// through [`KeyMaterial::public_key`]. When `seed` is given the key is derived
    /// deterministically from it, which is only suitable for test vectors.
    pub fn generate(
        algorithm: KeyAlgorithm,
        bit_length: Option<usize>,
        seed: Option<&[u8]>,
    ) -> Result<Self, CryptoError> {
        let mut rng = match seed {
            Some(seed) => RandomSource::insecure_seeded(seed),
            None => RandomSource::os(),
        };
        Self::generate_with(algorithm, bit_length, &mut rng)
    }

    /// Generates a fresh key from the given random source.
    pub fn generate_with<R: RngCore + CryptoRng>(
        algorithm: KeyAlgorithm,
        bit_length: Option<usize>,
        rng: &mut R,
    ) -> Result<Self, CryptoError> {
        let bits = bit_length.unwrap_or_else(|| algorithm.default_bit_length());
        debug!(%algorithm, bits, "generating key");

        let inner = match algorithm {
            KeyAlgorithm::Rsa => {
                if !(RSA_MIN_BITS..=RSA_MAX_BITS).contains(&bits) {
                    return Err(CryptoError::InvalidKeySpec(format!(
                        "RSA modulus must be {RSA_MIN_BITS}..={RSA_MAX_BITS} bits, got {bits}"
                    )));
                }
                let key = RsaPrivateKey::new(rng, bits)
                    .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;
                KeyInner::RsaPrivate(key)
            },
            KeyAlgorithm::Dsa => {
                let domain = DsaDomain::generate(rng, dsa_key_size(bits)?);
                KeyInner::DsaPrivate(DsaSigningKey::generate(rng, domain))
            },
            _ => {
                let len = secret_len_for_bits(algorithm, bits)?;
                let mut bytes = Zeroizing::new(vec![0u8; len]);
                rng.fill_bytes(&mut bytes);
                if matches!(algorithm, KeyAlgorithm::Des | KeyAlgorithm::DesEde) {
                    set_odd_parity(&mut bytes);
                }
                KeyInner::Secret(bytes)
            },
        };

        Ok(Self { algorithm, inner })
    }

    /// Creates a secret key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeySpec` if the length is wrong for the algorithm and
    /// `KeyAlgorithmMismatch` for asymmetric algorithms.
    pub fn from_secret_bytes(algorithm: KeyAlgorithm, bytes: &[u8]) -> Result<Self, CryptoError> {
        if algorithm.is_asymmetric() {
            return Err(CryptoError::KeyAlgorithmMismatch(format!(
                "{algorithm} keys cannot be built from secret bytes"
            )));
        }
        validate_secret_len(algorithm, bytes.len())?;

        Ok(Self {
            algorithm,
            inner: KeyInner::Secret(Zeroizing::new(bytes.to_vec())),
        })
    }

    /// Builds a key from explicit components.
    ///
    /// Components that are mathematically inconsistent fail with `InvalidKeySpec`
    /// rather than producing an unusable key.
    pub fn reconstruct(
        algorithm: KeyAlgorithm,
        kind: KeyKind,
        components: KeyComponents,
    ) -> Result<Self, CryptoError> {
        if components.kind() != kind {
            return Err(CryptoError::InvalidKeySpec(format!(
                "components describe a {} key, expected {kind}",
                components.kind()
            )));
        }

        let inner = match (algorithm, components) {
            (alg, KeyComponents::Secret(bytes)) if !alg.is_asymmetric() => {
                return Self::from_secret_bytes(alg, &bytes);
            },
            (
                KeyAlgorithm::Rsa,
                KeyComponents::RsaPublic {
                    modulus,
                    public_exponent,
                },
            ) => {
                check_rsa_modulus(&modulus, &public_exponent)?;
                let key = RsaPublicKey::new(modulus, public_exponent).map_err(invalid_spec)?;
                KeyInner::RsaPublic(key)
            },
            (
                KeyAlgorithm::Rsa,
                KeyComponents::RsaPrivate {
                    modulus,
                    public_exponent,
                    private_exponent,
                    primes,
                },
            ) => {
                check_rsa_modulus(&modulus, &public_exponent)?;
                if primes.len() < 2 {
                    return Err(CryptoError::InvalidKeySpec(
                        "RSA private key needs at least two primes".into(),
                    ));
                }
                let key = RsaPrivateKey::from_components(
                    modulus,
                    public_exponent,
                    private_exponent,
                    primes,
                )
                .map_err(invalid_spec)?;
                key.validate().map_err(invalid_spec)?;
                KeyInner::RsaPrivate(key)
            },
            (KeyAlgorithm::Dsa, KeyComponents::DsaPublic { p, q, g, y }) => {
                check_dsa_domain(&p, &q, &g)?;
                if y <= BigUint::from(1u8) || y >= p || y.modpow(&q, &p) != BigUint::from(1u8) {
                    return Err(CryptoError::InvalidKeySpec(
                        "DSA public value y is not in the subgroup generated by g".into(),
                    ));
                }
                let domain = DsaDomain::from_components(p, q, g).map_err(invalid_spec)?;
                let key = DsaVerifyingKey::from_components(domain, y).map_err(invalid_spec)?;
                KeyInner::DsaPublic(key)
            },
            (KeyAlgorithm::Dsa, KeyComponents::DsaPrivate { p, q, g, x }) => {
                check_dsa_domain(&p, &q, &g)?;
                if x == BigUint::from(0u8) || x >= q {
                    return Err(CryptoError::InvalidKeySpec(
                        "DSA private value x must satisfy 0 < x < q".into(),
                    ));
                }
                let y = g.modpow(&x, &p);
                let domain = DsaDomain::from_components(p, q, g).map_err(invalid_spec)?;
                let verifying = DsaVerifyingKey::from_components(domain, y).map_err(invalid_spec)?;
                let key = DsaSigningKey::from_components(verifying, x).map_err(invalid_spec)?;
                KeyInner::DsaPrivate(key)
            },
            (alg, other) => {
                return Err(CryptoError::InvalidKeySpec(format!(
                    "{} components cannot build a {alg} key",
                    other.describe()
                )));
            },
        };

        Ok(Self { algorithm, inner })
    }

    /// Algorithm this key belongs to.
    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    /// Role of this key.
    pub fn kind(&self) -> KeyKind {
        match &self.inner {
            KeyInner::Secret(_) => KeyKind::Secret,
            KeyInner::RsaPublic(_) | KeyInner::DsaPublic(_) => KeyKind::Public,
            KeyInner::RsaPrivate(_) | KeyInner::DsaPrivate(_) => KeyKind::Private,
        }
    }

    /// Key size in bits (modulus size for RSA, prime size for DSA).
    pub fn bit_length(&self) -> usize {
        match &self.inner {
            KeyInner::Secret(bytes) => bytes.len() * 8,
            KeyInner::RsaPublic(key) => key.n().bits(),
            KeyInner::RsaPrivate(key) => key.n().bits(),
            KeyInner::DsaPublic(key) => key.components().p().bits(),
            KeyInner::DsaPrivate(key) => key.verifying_key().components().p().bits(),
        }
    }

    /// Returns the raw secret bytes.
    ///
    /// Use with caution - the returned slice is not zeroized automatically.
    pub fn secret_bytes(&self) -> Result<&[u8], CryptoError> {
        match &self.inner {
            KeyInner::Secret(bytes) => Ok(bytes.as_slice()),
            _ => Err(CryptoError::KeyAlgorithmMismatch(format!(
                "{} {} key has no secret bytes",
                self.algorithm,
                self.kind()
            ))),
        }
    }

    /// Returns the public half of an asymmetric key.
    ///
    /// Public keys return a copy of themselves; secret keys fail.
    pub fn public_key(&self) -> Result<KeyMaterial, CryptoError> {
        let inner = match &self.inner {
            KeyInner::RsaPrivate(key) => KeyInner::RsaPublic(RsaPublicKey::from(key)),
            KeyInner::DsaPrivate(key) => KeyInner::DsaPublic(key.verifying_key().clone()),
            KeyInner::RsaPublic(_) | KeyInner::DsaPublic(_) => self.inner.clone(),
            KeyInner::Secret(_) => {
                return Err(CryptoError::KeyAlgorithmMismatch(format!(
                    "{} secret key has no public half",
                    self.algorithm
                )));
            },
        };

        Ok(Self {
            algorithm: self.algorithm,
            inner,
        })
    }

    /// Exports the components this key was built from.
    pub fn components(&self) -> KeyComponents {
        match &self.inner {
            KeyInner::Secret(bytes) => KeyComponents::Secret(bytes.clone()),
            KeyInner::RsaPublic(key) => KeyComponents::RsaPublic {
                modulus: key.n().clone(),
                public_exponent: key.e().clone(),
            },
            KeyInner::RsaPrivate(key) => KeyComponents::RsaPrivate {
                modulus: key.n().clone(),
                public_exponent: key.e().clone(),
                private_exponent: key.d().clone(),
                primes: key.primes().to_vec(),
            },
            KeyInner::DsaPublic(key) => {
                let domain = key.components();
                KeyComponents::DsaPublic {
                    p: domain.p().clone(),
                    q: domain.q().clone(),
                    g: domain.g().clone(),
                    y: key.y().clone(),
                }
            },
            KeyInner::DsaPrivate(key) => {
                let domain = key.verifying_key().components();
                KeyComponents::DsaPrivate {
                    p: domain.p().clone(),
                    q: domain.q().clone(),
                    g: domain.g().clone(),
                    x: key.x().clone(),
                }
            },
        }
    }

    /// Fails unless this key has the given algorithm.
    pub(crate) fn expect_algorithm(&self, algorithm: KeyAlgorithm) -> Result<(), CryptoError> {
        if self.algorithm != algorithm {
            return Err(CryptoError::KeyAlgorithmMismatch(format!(
                "expected a {algorithm} key, got {}",
                self.algorithm
            )));
        }
        Ok(())
    }

    /// RSA public key, derived from the private key when needed.
    pub(crate) fn rsa_public(&self) -> Option<RsaPublicKey> {
        match &self.inner {
            KeyInner::RsaPublic(key) => Some(key.clone()),
            KeyInner::RsaPrivate(key) => Some(RsaPublicKey::from(key)),
            _ => None,
        }
    }

    pub(crate) fn rsa_private(&self) -> Option<&RsaPrivateKey> {
        match &self.inner {
            KeyInner::RsaPrivate(key) => Some(key),
            _ => None,
        }
    }

    pub(crate) fn dsa_signing(&self) -> Option<&DsaSigningKey> {
        match &self.inner {
            KeyInner::DsaPrivate(key) => Some(key),
            _ => None,
        }
    }

    /// DSA verifying key, taken from the signing key when needed.
    pub(crate) fn dsa_verifying(&self) -> Option<&DsaVerifyingKey> {
        match &self.inner {
            KeyInner::DsaPublic(key) => Some(key),
            KeyInner::DsaPrivate(key) => Some(key.verifying_key()),
            _ => None,
        }
    }
}

impl PartialEq for KeyMaterial {
    fn eq(&self, other: &Self) -> bool {
        self.algorithm == other.algorithm
            && self.kind() == other.kind()
            && self.components().to_fields() == other.components().to_fields()
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("algorithm", &self.algorithm)
            .field("kind", &self.kind())
            .field("bit_length", &self.bit_length())
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Explicit numeric description of a key.
///
/// Field names follow the usual notation: RSA `n`/`e`/`d` and primes, DSA
/// domain `p`/`q`/`g` with private value `x` and public value `y`.
#[derive(Clone)]
pub enum KeyComponents {
    /// Raw secret key bytes.
    Secret(Zeroizing<Vec<u8>>),
    /// RSA public key.
    RsaPublic {
        /// Modulus `n`.
        modulus: BigUint,
        /// Public exponent `e`.
        public_exponent: BigUint,
    },
    /// RSA private key.
    RsaPrivate {
        /// Modulus `n`.
        modulus: BigUint,
        /// Public exponent `e`.
        public_exponent: BigUint,
        /// Private exponent `d`.
        private_exponent: BigUint,
        /// Prime factors of `n`.
        primes: Vec<BigUint>,
    },
    /// DSA public key.
    DsaPublic {
        /// Prime modulus.
        p: BigUint,
        /// Subprime (order of `g`).
        q: BigUint,
        /// Generator (base).
        g: BigUint,
        /// Public value `g^x mod p`.
        y: BigUint,
    },
    /// DSA private key.
    DsaPrivate {
        /// Prime modulus.
        p: BigUint,
        /// Subprime (order of `g`).
        q: BigUint,
        /// Generator (base).
        g: BigUint,
        /// Private value.
        x: BigUint,
    },
}

impl KeyComponents {
    /// Role of the key these components describe.
    pub fn kind(&self) -> KeyKind {
        match self {
            Self::Secret(_) => KeyKind::Secret,
            Self::RsaPublic { .. } | Self::DsaPublic { .. } => KeyKind::Public,
            Self::RsaPrivate { .. } | Self::DsaPrivate { .. } => KeyKind::Private,
        }
    }

    /// Flattens the components into big-endian byte fields.
    ///
    /// Order: secret `[bytes]`, RSA public `[n, e]`, RSA private
    /// `[n, e, d, primes...]`, DSA public `[p, q, g, y]`, DSA private `[p, q, g, x]`.
    pub fn to_fields(&self) -> Vec<Zeroizing<Vec<u8>>> {
        let be = |v: &BigUint| Zeroizing::new(v.to_bytes_be());
        match self {
            Self::Secret(bytes) => vec![bytes.clone()],
            Self::RsaPublic {
                modulus,
                public_exponent,
            } => vec![be(modulus), be(public_exponent)],
            Self::RsaPrivate {
                modulus,
                public_exponent,
                private_exponent,
                primes,
            } => {
                let mut fields = vec![be(modulus), be(public_exponent), be(private_exponent)];
                fields.extend(primes.iter().map(be));
                fields
            },
            Self::DsaPublic { p, q, g, y } => vec![be(p), be(q), be(g), be(y)],
            Self::DsaPrivate { p, q, g, x } => vec![be(p), be(q), be(g), be(x)],
        }
    }

    /// Rebuilds components from fields produced by [`KeyComponents::to_fields`].
    pub fn from_fields(
        algorithm: KeyAlgorithm,
        kind: KeyKind,
        fields: &[Zeroizing<Vec<u8>>],
    ) -> Result<Self, CryptoError> {
        let int = |i: usize| BigUint::from_bytes_be(&fields[i]);
        let expect = |n: usize| {
            if fields.len() == n {
                Ok(())
            } else {
                Err(CryptoError::InvalidKeySpec(format!(
                    "{algorithm} {kind} key needs {n} fields, got {}",
                    fields.len()
                )))
            }
        };

        match (algorithm, kind) {
            (alg, KeyKind::Secret) if !alg.is_asymmetric() => {
                expect(1)?;
                Ok(Self::Secret(fields[0].clone()))
            },
            (KeyAlgorithm::Rsa, KeyKind::Public) => {
                expect(2)?;
                Ok(Self::RsaPublic {
                    modulus: int(0),
                    public_exponent: int(1),
                })
            },
            (KeyAlgorithm::Rsa, KeyKind::Private) => {
                if fields.len() < 5 {
                    return Err(CryptoError::InvalidKeySpec(format!(
                        "RSA private key needs at least 5 fields, got {}",
                        fields.len()
                    )));
                }
                Ok(Self::RsaPrivate {
                    modulus: int(0),
                    public_exponent: int(1),
                    private_exponent: int(2),
                    primes: fields[3..]
                        .iter()
                        .map(|f| BigUint::from_bytes_be(f))
                        .collect(),
                })
            },
            (KeyAlgorithm::Dsa, KeyKind::Public) => {
                expect(4)?;
                Ok(Self::DsaPublic {
                    p: int(0),
                    q: int(1),
                    g: int(2),
                    y: int(3),
                })
            },
            (KeyAlgorithm::Dsa, KeyKind::Private) => {
                expect(4)?;
                Ok(Self::DsaPrivate {
                    p: int(0),
                    q: int(1),
                    g: int(2),
                    x: int(3),
                })
            },
            (alg, kind) => Err(CryptoError::InvalidKeySpec(format!(
                "{alg} has no {kind} keys"
            ))),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Self::Secret(_) => "secret",
            Self::RsaPublic { .. } => "RSA public",
            Self::RsaPrivate { .. } => "RSA private",
            Self::DsaPublic { .. } => "DSA public",
            Self::DsaPrivate { .. } => "DSA private",
        }
    }
}

impl std::fmt::Debug for KeyComponents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RsaPublic {
                modulus,
                public_exponent,
            } => f
                .debug_struct("RsaPublic")
                .field("modulus", modulus)
                .field("public_exponent", public_exponent)
                .finish(),
            Self::DsaPublic { p, q, g, y } => f
                .debug_struct("DsaPublic")
                .field("p", p)
                .field("q", q)
                .field("g", g)
                .field("y", y)
                .finish(),
            other => write!(f, "{} [REDACTED]", other.describe()),
        }
    }
}

fn invalid_spec(e: impl std::fmt::Display) -> CryptoError {
    CryptoError::InvalidKeySpec(e.to_string())
}

fn validate_secret_len(algorithm: KeyAlgorithm, len: usize) -> Result<(), CryptoError> {
    let ok = match algorithm {
        KeyAlgorithm::Aes => matches!(len, 16 | 24 | 32),
        KeyAlgorithm::Des => len == 8,
        KeyAlgorithm::DesEde => len == 24,
        _ => len > 0,
    };

    if !ok {
        return Err(CryptoError::InvalidKeySpec(format!(
            "invalid {algorithm} key length: {len} bytes"
        )));
    }
    Ok(())
}

fn secret_len_for_bits(algorithm: KeyAlgorithm, bits: usize) -> Result<usize, CryptoError> {
    let len = match (algorithm, bits) {
        (KeyAlgorithm::Des, 56 | 64) => 8,
        (KeyAlgorithm::DesEde, 168 | 192) => 24,
        (KeyAlgorithm::Des | KeyAlgorithm::DesEde, _) => {
            return Err(CryptoError::InvalidKeySpec(format!(
                "unsupported {algorithm} key size: {bits} bits"
            )));
        },
        (_, bits) if bits > 0 && bits % 8 == 0 => bits / 8,
        _ => {
            return Err(CryptoError::InvalidKeySpec(format!(
                "key size must be a positive multiple of 8 bits, got {bits}"
            )));
        },
    };

    validate_secret_len(algorithm, len)?;
    Ok(len)
}

#[allow(deprecated)]
fn dsa_key_size(bits: usize) -> Result<KeySize, CryptoError> {
    match bits {
        1024 => Ok(KeySize::DSA_1024_160),
        2048 => Ok(KeySize::DSA_2048_256),
        3072 => Ok(KeySize::DSA_3072_256),
        _ => Err(CryptoError::InvalidKeySpec(format!(
            "unsupported DSA key size: {bits} bits (expected 1024, 2048 or 3072)"
        ))),
    }
}

/// DES keys carry an odd-parity bit in the low bit of every byte.
fn set_odd_parity(bytes: &mut [u8]) {
    for byte in bytes.iter_mut() {
        let high = *byte & 0xFE;
        *byte = high | u8::from(high.count_ones() % 2 == 0);
    }
}

fn check_rsa_modulus(modulus: &BigUint, exponent: &BigUint) -> Result<(), CryptoError> {
    let two = BigUint::from(2u8);
    if modulus % &two == BigUint::from(0u8) || modulus <= exponent {
        return Err(CryptoError::InvalidKeySpec(
            "RSA modulus must be odd and larger than the public exponent".into(),
        ));
    }
    Ok(())
}

/// (L, N) bit lengths of the DSA domains this crate generates and accepts.
const DSA_DOMAIN_SIZES: [(usize, usize); 4] =
    [(1024, 160), (2048, 224), (2048, 256), (3072, 256)];

/// Miller-Rabin rounds applied to reconstructed DSA primes.
const DSA_PRIME_ROUNDS: usize = 20;

fn check_dsa_domain(p: &BigUint, q: &BigUint, g: &BigUint) -> Result<(), CryptoError> {
    let one = BigUint::from(1u8);
    let zero = BigUint::from(0u8);

    let sizes = (p.bits(), q.bits());
    if !DSA_DOMAIN_SIZES.contains(&sizes) {
        return Err(CryptoError::InvalidKeySpec(format!(
            "unsupported DSA domain size: p has {} bits, q has {} bits",
            sizes.0, sizes.1
        )));
    }
    if !probably_prime(q, DSA_PRIME_ROUNDS) || !probably_prime(p, DSA_PRIME_ROUNDS) {
        return Err(CryptoError::InvalidKeySpec(
            "DSA modulus p and subprime q must be prime".into(),
        ));
    }
    if (p - &one) % q != zero {
        return Err(CryptoError::InvalidKeySpec(
            "DSA subprime q must divide p - 1".into(),
        ));
    }
    if *g <= one || g >= p || g.modpow(q, p) != one {
        return Err(CryptoError::InvalidKeySpec(
            "DSA base g must generate the order-q subgroup".into(),
        ));
    }
    Ok(())
}
