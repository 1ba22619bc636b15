//! Random number generation.
//!
//! Uses the operating system's CSPRNG for all random number generation, with one
//! exception: [`RandomSource::insecure_seeded`] produces a deterministic stream for
//! reproducible test vectors. It must never be used to generate real keys.

use rand::{
    rngs::{OsRng, StdRng},
    CryptoRng, RngCore, SeedableRng,
};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::aead::NONCE_SIZE;

/// Source of randomness for key generation.
///
/// The default is the operating system CSPRNG. A seeded source exists only so
/// tests can reproduce the same keys from the same seed.
pub enum RandomSource {
    /// Operating system CSPRNG.
    Os(OsRng),
    /// Deterministic generator derived from a caller-supplied seed.
    Seeded(StdRng),
}

impl RandomSource {
    /// Returns the operating system CSPRNG.
    pub fn os() -> Self {
        Self::Os(OsRng)
    }

    /// Returns a deterministic generator seeded from `seed`.
    ///
    /// **Insecure.** Anyone who knows the seed can regenerate every key produced
    /// from this source. Intended for test vectors only.
    pub fn insecure_seeded(seed: &[u8]) -> Self {
        warn!("seeded random source created - keys generated from it are NOT secure");

        let mut material = [0u8; 32];
        material.copy_from_slice(&Sha256::digest(seed));
        Self::Seeded(StdRng::from_seed(material))
    }

    /// Returns `true` if this source is deterministic.
    pub fn is_seeded(&self) -> bool {
        matches!(self, Self::Seeded(_))
    }
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::os()
    }
}

impl std::fmt::Debug for RandomSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Os(_) => f.write_str("RandomSource::Os"),
            Self::Seeded(_) => f.write_str("RandomSource::Seeded"),
        }
    }
}

impl RngCore for RandomSource {
    fn next_u32(&mut self) -> u32 {
        match self {
            Self::Os(rng) => rng.next_u32(),
            Self::Seeded(rng) => rng.next_u32(),
        }
    }

    fn next_u64(&mut self) -> u64 {
        match self {
            Self::Os(rng) => rng.next_u64(),
            Self::Seeded(rng) => rng.next_u64(),
        }
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        match self {
            Self::Os(rng) => rng.fill_bytes(dest),
            Self::Seeded(rng) => rng.fill_bytes(dest),
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        match self {
            Self::Os(rng) => rng.try_fill_bytes(dest),
            Self::Seeded(rng) => rng.try_fill_bytes(dest),
        }
    }
}

impl CryptoRng for RandomSource {}

/// Generates a cryptographically secure random nonce for AES-GCM.
pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Generates cryptographically secure random bytes.
///
/// # Arguments
///
/// * `len` - Number of random bytes to generate
pub fn generate_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}
