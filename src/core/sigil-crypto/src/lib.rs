//! # Sigil Crypto
//!
//! Cryptographic engines for Sigil.
//!
//! This crate provides:
//! - Key material: generation (optionally seeded, for test vectors only) and
//!   reconstruction from explicit numeric components
//! - Message digests (MD5, SHA-1, SHA-2)
//! - HMAC message authentication
//! - Block and RSA ciphers behind an `init` → `update` → `finalize` session,
//!   with one-shot and stream adapters
//! - DSA and RSA signatures
//! - AES-GCM, used to wrap keys under AES keys
//!
//! Transformations such as `DES/CBC/PKCS5Padding` are parsed into a closed
//! set of supported combinations up front; nothing is looked up in a global
//! registry.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod aead;
pub mod algorithm;
pub mod cipher;
pub mod digest;
pub mod error;
pub mod keys;
pub mod mac;
pub mod random;
pub mod signature;

pub use algorithm::{KeyAlgorithm, KeyKind};
pub use cipher::{
    stream::{process_stream, CipherReader, CipherWriter, StreamConfig},
    AlgorithmParameters, AlgorithmSpec, CipherOutput, CipherSession, Direction, SessionState,
    Transformation,
};
pub use digest::{DigestAlgorithm, DigestHandle};
pub use error::CryptoError;
pub use keys::{KeyComponents, KeyMaterial, KeyPair};
pub use mac::{MacAlgorithm, MacHandle};
pub use random::RandomSource;
pub use rsa::BigUint;
pub use signature::{SignatureAlgorithm, SignatureSession, SignatureValue};
