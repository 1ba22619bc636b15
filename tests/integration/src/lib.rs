//! Integration tests for Sigil.
//!
//! These tests exercise the engines together: cipher round trips and
//! streaming equivalence, signatures, key wrapping and sealed values.

// Allow unwrap() in tests - panics are acceptable for test assertions
#![allow(clippy::disallowed_methods)]

use std::sync::OnceLock;

use sigil_crypto::{cipher, KeyAlgorithm, KeyMaterial, Transformation};

#[cfg(test)]
mod properties;
#[cfg(test)]
mod scenarios;

/// Sample message used throughout the walkthrough scenarios.
pub const SAMPLE: &[u8] = b"abc456";

/// Block cipher transformations covered by the round trip properties.
pub const PADDED_TRANSFORMATIONS: &[&str] = &[
    "AES/ECB/PKCS5Padding",
    "AES/CBC/PKCS5Padding",
    "DES/ECB/PKCS5Padding",
    "DES/CBC/PKCS5Padding",
    "DESede/ECB/PKCS5Padding",
    "DESede/CBC/PKCS5Padding",
];

/// RSA transformations with the largest plaintext each accepts under a
/// 1024-bit key.
pub const RSA_TRANSFORMATIONS: &[(&str, usize)] = &[
    ("RSA/ECB/PKCS1Padding", 117),
    ("RSA/ECB/OAEPWithSHA-1AndMGF1Padding", 86),
    ("RSA/ECB/OAEPWithSHA-256AndMGF1Padding", 62),
];

// ============================================================================
// Fixtures
// ============================================================================

/// Shared 1024-bit RSA private key.
pub fn rsa_private() -> &'static KeyMaterial {
    static KEY: OnceLock<KeyMaterial> = OnceLock::new();
    KEY.get_or_init(|| KeyMaterial::generate(KeyAlgorithm::Rsa, Some(1024), None).unwrap())
}

/// Shared 1024-bit DSA private key.
pub fn dsa_private() -> &'static KeyMaterial {
    static KEY: OnceLock<KeyMaterial> = OnceLock::new();
    KEY.get_or_init(|| KeyMaterial::generate(KeyAlgorithm::Dsa, Some(1024), None).unwrap())
}

/// Parses one of the transformation constants above.
pub fn transformation(name: &str) -> Transformation {
    name.parse().unwrap()
}

/// Generates a fresh secret key for a block cipher transformation.
pub fn secret_key_for(transformation: &Transformation) -> KeyMaterial {
    let algorithm = cipher::resolve(transformation).key_algorithm();
    KeyMaterial::generate(algorithm, None, None).unwrap()
}

/// Splits `data` into consecutive pieces of the given sizes; whatever is left
/// becomes the final piece.
pub fn split_by<'a>(data: &'a [u8], sizes: &[usize]) -> Vec<&'a [u8]> {
    let mut pieces = Vec::with_capacity(sizes.len() + 1);
    let mut rest = data;

    for &size in sizes {
        if rest.is_empty() {
            break;
        }
        let (head, tail) = rest.split_at(size.min(rest.len()));
        pieces.push(head);
        rest = tail;
    }
    if !rest.is_empty() {
        pieces.push(rest);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_by_covers_input() {
        let data = b"0123456789";
        let pieces = split_by(data, &[3, 0, 4]);

        assert_eq!(pieces, vec![&b"012"[..], &b""[..], &b"3456"[..], &b"789"[..]]);
        assert_eq!(pieces.concat(), data);
    }

    #[test]
    fn test_fixture_transformations_parse() {
        for name in PADDED_TRANSFORMATIONS {
            assert_eq!(transformation(name).to_string(), *name);
        }
        for (name, _) in RSA_TRANSFORMATIONS {
            transformation(name);
        }
    }
}
