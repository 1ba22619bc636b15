//! End-to-end walkthroughs over the sample message.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use sigil_crypto::{
    cipher, mac, signature, AlgorithmSpec, CipherReader, CipherSession, CipherWriter,
    CryptoError, Direction, KeyAlgorithm, KeyKind, KeyMaterial, MacAlgorithm, SessionState,
    SignatureAlgorithm,
};
use sigil_seal::{SealError, SealedValue};
use sigil_wrap::WrapError;

use crate::*;

#[test]
fn test_des_cbc_sample_with_wrapped_key() {
    let des_key = KeyMaterial::generate(KeyAlgorithm::Des, None, None).unwrap();
    let spec = AlgorithmSpec::parse("DES/CBC/PKCS5PADDING").unwrap();

    let mut session = cipher::init(Direction::Encrypt, &des_key, &spec).unwrap();
    let mut ciphertext = session.update(SAMPLE).unwrap();
    ciphertext.extend(session.finalize().unwrap());
    let parameters = session.parameters().cloned().unwrap();

    assert!(ciphertext.len() > SAMPLE.len());
    assert_eq!(ciphertext.len() % 8, 0);
    assert_eq!(parameters.iv().len(), 8);

    // Transport the DES key under an AES key, then decrypt on the other side.
    let aes_key = KeyMaterial::generate(KeyAlgorithm::Aes, None, None).unwrap();
    let wrapped = sigil_wrap::wrap(&aes_key, &des_key).unwrap();
    let recovered =
        sigil_wrap::unwrap(&aes_key, &wrapped, KeyAlgorithm::Des, KeyKind::Secret).unwrap();

    let decrypt_spec = spec.with_parameters(Some(parameters));
    let plaintext = cipher::decrypt(&recovered, &decrypt_spec, &ciphertext).unwrap();
    assert_eq!(plaintext.as_slice(), SAMPLE);
}

#[test]
fn test_file_stream_roundtrip() {
    let key = KeyMaterial::generate(KeyAlgorithm::Aes, Some(256), None).unwrap();
    let spec = AlgorithmSpec::parse("AES/CBC/PKCS5Padding").unwrap();
    let payload: Vec<u8> = SAMPLE.iter().copied().cycle().take(50_000).collect();

    let file = tempfile::NamedTempFile::new().unwrap();
    let mut writer = CipherWriter::new(
        file.reopen().unwrap(),
        cipher::init(Direction::Encrypt, &key, &spec).unwrap(),
    );
    for chunk in payload.chunks(777) {
        writer.write_all(chunk).unwrap();
    }
    let iv = writer.session().parameters().cloned();
    writer.finish().unwrap();

    let on_disk = std::fs::read(file.path()).unwrap();
    assert_eq!(on_disk.len(), (payload.len() / 16 + 1) * 16);

    let decrypt_spec = spec.with_parameters(iv);
    let mut reader = CipherReader::new(
        file.reopen().unwrap(),
        cipher::init(Direction::Decrypt, &key, &decrypt_spec).unwrap(),
    );
    let mut restored = Vec::new();
    reader.read_to_end(&mut restored).unwrap();

    assert_eq!(restored, payload);
}

#[test]
fn test_tampered_padding_reported() {
    let key = KeyMaterial::from_secret_bytes(KeyAlgorithm::Aes, &[0x42; 16]).unwrap();
    let spec = AlgorithmSpec::parse("AES/CBC/PKCS5Padding")
        .unwrap()
        .with_iv(vec![0; 16]);
    let mut ciphertext = cipher::encrypt(&key, &spec, b"abc456 plus a second block")
        .unwrap()
        .bytes;
    assert_eq!(ciphertext.len(), 32);

    // The padding byte of the last block is 0x06; flipping the matching bit of
    // the previous ciphertext block turns it into 0x86.
    ciphertext[15] ^= 0x80;

    assert!(matches!(
        cipher::decrypt(&key, &spec, &ciphertext),
        Err(CryptoError::PaddingValidationError)
    ));
}

#[test]
fn test_session_sequencing() {
    let key = KeyMaterial::generate(KeyAlgorithm::DesEde, None, None).unwrap();
    let spec = AlgorithmSpec::parse("DESede").unwrap();
    let mut session = CipherSession::new();

    assert!(matches!(
        session.update(SAMPLE),
        Err(CryptoError::SessionStateError(_))
    ));

    session.init(Direction::Encrypt, &key, &spec).unwrap();
    assert_eq!(session.state(), SessionState::Initialized);
    session.update(SAMPLE).unwrap();
    assert_eq!(session.state(), SessionState::Accumulating);
    let ciphertext = session.finalize().unwrap();
    assert_eq!(session.state(), SessionState::Finalized);
    assert_eq!(ciphertext.len(), 8);

    assert!(matches!(
        session.finalize(),
        Err(CryptoError::SessionStateError(_))
    ));

    // Re-initializing a finalized session is allowed.
    session.init(Direction::Decrypt, &key, &spec).unwrap();
    let mut plaintext = session.update(&ciphertext).unwrap();
    plaintext.extend(session.finalize().unwrap());
    assert_eq!(plaintext, SAMPLE);
}

#[test]
fn test_key_mismatches() {
    let des_key = KeyMaterial::generate(KeyAlgorithm::Des, None, None).unwrap();
    let aes_spec = AlgorithmSpec::parse("AES").unwrap();

    assert!(matches!(
        cipher::init(Direction::Encrypt, &des_key, &aes_spec),
        Err(CryptoError::KeyAlgorithmMismatch(_))
    ));
    assert!(matches!(
        mac::compute(&des_key, MacAlgorithm::HmacSha256, SAMPLE),
        Err(CryptoError::KeyAlgorithmMismatch(_))
    ));
    assert!(matches!(
        signature::sign(&des_key, SignatureAlgorithm::Sha1WithDsa, SAMPLE),
        Err(CryptoError::KeyAlgorithmMismatch(_))
    ));
    assert!(matches!(
        AlgorithmSpec::parse("AES/GCM/NoPadding"),
        Err(CryptoError::UnsupportedTransformation(_))
    ));
}

#[test]
fn test_hmac_md5_sample() {
    let key = KeyMaterial::generate(KeyAlgorithm::HmacMd5, None, None).unwrap();

    let tag = mac::compute(&key, MacAlgorithm::HmacMd5, SAMPLE).unwrap();
    assert_eq!(tag.len(), 16);
    assert!(mac::verify(&key, MacAlgorithm::HmacMd5, SAMPLE, &tag).unwrap());
    assert!(!mac::verify(&key, MacAlgorithm::HmacMd5, b"abc457", &tag).unwrap());
}

#[test]
fn test_dsa_generated_and_reconstructed_keys() {
    let private = dsa_private();
    let public = private.public_key().unwrap();
    let sig = signature::sign(private, SignatureAlgorithm::Sha1WithDsa, SAMPLE).unwrap();

    assert!(signature::verify(&public, SignatureAlgorithm::Sha1WithDsa, SAMPLE, &sig).unwrap());

    let rebuilt_public =
        KeyMaterial::reconstruct(KeyAlgorithm::Dsa, KeyKind::Public, public.components()).unwrap();
    assert!(
        signature::verify(&rebuilt_public, SignatureAlgorithm::Sha1WithDsa, SAMPLE, &sig).unwrap()
    );

    let rebuilt_private =
        KeyMaterial::reconstruct(KeyAlgorithm::Dsa, KeyKind::Private, private.components())
            .unwrap();
    let resigned =
        signature::sign(&rebuilt_private, SignatureAlgorithm::Sha1WithDsa, SAMPLE).unwrap();
    assert!(
        signature::verify(&public, SignatureAlgorithm::Sha1WithDsa, SAMPLE, &resigned).unwrap()
    );
}

#[test]
fn test_toy_dsa_components_rejected() {
    use sigil_crypto::{BigUint, KeyComponents};

    let components = KeyComponents::DsaPrivate {
        p: BigUint::from(293u32),
        q: BigUint::from(149u32),
        g: BigUint::from(253u32),
        x: BigUint::from(207u32),
    };

    assert!(matches!(
        KeyMaterial::reconstruct(KeyAlgorithm::Dsa, KeyKind::Private, components),
        Err(CryptoError::InvalidKeySpec(_))
    ));
}

#[test]
fn test_small_dsa_domains_rejected() {
    use sigil_crypto::{BigUint, KeyComponents};

    // Both domains are structurally consistent but far below any supported size,
    // and 91 = 7 * 13 is not even prime.
    for (p, q, g, x) in [(23u32, 11u32, 4u32, 3u32), (91, 3, 9, 2)] {
        let private = KeyComponents::DsaPrivate {
            p: BigUint::from(p),
            q: BigUint::from(q),
            g: BigUint::from(g),
            x: BigUint::from(x),
        };
        assert!(matches!(
            KeyMaterial::reconstruct(KeyAlgorithm::Dsa, KeyKind::Private, private),
            Err(CryptoError::InvalidKeySpec(_))
        ));

        let public = KeyComponents::DsaPublic {
            p: BigUint::from(p),
            q: BigUint::from(q),
            g: BigUint::from(g),
            y: BigUint::from(g).modpow(&BigUint::from(x), &BigUint::from(p)),
        };
        assert!(matches!(
            KeyMaterial::reconstruct(KeyAlgorithm::Dsa, KeyKind::Public, public),
            Err(CryptoError::InvalidKeySpec(_))
        ));
    }
}

#[test]
fn test_signature_checked_under_other_algorithm() {
    let private = rsa_private();
    let public = private.public_key().unwrap();
    let sig = signature::sign(private, SignatureAlgorithm::Sha256WithRsa, SAMPLE).unwrap();

    assert!(signature::verify(&public, SignatureAlgorithm::Sha256WithRsa, SAMPLE, &sig).unwrap());
    assert!(!signature::verify(&public, SignatureAlgorithm::Sha1WithRsa, SAMPLE, &sig).unwrap());
    assert!(!signature::verify(&public, SignatureAlgorithm::Md5WithRsa, SAMPLE, &sig).unwrap());

    // A DSA signature handed to an RSA verifier is a failed check, not an error.
    let dsa_sig = signature::sign(dsa_private(), SignatureAlgorithm::Sha1WithDsa, SAMPLE).unwrap();
    let verified =
        signature::verify(&public, SignatureAlgorithm::Sha1WithRsa, SAMPLE, &dsa_sig).unwrap();
    assert!(!verified);
}

#[test]
fn test_rsa_sample_and_wrapping() {
    let private = rsa_private();
    let public = private.public_key().unwrap();
    let spec = AlgorithmSpec::parse("RSA").unwrap();

    let output = cipher::encrypt(&public, &spec, SAMPLE).unwrap();
    assert_eq!(
        cipher::decrypt(private, &spec, &output.bytes).unwrap().as_slice(),
        SAMPLE
    );

    // The DSA private key is far larger than one RSA block.
    let wrapped = sigil_wrap::wrap(&public, dsa_private()).unwrap();
    let restored =
        sigil_wrap::unwrap(private, &wrapped, KeyAlgorithm::Dsa, KeyKind::Private).unwrap();
    assert_eq!(&restored, dsa_private());

    assert!(matches!(
        sigil_wrap::unwrap(private, &wrapped, KeyAlgorithm::Dsa, KeyKind::Public),
        Err(WrapError::UnwrapMismatch { .. })
    ));
}

#[test]
fn test_rewrap_and_data_keys() {
    let old = KeyMaterial::generate(KeyAlgorithm::DesEde, None, None).unwrap();
    let new = KeyMaterial::generate(KeyAlgorithm::Aes, None, None).unwrap();

    let data_key = sigil_wrap::generate_data_key(&old, KeyAlgorithm::Aes, Some(256)).unwrap();
    let rewrapped = sigil_wrap::rewrap(&old, &new, &data_key.wrapped).unwrap();

    let restored =
        sigil_wrap::unwrap(&new, &rewrapped, KeyAlgorithm::Aes, KeyKind::Secret).unwrap();
    assert_eq!(restored, data_key.key);
    assert!(sigil_wrap::unwrap(&old, &rewrapped, KeyAlgorithm::Aes, KeyKind::Secret).is_err());
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Note {
    text: String,
    tags: Vec<String>,
}

#[test]
fn test_sealed_note_needs_only_the_key() {
    let key = KeyMaterial::generate(KeyAlgorithm::Aes, None, None).unwrap();
    let note = Note {
        text: String::from_utf8(SAMPLE.to_vec()).unwrap(),
        tags: vec!["sample".into()],
    };

    let spec = AlgorithmSpec::parse("AES/CBC/PKCS5Padding").unwrap();
    let text = SealedValue::seal_object(&key, &spec, &note)
        .unwrap()
        .to_string();

    let sealed: SealedValue = text.parse().unwrap();
    let opened: Note = sealed.unseal_object(&key).unwrap();
    assert_eq!(opened, note);

    let other = KeyMaterial::generate(KeyAlgorithm::Des, None, None).unwrap();
    assert!(matches!(
        sealed.unseal(&other),
        Err(SealError::Crypto(CryptoError::KeyAlgorithmMismatch(_)))
    ));
}
