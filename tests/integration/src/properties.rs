//! Property-based tests across the engines.

use std::io::Cursor;

use proptest::prelude::*;
use sigil_crypto::{
    cipher, digest, process_stream, signature, AlgorithmSpec, CryptoError, DigestAlgorithm,
    Direction, KeyAlgorithm, KeyKind, KeyMaterial, SignatureAlgorithm, SignatureValue,
    StreamConfig,
};

use crate::*;

fn padded_transformation() -> impl Strategy<Value = &'static str> {
    prop::sample::select(PADDED_TRANSFORMATIONS)
}

fn chunk_sizes() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1usize..40, 0..16)
}

/// Spec with a fixed IV for CBC so two encryptions are comparable.
fn fixed_spec(name: &str) -> AlgorithmSpec {
    let transformation = transformation(name);
    let spec = AlgorithmSpec::new(transformation);
    match cipher::resolve(&transformation).block_size() {
        Some(size) if transformation.requires_iv() => spec.with_iv(vec![0x5a; size]),
        _ => spec,
    }
}

fn drive(
    direction: Direction,
    key: &KeyMaterial,
    spec: &AlgorithmSpec,
    pieces: &[&[u8]],
) -> Vec<u8> {
    let mut session = cipher::init(direction, key, spec).unwrap();
    let mut out = Vec::new();
    for piece in pieces {
        out.extend(session.update(piece).unwrap());
    }
    out.extend(session.finalize().unwrap());
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Decrypting with the returned parameters recovers the plaintext.
    #[test]
    fn block_cipher_roundtrip(
        name in padded_transformation(),
        plaintext in prop::collection::vec(any::<u8>(), 0..300),
    ) {
        let transformation = transformation(name);
        let key = secret_key_for(&transformation);
        let spec = AlgorithmSpec::new(transformation);

        let output = cipher::encrypt(&key, &spec, &plaintext).unwrap();
        let block = cipher::resolve(&transformation).block_size().unwrap();
        prop_assert_eq!(output.bytes.len(), (plaintext.len() / block + 1) * block);

        let decrypt_spec = spec.with_parameters(output.parameters);
        let decrypted = cipher::decrypt(&key, &decrypt_spec, &output.bytes).unwrap();
        prop_assert_eq!(decrypted.as_slice(), plaintext.as_slice());
    }

    /// Unpadded modes round trip block aligned input without expansion.
    #[test]
    fn unpadded_roundtrip(blocks in prop::collection::vec(any::<[u8; 16]>(), 0..8)) {
        let plaintext = blocks.concat();
        let spec = AlgorithmSpec::parse("AES/CBC/NoPadding").unwrap().with_iv(vec![7; 16]);
        let key = KeyMaterial::generate(KeyAlgorithm::Aes, Some(192), None).unwrap();

        let output = cipher::encrypt(&key, &spec, &plaintext).unwrap();
        prop_assert_eq!(output.bytes.len(), plaintext.len());
        let decrypted = cipher::decrypt(&key, &spec, &output.bytes).unwrap();
        prop_assert_eq!(decrypted.as_slice(), plaintext.as_slice());
    }

    /// Feeding any chunking gives the same bytes as the one-shot call, both ways.
    #[test]
    fn chunked_updates_match_one_shot(
        name in padded_transformation(),
        plaintext in prop::collection::vec(any::<u8>(), 0..300),
        encrypt_sizes in chunk_sizes(),
        decrypt_sizes in chunk_sizes(),
    ) {
        let spec = fixed_spec(name);
        let key = secret_key_for(&spec.transformation);

        let one_shot = cipher::encrypt(&key, &spec, &plaintext).unwrap().bytes;
        let pieces = split_by(&plaintext, &encrypt_sizes);
        let chunked = drive(Direction::Encrypt, &key, &spec, &pieces);
        prop_assert_eq!(&chunked, &one_shot);

        let pieces = split_by(&one_shot, &decrypt_sizes);
        let decrypted = drive(Direction::Decrypt, &key, &spec, &pieces);
        let expected = cipher::decrypt(&key, &spec, &one_shot).unwrap();
        prop_assert_eq!(decrypted.as_slice(), expected.as_slice());
        prop_assert_eq!(decrypted, plaintext);
    }

    /// The stream buffer size never changes the output.
    #[test]
    fn stream_buffer_size_is_invisible(
        name in padded_transformation(),
        plaintext in prop::collection::vec(any::<u8>(), 0..2000),
        buffer_size in 1usize..512,
    ) {
        let spec = fixed_spec(name);
        let key = secret_key_for(&spec.transformation);
        let config = StreamConfig::new(buffer_size).unwrap();

        let mut session = cipher::init(Direction::Encrypt, &key, &spec).unwrap();
        let mut sink = Vec::new();
        let mut source = Cursor::new(&plaintext);
        let written = process_stream(&mut session, &mut source, &mut sink, &config).unwrap();

        prop_assert_eq!(written as usize, sink.len());
        prop_assert_eq!(&sink, &cipher::encrypt(&key, &spec, &plaintext).unwrap().bytes);
    }

    /// Corrupting the last ciphertext block never hands back the original plaintext.
    #[test]
    fn corrupted_last_block_is_not_silently_accepted(
        name in padded_transformation(),
        plaintext in prop::collection::vec(any::<u8>(), 1..100),
        flip in 0usize..64,
    ) {
        let spec = fixed_spec(name);
        let key = secret_key_for(&spec.transformation);
        let mut ciphertext = cipher::encrypt(&key, &spec, &plaintext).unwrap().bytes;

        let block = cipher::resolve(&spec.transformation).block_size().unwrap();
        let index = ciphertext.len() - block + (flip / 8) % block;
        ciphertext[index] ^= 1 << (flip % 8);

        match cipher::decrypt(&key, &spec, &ciphertext) {
            Ok(decrypted) => prop_assert_ne!(decrypted.as_slice(), plaintext.as_slice()),
            Err(e) => {
                prop_assert!(matches!(e, CryptoError::PaddingValidationError), "unexpected {e}")
            },
        }
    }

    /// Digests are pure and fixed length.
    #[test]
    fn digest_is_deterministic(data in prop::collection::vec(any::<u8>(), 0..512)) {
        for algorithm in [
            DigestAlgorithm::Md5,
            DigestAlgorithm::Sha1,
            DigestAlgorithm::Sha256,
            DigestAlgorithm::Sha384,
            DigestAlgorithm::Sha512,
        ] {
            let first = digest::digest(algorithm, &data);
            prop_assert_eq!(first.len(), algorithm.output_len());
            prop_assert_eq!(first, digest::digest(algorithm, &data));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// RSA round trips every padding within its size limit.
    #[test]
    fn rsa_roundtrip(
        choice in 0usize..RSA_TRANSFORMATIONS.len(),
        plaintext in prop::collection::vec(any::<u8>(), 0..62),
    ) {
        let (name, limit) = RSA_TRANSFORMATIONS[choice];
        prop_assume!(plaintext.len() <= limit);
        let spec = AlgorithmSpec::parse(name).unwrap();
        let public = rsa_private().public_key().unwrap();

        let output = cipher::encrypt(&public, &spec, &plaintext).unwrap();
        prop_assert_eq!(output.bytes.len(), 128);
        prop_assert!(output.parameters.is_none());

        let decrypted = cipher::decrypt(rsa_private(), &spec, &output.bytes).unwrap();
        prop_assert_eq!(decrypted.as_slice(), plaintext.as_slice());
    }

    /// Signatures verify, and any single flipped bit breaks them.
    #[test]
    fn signature_bit_flips(
        algorithm in prop::sample::select(SignatureAlgorithm::ALL.to_vec()),
        message in prop::collection::vec(any::<u8>(), 1..128),
        bit in any::<usize>(),
    ) {
        let private = match algorithm.key_algorithm() {
            KeyAlgorithm::Rsa => rsa_private(),
            _ => dsa_private(),
        };
        let public = private.public_key().unwrap();

        let sig = signature::sign(private, algorithm, &message).unwrap();
        prop_assert!(signature::verify(&public, algorithm, &message, &sig).unwrap());

        let mut tampered_message = message.clone();
        let i = bit % (message.len() * 8);
        tampered_message[i / 8] ^= 1 << (i % 8);
        prop_assert!(!signature::verify(&public, algorithm, &tampered_message, &sig).unwrap());

        let mut tampered = SignatureValue { bytes: sig.bytes.clone(), algorithm };
        let j = bit % (sig.bytes.len() * 8);
        tampered.bytes[j / 8] ^= 1 << (j % 8);
        prop_assert!(!signature::verify(&public, algorithm, &message, &tampered).unwrap());
    }

    /// Unwrapping restores a key that decrypts what the original encrypted.
    #[test]
    fn wrapped_keys_stay_usable(
        wrapping in prop::sample::select(
            vec![KeyAlgorithm::Aes, KeyAlgorithm::Des, KeyAlgorithm::DesEde],
        ),
        name in padded_transformation(),
        plaintext in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let wrapping_key = KeyMaterial::generate(wrapping, None, None).unwrap();
        let spec = fixed_spec(name);
        let key = secret_key_for(&spec.transformation);
        let ciphertext = cipher::encrypt(&key, &spec, &plaintext).unwrap().bytes;

        let wrapped = sigil_wrap::wrap(&wrapping_key, &key).unwrap();
        let restored =
            sigil_wrap::unwrap(&wrapping_key, &wrapped, key.algorithm(), KeyKind::Secret).unwrap();

        prop_assert_eq!(&restored, &key);
        let decrypted = cipher::decrypt(&restored, &spec, &ciphertext).unwrap();
        prop_assert_eq!(decrypted.as_slice(), plaintext.as_slice());
    }
}
