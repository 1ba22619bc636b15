//! Block cipher engine (AES, DES, DESede in ECB or CBC).
//!
//! Input is buffered until whole blocks are available. When decrypting with
//! padding the last full block is always held back, since only `finalize`
//! knows whether it is the one carrying the padding.

use cipher::{
    block_padding::{Pkcs7, RawPadding},
    generic_array::GenericArray,
    BlockCipher, BlockDecrypt, BlockDecryptMut, BlockEncrypt, BlockEncryptMut, KeyInit, KeyIvInit,
};
use zeroize::Zeroizing;

use super::spec::{AlgorithmParameters, CipherAlgorithm, Direction, Mode, Padding, Transformation};
use super::CipherCore;
use crate::error::CryptoError;
use crate::random::generate_bytes;

/// Applies the keyed block function to a block-aligned buffer in place.
trait BlockTransform: Send {
    fn apply(&mut self, blocks: &mut [u8]);
}

struct Encrypting<C>(C);

impl<C: BlockEncryptMut + Send> BlockTransform for Encrypting<C> {
    fn apply(&mut self, blocks: &mut [u8]) {
        for block in blocks.chunks_exact_mut(C::block_size()) {
            self.0.encrypt_block_mut(GenericArray::from_mut_slice(block));
        }
    }
}

struct Decrypting<C>(C);

impl<C: BlockDecryptMut + Send> BlockTransform for Decrypting<C> {
    fn apply(&mut self, blocks: &mut [u8]) {
        for block in blocks.chunks_exact_mut(C::block_size()) {
            self.0.decrypt_block_mut(GenericArray::from_mut_slice(block));
        }
    }
}

fn key_length_error(e: cipher::InvalidLength) -> CryptoError {
    CryptoError::InvalidKeySpec(e.to_string())
}

fn build_transform<C>(
    mode: Mode,
    direction: Direction,
    key: &[u8],
    iv: &[u8],
) -> Result<Box<dyn BlockTransform>, CryptoError>
where
    C: BlockCipher + BlockEncrypt + BlockDecrypt + KeyInit + Send + 'static,
{
    let transform: Box<dyn BlockTransform> = match (mode, direction) {
        (Mode::Ecb, Direction::Encrypt) => Box::new(Encrypting(
            ecb::Encryptor::<C>::new_from_slice(key).map_err(key_length_error)?,
        )),
        (Mode::Ecb, _) => Box::new(Decrypting(
            ecb::Decryptor::<C>::new_from_slice(key).map_err(key_length_error)?,
        )),
        (Mode::Cbc, Direction::Encrypt) => Box::new(Encrypting(
            cbc::Encryptor::<C>::new_from_slices(key, iv).map_err(key_length_error)?,
        )),
        (Mode::Cbc, _) => Box::new(Decrypting(
            cbc::Decryptor::<C>::new_from_slices(key, iv).map_err(key_length_error)?,
        )),
    };
    Ok(transform)
}

/// Session core for block ciphers.
pub(crate) struct BlockCore {
    transform: Box<dyn BlockTransform>,
    direction: Direction,
    padded: bool,
    block_size: usize,
    buffer: Zeroizing<Vec<u8>>,
}

impl BlockCore {
    /// Keys a block cipher for `transformation`.
    ///
    /// CBC encryption without an IV generates a random one; the parameters
    /// actually used are returned alongside the core.
    pub(crate) fn new(
        transformation: &Transformation,
        direction: Direction,
        key: &[u8],
        parameters: Option<&AlgorithmParameters>,
    ) -> Result<(Self, Option<AlgorithmParameters>), CryptoError> {
        let algorithm = transformation.algorithm();
        let block_size = algorithm.block_size().ok_or_else(|| {
            CryptoError::UnsupportedTransformation(format!(
                "{transformation} is not a block cipher"
            ))
        })?;

        let parameters = match (transformation.mode(), parameters) {
            (Mode::Ecb, None) => None,
            (Mode::Ecb, Some(_)) => {
                return Err(CryptoError::InvalidParameters(
                    "ECB mode does not take an IV".into(),
                ));
            },
            (Mode::Cbc, Some(params)) => {
                if params.iv().len() != block_size {
                    return Err(CryptoError::InvalidParameters(format!(
                        "IV must be {block_size} bytes, got {}",
                        params.iv().len()
                    )));
                }
                Some(params.clone())
            },
            (Mode::Cbc, None) if direction == Direction::Encrypt => {
                Some(AlgorithmParameters::from_iv(generate_bytes(block_size)))
            },
            (Mode::Cbc, None) => {
                return Err(CryptoError::InvalidParameters(
                    "CBC decryption requires the IV used for encryption".into(),
                ));
            },
        };
        let iv = parameters.as_ref().map(AlgorithmParameters::iv).unwrap_or_default();

        let mode = transformation.mode();
        let transform = match algorithm {
            CipherAlgorithm::Aes => match key.len() {
                16 => build_transform::<aes::Aes128>(mode, direction, key, iv)?,
                24 => build_transform::<aes::Aes192>(mode, direction, key, iv)?,
                32 => build_transform::<aes::Aes256>(mode, direction, key, iv)?,
                n => {
                    return Err(CryptoError::InvalidKeySpec(format!(
                        "AES key must be 16, 24 or 32 bytes, got {n}"
                    )));
                },
            },
            CipherAlgorithm::Des => build_transform::<des::Des>(mode, direction, key, iv)?,
            CipherAlgorithm::DesEde => build_transform::<des::TdesEde3>(mode, direction, key, iv)?,
            CipherAlgorithm::Rsa => {
                return Err(CryptoError::UnsupportedTransformation(
                    transformation.to_string(),
                ));
            },
        };

        let core = Self {
            transform,
            direction,
            padded: transformation.padding() == Padding::Pkcs5,
            block_size,
            buffer: Zeroizing::new(Vec::with_capacity(block_size * 2)),
        };
        Ok((core, parameters))
    }

    fn holds_last_block(&self) -> bool {
        self.padded && self.direction == Direction::Decrypt
    }
}

impl CipherCore for BlockCore {
    fn update(&mut self, input: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.buffer.extend_from_slice(input);

        let buffered = self.buffer.len();
        let ready = if self.holds_last_block() && buffered > 0 {
            (buffered - 1) / self.block_size * self.block_size
        } else {
            buffered / self.block_size * self.block_size
        };

        let mut output: Vec<u8> = self.buffer.drain(..ready).collect();
        self.transform.apply(&mut output);
        Ok(output)
    }

    fn finalize(&mut self) -> Result<Vec<u8>, CryptoError> {
        let remaining = self.buffer.len();

        if self.direction == Direction::Encrypt {
            if !self.padded {
                if remaining != 0 {
                    return Err(CryptoError::InvalidInput(format!(
                        "input is not a multiple of the {}-byte block size",
                        self.block_size
                    )));
                }
                return Ok(Vec::new());
            }

            let mut block = vec![0u8; self.block_size];
            block[..remaining].copy_from_slice(&self.buffer);
            Pkcs7::raw_pad(&mut block, remaining);
            self.buffer.clear();
            self.transform.apply(&mut block);
            return Ok(block);
        }

        if remaining % self.block_size != 0 {
            return Err(CryptoError::InvalidInput(format!(
                "ciphertext is not a multiple of the {}-byte block size",
                self.block_size
            )));
        }
        if !self.padded {
            let mut output: Vec<u8> = self.buffer.drain(..).collect();
            self.transform.apply(&mut output);
            return Ok(output);
        }
        if remaining == 0 {
            return Err(CryptoError::InvalidInput(
                "padded ciphertext must contain at least one block".into(),
            ));
        }

        let mut block = Zeroizing::new(self.buffer.drain(..).collect::<Vec<u8>>());
        self.transform.apply(&mut block);
        let plaintext = Pkcs7::raw_unpad(&block).map_err(|_| CryptoError::PaddingValidationError)?;
        Ok(plaintext.to_vec())
    }
}
