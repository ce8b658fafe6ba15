//! Per-block decryption for archives carrying the encrypted-files flag.
//!
//! SPECULATIVE: no archive using this flag has been seen in the wild. Key and
//! IV come from the last 20 bytes of the block-size table (10 bytes each,
//! zero-padded to 16) and blocks are AES-128-CBC with PKCS#7 padding. Do not
//! change the derivation without a verified sample.

use crate::archive::block_table::CIPHER_MATERIAL_SIZE;
use crate::error::{PsarcError, Result};
use aes::Aes128;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};

type Aes128CbcDec = cbc::Decryptor<Aes128>;
type Aes128CbcEnc = cbc::Encryptor<Aes128>;

const KEY_MATERIAL: usize = CIPHER_MATERIAL_SIZE / 2;

/// Split the trailing table bytes into a zero-padded key and IV
pub fn derive_key_iv(material: &[u8]) -> Result<([u8; 16], [u8; 16])> {
    if material.len() != CIPHER_MATERIAL_SIZE {
        return Err(PsarcError::DecryptionFailed(format!(
            "Expected {} bytes of key material, got {}",
            CIPHER_MATERIAL_SIZE,
            material.len()
        )));
    }

    let mut key = [0u8; 16];
    let mut iv = [0u8; 16];
    key[..KEY_MATERIAL].copy_from_slice(&material[..KEY_MATERIAL]);
    iv[..KEY_MATERIAL].copy_from_slice(&material[KEY_MATERIAL..]);
    Ok((key, iv))
}

/// Decrypt one block in place, returning the plaintext length
pub fn decrypt_block(block: &mut [u8], material: &[u8]) -> Result<usize> {
    let (key, iv) = derive_key_iv(material)?;
    let len = block.len();
    let plaintext = Aes128CbcDec::new(&key.into(), &iv.into())
        .decrypt_padded_mut::<Pkcs7>(block)
        .map_err(|_| {
            PsarcError::DecryptionFailed(format!(
                "Block of {} bytes is not valid AES-CBC data",
                len
            ))
        })?;
    Ok(plaintext.len())
}

/// Encrypt one block with the same derivation
pub fn encrypt_block(block: &[u8], material: &[u8]) -> Result<Vec<u8>> {
    let (key, iv) = derive_key_iv(material)?;
    Ok(Aes128CbcEnc::new(&key.into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(block))
}
