//! Value encryption schemes
//!
//! Stored format for both AES modes: `base64(iv || ciphertext)`.
//! - GCM: 12-byte IV, 16-byte auth tag appended to the ciphertext
//! - CBC: 16-byte IV, PKCS#7 padded ciphertext
//!
//! Key length picks the AES variant: 16 bytes for AES-128, 32 for AES-256.

use aes::{Aes128, Aes256};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes128Gcm, Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;

use super::SecretKey;
use crate::error::{PrefsError, Result};

const GCM_IV_SIZE: usize = 12;
const GCM_TAG_SIZE: usize = 16;
const CBC_IV_SIZE: usize = 16;

/// A reversible transformation applied to every stored value
pub trait Encryption: Send + Sync {
    /// Encrypt `text` and return the stored representation
    fn encrypt(&self, key: &SecretKey, text: &str) -> Result<String>;

    /// Reverse [`Encryption::encrypt`]
    fn decrypt(&self, key: &SecretKey, text: &str) -> Result<String>;

    /// Identifier written into the store's encryption tag
    fn tag(&self) -> &str;
}

/// AES in Galois/Counter mode (authenticated)
#[derive(Debug, Clone, Copy, Default)]
pub struct AesGcmEncryption;

impl AesGcmEncryption {
    pub const TAG: &'static str = "AES/GCM/NoPadding";

    fn seal(key: &SecretKey, nonce: &Nonce<aes_gcm::aead::consts::U12>, plaintext: &[u8]) -> Result<Vec<u8>> {
        let sealed = match key.len() {
            16 => Aes128Gcm::new_from_slice(key.as_bytes())
                .map_err(|e| PrefsError::EncryptionError(e.to_string()))?
                .encrypt(nonce, plaintext),
            32 => Aes256Gcm::new_from_slice(key.as_bytes())
                .map_err(|e| PrefsError::EncryptionError(e.to_string()))?
                .encrypt(nonce, plaintext),
            n => return Err(PrefsError::EncryptionError(format!("Unsupported AES key length: {}", n))),
        };
        sealed.map_err(|e| PrefsError::EncryptionError(e.to_string()))
    }

    fn open(key: &SecretKey, nonce: &Nonce<aes_gcm::aead::consts::U12>, sealed: &[u8]) -> Result<Vec<u8>> {
        let opened = match key.len() {
            16 => Aes128Gcm::new_from_slice(key.as_bytes())
                .map_err(|e| PrefsError::DecryptionError(e.to_string()))?
                .decrypt(nonce, sealed),
            32 => Aes256Gcm::new_from_slice(key.as_bytes())
                .map_err(|e| PrefsError::DecryptionError(e.to_string()))?
                .decrypt(nonce, sealed),
            n => return Err(PrefsError::DecryptionError(format!("Unsupported AES key length: {}", n))),
        };
        opened.map_err(|e| PrefsError::DecryptionError(e.to_string()))
    }
}

impl Encryption for AesGcmEncryption {
    fn encrypt(&self, key: &SecretKey, text: &str) -> Result<String> {
        let mut iv = [0u8; GCM_IV_SIZE];
        rand::thread_rng().fill_bytes(&mut iv);

        // aes-gcm appends the auth tag to the ciphertext
        let sealed = Self::seal(key, Nonce::from_slice(&iv), text.as_bytes())?;

        let mut data = Vec::with_capacity(GCM_IV_SIZE + sealed.len());
        data.extend_from_slice(&iv);
        data.extend_from_slice(&sealed);
        Ok(STANDARD.encode(data))
    }

    fn decrypt(&self, key: &SecretKey, text: &str) -> Result<String> {
        let data = STANDARD
            .decode(text)
            .map_err(|e| PrefsError::DecryptionError(format!("Invalid base64: {}", e)))?;

        if data.len() < GCM_IV_SIZE + GCM_TAG_SIZE {
            return Err(PrefsError::DecryptionError(format!(
                "Encrypted value too short: {} bytes",
                data.len()
            )));
        }

        let (iv, sealed) = data.split_at(GCM_IV_SIZE);
        let plaintext = Self::open(key, Nonce::from_slice(iv), sealed)?;
        String::from_utf8(plaintext)
            .map_err(|e| PrefsError::DecryptionError(format!("Invalid UTF-8: {}", e)))
    }

    fn tag(&self) -> &str {
        Self::TAG
    }
}

/// AES in cipher block chaining mode with PKCS#7 padding
#[derive(Debug, Clone, Copy, Default)]
pub struct AesCbcEncryption;

impl AesCbcEncryption {
    pub const TAG: &'static str = "AES/CBC/PKCS7Padding";
}

impl Encryption for AesCbcEncryption {
    fn encrypt(&self, key: &SecretKey, text: &str) -> Result<String> {
        let mut iv = [0u8; CBC_IV_SIZE];
        rand::thread_rng().fill_bytes(&mut iv);

        let invalid = |e: aes::cipher::InvalidLength| PrefsError::EncryptionError(e.to_string());
        let ciphertext = match key.len() {
            16 => cbc::Encryptor::<Aes128>::new_from_slices(key.as_bytes(), &iv)
                .map_err(invalid)?
                .encrypt_padded_vec_mut::<Pkcs7>(text.as_bytes()),
            32 => cbc::Encryptor::<Aes256>::new_from_slices(key.as_bytes(), &iv)
                .map_err(invalid)?
                .encrypt_padded_vec_mut::<Pkcs7>(text.as_bytes()),
            n => return Err(PrefsError::EncryptionError(format!("Unsupported AES key length: {}", n))),
        };

        let mut data = Vec::with_capacity(CBC_IV_SIZE + ciphertext.len());
        data.extend_from_slice(&iv);
        data.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(data))
    }

    fn decrypt(&self, key: &SecretKey, text: &str) -> Result<String> {
        let data = STANDARD
            .decode(text)
            .map_err(|e| PrefsError::DecryptionError(format!("Invalid base64: {}", e)))?;

        if data.len() < CBC_IV_SIZE * 2 || data.len() % CBC_IV_SIZE != 0 {
            return Err(PrefsError::DecryptionError(format!(
                "Invalid encrypted value length: {} bytes",
                data.len()
            )));
        }

        let (iv, ciphertext) = data.split_at(CBC_IV_SIZE);
        let invalid = |e: aes::cipher::InvalidLength| PrefsError::DecryptionError(e.to_string());
        let plaintext = match key.len() {
            16 => cbc::Decryptor::<Aes128>::new_from_slices(key.as_bytes(), iv)
                .map_err(invalid)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
            32 => cbc::Decryptor::<Aes256>::new_from_slices(key.as_bytes(), iv)
                .map_err(invalid)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
            n => return Err(PrefsError::DecryptionError(format!("Unsupported AES key length: {}", n))),
        }
        .map_err(|e| PrefsError::DecryptionError(e.to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|e| PrefsError::DecryptionError(format!("Invalid UTF-8: {}", e)))
    }

    fn tag(&self) -> &str {
        Self::TAG
    }
}

/// Stores values as plain text
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEncryption;

impl NoEncryption {
    pub const TAG: &'static str = "NoEncryption";
}

impl Encryption for NoEncryption {
    fn encrypt(&self, _key: &SecretKey, text: &str) -> Result<String> {
        Ok(text.to_string())
    }

    fn decrypt(&self, _key: &SecretKey, text: &str) -> Result<String> {
        Ok(text.to_string())
    }

    fn tag(&self) -> &str {
        Self::TAG
    }
}
