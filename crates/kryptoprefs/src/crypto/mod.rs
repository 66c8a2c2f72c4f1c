//! Cryptographic building blocks for encrypted preferences
//!
//! This module provides:
//! - AES-GCM and AES-CBC value encryption (plus a pass-through scheme)
//! - Key-name hashing with SHA-512, SHA-256 or MD5
//! - Key sources: PBKDF2, Argon2id, fixed, OS keychain and hybrid keys
//! - Secure memory handling with zeroize

mod encryption;
mod hash;
mod key;
mod secure_memory;

pub use encryption::{AesCbcEncryption, AesGcmEncryption, Encryption, NoEncryption};
pub use hash::{KeyHash, Md5Hash, Sha256Hash, Sha512Hash};
pub use key::{
    derive_pbkdf2, generate_salt, Argon2Key, FixedKey, HybridKey, KeyDerivationParams,
    KeySource, KeychainKey, NoKey, Pbkdf2Key, DEFAULT_PBKDF2_ITERATIONS,
};
pub use secure_memory::{SecretKey, SecretString};
