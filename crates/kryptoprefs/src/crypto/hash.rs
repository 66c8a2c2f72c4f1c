//! Preference key hashing
//!
//! Keys never reach the store in clear text: the stored entry name is the
//! standard base64 encoding of the key's digest.

use base64::{engine::general_purpose::STANDARD, Engine};
use md5::Md5;
use sha2::{Digest, Sha256, Sha512};

/// Maps a preference key to the entry name used in the store
pub trait KeyHash: Send + Sync {
    fn hash(&self, text: &str) -> String;

    /// Identifier written into the store's encryption tag
    fn tag(&self) -> &str;
}

fn encode_digest<D: Digest>(text: &str) -> String {
    STANDARD.encode(D::digest(text.as_bytes()))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sha512Hash;

impl KeyHash for Sha512Hash {
    fn hash(&self, text: &str) -> String {
        encode_digest::<Sha512>(text)
    }

    fn tag(&self) -> &str {
        "SHA-512"
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hash;

impl KeyHash for Sha256Hash {
    fn hash(&self, text: &str) -> String {
        encode_digest::<Sha256>(text)
    }

    fn tag(&self) -> &str {
        "SHA-256"
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Md5Hash;

impl KeyHash for Md5Hash {
    fn hash(&self, text: &str) -> String {
        encode_digest::<Md5>(text)
    }

    fn tag(&self) -> &str {
        "MD5"
    }
}
