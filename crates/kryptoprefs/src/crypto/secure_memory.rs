//! Secure memory handling with automatic zeroization

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Symmetric key material - automatically zeroed when dropped
///
/// Holds 16 bytes (AES-128) or 32 bytes (AES-256). [`SecretKey::empty`]
/// is the only other accepted shape and only pairs with `NoEncryption`.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    key: Vec<u8>,
}

impl SecretKey {
    /// Create a 256-bit key from raw bytes
    pub fn new(key: [u8; 32]) -> Self {
        Self { key: key.to_vec() }
    }

    /// Create from a slice (must be exactly 16 or 32 bytes)
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        match slice.len() {
            16 | 32 => Some(Self {
                key: slice.to_vec(),
            }),
            _ => None,
        }
    }

    /// Key with no material, used where no cipher is applied
    pub fn empty() -> Self {
        Self { key: Vec::new() }
    }

    /// Get the key bytes (use carefully - avoid copying)
    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    pub fn len(&self) -> usize {
        self.key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }
}

impl Clone for SecretKey {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
        }
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey")
            .field("len", &self.key.len())
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Decrypted secret value - automatically zeroed when dropped
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretString {
    value: String,
}

impl SecretString {
    pub fn new(value: String) -> Self {
        Self { value }
    }

    /// Get the secret value (use carefully)
    pub fn expose(&self) -> &str {
        &self.value
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretString")
            .field("value", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_key_from_slice() {
        let bytes = [42u8; 32];
        let key = SecretKey::from_slice(&bytes).unwrap();
        assert_eq!(key.as_bytes(), &bytes);

        let short = [7u8; 16];
        assert_eq!(SecretKey::from_slice(&short).unwrap().len(), 16);
    }

    #[test]
    fn test_secret_key_from_invalid_slice() {
        assert!(SecretKey::from_slice(&[42u8; 24]).is_none());
        assert!(SecretKey::from_slice(&[]).is_none());
    }

    #[test]
    fn test_empty_key() {
        let key = SecretKey::empty();
        assert!(key.is_empty());
    }

    #[test]
    fn test_debug_redacted() {
        let key = SecretKey::new([9u8; 32]);
        let debug = format!("{:?}", key);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains('9'));

        let secret = SecretString::new("hunter2".to_string());
        assert!(!format!("{:?}", secret).contains("hunter2"));
        assert_eq!(secret.expose(), "hunter2");
    }
}
