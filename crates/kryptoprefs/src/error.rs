//! Error types for kryptoprefs

use thiserror::Error;

/// Result type alias for preference operations
pub type Result<T> = std::result::Result<T, PrefsError>;

/// Preference error types
#[derive(Error, Debug)]
pub enum PrefsError {
    #[error("Encryption failed: {0}")]
    EncryptionError(String),

    #[error("Decryption failed: {0}")]
    DecryptionError(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationError(String),

    #[error("Invalid key material: {0}")]
    InvalidKeyMaterial(String),

    #[error("Preference file '{0}' is using a different encryption method or key")]
    KeyMismatch(String),

    #[error("Keychain error: {0}")]
    KeychainError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Cannot transform value of '{key}': {reason}")]
    TransformError { key: String, reason: String },

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Background write failed: {0}")]
    TaskError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl PrefsError {
    /// Build a transform error for the given preference key
    pub fn transform(key: &str, reason: impl std::fmt::Display) -> Self {
        Self::TransformError {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for PrefsError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskError(err.to_string())
    }
}
