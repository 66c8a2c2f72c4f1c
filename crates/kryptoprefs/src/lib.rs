//! # kryptoprefs
//!
//! Typed, encrypted key/value preferences including:
//! - AES-GCM / AES-CBC value encryption with hashed entry names
//! - PBKDF2, Argon2id, OS keychain and hybrid key sources
//! - JSON file and in-memory preference stores
//! - Typed preference handles with defaults, memory backing and observers

pub mod config;
pub mod context;
pub mod crypto;
pub mod error;
pub mod store;
mod builder;
mod prefs;

pub use builder::KryptoBuilder;
pub use config::{ConfigManager, EncryptionKind, HashKind, KeyKind, PrefsConfig};
pub use context::{KryptoContext, NullablePreference, Preference, Transform};
pub use error::{PrefsError, Result};
pub use prefs::{KryptoPrefs, KEY_ENCRYPTION_TAG};
pub use store::{FilePreferenceStore, MemoryPreferenceStore, PreferenceStore};
