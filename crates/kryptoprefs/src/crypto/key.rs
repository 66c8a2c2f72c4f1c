//! Key sources for value encryption
//!
//! Each source yields the symmetric key handed to an [`Encryption`] scheme:
//! - [`Pbkdf2Key`]: PBKDF2-HMAC-SHA1 over a passphrase and salt
//! - [`Argon2Key`]: Argon2id over a passphrase and salt
//! - [`FixedKey`]: the first 16 bytes of a string, used as-is
//! - [`KeychainKey`]: random key generated once and kept in the OS keychain
//! - [`HybridKey`]: random passphrase/salt kept in a companion store, then PBKDF2
//! - [`NoKey`]: no key material, for unencrypted stores
//!
//! [`Encryption`]: super::Encryption

use argon2::{Algorithm, Argon2, Params, Version};
use async_trait::async_trait;
use keyring::Entry;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::{SecretKey, SecretString};
use crate::error::{PrefsError, Result};
use crate::prefs::KryptoPrefs;

/// Default PBKDF2 iteration count
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 1000;

/// Keychain service name for generated keys
const KEYCHAIN_SERVICE: &str = "kryptoprefs";

const FIXED_KEY_LEN: usize = 16;

/// Produces the key used to encrypt and decrypt stored values
#[async_trait]
pub trait KeySource: Send + Sync {
    async fn key(&self) -> Result<SecretKey>;

    /// Identifier written into the store's encryption tag
    fn tag(&self) -> &str;
}

/// Generate a random salt (32 hex characters)
pub fn generate_salt() -> String {
    random_hex(16)
}

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn check_passphrase(pass: &str, salt: &str) -> Result<()> {
    if pass.is_empty() {
        return Err(PrefsError::InvalidKeyMaterial("passphrase is empty".to_string()));
    }
    if salt.is_empty() {
        return Err(PrefsError::InvalidKeyMaterial("salt is empty".to_string()));
    }
    Ok(())
}

/// Derive a 256-bit key with PBKDF2-HMAC-SHA1
pub fn derive_pbkdf2(pass: &str, salt: &str, iterations: u32) -> Result<SecretKey> {
    check_passphrase(pass, salt)?;
    if iterations == 0 {
        return Err(PrefsError::InvalidKeyMaterial(
            "iteration count must be positive".to_string(),
        ));
    }

    let mut key_bytes = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<Sha1>(pass.as_bytes(), salt.as_bytes(), iterations, &mut key_bytes);
    debug!("Derived PBKDF2 key with {} iterations", iterations);

    Ok(SecretKey::new(key_bytes))
}

/// Passphrase-based key derived once with PBKDF2-HMAC-SHA1
pub struct Pbkdf2Key {
    key: SecretKey,
}

impl Pbkdf2Key {
    pub const TAG: &'static str = "PBKDF2WithHmacSHA1";

    pub fn new(pass: &str, salt: &str, iterations: u32) -> Result<Self> {
        Ok(Self {
            key: derive_pbkdf2(pass, salt, iterations)?,
        })
    }

    /// Derive with [`DEFAULT_PBKDF2_ITERATIONS`]
    pub fn with_default_iterations(pass: &str, salt: &str) -> Result<Self> {
        Self::new(pass, salt, DEFAULT_PBKDF2_ITERATIONS)
    }
}

#[async_trait]
impl KeySource for Pbkdf2Key {
    async fn key(&self) -> Result<SecretKey> {
        Ok(self.key.clone())
    }

    fn tag(&self) -> &str {
        Self::TAG
    }
}

/// Parameters for Argon2id key derivation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyDerivationParams {
    /// Memory cost in KiB (default: 65536 = 64MB)
    pub memory_cost: u32,
    /// Time cost / iterations (default: 3)
    pub time_cost: u32,
    /// Parallelism (default: 4)
    pub parallelism: u32,
}

impl Default for KeyDerivationParams {
    fn default() -> Self {
        Self {
            memory_cost: 65536, // 64 MB
            time_cost: 3,
            parallelism: 4,
        }
    }
}

/// Passphrase-based key derived once with Argon2id
pub struct Argon2Key {
    key: SecretKey,
}

impl Argon2Key {
    pub const TAG: &'static str = "Argon2id";

    /// Derive a 256-bit key. The salt must be at least 8 bytes.
    pub fn new(pass: &str, salt: &str, params: Option<KeyDerivationParams>) -> Result<Self> {
        check_passphrase(pass, salt)?;
        let params = params.unwrap_or_default();

        let argon2_params = Params::new(
            params.memory_cost,
            params.time_cost,
            params.parallelism,
            Some(32), // Output length: 32 bytes = 256 bits
        )
        .map_err(|e| PrefsError::KeyDerivationError(e.to_string()))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

        let mut key_bytes = [0u8; 32];
        argon2
            .hash_password_into(pass.as_bytes(), salt.as_bytes(), &mut key_bytes)
            .map_err(|e| PrefsError::KeyDerivationError(e.to_string()))?;

        Ok(Self {
            key: SecretKey::new(key_bytes),
        })
    }
}

#[async_trait]
impl KeySource for Argon2Key {
    async fn key(&self) -> Result<SecretKey> {
        Ok(self.key.clone())
    }

    fn tag(&self) -> &str {
        Self::TAG
    }
}

/// AES-128 key taken verbatim from the first 16 bytes of a string
pub struct FixedKey {
    key: SecretKey,
}

impl FixedKey {
    pub const TAG: &'static str = "FixedKey";

    pub fn new(key: &str) -> Result<Self> {
        let bytes = key.as_bytes();
        if bytes.len() < FIXED_KEY_LEN {
            return Err(PrefsError::InvalidKeyMaterial(format!(
                "fixed key needs at least {} bytes, got {}",
                FIXED_KEY_LEN,
                bytes.len()
            )));
        }

        let key = SecretKey::from_slice(&bytes[..FIXED_KEY_LEN])
            .ok_or_else(|| PrefsError::InvalidKeyMaterial("bad fixed key".to_string()))?;
        Ok(Self { key })
    }
}

#[async_trait]
impl KeySource for FixedKey {
    async fn key(&self) -> Result<SecretKey> {
        Ok(self.key.clone())
    }

    fn tag(&self) -> &str {
        Self::TAG
    }
}

/// Random 256-bit key kept in the OS keychain under an alias
///
/// The key is generated on first use and read back on later runs.
pub struct KeychainKey {
    alias: String,
    key: OnceCell<SecretKey>,
}

impl KeychainKey {
    pub const TAG: &'static str = "OsKeychain";

    pub fn new(alias: &str) -> Self {
        Self {
            alias: alias.to_string(),
            key: OnceCell::new(),
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(KEYCHAIN_SERVICE, &self.alias)
            .map_err(|e| PrefsError::KeychainError(e.to_string()))
    }

    fn load_or_create(&self) -> Result<SecretKey> {
        let entry = self.entry()?;

        match entry.get_password() {
            Ok(encoded) => {
                let bytes = hex::decode(encoded.trim())
                    .map_err(|e| PrefsError::KeychainError(format!("Invalid key hex: {}", e)))?;
                debug!("Loaded keychain key: {}", self.alias);
                SecretKey::from_slice(&bytes).ok_or_else(|| {
                    PrefsError::KeychainError(format!("Invalid key length: {}", bytes.len()))
                })
            }
            Err(keyring::Error::NoEntry) => {
                let mut bytes = [0u8; 32];
                rand::rngs::OsRng.fill_bytes(&mut bytes);
                entry
                    .set_password(&hex::encode(bytes))
                    .map_err(|e| PrefsError::KeychainError(e.to_string()))?;
                info!("Generated keychain key: {}", self.alias);
                Ok(SecretKey::new(bytes))
            }
            Err(e) => Err(PrefsError::KeychainError(e.to_string())),
        }
    }

    /// Remove the key from the keychain; values encrypted with it become unreadable
    pub fn delete(&self) -> Result<()> {
        match self.entry()?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(PrefsError::KeychainError(e.to_string())),
        }
    }
}

#[async_trait]
impl KeySource for KeychainKey {
    async fn key(&self) -> Result<SecretKey> {
        self.key
            .get_or_try_init(|| async { self.load_or_create() })
            .await
            .cloned()
    }

    fn tag(&self) -> &str {
        Self::TAG
    }
}

/// PBKDF2 key over a random passphrase and salt kept in a companion store
///
/// The companion store should itself be protected by a key that does not
/// need user input, typically [`KeychainKey`].
pub struct HybridKey {
    secrets: KryptoPrefs,
    pass_key: String,
    salt_key: String,
    key: OnceCell<SecretKey>,
}

impl HybridKey {
    pub const TAG: &'static str = "HybridKey";

    pub fn new(secrets: KryptoPrefs, name: &str) -> Self {
        Self {
            secrets,
            pass_key: format!("{}-{}-pass", Self::TAG, name),
            salt_key: format!("{}-{}-salt", Self::TAG, name),
            key: OnceCell::new(),
        }
    }

    async fn load_or_create(&self) -> Result<SecretKey> {
        let stored_pass = self.secrets.get_string(&self.pass_key, None).await?;
        let stored_salt = self.secrets.get_string(&self.salt_key, None).await?;

        let (pass, salt) = match (stored_pass, stored_salt) {
            (Some(pass), Some(salt)) => (SecretString::new(pass), salt),
            _ => {
                let pass = SecretString::new(random_hex(32));
                let salt = generate_salt();
                self.secrets.put_string(&self.pass_key, Some(pass.expose())).await?;
                self.secrets.put_string(&self.salt_key, Some(&salt)).await?;
                info!("Generated hybrid key material in '{}'", self.secrets.name());
                (pass, salt)
            }
        };

        derive_pbkdf2(pass.expose(), &salt, DEFAULT_PBKDF2_ITERATIONS)
    }
}

#[async_trait]
impl KeySource for HybridKey {
    async fn key(&self) -> Result<SecretKey> {
        self.key
            .get_or_try_init(|| self.load_or_create())
            .await
            .cloned()
    }

    fn tag(&self) -> &str {
        Self::TAG
    }
}

/// No key material; pair with `NoEncryption`
#[derive(Debug, Clone, Copy, Default)]
pub struct NoKey;

#[async_trait]
impl KeySource for NoKey {
    async fn key(&self) -> Result<SecretKey> {
        Ok(SecretKey::empty())
    }

    fn tag(&self) -> &str {
        "NoKey"
    }
}
