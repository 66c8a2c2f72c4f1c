//! Preference file configuration
//!
//! Describes which encryption, key hash and key source a preference file
//! uses. Stored as plain JSON next to the preference files; it holds no
//! secrets.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::crypto::{
    AesCbcEncryption, AesGcmEncryption, Encryption, KeyDerivationParams, KeyHash, Md5Hash,
    NoEncryption, Sha256Hash, Sha512Hash, DEFAULT_PBKDF2_ITERATIONS,
};
use crate::error::{PrefsError, Result};

/// Config file name inside the storage directory
pub const CONFIG_FILE_NAME: &str = "kryptoprefs.json";

const CONFIG_VERSION: u32 = 1;

/// Value encryption scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum EncryptionKind {
    #[default]
    AesGcm,
    AesCbc,
    None,
}

impl EncryptionKind {
    pub fn build(&self) -> Arc<dyn Encryption> {
        match self {
            EncryptionKind::AesGcm => Arc::new(AesGcmEncryption),
            EncryptionKind::AesCbc => Arc::new(AesCbcEncryption),
            EncryptionKind::None => Arc::new(NoEncryption),
        }
    }
}

/// Hash applied to entry names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum HashKind {
    #[default]
    Sha512,
    Sha256,
    Md5,
}

impl HashKind {
    pub fn build(&self) -> Arc<dyn KeyHash> {
        match self {
            HashKind::Sha512 => Arc::new(Sha512Hash),
            HashKind::Sha256 => Arc::new(Sha256Hash),
            HashKind::Md5 => Arc::new(Md5Hash),
        }
    }
}

/// Where the encryption key comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum KeyKind {
    /// PBKDF2 over a user passphrase and salt
    Pbkdf2 { iterations: u32 },
    /// Argon2id over a user passphrase and salt
    Argon2(KeyDerivationParams),
    /// Random key kept in the OS keychain
    Keychain,
    /// Random passphrase kept in a keychain-protected companion file
    Hybrid,
    None,
}

impl Default for KeyKind {
    fn default() -> Self {
        KeyKind::Pbkdf2 {
            iterations: DEFAULT_PBKDF2_ITERATIONS,
        }
    }
}

impl KeyKind {
    /// Whether this key source needs a passphrase and salt
    pub fn needs_passphrase(&self) -> bool {
        matches!(self, KeyKind::Pbkdf2 { .. } | KeyKind::Argon2(_))
    }
}

/// Preference file configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrefsConfig {
    /// Config file version
    pub version: u32,
    pub encryption: EncryptionKind,
    pub hash: HashKind,
    pub key: KeyKind,
    /// Directory for preference files, if not the config's own directory
    pub storage_dir: Option<PathBuf>,
}

impl Default for PrefsConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            encryption: EncryptionKind::default(),
            hash: HashKind::default(),
            key: KeyKind::default(),
            storage_dir: None,
        }
    }
}

impl PrefsConfig {
    /// Reject combinations that cannot open a preference file
    pub fn validate(&self) -> Result<()> {
        if self.version > CONFIG_VERSION {
            return Err(PrefsError::ConfigError(format!(
                "unsupported config version {}",
                self.version
            )));
        }
        if let KeyKind::Pbkdf2 { iterations: 0 } = self.key {
            return Err(PrefsError::ConfigError(
                "pbkdf2 iterations must be positive".to_string(),
            ));
        }
        if self.key == KeyKind::None && self.encryption != EncryptionKind::None {
            return Err(PrefsError::ConfigError(format!(
                "{:?} encryption needs a key source",
                self.encryption
            )));
        }
        Ok(())
    }

    /// Directory holding preference files; `base` unless overridden
    pub fn storage_dir_or<'a>(&'a self, base: &'a Path) -> &'a Path {
        self.storage_dir.as_deref().unwrap_or(base)
    }
}

/// Loads and saves [`PrefsConfig`]
pub struct ConfigManager {
    config_file: PathBuf,
    config: PrefsConfig,
}

impl ConfigManager {
    /// Load `kryptoprefs.json` from `dir`, falling back to defaults
    pub fn new(dir: &Path) -> Self {
        let config_file = dir.join(CONFIG_FILE_NAME);
        let config = Self::load_from_file(&config_file).unwrap_or_else(|e| {
            warn!("Ignoring unreadable config {:?}: {}", config_file, e);
            PrefsConfig::default()
        });

        Self {
            config_file,
            config,
        }
    }

    fn load_from_file(path: &Path) -> Result<PrefsConfig> {
        if !path.exists() {
            debug!("No config file found, using defaults");
            return Ok(PrefsConfig::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: PrefsConfig = serde_json::from_str(&contents)?;
        debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn path(&self) -> &Path {
        &self.config_file
    }

    /// Write the config atomically
    pub async fn save(&self) -> Result<()> {
        let contents = serde_json::to_string_pretty(&self.config)?;

        if let Some(parent) = self.config_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let temp_path = self.config_file.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents).await?;
        tokio::fs::rename(&temp_path, &self.config_file).await?;

        debug!("Saved config to {:?}", self.config_file);
        Ok(())
    }

    pub fn get(&self) -> &PrefsConfig {
        &self.config
    }

    pub fn get_mut(&mut self) -> &mut PrefsConfig {
        &mut self.config
    }

    /// Replace the config and save it
    pub async fn update(&mut self, config: PrefsConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        self.save().await
    }

    /// Back to defaults; the config file is deleted
    pub async fn reset(&mut self) -> Result<()> {
        self.config = PrefsConfig::default();

        if self.config_file.exists() {
            tokio::fs::remove_file(&self.config_file)
                .await
                .map_err(|e| PrefsError::StorageError(e.to_string()))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_config_default() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::new(temp_dir.path());

        let config = manager.get();
        assert_eq!(config.version, 1);
        assert_eq!(config.encryption, EncryptionKind::AesGcm);
        assert_eq!(config.hash, HashKind::Sha512);
        assert_eq!(config.key, KeyKind::Pbkdf2 { iterations: 1000 });
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_config_persistence() {
        let temp_dir = TempDir::new().unwrap();

        {
            let mut manager = ConfigManager::new(temp_dir.path());
            manager.get_mut().encryption = EncryptionKind::AesCbc;
            manager.get_mut().hash = HashKind::Md5;
            manager.get_mut().key = KeyKind::Argon2(KeyDerivationParams {
                memory_cost: 1024,
                time_cost: 1,
                parallelism: 1,
            });
            manager.save().await.unwrap();
        }

        {
            let manager = ConfigManager::new(temp_dir.path());
            assert_eq!(manager.get().encryption, EncryptionKind::AesCbc);
            assert_eq!(manager.get().hash, HashKind::Md5);
            assert!(matches!(
                manager.get().key,
                KeyKind::Argon2(KeyDerivationParams { memory_cost: 1024, .. })
            ));
        }
    }

    #[test]
    fn test_json_shape() {
        let config = PrefsConfig {
            key: KeyKind::Argon2(KeyDerivationParams::default()),
            ..PrefsConfig::default()
        };
        let json = serde_json::to_value(&config).unwrap();

        assert_eq!(json["encryption"], "aesGcm");
        assert_eq!(json["hash"], "sha512");
        assert_eq!(json["key"]["type"], "argon2");
        assert_eq!(json["key"]["memoryCost"], 65536);
        assert!(json["storageDir"].is_null());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: PrefsConfig =
            serde_json::from_str(r#"{"key":{"type":"keychain"}}"#).unwrap();
        assert_eq!(config.key, KeyKind::Keychain);
        assert_eq!(config.encryption, EncryptionKind::AesGcm);
        assert_eq!(config.version, 1);
    }

    #[tokio::test]
    async fn test_corrupt_file_falls_back() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(CONFIG_FILE_NAME), "not json").unwrap();

        let manager = ConfigManager::new(temp_dir.path());
        assert_eq!(*manager.get(), PrefsConfig::default());
    }

    #[tokio::test]
    async fn test_update_validates() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = ConfigManager::new(temp_dir.path());

        let bad = PrefsConfig {
            key: KeyKind::None,
            ..PrefsConfig::default()
        };
        assert!(matches!(
            manager.update(bad).await,
            Err(PrefsError::ConfigError(_))
        ));
        assert!(!manager.path().exists());

        let plain = PrefsConfig {
            encryption: EncryptionKind::None,
            key: KeyKind::None,
            ..PrefsConfig::default()
        };
        manager.update(plain.clone()).await.unwrap();
        assert_eq!(*ConfigManager::new(temp_dir.path()).get(), plain);
    }

    #[tokio::test]
    async fn test_reset() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = ConfigManager::new(temp_dir.path());
        manager.get_mut().hash = HashKind::Sha256;
        manager.save().await.unwrap();
        assert!(manager.path().exists());

        manager.reset().await.unwrap();
        assert!(!manager.path().exists());
        assert_eq!(manager.get().hash, HashKind::Sha512);
    }

    #[test]
    fn test_validate_rejects_zero_iterations() {
        let config = PrefsConfig {
            key: KeyKind::Pbkdf2 { iterations: 0 },
            ..PrefsConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_storage_dir_override() {
        let base = Path::new("/base");
        let mut config = PrefsConfig::default();
        assert_eq!(config.storage_dir_or(base), base);

        config.storage_dir = Some(PathBuf::from("/elsewhere"));
        assert_eq!(config.storage_dir_or(base), Path::new("/elsewhere"));
    }
}
