//! Ready-made preference setups

use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::config::{KeyKind, PrefsConfig};
use crate::crypto::{
    AesGcmEncryption, Argon2Key, HybridKey, KeySource, KeychainKey, NoKey, Pbkdf2Key, Sha512Hash,
};
use crate::error::{PrefsError, Result};
use crate::prefs::KryptoPrefs;
use crate::store::{FilePreferenceStore, PreferenceStore};

/// Constructors for the common AES-GCM / SHA-512 setups
pub struct KryptoBuilder;

impl KryptoBuilder {
    /// Passphrase-protected file `<dir>/<name>.json`
    pub async fn pref(
        dir: impl AsRef<Path>,
        name: &str,
        pass: &str,
        salt: &str,
        iterations: u32,
    ) -> Result<KryptoPrefs> {
        let store = FilePreferenceStore::open(dir, name).await?;
        Self::pref_with(Arc::new(store), pass, salt, iterations).await
    }

    /// Passphrase-protected preferences over any store
    pub async fn pref_with(
        store: Arc<dyn PreferenceStore>,
        pass: &str,
        salt: &str,
        iterations: u32,
    ) -> Result<KryptoPrefs> {
        let key = Pbkdf2Key::new(pass, salt, iterations)?;
        KryptoPrefs::open(
            store,
            Arc::new(AesGcmEncryption),
            Arc::new(Sha512Hash),
            Arc::new(key),
        )
        .await
    }

    /// Preferences keyed by a random key kept in the OS keychain under `name`
    pub async fn keystore(dir: impl AsRef<Path>, name: &str) -> Result<KryptoPrefs> {
        let store = FilePreferenceStore::open(dir, name).await?;
        KryptoPrefs::open(
            Arc::new(store),
            Arc::new(AesGcmEncryption),
            Arc::new(Sha512Hash),
            Arc::new(KeychainKey::new(name)),
        )
        .await
    }

    /// PBKDF2-keyed preferences whose random passphrase lives in the
    /// keychain-protected file `<name>-hybrid`
    pub async fn hybrid(dir: impl AsRef<Path>, name: &str) -> Result<KryptoPrefs> {
        let dir = dir.as_ref();
        let secrets = Self::keystore(dir, &format!("{}-hybrid", name)).await?;
        let store = FilePreferenceStore::open(dir, name).await?;
        KryptoPrefs::open(
            Arc::new(store),
            Arc::new(AesGcmEncryption),
            Arc::new(Sha512Hash),
            Arc::new(HybridKey::new(secrets, name)),
        )
        .await
    }

    /// Preferences set up as described by `config`
    ///
    /// `pass` and `salt` are required by the passphrase-based key kinds and
    /// ignored otherwise. Files go to `config.storage_dir` when set.
    pub async fn from_config(
        dir: impl AsRef<Path>,
        name: &str,
        config: &PrefsConfig,
        pass: Option<&str>,
        salt: Option<&str>,
    ) -> Result<KryptoPrefs> {
        config.validate()?;
        let dir = config.storage_dir_or(dir.as_ref());

        let key: Arc<dyn KeySource> = match &config.key {
            KeyKind::Pbkdf2 { iterations } => {
                let (pass, salt) = passphrase(pass, salt)?;
                Arc::new(Pbkdf2Key::new(pass, salt, *iterations)?)
            }
            KeyKind::Argon2(params) => {
                let (pass, salt) = passphrase(pass, salt)?;
                Arc::new(Argon2Key::new(pass, salt, Some(params.clone()))?)
            }
            KeyKind::Keychain => Arc::new(KeychainKey::new(name)),
            KeyKind::Hybrid => {
                let secrets = Self::keystore(dir, &format!("{}-hybrid", name)).await?;
                Arc::new(HybridKey::new(secrets, name))
            }
            KeyKind::None => Arc::new(NoKey),
        };
        debug!("Opening '{}' from config in {:?}", name, dir);

        let store = FilePreferenceStore::open(dir, name).await?;
        KryptoPrefs::open(
            Arc::new(store),
            config.encryption.build(),
            config.hash.build(),
            key,
        )
        .await
    }
}

fn passphrase<'a>(pass: Option<&'a str>, salt: Option<&'a str>) -> Result<(&'a str, &'a str)> {
    match (pass, salt) {
        (Some(pass), Some(salt)) => Ok((pass, salt)),
        (None, _) => Err(PrefsError::InvalidKeyMaterial(
            "a passphrase is required".to_string(),
        )),
        (_, None) => Err(PrefsError::InvalidKeyMaterial("a salt is required".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EncryptionKind, HashKind};
    use crate::crypto::KeyDerivationParams;
    use crate::store::MemoryPreferenceStore;
    use tempfile::TempDir;

    const PASS: &str = "correct horse battery staple";
    const SALT: &str = "9774d56d682e549c";
    const ITERATIONS: u32 = 10;

    #[tokio::test]
    async fn test_pref_round_trip() {
        let temp_dir = TempDir::new().unwrap();

        {
            let prefs = KryptoBuilder::pref(temp_dir.path(), "user", PASS, SALT, ITERATIONS)
                .await
                .unwrap();
            assert_eq!(
                prefs.encryption_tag(),
                "AES/GCM/NoPadding:SHA-512:PBKDF2WithHmacSHA1"
            );
            prefs.put_int("launches", Some(3)).await.unwrap();
        }

        let prefs = KryptoBuilder::pref(temp_dir.path(), "user", PASS, SALT, ITERATIONS)
            .await
            .unwrap();
        assert_eq!(prefs.get_int("launches", 0).await.unwrap(), 3);
        assert!(temp_dir.path().join("user.json").exists());
    }

    #[tokio::test]
    async fn test_pref_wrong_pass() {
        let temp_dir = TempDir::new().unwrap();
        KryptoBuilder::pref(temp_dir.path(), "user", PASS, SALT, ITERATIONS)
            .await
            .unwrap();

        let result = KryptoBuilder::pref(temp_dir.path(), "user", "wrong", SALT, ITERATIONS).await;
        assert!(matches!(result, Err(PrefsError::KeyMismatch(_))));
    }

    #[tokio::test]
    async fn test_pref_with_store() {
        let store = Arc::new(MemoryPreferenceStore::new("mem"));
        let prefs = KryptoBuilder::pref_with(store.clone(), PASS, SALT, ITERATIONS)
            .await
            .unwrap();
        prefs.put_string("k", Some("v")).await.unwrap();

        // The store only sees the tag and one hashed, encrypted entry
        assert_eq!(store.len().await.unwrap(), 2);
        assert!(!store.contains("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_from_config_pbkdf2() {
        let temp_dir = TempDir::new().unwrap();
        let config = PrefsConfig {
            hash: HashKind::Sha256,
            key: KeyKind::Pbkdf2 { iterations: ITERATIONS },
            ..PrefsConfig::default()
        };

        let prefs = KryptoBuilder::from_config(temp_dir.path(), "cfg", &config, Some(PASS), Some(SALT))
            .await
            .unwrap();
        assert_eq!(
            prefs.encryption_tag(),
            "AES/GCM/NoPadding:SHA-256:PBKDF2WithHmacSHA1"
        );
    }

    #[tokio::test]
    async fn test_from_config_argon2_cbc() {
        let temp_dir = TempDir::new().unwrap();
        let config = PrefsConfig {
            encryption: EncryptionKind::AesCbc,
            key: KeyKind::Argon2(KeyDerivationParams {
                memory_cost: 1024,
                time_cost: 1,
                parallelism: 1,
            }),
            ..PrefsConfig::default()
        };

        let prefs = KryptoBuilder::from_config(temp_dir.path(), "cfg", &config, Some(PASS), Some(SALT))
            .await
            .unwrap();
        prefs.put_bool("flag", Some(true)).await.unwrap();
        assert!(prefs.get_bool("flag", false).await.unwrap());
        assert_eq!(
            prefs.encryption_tag(),
            "AES/CBC/PKCS7Padding:SHA-512:Argon2id"
        );
    }

    #[tokio::test]
    async fn test_from_config_plain() {
        let temp_dir = TempDir::new().unwrap();
        let config = PrefsConfig {
            encryption: EncryptionKind::None,
            key: KeyKind::None,
            ..PrefsConfig::default()
        };

        let prefs = KryptoBuilder::from_config(temp_dir.path(), "plain", &config, None, None)
            .await
            .unwrap();
        prefs.put_long("n", Some(42)).await.unwrap();
        assert_eq!(prefs.get_long("n", 0).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_from_config_storage_dir() {
        let config_dir = TempDir::new().unwrap();
        let data_dir = TempDir::new().unwrap();
        let config = PrefsConfig {
            key: KeyKind::Pbkdf2 { iterations: ITERATIONS },
            storage_dir: Some(data_dir.path().to_path_buf()),
            ..PrefsConfig::default()
        };

        KryptoBuilder::from_config(config_dir.path(), "moved", &config, Some(PASS), Some(SALT))
            .await
            .unwrap();
        assert!(data_dir.path().join("moved.json").exists());
        assert!(!config_dir.path().join("moved.json").exists());
    }

    #[tokio::test]
    async fn test_from_config_missing_passphrase() {
        let temp_dir = TempDir::new().unwrap();
        let config = PrefsConfig::default();

        let result = KryptoBuilder::from_config(temp_dir.path(), "cfg", &config, None, Some(SALT)).await;
        assert!(matches!(result, Err(PrefsError::InvalidKeyMaterial(_))));

        let result = KryptoBuilder::from_config(temp_dir.path(), "cfg", &config, Some(PASS), None).await;
        assert!(matches!(result, Err(PrefsError::InvalidKeyMaterial(_))));
    }
}
