//! Encrypted accessor layer over a [`PreferenceStore`]
//!
//! Every key is hashed and every value encrypted before it reaches the
//! store. A tag entry records which encryption, hash and key source wrote
//! the file so a store cannot silently be read with the wrong setup.

use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::crypto::{Encryption, KeyHash, KeySource, Md5Hash, Sha256Hash, Sha512Hash};
use crate::error::{PrefsError, Result};
use crate::store::PreferenceStore;

/// Key of the entry holding the encryption tag
pub const KEY_ENCRYPTION_TAG: &str = "KEY_ENCRYPTION_TAG";

/// Typed, encrypted view of one preference file
#[derive(Clone)]
pub struct KryptoPrefs {
    store: Arc<dyn PreferenceStore>,
    encryption: Arc<dyn Encryption>,
    hash: Arc<dyn KeyHash>,
    key: Arc<dyn KeySource>,
}

impl std::fmt::Debug for KryptoPrefs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KryptoPrefs")
            .field("name", &self.store.name())
            .field("backend", &self.store.backend_name())
            .field("tag", &self.encryption_tag())
            .finish()
    }
}

impl KryptoPrefs {
    /// Bind a store to an encryption setup
    ///
    /// An empty store is tagged with this setup. A non-empty store must
    /// carry a matching tag, otherwise [`PrefsError::KeyMismatch`] is returned.
    /// A store whose tag was removed behind our back is re-tagged when every
    /// entry still decrypts with this setup.
    pub async fn open(
        store: Arc<dyn PreferenceStore>,
        encryption: Arc<dyn Encryption>,
        hash: Arc<dyn KeyHash>,
        key: Arc<dyn KeySource>,
    ) -> Result<Self> {
        let prefs = Self {
            store,
            encryption,
            hash,
            key,
        };
        prefs.tag().await?;
        Ok(prefs)
    }

    /// `"{encryption}:{hash}:{key}"` identifier of this setup
    pub fn encryption_tag(&self) -> String {
        format!(
            "{}:{}:{}",
            self.encryption.tag(),
            self.hash.tag(),
            self.key.tag()
        )
    }

    async fn tag(&self) -> Result<()> {
        let tag = self.encryption_tag();

        if self.store.is_empty().await? {
            self.put_string(KEY_ENCRYPTION_TAG, Some(&tag)).await?;
            debug!("Tagged '{}' with {}", self.name(), tag);
            return Ok(());
        }

        match self.get_string(KEY_ENCRYPTION_TAG, None).await {
            Ok(Some(stored)) if stored == tag => Ok(()),
            Ok(None) => self.adopt_untagged(&tag).await,
            Ok(stored) => {
                warn!(
                    "Preference file '{}' tag mismatch: expected {}, found {:?}",
                    self.name(),
                    tag,
                    stored
                );
                Err(PrefsError::KeyMismatch(self.name().to_string()))
            }
            Err(PrefsError::DecryptionError(e)) => {
                warn!("Cannot decrypt tag of '{}': {}", self.name(), e);
                Err(PrefsError::KeyMismatch(self.name().to_string()))
            }
            Err(e) => Err(e),
        }
    }

    async fn adopt_untagged(&self, tag: &str) -> Result<()> {
        let mismatch = || PrefsError::KeyMismatch(self.name().to_string());

        // Tagged under another key hash
        let hashes: [&dyn KeyHash; 3] = [&Sha512Hash, &Sha256Hash, &Md5Hash];
        for hash in hashes {
            if self.store.contains(&hash.hash(KEY_ENCRYPTION_TAG)).await? {
                warn!(
                    "Preference file '{}' is tagged with a {} key hash",
                    self.name(),
                    hash.tag()
                );
                return Err(mismatch());
            }
        }

        let secret = self.key.key().await?;
        for key in self.store.keys().await? {
            let Some(encrypted) = self.store.get(&key).await? else {
                continue;
            };
            match self.encryption.decrypt(&secret, &encrypted) {
                Ok(_) => {}
                Err(PrefsError::DecryptionError(e)) => {
                    warn!("Untagged preference file '{}' does not decrypt: {}", self.name(), e);
                    return Err(mismatch());
                }
                Err(e) => return Err(e),
            }
        }

        self.put_string(KEY_ENCRYPTION_TAG, Some(tag)).await?;
        warn!("Preference file '{}' had no tag; re-tagged with {}", self.name(), tag);
        Ok(())
    }

    /// Store a string; `None` removes the entry
    pub async fn put_string(&self, key: &str, value: Option<&str>) -> Result<()> {
        match value {
            Some(value) => {
                let secret = self.key.key().await?;
                let encrypted = self.encryption.encrypt(&secret, value)?;
                self.store.put(&self.hash.hash(key), &encrypted).await
            }
            None => self.remove(key).await,
        }
    }

    pub async fn put_bool(&self, key: &str, value: Option<bool>) -> Result<()> {
        self.put_parsed(key, value).await
    }

    pub async fn put_int(&self, key: &str, value: Option<i32>) -> Result<()> {
        self.put_parsed(key, value).await
    }

    pub async fn put_long(&self, key: &str, value: Option<i64>) -> Result<()> {
        self.put_parsed(key, value).await
    }

    async fn put_parsed<T: ToString>(&self, key: &str, value: Option<T>) -> Result<()> {
        let text = value.map(|v| v.to_string());
        self.put_string(key, text.as_deref()).await
    }

    /// Read a string, or `default` when the key is absent
    pub async fn get_string(&self, key: &str, default: Option<&str>) -> Result<Option<String>> {
        match self.store.get(&self.hash.hash(key)).await? {
            Some(encrypted) => {
                let secret = self.key.key().await?;
                self.encryption.decrypt(&secret, &encrypted).map(Some)
            }
            None => Ok(default.map(str::to_string)),
        }
    }

    pub async fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        self.get_parsed(key, default).await
    }

    pub async fn get_int(&self, key: &str, default: i32) -> Result<i32> {
        self.get_parsed(key, default).await
    }

    pub async fn get_long(&self, key: &str, default: i64) -> Result<i64> {
        self.get_parsed(key, default).await
    }

    async fn get_parsed<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_string(key, None).await? {
            Some(text) => text.parse().map_err(|e| PrefsError::transform(key, e)),
            None => Ok(default),
        }
    }

    pub async fn remove(&self, key: &str) -> Result<()> {
        self.store.remove(&self.hash.hash(key)).await
    }

    pub async fn contains(&self, key: &str) -> Result<bool> {
        self.store.contains(&self.hash.hash(key)).await
    }

    /// Remove every entry; the store is re-tagged and stays usable
    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await?;
        info!("Cleared preferences '{}'", self.name());
        self.tag().await
    }

    /// Name of the underlying preference file
    pub fn name(&self) -> &str {
        self.store.name()
    }

    /// The raw store, for direct access to stored (hashed, encrypted) entries
    pub fn store(&self) -> &Arc<dyn PreferenceStore> {
        &self.store
    }
}
