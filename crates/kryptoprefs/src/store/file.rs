//! JSON file store backend
//!
//! Each preference name maps to `<dir>/<name>.json`. The whole file is kept
//! in memory and rewritten atomically after every mutation.

use async_trait::async_trait;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::PreferenceStore;
use crate::error::{PrefsError, Result};

const FILE_VERSION: u32 = 1;

/// Per-user data directory used when no directory is given
pub fn default_prefs_dir() -> Result<PathBuf> {
    ProjectDirs::from("com", "kryptoprefs", "kryptoprefs")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| PrefsError::StorageError("Could not determine data directory".to_string()))
}

/// File format for persistent storage
#[derive(Debug, Default, Deserialize)]
struct PrefsFile {
    version: u32,
    entries: BTreeMap<String, String>,
}

/// Borrowed view of [`PrefsFile`] for writing
#[derive(Serialize)]
struct PrefsFileRef<'a> {
    version: u32,
    entries: &'a BTreeMap<String, String>,
}

/// JSON file store backend
///
/// Mutations are staged on a copy and only become visible once the file has
/// been written, so a failed save leaves memory and disk in agreement.
pub struct FilePreferenceStore {
    name: String,
    path: PathBuf,
    /// In-memory copy of the file
    entries: Arc<RwLock<BTreeMap<String, String>>>,
}

impl FilePreferenceStore {
    /// Open (or create) the preference file `name` inside `dir`
    pub async fn open(dir: impl AsRef<Path>, name: &str) -> Result<Self> {
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(PrefsError::StorageError(format!(
                "Invalid preference file name: {:?}",
                name
            )));
        }

        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;

        let path = dir.join(format!("{}.json", name));
        let entries = Self::load(&path).await?;

        info!("Opened preference file {:?} ({} entries)", path, entries.len());

        Ok(Self {
            name: name.to_string(),
            path,
            entries: Arc::new(RwLock::new(entries)),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(path: &Path) -> Result<BTreeMap<String, String>> {
        if !tokio::fs::try_exists(path).await? {
            debug!("No existing preference file at {:?}", path);
            return Ok(BTreeMap::new());
        }

        let contents = tokio::fs::read_to_string(path).await?;
        let file: PrefsFile = serde_json::from_str(&contents)?;

        if file.version > FILE_VERSION {
            return Err(PrefsError::StorageError(format!(
                "Unsupported preference file version {} in {:?}",
                file.version, path
            )));
        }

        Ok(file.entries)
    }

    /// Re-read the file, discarding the in-memory copy
    pub async fn reload(&self) -> Result<()> {
        let loaded = Self::load(&self.path).await?;
        let mut entries = self.entries.write().await;
        *entries = loaded;
        debug!("Reloaded {} entries from {:?}", entries.len(), self.path);
        Ok(())
    }

    async fn save(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let file = PrefsFileRef {
            version: FILE_VERSION,
            entries,
        };

        let contents = serde_json::to_string_pretty(&file)?;

        // Write atomically using a temp file
        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, &contents).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;

        debug!("Saved {} entries to {:?}", entries.len(), self.path);
        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for FilePreferenceStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        // Write lock is held through the save so file order matches memory order
        let mut entries = self.entries.write().await;
        let mut staged = entries.clone();
        staged.insert(key.to_string(), value.to_string());
        self.save(&staged).await?;
        *entries = staged;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        if !entries.contains_key(key) {
            return Ok(());
        }

        let mut staged = entries.clone();
        staged.remove(key);
        self.save(&staged).await?;
        *entries = staged;
        Ok(())
    }

    async fn contains(&self, key: &str) -> Result<bool> {
        let entries = self.entries.read().await;
        Ok(entries.contains_key(key))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.read().await.len())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let entries = self.entries.read().await;
        Ok(entries.keys().cloned().collect())
    }

    async fn clear(&self) -> Result<()> {
        let mut entries = self.entries.write().await;
        self.save(&BTreeMap::new()).await?;
        entries.clear();
        info!("Cleared preference file {:?}", self.path);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn backend_name(&self) -> &'static str {
        "JSON File"
    }
}
