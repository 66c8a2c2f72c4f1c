//! Typed preference handles
//!
//! [`Preference`] always yields a value (its default when nothing is stored);
//! [`NullablePreference`] yields `None` unless a value or a non-null default
//! exists. Both come in two flavours chosen at creation time:
//! - plain: every `get` reads and decrypts from the store
//! - memory-backed: the value is kept after the first read or any write,
//!   until [`Preference::invalidate`] or `KryptoContext::clear`

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;

use super::observable::{ObserverId, PreferenceObservable};
use super::pending::PendingWrites;
use super::transform::Transform;
use crate::error::{PrefsError, Result};
use crate::prefs::KryptoPrefs;

/// Something holding a cached value that can be dropped
pub(crate) trait Invalidate: Send + Sync {
    fn invalidate(&self);
}

/// State shared by every clone of a preference handle
struct PreferenceCell<T> {
    prefs: KryptoPrefs,
    key: String,
    transform: Arc<dyn Transform<T>>,
    backed: bool,
    cache: Mutex<Option<T>>,
    pending: PendingWrites,
    observable: PreferenceObservable<T>,
}

impl<T: Clone + Send + Sync + 'static> PreferenceCell<T> {
    fn new(prefs: KryptoPrefs, key: &str, transform: Arc<dyn Transform<T>>, backed: bool) -> Self {
        Self {
            prefs,
            key: key.to_string(),
            transform,
            backed,
            cache: Mutex::new(None),
            pending: PendingWrites::default(),
            observable: PreferenceObservable::new(),
        }
    }

    fn cache(&self) -> MutexGuard<'_, Option<T>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Stored value, if any; memory-backed cells cache non-null reads
    async fn load(&self) -> Result<Option<T>> {
        if self.backed {
            let cached = self.cache().clone();
            if cached.is_some() {
                return Ok(cached);
            }
        }

        let value = match self.prefs.get_string(&self.key, None).await? {
            Some(text) => Some(
                self.transform
                    .deserialize(&text)
                    .map_err(|e| PrefsError::transform(&self.key, e))?,
            ),
            None => None,
        };

        if self.backed {
            if let Some(value) = &value {
                *self.cache() = Some(value.clone());
            }
        }

        Ok(value)
    }

    /// Write (or remove, for `None`) and notify observers
    async fn store(&self, value: Option<&T>) -> Result<()> {
        let text = match value {
            Some(value) => Some(
                self.transform
                    .serialize(value)
                    .map_err(|e| PrefsError::transform(&self.key, e))?,
            ),
            None => None,
        };

        self.prefs.put_string(&self.key, text.as_deref()).await?;

        if self.backed {
            *self.cache() = value.cloned();
        }

        self.observable.notify_observers(value);
        Ok(())
    }
}

impl<T: Send + Sync> Invalidate for PreferenceCell<T> {
    fn invalidate(&self) {
        *self.cache.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

/// A non-null preference with a default value
pub struct Preference<T> {
    cell: Arc<PreferenceCell<T>>,
    default: T,
}

impl<T: Clone> Clone for Preference<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            default: self.default.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Preference<T> {
    pub(crate) fn new(
        prefs: KryptoPrefs,
        key: &str,
        default: T,
        transform: Arc<dyn Transform<T>>,
        backed: bool,
    ) -> Self {
        Self {
            cell: Arc::new(PreferenceCell::new(prefs, key, transform, backed)),
            default,
        }
    }

    pub(crate) fn invalidator(&self) -> Arc<dyn Invalidate> {
        self.cell.clone()
    }

    pub fn key(&self) -> &str {
        &self.cell.key
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    pub fn is_backed(&self) -> bool {
        self.cell.backed
    }

    /// Current value, or the default when nothing is stored
    ///
    /// Waits for writes queued with [`Preference::put_async`] first.
    pub async fn get(&self) -> Result<T> {
        self.cell.pending.sync().await?;
        Ok(self
            .cell
            .load()
            .await?
            .unwrap_or_else(|| self.default.clone()))
    }

    pub async fn put(&self, value: T) -> Result<()> {
        self.cell.pending.sync().await?;
        self.cell.store(Some(&value)).await
    }

    /// Delete the stored value; later reads return the default
    pub async fn remove(&self) -> Result<()> {
        self.cell.pending.sync().await?;
        self.cell.store(None).await
    }

    /// Queue a write on the tokio runtime and return immediately
    ///
    /// Queued writes land in call order. Fails with
    /// [`PrefsError::TaskError`] outside a runtime; a failed write is
    /// reported by the next `get`, `put` or `remove` on this preference.
    pub fn put_async(&self, value: T) -> Result<()> {
        let cell = self.cell.clone();
        self.cell
            .pending
            .push(async move { cell.store(Some(&value)).await })
    }

    /// Read on a spawned task and hand the result to `callback`
    pub fn get_async<F>(&self, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<T>) + Send + 'static,
    {
        let this = self.clone();
        tokio::spawn(async move { callback(this.get().await) })
    }

    /// Drop the memory-backed copy so the next `get` reads the store
    pub fn invalidate(&self) {
        self.cell.invalidate();
    }

    pub fn add_observer<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(Option<&T>) + Send + Sync + 'static,
    {
        self.cell.observable.add_observer(observer)
    }

    pub fn delete_observer(&self, id: ObserverId) -> bool {
        self.cell.observable.delete_observer(id)
    }

    pub fn delete_observers(&self) {
        self.cell.observable.delete_observers()
    }

    pub fn observable(&self) -> &PreferenceObservable<T> {
        &self.cell.observable
    }
}

/// A preference that may hold no value
pub struct NullablePreference<T> {
    cell: Arc<PreferenceCell<T>>,
    default: Option<T>,
}

impl<T: Clone> Clone for NullablePreference<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            default: self.default.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> NullablePreference<T> {
    pub(crate) fn new(
        prefs: KryptoPrefs,
        key: &str,
        default: Option<T>,
        transform: Arc<dyn Transform<T>>,
        backed: bool,
    ) -> Self {
        Self {
            cell: Arc::new(PreferenceCell::new(prefs, key, transform, backed)),
            default,
        }
    }

    pub(crate) fn invalidator(&self) -> Arc<dyn Invalidate> {
        self.cell.clone()
    }

    pub fn key(&self) -> &str {
        &self.cell.key
    }

    pub fn default_value(&self) -> Option<&T> {
        self.default.as_ref()
    }

    pub fn is_backed(&self) -> bool {
        self.cell.backed
    }

    /// Current value, the default when nothing is stored
    pub async fn get(&self) -> Result<Option<T>> {
        self.cell.pending.sync().await?;
        Ok(self.cell.load().await?.or_else(|| self.default.clone()))
    }

    /// Store a value; `None` deletes the stored entry
    pub async fn put(&self, value: Option<T>) -> Result<()> {
        self.cell.pending.sync().await?;
        self.cell.store(value.as_ref()).await
    }

    /// Queue a write on the tokio runtime and return immediately
    pub fn put_async(&self, value: Option<T>) -> Result<()> {
        let cell = self.cell.clone();
        self.cell
            .pending
            .push(async move { cell.store(value.as_ref()).await })
    }

    pub fn get_async<F>(&self, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<Option<T>>) + Send + 'static,
    {
        let this = self.clone();
        tokio::spawn(async move { callback(this.get().await) })
    }

    pub fn invalidate(&self) {
        self.cell.invalidate();
    }

    pub fn add_observer<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(Option<&T>) + Send + Sync + 'static,
    {
        self.cell.observable.add_observer(observer)
    }

    pub fn delete_observer(&self, id: ObserverId) -> bool {
        self.cell.observable.delete_observer(id)
    }

    pub fn delete_observers(&self) {
        self.cell.observable.delete_observers()
    }

    pub fn observable(&self) -> &PreferenceObservable<T> {
        &self.cell.observable
    }
}
