//! Typed preferences bound to one encrypted preference file
//!
//! A [`KryptoContext`] hands out [`Preference`] and [`NullablePreference`]
//! handles. Applications usually wrap it in their own struct holding one
//! field per preference:
//!
//! ```no_run
//! # async fn demo(prefs: kryptoprefs::KryptoPrefs) -> kryptoprefs::Result<()> {
//! use kryptoprefs::KryptoContext;
//!
//! let context = KryptoContext::new(prefs);
//! let launches = context.int("launches", 0, false);
//! let token = context.nullable_string("token", None, true);
//!
//! launches.put(launches.get().await? + 1).await?;
//! token.put(Some("abc".to_string())).await?;
//! # Ok(())
//! # }
//! ```

mod observable;
mod pending;
mod preference;
mod transform;

pub use observable::{Observer, ObserverId, PreferenceObservable};
pub use preference::{NullablePreference, Preference};
pub use transform::{
    FnTransform, ParseTransform, PrefValue, Transform, TransformError, TransformResult,
    ValueTransform,
};

use chrono::{DateTime, Utc};
use std::fmt::Display;
use std::str::FromStr;
use std::sync::{Arc, Mutex, Weak};
use tracing::debug;

use crate::error::Result;
use crate::prefs::KryptoPrefs;
use preference::Invalidate;

/// Factory for the preferences of one [`KryptoPrefs`] file
pub struct KryptoContext {
    prefs: KryptoPrefs,
    /// Memory-backed preferences, invalidated on [`KryptoContext::clear`].
    /// Dropped handles are pruned on the next registration or clear.
    backed: Mutex<Vec<Weak<dyn Invalidate>>>,
}

impl KryptoContext {
    pub fn new(prefs: KryptoPrefs) -> Self {
        Self {
            prefs,
            backed: Mutex::new(Vec::new()),
        }
    }

    pub fn prefs(&self) -> &KryptoPrefs {
        &self.prefs
    }

    fn register(&self, invalidator: Arc<dyn Invalidate>) {
        let mut backed = self.backed.lock().unwrap_or_else(|e| e.into_inner());
        backed.retain(|pref| pref.strong_count() > 0);
        backed.push(Arc::downgrade(&invalidator));
    }

    /// Preference with a caller-supplied [`Transform`]
    pub fn custom<T, X>(&self, key: &str, default: T, transform: X, backed: bool) -> Preference<T>
    where
        T: Clone + Send + Sync + 'static,
        X: Transform<T> + 'static,
    {
        let pref = Preference::new(self.prefs.clone(), key, default, Arc::new(transform), backed);
        if backed {
            self.register(pref.invalidator());
        }
        pref
    }

    /// Nullable preference with a caller-supplied [`Transform`]
    pub fn nullable_custom<T, X>(
        &self,
        key: &str,
        default: Option<T>,
        transform: X,
        backed: bool,
    ) -> NullablePreference<T>
    where
        T: Clone + Send + Sync + 'static,
        X: Transform<T> + 'static,
    {
        let pref =
            NullablePreference::new(self.prefs.clone(), key, default, Arc::new(transform), backed);
        if backed {
            self.register(pref.invalidator());
        }
        pref
    }

    pub fn value<T: PrefValue>(&self, key: &str, default: T, backed: bool) -> Preference<T> {
        self.custom(key, default, ValueTransform::new(), backed)
    }

    pub fn nullable_value<T: PrefValue>(
        &self,
        key: &str,
        default: Option<T>,
        backed: bool,
    ) -> NullablePreference<T> {
        self.nullable_custom(key, default, ValueTransform::new(), backed)
    }

    /// Preference stored through `Display`/`FromStr`, e.g. a fieldless enum
    pub fn parsed<T>(&self, key: &str, default: T, backed: bool) -> Preference<T>
    where
        T: Display + FromStr + Clone + Send + Sync + 'static,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        self.custom(key, default, ParseTransform::new(), backed)
    }

    pub fn nullable_parsed<T>(
        &self,
        key: &str,
        default: Option<T>,
        backed: bool,
    ) -> NullablePreference<T>
    where
        T: Display + FromStr + Clone + Send + Sync + 'static,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        self.nullable_custom(key, default, ParseTransform::new(), backed)
    }

    pub fn int(&self, key: &str, default: i32, backed: bool) -> Preference<i32> {
        self.value(key, default, backed)
    }

    pub fn long(&self, key: &str, default: i64, backed: bool) -> Preference<i64> {
        self.value(key, default, backed)
    }

    pub fn short(&self, key: &str, default: i16, backed: bool) -> Preference<i16> {
        self.value(key, default, backed)
    }

    pub fn byte(&self, key: &str, default: i8, backed: bool) -> Preference<i8> {
        self.value(key, default, backed)
    }

    pub fn char(&self, key: &str, default: char, backed: bool) -> Preference<char> {
        self.value(key, default, backed)
    }

    pub fn float(&self, key: &str, default: f32, backed: bool) -> Preference<f32> {
        self.value(key, default, backed)
    }

    pub fn double(&self, key: &str, default: f64, backed: bool) -> Preference<f64> {
        self.value(key, default, backed)
    }

    pub fn boolean(&self, key: &str, default: bool, backed: bool) -> Preference<bool> {
        self.value(key, default, backed)
    }

    pub fn string(&self, key: &str, default: &str, backed: bool) -> Preference<String> {
        self.value(key, default.to_string(), backed)
    }

    pub fn nullable_string(
        &self,
        key: &str,
        default: Option<&str>,
        backed: bool,
    ) -> NullablePreference<String> {
        self.nullable_value(key, default.map(str::to_string), backed)
    }

    pub fn date(&self, key: &str, default: DateTime<Utc>, backed: bool) -> Preference<DateTime<Utc>> {
        self.value(key, default, backed)
    }

    pub fn nullable_date(
        &self,
        key: &str,
        default: Option<DateTime<Utc>>,
        backed: bool,
    ) -> NullablePreference<DateTime<Utc>> {
        self.nullable_value(key, default, backed)
    }

    /// Drop every memory-backed value, then clear the preference file
    pub async fn clear(&self) -> Result<()> {
        let backed: Vec<Arc<dyn Invalidate>> = {
            let mut registered = self.backed.lock().unwrap_or_else(|e| e.into_inner());
            registered.retain(|pref| pref.strong_count() > 0);
            registered.iter().filter_map(Weak::upgrade).collect()
        };

        for pref in &backed {
            pref.invalidate();
        }
        debug!("Invalidated {} memory-backed preferences", backed.len());

        self.prefs.clear().await
    }
}
