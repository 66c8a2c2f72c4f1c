//! # kryptoprefs-json
//!
//! Stores any serde type as an encrypted JSON preference:
//!
//! ```no_run
//! # async fn demo(context: kryptoprefs::KryptoContext) -> kryptoprefs::Result<()> {
//! use kryptoprefs_json::KryptoContextJsonExt;
//!
//! let recent = context.json("recent", Vec::<String>::new(), true);
//! recent.put(vec!["a.txt".to_string()]).await?;
//! # Ok(())
//! # }
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

use kryptoprefs::context::{Transform, TransformResult};
use kryptoprefs::{KryptoContext, NullablePreference, Preference};

/// [`Transform`] storing values as compact JSON
pub struct JsonTransform<T>(PhantomData<fn() -> T>);

impl<T> JsonTransform<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for JsonTransform<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize + DeserializeOwned> Transform<T> for JsonTransform<T> {
    fn serialize(&self, value: &T) -> TransformResult<String> {
        Ok(serde_json::to_string(value)?)
    }

    fn deserialize(&self, text: &str) -> TransformResult<T> {
        Ok(serde_json::from_str(text)?)
    }
}

/// JSON preference factories for [`KryptoContext`]
pub trait KryptoContextJsonExt {
    fn json<T>(&self, key: &str, default: T, backed: bool) -> Preference<T>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    fn nullable_json<T>(
        &self,
        key: &str,
        default: Option<T>,
        backed: bool,
    ) -> NullablePreference<T>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;
}

impl KryptoContextJsonExt for KryptoContext {
    fn json<T>(&self, key: &str, default: T, backed: bool) -> Preference<T>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        self.custom(key, default, JsonTransform::new(), backed)
    }

    fn nullable_json<T>(
        &self,
        key: &str,
        default: Option<T>,
        backed: bool,
    ) -> NullablePreference<T>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        self.nullable_custom(key, default, JsonTransform::new(), backed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kryptoprefs::{KryptoBuilder, PrefsError};
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
    struct TestClass {
        id: i32,
        text: String,
    }

    fn item(id: i32) -> TestClass {
        TestClass {
            id,
            text: id.to_string(),
        }
    }

    struct TestPreference {
        json_pref: Preference<TestClass>,
        json_pref_backed: Preference<TestClass>,
        null_json_pref: NullablePreference<TestClass>,
        null_json_pref_backed: NullablePreference<TestClass>,
        list_pref: Preference<Vec<TestClass>>,
        list_pref_backed: Preference<Vec<TestClass>>,
        null_list_pref: NullablePreference<Vec<TestClass>>,
        null_list_pref_backed: NullablePreference<Vec<TestClass>>,
        context: KryptoContext,
    }

    async fn open(dir: &TempDir) -> TestPreference {
        let prefs = KryptoBuilder::pref(dir.path(), "prefs", "pass", "9774d56d682e549c", 10)
            .await
            .unwrap();
        let c = KryptoContext::new(prefs);

        TestPreference {
            json_pref: c.json("jsonPref", TestClass::default(), false),
            json_pref_backed: c.json("jsonPrefBacked", TestClass::default(), true),
            null_json_pref: c.nullable_json("nullJsonPref", None, false),
            null_json_pref_backed: c.nullable_json("nullJsonPrefBacked", None, true),
            list_pref: c.json("listPref", Vec::new(), false),
            list_pref_backed: c.json("listPrefBacked", Vec::new(), true),
            null_list_pref: c.nullable_json("nullListPref", None, false),
            null_list_pref_backed: c.nullable_json("nullListPrefBacked", None, true),
            context: c,
        }
    }

    #[test]
    fn test_transform_is_compact_json() {
        let transform = JsonTransform::<TestClass>::new();
        assert_eq!(transform.serialize(&item(1)).unwrap(), r#"{"id":1,"text":"1"}"#);
        assert_eq!(transform.deserialize(r#"{"id":2,"text":"2"}"#).unwrap(), item(2));
        assert!(transform.deserialize("{").is_err());
    }

    #[tokio::test]
    async fn preference_json() {
        let dir = TempDir::new().unwrap();
        let prefs = open(&dir).await;

        assert_eq!(prefs.json_pref.get().await.unwrap(), TestClass::default());
        prefs.json_pref.put(item(1)).await.unwrap();
        assert_eq!(prefs.json_pref.get().await.unwrap(), item(1));

        assert_eq!(prefs.json_pref_backed.get().await.unwrap(), TestClass::default());
        prefs.json_pref_backed.put(item(1)).await.unwrap();
        assert_eq!(prefs.json_pref_backed.get().await.unwrap(), item(1));

        assert_eq!(prefs.null_json_pref.get().await.unwrap(), None);
        prefs.null_json_pref.put(Some(item(1))).await.unwrap();
        assert_eq!(prefs.null_json_pref.get().await.unwrap(), Some(item(1)));
        prefs.null_json_pref.put(None).await.unwrap();
        assert_eq!(prefs.null_json_pref.get().await.unwrap(), None);

        assert_eq!(prefs.null_json_pref_backed.get().await.unwrap(), None);
        prefs.null_json_pref_backed.put(Some(item(1))).await.unwrap();
        assert_eq!(prefs.null_json_pref_backed.get().await.unwrap(), Some(item(1)));
        prefs.null_json_pref_backed.put(None).await.unwrap();
        assert_eq!(prefs.null_json_pref_backed.get().await.unwrap(), None);
    }

    #[tokio::test]
    async fn preference_list() {
        let dir = TempDir::new().unwrap();
        let prefs = open(&dir).await;
        let list = vec![item(1), item(2)];

        assert!(prefs.list_pref.get().await.unwrap().is_empty());
        prefs.list_pref.put(list.clone()).await.unwrap();
        assert_eq!(prefs.list_pref.get().await.unwrap(), list);

        assert!(prefs.list_pref_backed.get().await.unwrap().is_empty());
        prefs.list_pref_backed.put(list.clone()).await.unwrap();
        assert_eq!(prefs.list_pref_backed.get().await.unwrap(), list);

        assert_eq!(prefs.null_list_pref.get().await.unwrap(), None);
        prefs.null_list_pref.put(Some(list.clone())).await.unwrap();
        assert_eq!(prefs.null_list_pref.get().await.unwrap(), Some(list.clone()));
        prefs.null_list_pref.put(None).await.unwrap();
        assert_eq!(prefs.null_list_pref.get().await.unwrap(), None);

        assert_eq!(prefs.null_list_pref_backed.get().await.unwrap(), None);
        prefs.null_list_pref_backed.put(Some(list.clone())).await.unwrap();
        assert_eq!(prefs.null_list_pref_backed.get().await.unwrap(), Some(list));
        prefs.null_list_pref_backed.put(None).await.unwrap();
        assert_eq!(prefs.null_list_pref_backed.get().await.unwrap(), None);
    }

    #[tokio::test]
    async fn preference_json_survives_reopen() {
        let dir = TempDir::new().unwrap();
        open(&dir).await.list_pref.put(vec![item(7)]).await.unwrap();

        let prefs = open(&dir).await;
        assert_eq!(prefs.list_pref.get().await.unwrap(), vec![item(7)]);
    }

    #[tokio::test]
    async fn preference_json_bad_shape() {
        let dir = TempDir::new().unwrap();
        let prefs = open(&dir).await;
        prefs
            .context
            .prefs()
            .put_string("jsonPref", Some("[1,2]"))
            .await
            .unwrap();

        assert!(matches!(
            prefs.json_pref.get().await,
            Err(PrefsError::TransformError { .. })
        ));
    }
}
