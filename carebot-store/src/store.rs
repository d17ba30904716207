//! Keyed store views.
//!
//! A [`Store`] is a cloneable handle over a stack of layers. The root layer
//! talks to a [`KeyValueBackend`] under an optional key prefix; every
//! combinator (`default`, `contramap`, `track_keys`, ...) wraps the current
//! handle in another layer that only ever calls the one beneath it, so
//! chains compose in any order.

use async_trait::async_trait;
use futures::future::try_join_all;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::backend::KeyValueBackend;
use crate::error::{StoreError, StoreResult};
use crate::item::ItemStore;
use crate::serializer::Serializer;

/// Bounds every store key satisfies.
pub trait StoreKey: Clone + fmt::Debug + Send + Sync + 'static {}

impl<T: Clone + fmt::Debug + Send + Sync + 'static> StoreKey for T {}

/// Bounds every store value satisfies.
pub trait StoreValue: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> StoreValue for T {}

pub(crate) type KeyFn<K2, K> = Arc<dyn Fn(&K2) -> K + Send + Sync>;
pub(crate) type FallbackFn<K, V> = Arc<dyn Fn(&K) -> V + Send + Sync>;

/// One layer of a store view.
///
/// `put` with `None` clears the key. `scope` returns the same view over the
/// sub-namespace `namespace/`.
#[async_trait]
pub trait KeyValueStore<K, V>: Send + Sync {
    /// Fetch the value for `key`, `None` if nothing was ever written.
    async fn get(&self, key: &K) -> StoreResult<Option<V>>;

    /// Write or clear the value for `key`, returning what was written.
    async fn put(&self, key: &K, value: Option<V>) -> StoreResult<Option<V>>;

    /// The same view with every key prefixed by `namespace/`.
    fn scope(&self, namespace: &str) -> Store<K, V>;
}

/// Cloneable handle over a layered store view.
pub struct Store<K, V> {
    inner: Arc<dyn KeyValueStore<K, V>>,
}

impl<K, V> Clone for Store<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Store<String, String> {
    /// Root store writing straight to `backend` without a prefix.
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self::from_layer(BackendLayer {
            backend,
            prefix: None,
        })
    }
}

impl<K: StoreKey, V: StoreValue> Store<K, V> {
    /// Wrap a custom layer.
    pub fn from_layer(layer: impl KeyValueStore<K, V> + 'static) -> Self {
        Self {
            inner: Arc::new(layer),
        }
    }

    /// Fetch the value for `key`.
    pub async fn get(&self, key: &K) -> StoreResult<Option<V>> {
        self.inner.get(key).await
    }

    /// Write (`Some`) or clear (`None`) the value for `key`.
    pub async fn put(&self, key: &K, value: Option<V>) -> StoreResult<Option<V>> {
        self.inner.put(key, value).await
    }

    /// Write `value` under `key` and return it.
    pub async fn insert(&self, key: &K, value: V) -> StoreResult<V> {
        self.inner.put(key, Some(value.clone())).await?;
        Ok(value)
    }

    /// Clear the value under `key`.
    pub async fn remove(&self, key: &K) -> StoreResult<()> {
        self.inner.put(key, None).await?;
        Ok(())
    }

    /// Fetch several keys concurrently, dropping the ones without a value.
    pub async fn get_many(&self, keys: &[K]) -> StoreResult<Vec<(K, V)>> {
        let values = try_join_all(keys.iter().map(|key| self.get(key))).await?;
        Ok(keys
            .iter()
            .cloned()
            .zip(values)
            .filter_map(|(key, value)| value.map(|v| (key, v)))
            .collect())
    }

    /// View whose keys live under `namespace/`. Scopes nest.
    pub fn scope(&self, namespace: &str) -> Store<K, V> {
        self.inner.scope(namespace)
    }

    /// View that substitutes `fallback(key)` whenever a key has no value.
    pub fn default<F>(&self, fallback: F) -> Store<K, V>
    where
        F: Fn(&K) -> V + Send + Sync + 'static,
    {
        self.default_with(Arc::new(fallback))
    }

    pub(crate) fn default_with(&self, fallback: FallbackFn<K, V>) -> Store<K, V> {
        Store::from_layer(DefaultLayer {
            inner: self.clone(),
            fallback,
        })
    }

    /// View over a different key and value type.
    ///
    /// Keys are translated with `key_fn`, values with `serializer`.
    pub fn contramap<K2, V2, F>(&self, key_fn: F, serializer: Serializer<V2, V>) -> Store<K2, V2>
    where
        K2: StoreKey,
        V2: StoreValue,
        F: Fn(&K2) -> K + Send + Sync + 'static,
    {
        self.contramap_with(Arc::new(key_fn), serializer)
    }

    pub(crate) fn contramap_with<K2, V2>(
        &self,
        key_fn: KeyFn<K2, K>,
        serializer: Serializer<V2, V>,
    ) -> Store<K2, V2>
    where
        K2: StoreKey,
        V2: StoreValue,
    {
        Store::from_layer(MappedLayer {
            inner: self.clone(),
            key_fn,
            serializer,
        })
    }

    /// View over a different key type; values pass through unchanged.
    pub fn transform_key<K2, F>(&self, key_fn: F) -> Store<K2, V>
    where
        K2: StoreKey,
        F: Fn(&K2) -> K + Send + Sync + 'static,
    {
        self.contramap(key_fn, Serializer::identity())
    }

    /// View over a different value type; keys pass through unchanged.
    pub fn contramap_value<V2>(&self, serializer: Serializer<V2, V>) -> Store<K, V2>
    where
        V2: StoreValue,
    {
        self.contramap(|key: &K| key.clone(), serializer)
    }

    /// Single-key view.
    pub fn item(&self, key: K) -> ItemStore<V> {
        ItemStore::keyed(self.clone(), key)
    }
}

impl<K: StoreKey, V: StoreValue + PartialEq> Store<K, V> {
    /// Read, transform and write back the value for `key`.
    ///
    /// The write is skipped when the transform leaves the value equal to
    /// what was read. Fails with [`StoreError::Missing`] when the key has no
    /// value; apply [`Store::default`] first for keys that may be unset.
    /// Not atomic: a concurrent `modify` on the same key can be lost.
    pub async fn modify<F>(&self, key: &K, transform: F) -> StoreResult<V>
    where
        F: FnOnce(V) -> V + Send,
    {
        let current = self
            .get(key)
            .await?
            .ok_or_else(|| StoreError::Missing(format!("{:?}", key)))?;
        let transformed = transform(current.clone());
        if transformed == current {
            debug!("Value for {:?} unchanged, skipping write", key);
            return Ok(current);
        }
        self.insert(key, transformed).await
    }

    /// [`Store::modify`] over the optional value, able to create or clear it.
    pub async fn modify_optional<F>(&self, key: &K, transform: F) -> StoreResult<Option<V>>
    where
        F: FnOnce(Option<V>) -> Option<V> + Send,
    {
        let current = self.get(key).await?;
        let transformed = transform(current.clone());
        if transformed == current {
            debug!("Value for {:?} unchanged, skipping write", key);
            return Ok(current);
        }
        self.put(key, transformed).await
    }
}

/// Root layer over the backend.
struct BackendLayer {
    backend: Arc<dyn KeyValueBackend>,
    prefix: Option<String>,
}

impl BackendLayer {
    fn full_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}/{}", prefix, key),
            None => key.to_string(),
        }
    }
}

#[async_trait]
impl KeyValueStore<String, String> for BackendLayer {
    async fn get(&self, key: &String) -> StoreResult<Option<String>> {
        self.backend.get(&self.full_key(key)).await
    }

    async fn put(&self, key: &String, value: Option<String>) -> StoreResult<Option<String>> {
        let full_key = self.full_key(key);
        match &value {
            Some(v) => self.backend.set(&full_key, v).await?,
            None => self.backend.delete(&full_key).await?,
        }
        Ok(value)
    }

    fn scope(&self, namespace: &str) -> Store<String, String> {
        Store::from_layer(BackendLayer {
            backend: Arc::clone(&self.backend),
            prefix: Some(self.full_key(namespace)),
        })
    }
}

struct DefaultLayer<K, V> {
    inner: Store<K, V>,
    fallback: FallbackFn<K, V>,
}

#[async_trait]
impl<K: StoreKey, V: StoreValue> KeyValueStore<K, V> for DefaultLayer<K, V> {
    async fn get(&self, key: &K) -> StoreResult<Option<V>> {
        let value = self.inner.get(key).await?;
        Ok(Some(value.unwrap_or_else(|| (self.fallback)(key))))
    }

    async fn put(&self, key: &K, value: Option<V>) -> StoreResult<Option<V>> {
        self.inner.put(key, value).await
    }

    fn scope(&self, namespace: &str) -> Store<K, V> {
        self.inner
            .scope(namespace)
            .default_with(Arc::clone(&self.fallback))
    }
}

struct MappedLayer<K2, V2, K, V> {
    inner: Store<K, V>,
    key_fn: KeyFn<K2, K>,
    serializer: Serializer<V2, V>,
}

#[async_trait]
impl<K2, V2, K, V> KeyValueStore<K2, V2> for MappedLayer<K2, V2, K, V>
where
    K2: StoreKey,
    V2: StoreValue,
    K: StoreKey,
    V: StoreValue,
{
    async fn get(&self, key: &K2) -> StoreResult<Option<V2>> {
        let key = (self.key_fn)(key);
        match self.inner.get(&key).await? {
            Some(stored) => Ok(Some(self.serializer.from(stored)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &K2, value: Option<V2>) -> StoreResult<Option<V2>> {
        let key = (self.key_fn)(key);
        let stored = value
            .as_ref()
            .map(|v| self.serializer.to(v))
            .transpose()?;
        self.inner.put(&key, stored).await?;
        Ok(value)
    }

    fn scope(&self, namespace: &str) -> Store<K2, V2> {
        self.inner
            .scope(namespace)
            .contramap_with(Arc::clone(&self.key_fn), self.serializer.clone())
    }
}
