//! Key tracking for backends without a listing operation.
//!
//! A tracked view keeps a side list of every key that currently holds a
//! value. The list is written first, then the value, as two separate
//! backend writes: a failure in between leaves the list out of sync and
//! nothing reconciles it later.

use async_trait::async_trait;
use tracing::debug;

use crate::error::StoreResult;
use crate::item::ItemStore;
use crate::store::{KeyValueStore, Store, StoreKey, StoreValue};

impl<K: StoreKey + PartialEq, V: StoreValue> Store<K, V> {
    /// View whose `put` also maintains `keys`.
    ///
    /// Writing a value adds the key to the list once; clearing it removes the
    /// key. `get` is unchanged. Scoping the returned view gives an untracked
    /// view of the sub-namespace.
    pub fn track_keys(&self, keys: ItemStore<Vec<K>>) -> Store<K, V> {
        Store::from_layer(TrackedLayer {
            inner: self.clone(),
            keys: keys.default(Vec::new()),
        })
    }
}

struct TrackedLayer<K, V> {
    inner: Store<K, V>,
    keys: ItemStore<Vec<K>>,
}

#[async_trait]
impl<K: StoreKey + PartialEq, V: StoreValue> KeyValueStore<K, V> for TrackedLayer<K, V> {
    async fn get(&self, key: &K) -> StoreResult<Option<V>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &K, value: Option<V>) -> StoreResult<Option<V>> {
        let present = value.is_some();
        self.keys
            .modify(|mut keys| {
                if !present {
                    keys.retain(|k| k != key);
                } else if !keys.contains(key) {
                    keys.push(key.clone());
                }
                keys
            })
            .await?;
        debug!("Tracked key {:?} (present: {})", key, present);
        self.inner.put(key, value).await
    }

    fn scope(&self, namespace: &str) -> Store<K, V> {
        self.inner.scope(namespace)
    }
}
