//! Single-key store views.

use async_trait::async_trait;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error};

use crate::error::{StoreError, StoreResult};
use crate::serializer::Serializer;
use crate::store::{Store, StoreKey, StoreValue};

type UpdateFn<V> = Arc<dyn Fn(Option<&V>) + Send + Sync>;

/// One layer of a single-key view.
#[async_trait]
pub trait ItemCell<V>: Send + Sync {
    /// Fetch the value, `None` if nothing was ever written.
    async fn get(&self) -> StoreResult<Option<V>>;

    /// Write or clear the value, returning what was written.
    async fn put(&self, value: Option<V>) -> StoreResult<Option<V>>;
}

/// Cloneable handle over a single-key view (a singleton cell).
pub struct ItemStore<V> {
    inner: Arc<dyn ItemCell<V>>,
}

impl<V> Clone for ItemStore<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: StoreValue> ItemStore<V> {
    /// Wrap a custom layer.
    pub fn from_cell(cell: impl ItemCell<V> + 'static) -> Self {
        Self {
            inner: Arc::new(cell),
        }
    }

    pub(crate) fn keyed<K: StoreKey>(store: Store<K, V>, key: K) -> Self {
        Self::from_cell(KeyedItem { store, key })
    }

    /// Fetch the value.
    pub async fn get(&self) -> StoreResult<Option<V>> {
        self.inner.get().await
    }

    /// Write (`Some`) or clear (`None`) the value.
    pub async fn put(&self, value: Option<V>) -> StoreResult<Option<V>> {
        self.inner.put(value).await
    }

    /// Write `value` and return it.
    pub async fn insert(&self, value: V) -> StoreResult<V> {
        self.inner.put(Some(value.clone())).await?;
        Ok(value)
    }

    /// Clear the value.
    pub async fn remove(&self) -> StoreResult<()> {
        self.inner.put(None).await?;
        Ok(())
    }

    /// View that returns `value` whenever nothing is stored.
    pub fn default(&self, value: V) -> ItemStore<V> {
        Self::from_cell(DefaultItem {
            inner: self.clone(),
            value,
        })
    }

    /// View over a different value type.
    pub fn contramap<V2: StoreValue>(&self, serializer: Serializer<V2, V>) -> ItemStore<V2> {
        ItemStore::from_cell(MappedItem {
            inner: self.clone(),
            serializer,
        })
    }

    /// View that calls `callback` after every successful get and put.
    ///
    /// Used to keep an in-memory mirror of the cell current. A panicking
    /// callback is logged and never fails the get or put that triggered it.
    pub fn on_update<F>(&self, callback: F) -> ItemStore<V>
    where
        F: Fn(Option<&V>) + Send + Sync + 'static,
    {
        Self::from_cell(ObservedItem {
            inner: self.clone(),
            callback: Arc::new(callback),
        })
    }
}

impl<V: StoreValue + PartialEq> ItemStore<V> {
    /// Read, transform and write back the value.
    ///
    /// Skips the write when the transform leaves the value unchanged. Fails
    /// with [`StoreError::Missing`] when nothing is stored; apply
    /// [`ItemStore::default`] first for cells that may be unset.
    pub async fn modify<F>(&self, transform: F) -> StoreResult<V>
    where
        F: FnOnce(V) -> V + Send,
    {
        let current = self
            .get()
            .await?
            .ok_or_else(|| StoreError::Missing("item".to_string()))?;
        let transformed = transform(current.clone());
        if transformed == current {
            debug!("Item unchanged, skipping write");
            return Ok(current);
        }
        self.insert(transformed).await
    }

    /// [`ItemStore::modify`] over the optional value.
    pub async fn modify_optional<F>(&self, transform: F) -> StoreResult<Option<V>>
    where
        F: FnOnce(Option<V>) -> Option<V> + Send,
    {
        let current = self.get().await?;
        let transformed = transform(current.clone());
        if transformed == current {
            debug!("Item unchanged, skipping write");
            return Ok(current);
        }
        self.put(transformed).await
    }
}

struct KeyedItem<K, V> {
    store: Store<K, V>,
    key: K,
}

#[async_trait]
impl<K: StoreKey, V: StoreValue> ItemCell<V> for KeyedItem<K, V> {
    async fn get(&self) -> StoreResult<Option<V>> {
        self.store.get(&self.key).await
    }

    async fn put(&self, value: Option<V>) -> StoreResult<Option<V>> {
        self.store.put(&self.key, value).await
    }
}

struct DefaultItem<V> {
    inner: ItemStore<V>,
    value: V,
}

#[async_trait]
impl<V: StoreValue> ItemCell<V> for DefaultItem<V> {
    async fn get(&self) -> StoreResult<Option<V>> {
        let value = self.inner.get().await?;
        Ok(Some(value.unwrap_or_else(|| self.value.clone())))
    }

    async fn put(&self, value: Option<V>) -> StoreResult<Option<V>> {
        self.inner.put(value).await
    }
}

struct MappedItem<V2, V> {
    inner: ItemStore<V>,
    serializer: Serializer<V2, V>,
}

#[async_trait]
impl<V2: StoreValue, V: StoreValue> ItemCell<V2> for MappedItem<V2, V> {
    async fn get(&self) -> StoreResult<Option<V2>> {
        match self.inner.get().await? {
            Some(stored) => Ok(Some(self.serializer.from(stored)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, value: Option<V2>) -> StoreResult<Option<V2>> {
        let stored = value
            .as_ref()
            .map(|v| self.serializer.to(v))
            .transpose()?;
        self.inner.put(stored).await?;
        Ok(value)
    }
}

struct ObservedItem<V> {
    inner: ItemStore<V>,
    callback: UpdateFn<V>,
}

impl<V> ObservedItem<V> {
    fn notify(&self, value: Option<&V>) {
        let callback = &self.callback;
        if catch_unwind(AssertUnwindSafe(|| callback(value))).is_err() {
            error!("Item update callback panicked");
        }
    }
}

#[async_trait]
impl<V: StoreValue> ItemCell<V> for ObservedItem<V> {
    async fn get(&self) -> StoreResult<Option<V>> {
        let value = self.inner.get().await?;
        self.notify(value.as_ref());
        Ok(value)
    }

    async fn put(&self, value: Option<V>) -> StoreResult<Option<V>> {
        let written = self.inner.put(value).await?;
        self.notify(written.as_ref());
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use std::sync::Mutex;

    fn ids_item(backend: Arc<MemoryBackend>) -> ItemStore<Vec<i64>> {
        Store::new(backend)
            .item("chat_ids".to_string())
            .contramap(Serializer::json_array())
    }

    #[tokio::test]
    async fn test_item_default_and_modify() {
        let backend = Arc::new(MemoryBackend::new());
        let ids = ids_item(backend.clone()).default(Vec::new());

        assert_eq!(ids.get().await.unwrap(), Some(vec![]));

        let updated = ids
            .modify(|mut ids| {
                ids.push(42);
                ids
            })
            .await
            .unwrap();

        assert_eq!(updated, vec![42]);
        assert_eq!(backend.raw("chat_ids"), Some("[42]".to_string()));
    }

    #[tokio::test]
    async fn test_item_modify_unchanged_skips_write() {
        let backend = Arc::new(MemoryBackend::new().with_entry("chat_ids", "[1,2]"));
        let ids = ids_item(backend.clone());

        let value = ids.modify(|ids| ids).await.unwrap();

        assert_eq!(value, vec![1, 2]);
        assert_eq!(backend.set_count(), 0);
    }

    #[tokio::test]
    async fn test_on_update_sees_reads_and_writes() {
        let backend = Arc::new(MemoryBackend::new().with_entry("chat_ids", "[1]"));
        let mirror: Arc<Mutex<Vec<i64>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = mirror.clone();

        let ids = ids_item(backend).default(Vec::new()).on_update(move |ids| {
            if let Some(ids) = ids {
                *sink.lock().unwrap() = ids.clone();
            }
        });

        ids.get().await.unwrap();
        assert_eq!(*mirror.lock().unwrap(), vec![1]);

        ids.insert(vec![1, 2]).await.unwrap();
        assert_eq!(*mirror.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_on_update_panic_is_isolated() {
        let backend = Arc::new(MemoryBackend::new());
        let ids = ids_item(backend)
            .default(Vec::new())
            .on_update(|_| panic!("mirror exploded"));

        assert_eq!(ids.insert(vec![5]).await.unwrap(), vec![5]);
        assert_eq!(ids.get().await.unwrap(), Some(vec![5]));
    }

    #[tokio::test]
    async fn test_on_update_skipped_on_failure() {
        let backend = Arc::new(MemoryBackend::new());
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        let ids = ids_item(backend.clone()).on_update(move |_| {
            *counter.lock().unwrap() += 1;
        });

        backend.set_available(false);
        assert!(ids.get().await.is_err());
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_value_is_serialization_error() {
        let backend = Arc::new(MemoryBackend::new().with_entry("chat_ids", "{oops"));
        let ids = ids_item(backend);

        let err = ids.get().await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
