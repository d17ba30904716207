//! Core trait for key-value backends.

use async_trait::async_trait;

use crate::error::StoreResult;

/// The persistence substrate every [`crate::Store`] ends up talking to.
///
/// Keys and values are plain strings; all structure is flattened by
/// serializers before it reaches a backend. Every call may fail, and no call
/// is retried by the layers above.
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// Backend identifier for logs.
    fn id(&self) -> &str;

    /// Fetch the value stored under `key`, if any.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> StoreResult<()>;
}
