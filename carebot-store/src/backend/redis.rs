//! Redis backend for production persistence.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::traits::KeyValueBackend;
use crate::error::{StoreError, StoreResult};

/// Redis backend using plain `GET`, `SET` and `DEL`.
///
/// The multiplexed connection is opened on first use and shared afterwards.
pub struct RedisBackend {
    client: redis::Client,
    connection: OnceCell<MultiplexedConnection>,
}

impl RedisBackend {
    /// Create a backend from a connection URL (`redis://host:port/db`).
    pub fn new(connection_url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(connection_url)
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self {
            client,
            connection: OnceCell::new(),
        })
    }

    async fn connection(&self) -> StoreResult<MultiplexedConnection> {
        let connection = self
            .connection
            .get_or_try_init(|| async {
                let connection = self
                    .client
                    .get_multiplexed_async_connection()
                    .await
                    .map_err(|e| StoreError::Connection(e.to_string()))?;
                info!("Redis connection established");
                Ok::<_, StoreError>(connection)
            })
            .await?;
        Ok(connection.clone())
    }
}

#[async_trait]
impl KeyValueBackend for RedisBackend {
    fn id(&self) -> &str {
        "redis"
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.connection().await?;
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        debug!("Setting {} to {}", key, value);
        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        debug!("Deleting {}", key);
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_rejected() {
        let result = RedisBackend::new("not a url");
        assert!(matches!(result, Err(StoreError::Connection(_))));
    }
}
