//! carebot-store - typed views over a remote key-value backend
//!
//! The backend only knows string keys and string values. Everything the bot
//! persists goes through a [`Store`] or [`ItemStore`] view that namespaces
//! keys, converts values with a [`Serializer`], substitutes defaults and
//! keeps side lists of live keys.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ Store<K, V> / ItemStore<V>               │
//! │ (default, contramap, track_keys, ...)    │
//! └────────────────────┬─────────────────────┘
//!                      │ each layer talks only to the one beneath
//!                      ▼
//! ┌──────────────────────────────────────────┐
//! │ Store<String, String> (scoped prefix)    │
//! └────────────────────┬─────────────────────┘
//!                      ▼
//! ┌──────────────────────────────────────────┐
//! │ KeyValueBackend (memory, Redis)          │
//! └──────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use carebot_store::{MemoryBackend, Serializer, Store};
//!
//! let root = Store::new(Arc::new(MemoryBackend::new()));
//! let chat_ids = root
//!     .item("chat_ids".to_string())
//!     .contramap(Serializer::json_array())
//!     .default(Vec::<i64>::new());
//!
//! chat_ids.modify(|mut ids| { ids.push(42); ids }).await?;
//! ```
//!
//! Writes are plain get-then-put sequences: two concurrent `modify` calls on
//! the same key can lose an update, and a crash between a key-list update and
//! the value write leaves the list out of sync.

pub mod backend;
pub mod error;
pub mod item;
pub mod serializer;
pub mod store;
pub mod tracking;

pub use backend::{KeyValueBackend, MemoryBackend};
#[cfg(feature = "redis")]
pub use backend::RedisBackend;
pub use error::{StoreError, StoreResult};
pub use item::{ItemCell, ItemStore};
pub use serializer::Serializer;
pub use store::{KeyValueStore, Store, StoreKey, StoreValue};
