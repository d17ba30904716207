//! Remote key-value backends.
//!
//! Provides a trait-based interface over the string-only persistence
//! substrate:
//! - In-memory map (tests, local runs)
//! - Redis (optional `redis` feature)

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;
pub mod traits;

pub use memory::MemoryBackend;
#[cfg(feature = "redis")]
pub use self::redis::RedisBackend;
pub use traits::KeyValueBackend;
