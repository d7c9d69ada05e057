#![deny(clippy::all)]

use async_trait::async_trait;
use shared::Result;

// Ports are the pluggable extension points for the backing key-value store

/// Port for the external key-value store (e.g., Redis)
///
/// Every command is atomic on its own; nothing here spans several commands.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;
    /// `None` when the key does not exist
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    /// Increment the integer at `key` by one, starting from 0 when missing
    async fn incr(&self, key: &str) -> Result<i64>;
    /// Append to the list at `key`, returning the new length
    async fn rpush(&self, key: &str, value: Vec<u8>) -> Result<usize>;
    /// Inclusive range with negative indices counted from the end (`0, -1` is the whole list)
    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<Vec<u8>>>;
    /// Remove every key in the store
    async fn flushdb(&self) -> Result<()>;
}
