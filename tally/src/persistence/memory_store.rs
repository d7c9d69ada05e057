use crate::ports::KeyValueStore;
use async_trait::async_trait;
use dashmap::DashMap;
use shared::{Error, Result};
use tracing::debug;

#[derive(Clone, Debug)]
enum Slot {
    Scalar(Vec<u8>),
    List(Vec<Vec<u8>>),
}

/// In-process key-value store with the same command semantics as Redis
///
/// Each command holds the shard lock for its key, so single commands are atomic.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, Slot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn wrong_type(key: &str, expected: &str) -> Error {
    Error::WrongType(format!("key '{key}' does not hold a {expected}"))
}

/// Resolve Redis-style inclusive bounds against a list of `len` items
fn resolve_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (start + len).max(0) } else { start };
    let stop = if stop < 0 { stop + len } else { stop.min(len - 1) };

    if len == 0 || start >= len || stop < 0 || start > stop {
        return None;
    }
    Some((start as usize, stop as usize))
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        debug!("SET {} ({} bytes)", key, value.len());
        self.entries.insert(key.to_string(), Slot::Scalar(value));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.entries.get(key).as_deref() {
            Some(Slot::Scalar(value)) => Ok(Some(value.clone())),
            Some(Slot::List(_)) => Err(wrong_type(key, "string")),
            None => Ok(None),
        }
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let mut slot = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Slot::Scalar(b"0".to_vec()));

        match &mut *slot {
            Slot::Scalar(bytes) => {
                let current = std::str::from_utf8(bytes)
                    .ok()
                    .and_then(|text| text.parse::<i64>().ok())
                    .ok_or_else(|| wrong_type(key, "integer"))?;
                let next = current
                    .checked_add(1)
                    .ok_or_else(|| Error::Internal(format!("increment of '{key}' overflows")))?;
                *bytes = next.to_string().into_bytes();
                debug!("INCR {} -> {}", key, next);
                Ok(next)
            }
            Slot::List(_) => Err(wrong_type(key, "integer")),
        }
    }

    async fn rpush(&self, key: &str, value: Vec<u8>) -> Result<usize> {
        let mut slot = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Slot::List(Vec::new()));

        match &mut *slot {
            Slot::List(items) => {
                items.push(value);
                debug!("RPUSH {} -> {}", key, items.len());
                Ok(items.len())
            }
            Slot::Scalar(_) => Err(wrong_type(key, "list")),
        }
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<Vec<u8>>> {
        match self.entries.get(key).as_deref() {
            Some(Slot::List(items)) => Ok(resolve_range(items.len(), start, stop)
                .map(|(from, to)| items[from..=to].to_vec())
                .unwrap_or_default()),
            Some(Slot::Scalar(_)) => Err(wrong_type(key, "list")),
            None => Ok(Vec::new()),
        }
    }

    async fn flushdb(&self) -> Result<()> {
        debug!("FLUSHDB ({} keys)", self.entries.len());
        self.entries.clear();
        Ok(())
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("keys", &self.entries.len())
            .finish()
    }
}
