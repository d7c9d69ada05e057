use crate::domain::Payload;
use crate::instrument::{CallHistory, CountCalls, Instrument};
use crate::planes::data::operation::Operation;
use crate::ports::KeyValueStore;
use async_trait::async_trait;
use shared::{Error, Result};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Qualified name of [`Cache::store`]
pub const STORE_OPERATION: &str = "Cache.store";

/// Argument tuple recorded for every [`Cache::store`] call
pub type StoreArgs = (Payload,);

/// Writes a payload under a freshly generated UUIDv4 key and returns the key
pub struct StoreOperation {
    store: Arc<dyn KeyValueStore>,
}

impl StoreOperation {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Operation for StoreOperation {
    type Input = StoreArgs;
    type Output = String;

    fn qualified_name(&self) -> &str {
        STORE_OPERATION
    }

    async fn call(&self, (payload,): Self::Input) -> Result<Self::Output> {
        let key = Uuid::new_v4().to_string();
        self.store.set(&key, payload.to_bytes()).await?;
        debug!("Stored {:?} under {}", payload, key);
        Ok(key)
    }
}

type InstrumentedStore = CallHistory<CountCalls<StoreOperation>>;

/// Cache facade over an external key-value store
///
/// Holds nothing but the store handle; every value, counter and history list
/// lives in the store. Creating a `Cache` never clears the store, see [`Cache::reset`].
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn KeyValueStore>,
    store_op: Arc<InstrumentedStore>,
}

impl Cache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let store_op = StoreOperation::new(store.clone())
            .counted(store.clone())
            .recorded(store.clone());

        Self {
            store,
            store_op: Arc::new(store_op),
        }
    }

    /// Handle to the underlying store, e.g. for a [`Replayer`](crate::planes::control::Replayer)
    pub fn store_handle(&self) -> Arc<dyn KeyValueStore> {
        self.store.clone()
    }

    /// Clear every key in the store, including counters and histories
    pub async fn reset(&self) -> Result<()> {
        self.store.flushdb().await?;
        info!("Store flushed");
        Ok(())
    }

    /// Store `data` under a new random key; counted and recorded as `Cache.store`
    ///
    /// NaN and infinite floats are rejected before anything is counted or
    /// recorded, since the history encoding cannot represent them.
    pub async fn store(&self, data: impl Into<Payload>) -> Result<String> {
        let payload = data.into();
        ensure_recordable(&payload)?;
        self.store_op.call((payload,)).await
    }

    /// Raw value for `key`, `None` when the key does not exist
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.store.get(key).await
    }

    /// Read `key` and hand the raw, possibly absent, value to `converter`
    pub async fn get_with<T, F>(&self, key: &str, converter: F) -> Result<T>
    where
        F: FnOnce(Option<Vec<u8>>) -> Result<T>,
    {
        let raw = self.store.get(key).await?;
        converter(raw)
    }

    /// Value for `key` decoded as UTF-8
    ///
    /// A present empty value is `Some("")`, never confused with a missing key.
    pub async fn get_str(&self, key: &str) -> Result<Option<String>> {
        self.get_with(key, |raw| raw.map(decode_str).transpose()).await
    }

    /// Value for `key` parsed as a base-10 integer
    ///
    /// A present empty value is a decode error rather than `None`.
    pub async fn get_int(&self, key: &str) -> Result<Option<i64>> {
        self.get_with(key, |raw| raw.map(decode_int).transpose()).await
    }

    /// Number of recorded invocations of the operation `name` since the last flush
    pub async fn call_count(&self, name: &str) -> Result<u64> {
        match self.get_int(name).await? {
            Some(count) => u64::try_from(count)
                .map_err(|_| Error::Decode(format!("counter '{name}' is negative: {count}"))),
            None => Ok(0),
        }
    }
}

fn ensure_recordable(payload: &Payload) -> Result<()> {
    match payload {
        Payload::Float(value) if !value.is_finite() => Err(Error::Serialize(format!(
            "non-finite float {value} cannot be recorded"
        ))),
        _ => Ok(()),
    }
}

fn decode_str(raw: Vec<u8>) -> Result<String> {
    String::from_utf8(raw).map_err(|e| Error::Decode(format!("value is not UTF-8: {e}")))
}

fn decode_int(raw: Vec<u8>) -> Result<i64> {
    let text = decode_str(raw)?;
    text.trim()
        .parse::<i64>()
        .map_err(|e| Error::Decode(format!("'{text}' is not an integer: {e}")))
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("store", &"<dyn KeyValueStore>")
            .field("store_op", &self.store_op)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::{inputs_key, outputs_key};
    use crate::persistence::MemoryStore;
    use crate::planes::control::Replayer;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cache() -> (Cache, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Cache::new(store.clone()), store)
    }

    /// Memory store whose `fail_on`-th command (1-based) fails as unreachable
    struct FlakyStore {
        inner: MemoryStore,
        commands: AtomicUsize,
        fail_on: usize,
    }

    impl FlakyStore {
        fn failing_on(fail_on: usize) -> Arc<Self> {
            Arc::new(Self {
                inner: MemoryStore::new(),
                commands: AtomicUsize::new(0),
                fail_on,
            })
        }

        fn next_command(&self, name: &str) -> Result<()> {
            let n = self.commands.fetch_add(1, Ordering::SeqCst) + 1;
            if n == self.fail_on {
                return Err(Error::StoreUnavailable(format!("connection lost during {name}")));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl KeyValueStore for FlakyStore {
        async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
            self.next_command("SET")?;
            self.inner.set(key, value).await
        }

        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
            self.next_command("GET")?;
            self.inner.get(key).await
        }

        async fn incr(&self, key: &str) -> Result<i64> {
            self.next_command("INCR")?;
            self.inner.incr(key).await
        }

        async fn rpush(&self, key: &str, value: Vec<u8>) -> Result<usize> {
            self.next_command("RPUSH")?;
            self.inner.rpush(key, value).await
        }

        async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<Vec<u8>>> {
            self.next_command("LRANGE")?;
            self.inner.lrange(key, start, stop).await
        }

        async fn flushdb(&self) -> Result<()> {
            self.next_command("FLUSHDB")?;
            self.inner.flushdb().await
        }
    }

    #[tokio::test]
    async fn test_store_and_get_str() {
        let (cache, _) = cache();

        let k1 = cache.store("hello").await.unwrap();
        let k2 = cache.store("world").await.unwrap();

        assert_ne!(k1, k2);
        assert!(Uuid::parse_str(&k1).is_ok());
        assert_eq!(cache.get_str(&k1).await.unwrap().as_deref(), Some("hello"));
        assert_eq!(cache.get_str(&k2).await.unwrap().as_deref(), Some("world"));
        assert_eq!(cache.call_count(STORE_OPERATION).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_store_int_and_get_int() {
        let (cache, _) = cache();

        let key = cache.store(42).await.unwrap();

        assert_eq!(cache.get_int(&key).await.unwrap(), Some(42));
        assert_eq!(cache.get_str(&key).await.unwrap().as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn test_get_returns_stored_bytes() {
        let (cache, _) = cache();

        let bytes_key = cache.store(vec![0u8, 159, 146, 150]).await.unwrap();
        let float_key = cache.store(2.5).await.unwrap();

        assert_eq!(
            cache.get(&bytes_key).await.unwrap(),
            Some(vec![0u8, 159, 146, 150])
        );
        assert_eq!(cache.get(&float_key).await.unwrap(), Some(b"2.5".to_vec()));
        assert!(matches!(
            cache.get_str(&bytes_key).await.unwrap_err(),
            Error::Decode(_)
        ));
    }

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let (cache, _) = cache();

        assert_eq!(cache.get("nonexistent").await.unwrap(), None);
        assert_eq!(cache.get_str("nonexistent").await.unwrap(), None);
        assert_eq!(cache.get_int("nonexistent").await.unwrap(), None);
        assert_eq!(cache.call_count("Never.called").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_value_is_present() {
        let (cache, _) = cache();

        let key = cache.store("").await.unwrap();

        assert_eq!(cache.get(&key).await.unwrap(), Some(Vec::new()));
        assert_eq!(cache.get_str(&key).await.unwrap(), Some(String::new()));
        assert!(matches!(
            cache.get_int(&key).await.unwrap_err(),
            Error::Decode(_)
        ));
    }

    #[tokio::test]
    async fn test_zero_is_converted() {
        let (cache, _) = cache();

        let key = cache.store(0).await.unwrap();

        assert_eq!(cache.get_int(&key).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_get_with_converter() {
        let (cache, _) = cache();

        let key = cache.store("abc").await.unwrap();

        let len = cache
            .get_with(&key, |raw| Ok(raw.map(|v| v.len())))
            .await
            .unwrap();
        assert_eq!(len, Some(3));

        // The converter also sees absent values
        let absent = cache
            .get_with("nonexistent", |raw| Ok(raw.is_none()))
            .await
            .unwrap();
        assert!(absent);
    }

    #[tokio::test]
    async fn test_store_records_history_in_call_order() {
        let (cache, store) = cache();

        let keys = [
            cache.store("a").await.unwrap(),
            cache.store("b").await.unwrap(),
            cache.store("c").await.unwrap(),
        ];

        let inputs = store.lrange(&inputs_key(STORE_OPERATION), 0, -1).await.unwrap();
        let outputs = store.lrange(&outputs_key(STORE_OPERATION), 0, -1).await.unwrap();
        assert_eq!(inputs.len(), 3);
        assert_eq!(outputs.len(), 3);

        for (i, word) in ["a", "b", "c"].iter().enumerate() {
            let args: StoreArgs = serde_json::from_slice(&inputs[i]).unwrap();
            assert_eq!(args.0, Payload::from(*word));
            assert_eq!(outputs[i], keys[i].as_bytes());
        }
    }

    #[tokio::test]
    async fn test_new_does_not_flush_but_reset_does() {
        let (cache, store) = cache();
        let key = cache.store("kept").await.unwrap();

        let second = Cache::new(store.clone());
        assert_eq!(second.get_str(&key).await.unwrap().as_deref(), Some("kept"));
        assert_eq!(second.call_count(STORE_OPERATION).await.unwrap(), 1);

        second.reset().await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), None);
        assert_eq!(cache.call_count(STORE_OPERATION).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clones_share_the_store() {
        let (cache, _) = cache();
        let clone = cache.clone();

        cache.store("one").await.unwrap();
        clone.store("two").await.unwrap();

        assert_eq!(cache.call_count(STORE_OPERATION).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_store_unavailable_before_anything_is_recorded() {
        // First command of a store is the inputs RPUSH
        let store = FlakyStore::failing_on(1);
        let cache = Cache::new(store.clone());

        let err = cache.store("lost").await.unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable(_)));

        assert_eq!(store.inner.get(STORE_OPERATION).await.unwrap(), None);
        assert!(store.inner.is_empty());
    }

    #[tokio::test]
    async fn test_store_unavailable_after_write_leaves_partial_history() {
        // RPUSH inputs, INCR, SET, then the failing RPUSH outputs
        let store = FlakyStore::failing_on(4);
        let cache = Cache::new(store.clone());

        let err = cache.store("half").await.unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable(_)));

        let inner = &store.inner;
        assert_eq!(inner.get(STORE_OPERATION).await.unwrap(), Some(b"1".to_vec()));
        let inputs = inner.lrange(&inputs_key(STORE_OPERATION), 0, -1).await.unwrap();
        let outputs = inner.lrange(&outputs_key(STORE_OPERATION), 0, -1).await.unwrap();
        assert_eq!(inputs.len(), 1);
        assert!(outputs.is_empty());
        // counter, inputs list and the stored value itself
        assert_eq!(inner.len(), 3);

        let replay = Replayer::new(store.clone())
            .load::<StoreArgs>(STORE_OPERATION)
            .await
            .unwrap();
        assert_eq!(replay.count, 1);
        assert!(replay.calls.is_empty());
    }

    #[tokio::test]
    async fn test_typed_reads_pass_store_errors_through() {
        let store = FlakyStore::failing_on(1);
        let cache = Cache::new(store.clone());
        assert!(matches!(
            cache.get_str("k").await.unwrap_err(),
            Error::StoreUnavailable(_)
        ));

        let store = FlakyStore::failing_on(1);
        let cache = Cache::new(store.clone());
        assert!(matches!(
            cache.get_int("k").await.unwrap_err(),
            Error::StoreUnavailable(_)
        ));

        let store = FlakyStore::failing_on(1);
        let cache = Cache::new(store.clone());
        assert!(matches!(
            cache.call_count(STORE_OPERATION).await.unwrap_err(),
            Error::StoreUnavailable(_)
        ));
    }

    #[tokio::test]
    async fn test_replay_passes_store_errors_through() {
        // Four commands for the store, the fifth is the first LRANGE
        let store = FlakyStore::failing_on(5);
        let cache = Cache::new(store.clone());
        cache.store("a").await.unwrap();

        let err = Replayer::new(store)
            .load::<StoreArgs>(STORE_OPERATION)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn test_non_finite_floats_are_rejected_unrecorded() {
        let (cache, store) = cache();
        cache.store("before").await.unwrap();

        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                cache.store(value).await.unwrap_err(),
                Error::Serialize(_)
            ));
        }

        assert_eq!(cache.call_count(STORE_OPERATION).await.unwrap(), 1);
        let replay = Replayer::new(store)
            .load::<StoreArgs>(STORE_OPERATION)
            .await
            .unwrap();
        assert_eq!(replay.count, 1);
        assert_eq!(replay.calls[0].args.0, Payload::from("before"));

        // Finite floats still go through
        let key = cache.store(1.5).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), Some(b"1.5".to_vec()));
    }
}
