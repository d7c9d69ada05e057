use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, ErrorKind, RedisError};
use shared::{Error, Result};
use tally::ports::KeyValueStore;
use tracing::{debug, info};

/// Redis-backed implementation of the key-value store port
///
/// Uses a multiplexed `ConnectionManager`, which reconnects on its own after a
/// dropped connection. Cloning is cheap and shares the connection.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    address: String,
}

impl RedisStore {
    /// Connect to the server at `url` (e.g. `redis://127.0.0.1:6379/0`)
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url).map_err(map_redis_error)?;
        let address = client.get_connection_info().addr.to_string();

        let connection = client
            .get_connection_manager()
            .await
            .map_err(map_redis_error)?;

        info!("Connected to Redis at {}", address);
        Ok(Self {
            connection,
            address,
        })
    }

    fn connection(&self) -> ConnectionManager {
        self.connection.clone()
    }
}

fn map_redis_error(err: RedisError) -> Error {
    match err.kind() {
        ErrorKind::TypeError => Error::WrongType(err.to_string()),
        _ if err.code() == Some("WRONGTYPE") => Error::WrongType(err.to_string()),
        ErrorKind::ResponseError
            if err
                .detail()
                .is_some_and(|detail| detail.contains("not an integer")) =>
        {
            Error::WrongType(err.to_string())
        }
        ErrorKind::ResponseError => Error::Internal(err.to_string()),
        _ => Error::StoreUnavailable(err.to_string()),
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        debug!("SET {} ({} bytes)", key, value.len());
        self.connection()
            .set::<_, _, ()>(key, value)
            .await
            .map_err(map_redis_error)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.connection()
            .get::<_, Option<Vec<u8>>>(key)
            .await
            .map_err(map_redis_error)
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let value = self
            .connection()
            .incr::<_, _, i64>(key, 1)
            .await
            .map_err(map_redis_error)?;
        debug!("INCR {} -> {}", key, value);
        Ok(value)
    }

    async fn rpush(&self, key: &str, value: Vec<u8>) -> Result<usize> {
        let len = self
            .connection()
            .rpush::<_, _, usize>(key, value)
            .await
            .map_err(map_redis_error)?;
        debug!("RPUSH {} -> {}", key, len);
        Ok(len)
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<Vec<u8>>> {
        self.connection()
            .lrange::<_, Vec<Vec<u8>>>(key, start as isize, stop as isize)
            .await
            .map_err(map_redis_error)
    }

    async fn flushdb(&self) -> Result<()> {
        let mut connection = self.connection();
        redis::cmd("FLUSHDB")
            .query_async::<()>(&mut connection)
            .await
            .map_err(map_redis_error)?;
        info!("Flushed Redis database at {}", self.address);
        Ok(())
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("address", &self.address)
            .finish()
    }
}
