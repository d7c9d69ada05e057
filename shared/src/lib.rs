// shared/src/lib.rs

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("wrong type: {0}")]
    WrongType(String),
    #[error("decode: {0}")]
    Decode(String),
    #[error("serialize: {0}")]
    Serialize(String),
    #[error("malformed history for '{name}' at index {index}: {reason}")]
    MalformedHistory {
        name: String,
        index: usize,
        reason: String,
    },
    #[error("internal: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod config;
