use serde::{Deserialize, Serialize};
use std::fmt;

/// A scalar value handed to `Cache::store`
///
/// Serialized with an explicit tag so recorded call arguments decode back into
/// the same variant they were stored as.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Payload {
    Text(String),
    Bytes(Vec<u8>),
    Int(i64),
    Float(f64),
}

impl Payload {
    /// Byte form written to the store: UTF-8 text, raw bytes, or a decimal literal
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Payload::Text(text) => text.as_bytes().to_vec(),
            Payload::Bytes(bytes) => bytes.clone(),
            Payload::Int(value) => value.to_string().into_bytes(),
            Payload::Float(value) => format!("{value:?}").into_bytes(),
        }
    }
}

// Renders as a literal so a replayed argument tuple reads like the call itself
impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Text(text) => write!(f, "{text:?}"),
            Payload::Bytes(bytes) => write!(f, "b\"{}\"", bytes.escape_ascii()),
            Payload::Int(value) => write!(f, "{value}"),
            Payload::Float(value) => write!(f, "{value:?}"),
        }
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Payload::Text(value.to_string())
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::Text(value)
    }
}

impl From<&[u8]> for Payload {
    fn from(value: &[u8]) -> Self {
        Payload::Bytes(value.to_vec())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Payload::Bytes(value)
    }
}

impl From<i64> for Payload {
    fn from(value: i64) -> Self {
        Payload::Int(value)
    }
}

impl From<i32> for Payload {
    fn from(value: i32) -> Self {
        Payload::Int(value.into())
    }
}

impl From<f64> for Payload {
    fn from(value: f64) -> Self {
        Payload::Float(value)
    }
}

/// One replayed invocation: the decoded argument tuple and the recorded result
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedCall<A> {
    pub args: A,
    pub output: String,
}

impl<A> RecordedCall<A> {
    pub fn new(args: A, output: impl Into<String>) -> Self {
        Self {
            args,
            output: output.into(),
        }
    }
}
