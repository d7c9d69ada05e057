//! Instrumented cache facade over an external key-value store.
//!
//! [`Cache::store`] writes a value under a random key while two interceptors
//! count the call and record its arguments and result; [`Replayer`] reads that
//! history back.

pub mod domain;
pub mod instrument;
pub mod persistence;
pub mod planes;
pub mod ports;

pub use domain::{Payload, RecordedCall};
pub use persistence::MemoryStore;
pub use planes::control::{Replay, Replayer, replay};
pub use planes::data::cache_operations::{Cache, STORE_OPERATION, StoreArgs, StoreOperation};
pub use planes::data::operation::Operation;
pub use ports::KeyValueStore;
