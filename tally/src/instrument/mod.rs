//! Interceptors composed around an [`Operation`](crate::planes::data::operation::Operation)
//! by explicit delegation.

pub mod count;
pub mod history;

pub use count::CountCalls;
pub use history::{CallHistory, inputs_key, outputs_key};

use crate::planes::data::operation::Operation;
use crate::ports::KeyValueStore;
use std::sync::Arc;

/// Builder-style wrapping for any operation
pub trait Instrument: Operation + Sized {
    /// Count every invocation under the operation's qualified name
    fn counted(self, store: Arc<dyn KeyValueStore>) -> CountCalls<Self> {
        CountCalls::new(self, store)
    }

    /// Record every invocation's arguments and result
    fn recorded(self, store: Arc<dyn KeyValueStore>) -> CallHistory<Self> {
        CallHistory::new(self, store)
    }
}

impl<O: Operation> Instrument for O {}
