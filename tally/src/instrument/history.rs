use crate::planes::data::operation::Operation;
use crate::ports::KeyValueStore;
use async_trait::async_trait;
use shared::{Error, Result};
use std::sync::Arc;
use tracing::debug;

/// List key holding the serialized argument tuples of `name`
pub fn inputs_key(name: &str) -> String {
    format!("{name}:inputs")
}

/// List key holding the results of `name`, parallel to [`inputs_key`]
pub fn outputs_key(name: &str) -> String {
    format!("{name}:outputs")
}

/// Appends each call's arguments and result to two parallel history lists
///
/// Arguments go in as JSON before the wrapped call runs, the result's `Display`
/// form after it returns. A failed call leaves its input without a matching output.
pub struct CallHistory<O> {
    inner: O,
    store: Arc<dyn KeyValueStore>,
}

impl<O: Operation> CallHistory<O> {
    pub fn new(inner: O, store: Arc<dyn KeyValueStore>) -> Self {
        Self { inner, store }
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }
}

#[async_trait]
impl<O: Operation> Operation for CallHistory<O> {
    type Input = O::Input;
    type Output = O::Output;

    fn qualified_name(&self) -> &str {
        self.inner.qualified_name()
    }

    async fn call(&self, input: Self::Input) -> Result<Self::Output> {
        let name = self.inner.qualified_name();

        let encoded = serde_json::to_vec(&input)
            .map_err(|e| Error::Serialize(format!("arguments of {}: {}", name, e)))?;
        let position = self.store.rpush(&inputs_key(name), encoded).await?;

        let output = self.inner.call(input).await?;

        self.store
            .rpush(&outputs_key(name), output.to_string().into_bytes())
            .await?;
        debug!("Recorded {} call at position {}", name, position);

        Ok(output)
    }
}

impl<O: Operation> std::fmt::Debug for CallHistory<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallHistory")
            .field("operation", &self.inner.qualified_name())
            .finish()
    }
}
