use crate::planes::data::operation::Operation;
use crate::ports::KeyValueStore;
use async_trait::async_trait;
use shared::Result;
use std::sync::Arc;
use tracing::debug;

/// Increments a persistent counter named after the wrapped operation before every call
///
/// The increment is not undone when the wrapped operation fails.
pub struct CountCalls<O> {
    inner: O,
    store: Arc<dyn KeyValueStore>,
}

impl<O: Operation> CountCalls<O> {
    pub fn new(inner: O, store: Arc<dyn KeyValueStore>) -> Self {
        Self { inner, store }
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }
}

#[async_trait]
impl<O: Operation> Operation for CountCalls<O> {
    type Input = O::Input;
    type Output = O::Output;

    fn qualified_name(&self) -> &str {
        self.inner.qualified_name()
    }

    async fn call(&self, input: Self::Input) -> Result<Self::Output> {
        let name = self.inner.qualified_name();
        let count = self.store.incr(name).await?;
        debug!("{} call #{}", name, count);

        self.inner.call(input).await
    }
}

impl<O: Operation> std::fmt::Debug for CountCalls<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountCalls")
            .field("operation", &self.inner.qualified_name())
            .finish()
    }
}
