use async_trait::async_trait;
use serde::Serialize;
use shared::Result;
use std::fmt::Display;

/// A named operation that interceptors can be composed around
///
/// `Input` is the positional argument tuple of one call; it is what the call
/// history records. `Output` is recorded through its `Display` form.
#[async_trait]
pub trait Operation: Send + Sync + 'static {
    type Input: Serialize + Send + 'static;
    type Output: Display + Send + 'static;

    /// Stable identifier used as the counter key and history key prefix
    fn qualified_name(&self) -> &str;

    async fn call(&self, input: Self::Input) -> Result<Self::Output>;
}
