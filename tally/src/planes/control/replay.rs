use crate::domain::RecordedCall;
use crate::instrument::{inputs_key, outputs_key};
use crate::ports::KeyValueStore;
use serde::de::DeserializeOwned;
use shared::{Error, Result};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// The recorded history of one operation, decoded and paired in call order
#[derive(Clone, Debug, PartialEq)]
pub struct Replay<A> {
    pub name: String,
    /// Number of recorded inputs
    pub count: usize,
    pub calls: Vec<RecordedCall<A>>,
}

impl<A: fmt::Debug> fmt::Display for Replay<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} was called {} times:", self.name, self.count)?;
        for call in &self.calls {
            writeln!(f, "{}(*{:?}) -> {}", self.name, call.args, call.output)?;
        }
        Ok(())
    }
}

/// Reads call histories; never writes to or flushes the store
#[derive(Clone)]
pub struct Replayer {
    store: Arc<dyn KeyValueStore>,
}

impl Replayer {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load and decode the history of `name`
    ///
    /// Inputs and outputs are paired by position. If a call failed or a writer
    /// died between the two appends the lists differ in length; pairing stops at
    /// the shorter one while `count` still reports every recorded input.
    pub async fn load<A: DeserializeOwned>(&self, name: &str) -> Result<Replay<A>> {
        let inputs = self.store.lrange(&inputs_key(name), 0, -1).await?;
        let outputs = self.store.lrange(&outputs_key(name), 0, -1).await?;

        if inputs.len() != outputs.len() {
            warn!(
                "History of {} is uneven: {} inputs, {} outputs",
                name,
                inputs.len(),
                outputs.len()
            );
        }

        let calls = inputs
            .iter()
            .zip(outputs.iter())
            .enumerate()
            .map(|(index, (input, output))| {
                let args = serde_json::from_slice::<A>(input).map_err(|e| {
                    Error::MalformedHistory {
                        name: name.to_string(),
                        index,
                        reason: e.to_string(),
                    }
                })?;
                Ok(RecordedCall::new(args, String::from_utf8_lossy(output)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Replay {
            name: name.to_string(),
            count: inputs.len(),
            calls,
        })
    }
}

impl fmt::Debug for Replayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Replayer")
            .field("store", &"<dyn KeyValueStore>")
            .finish()
    }
}

/// Print the history of `name` to stdout and return it
pub async fn replay<A>(store: Arc<dyn KeyValueStore>, name: &str) -> Result<Replay<A>>
where
    A: DeserializeOwned + fmt::Debug,
{
    let replay = Replayer::new(store).load::<A>(name).await?;
    print!("{replay}");
    Ok(replay)
}
