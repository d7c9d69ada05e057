pub mod replay;

pub use replay::{Replay, Replayer, replay};
