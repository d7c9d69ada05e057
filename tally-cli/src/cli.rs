use clap::{Parser, Subcommand, ValueEnum};
use shared::config::Backend;
use tally::STORE_OPERATION;

#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(about = "Instrumented cache over Redis: store values, count calls, replay history", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Store backend (overrides TALLY_BACKEND)
    #[arg(long, global = true)]
    pub backend: Option<Backend>,

    /// Redis connection URL (overrides TALLY_REDIS_URL)
    #[arg(long, global = true)]
    pub redis_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Store a sample string, read it back, store two more and replay the history
    Demo {
        /// Keep existing keys instead of flushing the store first
        #[arg(long)]
        no_reset: bool,
    },
    /// Store a value under a new random key and print the key
    Store {
        value: String,
        /// Store the value as an integer
        #[arg(long, conflicts_with = "float")]
        int: bool,
        /// Store the value as a float
        #[arg(long)]
        float: bool,
    },
    /// Read the value stored under a key
    Get {
        key: String,
        #[arg(long = "as", value_enum, default_value_t = ReadAs::Str)]
        read_as: ReadAs,
    },
    /// Print how many times an operation was called
    Count {
        #[arg(default_value = STORE_OPERATION)]
        name: String,
    },
    /// Print the recorded call history of an operation
    Replay {
        #[arg(default_value = STORE_OPERATION)]
        name: String,
    },
    /// Remove every key from the store
    Reset,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadAs {
    Str,
    Int,
    Raw,
}
