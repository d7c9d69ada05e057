mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, ReadAs};
use shared::config::{Backend, Config};
use std::sync::Arc;
use storage_engine::RedisStore;
use tally::{Cache, KeyValueStore, MemoryStore, Payload, STORE_OPERATION, StoreArgs, replay};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Logs go to stderr so stdout carries only command output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match dotenvy::dotenv() {
        Ok(_) => info!("Loaded environment variables from .env file"),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    let mut config = Config::from_env();
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(url) = cli.redis_url {
        config.redis_url = url;
    }

    let store = connect(&config).await?;
    let cache = Cache::new(store.clone());

    match cli.command {
        Commands::Demo { no_reset } => {
            if config.reset_on_start && !no_reset {
                cache.reset().await?;
            }
            demo(&cache).await?;
        }
        Commands::Store { value, int, float } => {
            let payload = parse_payload(value, int, float)?;
            println!("{}", cache.store(payload).await?);
        }
        Commands::Get { key, read_as } => match read_as {
            ReadAs::Str => print_value(cache.get_str(&key).await?),
            ReadAs::Int => print_value(cache.get_int(&key).await?),
            ReadAs::Raw => print_value(
                cache
                    .get(&key)
                    .await?
                    .map(|raw| format!("{:?}", Payload::Bytes(raw))),
            ),
        },
        Commands::Count { name } => {
            println!("{}", cache.call_count(&name).await?);
        }
        Commands::Replay { name } => {
            replay::<StoreArgs>(store, &name).await?;
        }
        Commands::Reset => cache.reset().await?,
    }

    Ok(())
}

async fn connect(config: &Config) -> Result<Arc<dyn KeyValueStore>> {
    match config.backend {
        Backend::Redis => {
            let store = RedisStore::connect(&config.redis_url)
                .await
                .with_context(|| format!("connecting to {}", config.redis_url))?;
            Ok(Arc::new(store))
        }
        Backend::Memory => {
            info!("Using in-memory store; nothing outlives this process");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

fn parse_payload(value: String, int: bool, float: bool) -> Result<Payload> {
    if int {
        let parsed = value
            .parse::<i64>()
            .with_context(|| format!("'{value}' is not an integer"))?;
        Ok(Payload::Int(parsed))
    } else if float {
        let parsed = value
            .parse::<f64>()
            .with_context(|| format!("'{value}' is not a float"))?;
        Ok(Payload::Float(parsed))
    } else {
        Ok(Payload::Text(value))
    }
}

fn print_value<T: std::fmt::Display>(value: Option<T>) {
    match value {
        Some(value) => println!("{value}"),
        None => println!("(nil)"),
    }
}

/// Walk through store, typed reads, counting and replay
async fn demo(cache: &Cache) -> Result<()> {
    let key = cache.store("I'm a string!").await?;
    println!("String stored with key: {key}");

    let retrieved = cache.get_str(&key).await?;
    println!(
        "Retrieved string: {}",
        retrieved.as_deref().unwrap_or("(nil)")
    );

    cache.store("Another string").await?;
    cache.store("Yet another string").await?;
    println!(
        "store method was called: {} times",
        cache.call_count(STORE_OPERATION).await?
    );

    replay::<StoreArgs>(cache.store_handle(), STORE_OPERATION).await?;
    Ok(())
}
