use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Which key-value store backs the cache
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    Redis,
    Memory,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(Backend::Redis),
            "memory" | "mem" => Ok(Backend::Memory),
            other => Err(format!("unknown backend '{other}' (expected 'redis' or 'memory')")),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Redis => f.write_str("redis"),
            Backend::Memory => f.write_str("memory"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub backend: Backend,
    pub redis_url: String,
    pub reset_on_start: bool,
}

impl Config {
    const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/0";

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from any variable source; unparsable values fall back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let backend = match lookup("TALLY_BACKEND") {
            Some(raw) => raw.parse::<Backend>().unwrap_or_else(|e| {
                warn!("TALLY_BACKEND: {}, using redis", e);
                Backend::Redis
            }),
            None => Backend::Redis,
        };

        let reset_on_start = match lookup("TALLY_RESET_ON_START") {
            Some(raw) => parse_flag(&raw).unwrap_or_else(|| {
                warn!("TALLY_RESET_ON_START: '{}' is not a boolean, using true", raw);
                true
            }),
            None => true,
        };

        Self {
            backend,
            redis_url: lookup("TALLY_REDIS_URL")
                .unwrap_or_else(|| Self::DEFAULT_REDIS_URL.to_string()),
            reset_on_start,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
