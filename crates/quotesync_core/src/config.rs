//! Runtime configuration with environment overrides.
//!
//! # Responsibility
//! - Provide defaults for storage, logging, sync cadence and the simulated
//!   remote.
//! - Apply `QUOTESYNC_*` environment overrides; invalid values are ignored
//!   with a warning.
//!
//! # Invariants
//! - Probabilities are clamped to `[0, 1]`.
//! - Intervals are at least one second.
//! - Latency ranges satisfy `min <= max`.

use log::warn;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Environment variable names.
pub mod env_vars {
    pub const DB_PATH: &str = "QUOTESYNC_DB_PATH";
    pub const LOG_LEVEL: &str = "QUOTESYNC_LOG_LEVEL";
    pub const LOG_DIR: &str = "QUOTESYNC_LOG_DIR";
    pub const SYNC_INTERVAL_SECS: &str = "QUOTESYNC_SYNC_INTERVAL_SECS";
    pub const MUTATION_INTERVAL_SECS: &str = "QUOTESYNC_MUTATION_INTERVAL_SECS";
    pub const MUTATION_PROBABILITY: &str = "QUOTESYNC_MUTATION_PROBABILITY";
    pub const FAILURE_PROBABILITY: &str = "QUOTESYNC_FAILURE_PROBABILITY";
    pub const SEED: &str = "QUOTESYNC_SEED";
}

/// Default values.
pub mod defaults {
    pub const DB_FILE_NAME: &str = "quotesync.sqlite3";
    pub const SYNC_INTERVAL_SECS: u64 = 20;
    pub const MUTATION_INTERVAL_SECS: u64 = 30;
    pub const MUTATION_PROBABILITY: f64 = 0.2;
    pub const FETCH_LATENCY_MS: (u64, u64) = (300, 700);
    pub const PUSH_LATENCY_MS: (u64, u64) = (200, 500);
}

/// Simulated remote behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub fetch_latency: (Duration, Duration),
    pub push_latency: (Duration, Duration),
    /// Chance that one `mutate_once` call changes the server collection.
    pub mutation_probability: f64,
    /// Chance that a fetch or push fails.
    pub failure_probability: f64,
    pub mutation_interval: Duration,
    /// Fixed RNG seed; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let (fetch_min, fetch_max) = defaults::FETCH_LATENCY_MS;
        let (push_min, push_max) = defaults::PUSH_LATENCY_MS;
        Self {
            fetch_latency: (
                Duration::from_millis(fetch_min),
                Duration::from_millis(fetch_max),
            ),
            push_latency: (
                Duration::from_millis(push_min),
                Duration::from_millis(push_max),
            ),
            mutation_probability: defaults::MUTATION_PROBABILITY,
            failure_probability: 0.0,
            mutation_interval: Duration::from_secs(defaults::MUTATION_INTERVAL_SECS),
            seed: None,
        }
    }
}

impl ServerConfig {
    /// Zero-latency, failure-free, seeded configuration for tests and demos.
    pub fn instant(seed: u64) -> Self {
        Self {
            fetch_latency: (Duration::ZERO, Duration::ZERO),
            push_latency: (Duration::ZERO, Duration::ZERO),
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// Returns a copy with every invariant enforced.
    pub fn normalized(mut self) -> Self {
        self.mutation_probability = clamp_probability(self.mutation_probability);
        self.failure_probability = clamp_probability(self.failure_probability);
        self.mutation_interval = at_least_one_second(self.mutation_interval);
        self.fetch_latency = ordered(self.fetch_latency);
        self.push_latency = ordered(self.push_latency);
        self
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// SQLite file backing the durable namespace.
    pub db_path: PathBuf,
    pub log_level: String,
    /// File logging is enabled only when set.
    pub log_dir: Option<PathBuf>,
    pub sync_interval: Duration,
    pub server: ServerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(defaults::DB_FILE_NAME),
            log_level: crate::logging::default_log_level().to_string(),
            log_dir: None,
            sync_interval: Duration::from_secs(defaults::SYNC_INTERVAL_SECS),
            server: ServerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Defaults overridden by `QUOTESYNC_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let read = |name: &str| {
            lookup(name)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        if let Some(path) = read(env_vars::DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(level) = read(env_vars::LOG_LEVEL) {
            config.log_level = level;
        }
        if let Some(dir) = read(env_vars::LOG_DIR) {
            config.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(secs) = parse_var::<u64>(
            env_vars::SYNC_INTERVAL_SECS,
            read(env_vars::SYNC_INTERVAL_SECS),
        ) {
            config.sync_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(
            env_vars::MUTATION_INTERVAL_SECS,
            read(env_vars::MUTATION_INTERVAL_SECS),
        ) {
            config.server.mutation_interval = Duration::from_secs(secs);
        }
        if let Some(p) = parse_var::<f64>(
            env_vars::MUTATION_PROBABILITY,
            read(env_vars::MUTATION_PROBABILITY),
        ) {
            config.server.mutation_probability = p;
        }
        if let Some(p) = parse_var::<f64>(
            env_vars::FAILURE_PROBABILITY,
            read(env_vars::FAILURE_PROBABILITY),
        ) {
            config.server.failure_probability = p;
        }
        if let Some(seed) = parse_var::<u64>(env_vars::SEED, read(env_vars::SEED)) {
            config.server.seed = Some(seed);
        }

        config.normalized()
    }

    /// Returns a copy with every invariant enforced.
    pub fn normalized(mut self) -> Self {
        self.sync_interval = at_least_one_second(self.sync_interval);
        self.server = self.server.normalized();
        self
    }
}

fn parse_var<T: FromStr>(name: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("event=config_load module=config status=ignored var={name} value={raw}");
            None
        }
    }
}

fn clamp_probability(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn at_least_one_second(value: Duration) -> Duration {
    value.max(Duration::from_secs(1))
}

fn ordered((min, max): (Duration, Duration)) -> (Duration, Duration) {
    if min <= max {
        (min, max)
    } else {
        (max, min)
    }
}
