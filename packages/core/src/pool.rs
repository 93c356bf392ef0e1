//! Worker pool configuration and summary types.

use serde::{Deserialize, Serialize};

/// Environment variable holding the maximum number of concurrent jobs.
pub const ENV_MAX_WORKERS: &str = "JOBDESK_MAX_WORKERS";
/// Environment variable holding the manager tick interval in milliseconds.
pub const ENV_TICK_MS: &str = "JOBDESK_TICK_MS";
/// Environment variable holding the worker-to-manager channel capacity.
pub const ENV_SIGNAL_CAPACITY: &str = "JOBDESK_SIGNAL_CAPACITY";
/// Environment variable holding the subscriber broadcast capacity.
pub const ENV_EVENT_CAPACITY: &str = "JOBDESK_EVENT_CAPACITY";

/// Configuration for the worker pool and its manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of jobs that may execute at the same time.
    pub max_workers: usize,
    /// How often the manager drains signals and publishes a summary.
    pub tick_interval_ms: u64,
    /// Capacity of the bounded channel carrying worker signals.
    pub signal_capacity: usize,
    /// Capacity of the broadcast channel used by subscribers.
    pub event_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            tick_interval_ms: 100,
            signal_capacity: 256,
            event_capacity: 1024,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

impl PoolConfig {
    /// Create a config with the given worker count and defaults elsewhere.
    pub fn with_max_workers(max_workers: usize) -> Self {
        Self {
            max_workers,
            ..Default::default()
        }
    }

    /// Set the tick interval.
    pub fn with_tick_interval_ms(mut self, tick_interval_ms: u64) -> Self {
        self.tick_interval_ms = tick_interval_ms;
        self
    }

    /// Set the signal channel capacity.
    pub fn with_signal_capacity(mut self, signal_capacity: usize) -> Self {
        self.signal_capacity = signal_capacity;
        self
    }

    /// Load the config from `JOBDESK_*` environment variables.
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load the config through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = parse_var(&lookup, ENV_MAX_WORKERS)? {
            config.max_workers = value;
        }
        if let Some(value) = parse_var(&lookup, ENV_TICK_MS)? {
            config.tick_interval_ms = value;
        }
        if let Some(value) = parse_var(&lookup, ENV_SIGNAL_CAPACITY)? {
            config.signal_capacity = value;
        }
        if let Some(value) = parse_var(&lookup, ENV_EVENT_CAPACITY)? {
            config.event_capacity = value;
        }
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pool cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers == 0 {
            return Err(ConfigError::Zero("max_workers"));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Zero("tick_interval_ms"));
        }
        if self.signal_capacity == 0 {
            return Err(ConfigError::Zero("signal_capacity"));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::Zero("event_capacity"));
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
    }
}

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSummary {
    /// Jobs currently executing.
    pub running: usize,
    /// Jobs waiting for a free worker.
    pub waiting: usize,
    /// Maximum number of concurrent jobs.
    pub capacity: usize,
}

impl PoolSummary {
    /// Number of free execution slots.
    pub fn idle(&self) -> usize {
        self.capacity.saturating_sub(self.running)
    }
}

impl std::fmt::Display for PoolSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} running, {} waiting, {} threads",
            self.running, self.waiting, self.capacity
        )
    }
}
