//! Multiplexer configuration.

use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// How a run drains the child's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// One task waits on readiness of both readers with a bounded timeout.
    Readiness,
    /// One reader task per stream, each reading until EOF.
    ReaderTasks,
}

impl Strategy {
    /// Pick the strategy the current platform supports best.
    ///
    /// Unix pipes are pollable by the reactor; elsewhere pipe reads block a
    /// thread anyway, so each stream gets its own reader task.
    #[must_use]
    pub const fn detect() -> Self {
        if cfg!(unix) {
            Self::Readiness
        } else {
            Self::ReaderTasks
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Readiness => "readiness",
            Self::ReaderTasks => "reader-tasks",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "readiness" => Ok(Self::Readiness),
            "reader-tasks" | "reader_tasks" | "threads" => Ok(Self::ReaderTasks),
            _ => Err(ConfigError::InvalidValue {
                key: ENV_STRATEGY,
                value: s.to_string(),
                reason: "expected `readiness` or `reader-tasks`",
            }),
        }
    }
}

const ENV_STRATEGY: &str = "LINETAP_STRATEGY";
const ENV_POLL_INTERVAL: &str = "LINETAP_POLL_INTERVAL_MS";
const ENV_RUN_TIMEOUT: &str = "LINETAP_RUN_TIMEOUT_MS";

/// Default readiness wait before the process is polled again.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Tuning for a multiplexer run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MuxConfig {
    /// Pinned strategy; `None` means `Strategy::detect()`.
    pub strategy: Option<Strategy>,
    /// Upper bound on one readiness wait.
    pub poll_interval_ms: u64,
    /// Kill the child and fail the run after this long.
    pub run_timeout_ms: Option<u64>,
}

impl Default for MuxConfig {
    fn default() -> Self {
        Self {
            strategy: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            run_timeout_ms: None,
        }
    }
}

impl MuxConfig {
    /// Defaults overridden by `LINETAP_*` environment variables.
    ///
    /// # Errors
    /// Returns error if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a key lookup (environment-style keys).
    ///
    /// # Errors
    /// Returns error if a present value is invalid.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_STRATEGY) {
            self.strategy = match value.trim() {
                "" | "auto" => None,
                other => Some(other.parse()?),
            };
        }
        if let Some(value) = lookup(ENV_POLL_INTERVAL) {
            let ms = parse_millis(ENV_POLL_INTERVAL, &value)?;
            if ms == 0 {
                return Err(ConfigError::InvalidValue {
                    key: ENV_POLL_INTERVAL,
                    value,
                    reason: "must be greater than zero",
                });
            }
            self.poll_interval_ms = ms;
        }
        if let Some(value) = lookup(ENV_RUN_TIMEOUT) {
            self.run_timeout_ms = match value.trim() {
                "" | "none" => None,
                _ => Some(parse_millis(ENV_RUN_TIMEOUT, &value)?),
            };
        }
        Ok(self)
    }

    /// Strategy to use for this run.
    #[must_use]
    pub fn strategy(&self) -> Strategy {
        self.strategy.unwrap_or_else(Strategy::detect)
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        // A zero interval would spin the readiness loop.
        if self.poll_interval_ms == 0 {
            Duration::from_millis(DEFAULT_POLL_INTERVAL_MS)
        } else {
            Duration::from_millis(self.poll_interval_ms)
        }
    }

    #[must_use]
    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_ms.map(Duration::from_millis)
    }
}

fn parse_millis(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason: "expected milliseconds as an unsigned integer",
    })
}
