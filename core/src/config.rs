use std::num::NonZeroUsize;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const MAX_WORKERS: usize = 1024;
pub const MAX_DISTANCE: i64 = 1_000_000;

/// Engine settings. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Worker pool size for `parallel_khop`. 0 = hardware parallelism.
    pub workers: usize,
    /// Hop bound used when a caller omits `distance`.
    pub default_distance: i64,
    /// Per-call wall-clock limit, checked between hops.
    pub timeout_ms: Option<u64>,
    pub thread_name_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            default_distance: 1,
            timeout_ms: None,
            thread_name_prefix: "hop-count-worker".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidParameter {
                name: "workers",
                message: format!("must be at most {}, got {}", MAX_WORKERS, self.workers),
            });
        }
        if !(1..=MAX_DISTANCE).contains(&self.default_distance) {
            return Err(ConfigError::InvalidParameter {
                name: "default_distance",
                message: format!(
                    "must be between 1 and {}, got {}",
                    MAX_DISTANCE, self.default_distance
                ),
            });
        }
        if self.timeout_ms == Some(0) {
            return Err(ConfigError::InvalidParameter {
                name: "timeout_ms",
                message: "must be positive when set".to_string(),
            });
        }
        if self.thread_name_prefix.is_empty() {
            return Err(ConfigError::InvalidParameter {
                name: "thread_name_prefix",
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Worker count with 0 resolved to the hardware parallelism.
    pub fn resolved_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}
