use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sizing and timing of the enforcer cache.
///
/// Durations are written the human way in configuration files:
///
/// ```yaml
/// maximum_size: 10000
/// expire_after_write: 15m
/// ask_timeout: 5s
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached policies.
    pub maximum_size: u64,
    /// Time after which a slot is evicted regardless of use.
    #[serde(with = "humantime_serde")]
    pub expire_after_write: Duration,
    /// Upper bound a caller waits for an enforcer, and for one loader call.
    #[serde(with = "humantime_serde")]
    pub ask_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            maximum_size: 10_000,
            expire_after_write: Duration::from_secs(15 * 60),
            ask_timeout: Duration::from_secs(5),
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<()> {
        if self.maximum_size == 0 {
            return Err(CacheError::Config("maximum_size must be positive".into()));
        }
        if self.expire_after_write.is_zero() {
            return Err(CacheError::Config(
                "expire_after_write must be positive".into(),
            ));
        }
        if self.ask_timeout.is_zero() {
            return Err(CacheError::Config("ask_timeout must be positive".into()));
        }
        // Stale markers live for expire_after_write; a load must finish first.
        if self.ask_timeout >= self.expire_after_write {
            return Err(CacheError::Config(
                "ask_timeout must be shorter than expire_after_write".into(),
            ));
        }
        Ok(())
    }
}

mod humantime_serde {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(de::Error::custom)
    }
}
