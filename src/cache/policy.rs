//! Cache Policy Module
//!
//! Capacity, TTL and security limits supplied at construction time.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

/// Default maximum number of entries
pub const DEFAULT_MAX_SIZE: usize = 1000;

/// Default per-entry byte cap (10 MiB)
pub const DEFAULT_MAX_CONTENT_SIZE: usize = 10 * 1024 * 1024;

/// Default number of live entries allowed to share a hash bucket
pub const DEFAULT_MAX_COLLISION_CHAIN: usize = 8;

// == Cache Config ==
/// Capacity and expiry settings for a cache instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Name reported to the telemetry sink
    pub name: String,
    /// Maximum number of live entries
    pub max_size: usize,
    /// Sliding TTL in seconds; `None` or `0.0` disables expiry
    pub ttl_seconds: Option<f64>,
    /// Whether `flush_metrics` forwards to the sink
    pub enable_telemetry: bool,
    /// Aggregate byte budget across all entries
    pub max_content_size_bytes: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            max_size: DEFAULT_MAX_SIZE,
            ttl_seconds: None,
            enable_telemetry: false,
            max_content_size_bytes: None,
        }
    }
}

impl CacheConfig {
    /// Creates a config with the given entry cap and defaults elsewhere.
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            max_size,
            ..Self::default()
        }
    }

    /// Sets the sliding TTL in seconds.
    pub fn ttl_seconds(mut self, ttl: f64) -> Self {
        self.ttl_seconds = Some(ttl);
        self
    }

    /// Sets the aggregate byte budget.
    pub fn max_content_size_bytes(mut self, bytes: usize) -> Self {
        self.max_content_size_bytes = Some(bytes);
        self
    }

    /// Enables forwarding of `flush_metrics` to the sink.
    pub fn enable_telemetry(mut self, enabled: bool) -> Self {
        self.enable_telemetry = enabled;
        self
    }

    /// Returns the TTL as a `Duration`, or None when expiry is disabled.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_seconds
            .filter(|secs| *secs > 0.0)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(CacheError::InvalidConfig(
                "cache name cannot be empty".to_string(),
            ));
        }
        if self.max_size == 0 {
            return Err(CacheError::InvalidConfig(
                "max_size must be a positive integer".to_string(),
            ));
        }
        if let Some(ttl) = self.ttl_seconds {
            if !ttl.is_finite() || ttl < 0.0 {
                return Err(CacheError::InvalidConfig(format!(
                    "ttl_seconds must be a finite, non-negative number (got {})",
                    ttl
                )));
            }
            if Duration::try_from_secs_f64(ttl).is_err() {
                return Err(CacheError::InvalidConfig(format!(
                    "ttl_seconds is out of range (got {})",
                    ttl
                )));
            }
        }
        if self.max_content_size_bytes == Some(0) {
            return Err(CacheError::InvalidConfig(
                "max_content_size_bytes must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}

// == Security Policy ==
/// Denial-of-service limits consulted before an insert commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityPolicy {
    /// Per-entry byte cap
    pub max_content_size: Option<usize>,
    /// Maximum live entries sharing one hash bucket
    pub max_collision_chain: Option<usize>,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            max_content_size: Some(DEFAULT_MAX_CONTENT_SIZE),
            max_collision_chain: Some(DEFAULT_MAX_COLLISION_CHAIN),
        }
    }
}

impl SecurityPolicy {
    /// A policy with no per-entry or collision limits.
    pub fn permissive() -> Self {
        Self {
            max_content_size: None,
            max_collision_chain: None,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.max_content_size == Some(0) {
            return Err(CacheError::InvalidConfig(
                "max_content_size must be positive when set".to_string(),
            ));
        }
        if self.max_collision_chain == Some(0) {
            return Err(CacheError::InvalidConfig(
                "max_collision_chain must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}

// == Validation ==
/// Validates both halves of the construction input together.
///
/// A per-entry cap larger than the aggregate budget is an inverted bound.
pub fn validate(config: &CacheConfig, policy: &SecurityPolicy) -> Result<()> {
    config.validate()?;
    policy.validate()?;

    if let (Some(per_entry), Some(total)) =
        (policy.max_content_size, config.max_content_size_bytes)
    {
        if per_entry > total {
            return Err(CacheError::InvalidConfig(format!(
                "max_content_size ({}) exceeds max_content_size_bytes ({})",
                per_entry, total
            )));
        }
    }
    Ok(())
}
