//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;

use crate::cache::{
    CacheConfig, SecurityPolicy, DEFAULT_MAX_COLLISION_CHAIN, DEFAULT_MAX_CONTENT_SIZE,
    DEFAULT_MAX_SIZE,
};

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Name reported with flushed metrics
    pub cache_name: String,
    /// Maximum number of entries the cache can hold
    pub max_entries: usize,
    /// Sliding TTL in seconds, None = entries never expire
    pub ttl_seconds: Option<f64>,
    /// Aggregate byte budget, None = unbounded
    pub max_total_bytes: Option<usize>,
    /// Per-entry byte cap
    pub max_value_bytes: usize,
    /// Maximum live keys sharing one hash bucket
    pub max_collision_chain: usize,
    /// Whether `/metrics/flush` emits anything
    pub enable_telemetry: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_NAME` - Cache name for metrics (default: "default")
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `TTL_SECONDS` - Sliding TTL in seconds (default: unset, no expiry)
    /// - `MAX_TOTAL_BYTES` - Aggregate byte budget (default: unset)
    /// - `MAX_VALUE_BYTES` - Per-entry byte cap (default: 10 MiB)
    /// - `MAX_COLLISION_CHAIN` - Keys per hash bucket (default: 8)
    /// - `ENABLE_TELEMETRY` - Emit metrics on flush (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            cache_name: env::var("CACHE_NAME")
                .ok()
                .filter(|name| !name.is_empty())
                .unwrap_or(defaults.cache_name),
            max_entries: parse_var("MAX_ENTRIES").unwrap_or(defaults.max_entries),
            ttl_seconds: parse_var("TTL_SECONDS").or(defaults.ttl_seconds),
            max_total_bytes: parse_var("MAX_TOTAL_BYTES").or(defaults.max_total_bytes),
            max_value_bytes: parse_var("MAX_VALUE_BYTES").unwrap_or(defaults.max_value_bytes),
            max_collision_chain: parse_var("MAX_COLLISION_CHAIN")
                .unwrap_or(defaults.max_collision_chain),
            enable_telemetry: parse_var("ENABLE_TELEMETRY").unwrap_or(defaults.enable_telemetry),
        }
    }

    /// Projects the capacity and expiry settings for the cache.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            name: self.cache_name.clone(),
            max_size: self.max_entries,
            ttl_seconds: self.ttl_seconds,
            enable_telemetry: self.enable_telemetry,
            max_content_size_bytes: self.max_total_bytes,
        }
    }

    /// Projects the security limits for the cache.
    pub fn security_policy(&self) -> SecurityPolicy {
        SecurityPolicy {
            max_content_size: Some(self.max_value_bytes),
            max_collision_chain: Some(self.max_collision_chain),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            cache_name: "default".to_string(),
            max_entries: DEFAULT_MAX_SIZE,
            ttl_seconds: None,
            max_total_bytes: None,
            max_value_bytes: DEFAULT_MAX_CONTENT_SIZE,
            max_collision_chain: DEFAULT_MAX_COLLISION_CHAIN,
            enable_telemetry: false,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
