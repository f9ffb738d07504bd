//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::Cache;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    CleanupResponse, DeleteResponse, ExistsResponse, GetResponse, HealthResponse,
    MessageResponse, SetRequest, SetResponse, StatsResponse,
};

/// Application state shared across all handlers.
///
/// The cache synchronizes internally, so handlers share it through a plain
/// `Arc` without an outer lock.
#[derive(Clone)]
pub struct AppState {
    /// Shared cache instance
    pub cache: Arc<Cache<String, String>>,
}

impl AppState {
    /// Creates a new AppState around an existing cache.
    pub fn new(cache: Cache<String, String>) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Fails when the configured limits are invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache = Cache::new(config.cache_config(), config.security_policy())?;
        Ok(Self::new(cache))
    }
}

/// Handler for PUT /set
///
/// Stores a key-value pair. Values refused by the cache's security gate
/// are dropped silently and show up as `rejections` in `/stats`.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    state.cache.set(req.key.clone(), req.value);

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
///
/// Retrieves a value and refreshes its recency and TTL.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    match state.cache.get(&key) {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /del/:key
///
/// Always succeeds; deleting an absent key is a no-op.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<DeleteResponse> {
    state.cache.delete(&key);
    Json(DeleteResponse::new(key))
}

/// Handler for GET /exists/:key
pub async fn exists_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<ExistsResponse> {
    let exists = state.cache.contains(&key);
    Json(ExistsResponse { key, exists })
}

/// Handler for POST /clear
pub async fn clear_handler(State(state): State<AppState>) -> Json<MessageResponse> {
    state.cache.clear();
    Json(MessageResponse::new("Cache cleared"))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(state.cache.get_stats()))
}

/// Handler for POST /metrics/flush
///
/// Pushes counters to the telemetry sink; a no-op when telemetry is off.
pub async fn flush_metrics_handler(State(state): State<AppState>) -> Json<MessageResponse> {
    state.cache.flush_metrics();
    Json(MessageResponse::new("Metrics flushed"))
}

/// Handler for POST /cleanup
///
/// Forces an expiry sweep regardless of the cleanup interval.
pub async fn cleanup_handler(State(state): State<AppState>) -> Json<CleanupResponse> {
    let removed = state.cache.cleanup_expired();
    Json(CleanupResponse { removed })
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheConfig, SecurityPolicy};

    fn test_state() -> AppState {
        let cache = Cache::new(CacheConfig::with_max_size(100), SecurityPolicy::default()).unwrap();
        AppState::new(cache)
    }

    #[tokio::test]
    async fn test_set_and_get_handler() {
        let state = test_state();

        let req = SetRequest {
            key: "test_key".to_string(),
            value: "test_value".to_string(),
        };
        let result = set_handler(State(state.clone()), Json(req)).await;
        assert!(result.is_ok());

        let result = get_handler(State(state.clone()), Path("test_key".to_string())).await;
        let response = result.unwrap();
        assert_eq!(response.value, "test_value");
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let state = test_state();

        let result = get_handler(State(state), Path("nonexistent".to_string())).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_handler() {
        let state = test_state();

        let req = SetRequest {
            key: "to_delete".to_string(),
            value: "value".to_string(),
        };
        set_handler(State(state.clone()), Json(req)).await.unwrap();

        delete_handler(State(state.clone()), Path("to_delete".to_string())).await;
        // Second delete is a no-op
        delete_handler(State(state.clone()), Path("to_delete".to_string())).await;

        let result = get_handler(State(state), Path("to_delete".to_string())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_exists_and_clear_handlers() {
        let state = test_state();
        state.cache.set("k".to_string(), "v".to_string());

        let response = exists_handler(State(state.clone()), Path("k".to_string())).await;
        assert!(response.exists);

        clear_handler(State(state.clone())).await;

        let response = exists_handler(State(state), Path("k".to_string())).await;
        assert!(!response.exists);
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = test_state();

        let response = stats_handler(State(state)).await;
        assert_eq!(response.stats.cache_hits, 0);
        assert_eq!(response.stats.cache_misses, 0);
    }

    #[tokio::test]
    async fn test_cleanup_handler_without_ttl() {
        let state = test_state();
        state.cache.set("k".to_string(), "v".to_string());

        let response = cleanup_handler(State(state)).await;
        assert_eq!(response.removed, 0);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }

    #[tokio::test]
    async fn test_set_invalid_request() {
        let state = test_state();

        let req = SetRequest {
            key: "".to_string(), // Empty key is invalid
            value: "value".to_string(),
        };
        let result = set_handler(State(state), Json(req)).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[test]
    fn test_from_config_rejects_invalid_limits() {
        let config = Config {
            max_entries: 0,
            ..Config::default()
        };
        assert!(AppState::from_config(&config).is_err());
    }
}
