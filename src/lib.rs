//! Guarded Cache - A bounded, TTL-aware LRU cache
//!
//! Enforces an entry cap and an optional byte budget, expires entries on a
//! sliding TTL swept through a lazily-invalidated min-heap, and rejects
//! oversized values and hash-collision floods. An optional HTTP front-end
//! lives in [`api`].

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;

pub use api::AppState;
pub use cache::{Cache, CacheBuilder, CacheConfig, CacheStats, MetricsSink, SecurityPolicy};
pub use config::Config;
pub use error::{CacheError, Result};
