//! ScoreApp Lead Analytics Library
//!
//! Ingests lead submissions from the ScoreApp form tool, normalizes the different
//! payload dialects into one [`models::Lead`] shape, keeps them in a file-backed
//! store and serves aggregated funnel statistics per scorecard.
//!
//! # Modules
//!
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers and shared state.
//! - `import`: Bulk import with same-day deduplication.
//! - `models`: Lead, stats and request/response models.
//! - `normalizer`: Alias-priority field resolution for raw payloads.
//! - `routes`: Router assembly and middleware.
//! - `stats`: Windowed aggregation (rates, distributions, daily series).
//! - `store`: Lead store and its persistence backends.
//! - `webhook_handler`: ScoreApp webhook handler and shared-secret check.
//! - `webhook_models`: Permissive webhook body extractor.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod import;
pub mod models;
pub mod normalizer;
pub mod routes;
pub mod stats;
pub mod store;
pub mod webhook_handler;
pub mod webhook_models;
