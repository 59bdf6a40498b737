//! Axum HTTP API server.
//!
//! This crate provides:
//! - Multipart video upload backed by the local media store
//! - Analyze and chat endpoints for both provider protocols
//! - A shared event broadcast channel over WebSocket
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod ws;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
