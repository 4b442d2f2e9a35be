//! Spooty server: HTTP API, WebSocket event feed, and Prometheus metrics
//! on top of the core download pipeline.

pub mod api;
pub mod metrics;
pub mod state;
