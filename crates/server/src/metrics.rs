//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the Spooty server:
//! - HTTP request metrics (latency, counts, errors)
//! - WebSocket connection metrics
//! - Track pipeline metrics
//! - Orchestrator status (collected dynamically)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry, TextEncoder,
};

use spooty_core::{TrackStatus, TrackStore};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "spooty_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("spooty_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "spooty_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// WebSocket Metrics
// =============================================================================

/// Active WebSocket connections.
pub static WS_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "spooty_ws_connections_active",
        "Number of active WebSocket connections",
    )
    .unwrap()
});

/// Total WebSocket connections (cumulative).
pub static WS_CONNECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "spooty_ws_connections_total",
        "Total WebSocket connections since startup",
    )
    .unwrap()
});

/// WebSocket messages sent by type.
pub static WS_MESSAGES_SENT: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("spooty_ws_messages_sent_total", "WebSocket messages sent"),
        &["type"],
    )
    .unwrap()
});

/// WebSocket lag events (when client falls behind).
pub static WS_LAG_EVENTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "spooty_ws_lag_events_total",
        "WebSocket lag events (client fell behind)",
    )
    .unwrap()
});

// =============================================================================
// Track Metrics
// =============================================================================

/// Tracks by current status (collected dynamically).
pub static TRACKS_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("spooty_tracks_by_status", "Current track count by status"),
        &["status"],
    )
    .unwrap()
});

/// Tracks created total.
pub static TRACKS_CREATED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "spooty_tracks_created_total",
        "Total tracks created since startup",
    )
    .unwrap()
});

/// Playlists created total.
pub static PLAYLISTS_CREATED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "spooty_playlists_created_total",
        "Total playlists created since startup",
    )
    .unwrap()
});

// =============================================================================
// Orchestrator Metrics (collected dynamically)
// =============================================================================

/// Orchestrator running state (1 = running, 0 = stopped).
pub static ORCHESTRATOR_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "spooty_orchestrator_running",
        "Whether the orchestrator is running (1) or stopped (0)",
    )
    .unwrap()
});

/// Search jobs waiting in the queue.
pub static SEARCHES_PENDING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "spooty_searches_pending",
        "Number of search jobs waiting in the queue",
    )
    .unwrap()
});

/// Download jobs waiting in the queue.
pub static DOWNLOADS_PENDING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "spooty_downloads_pending",
        "Number of download jobs waiting in the queue",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // WebSocket
    registry
        .register(Box::new(WS_CONNECTIONS_ACTIVE.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_CONNECTIONS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_MESSAGES_SENT.clone()))
        .unwrap();
    registry.register(Box::new(WS_LAG_EVENTS.clone())).unwrap();

    // Tracks
    registry
        .register(Box::new(TRACKS_BY_STATUS.clone()))
        .unwrap();
    registry
        .register(Box::new(TRACKS_CREATED_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(PLAYLISTS_CREATED_TOTAL.clone()))
        .unwrap();

    // Orchestrator
    registry
        .register(Box::new(ORCHESTRATOR_RUNNING.clone()))
        .unwrap();
    registry
        .register(Box::new(SEARCHES_PENDING.clone()))
        .unwrap();
    registry
        .register(Box::new(DOWNLOADS_PENDING.clone()))
        .unwrap();
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding metrics to update gauges with current values
/// from the orchestrator and the track store.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let status = state.orchestrator().status();
    ORCHESTRATOR_RUNNING.set(if status.running { 1 } else { 0 });
    SEARCHES_PENDING.set(status.pending_searches as i64);
    DOWNLOADS_PENDING.set(status.pending_downloads as i64);

    // Update track counts by status
    if let Ok(tracks) = state.store().list() {
        for status in [
            TrackStatus::New,
            TrackStatus::Searching,
            TrackStatus::Queued,
            TrackStatus::Downloading,
            TrackStatus::Completed,
            TrackStatus::Error,
        ] {
            let count = tracks.iter().filter(|t| t.status == status).count();
            TRACKS_BY_STATUS
                .with_label_values(&[status.as_str()])
                .set(count as i64);
        }
    }
}

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    let numeric_regex = regex_lite::Regex::new(r"/\d+(/|$)").unwrap();
    numeric_regex.replace_all(path, "/{id}$1").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_numeric() {
        let path = "/api/v1/tracks/42";
        assert_eq!(normalize_path(path), "/api/v1/tracks/{id}");
    }

    #[test]
    fn test_normalize_path_numeric_middle() {
        let path = "/api/v1/playlists/7/stop";
        assert_eq!(normalize_path(path), "/api/v1/playlists/{id}/stop");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        let path = "/api/v1/health";
        assert_eq!(normalize_path(path), "/api/v1/health");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        // Access metrics to ensure they're initialized
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("spooty_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_all_metrics() {
        // Touch all metrics to ensure they appear in output
        // (Prometheus only outputs metrics that have been accessed)
        HTTP_REQUEST_DURATION
            .with_label_values(&["GET", "/test", "200"])
            .observe(0.1);
        HTTP_REQUESTS_IN_FLIGHT.set(0);
        WS_CONNECTIONS_ACTIVE.set(0);
        WS_CONNECTIONS_TOTAL.inc();
        TRACKS_BY_STATUS.with_label_values(&["new"]).set(0);
        TRACKS_CREATED_TOTAL.inc();
        ORCHESTRATOR_RUNNING.set(0);
        SEARCHES_PENDING.set(0);
        DOWNLOADS_PENDING.set(0);

        let output = encode_metrics();

        // HTTP metrics
        assert!(output.contains("spooty_http_request_duration_seconds"));
        assert!(output.contains("spooty_http_requests_total"));
        assert!(output.contains("spooty_http_requests_in_flight"));

        // WebSocket metrics
        assert!(output.contains("spooty_ws_connections_active"));
        assert!(output.contains("spooty_ws_connections_total"));

        // Track metrics
        assert!(output.contains("spooty_tracks_by_status"));
        assert!(output.contains("spooty_tracks_created_total"));

        // Orchestrator metrics
        assert!(output.contains("spooty_orchestrator_running"));
        assert!(output.contains("spooty_searches_pending"));
        assert!(output.contains("spooty_downloads_pending"));
    }
}
