use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};

use super::{handlers, playlists, tracks, ws};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Dashboard static files path (configurable via env)
    let dashboard_dir =
        std::env::var("DASHBOARD_DIR").unwrap_or_else(|_| "frontend/dist".to_string());

    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Tracks
        .route("/tracks", post(tracks::create_track))
        .route("/tracks", get(tracks::list_tracks))
        .route("/tracks/{id}", get(tracks::get_track))
        .route("/tracks/{id}", delete(tracks::delete_track))
        .route("/tracks/{id}/retry", post(tracks::retry_track))
        .route("/tracks/{id}/force-fail", post(tracks::force_fail_track))
        // Playlists
        .route("/playlists", post(playlists::create_playlist))
        .route("/playlists", get(playlists::list_playlists))
        .route("/playlists/{id}", get(playlists::get_playlist))
        .route("/playlists/{id}/tracks", get(playlists::get_playlist_tracks))
        .route("/playlists/{id}/stop", post(playlists::stop_playlist))
        // Orchestrator
        .route("/orchestrator/status", get(handlers::orchestrator_status));

    // Serve dashboard with SPA fallback
    let index_path = format!("{}/index.html", dashboard_dir);
    let serve_dir = ServeDir::new(&dashboard_dir).fallback(ServeFile::new(&index_path));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .route("/ws", get(ws::ws_handler))
        .fallback_service(serve_dir)
        .layer(middleware::from_fn(super::middleware::metrics_middleware))
        .with_state(state)
}
