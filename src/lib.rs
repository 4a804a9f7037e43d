// Public API for integration tests and the server binary

pub mod config;
pub mod hub;
pub mod ws;

use axum::{routing::get, Router};
use std::path::Path;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use hub::Hub;

/// Build the relay router around an explicit hub instance.
///
/// The hub is injected rather than global so tests can run several
/// independent relays in one process.
pub fn app(hub: Arc<Hub>, static_dir: impl AsRef<Path>) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(hub)
}
