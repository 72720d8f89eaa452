use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod actions;
pub mod config;
pub mod error;
pub mod maintenance;
pub mod middleware;
pub mod realtime;
pub mod routes;
pub mod state;

use state::AppState;

/// Builds the full HTTP + WebSocket router over `state`.
pub fn app(state: AppState) -> Router {
    // ToDo: restrict origins once the web client has a fixed host
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .merge(routes::users::routes())
        .merge(routes::matchmaking::routes())
        .merge(routes::challenges::routes())
        .merge(routes::friends::routes())
        .merge(routes::games::routes())
        .merge(routes::websocket::routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
