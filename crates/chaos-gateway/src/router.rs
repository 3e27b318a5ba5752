//! Route table for the gateway.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::operator;
use crate::state::AppState;
use crate::ws;

/// Build the router:
///
/// - `GET /ws` -- participant `WebSocket`
/// - `GET /api/events` -- registered variants
/// - `GET /api/operator/status` -- session snapshot
/// - `POST /api/operator/run/{event_id}` -- start an event
/// - `POST /api/operator/clear-past-events` -- drop ended events
/// - `POST /api/operator/end/{index}` -- end one event
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws::ws_participant))
        .route("/api/events", get(operator::list_events))
        .route("/api/operator/status", get(operator::status))
        .route("/api/operator/run/{event_id}", post(operator::run_event))
        .route("/api/operator/clear-past-events", post(operator::clear_past_events))
        .route("/api/operator/end/{index}", post(operator::end_event))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
