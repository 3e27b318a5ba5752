//! Operator REST handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/operator/run/{event_id}` | Start an event now |
//! | `POST` | `/api/operator/clear-past-events` | Drop ended events |
//! | `POST` | `/api/operator/end/{index}` | End one current event |
//! | `GET` | `/api/operator/status` | Session snapshot |
//! | `GET` | `/api/events` | Registered variants |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use chaos_core::operator::OperatorCommand;
use tracing::info;

use crate::error::GatewayError;
use crate::state::AppState;

/// Start the named event immediately.
pub async fn run_event(
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let started = state
        .request(|reply| OperatorCommand::Run { event_id, reply })
        .await??;
    info!(event = %started, "Operator started event");
    Ok(Json(serde_json::json!({
        "ok": true,
        "event_id": started,
    })))
}

/// Remove ended events from the current list.
pub async fn clear_past_events(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, GatewayError> {
    let removed = state
        .request(|reply| OperatorCommand::ClearPastEvents { reply })
        .await??;
    Ok(Json(serde_json::json!({
        "ok": true,
        "removed": removed,
    })))
}

/// End the current event at `index`. Ending an already-ended event is
/// accepted and reported with `"ended": false`.
pub async fn end_event(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Result<impl IntoResponse, GatewayError> {
    let ended = state
        .request(|reply| OperatorCommand::End { index, reply })
        .await??;
    Ok(Json(serde_json::json!({
        "ok": true,
        "index": index,
        "ended": ended,
    })))
}

/// Snapshot of the running session.
pub async fn status(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, GatewayError> {
    let status = state
        .request(|reply| OperatorCommand::Status { reply })
        .await?;
    Ok(Json(status))
}

/// Every registered variant and whether it can run here.
pub async fn list_events(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.catalogue.clone())
}
