//! Integration tests for the gateway REST endpoints.
//!
//! Requests go straight into the `Router` via `tower::ServiceExt`, backed
//! by a real control loop on a background task.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chaos_core::Session;
use chaos_core::config::ChaosConfig;
use chaos_core::operator::catalogue;
use chaos_core::runner::{self, Inbound, Outgoing, RunnerChannels};
use chaos_events::{EventRegistry, HostEffects};
use chaos_gateway::router::build_router;
use chaos_gateway::state::AppState;
use chaos_types::{
    ClientMessage, EntitySelector, PROTOCOL_VERSION, ParticipantId, ServerMessage, StatusEffect,
};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;

struct NullWorld;

impl HostEffects for NullWorld {
    fn apply_status(&mut self, _: EntitySelector, _: StatusEffect, _: u16) {}
    fn clear_status(&mut self, _: EntitySelector, _: StatusEffect) {}
    fn heal(&mut self, _: EntitySelector) {}
    fn request_stall(&mut self, _: u32) {}
}

/// Start a control loop and return the shared state wired to it.
fn spawn_loop(config: ChaosConfig) -> Arc<AppState> {
    let session = Session::new(Arc::new(EventRegistry::builtin().unwrap()), config);
    let entries = catalogue(&session);
    let (inbound_tx, inbound_rx) = mpsc::channel(64);
    let (command_tx, command_rx) = mpsc::channel(64);
    let channels = RunnerChannels {
        inbound: inbound_rx,
        commands: command_rx,
    };
    tokio::spawn(runner::run(
        session,
        NullWorld,
        channels,
        Duration::from_millis(10),
        std::future::pending(),
    ));
    Arc::new(AppState::new(inbound_tx, command_tx, entries))
}

fn quiet_config() -> ChaosConfig {
    let mut config = ChaosConfig::default();
    config.chaos.timer_duration = 60_000;
    config.chaos.seed = Some(3);
    config
}

/// Join one participant through the inbound channel and wait for its
/// confirmation, so the session exists.
async fn join(state: &AppState) -> mpsc::UnboundedReceiver<Outgoing> {
    let participant = ParticipantId::new();
    let (link, mut rx) = mpsc::unbounded_channel();
    state
        .inbound
        .send(Inbound::Connected { participant, link })
        .await
        .unwrap();
    state
        .inbound
        .send(Inbound::Message {
            from: participant,
            message: ClientMessage::VersionHandshake { version: PROTOCOL_VERSION.into() },
        })
        .await
        .unwrap();
    let first = rx.recv().await.unwrap();
    assert!(matches!(first, Outgoing::Message(ServerMessage::JoinConfirm { .. })));
    rx
}

async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn post(uri: &str) -> Request<Body> {
    Request::post(uri).body(Body::empty()).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn catalogue_lists_builtin_variants() {
    let router = build_router(spawn_loop(quiet_config()));
    let (status, json) = call(&router, get("/api/events")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn idle_status_reports_inactive() {
    let router = build_router(spawn_loop(quiet_config()));
    let (status, json) = call(&router, get("/api/operator/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["active"], false);
}

#[tokio::test]
async fn run_without_participants_conflicts() {
    let router = build_router(spawn_loop(quiet_config()));
    let (status, json) = call(&router, post("/api/operator/run/heal_all")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["status"], 409);
}

#[tokio::test]
async fn run_unknown_event_is_not_found() {
    let state = spawn_loop(quiet_config());
    let _link = join(&state).await;
    let router = build_router(state);
    let (status, _) = call(&router, post("/api/operator/run/meteor_shower")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn run_ineligible_event_is_unprocessable() {
    let mut config = quiet_config();
    config.environment.accessibility_mode = true;
    let state = spawn_loop(config);
    let _link = join(&state).await;
    let router = build_router(state);
    let (status, _) = call(&router, post("/api/operator/run/random_camera_tilt")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn run_then_end_then_clear() {
    let state = spawn_loop(quiet_config());
    let mut link = join(&state).await;
    let router = build_router(state);

    let (status, json) = call(&router, post("/api/operator/run/low_gravity")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["event_id"], "low_gravity");

    let (_, json) = call(&router, post("/api/operator/end/0")).await;
    assert_eq!(json["ended"], true);
    let (_, json) = call(&router, post("/api/operator/end/0")).await;
    assert_eq!(json["ended"], false);

    let (status, _) = call(&router, post("/api/operator/end/7")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, json) = call(&router, post("/api/operator/clear-past-events")).await;
    assert_eq!(json["removed"], 1);

    let (_, json) = call(&router, get("/api/operator/status")).await;
    assert_eq!(json["participants"], 1);
    assert_eq!(json["events"].as_array().unwrap().len(), 0);

    // The participant saw the whole sequence.
    let mut labels = Vec::new();
    while let Ok(Outgoing::Message(message)) = link.try_recv() {
        labels.push(message.label());
    }
    assert_eq!(labels, vec!["join_sync", "event_started", "event_ended", "remove_ended"]);
}

#[tokio::test]
async fn stopped_loop_is_unavailable() {
    let (inbound_tx, _) = mpsc::channel(1);
    let (command_tx, _) = mpsc::channel(1);
    let router = build_router(Arc::new(AppState::new(inbound_tx, command_tx, Vec::new())));
    let (status, json) = call(&router, get("/api/operator/status")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["status"], 503);
}
