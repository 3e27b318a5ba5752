//! Host binary for the Chaos session orchestrator.
//!
//! Wires the control loop to the network gateway and runs both until
//! Ctrl-C.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `chaos-config.yaml`, writing defaults if
//!    absent, under a bootstrap subscriber
//! 2. Initialize structured logging (tracing) at the configured level
//! 3. Register the built-in event catalogue
//! 4. Start the gateway (participant `WebSocket` + operator REST)
//! 5. Run the control loop
//! 6. On Ctrl-C, end every event and stop both

mod error;
mod world;

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chaos_core::config::{ChaosConfig, LoggingConfig};
use chaos_core::operator::catalogue;
use chaos_core::runner::{self, RunnerChannels};
use chaos_core::Session;
use chaos_events::EventRegistry;
use chaos_gateway::server::start_server;
use chaos_gateway::state::AppState;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::ServerError;
use crate::world::TracingWorld;

/// Configuration file, relative to the working directory.
const CONFIG_PATH: &str = "chaos-config.yaml";

/// Bound on queued connection traffic before the gateway waits.
const INBOUND_CAPACITY: usize = 1024;

/// Bound on queued operator commands.
const COMMAND_CAPACITY: usize = 64;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if the catalogue fails to register, the gateway cannot
/// bind, or a background task panics.
#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let config_path = Path::new(CONFIG_PATH);

    // 1. Configuration. Load warnings go to a bootstrap subscriber at the
    //    default level, since the configured level is not known yet.
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(env_filter(&LoggingConfig::default().level))
        .with_target(true)
        .finish();
    let config = tracing::subscriber::with_default(bootstrap, || {
        ChaosConfig::load_or_default(config_path)
    });

    // 2. Logging. RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(&config.logging.level))
        .with_target(true)
        .init();

    info!(version = chaos_types::PROTOCOL_VERSION, "chaos-server starting");
    info!(
        timer_duration = config.chaos.timer_duration,
        base_event_duration = config.chaos.base_event_duration,
        voting = config.voting.enabled,
        deployment = ?config.environment.deployment,
        tick_interval_ms = config.server.tick_interval_ms,
        "Configuration loaded"
    );

    // 3. Catalogue.
    let registry = Arc::new(EventRegistry::builtin()?);
    info!(variants = registry.len(), "Event registry ready");

    let session = Session::new(Arc::clone(&registry), config.clone());
    let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
    let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
    let state = Arc::new(AppState::new(inbound_tx, command_tx, catalogue(&session)));
    let (stop_tx, stop_rx) = watch::channel(false);

    // 4. Gateway.
    let server_config = config.server.clone();
    let gateway_stop = stopped(stop_rx.clone());
    let mut gateway =
        tokio::spawn(async move { start_server(&server_config, state, gateway_stop).await });

    // 5. Control loop.
    let control = tokio::spawn(runner::run(
        session,
        TracingWorld::default(),
        RunnerChannels {
            inbound: inbound_rx,
            commands: command_rx,
        },
        Duration::from_millis(config.server.tick_interval_ms),
        stopped(stop_rx),
    ));

    // 6. Wait for Ctrl-C, or for the gateway to give up on its own.
    let served = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "Could not listen for Ctrl-C, shutting down");
            }
            info!("Shutdown requested");
            None
        }
        served = &mut gateway => Some(served),
    };
    if stop_tx.send(true).is_err() {
        debug!("Nothing left to stop");
    }
    let served = match served {
        Some(result) => result,
        None => gateway.await,
    };

    let summary = control.await?;
    served??;

    info!(
        ticks = summary.ticks,
        connections = summary.connections,
        events_started = summary.events_started,
        "chaos-server shutdown complete"
    );
    Ok(())
}

/// Resolve once `stop` flips to `true` or its sender is dropped.
fn stopped(mut stop: watch::Receiver<bool>) -> impl Future<Output = ()> + Send + 'static {
    async move {
        if stop.wait_for(|stop| *stop).await.is_err() {
            debug!("Stop sender dropped");
        }
    }
}

/// `RUST_LOG` if set, otherwise `level`.
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}
