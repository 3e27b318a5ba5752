//! Shared state for the gateway handlers.

use chaos_core::operator::{CatalogueEntry, OperatorCommand};
use chaos_core::runner::Inbound;
use tokio::sync::{mpsc, oneshot};

use crate::error::GatewayError;

/// Handles to the control thread plus the static event catalogue.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Connection traffic into the control thread.
    pub inbound: mpsc::Sender<Inbound>,
    /// Operator commands into the control thread.
    pub commands: mpsc::Sender<OperatorCommand>,
    /// Registered variants, captured at startup.
    pub catalogue: Vec<CatalogueEntry>,
}

impl AppState {
    /// Bundle the control-thread senders.
    pub const fn new(
        inbound: mpsc::Sender<Inbound>,
        commands: mpsc::Sender<OperatorCommand>,
        catalogue: Vec<CatalogueEntry>,
    ) -> Self {
        Self {
            inbound,
            commands,
            catalogue,
        }
    }

    /// Send a command built around a fresh reply channel and wait for the
    /// answer.
    pub async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> OperatorCommand,
    ) -> Result<T, GatewayError> {
        let (reply, answer) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_closed| GatewayError::Unavailable)?;
        answer.await.map_err(|_dropped| GatewayError::Unavailable)
    }
}
