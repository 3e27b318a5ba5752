//! Session lifecycle: join handshake, leave, and inbound dispatch.
//!
//! A [`Session`] holds at most one [`Orchestrator`]. The first successful
//! handshake creates it and the last departure tears it down. Inbound
//! messages are routed through a handler table keyed by message kind, so
//! the protocol can grow without touching the dispatch path.

use std::collections::BTreeMap;
use std::sync::Arc;

use chaos_events::{EventRegistry, HostEffects};
use chaos_types::{ClientMessage, ClientMessageKind, PROTOCOL_VERSION, ParticipantId, ServerMessage};
use tracing::{debug, info, warn};

use crate::config::ChaosConfig;
use crate::error::SessionError;
use crate::orchestrator::{Orchestrator, TickSummary};
use crate::outbound::Outbound;
use crate::voting::BallotError;

/// The two collaborators every host-side operation may touch.
pub struct HostIo<'a> {
    /// Authoritative game state.
    pub world: &'a mut dyn HostEffects,
    /// Push channel to participants.
    pub out: &'a mut dyn Outbound,
}

type Handler =
    fn(&mut Session, ParticipantId, ClientMessage, &mut HostIo<'_>) -> Result<(), SessionError>;

/// Host-side session state.
pub struct Session {
    registry: Arc<EventRegistry>,
    config: ChaosConfig,
    protocol_version: String,
    orchestrator: Option<Orchestrator>,
    handlers: BTreeMap<ClientMessageKind, Handler>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("protocol_version", &self.protocol_version)
            .field("orchestrator", &self.orchestrator)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create an idle session speaking [`PROTOCOL_VERSION`].
    pub fn new(registry: Arc<EventRegistry>, config: ChaosConfig) -> Self {
        let mut handlers: BTreeMap<ClientMessageKind, Handler> = BTreeMap::new();
        handlers.insert(ClientMessageKind::VersionHandshake, Self::on_version_handshake);
        handlers.insert(ClientMessageKind::Ballot, Self::on_ballot);
        Self {
            registry,
            config,
            protocol_version: PROTOCOL_VERSION.to_owned(),
            orchestrator: None,
            handlers,
        }
    }

    /// Override the version token participants must present.
    #[must_use]
    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = version.into();
        self
    }

    /// The registry this session draws from.
    pub const fn registry(&self) -> &Arc<EventRegistry> {
        &self.registry
    }

    /// The configuration this session was created with.
    pub const fn config(&self) -> &ChaosConfig {
        &self.config
    }

    /// The live orchestrator, if anyone is connected.
    pub const fn orchestrator(&self) -> Option<&Orchestrator> {
        self.orchestrator.as_ref()
    }

    /// Route one inbound message to its handler.
    pub fn handle(
        &mut self,
        from: ParticipantId,
        message: ClientMessage,
        io: &mut HostIo<'_>,
    ) -> Result<(), SessionError> {
        let kind = message.kind();
        let Some(handler) = self.handlers.get(&kind).copied() else {
            debug!(participant = %from, ?kind, "No handler registered, dropping message");
            return Ok(());
        };
        handler(self, from, message, io)
    }

    fn on_version_handshake(
        &mut self,
        from: ParticipantId,
        message: ClientMessage,
        io: &mut HostIo<'_>,
    ) -> Result<(), SessionError> {
        let ClientMessage::VersionHandshake { version } = message else {
            return Ok(());
        };
        if version != self.protocol_version {
            warn!(
                participant = %from,
                client_version = %version,
                server_version = %self.protocol_version,
                "Version mismatch, disconnecting participant"
            );
            io.out.disconnect(
                from,
                &format!(
                    "Client version ({version}) does not match server version ({}).",
                    self.protocol_version
                ),
            );
            return Err(SessionError::VersionMismatch {
                expected: self.protocol_version.clone(),
                received: version,
            });
        }

        if self.orchestrator.is_none() {
            info!(participant = %from, "First participant joined, starting session");
            self.orchestrator = Some(Orchestrator::new(Arc::clone(&self.registry), &self.config));
        }
        let settings = self.config.join_settings();
        let orchestrator = self.orchestrator.as_mut().ok_or(SessionError::NoSession)?;

        if orchestrator.add_participant(from) {
            info!(participant = %from, roster = orchestrator.roster().len(), "Participant joined");
        } else {
            debug!(participant = %from, "Repeated handshake, resyncing");
        }
        io.out.send(from, ServerMessage::JoinConfirm { settings });
        io.out.send(from, ServerMessage::JoinSync { events: orchestrator.replay() });
        if let Some(poll) = orchestrator.live_poll_message() {
            io.out.send(from, poll);
        }
        Ok(())
    }

    fn on_ballot(
        &mut self,
        from: ParticipantId,
        message: ClientMessage,
        _io: &mut HostIo<'_>,
    ) -> Result<(), SessionError> {
        let ClientMessage::Ballot { poll_id, votes } = message else {
            return Ok(());
        };
        let orchestrator = self.orchestrator.as_mut().ok_or(SessionError::NoSession)?;
        match orchestrator.submit_ballot(from, poll_id, &votes) {
            Err(SessionError::Ballot(
                e @ (BallotError::Stale { .. } | BallotError::PollClosed(_)),
            )) => {
                debug!(participant = %from, error = %e, "Dropping late ballot");
                Ok(())
            }
            other => other,
        }
    }

    /// Handle a participant's departure. Tears the orchestrator down when
    /// the roster becomes empty.
    pub fn participant_left(&mut self, participant: ParticipantId, world: &mut dyn HostEffects) {
        let Some(orchestrator) = self.orchestrator.as_mut() else {
            return;
        };
        if !orchestrator.remove_participant(participant, world) {
            debug!(participant = %participant, "Departure of unknown participant ignored");
            return;
        }
        info!(participant = %participant, roster = orchestrator.roster().len(), "Participant left");
        if orchestrator.roster().is_empty() {
            orchestrator.end_chaos(world);
            self.orchestrator = None;
            info!("Last participant left, session closed");
        }
    }

    /// Advance the orchestrator by one tick. `None` when idle.
    pub fn tick(&mut self, io: &mut HostIo<'_>) -> Option<TickSummary> {
        self.orchestrator.as_mut().map(|o| o.tick(io.world, io.out))
    }

    /// Operator: start `event_id` immediately.
    pub fn run_event(&mut self, event_id: &str, io: &mut HostIo<'_>) -> Result<&'static str, SessionError> {
        self.registry.get(event_id)?;
        let orchestrator = self.orchestrator.as_mut().ok_or(SessionError::NoSession)?;
        orchestrator.run_event(event_id, io.world, io.out)
    }

    /// Operator: drop every ended event.
    pub fn clear_past_events(&mut self, out: &mut dyn Outbound) -> Result<usize, SessionError> {
        let orchestrator = self.orchestrator.as_mut().ok_or(SessionError::NoSession)?;
        Ok(orchestrator.clear_past_events(out))
    }

    /// Operator: end the event at `index` early.
    pub fn end_event(&mut self, index: usize, io: &mut HostIo<'_>) -> Result<bool, SessionError> {
        let orchestrator = self.orchestrator.as_mut().ok_or(SessionError::NoSession)?;
        orchestrator.end_event(index, io.world, io.out)
    }

    /// End every event and drop the orchestrator.
    pub fn shutdown(&mut self, world: &mut dyn HostEffects) {
        if let Some(mut orchestrator) = self.orchestrator.take() {
            orchestrator.end_chaos(world);
            info!("Session shut down");
        }
    }
}
