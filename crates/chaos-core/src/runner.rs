//! The control thread.
//!
//! [`run`] owns the [`Session`] and the host world. It ticks at a fixed
//! cadence and, between ticks, applies whatever arrived on its channels:
//! connection changes and participant messages from the gateway, and
//! operator commands. Nothing else ever touches session state.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use chaos_events::HostEffects;
use chaos_types::{ClientMessage, ParticipantId, ServerMessage};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::operator::OperatorCommand;
use crate::outbound::Outbound;
use crate::session::{HostIo, Session};

/// Traffic from the control thread to one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    /// Deliver a protocol message.
    Message(ServerMessage),
    /// Close the connection with a reason.
    Close(String),
}

/// Traffic from connections to the control thread.
#[derive(Debug)]
pub enum Inbound {
    /// A connection opened. Nothing is sent until it handshakes.
    Connected {
        /// Id assigned by the gateway.
        participant: ParticipantId,
        /// Where to push this participant's traffic.
        link: mpsc::UnboundedSender<Outgoing>,
    },
    /// A decoded message.
    Message {
        /// Sender.
        from: ParticipantId,
        /// Payload.
        message: ClientMessage,
    },
    /// A connection closed, for any reason.
    Disconnected {
        /// Who left.
        participant: ParticipantId,
    },
}

/// [`Outbound`] over per-connection channels.
#[derive(Debug, Default)]
pub struct ChannelOutbound {
    links: BTreeMap<ParticipantId, mpsc::UnboundedSender<Outgoing>>,
}

impl ChannelOutbound {
    /// Create an empty link table.
    pub const fn new() -> Self {
        Self {
            links: BTreeMap::new(),
        }
    }

    /// Register a connection's push channel.
    pub fn connect(&mut self, participant: ParticipantId, link: mpsc::UnboundedSender<Outgoing>) {
        self.links.insert(participant, link);
    }

    /// Forget a connection. Returns `false` if it was unknown.
    pub fn forget(&mut self, participant: ParticipantId) -> bool {
        self.links.remove(&participant).is_some()
    }

    /// Open connections.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether no connection is open.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl Outbound for ChannelOutbound {
    fn send(&mut self, to: ParticipantId, message: ServerMessage) {
        let Some(link) = self.links.get(&to) else {
            debug!(participant = %to, message = message.label(), "No link, dropping push");
            return;
        };
        if link.send(Outgoing::Message(message)).is_err() {
            debug!(participant = %to, "Link closed, dropping push");
        }
    }

    fn disconnect(&mut self, participant: ParticipantId, reason: &str) {
        if let Some(link) = self.links.remove(&participant) {
            if link.send(Outgoing::Close(reason.to_owned())).is_err() {
                debug!(participant = %participant, "Link already closed");
            }
        }
    }
}

/// Receiving ends the control thread listens on.
#[derive(Debug)]
pub struct RunnerChannels {
    /// Connection traffic.
    pub inbound: mpsc::Receiver<Inbound>,
    /// Operator commands.
    pub commands: mpsc::Receiver<OperatorCommand>,
}

/// Totals reported when the loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Ticks delivered.
    pub ticks: u64,
    /// Connections accepted.
    pub connections: u64,
    /// Events started by the scheduler.
    pub events_started: u64,
}

/// Run the control loop until `shutdown` resolves.
///
/// On exit every current event is ended and the session is dropped.
pub async fn run<W, F>(
    mut session: Session,
    mut world: W,
    channels: RunnerChannels,
    tick_interval: Duration,
    shutdown: F,
) -> RunSummary
where
    W: HostEffects + Send,
    F: Future<Output = ()>,
{
    let RunnerChannels {
        mut inbound,
        mut commands,
    } = channels;
    let mut links = ChannelOutbound::new();
    let mut summary = RunSummary::default();

    let mut ticker = tokio::time::interval(tick_interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    info!(interval_ms = tick_interval.as_millis(), "Control loop started");

    loop {
        tokio::select! {
            biased;

            () = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }

            _ = ticker.tick() => {
                let started = {
                    let mut io = HostIo { world: &mut world, out: &mut links };
                    session.tick(&mut io).and_then(|tick| tick.started)
                };
                if started.is_some() {
                    summary.events_started = summary.events_started.saturating_add(1);
                }
                summary.ticks = summary.ticks.saturating_add(1);
                if let Some(millis) = world.take_stall() {
                    debug!(millis, "Stalling host loop");
                    tokio::time::sleep(Duration::from_millis(u64::from(millis))).await;
                }
            }

            Some(event) = inbound.recv() => {
                if matches!(event, Inbound::Connected { .. }) {
                    summary.connections = summary.connections.saturating_add(1);
                }
                apply_inbound(&mut session, &mut world, &mut links, event);
            }

            Some(command) = commands.recv() => {
                command.apply(&mut session, &mut HostIo { world: &mut world, out: &mut links });
            }
        }
    }

    session.shutdown(&mut world);
    info!(
        ticks = summary.ticks,
        connections = summary.connections,
        events_started = summary.events_started,
        "Control loop stopped"
    );
    summary
}

fn apply_inbound(
    session: &mut Session,
    world: &mut dyn HostEffects,
    links: &mut ChannelOutbound,
    event: Inbound,
) {
    match event {
        Inbound::Connected { participant, link } => {
            debug!(participant = %participant, "Connection opened");
            links.connect(participant, link);
        }
        Inbound::Message { from, message } => {
            let mut io = HostIo { world, out: links };
            if let Err(e) = session.handle(from, message, &mut io) {
                warn!(participant = %from, error = %e, "Inbound message rejected");
            }
        }
        Inbound::Disconnected { participant } => {
            links.forget(participant);
            session.participant_left(participant, world);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chaos_events::EventRegistry;
    use chaos_types::{EntitySelector, PROTOCOL_VERSION, StatusEffect};
    use tokio::sync::oneshot;

    use super::*;
    use crate::config::ChaosConfig;

    struct NullWorld;

    impl HostEffects for NullWorld {
        fn apply_status(&mut self, _: EntitySelector, _: StatusEffect, _: u16) {}
        fn clear_status(&mut self, _: EntitySelector, _: StatusEffect) {}
        fn heal(&mut self, _: EntitySelector) {}
        fn request_stall(&mut self, _: u32) {}
    }

    #[test]
    fn push_to_unknown_participant_is_dropped() {
        let mut links = ChannelOutbound::new();
        links.send(ParticipantId::new(), ServerMessage::RemoveEnded);
        assert!(links.is_empty());
    }

    #[test]
    fn disconnect_closes_once() {
        let mut links = ChannelOutbound::new();
        let p = ParticipantId::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        links.connect(p, tx);
        links.disconnect(p, "bye");
        links.disconnect(p, "bye again");
        assert_eq!(rx.try_recv().unwrap(), Outgoing::Close("bye".into()));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn join_status_and_shutdown() {
        let session = Session::new(Arc::new(EventRegistry::builtin().unwrap()), ChaosConfig::default());
        let (inbound_tx, inbound_rx) = mpsc::channel(16);
        let (command_tx, command_rx) = mpsc::channel(16);
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let channels = RunnerChannels {
            inbound: inbound_rx,
            commands: command_rx,
        };
        let handle = tokio::spawn(run(session, NullWorld, channels, Duration::from_millis(5), async {
            let _ = stop_rx.await;
        }));

        let p = ParticipantId::new();
        let (link_tx, mut link_rx) = mpsc::unbounded_channel();
        inbound_tx
            .send(Inbound::Connected { participant: p, link: link_tx })
            .await
            .unwrap();
        inbound_tx
            .send(Inbound::Message {
                from: p,
                message: ClientMessage::VersionHandshake { version: PROTOCOL_VERSION.into() },
            })
            .await
            .unwrap();

        let first = link_rx.recv().await.unwrap();
        assert!(matches!(first, Outgoing::Message(ServerMessage::JoinConfirm { .. })));
        let second = link_rx.recv().await.unwrap();
        assert!(matches!(second, Outgoing::Message(ServerMessage::JoinSync { .. })));

        let (reply, answer) = oneshot::channel();
        command_tx.send(OperatorCommand::Status { reply }).await.unwrap();
        let status = answer.await.unwrap();
        assert!(status.active);
        assert_eq!(status.participants, 1);

        stop_tx.send(()).unwrap();
        let summary = handle.await.unwrap();
        assert_eq!(summary.connections, 1);
    }
}
