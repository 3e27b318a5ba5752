//! The participant side of the protocol.
//!
//! A [`ClientMirror`] replays host pushes into a local event list and
//! drives each event's presentation half. It ticks and renders on its own
//! clock, so progress may drift slightly from the host between resyncs.

use std::sync::Arc;

use chaos_events::{Event, EventRegistry, PresentationContext, PresentationEffects, RegistryError};
use chaos_types::{ClientMessage, JoinSettings, PROTOCOL_VERSION, ServerMessage, SyncedEvent};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, warn};

/// Failures applying a host push.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// An event push arrived before `JoinConfirm`.
    #[error("received {0} before join confirmation")]
    NotConfirmed(&'static str),

    /// The host named a variant this participant does not know.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// `EventEnded` named a serial the local list does not hold.
    #[error("no local event with serial {0}")]
    NoSuchEvent(u32),

    /// No poll is open to vote in.
    #[error("no poll is open")]
    NoPoll,

    /// A ballot did not match the poll's candidate count.
    #[error("ballot has {received} weights, poll has {expected} candidates")]
    Malformed {
        /// Weights offered.
        received: usize,
        /// Candidates in the poll.
        expected: usize,
    },
}

/// The poll a participant may vote in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientPoll {
    /// Host-assigned id, echoed on the ballot.
    pub poll_id: u32,
    /// Candidate ids, in ballot order.
    pub candidates: Vec<String>,
}

/// Local replica of the host's current event list.
#[derive(Debug)]
pub struct ClientMirror {
    registry: Arc<EventRegistry>,
    settings: Option<JoinSettings>,
    events: Vec<Event>,
    poll: Option<ClientPoll>,
    rng: StdRng,
}

impl ClientMirror {
    /// Create an unjoined mirror.
    pub fn new(registry: Arc<EventRegistry>) -> Self {
        Self::with_rng(registry, StdRng::from_os_rng())
    }

    /// Create an unjoined mirror with reproducible presentation randomness.
    pub fn with_seed(registry: Arc<EventRegistry>, seed: u64) -> Self {
        Self::with_rng(registry, StdRng::seed_from_u64(seed))
    }

    fn with_rng(registry: Arc<EventRegistry>, rng: StdRng) -> Self {
        Self {
            registry,
            settings: None,
            events: Vec::new(),
            poll: None,
            rng,
        }
    }

    /// The first message to send on a new connection.
    pub fn handshake() -> ClientMessage {
        ClientMessage::VersionHandshake {
            version: PROTOCOL_VERSION.to_owned(),
        }
    }

    /// Settings from `JoinConfirm`, once received.
    pub const fn settings(&self) -> Option<JoinSettings> {
        self.settings
    }

    /// Local events, in host order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// The poll most recently announced.
    pub const fn poll(&self) -> Option<&ClientPoll> {
        self.poll.as_ref()
    }

    /// Apply one host push.
    pub fn apply(
        &mut self,
        message: ServerMessage,
        fx: &mut dyn PresentationEffects,
    ) -> Result<(), ClientError> {
        debug!(message = message.label(), "Applying host push");
        match message {
            ServerMessage::JoinConfirm { settings } => {
                self.settings = Some(settings);
                Ok(())
            }
            ServerMessage::JoinSync { events } => self.resync(&events, fx),
            ServerMessage::EventStarted { serial, event_id } => {
                let base = self.base_duration("event_started")?;
                let mut event = self.registry.instantiate(&event_id, base)?.with_serial(serial);
                event.start_client(&mut PresentationContext { fx, rng: &mut self.rng });
                self.events.push(event);
                Ok(())
            }
            ServerMessage::EventEnded { serial } => {
                let event = self
                    .events
                    .iter_mut()
                    .find(|e| e.serial() == serial)
                    .ok_or(ClientError::NoSuchEvent(serial))?;
                event.end_client(&mut PresentationContext { fx, rng: &mut self.rng });
                Ok(())
            }
            ServerMessage::RemoveEnded => {
                self.events.retain(|e| !e.has_ended());
                Ok(())
            }
            ServerMessage::PollOpened { poll_id, candidates } => {
                self.poll = Some(ClientPoll { poll_id, candidates });
                Ok(())
            }
        }
    }

    /// Replace the local list with the host's replay.
    ///
    /// The replay is validated before anything local changes. Live local
    /// events are ended first so their presentation is torn down.
    fn resync(&mut self, replay: &[SyncedEvent], fx: &mut dyn PresentationEffects) -> Result<(), ClientError> {
        let base = self.base_duration("join_sync")?;
        let mut restored = Vec::with_capacity(replay.len());
        for entry in replay {
            let descriptor = self.registry.get(&entry.event_id)?;
            restored.push(Event::restore(
                descriptor.id,
                (descriptor.factory)(),
                descriptor.timing.resolve(base),
                entry.tick_count,
                entry.ended,
            )
            .with_serial(entry.serial));
        }

        let mut cx = PresentationContext { fx, rng: &mut self.rng };
        for event in &mut self.events {
            event.end_client(&mut cx);
        }
        for event in &mut restored {
            if !event.has_ended() {
                event.start_client(&mut cx);
            }
        }
        self.events = restored;
        Ok(())
    }

    fn base_duration(&self, label: &'static str) -> Result<u16, ClientError> {
        self.settings
            .map(|s| s.base_event_duration)
            .ok_or(ClientError::NotConfirmed(label))
    }

    /// Deliver one local tick to every active event. Returns how many
    /// ended on this tick.
    pub fn tick(&mut self, fx: &mut dyn PresentationEffects) -> usize {
        let mut cx = PresentationContext { fx, rng: &mut self.rng };
        let mut ended = 0_usize;
        for event in &mut self.events {
            if event.tick_client(&mut cx) {
                ended = ended.saturating_add(1);
            }
        }
        ended
    }

    /// Draw one frame for every active event.
    pub fn render(&self, fx: &mut dyn PresentationEffects, tick_delta: f32) {
        for event in &self.events {
            event.render(fx, tick_delta);
        }
    }

    /// Build a ballot for the announced poll.
    pub fn ballot(&self, votes: Vec<u32>) -> Result<ClientMessage, ClientError> {
        let poll = self.poll.as_ref().ok_or(ClientError::NoPoll)?;
        if votes.len() != poll.candidates.len() {
            warn!(poll_id = poll.poll_id, "Ballot does not match poll");
            return Err(ClientError::Malformed {
                received: votes.len(),
                expected: poll.candidates.len(),
            });
        }
        Ok(ClientMessage::Ballot {
            poll_id: poll.poll_id,
            votes,
        })
    }

    /// Build a ballot giving one vote to the candidate at `choice`.
    pub fn vote_for(&self, choice: usize) -> Result<ClientMessage, ClientError> {
        let count = self.poll.as_ref().map_or(0, |p| p.candidates.len());
        let votes = (0..count).map(|i| u32::from(i == choice)).collect();
        self.ballot(votes)
    }
}
