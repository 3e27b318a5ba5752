//! Messages exchanged between the host and its participants.
//!
//! The core is transport-agnostic: it assumes reliable, ordered delivery per
//! participant and nothing else. The gateway encodes these as JSON text
//! frames with an internal `type` tag.
//!
//! | Message | Direction | Purpose |
//! |---|---|---|
//! | [`ClientMessage::VersionHandshake`] | participant -> host | gate the join |
//! | [`ServerMessage::JoinConfirm`] | host -> participant | initial config push |
//! | [`ServerMessage::JoinSync`] | host -> participant | replay current events |
//! | [`ServerMessage::EventStarted`] | host -> all | a new event went live |
//! | [`ServerMessage::EventEnded`] | host -> all | an event was forced to end |
//! | [`ServerMessage::PollOpened`] | host -> all | a new vote is open |
//! | [`ServerMessage::RemoveEnded`] | host -> all | purge ended events |
//! | [`ClientMessage::Ballot`] | participant -> host | vote submission |

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Protocol version token exchanged in the join handshake.
///
/// Host and participant must agree on this string exactly.
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Host configuration pushed to a participant on join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct JoinSettings {
    /// Base ticks between event selections.
    pub timer_duration: u16,
    /// Default length of a timed event, in ticks.
    pub base_event_duration: u16,
    /// Whether participants choose the next event by vote.
    pub voting_enabled: bool,
}

/// One entry of a [`ServerMessage::JoinSync`] replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SyncedEvent {
    /// Host-assigned serial, unique within the session.
    pub serial: u32,
    /// Registry id of the event variant.
    pub event_id: String,
    /// Whether the event has already ended on the host.
    pub ended: bool,
    /// Ticks the event has run so far.
    pub tick_count: u16,
}

/// Messages sent by a participant to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// First message on every connection.
    VersionHandshake {
        /// The participant's [`PROTOCOL_VERSION`].
        version: String,
    },
    /// Vote weights for the live poll.
    Ballot {
        /// Poll the ballot was cast for.
        poll_id: u32,
        /// Vote weight per candidate index, in candidate order.
        votes: Vec<u32>,
    },
}

/// Discriminant of [`ClientMessage`], used to key the host's handler table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClientMessageKind {
    /// [`ClientMessage::VersionHandshake`].
    VersionHandshake,
    /// [`ClientMessage::Ballot`].
    Ballot,
}

impl ClientMessage {
    /// Return the discriminant of this message.
    pub const fn kind(&self) -> ClientMessageKind {
        match self {
            Self::VersionHandshake { .. } => ClientMessageKind::VersionHandshake,
            Self::Ballot { .. } => ClientMessageKind::Ballot,
        }
    }
}

/// Messages sent by the host to one or all participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Handshake accepted; carries the host configuration.
    JoinConfirm {
        /// Host timer and voting configuration.
        settings: JoinSettings,
    },
    /// Full replay of the host's current events, in activation order.
    JoinSync {
        /// One entry per current event.
        events: Vec<SyncedEvent>,
    },
    /// A new event was selected and started.
    EventStarted {
        /// Host-assigned serial of the new event.
        serial: u32,
        /// Registry id of the started event.
        event_id: String,
    },
    /// The event with `serial` was forced to end.
    ///
    /// Events are named by serial rather than list position: a
    /// participant's list may still hold an event the host has already
    /// purged.
    EventEnded {
        /// Serial from the event's `EventStarted` or `JoinSync` entry.
        serial: u32,
    },
    /// A new poll is open.
    PollOpened {
        /// Monotonic poll identifier.
        poll_id: u32,
        /// Candidate event ids, in ballot index order.
        candidates: Vec<String>,
    },
    /// Drop every ended event from the local list.
    RemoveEnded,
}

impl ServerMessage {
    /// Short label for logging.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::JoinConfirm { .. } => "join_confirm",
            Self::JoinSync { .. } => "join_sync",
            Self::EventStarted { .. } => "event_started",
            Self::EventEnded { .. } => "event_ended",
            Self::PollOpened { .. } => "poll_opened",
            Self::RemoveEnded => "remove_ended",
        }
    }
}
