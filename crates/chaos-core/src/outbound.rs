//! The push side of the participant protocol.
//!
//! Delivery is fire-and-forget: the core never waits for, retries, or
//! observes the fate of a push. Staleness is handled by poll ids and full
//! resyncs, not by retransmission.

use std::collections::BTreeSet;

use chaos_types::{ParticipantId, ServerMessage};

/// Sink for host-to-participant traffic.
pub trait Outbound {
    /// Queue `message` for one participant.
    fn send(&mut self, to: ParticipantId, message: ServerMessage);

    /// Close a participant's connection with a human-readable reason.
    fn disconnect(&mut self, participant: ParticipantId, reason: &str);
}

/// Send `message` to every participant in `roster`.
pub fn broadcast(out: &mut dyn Outbound, roster: &BTreeSet<ParticipantId>, message: &ServerMessage) {
    for &participant in roster {
        out.send(participant, message.clone());
    }
}

/// An [`Outbound`] that drops everything. Useful for shutdown paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl Outbound for Discard {
    fn send(&mut self, _to: ParticipantId, _message: ServerMessage) {}

    fn disconnect(&mut self, _participant: ParticipantId, _reason: &str) {}
}
