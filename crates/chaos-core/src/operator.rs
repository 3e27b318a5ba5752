//! Operator commands and the read-only views they return.
//!
//! Commands arrive from outside the control thread (the REST gateway) and
//! carry a oneshot reply channel. The runner applies them between ticks so
//! they never race the scheduler.

use chaos_types::{Category, EventState, SessionId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::SessionError;
use crate::session::{HostIo, Session};

/// A request from the operator surface.
#[derive(Debug)]
pub enum OperatorCommand {
    /// Start an event by id.
    Run {
        /// Registry id.
        event_id: String,
        /// Receives the started id.
        reply: oneshot::Sender<Result<String, SessionError>>,
    },
    /// Drop ended events.
    ClearPastEvents {
        /// Receives how many were removed.
        reply: oneshot::Sender<Result<usize, SessionError>>,
    },
    /// End one current event early.
    End {
        /// Position in the current event list.
        index: usize,
        /// Receives whether the event was ended by this call.
        reply: oneshot::Sender<Result<bool, SessionError>>,
    },
    /// Snapshot the session.
    Status {
        /// Receives the snapshot.
        reply: oneshot::Sender<SessionStatus>,
    },
}

impl OperatorCommand {
    /// Apply the command and answer on its reply channel.
    ///
    /// A dropped receiver is not an error; the command still takes effect.
    pub fn apply(self, session: &mut Session, io: &mut HostIo<'_>) {
        let delivered = match self {
            Self::Run { event_id, reply } => {
                let result = session.run_event(&event_id, io).map(str::to_owned);
                reply.send(result).is_ok()
            }
            Self::ClearPastEvents { reply } => reply.send(session.clear_past_events(io.out)).is_ok(),
            Self::End { index, reply } => reply.send(session.end_event(index, io)).is_ok(),
            Self::Status { reply } => reply.send(SessionStatus::capture(session)).is_ok(),
        };
        if !delivered {
            debug!("Operator went away before the reply");
        }
    }
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    /// Whether an orchestrator exists.
    pub active: bool,
    /// Session id, when active.
    pub session_id: Option<SessionId>,
    /// When the session started.
    pub started_at: Option<DateTime<Utc>>,
    /// Ticks until the next selection.
    pub chaos_timer: Option<u16>,
    /// Joined participants.
    pub participants: usize,
    /// Current events, oldest first.
    pub events: Vec<EventStatus>,
    /// Recently selected ids, oldest first.
    pub recent: Vec<String>,
    /// The current poll.
    pub poll: Option<PollStatus>,
}

/// One row of [`SessionStatus::events`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventStatus {
    /// Registry id.
    pub event_id: String,
    /// Lifecycle state.
    pub state: EventState,
    /// Ticks run.
    pub tick_count: u16,
    /// Ticks until automatic end.
    pub duration_ticks: u16,
}

/// The current poll as the operator sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollStatus {
    /// Poll id.
    pub poll_id: u32,
    /// Candidate ids.
    pub candidates: Vec<String>,
    /// Summed weight per candidate.
    pub tally: Vec<u64>,
    /// Whether ballots are still accepted.
    pub open: bool,
    /// Ticks left in the window.
    pub remaining_ticks: u16,
}

impl SessionStatus {
    /// Snapshot `session`.
    pub fn capture(session: &Session) -> Self {
        let Some(o) = session.orchestrator() else {
            return Self {
                active: false,
                session_id: None,
                started_at: None,
                chaos_timer: None,
                participants: 0,
                events: Vec::new(),
                recent: Vec::new(),
                poll: None,
            };
        };
        Self {
            active: true,
            session_id: Some(o.session_id()),
            started_at: Some(o.started_at()),
            chaos_timer: Some(o.chaos_timer()),
            participants: o.roster().len(),
            events: o
                .current_events()
                .iter()
                .map(|e| EventStatus {
                    event_id: e.id().to_owned(),
                    state: e.state(),
                    tick_count: e.tick_count(),
                    duration_ticks: e.duration_ticks(),
                })
                .collect(),
            recent: o.recent().map(str::to_owned).collect(),
            poll: o.voting().and_then(|v| v.poll()).map(|p| PollStatus {
                poll_id: p.id(),
                candidates: p.candidates().iter().map(|c| (*c).to_owned()).collect(),
                tally: p.tally(),
                open: p.is_open(),
                remaining_ticks: p.remaining_ticks(),
            }),
        }
    }
}

/// One registered variant, for the catalogue endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogueEntry {
    /// Registry id.
    pub id: String,
    /// Localization key for the display name.
    pub display_key: String,
    /// Mutual-exclusion category.
    pub category: Category,
    /// Draw weight.
    pub weight: u32,
    /// Whether it may run in the configured environment.
    pub eligible: bool,
}

/// Every registered variant, in id order.
pub fn catalogue(session: &Session) -> Vec<CatalogueEntry> {
    let env = session.config().environment();
    session
        .registry()
        .descriptors()
        .map(|d| CatalogueEntry {
            id: d.id.to_owned(),
            display_key: d.display_key.to_owned(),
            category: d.category,
            weight: d.weight,
            eligible: d.is_eligible(&env),
        })
        .collect()
}
