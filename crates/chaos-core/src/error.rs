//! Error types for session, orchestrator, and operator operations.

use chaos_events::RegistryError;
use chaos_types::ParticipantId;

use crate::voting::BallotError;

/// Errors reported to whoever invoked a session operation.
///
/// None of these mutate session state: every failing operation is
/// rejected before it changes anything.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The participant's protocol version does not match the host's.
    #[error("client version ({received}) does not match server version ({expected})")]
    VersionMismatch {
        /// The host's version token.
        expected: String,
        /// The version the participant sent.
        received: String,
    },

    /// No event variant is registered under this id.
    #[error("unknown event: {0}")]
    UnknownEvent(String),

    /// The variant exists but may not run in the current environment.
    #[error("event {0} is not eligible in this environment")]
    Ineligible(String),

    /// No participant is connected, so there is no orchestrator.
    #[error("no session is running")]
    NoSession,

    /// The participant has not completed the join handshake.
    #[error("participant {0} has not joined")]
    NotJoined(ParticipantId),

    /// No current event at this position.
    #[error("no current event at index {index} ({len} current)")]
    NoSuchEvent {
        /// Requested position.
        index: usize,
        /// Number of current events.
        len: usize,
    },

    /// A ballot was rejected.
    #[error("ballot rejected: {0}")]
    Ballot(#[from] BallotError),

    /// Any other registry failure.
    #[error("registry error: {0}")]
    Registry(RegistryError),
}

impl From<RegistryError> for SessionError {
    fn from(error: RegistryError) -> Self {
        match error {
            RegistryError::UnknownEvent(id) => Self::UnknownEvent(id),
            other @ RegistryError::DuplicateId(_) => Self::Registry(other),
        }
    }
}
