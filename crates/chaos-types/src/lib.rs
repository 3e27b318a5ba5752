//! Shared type definitions for the Chaos session orchestrator.
//!
//! This crate is the single source of truth for the types exchanged
//! between the host and its participants. Types defined here flow
//! downstream to `TypeScript` via `ts-rs` for browser overlay clients.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for participants and sessions
//! - [`enums`] -- Enumeration types (event state, categories, effects)
//! - [`environment`] -- The deployment environment eligibility is judged against
//! - [`protocol`] -- Messages exchanged between host and participants

pub mod enums;
pub mod environment;
pub mod ids;
pub mod protocol;

// Re-export all public types at crate root for convenience.
pub use enums::{Category, Deployment, EntitySelector, EventState, StatusEffect};
pub use environment::Environment;
pub use ids::{ParticipantId, SessionId};
pub use protocol::{
    ClientMessage, ClientMessageKind, JoinSettings, PROTOCOL_VERSION, ServerMessage, SyncedEvent,
};
