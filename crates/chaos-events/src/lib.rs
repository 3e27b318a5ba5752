//! Event registry, event state machine, and event variants for the Chaos
//! session orchestrator.
//!
//! An event is one short-lived, gameplay-altering modifier. Each variant
//! supplies two independent hook sets: host hooks that touch shared game
//! state, and presentation hooks that only touch one participant's local
//! view. This crate sequences those hooks; it never implements an effect
//! itself. Effects are requested through the [`HostEffects`] and
//! [`PresentationEffects`] traits, which the embedding game implements.
//!
//! # Modules
//!
//! - [`effects`] -- Collaborator traits the variants drive.
//! - [`error`] -- Registry error types.
//! - [`event`] -- The [`Event`] state machine (`Pending -> Active -> Ended`).
//! - [`registry`] -- [`EventRegistry`]: id -> descriptor catalogue with
//!   eligibility filtering.
//! - [`variants`] -- The closed [`EventKind`] enumeration and its hooks.

pub mod effects;
pub mod error;
pub mod event;
pub mod registry;
pub mod variants;

// Re-export primary types at crate root.
pub use effects::{HostEffects, PresentationContext, PresentationEffects, RenderFrame};
pub use error::RegistryError;
pub use event::{Event, Timing};
pub use registry::{EventDescriptor, EventRegistry};
pub use variants::EventKind;
