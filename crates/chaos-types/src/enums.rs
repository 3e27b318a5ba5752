//! Enumeration types for the Chaos session orchestrator.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::ParticipantId;

// ---------------------------------------------------------------------------
// Event lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle state of a single chaos event.
///
/// Transitions only move forward: `Pending -> Active -> Ended`. `Ended` is
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum EventState {
    /// Constructed but not yet started.
    Pending,
    /// Started; ticks are being delivered.
    Active,
    /// Finished. Further ticks and end requests are ignored.
    Ended,
}

/// What part of the game an event variant interferes with.
///
/// Two events sharing a category would fight over the same knob (two
/// camera tilts, two gravity changes), so the scheduler avoids drawing a
/// variant whose category is already in use by an active event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Camera orientation or projection.
    Camera,
    /// Entity visibility.
    Visibility,
    /// Player movement physics.
    Movement,
    /// Server tick pacing.
    Tempo,
    /// Health and healing.
    Health,
    /// No shared resource; never conflicts.
    None,
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// How the host process is deployed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum Deployment {
    /// Standalone host with no local participant.
    #[default]
    Dedicated,
    /// Host embedded in a participant's own game process.
    Integrated,
}

// ---------------------------------------------------------------------------
// Host effect vocabulary
// ---------------------------------------------------------------------------

/// Status effects the host can apply to entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusEffect {
    /// Entity is not rendered.
    Invisibility,
    /// Entity falls slowly and takes no fall damage.
    SlowFalling,
    /// Entity regenerates health.
    Regeneration,
}

/// Which entities a host effect targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntitySelector {
    /// Every hostile mob in any world that hosts a participant.
    HostileMobs,
    /// Every participant in the roster.
    AllParticipants,
    /// A single participant.
    Participant(ParticipantId),
}
