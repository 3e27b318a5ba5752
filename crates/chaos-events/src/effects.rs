//! Collaborator traits through which event variants touch the game.
//!
//! The orchestrator only sequences hook invocations. What "apply
//! invisibility to hostile mobs" or "tilt the camera" means is up to the
//! embedding game, which implements these traits.

use chaos_types::{EntitySelector, StatusEffect};
use rand::rngs::StdRng;

/// Host-side effects: mutate shared, authoritative game state.
pub trait HostEffects {
    /// Apply `effect` to every entity matched by `target` for `ticks` ticks.
    fn apply_status(&mut self, target: EntitySelector, effect: StatusEffect, ticks: u16);

    /// Remove `effect` from every entity matched by `target`.
    fn clear_status(&mut self, target: EntitySelector, effect: StatusEffect);

    /// Restore every entity matched by `target` to full health.
    fn heal(&mut self, target: EntitySelector);

    /// Ask the host loop to stall for `millis` before its next tick.
    fn request_stall(&mut self, millis: u32);

    /// Drain the stall requested since the last call, in milliseconds.
    ///
    /// Host loops call this after every tick. The default never stalls.
    fn take_stall(&mut self) -> Option<u32> {
        None
    }
}

/// Presentation-side effects: mutate one participant's local view only.
pub trait PresentationEffects {
    /// Set the camera roll in degrees. `0.0` is level.
    fn set_camera_roll(&mut self, degrees: f32);

    /// Draw a full-screen color wash this frame.
    fn draw_tint(&mut self, rgb: u32, alpha: f32);
}

/// Everything a presentation hook may use.
pub struct PresentationContext<'a> {
    /// The participant's local presentation layer.
    pub fx: &'a mut dyn PresentationEffects,
    /// Participant-local randomness (never shared with the host).
    pub rng: &'a mut StdRng,
}

/// Per-frame input to a render hook.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderFrame {
    /// Ticks the event has run.
    pub tick_count: u16,
    /// Total ticks the event runs for.
    pub duration_ticks: u16,
    /// Fraction of the current tick elapsed at this frame, in `[0, 1)`.
    pub tick_delta: f32,
}

impl RenderFrame {
    /// Fraction of the event that has elapsed, in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        if self.duration_ticks == 0 {
            return 1.0;
        }
        let elapsed = f32::from(self.tick_count) + self.tick_delta;
        (elapsed / f32::from(self.duration_ticks)).clamp(0.0, 1.0)
    }
}
