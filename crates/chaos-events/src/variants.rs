//! The closed set of event variants and their hooks.
//!
//! Every variant implements [`HostHooks`] and [`PresentationHooks`]; the
//! default methods are no-ops, so a variant only overrides the half it
//! cares about. [`EventKind`] dispatches to the variant by `match`.

use chaos_types::{EntitySelector, ParticipantId, StatusEffect};
use rand::Rng;

use crate::effects::{HostEffects, PresentationContext, PresentationEffects, RenderFrame};

/// Host-side hooks. Run only on the host.
pub trait HostHooks {
    /// Called once when the event goes `Pending -> Active`.
    fn init(&mut self, _world: &mut dyn HostEffects, _duration_ticks: u16) {}

    /// Called on every host tick while active, before the counter moves.
    fn tick(&mut self, _world: &mut dyn HostEffects, _tick_count: u16) {}

    /// Called once when the event ends.
    fn end(&mut self, _world: &mut dyn HostEffects) {}

    /// Called when a participant leaves while the event is active.
    fn participant_left(&mut self, _world: &mut dyn HostEffects, _participant: ParticipantId) {}
}

/// Presentation-side hooks. Run independently on each participant.
pub trait PresentationHooks {
    /// Called once when the participant learns the event is active.
    fn init_client(&mut self, _cx: &mut PresentationContext<'_>) {}

    /// Called on every participant-local tick while active.
    fn tick_client(&mut self, _cx: &mut PresentationContext<'_>, _tick_count: u16) {}

    /// Called once when the event ends locally.
    fn end_client(&mut self, _cx: &mut PresentationContext<'_>) {}

    /// Called every frame while active. Must not mutate the event.
    fn render(&self, _fx: &mut dyn PresentationEffects, _frame: RenderFrame) {}
}

// ---------------------------------------------------------------------------
// Variants
// ---------------------------------------------------------------------------

/// Hostile mobs turn invisible for the duration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvisibleHostileMobs;

/// Ticks of invisibility applied each tick; short so the effect lapses
/// on its own once the event stops refreshing it.
const INVISIBILITY_REFRESH_TICKS: u16 = 2;

impl HostHooks for InvisibleHostileMobs {
    fn tick(&mut self, world: &mut dyn HostEffects, _tick_count: u16) {
        world.apply_status(
            EntitySelector::HostileMobs,
            StatusEffect::Invisibility,
            INVISIBILITY_REFRESH_TICKS,
        );
    }
}

impl PresentationHooks for InvisibleHostileMobs {}

/// Each participant's camera is rolled to a random angle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RandomCameraTilt {
    /// Roll chosen by this participant, in degrees.
    roll: f32,
}

impl RandomCameraTilt {
    /// The roll this participant picked, in degrees.
    pub const fn roll(&self) -> f32 {
        self.roll
    }
}

impl HostHooks for RandomCameraTilt {}

impl PresentationHooks for RandomCameraTilt {
    fn init_client(&mut self, cx: &mut PresentationContext<'_>) {
        self.roll = cx.rng.random_range(0.0_f32..360.0_f32);
        cx.fx.set_camera_roll(self.roll);
    }

    fn end_client(&mut self, cx: &mut PresentationContext<'_>) {
        self.roll = 0.0;
        cx.fx.set_camera_roll(0.0);
    }
}

/// The host stalls briefly at a fixed cadence, so the whole session
/// stutters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stuttering;

/// Ticks between stalls.
const STUTTER_PERIOD_TICKS: u16 = 20;

/// Length of each stall.
const STUTTER_STALL_MS: u32 = 350;

impl HostHooks for Stuttering {
    fn tick(&mut self, world: &mut dyn HostEffects, tick_count: u16) {
        if tick_count.checked_rem(STUTTER_PERIOD_TICKS) == Some(0) {
            world.request_stall(STUTTER_STALL_MS);
        }
    }
}

impl PresentationHooks for Stuttering {}

/// Every participant falls slowly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LowGravity;

/// Pale blue wash drawn while low gravity is active.
const LOW_GRAVITY_TINT: u32 = 0x00A0_C8FF;

impl HostHooks for LowGravity {
    fn init(&mut self, world: &mut dyn HostEffects, duration_ticks: u16) {
        world.apply_status(
            EntitySelector::AllParticipants,
            StatusEffect::SlowFalling,
            duration_ticks,
        );
    }

    fn end(&mut self, world: &mut dyn HostEffects) {
        world.clear_status(EntitySelector::AllParticipants, StatusEffect::SlowFalling);
    }

    fn participant_left(&mut self, world: &mut dyn HostEffects, participant: ParticipantId) {
        world.clear_status(
            EntitySelector::Participant(participant),
            StatusEffect::SlowFalling,
        );
    }
}

impl PresentationHooks for LowGravity {
    fn render(&self, fx: &mut dyn PresentationEffects, frame: RenderFrame) {
        // Fade out over the life of the event.
        let alpha = 0.25 * (1.0 - frame.progress());
        fx.draw_tint(LOW_GRAVITY_TINT, alpha);
    }
}

/// Everyone is healed at once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealAll;

impl HostHooks for HealAll {
    fn init(&mut self, world: &mut dyn HostEffects, _duration_ticks: u16) {
        world.heal(EntitySelector::AllParticipants);
    }
}

impl PresentationHooks for HealAll {}

// ---------------------------------------------------------------------------
// EventKind
// ---------------------------------------------------------------------------

/// The closed enumeration of event variants.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// See [`InvisibleHostileMobs`].
    InvisibleHostileMobs(InvisibleHostileMobs),
    /// See [`RandomCameraTilt`].
    RandomCameraTilt(RandomCameraTilt),
    /// See [`Stuttering`].
    Stuttering(Stuttering),
    /// See [`LowGravity`].
    LowGravity(LowGravity),
    /// See [`HealAll`].
    HealAll(HealAll),
}

/// Forward a call to whichever variant `$kind` holds.
macro_rules! dispatch {
    ($kind:expr, $inner:ident => $call:expr) => {
        match $kind {
            EventKind::InvisibleHostileMobs($inner) => $call,
            EventKind::RandomCameraTilt($inner) => $call,
            EventKind::Stuttering($inner) => $call,
            EventKind::LowGravity($inner) => $call,
            EventKind::HealAll($inner) => $call,
        }
    };
}

impl HostHooks for EventKind {
    fn init(&mut self, world: &mut dyn HostEffects, duration_ticks: u16) {
        dispatch!(self, v => v.init(world, duration_ticks));
    }

    fn tick(&mut self, world: &mut dyn HostEffects, tick_count: u16) {
        dispatch!(self, v => v.tick(world, tick_count));
    }

    fn end(&mut self, world: &mut dyn HostEffects) {
        dispatch!(self, v => v.end(world));
    }

    fn participant_left(&mut self, world: &mut dyn HostEffects, participant: ParticipantId) {
        dispatch!(self, v => v.participant_left(world, participant));
    }
}

impl PresentationHooks for EventKind {
    fn init_client(&mut self, cx: &mut PresentationContext<'_>) {
        dispatch!(self, v => v.init_client(cx));
    }

    fn tick_client(&mut self, cx: &mut PresentationContext<'_>, tick_count: u16) {
        dispatch!(self, v => v.tick_client(cx, tick_count));
    }

    fn end_client(&mut self, cx: &mut PresentationContext<'_>) {
        dispatch!(self, v => v.end_client(cx));
    }

    fn render(&self, fx: &mut dyn PresentationEffects, frame: RenderFrame) {
        dispatch!(self, v => v.render(fx, frame));
    }
}
