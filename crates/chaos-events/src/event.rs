//! The event state machine.
//!
//! An [`Event`] moves `Pending -> Active -> Ended` exactly once. Every tick
//! delivered while active runs the variant's tick hook, then increments the
//! counter, then re-checks the duration guard; the event ends on the tick
//! where `tick_count` reaches `duration_ticks`. Once ended, `has_ended` is
//! the single source of truth regardless of `tick_count`, and further
//! ticks or end requests are no-ops.
//!
//! The host half (`start`/`tick`/`end`) and the presentation half
//! (`start_client`/`tick_client`/`end_client`/`render`) share the counter
//! but run on different nodes, each against its own `Event` instance.

use chaos_types::{EventState, ParticipantId};

use crate::effects::{HostEffects, PresentationContext, PresentationEffects, RenderFrame};
use crate::variants::{EventKind, HostHooks, PresentationHooks};

/// How a variant's duration is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timing {
    /// Runs for the configured base event duration.
    BaseDuration,
    /// Runs for a fixed number of ticks.
    Fixed(u16),
    /// Takes effect at start and ends on its first tick.
    Instant,
}

impl Timing {
    /// Resolve to a tick count given the configured base duration.
    pub const fn resolve(self, base_event_duration: u16) -> u16 {
        match self {
            Self::BaseDuration => base_event_duration,
            Self::Fixed(ticks) => ticks,
            Self::Instant => 0,
        }
    }
}

/// Outcome of advancing the counter by one tick.
enum Step {
    /// Event was not active; nothing happened.
    Idle,
    /// Hook ran and the counter moved; still within duration.
    Ticked,
    /// Duration reached; the caller must end the event.
    Expired,
}

/// One running (or finished) chaos event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Registry key.
    id: &'static str,
    /// Variant payload and hooks.
    kind: EventKind,
    /// Lifecycle state.
    state: EventState,
    /// Ticks delivered while active.
    tick_count: u16,
    /// Ticks until automatic end; 0 for instantaneous events.
    duration_ticks: u16,
    /// Set once the event ends, by any path.
    has_ended: bool,
    /// Host-assigned identity, stable across purges.
    serial: u32,
}

impl Event {
    /// Create a pending event.
    pub const fn new(id: &'static str, kind: EventKind, duration_ticks: u16) -> Self {
        Self {
            id,
            kind,
            state: EventState::Pending,
            tick_count: 0,
            duration_ticks,
            has_ended: false,
            serial: 0,
        }
    }

    /// Tag the event with its host-assigned serial.
    #[must_use]
    pub const fn with_serial(mut self, serial: u32) -> Self {
        self.serial = serial;
        self
    }

    /// Rebuild an event from a host replay. No hooks run.
    ///
    /// An ended event comes back `Ended`; a live one comes back `Pending`
    /// so the caller can start its presentation half.
    pub fn restore(
        id: &'static str,
        kind: EventKind,
        duration_ticks: u16,
        tick_count: u16,
        ended: bool,
    ) -> Self {
        let mut event = Self::new(id, kind, duration_ticks);
        event.tick_count = tick_count;
        if ended {
            event.state = EventState::Ended;
            event.has_ended = true;
        }
        event
    }

    /// Registry id of this event.
    pub const fn id(&self) -> &'static str {
        self.id
    }

    /// Host-assigned serial; 0 until tagged.
    pub const fn serial(&self) -> u32 {
        self.serial
    }

    /// The variant payload.
    pub const fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> EventState {
        self.state
    }

    /// Ticks delivered while active.
    pub const fn tick_count(&self) -> u16 {
        self.tick_count
    }

    /// Total ticks before automatic end.
    pub const fn duration_ticks(&self) -> u16 {
        self.duration_ticks
    }

    /// Whether the event has ended.
    pub const fn has_ended(&self) -> bool {
        self.has_ended
    }

    /// Whether ticks are currently being delivered.
    pub const fn is_active(&self) -> bool {
        matches!(self.state, EventState::Active)
    }

    /// Ticks left before automatic end.
    pub const fn remaining_ticks(&self) -> u16 {
        self.duration_ticks.saturating_sub(self.tick_count)
    }

    // -----------------------------------------------------------------------
    // Host half
    // -----------------------------------------------------------------------

    /// Run the host `init` hook and go `Pending -> Active`.
    ///
    /// Returns `false` (and runs nothing) if the event was not pending.
    pub fn start(&mut self, world: &mut dyn HostEffects) -> bool {
        if !self.activate() {
            return false;
        }
        self.kind.init(world, self.duration_ticks);
        true
    }

    /// Deliver one host tick. Returns `true` if the event ended on this tick.
    pub fn tick(&mut self, world: &mut dyn HostEffects) -> bool {
        match self.step(|kind, count| kind.tick(world, count)) {
            Step::Expired => self.end(world),
            Step::Idle | Step::Ticked => false,
        }
    }

    /// End the event, running the host `end` hook.
    ///
    /// Idempotent: returns `false` and runs nothing if already ended.
    pub fn end(&mut self, world: &mut dyn HostEffects) -> bool {
        if !self.finish() {
            return false;
        }
        self.kind.end(world);
        true
    }

    /// Run per-participant teardown for a participant who left.
    pub fn participant_left(&mut self, world: &mut dyn HostEffects, participant: ParticipantId) {
        if self.is_active() {
            self.kind.participant_left(world, participant);
        }
    }

    // -----------------------------------------------------------------------
    // Presentation half
    // -----------------------------------------------------------------------

    /// Run the `init_client` hook and go `Pending -> Active`.
    pub fn start_client(&mut self, cx: &mut PresentationContext<'_>) -> bool {
        if !self.activate() {
            return false;
        }
        self.kind.init_client(cx);
        true
    }

    /// Deliver one participant-local tick. Returns `true` if the event
    /// ended on this tick.
    pub fn tick_client(&mut self, cx: &mut PresentationContext<'_>) -> bool {
        match self.step(|kind, count| kind.tick_client(cx, count)) {
            Step::Expired => self.end_client(cx),
            Step::Idle | Step::Ticked => false,
        }
    }

    /// End the presentation half. Idempotent.
    pub fn end_client(&mut self, cx: &mut PresentationContext<'_>) -> bool {
        if !self.finish() {
            return false;
        }
        self.kind.end_client(cx);
        true
    }

    /// Mark ended without running any hook.
    ///
    /// Used when a participant has not started the presentation half and
    /// learns the event is already over.
    pub fn mark_ended(&mut self) -> bool {
        self.finish()
    }

    /// Draw one frame. A no-op unless the event is active.
    pub fn render(&self, fx: &mut dyn PresentationEffects, tick_delta: f32) {
        if !self.is_active() {
            return;
        }
        self.kind.render(
            fx,
            RenderFrame {
                tick_count: self.tick_count,
                duration_ticks: self.duration_ticks,
                tick_delta,
            },
        );
    }

    // -----------------------------------------------------------------------
    // Shared transitions
    // -----------------------------------------------------------------------

    fn activate(&mut self) -> bool {
        if self.state != EventState::Pending {
            return false;
        }
        self.state = EventState::Active;
        true
    }

    fn finish(&mut self) -> bool {
        if self.has_ended {
            return false;
        }
        self.state = EventState::Ended;
        self.has_ended = true;
        true
    }

    fn step(&mut self, hook: impl FnOnce(&mut EventKind, u16)) -> Step {
        if !self.is_active() {
            return Step::Idle;
        }
        // Instantaneous events (and restored events already at their limit)
        // end without running the tick hook.
        if self.tick_count >= self.duration_ticks {
            return Step::Expired;
        }
        hook(&mut self.kind, self.tick_count);
        self.tick_count = self.tick_count.saturating_add(1);
        if self.tick_count >= self.duration_ticks {
            Step::Expired
        } else {
            Step::Ticked
        }
    }
}

#[cfg(test)]
mod tests {
    use chaos_types::{EntitySelector, StatusEffect};

    use super::*;
    use crate::variants::{HealAll, InvisibleHostileMobs, LowGravity};

    #[derive(Default)]
    struct World {
        applied: u32,
        cleared: u32,
        healed: u32,
    }

    impl HostEffects for World {
        fn apply_status(&mut self, _t: EntitySelector, _e: StatusEffect, _ticks: u16) {
            self.applied = self.applied.saturating_add(1);
        }
        fn clear_status(&mut self, _t: EntitySelector, _e: StatusEffect) {
            self.cleared = self.cleared.saturating_add(1);
        }
        fn heal(&mut self, _t: EntitySelector) {
            self.healed = self.healed.saturating_add(1);
        }
        fn request_stall(&mut self, _millis: u32) {}
    }

    fn invisible(duration: u16) -> Event {
        Event::new(
            "invisible_hostile_mobs",
            EventKind::InvisibleHostileMobs(InvisibleHostileMobs),
            duration,
        )
    }

    #[test]
    fn new_event_is_pending() {
        let event = invisible(10);
        assert_eq!(event.state(), EventState::Pending);
        assert_eq!(event.tick_count(), 0);
        assert!(!event.has_ended());
    }

    #[test]
    fn ticks_before_start_are_ignored() {
        let mut world = World::default();
        let mut event = invisible(10);
        assert!(!event.tick(&mut world));
        assert_eq!(event.tick_count(), 0);
        assert_eq!(world.applied, 0);
    }

    #[test]
    fn start_happens_once() {
        let mut world = World::default();
        let mut event = invisible(10);
        assert!(event.start(&mut world));
        assert!(!event.start(&mut world));
        assert_eq!(event.state(), EventState::Active);
    }

    #[test]
    fn timed_event_ends_when_count_reaches_duration() {
        let mut world = World::default();
        let mut event = invisible(5);
        event.start(&mut world);

        for expected in 1..5 {
            assert!(!event.tick(&mut world));
            assert_eq!(event.tick_count(), expected);
            assert!(event.is_active());
            assert!(event.tick_count() <= event.duration_ticks());
        }

        assert!(event.tick(&mut world));
        assert_eq!(event.tick_count(), 5);
        assert_eq!(event.state(), EventState::Ended);
        assert!(event.has_ended());
        assert_eq!(world.applied, 5);
    }

    #[test]
    fn ticks_after_end_change_nothing() {
        let mut world = World::default();
        let mut event = invisible(1);
        event.start(&mut world);
        assert!(event.tick(&mut world));
        assert!(!event.tick(&mut world));
        assert_eq!(event.tick_count(), 1);
        assert_eq!(world.applied, 1);
    }

    #[test]
    fn ending_twice_is_a_noop() {
        let mut world = World::default();
        let mut event = Event::new("low_gravity", EventKind::LowGravity(LowGravity), 50);
        event.start(&mut world);
        assert!(event.end(&mut world));
        assert!(!event.end(&mut world));
        assert_eq!(world.cleared, 1);
        assert_eq!(event.state(), EventState::Ended);
    }

    #[test]
    fn instant_event_ends_on_first_tick_without_tick_hook() {
        let mut world = World::default();
        let mut event = Event::new("heal_all", EventKind::HealAll(HealAll), 0);
        event.start(&mut world);
        assert_eq!(world.healed, 1);
        assert!(event.tick(&mut world));
        assert_eq!(event.tick_count(), 0);
        assert!(event.has_ended());
    }

    #[test]
    fn forced_end_wins_over_tick_count() {
        let mut world = World::default();
        let mut event = invisible(100);
        event.start(&mut world);
        event.tick(&mut world);
        event.end(&mut world);
        assert!(event.has_ended());
        assert_eq!(event.tick_count(), 1);
        assert_eq!(event.remaining_ticks(), 99);
        assert!(!event.tick(&mut world));
    }

    #[test]
    fn restore_preserves_progress() {
        let live = Event::restore(
            "invisible_hostile_mobs",
            EventKind::InvisibleHostileMobs(InvisibleHostileMobs),
            600,
            5,
            false,
        );
        assert_eq!(live.state(), EventState::Pending);
        assert_eq!(live.tick_count(), 5);

        let done = Event::restore(
            "invisible_hostile_mobs",
            EventKind::InvisibleHostileMobs(InvisibleHostileMobs),
            600,
            20,
            true,
        );
        assert_eq!(done.state(), EventState::Ended);
        assert!(done.has_ended());
    }

    #[test]
    fn serial_survives_restore() {
        let event = Event::restore(
            "low_gravity",
            EventKind::LowGravity(LowGravity),
            400,
            12,
            false,
        )
        .with_serial(9);
        assert_eq!(event.serial(), 9);
        assert_eq!(event.tick_count(), 12);
    }

    #[test]
    fn timing_resolves_against_base() {
        assert_eq!(Timing::BaseDuration.resolve(600), 600);
        assert_eq!(Timing::Fixed(40).resolve(600), 40);
        assert_eq!(Timing::Instant.resolve(600), 0);
    }
}
