//! A [`HostEffects`] that records requested effects in the log.
//!
//! The server has no game attached, so effects are traced at debug level.
//! Stall requests are real: the control loop sleeps for them.

use chaos_events::HostEffects;
use chaos_types::{EntitySelector, StatusEffect};
use tracing::debug;

/// Host world that logs every effect.
#[derive(Debug, Default)]
pub struct TracingWorld {
    pending_stall: Option<u32>,
}

impl HostEffects for TracingWorld {
    fn apply_status(&mut self, target: EntitySelector, effect: StatusEffect, ticks: u16) {
        debug!(?target, ?effect, ticks, "Apply status");
    }

    fn clear_status(&mut self, target: EntitySelector, effect: StatusEffect) {
        debug!(?target, ?effect, "Clear status");
    }

    fn heal(&mut self, target: EntitySelector) {
        debug!(?target, "Heal");
    }

    fn request_stall(&mut self, millis: u32) {
        // Overlapping requests within one tick collapse to the longest.
        self.pending_stall = Some(self.pending_stall.map_or(millis, |m| m.max(millis)));
    }

    fn take_stall(&mut self) -> Option<u32> {
        self.pending_stall.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stalls_collapse_and_drain() {
        let mut world = TracingWorld::default();
        assert_eq!(world.take_stall(), None);
        world.request_stall(100);
        world.request_stall(350);
        world.request_stall(20);
        assert_eq!(world.take_stall(), Some(350));
        assert_eq!(world.take_stall(), None);
    }
}
