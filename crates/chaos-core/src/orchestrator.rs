//! The per-session scheduler.
//!
//! One [`Orchestrator`] exists while at least one participant is connected.
//! It owns the current event list, the countdown to the next selection,
//! the roster, and (when enabled) the voting state. Every mutation happens
//! on the control thread, from [`Orchestrator::tick`] or from an inbound
//! message or operator command applied between ticks.

use std::collections::BTreeSet;
use std::sync::Arc;

use chaos_events::{Event, EventDescriptor, EventRegistry, HostEffects};
use chaos_types::{Environment, ParticipantId, ServerMessage, SessionId, SyncedEvent};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::config::{ChaosConfig, ChaosSettings};
use crate::error::SessionError;
use crate::outbound::{Outbound, broadcast};
use crate::selection::{Exclusions, RecentSelections, candidate_pool, weighted_pick, weighted_sample};
use crate::voting::{BallotError, Poll, Voting};

/// What happened during one scheduler tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Countdown value after this tick.
    pub chaos_timer: u16,
    /// Events that reached their duration on this tick.
    pub ended: Vec<&'static str>,
    /// Event started by this tick's selection, if any.
    pub started: Option<&'static str>,
    /// Poll decided on this tick, as `(poll_id, winner)`.
    pub poll_closed: Option<(u32, &'static str)>,
    /// Poll opened on this tick.
    pub poll_opened: Option<u32>,
}

/// Scheduler state for one session.
#[derive(Debug)]
pub struct Orchestrator {
    session_id: SessionId,
    started_at: DateTime<Utc>,
    registry: Arc<EventRegistry>,
    settings: ChaosSettings,
    environment: Environment,
    current_events: Vec<Event>,
    next_serial: u32,
    chaos_timer: u16,
    active_players: BTreeSet<ParticipantId>,
    voting: Option<Voting>,
    recent: RecentSelections,
    rng: StdRng,
}

impl Orchestrator {
    /// Create a session with an empty roster and a full countdown. With
    /// voting enabled the first poll opens immediately.
    pub fn new(registry: Arc<EventRegistry>, config: &ChaosConfig) -> Self {
        let rng = config
            .chaos
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        let mut orchestrator = Self {
            session_id: SessionId::new(),
            started_at: Utc::now(),
            registry,
            settings: config.chaos,
            environment: config.environment(),
            current_events: Vec::new(),
            next_serial: 1,
            chaos_timer: config.chaos.timer_duration.max(1),
            active_players: BTreeSet::new(),
            voting: config.voting.enabled.then(|| Voting::new(&config.voting)),
            recent: RecentSelections::new(config.chaos.repeat_window),
            rng,
        };
        orchestrator.open_poll();
        info!(
            session = %orchestrator.session_id,
            timer = orchestrator.chaos_timer,
            voting = orchestrator.voting.is_some(),
            "Session started"
        );
        orchestrator
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Session identifier.
    pub const fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Wall-clock creation time.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Ticks until the next selection.
    pub const fn chaos_timer(&self) -> u16 {
        self.chaos_timer
    }

    /// Current events, oldest first.
    pub fn current_events(&self) -> &[Event] {
        &self.current_events
    }

    /// Joined participants.
    pub const fn roster(&self) -> &BTreeSet<ParticipantId> {
        &self.active_players
    }

    /// Voting state, if voting is enabled.
    pub const fn voting(&self) -> Option<&Voting> {
        self.voting.as_ref()
    }

    /// Recently selected ids, oldest first.
    pub fn recent(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.recent.iter()
    }

    /// The environment eligibility is judged against.
    pub const fn environment(&self) -> Environment {
        self.environment
    }

    // -----------------------------------------------------------------------
    // Roster
    // -----------------------------------------------------------------------

    /// Add a participant. Returns `false` if already present.
    pub fn add_participant(&mut self, participant: ParticipantId) -> bool {
        self.active_players.insert(participant)
    }

    /// Remove a participant and run per-participant teardown on every
    /// current event. Returns `false` if the participant was not present.
    pub fn remove_participant(
        &mut self,
        participant: ParticipantId,
        world: &mut dyn HostEffects,
    ) -> bool {
        if !self.active_players.remove(&participant) {
            return false;
        }
        for event in &mut self.current_events {
            event.participant_left(world, participant);
        }
        if let Some(voting) = self.voting.as_mut() {
            voting.withdraw(participant);
        }
        true
    }

    // -----------------------------------------------------------------------
    // Scheduling
    // -----------------------------------------------------------------------

    /// Advance the session by one tick.
    ///
    /// Order: countdown, active events, poll, then selection if the
    /// countdown reached zero.
    pub fn tick(&mut self, world: &mut dyn HostEffects, out: &mut dyn Outbound) -> TickSummary {
        let mut summary = TickSummary::default();

        self.chaos_timer = self.chaos_timer.saturating_sub(1);

        for event in &mut self.current_events {
            if event.tick(world) {
                debug!(event = event.id(), ticks = event.tick_count(), "Event expired");
                summary.ended.push(event.id());
            }
        }

        if let Some(voting) = self.voting.as_mut() {
            if let Some(winner) = voting.tick(&self.active_players, &self.registry, &mut self.rng) {
                summary.poll_closed = voting.poll().map(|p| (p.id(), winner));
            }
        }

        if self.chaos_timer == 0 {
            summary.poll_closed = summary.poll_closed.or_else(|| self.close_poll_early());
            summary.started = self.select_and_start(world, out);
            self.reset_timer();
            if let Some(message) = self.open_poll() {
                if let ServerMessage::PollOpened { poll_id, .. } = &message {
                    summary.poll_opened = Some(*poll_id);
                }
                broadcast(out, &self.active_players, &message);
            }
        }

        summary.chaos_timer = self.chaos_timer;
        summary
    }

    /// Start a specific event now, bypassing selection.
    ///
    /// Rejects unknown and ineligible ids without changing any state.
    pub fn run_event(
        &mut self,
        event_id: &str,
        world: &mut dyn HostEffects,
        out: &mut dyn Outbound,
    ) -> Result<&'static str, SessionError> {
        let descriptor = *self.registry.get(event_id)?;
        if !descriptor.is_eligible(&self.environment) {
            warn!(event = event_id, env = ?self.environment, "Refusing to run ineligible event");
            return Err(SessionError::Ineligible(descriptor.id.to_owned()));
        }
        Ok(self.start_event(descriptor, world, out))
    }

    /// Drop every ended event from the list and tell participants to do
    /// the same. Returns how many were removed.
    pub fn clear_past_events(&mut self, out: &mut dyn Outbound) -> usize {
        let before = self.current_events.len();
        self.current_events.retain(|e| !e.has_ended());
        let removed = before.saturating_sub(self.current_events.len());
        info!(removed, remaining = self.current_events.len(), "Cleared past events");
        broadcast(out, &self.active_players, &ServerMessage::RemoveEnded);
        removed
    }

    /// End the event at `index` early.
    ///
    /// Idempotent: ending an event that already ended returns `Ok(false)`
    /// and broadcasts nothing.
    pub fn end_event(
        &mut self,
        index: usize,
        world: &mut dyn HostEffects,
        out: &mut dyn Outbound,
    ) -> Result<bool, SessionError> {
        let len = self.current_events.len();
        let event = self
            .current_events
            .get_mut(index)
            .ok_or(SessionError::NoSuchEvent { index, len })?;
        if !event.end(world) {
            debug!(index, event = event.id(), "Event already ended");
            return Ok(false);
        }
        let serial = event.serial();
        info!(index, serial, event = event.id(), "Event ended early");
        broadcast(out, &self.active_players, &ServerMessage::EventEnded { serial });
        Ok(true)
    }

    /// Record a ballot from a joined participant.
    pub fn submit_ballot(
        &mut self,
        participant: ParticipantId,
        poll_id: u32,
        votes: &[u32],
    ) -> Result<(), SessionError> {
        if !self.active_players.contains(&participant) {
            return Err(SessionError::NotJoined(participant));
        }
        let voting = self.voting.as_mut().ok_or(BallotError::NoPoll)?;
        voting.submit(participant, poll_id, votes)?;
        Ok(())
    }

    /// Replay of the current list for a joining participant, in order.
    pub fn replay(&self) -> Vec<SyncedEvent> {
        self.current_events
            .iter()
            .map(|e| SyncedEvent {
                serial: e.serial(),
                event_id: e.id().to_owned(),
                ended: e.has_ended(),
                tick_count: e.tick_count(),
            })
            .collect()
    }

    /// The open poll's announcement, if one is accepting ballots.
    pub fn live_poll_message(&self) -> Option<ServerMessage> {
        self.voting
            .as_ref()
            .and_then(Voting::live_poll)
            .map(Poll::opened_message)
    }

    /// End every event and discard any poll.
    pub fn end_chaos(&mut self, world: &mut dyn HostEffects) {
        let mut ended = 0_usize;
        for event in &mut self.current_events {
            if event.is_active() && event.end(world) {
                ended = ended.saturating_add(1);
            }
        }
        self.current_events.clear();
        if let Some(voting) = self.voting.as_mut() {
            voting.discard();
        }
        info!(session = %self.session_id, ended, "Session torn down");
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn close_poll_early(&mut self) -> Option<(u32, &'static str)> {
        let voting = self.voting.as_mut()?;
        let poll_id = voting.live_poll()?.id();
        let winner = voting.close(&self.registry, &mut self.rng)?;
        debug!(poll_id, "Countdown reached zero before poll window");
        Some((poll_id, winner))
    }

    fn select_and_start(
        &mut self,
        world: &mut dyn HostEffects,
        out: &mut dyn Outbound,
    ) -> Option<&'static str> {
        let voted = self
            .voting
            .as_mut()
            .and_then(|v| v.conclude(&self.registry, &mut self.rng))
            .and_then(|id| self.registry.get(id).ok().copied());
        let descriptor = match voted {
            Some(descriptor) => descriptor,
            None => {
                let exclusions =
                    Exclusions::from_state(&self.registry, &self.current_events, &self.recent);
                let pool = candidate_pool(&self.registry, self.environment, &exclusions);
                let Some(descriptor) = weighted_pick(&pool.descriptors, &mut self.rng) else {
                    warn!("Nothing to select, resetting countdown");
                    return None;
                };
                *descriptor
            }
        };
        Some(self.start_event(descriptor, world, out))
    }

    fn start_event(
        &mut self,
        descriptor: EventDescriptor,
        world: &mut dyn HostEffects,
        out: &mut dyn Outbound,
    ) -> &'static str {
        let id = descriptor.id;
        let serial = self.next_serial;
        self.next_serial = self.next_serial.saturating_add(1);
        let mut event = descriptor
            .instantiate(self.settings.base_event_duration)
            .with_serial(serial);
        event.start(world);
        info!(
            session = %self.session_id,
            event = id,
            serial,
            duration = event.duration_ticks(),
            "Event started"
        );
        self.current_events.push(event);
        self.recent.record(id);
        broadcast(
            out,
            &self.active_players,
            &ServerMessage::EventStarted {
                serial,
                event_id: id.to_owned(),
            },
        );
        id
    }

    fn reset_timer(&mut self) {
        let base = self.settings.timer_duration;
        let jitter = self.settings.timer_jitter;
        let timer = if jitter == 0 {
            base
        } else {
            let offset = self.rng.random_range(0..=jitter.saturating_mul(2));
            base.saturating_add(offset).saturating_sub(jitter)
        };
        self.chaos_timer = timer.max(1);
    }

    fn open_poll(&mut self) -> Option<ServerMessage> {
        let voting = self.voting.as_mut()?;
        let exclusions = Exclusions::from_state(&self.registry, &self.current_events, &self.recent);
        let pool = candidate_pool(&self.registry, self.environment, &exclusions);
        let candidates: Vec<&'static str> =
            weighted_sample(&pool.descriptors, voting.candidate_count(), &mut self.rng)
                .into_iter()
                .map(|d| d.id)
                .collect();
        if candidates.is_empty() {
            warn!("No candidates for a poll, skipping");
            return None;
        }
        let window = voting.poll_window().min(self.chaos_timer);
        Some(voting.open(candidates, window).opened_message())
    }
}
