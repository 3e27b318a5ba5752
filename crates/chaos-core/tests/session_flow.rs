//! End-to-end session behavior: joins, leaves, selection, voting, and the
//! operator surface, driven through [`Session`] with recording fakes.

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::missing_panics_doc)]

use std::collections::BTreeSet;
use std::sync::Arc;

use chaos_core::client::ClientMirror;
use chaos_core::config::ChaosConfig;
use chaos_core::error::SessionError;
use chaos_core::{HostIo, Orchestrator, Outbound, Session};
use chaos_events::variants::HealAll;
use chaos_events::{
    EventDescriptor, EventKind, EventRegistry, HostEffects, PresentationEffects, Timing,
};
use chaos_types::{
    Category, ClientMessage, EntitySelector, PROTOCOL_VERSION, ParticipantId, ServerMessage,
    StatusEffect, SyncedEvent,
};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct World {
    cleared: Vec<(EntitySelector, StatusEffect)>,
}

impl HostEffects for World {
    fn apply_status(&mut self, _target: EntitySelector, _effect: StatusEffect, _ticks: u16) {}
    fn clear_status(&mut self, target: EntitySelector, effect: StatusEffect) {
        self.cleared.push((target, effect));
    }
    fn heal(&mut self, _target: EntitySelector) {}
    fn request_stall(&mut self, _millis: u32) {}
}

#[derive(Default)]
struct Wire {
    sent: Vec<(ParticipantId, ServerMessage)>,
    disconnected: Vec<ParticipantId>,
}

impl Wire {
    fn to(&self, participant: ParticipantId) -> Vec<ServerMessage> {
        self.sent
            .iter()
            .filter(|(p, _)| *p == participant)
            .map(|(_, m)| m.clone())
            .collect()
    }

    fn labels_to(&self, participant: ParticipantId) -> Vec<&'static str> {
        self.to(participant).iter().map(ServerMessage::label).collect()
    }
}

impl Outbound for Wire {
    fn send(&mut self, to: ParticipantId, message: ServerMessage) {
        self.sent.push((to, message));
    }
    fn disconnect(&mut self, participant: ParticipantId, _reason: &str) {
        self.disconnected.push(participant);
    }
}

struct Screen;

impl PresentationEffects for Screen {
    fn set_camera_roll(&mut self, _degrees: f32) {}
    fn draw_tint(&mut self, _rgb: u32, _alpha: f32) {}
}

struct Host {
    session: Session,
    world: World,
    wire: Wire,
}

impl Host {
    fn new(config: ChaosConfig) -> Self {
        Self::with_registry(EventRegistry::builtin().unwrap(), config)
    }

    fn with_registry(registry: EventRegistry, config: ChaosConfig) -> Self {
        Self {
            session: Session::new(Arc::new(registry), config),
            world: World::default(),
            wire: Wire::default(),
        }
    }

    fn send(&mut self, from: ParticipantId, message: ClientMessage) -> Result<(), SessionError> {
        let mut io = HostIo { world: &mut self.world, out: &mut self.wire };
        self.session.handle(from, message, &mut io)
    }

    fn join(&mut self) -> ParticipantId {
        let p = ParticipantId::new();
        self.send(p, ClientMessage::VersionHandshake { version: PROTOCOL_VERSION.into() })
            .unwrap();
        p
    }

    fn leave(&mut self, participant: ParticipantId) {
        self.session.participant_left(participant, &mut self.world);
    }

    fn tick(&mut self, n: usize) {
        for _ in 0..n {
            let mut io = HostIo { world: &mut self.world, out: &mut self.wire };
            self.session.tick(&mut io);
        }
    }

    fn run(&mut self, id: &str) -> Result<&'static str, SessionError> {
        let mut io = HostIo { world: &mut self.world, out: &mut self.wire };
        self.session.run_event(id, &mut io)
    }

    fn end(&mut self, index: usize) -> Result<bool, SessionError> {
        let mut io = HostIo { world: &mut self.world, out: &mut self.wire };
        self.session.end_event(index, &mut io)
    }

    fn orchestrator(&self) -> &Orchestrator {
        self.session.orchestrator().unwrap()
    }
}

fn quiet_config() -> ChaosConfig {
    let mut config = ChaosConfig::default();
    config.chaos.timer_duration = 10_000;
    config.chaos.base_event_duration = 20;
    config.chaos.seed = Some(2024);
    config
}

// ---------------------------------------------------------------------------
// Join and leave
// ---------------------------------------------------------------------------

#[test]
fn late_joiner_sees_host_list_in_order() {
    let mut host = Host::new(quiet_config());
    let a = host.join();

    host.run("invisible_hostile_mobs").unwrap();
    host.tick(20);
    host.run("low_gravity").unwrap();
    host.tick(5);

    let b = host.join();
    let to_b = host.wire.to(b);
    assert_eq!(host.wire.labels_to(b), vec!["join_confirm", "join_sync"]);
    let ServerMessage::JoinSync { events } = &to_b[1] else {
        panic!("expected join_sync");
    };
    assert_eq!(
        events,
        &vec![
            SyncedEvent {
                serial: 1,
                event_id: "invisible_hostile_mobs".into(),
                ended: true,
                tick_count: 20,
            },
            SyncedEvent { serial: 2, event_id: "low_gravity".into(), ended: false, tick_count: 5 },
        ]
    );

    // The participant mirror converges on the same list.
    let mut mirror = ClientMirror::with_seed(Arc::clone(host.session.registry()), 1);
    for message in to_b {
        mirror.apply(message, &mut Screen).unwrap();
    }
    let local: Vec<_> = mirror
        .events()
        .iter()
        .map(|e| (e.id(), e.has_ended(), e.tick_count(), e.is_active()))
        .collect();
    assert_eq!(
        local,
        vec![("invisible_hostile_mobs", true, 20, false), ("low_gravity", false, 5, true)]
    );

    // A already knew both events; it got no second JoinSync.
    assert_eq!(host.wire.labels_to(a).iter().filter(|l| **l == "join_sync").count(), 1);
}

#[test]
fn join_sync_is_sent_even_when_empty() {
    let mut host = Host::new(quiet_config());
    let a = host.join();
    let to_a = host.wire.to(a);
    assert_eq!(to_a[1], ServerMessage::JoinSync { events: Vec::new() });
}

#[test]
fn version_mismatch_is_disconnected_once_and_never_joined() {
    let mut host = Host::new(quiet_config());
    let stranger = ParticipantId::new();
    let err = host
        .send(stranger, ClientMessage::VersionHandshake { version: "0.0.0-old".into() })
        .unwrap_err();
    assert!(matches!(err, SessionError::VersionMismatch { .. }));
    assert_eq!(host.wire.disconnected, vec![stranger]);
    assert!(host.wire.to(stranger).is_empty());
    assert!(host.session.orchestrator().is_none());

    // A ballot from the rejected connection changes nothing.
    let ballot = ClientMessage::Ballot { poll_id: 1, votes: vec![1, 0, 0, 0] };
    assert!(host.send(stranger, ballot).is_err());
    assert!(host.session.orchestrator().is_none());
}

#[test]
fn last_departure_tears_down_and_next_join_starts_fresh() {
    let mut host = Host::new(quiet_config());
    let a = host.join();
    let b = host.join();
    let first_session = host.orchestrator().session_id();
    host.run("low_gravity").unwrap();

    host.leave(a);
    assert_eq!(host.orchestrator().roster().len(), 1);
    assert_eq!(
        host.world.cleared,
        vec![(EntitySelector::Participant(a), StatusEffect::SlowFalling)]
    );

    host.leave(b);
    assert!(host.session.orchestrator().is_none());
    assert_eq!(
        host.world.cleared.last(),
        Some(&(EntitySelector::AllParticipants, StatusEffect::SlowFalling))
    );

    host.join();
    let fresh = host.orchestrator();
    assert_ne!(fresh.session_id(), first_session);
    assert!(fresh.current_events().is_empty());
    assert_eq!(fresh.chaos_timer(), 10_000);
}

// ---------------------------------------------------------------------------
// Operator surface
// ---------------------------------------------------------------------------

#[test]
fn ending_twice_broadcasts_once() {
    let mut host = Host::new(quiet_config());
    let a = host.join();
    host.run("low_gravity").unwrap();
    assert!(host.end(0).unwrap());
    assert!(!host.end(0).unwrap());
    let ended = host.wire.to(a).into_iter().filter(|m| m.label() == "event_ended").count();
    assert_eq!(ended, 1);
}

#[test]
fn clear_past_events_broadcasts_remove_ended() {
    let mut host = Host::new(quiet_config());
    let a = host.join();
    host.run("heal_all").unwrap();
    host.tick(1);
    assert_eq!(host.session.clear_past_events(&mut host.wire).unwrap(), 1);
    assert_eq!(host.wire.labels_to(a).last(), Some(&"remove_ended"));
    assert!(host.orchestrator().current_events().is_empty());
}

#[test]
fn forced_end_reaches_the_right_event_on_a_lagging_mirror() {
    let mut host = Host::new(quiet_config());
    let a = host.join();
    let mut mirror = ClientMirror::with_seed(Arc::clone(host.session.registry()), 3);
    let mut delivered = 0_usize;
    let mut deliver = |host: &Host, mirror: &mut ClientMirror| {
        let pending = host.wire.to(a);
        for message in pending.into_iter().skip(delivered) {
            mirror.apply(message, &mut Screen).unwrap();
            delivered = delivered.saturating_add(1);
        }
    };
    deliver(&host, &mut mirror);

    host.run("invisible_hostile_mobs").unwrap();
    host.run("low_gravity").unwrap();
    deliver(&host, &mut mirror);

    // The host ends the first event; the mirror is one tick behind.
    host.tick(20);
    for _ in 0..19 {
        mirror.tick(&mut Screen);
    }
    host.session.clear_past_events(&mut host.wire).unwrap();
    assert!(host.end(0).unwrap());
    deliver(&host, &mut mirror);

    let host_view: Vec<_> = host
        .orchestrator()
        .current_events()
        .iter()
        .map(|e| (e.id(), e.has_ended()))
        .collect();
    assert_eq!(host_view, vec![("low_gravity", true)]);

    let local: Vec<_> = mirror.events().iter().map(|e| (e.id(), e.has_ended())).collect();
    assert_eq!(local, vec![("invisible_hostile_mobs", false), ("low_gravity", true)]);

    // The lagging event finishes on the mirror's own clock.
    assert_eq!(mirror.tick(&mut Screen), 1);
    assert!(mirror.events().iter().all(chaos_events::Event::has_ended));
}

#[test]
fn ineligible_manual_run_leaves_state_untouched() {
    let mut config = quiet_config();
    config.environment.accessibility_mode = true;
    let mut host = Host::new(config);
    let a = host.join();
    let before = host.wire.sent.len();
    let err = host.run("random_camera_tilt").unwrap_err();
    assert!(matches!(err, SessionError::Ineligible(_)));
    assert_eq!(host.wire.sent.len(), before);
    assert!(host.orchestrator().current_events().is_empty());
    assert!(host.wire.to(a).iter().all(|m| m.label() != "event_started"));
}

#[test]
fn shutdown_ends_everything() {
    let mut host = Host::new(quiet_config());
    host.join();
    host.run("low_gravity").unwrap();
    host.session.shutdown(&mut host.world);
    assert!(host.session.orchestrator().is_none());
    assert_eq!(host.world.cleared.len(), 1);
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

fn instant(id: &'static str) -> EventDescriptor {
    EventDescriptor {
        id,
        display_key: id,
        category: Category::None,
        weight: 1,
        timing: Timing::Instant,
        eligibility: |_| true,
        factory: || EventKind::HealAll(HealAll),
    }
}

#[test]
fn repeat_window_is_respected() {
    let mut registry = EventRegistry::new();
    for id in ["a", "b", "c", "d", "e"] {
        registry.register(instant(id)).unwrap();
    }
    let mut config = quiet_config();
    config.chaos.timer_duration = 1;
    config.chaos.repeat_window = 3;
    let mut host = Host::with_registry(registry, config);
    let a = host.join();
    host.tick(60);

    let started: Vec<String> = host
        .wire
        .to(a)
        .into_iter()
        .filter_map(|m| match m {
            ServerMessage::EventStarted { event_id, .. } => Some(event_id),
            _ => None,
        })
        .collect();
    assert_eq!(started.len(), 60);
    for window in started.windows(4) {
        let distinct: BTreeSet<_> = window.iter().collect();
        assert_eq!(distinct.len(), 4, "repeat inside window: {window:?}");
    }
}

#[test]
fn active_category_is_not_drawn_twice() {
    let mut config = quiet_config();
    config.chaos.timer_duration = 1;
    config.chaos.base_event_duration = 1_000;
    config.chaos.repeat_window = 0;
    let mut host = Host::new(config);
    host.join();
    // Five categories, all long-lived except heal_all: the first five
    // selections can never share a category with a live event.
    host.tick(4);
    let active: Vec<_> = host
        .orchestrator()
        .current_events()
        .iter()
        .filter(|e| e.is_active())
        .map(|e| e.id())
        .collect();
    let distinct: BTreeSet<_> = active.iter().collect();
    assert_eq!(distinct.len(), active.len());
}

#[test]
fn empty_registry_never_selects() {
    let mut config = quiet_config();
    config.chaos.timer_duration = 2;
    let mut host = Host::with_registry(EventRegistry::new(), config);
    host.join();
    host.tick(10);
    assert!(host.orchestrator().current_events().is_empty());
    assert!(host.orchestrator().chaos_timer() >= 1);
}

#[test]
fn same_seed_same_schedule() {
    let schedule = || {
        let mut config = quiet_config();
        config.chaos.timer_duration = 3;
        config.chaos.timer_jitter = 2;
        let mut host = Host::new(config);
        let a = host.join();
        host.tick(90);
        host.wire.to(a)
    };
    assert_eq!(schedule(), schedule());
}

// ---------------------------------------------------------------------------
// Voting
// ---------------------------------------------------------------------------

fn voting_config() -> ChaosConfig {
    let mut config = quiet_config();
    config.chaos.timer_duration = 50;
    config.voting.enabled = true;
    config.voting.candidate_count = 4;
    config.voting.poll_window = 30;
    config
}

fn live_poll(host: &Host, participant: ParticipantId) -> (u32, Vec<String>) {
    host.wire
        .to(participant)
        .into_iter()
        .rev()
        .find_map(|m| match m {
            ServerMessage::PollOpened { poll_id, candidates } => Some((poll_id, candidates)),
            _ => None,
        })
        .unwrap()
}

fn started_events(host: &Host, participant: ParticipantId) -> Vec<String> {
    host.wire
        .to(participant)
        .into_iter()
        .filter_map(|m| match m {
            ServerMessage::EventStarted { event_id, .. } => Some(event_id),
            _ => None,
        })
        .collect()
}

#[test]
fn joiner_receives_live_poll() {
    let mut host = Host::new(voting_config());
    let a = host.join();
    assert_eq!(host.wire.labels_to(a), vec!["join_confirm", "join_sync", "poll_opened"]);
}

#[test]
fn tied_vote_goes_to_first_listed_candidate() {
    let mut host = Host::new(voting_config());
    let a = host.join();
    let b = host.join();
    let (poll_id, candidates) = live_poll(&host, a);

    host.send(a, ClientMessage::Ballot { poll_id, votes: vec![0, 0, 1, 0] }).unwrap();
    host.send(b, ClientMessage::Ballot { poll_id, votes: vec![0, 1, 0, 0] }).unwrap();
    host.tick(50);

    assert_eq!(started_events(&host, a), vec![candidates[1].clone()]);
    let (next_poll, _) = live_poll(&host, a);
    assert!(next_poll > poll_id);
}

#[test]
fn stale_ballot_is_silently_dropped() {
    let mut host = Host::new(voting_config());
    let a = host.join();
    let (poll_id, _) = live_poll(&host, a);
    host.tick(50);
    let (next_poll, candidates) = live_poll(&host, a);
    assert_ne!(poll_id, next_poll);

    host.send(a, ClientMessage::Ballot { poll_id, votes: vec![9, 0, 0, 0] }).unwrap();
    let poll = host.orchestrator().voting().unwrap().live_poll().unwrap();
    assert_eq!(poll.ballot_count(), 0);
    assert_eq!(poll.candidates().len(), candidates.len());
}

#[test]
fn malformed_ballot_is_rejected() {
    let mut host = Host::new(voting_config());
    let a = host.join();
    let (poll_id, _) = live_poll(&host, a);
    let err = host.send(a, ClientMessage::Ballot { poll_id, votes: vec![1] }).unwrap_err();
    assert!(matches!(err, SessionError::Ballot(_)));
}

#[test]
fn voting_with_same_seed_is_reproducible() {
    let run = || {
        let mut host = Host::new(voting_config());
        let a = host.join();
        host.tick(200);
        started_events(&host, a)
    };
    let first = run();
    assert_eq!(first.len(), 4);
    assert_eq!(first, run());
}
