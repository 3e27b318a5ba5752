//! Participant voting on the next event.
//!
//! Each poll offers a handful of candidates drawn from the eligible pool.
//! Participants submit a weight per candidate; the highest tally wins and
//! ties go to the earliest-listed candidate. A poll with no votes at all
//! falls back to an ordinary weighted draw among its candidates.

use std::collections::{BTreeMap, BTreeSet};

use chaos_events::EventRegistry;
use chaos_types::{ParticipantId, ServerMessage};
use rand::Rng;
use tracing::{debug, info};

use crate::config::VotingConfig;
use crate::selection::weighted_pick;

/// Why a ballot was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BallotError {
    /// Voting is disabled or no poll has been opened yet.
    #[error("no poll is open")]
    NoPoll,

    /// The ballot names a poll that is no longer live.
    #[error("ballot for poll {received} but poll {live} is live")]
    Stale {
        /// Poll id on the ballot.
        received: u32,
        /// Id of the live poll.
        live: u32,
    },

    /// The live poll has already been decided.
    #[error("poll {0} is already closed")]
    PollClosed(u32),

    /// The ballot does not carry one weight per candidate.
    #[error("ballot has {received} weights, poll has {expected} candidates")]
    Malformed {
        /// Weights on the ballot.
        received: usize,
        /// Candidates in the poll.
        expected: usize,
    },
}

/// One vote between candidate events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poll {
    id: u32,
    candidates: Vec<&'static str>,
    ballots: BTreeMap<ParticipantId, Vec<u32>>,
    remaining_ticks: u16,
    winner: Option<&'static str>,
}

impl Poll {
    /// Monotonic poll id.
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Candidate event ids, in ballot order.
    pub fn candidates(&self) -> &[&'static str] {
        &self.candidates
    }

    /// Whether ballots are still accepted.
    pub const fn is_open(&self) -> bool {
        self.winner.is_none()
    }

    /// Ticks left before the poll closes on its own.
    pub const fn remaining_ticks(&self) -> u16 {
        self.remaining_ticks
    }

    /// The decided winner, once closed.
    pub const fn winner(&self) -> Option<&'static str> {
        self.winner
    }

    /// Number of participants who have voted.
    pub fn ballot_count(&self) -> usize {
        self.ballots.len()
    }

    /// Summed weight per candidate, in ballot order.
    pub fn tally(&self) -> Vec<u64> {
        let mut totals = vec![0_u64; self.candidates.len()];
        for votes in self.ballots.values() {
            for (total, vote) in totals.iter_mut().zip(votes) {
                *total = total.saturating_add(u64::from(*vote));
            }
        }
        totals
    }

    /// The announcement sent to participants.
    pub fn opened_message(&self) -> ServerMessage {
        ServerMessage::PollOpened {
            poll_id: self.id,
            candidates: self.candidates.iter().map(|c| (*c).to_owned()).collect(),
        }
    }

    fn everyone_voted(&self, roster: &BTreeSet<ParticipantId>) -> bool {
        !roster.is_empty() && roster.iter().all(|p| self.ballots.contains_key(p))
    }

    fn decide<R: Rng + ?Sized>(&self, registry: &EventRegistry, rng: &mut R) -> Option<&'static str> {
        let tally = self.tally();
        let best = tally.iter().copied().max().unwrap_or(0);
        if best > 0 {
            // First maximum in ballot order wins ties.
            return tally
                .iter()
                .position(|t| *t == best)
                .and_then(|i| self.candidates.get(i).copied());
        }
        let pool: Vec<_> = self
            .candidates
            .iter()
            .filter_map(|id| registry.get(id).ok())
            .collect();
        weighted_pick(&pool, rng).map(|d| d.id)
    }
}

/// Poll bookkeeping for one session.
#[derive(Debug, Clone)]
pub struct Voting {
    next_poll_id: u32,
    candidate_count: usize,
    poll_window: u16,
    poll: Option<Poll>,
}

impl Voting {
    /// Create voting state with no poll open.
    pub const fn new(config: &VotingConfig) -> Self {
        Self {
            next_poll_id: 1,
            candidate_count: config.candidate_count,
            poll_window: config.poll_window,
            poll: None,
        }
    }

    /// How many candidates each poll should offer.
    pub const fn candidate_count(&self) -> usize {
        self.candidate_count
    }

    /// Configured poll length in ticks.
    pub const fn poll_window(&self) -> u16 {
        self.poll_window
    }

    /// The current poll, open or decided.
    pub const fn poll(&self) -> Option<&Poll> {
        self.poll.as_ref()
    }

    /// The current poll if it still accepts ballots.
    pub fn live_poll(&self) -> Option<&Poll> {
        self.poll.as_ref().filter(|p| p.is_open())
    }

    /// Open a new poll, replacing any previous one.
    pub fn open(&mut self, candidates: Vec<&'static str>, window: u16) -> &Poll {
        let id = self.next_poll_id;
        self.next_poll_id = self.next_poll_id.saturating_add(1);
        info!(poll_id = id, ?candidates, window, "Poll opened");
        self.poll.insert(Poll {
            id,
            candidates,
            ballots: BTreeMap::new(),
            remaining_ticks: window.max(1),
            winner: None,
        })
    }

    /// Record (or replace) a participant's ballot.
    pub fn submit(
        &mut self,
        participant: ParticipantId,
        poll_id: u32,
        votes: &[u32],
    ) -> Result<(), BallotError> {
        let poll = self.poll.as_mut().ok_or(BallotError::NoPoll)?;
        if poll.id != poll_id {
            return Err(BallotError::Stale {
                received: poll_id,
                live: poll.id,
            });
        }
        if !poll.is_open() {
            return Err(BallotError::PollClosed(poll.id));
        }
        if votes.len() != poll.candidates.len() {
            return Err(BallotError::Malformed {
                received: votes.len(),
                expected: poll.candidates.len(),
            });
        }
        poll.ballots.insert(participant, votes.to_vec());
        debug!(poll_id, participant = %participant, "Ballot recorded");
        Ok(())
    }

    /// Drop a departed participant's ballot from the live poll.
    pub fn withdraw(&mut self, participant: ParticipantId) {
        if let Some(poll) = self.poll.as_mut().filter(|p| p.is_open()) {
            poll.ballots.remove(&participant);
        }
    }

    /// Advance the live poll by one tick, closing it when its window runs
    /// out or every roster member has voted. Returns the winner if the poll
    /// closed on this tick.
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        roster: &BTreeSet<ParticipantId>,
        registry: &EventRegistry,
        rng: &mut R,
    ) -> Option<&'static str> {
        let poll = self.poll.as_mut().filter(|p| p.is_open())?;
        poll.remaining_ticks = poll.remaining_ticks.saturating_sub(1);
        if poll.remaining_ticks == 0 || poll.everyone_voted(roster) {
            return self.close(registry, rng);
        }
        None
    }

    /// Close the live poll now. Returns its winner, or `None` if there was
    /// no open poll or no candidate could be chosen.
    pub fn close<R: Rng + ?Sized>(
        &mut self,
        registry: &EventRegistry,
        rng: &mut R,
    ) -> Option<&'static str> {
        let poll = self.poll.as_mut().filter(|p| p.is_open())?;
        let winner = poll.decide(registry, rng)?;
        poll.winner = Some(winner);
        poll.remaining_ticks = 0;
        info!(poll_id = poll.id, winner, ballots = poll.ballots.len(), tally = ?poll.tally(), "Poll closed");
        Some(winner)
    }

    /// Close the poll if needed and take its winner, leaving no poll.
    pub fn conclude<R: Rng + ?Sized>(
        &mut self,
        registry: &EventRegistry,
        rng: &mut R,
    ) -> Option<&'static str> {
        self.close(registry, rng);
        self.poll.take().and_then(|p| p.winner)
    }

    /// Drop the current poll without deciding it.
    pub fn discard(&mut self) {
        self.poll = None;
    }
}
