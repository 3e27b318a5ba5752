//! Event selection: eligibility, anti-repeat, and weighted draws.
//!
//! The pool for a draw starts from every eligible variant, minus anything
//! "already active" (an active id, or a variant sharing a category with an
//! active event), minus the anti-repeat window. If that leaves nothing,
//! exclusions are relaxed one at a time: the active exclusion goes first,
//! the repeat window last. Relaxation is logged, never an error.

use std::collections::{BTreeSet, VecDeque};

use chaos_events::{Event, EventDescriptor, EventRegistry};
use chaos_types::{Category, Environment};
use rand::Rng;
use tracing::warn;

/// The most recently selected event ids, newest last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentSelections {
    window: usize,
    ids: VecDeque<&'static str>,
}

impl RecentSelections {
    /// Create an empty history remembering `window` selections.
    pub fn new(window: usize) -> Self {
        Self {
            window,
            ids: VecDeque::with_capacity(window),
        }
    }

    /// Record a selection, forgetting the oldest beyond the window.
    pub fn record(&mut self, id: &'static str) {
        if self.window == 0 {
            return;
        }
        while self.ids.len() >= self.window {
            self.ids.pop_front();
        }
        self.ids.push_back(id);
    }

    /// Whether `id` is inside the window.
    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|recent| *recent == id)
    }

    /// Remembered ids, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.ids.iter().copied()
    }

    /// Configured window size.
    pub const fn window(&self) -> usize {
        self.window
    }
}

/// What a draw must avoid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exclusions {
    /// Ids of events that are currently active.
    pub active_ids: BTreeSet<&'static str>,
    /// Categories held by active events.
    pub active_categories: BTreeSet<Category>,
    /// Recently selected ids.
    pub recent: BTreeSet<&'static str>,
}

impl Exclusions {
    /// Build exclusions from the current event list and history.
    pub fn from_state(
        registry: &EventRegistry,
        current_events: &[Event],
        recent: &RecentSelections,
    ) -> Self {
        let mut exclusions = Self {
            recent: recent.iter().collect(),
            ..Self::default()
        };
        for event in current_events.iter().filter(|e| e.is_active()) {
            exclusions.active_ids.insert(event.id());
            if let Ok(descriptor) = registry.get(event.id()) {
                if descriptor.category != Category::None {
                    exclusions.active_categories.insert(descriptor.category);
                }
            }
        }
        exclusions
    }

    fn blocks_active(&self, descriptor: &EventDescriptor) -> bool {
        self.active_ids.contains(descriptor.id)
            || self.active_categories.contains(&descriptor.category)
    }

    fn blocks_recent(&self, descriptor: &EventDescriptor) -> bool {
        self.recent.contains(descriptor.id)
    }
}

/// Which exclusions had to be dropped to fill the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relaxation {
    /// All exclusions held.
    None,
    /// Already-active variants were allowed back in.
    DroppedActive,
    /// The repeat window was ignored as well.
    DroppedRecent,
}

/// Variants a draw may choose from.
#[derive(Debug, Clone)]
pub struct CandidatePool<'r> {
    /// Drawable descriptors, in registry order.
    pub descriptors: Vec<&'r EventDescriptor>,
    /// How far the exclusions were relaxed.
    pub relaxation: Relaxation,
}

/// Build the draw pool for `env`, relaxing exclusions until non-empty.
///
/// The result is empty only when no variant is eligible at all.
pub fn candidate_pool<'r>(
    registry: &'r EventRegistry,
    env: Environment,
    exclusions: &Exclusions,
) -> CandidatePool<'r> {
    let eligible = registry.eligible(env);

    let strict: Vec<_> = eligible
        .clone()
        .filter(|d| !exclusions.blocks_active(d) && !exclusions.blocks_recent(d))
        .collect();
    if !strict.is_empty() {
        return CandidatePool {
            descriptors: strict,
            relaxation: Relaxation::None,
        };
    }

    warn!(
        active = exclusions.active_ids.len(),
        recent = exclusions.recent.len(),
        "Eligible pool empty, allowing already-active events"
    );
    let without_active: Vec<_> = eligible
        .clone()
        .filter(|d| !exclusions.blocks_recent(d))
        .collect();
    if !without_active.is_empty() {
        return CandidatePool {
            descriptors: without_active,
            relaxation: Relaxation::DroppedActive,
        };
    }

    warn!(
        recent = exclusions.recent.len(),
        "Eligible pool still empty, ignoring repeat window"
    );
    let everything: Vec<_> = eligible.collect();
    if everything.is_empty() {
        warn!(?env, "No event is eligible in this environment");
    }
    CandidatePool {
        descriptors: everything,
        relaxation: Relaxation::DroppedRecent,
    }
}

/// Draw one descriptor with probability proportional to its weight.
///
/// Zero-weight descriptors never draw unless every weight is zero, in which
/// case the draw is uniform. Returns `None` only for an empty pool.
pub fn weighted_pick<'r, R: Rng + ?Sized>(
    pool: &[&'r EventDescriptor],
    rng: &mut R,
) -> Option<&'r EventDescriptor> {
    if pool.is_empty() {
        return None;
    }
    let total: u64 = pool
        .iter()
        .fold(0_u64, |acc, d| acc.saturating_add(u64::from(d.weight)));
    if total == 0 {
        let idx = rng.random_range(0..pool.len());
        return pool.get(idx).copied();
    }

    let roll = rng.random_range(0..total);
    let mut cumulative: u64 = 0;
    for descriptor in pool {
        cumulative = cumulative.saturating_add(u64::from(descriptor.weight));
        if roll < cumulative {
            return Some(*descriptor);
        }
    }
    pool.last().copied()
}

/// Draw up to `count` distinct descriptors, each weighted as in
/// [`weighted_pick`]. The result is in draw order.
pub fn weighted_sample<'r, R: Rng + ?Sized>(
    pool: &[&'r EventDescriptor],
    count: usize,
    rng: &mut R,
) -> Vec<&'r EventDescriptor> {
    let mut remaining = pool.to_vec();
    let mut drawn = Vec::with_capacity(count.min(pool.len()));
    while drawn.len() < count {
        let Some(pick) = weighted_pick(&remaining, rng) else {
            break;
        };
        remaining.retain(|d| d.id != pick.id);
        drawn.push(pick);
    }
    drawn
}
