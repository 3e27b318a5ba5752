//! The event registry: a static catalogue of event variants.
//!
//! Populated once at process start and read-only afterwards. Lookup is by
//! stable string id; [`EventRegistry::eligible_ids`] filters the catalogue
//! against an [`Environment`] for both random draws and poll candidates.
//! Iteration order is sorted by id, so seeded draws are reproducible.

use std::collections::BTreeMap;

use chaos_types::{Category, Environment};
use tracing::debug;

use crate::error::RegistryError;
use crate::event::{Event, Timing};
use crate::variants::{
    EventKind, HealAll, InvisibleHostileMobs, LowGravity, RandomCameraTilt, Stuttering,
};

/// Immutable description of one event variant.
#[derive(Clone, Copy)]
pub struct EventDescriptor {
    /// Stable registry key; also the wire id.
    pub id: &'static str,
    /// Translation key for the display name.
    pub display_key: &'static str,
    /// Shared resource the variant interferes with.
    pub category: Category,
    /// Relative weight in random draws. Zero never draws.
    pub weight: u32,
    /// How the duration is derived.
    pub timing: Timing,
    /// Whether the variant may run in a given environment.
    pub eligibility: fn(&Environment) -> bool,
    /// Builds a fresh variant payload.
    pub factory: fn() -> EventKind,
}

impl EventDescriptor {
    /// Whether this variant may run in `env`.
    pub fn is_eligible(&self, env: &Environment) -> bool {
        (self.eligibility)(env)
    }

    /// Build a pending event of this variant.
    pub fn instantiate(&self, base_event_duration: u16) -> Event {
        Event::new(
            self.id,
            (self.factory)(),
            self.timing.resolve(base_event_duration),
        )
    }
}

impl core::fmt::Debug for EventDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventDescriptor")
            .field("id", &self.id)
            .field("display_key", &self.display_key)
            .field("category", &self.category)
            .field("weight", &self.weight)
            .field("timing", &self.timing)
            .finish_non_exhaustive()
    }
}

/// Catalogue of every registered event variant, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct EventRegistry {
    descriptors: BTreeMap<&'static str, EventDescriptor>,
}

impl EventRegistry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            descriptors: BTreeMap::new(),
        }
    }

    /// Create a registry holding every built-in variant.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateId`] if two built-ins share an id.
    pub fn builtin() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for descriptor in builtin_descriptors() {
            registry.register(descriptor)?;
        }
        Ok(registry)
    }

    /// Insert a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateId`] if the id is already taken;
    /// the registry is left unchanged.
    pub fn register(&mut self, descriptor: EventDescriptor) -> Result<(), RegistryError> {
        if self.descriptors.contains_key(descriptor.id) {
            return Err(RegistryError::DuplicateId(descriptor.id.to_owned()));
        }
        debug!(id = descriptor.id, "Registered event");
        self.descriptors.insert(descriptor.id, descriptor);
        Ok(())
    }

    /// Look up a descriptor by id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownEvent`] if nothing is registered
    /// under `id`.
    pub fn get(&self, id: &str) -> Result<&EventDescriptor, RegistryError> {
        self.descriptors
            .get(id)
            .ok_or_else(|| RegistryError::UnknownEvent(id.to_owned()))
    }

    /// Build a pending event of the variant registered under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownEvent`] if `id` is not registered.
    pub fn instantiate(&self, id: &str, base_event_duration: u16) -> Result<Event, RegistryError> {
        Ok(self.get(id)?.instantiate(base_event_duration))
    }

    /// Every descriptor whose eligibility predicate holds for `env`.
    ///
    /// The iterator is lazy, finite, and restartable via `Clone`.
    pub fn eligible(
        &self,
        env: Environment,
    ) -> impl Iterator<Item = &EventDescriptor> + Clone + '_ {
        self.descriptors
            .values()
            .filter(move |descriptor| descriptor.is_eligible(&env))
    }

    /// Ids of every variant eligible in `env`.
    pub fn eligible_ids(&self, env: Environment) -> impl Iterator<Item = &'static str> + Clone + '_ {
        self.eligible(env).map(|descriptor| descriptor.id)
    }

    /// Every registered descriptor, sorted by id.
    pub fn descriptors(&self) -> impl Iterator<Item = &EventDescriptor> + '_ {
        self.descriptors.values()
    }

    /// Number of registered variants.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Built-in catalogue
// ---------------------------------------------------------------------------

const fn always(_env: &Environment) -> bool {
    true
}

/// Camera motion is suppressed under accessibility mode.
const fn without_accessibility_restriction(env: &Environment) -> bool {
    !env.accessibility_restricted
}

/// Stalling an integrated host freezes the local player's own game.
const fn dedicated_only(env: &Environment) -> bool {
    env.is_dedicated()
}

fn builtin_descriptors() -> [EventDescriptor; 5] {
    [
        EventDescriptor {
            id: "invisible_hostile_mobs",
            display_key: "chaos.events.invisible_hostile_mobs",
            category: Category::Visibility,
            weight: 10,
            timing: Timing::BaseDuration,
            eligibility: always,
            factory: || EventKind::InvisibleHostileMobs(InvisibleHostileMobs),
        },
        EventDescriptor {
            id: "random_camera_tilt",
            display_key: "chaos.events.random_camera_tilt",
            category: Category::Camera,
            weight: 10,
            timing: Timing::BaseDuration,
            eligibility: without_accessibility_restriction,
            factory: || EventKind::RandomCameraTilt(RandomCameraTilt::default()),
        },
        EventDescriptor {
            id: "stuttering",
            display_key: "chaos.events.stuttering",
            category: Category::Tempo,
            weight: 4,
            timing: Timing::BaseDuration,
            eligibility: dedicated_only,
            factory: || EventKind::Stuttering(Stuttering),
        },
        EventDescriptor {
            id: "low_gravity",
            display_key: "chaos.events.low_gravity",
            category: Category::Movement,
            weight: 8,
            timing: Timing::Fixed(400),
            eligibility: always,
            factory: || EventKind::LowGravity(LowGravity),
        },
        EventDescriptor {
            id: "heal_all",
            display_key: "chaos.events.heal_all",
            category: Category::Health,
            weight: 6,
            timing: Timing::Instant,
            eligibility: always,
            factory: || EventKind::HealAll(HealAll),
        },
    ]
}
