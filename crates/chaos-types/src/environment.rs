//! The environment event eligibility is judged against.
//!
//! Eligibility predicates on event descriptors receive an [`Environment`]
//! describing where the host runs and which accessibility restrictions
//! apply to the session.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::Deployment;

/// Snapshot of the deployment facts that gate event eligibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Environment {
    /// Whether the host is dedicated or embedded in a participant's game.
    pub deployment: Deployment,
    /// Set when participants have asked for motion/visual effects to be
    /// suppressed.
    pub accessibility_restricted: bool,
}

impl Environment {
    /// Environment for a dedicated host with no restrictions.
    pub const fn dedicated() -> Self {
        Self {
            deployment: Deployment::Dedicated,
            accessibility_restricted: false,
        }
    }

    /// Environment for a host embedded in a participant's game.
    pub const fn integrated() -> Self {
        Self {
            deployment: Deployment::Integrated,
            accessibility_restricted: false,
        }
    }

    /// Return a copy with accessibility restrictions switched on.
    pub const fn with_accessibility_restricted(mut self) -> Self {
        self.accessibility_restricted = true;
        self
    }

    /// Whether the host is dedicated.
    pub const fn is_dedicated(&self) -> bool {
        matches!(self.deployment, Deployment::Dedicated)
    }
}
