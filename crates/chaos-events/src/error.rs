//! Error types for the `chaos-events` crate.

/// Errors raised by [`EventRegistry`](crate::EventRegistry) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A descriptor with this id is already registered.
    #[error("duplicate event id: {0}")]
    DuplicateId(String),

    /// No descriptor is registered under this id.
    #[error("unknown event: {0}")]
    UnknownEvent(String),
}
