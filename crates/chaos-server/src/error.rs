//! Error types for the host binary.

/// Top-level error for `chaos-server`.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The built-in event catalogue failed to register.
    #[error("registry error: {source}")]
    Registry {
        /// The underlying registry error.
        #[from]
        source: chaos_events::RegistryError,
    },

    /// The gateway failed to bind or serve.
    #[error("gateway error: {source}")]
    Gateway {
        /// The underlying gateway error.
        #[from]
        source: chaos_gateway::server::ServerError,
    },

    /// A background task panicked or was cancelled.
    #[error("task error: {source}")]
    Join {
        /// The underlying join error.
        #[from]
        source: tokio::task::JoinError,
    },
}
