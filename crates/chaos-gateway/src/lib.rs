//! Network surface for the Chaos session orchestrator.
//!
//! Participants connect over a `WebSocket` and exchange JSON-encoded
//! protocol messages. Operators drive the session through a small REST
//! API. Neither touches session state directly: every request becomes a
//! message to the control thread in [`chaos_core::runner`].
//!
//! # Modules
//!
//! - [`error`] -- [`GatewayError`] with its HTTP mapping.
//! - [`operator`] -- Operator REST handlers.
//! - [`router`] -- Route table.
//! - [`server`] -- Bind and serve.
//! - [`state`] -- Channels shared by all handlers.
//! - [`ws`] -- The participant `WebSocket` endpoint.
//!
//! [`GatewayError`]: error::GatewayError

pub mod error;
pub mod operator;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;
