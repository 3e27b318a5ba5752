//! Scheduling, voting, session lifecycle, and the control loop for the
//! Chaos session orchestrator.
//!
//! One host runs a [`Session`]. The first participant to complete the
//! version handshake creates an [`Orchestrator`], which counts down to the
//! next event selection, ticks the active events, and mirrors every state
//! change to participants through the [`Outbound`] sink. The last
//! participant to leave tears it down again.
//!
//! # Modules
//!
//! - [`client`] -- [`ClientMirror`]: the participant-side replica.
//! - [`config`] -- Configuration loading from `chaos-config.yaml`.
//! - [`error`] -- [`SessionError`].
//! - [`operator`] -- Operator commands, status snapshots, the catalogue.
//! - [`orchestrator`] -- The per-session scheduler.
//! - [`outbound`] -- The host-to-participant push trait.
//! - [`runner`] -- The tokio control loop that owns the session.
//! - [`selection`] -- Eligibility, anti-repeat, and weighted draws.
//! - [`session`] -- Handshake, leave, and inbound dispatch.
//! - [`voting`] -- Polls and ballots.
//!
//! [`ClientMirror`]: client::ClientMirror
//! [`SessionError`]: error::SessionError

pub mod client;
pub mod config;
pub mod error;
pub mod operator;
pub mod orchestrator;
pub mod outbound;
pub mod runner;
pub mod selection;
pub mod session;
pub mod voting;

pub use orchestrator::{Orchestrator, TickSummary};
pub use outbound::Outbound;
pub use session::{HostIo, Session};
