//! # roundtable
//!
//! Client library and terminal front end for multi-persona AI chat rooms.
//!
//! A user sends a question to a chosen set of roles (creator, critic,
//! analyst, researcher, ...). The backend runs a moderated multi-round
//! discussion and records every reply in the room's history. This crate
//! provides:
//!
//! - [`api`]: the HTTP contract and a `reqwest` client.
//! - [`processing`]: the process-wide "round in flight" flag.
//! - [`coordinator`]: the per-room submit/poll state machine.
//! - [`moderator`]: decoding of the moderator's JSON decisions into text.
//! - [`roles`], [`config`], [`error`]: supporting types.

pub mod api;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod moderator;
pub mod processing;
pub mod roles;

pub use api::{ChatApi, HttpChatApi};
pub use config::ClientConfig;
pub use coordinator::{RoomCoordinator, RoomEvent, RoomPhase, SubmitOutcome};
pub use error::RoundtableError;
pub use moderator::{format_moderator_message, ModeratorDecision};
pub use processing::ProcessingStore;
pub use roles::RoleSelection;
