#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

//! # Quiz Royale Server
//!
//! A horizontally-scalable realtime trivia game server. Clients connect over
//! WebSocket; any number of stateless replicas coordinate through a shared
//! Redis-compatible store that doubles as the broadcast bus.

/// Bus publisher and per-replica subscriber
pub mod bus;

/// Server configuration and environment variables
pub mod config;

/// Round engine and question pool
pub mod game;

/// Admission control, room assignment and game election
pub mod lobby;

/// Structured logging configuration
pub mod logging;

/// Wire formats: bus events, client commands, room codes
pub mod protocol;

/// Question catalog types and the bootstrap loader
pub mod questions;

/// Per-replica session registry
pub mod registry;

/// Replica wiring, WebSocket transport and HTTP routes
pub mod server;

/// Shared store abstraction (Redis and in-memory backends)
pub mod store;
