#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::similar_names
)]

//! # Pairlink Server
//!
//! An in-memory WebSocket pairing and signaling server for anonymous
//! peer-to-peer video chat.
//!
//! No database, no cloud services. Just run the binary and connect via
//! WebSocket: clients join, enter a matching queue, and exchange WebRTC
//! signaling payloads through the server once paired.

/// Server configuration and environment variables
pub mod config;

/// Structured logging configuration
pub mod logging;

/// WebSocket message protocol definitions
pub mod protocol;

/// Per-session, per-action rate limiting
pub mod rate_limit;

/// Session registry, matchmaking, and message handling
pub mod server;

/// WebSocket handler and HTTP endpoints
pub mod websocket;
