//! # beatsub
//!
//! `beatsub` is a minimalist, in-memory publish/subscribe server built with Rust.
//! Clients talk to it over WebSockets, subscribe to named topics, publish
//! content to them and receive pushed updates. A heartbeat periodically
//! re-sends the latest content of quiet topics so subscribers that missed an
//! update still converge.
//!
//! ## Core Modules
//!
//! - `broker`: topic registry, command dispatcher and heartbeat scheduler.
//! - `client`: connected-client bookkeeping and a small command-line client.
//! - `config`: loading server configuration from files and environment.
//! - `transport`: the wire protocol and the WebSocket server.
//! - `utils`: error types and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod transport;
pub mod utils;
