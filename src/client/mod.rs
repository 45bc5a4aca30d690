//! The `client` module covers both ends of a connection.
//!
//! - `pubsub_client`: the server-side view of a connected client (`Client`,
//!   `SessionId`) and the `SessionTable` used for addressed delivery.
//! - `remote`: a small command-line client that issues one command against a
//!   running server and prints what comes back.

pub mod pubsub_client;
pub mod remote;

pub use pubsub_client::{Client, SessionId, SessionTable};
