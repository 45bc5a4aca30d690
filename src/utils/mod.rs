//! The `utils` module provides utilities shared across the `beatsub` application:
//! the error types surfaced by the broker and the server, and logging setup.

pub mod error;
pub mod logging;
