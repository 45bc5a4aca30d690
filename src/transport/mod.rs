//! The `transport` module handles network communication with clients over
//! WebSockets.
//!
//! It defines the wire protocol (`message`) and the server that accepts
//! connections and forwards their frames to the broker (`websocket`).

pub mod message;
pub mod websocket;

pub use message::{Envelope, InboundEvent, OutboundEvent, OutboundFrame};
pub use websocket::{bind, serve, start_websocket_server};

#[cfg(test)]
mod tests;
#[cfg(test)]
mod websocket_tests;
