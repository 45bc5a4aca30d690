//! Connected clients
//!
//! `Client` models one WebSocket connection: its opaque `SessionId`, the
//! sending side of the per-connection channel drained by the writer task, and
//! the peer address recorded at connect time. `SessionTable` is the
//! transport-owned side table the broker uses for addressed sends.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use crate::transport::message::{Envelope, OutboundEvent, OutboundFrame};

/// Opaque per-connection identity. Only ever compared and hashed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(format!("client-{}", Uuid::new_v4()))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for SessionId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for SessionId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug)]
pub struct Client {
    pub id: SessionId,
    pub sender: UnboundedSender<WsMessage>,
    /// Peer address, when the transport knows it.
    pub origin: Option<String>,
}

impl Client {
    /// Create a new client with a fresh session id.
    pub fn new(sender: UnboundedSender<WsMessage>) -> Self {
        Self {
            id: SessionId::new(),
            sender,
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }
}

/// Live sessions, keyed by id.
#[derive(Debug, Default)]
pub struct SessionTable {
    clients: Mutex<HashMap<SessionId, Client>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn clients(&self) -> MutexGuard<'_, HashMap<SessionId, Client>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, client: Client) {
        debug!("registered session {}", client.id);
        self.clients().insert(client.id.clone(), client);
    }

    pub fn remove(&self, id: &SessionId) -> Option<Client> {
        self.clients().remove(id)
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.clients().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.clients().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients().is_empty()
    }

    pub fn origin(&self, id: &SessionId) -> Option<String> {
        self.clients().get(id).and_then(|c| c.origin.clone())
    }

    /// Fire-and-forget addressed send. Failures are logged, never retried.
    pub fn send(&self, id: &SessionId, event: OutboundEvent, envelope: Envelope) {
        let text = match OutboundFrame::new(event, envelope).encode() {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize frame for {id}: {e}");
                return;
            }
        };

        match self.clients().get(id) {
            Some(client) => {
                if let Err(e) = client.sender.send(WsMessage::text(text)) {
                    warn!("Failed to send to {id}: {e}");
                }
            }
            None => warn!("No client registered with id: {id}"),
        }
    }

    /// Sends the same frame to every listed session.
    pub fn broadcast<'a, I>(&self, ids: I, event: OutboundEvent, envelope: &Envelope)
    where
        I: IntoIterator<Item = &'a SessionId>,
    {
        for id in ids {
            self.send(id, event, envelope.clone());
        }
    }
}
