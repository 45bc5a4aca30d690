//! Wire protocol
//!
//! Every request and reply carries an `Envelope`. On the WebSocket it travels
//! inside an event frame:
//!
//! ```json
//! {"event": "PUBLISH_TOPIC", "data": {"timestamp": 1700000000, "topic": "t", "payload": "hi"}}
//! ```
//!
//! Inbound `data` may also be the envelope encoded as a JSON string, or `null`
//! when the client sent nothing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::error::CommandError;

/// The single message shape used for every request and reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub timestamp: i64,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub payload: Option<String>,
}

impl Envelope {
    pub fn new(timestamp: i64, topic: Option<String>, payload: Option<String>) -> Self {
        Self {
            timestamp,
            topic,
            payload,
        }
    }

    /// A server reply: no topic, just text.
    pub fn reply(timestamp: i64, payload: impl Into<String>) -> Self {
        Self {
            timestamp,
            topic: None,
            payload: Some(payload.into()),
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Commands a client can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InboundEvent {
    SubscribeTopic,
    UnsubscribeTopic,
    PublishTopic,
    ListTopics,
    GetTopicStatus,
}

/// Signals the server sends back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboundEvent {
    /// Informational; the connection stays open for further pushes.
    PrintMessage,
    /// Terminal reply to a request.
    PrintMessageAndExit,
}

#[derive(Debug, Deserialize)]
pub struct InboundFrame {
    pub event: InboundEvent,
    #[serde(default)]
    pub data: Option<Value>,
}

impl InboundFrame {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Extracts the envelope, if any.
    ///
    /// `None` means the client sent no data at all; a value that does not
    /// decode to an envelope is `CommandError::InvalidPayload`.
    pub fn envelope(&self) -> Result<Option<Envelope>, CommandError> {
        match &self.data {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(raw)) => Envelope::decode(raw)
                .map(Some)
                .map_err(|_| CommandError::InvalidPayload),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|_| CommandError::InvalidPayload),
        }
    }
}

/// Frame a client builds to issue a command.
#[derive(Debug, Serialize)]
pub struct RequestFrame<'a> {
    pub event: InboundEvent,
    pub data: Option<&'a Envelope>,
}

impl RequestFrame<'_> {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundFrame {
    pub event: OutboundEvent,
    pub data: Envelope,
}

impl OutboundFrame {
    pub fn new(event: OutboundEvent, data: Envelope) -> Self {
        Self { event, data }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn is_terminal(&self) -> bool {
        self.event == OutboundEvent::PrintMessageAndExit
    }
}
