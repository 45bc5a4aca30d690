//! Command-line client
//!
//! Connects to a running server, issues a single command and prints every
//! payload it receives. Terminal replies end the session; after a subscribe
//! the client keeps listening for pushed updates until the server closes the
//! connection.

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tracing::debug;
use tungstenite::protocol::Message as WsMessage;

use crate::transport::message::{Envelope, InboundEvent, OutboundFrame, RequestFrame};
use crate::utils::error::ServerError;

/// One command as issued from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Subscribe { topic: String },
    Unsubscribe { topic: String },
    Publish { topic: String, message: String },
    List,
    Status { topic: String },
}

impl Request {
    pub fn event(&self) -> InboundEvent {
        match self {
            Request::Subscribe { .. } => InboundEvent::SubscribeTopic,
            Request::Unsubscribe { .. } => InboundEvent::UnsubscribeTopic,
            Request::Publish { .. } => InboundEvent::PublishTopic,
            Request::List => InboundEvent::ListTopics,
            Request::Status { .. } => InboundEvent::GetTopicStatus,
        }
    }

    pub fn envelope(&self, timestamp: i64) -> Envelope {
        let (topic, payload) = match self {
            Request::Subscribe { topic }
            | Request::Unsubscribe { topic }
            | Request::Status { topic } => (Some(topic.clone()), None),
            Request::Publish { topic, message } => (Some(topic.clone()), Some(message.clone())),
            Request::List => (None, None),
        };
        Envelope::new(timestamp, topic, payload)
    }

    /// The text frame sent over the socket.
    pub fn to_frame(&self, timestamp: i64) -> Result<String, serde_json::Error> {
        let envelope = self.envelope(timestamp);
        RequestFrame {
            event: self.event(),
            data: Some(&envelope),
        }
        .encode()
    }
}

/// Runs `request` against `url`, handing every received payload to
/// `on_message`. Returns once a terminal reply arrives or the server closes.
pub async fn run_client<F>(url: &str, request: &Request, mut on_message: F) -> Result<(), ServerError>
where
    F: FnMut(&OutboundFrame),
{
    let (mut ws_stream, _response) = connect_async(url).await?;

    let frame = request.to_frame(chrono::Utc::now().timestamp())?;
    ws_stream.send(WsMessage::text(frame)).await?;

    while let Some(msg) = ws_stream.next().await {
        let text = match msg? {
            WsMessage::Text(text) => text,
            WsMessage::Close(_) => break,
            other => {
                debug!("ignoring non-text frame: {other:?}");
                continue;
            }
        };
        let frame = OutboundFrame::decode(text.as_str())?;
        on_message(&frame);
        if frame.is_terminal() {
            break;
        }
    }

    let _ = ws_stream.close(None).await;
    Ok(())
}
