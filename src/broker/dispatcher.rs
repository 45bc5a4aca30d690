//! Command dispatcher
//!
//! Routes each inbound event to its handler. Every request gets exactly one
//! reply addressed to the requesting session; a successful publish also pushes
//! the update to the topic's subscribers.
//!
//! Validation runs before any handler and stops at the first failing check:
//! envelope present, then `topic` present, then (publish only) `payload`
//! present. A failed check becomes a terminal reply whose text is the
//! `CommandError` message. Nothing here returns an error to the transport.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::broker::registry::{SubscribeOutcome, TopicRegistry, UnsubscribeOutcome};
use crate::broker::topic::{Topic, format_timestamp};
use crate::client::{SessionId, SessionTable};
use crate::transport::message::{Envelope, InboundEvent, InboundFrame, OutboundEvent};
use crate::utils::error::CommandError;

/// Envelope that passed the topic checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicRequest {
    pub topic: String,
}

impl TopicRequest {
    pub fn validate(envelope: Option<Envelope>) -> Result<Self, CommandError> {
        let Envelope { topic, .. } = envelope.ok_or(CommandError::MissingEnvelope)?;
        let topic = topic.ok_or(CommandError::MissingTopic)?;
        Ok(Self { topic })
    }
}

/// Envelope that passed the topic and message checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub timestamp: i64,
    pub topic: String,
    pub payload: String,
}

impl PublishRequest {
    pub fn validate(envelope: Option<Envelope>) -> Result<Self, CommandError> {
        let Envelope {
            timestamp,
            topic,
            payload,
        } = envelope.ok_or(CommandError::MissingEnvelope)?;
        let topic = topic.ok_or(CommandError::MissingTopic)?;
        let payload = payload.ok_or(CommandError::MissingMessage)?;
        Ok(Self {
            timestamp,
            topic,
            payload,
        })
    }
}

/// Reply to the requesting session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub event: OutboundEvent,
    pub text: String,
}

impl Reply {
    fn info(text: impl Into<String>) -> Self {
        Self {
            event: OutboundEvent::PrintMessage,
            text: text.into(),
        }
    }

    fn terminal(text: impl Into<String>) -> Self {
        Self {
            event: OutboundEvent::PrintMessageAndExit,
            text: text.into(),
        }
    }
}

pub struct Dispatcher {
    registry: Arc<TopicRegistry>,
    sessions: Arc<SessionTable>,
}

impl Dispatcher {
    pub fn new(registry: Arc<TopicRegistry>, sessions: Arc<SessionTable>) -> Self {
        Self { registry, sessions }
    }

    pub fn registry(&self) -> &Arc<TopicRegistry> {
        &self.registry
    }

    /// Entry point for a raw text frame from the transport.
    pub fn handle_text(&self, session: &SessionId, text: &str) {
        match InboundFrame::parse(text) {
            Ok(frame) => self.handle(session, frame.event, frame.envelope()),
            Err(err) => {
                warn!(
                    "Invalid client message from {session}: {err} | {}",
                    text.chars().take(100).collect::<String>()
                );
            }
        }
    }

    pub fn handle(
        &self,
        session: &SessionId,
        event: InboundEvent,
        envelope: Result<Option<Envelope>, CommandError>,
    ) {
        self.handle_at(session, event, envelope, chrono::Utc::now().timestamp());
    }

    /// Same as `handle`, with the server clock supplied by the caller.
    pub fn handle_at(
        &self,
        session: &SessionId,
        event: InboundEvent,
        envelope: Result<Option<Envelope>, CommandError>,
        now: i64,
    ) {
        debug!("{session} -> {event:?}");

        let mut published = None;
        let reply = match envelope {
            Err(err) => Reply::terminal(err.to_string()),
            Ok(envelope) => {
                let result = match event {
                    InboundEvent::SubscribeTopic => TopicRequest::validate(envelope)
                        .and_then(|req| self.subscribe(session, req, now)),
                    InboundEvent::UnsubscribeTopic => TopicRequest::validate(envelope)
                        .and_then(|req| self.unsubscribe(session, req)),
                    InboundEvent::PublishTopic => {
                        PublishRequest::validate(envelope).and_then(|req| {
                            let topic = self.publish(session, req)?;
                            let text = format!("Successfully published message to {}.", topic.name);
                            published = Some(topic);
                            Ok(Reply::terminal(text))
                        })
                    }
                    InboundEvent::ListTopics => Ok(self.list_topics()),
                    InboundEvent::GetTopicStatus => {
                        TopicRequest::validate(envelope).and_then(|req| self.topic_status(req))
                    }
                };
                result.unwrap_or_else(|err| Reply::terminal(err.to_string()))
            }
        };

        self.sessions
            .send(session, reply.event, Envelope::reply(now, reply.text));

        if let Some(topic) = published {
            broadcast_update(&self.registry, &self.sessions, &topic.name, now);
        }
    }

    fn subscribe(
        &self,
        session: &SessionId,
        req: TopicRequest,
        now: i64,
    ) -> Result<Reply, CommandError> {
        let topic = req.topic;
        let reply = match self
            .registry
            .subscribe_or_create(&topic, session.clone(), now)
        {
            SubscribeOutcome::Created => {
                info!("{session} created and subscribed to {topic}");
                format!("Created {topic} and successfully subscribed.")
            }
            SubscribeOutcome::Subscribed => {
                info!("{session} subscribed to {topic}");
                format!("Successfully subscribed to {topic}.")
            }
            SubscribeOutcome::AlreadySubscribed => format!("Already subscribed to {topic}."),
        };
        Ok(Reply::info(reply))
    }

    fn unsubscribe(&self, session: &SessionId, req: TopicRequest) -> Result<Reply, CommandError> {
        let topic = req.topic;
        let Some(existing) = self.registry.lookup(&topic) else {
            return Err(CommandError::NotFound(topic));
        };
        if !existing.is_subscribed(session) {
            return Ok(Reply::terminal(format!("Not subscribed to {topic}.")));
        }

        match self.registry.unsubscribe(&topic, session) {
            Ok(UnsubscribeOutcome::Unsubscribed) => {
                info!("{session} unsubscribed from {topic}");
            }
            Ok(UnsubscribeOutcome::TopicRemoved) => {
                info!("{session} unsubscribed from {topic}; topic removed");
            }
            Ok(UnsubscribeOutcome::NotSubscribed) => {
                return Ok(Reply::terminal(format!("Not subscribed to {topic}.")));
            }
            Err(_) => return Err(CommandError::NotFound(topic)),
        }
        Ok(Reply::terminal(format!(
            "Successfully unsubscribed from {topic}."
        )))
    }

    fn publish(&self, session: &SessionId, req: PublishRequest) -> Result<Topic, CommandError> {
        let PublishRequest {
            timestamp,
            topic,
            payload,
        } = req;
        match self.registry.publish(&topic, timestamp, payload) {
            Ok(updated) => {
                info!("{session} published to {topic}");
                Ok(updated)
            }
            Err(_) => Err(CommandError::NotFound(topic)),
        }
    }

    fn list_topics(&self) -> Reply {
        let mut text = String::from("All topics on the server:");
        for name in self.registry.list() {
            text.push('\n');
            text.push_str(&name);
        }
        Reply::terminal(text)
    }

    fn topic_status(&self, req: TopicRequest) -> Result<Reply, CommandError> {
        let topic = self
            .registry
            .lookup(&req.topic)
            .ok_or(CommandError::NotFound(req.topic))?;
        Ok(Reply::terminal(self.status_text(&topic)))
    }

    fn status_text(&self, topic: &Topic) -> String {
        let subscribers: String = topic
            .subscribers
            .iter()
            .map(|id| {
                let shown = self.sessions.origin(id).unwrap_or_else(|| id.to_string());
                format!("\n\t{shown}")
            })
            .collect();

        match (&topic.content, topic.last_publish_timestamp) {
            (Some(content), Some(ts)) => format!(
                "\ntopic name:\t{}\n\ntimestamp:\t{}\n\ncontent:\t{}\n\nsubscribers:{}",
                topic.name,
                format_timestamp(ts),
                content,
                subscribers
            ),
            _ => format!(
                "\ntopic name:\t{}\n\nsubscribers:{}\n\nThere was no publish on this topic yet.",
                topic.name, subscribers
            ),
        }
    }
}

/// Pushes the topic's current update to its subscribers and records the
/// broadcast. The text is read and sent under the registry lock, so the last
/// push a subscriber sees is always the topic's latest content. Returns the
/// number of sessions addressed.
pub fn broadcast_update(
    registry: &TopicRegistry,
    sessions: &SessionTable,
    name: &str,
    now: i64,
) -> usize {
    deliver_update(registry, sessions, name, now, None).unwrap_or(0)
}

/// Shared by publish and the heartbeat. With `stale_after` set the topic is
/// only pushed if it is still stale when the lock is taken.
pub(crate) fn deliver_update(
    registry: &TopicRegistry,
    sessions: &SessionTable,
    name: &str,
    now: i64,
    stale_after: Option<i64>,
) -> Option<usize> {
    let sent = registry.broadcast(name, now, stale_after, |text, subscribers| {
        sessions.broadcast(
            subscribers,
            OutboundEvent::PrintMessage,
            &Envelope::reply(now, text),
        );
    });
    if sent.is_none() && stale_after.is_none() {
        debug!("nothing to broadcast for {name}");
    }
    sent
}
