//! Topic registry
//!
//! The registry owns every `Topic`. Callers never see the underlying map:
//! they get clones back from `lookup`/`snapshot` and mutate through the
//! operations below, each of which runs under one mutex. The dispatcher and
//! the heartbeat share a registry through `Arc`; the lock is never held
//! across an `.await`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::debug;

use crate::broker::topic::Topic;
use crate::client::SessionId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("topic {0} already exists")]
    AlreadyExists(String),
    #[error("topic {0} not found")]
    NotFound(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// The topic did not exist and was created with this session.
    Created,
    Subscribed,
    AlreadySubscribed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsubscribeOutcome {
    Unsubscribed,
    /// The last subscriber left and the topic was deleted.
    TopicRemoved,
    NotSubscribed,
}

#[derive(Debug, Default)]
struct Inner {
    topics: HashMap<String, Topic>,
    /// Names in order of first creation.
    order: Vec<String>,
}

impl Inner {
    fn remove_topic(&mut self, name: &str) {
        self.topics.remove(name);
        self.order.retain(|n| n != name);
    }
}

#[derive(Debug, Default)]
pub struct TopicRegistry {
    inner: Mutex<Inner>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a copy of the topic, if it exists. No side effects.
    pub fn lookup(&self, name: &str) -> Option<Topic> {
        self.inner().topics.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner().topics.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.inner().topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner().topics.is_empty()
    }

    /// Creates `name` with `session` as its only subscriber.
    pub fn create_and_subscribe(
        &self,
        name: &str,
        session: SessionId,
        now: i64,
    ) -> Result<Topic, RegistryError> {
        let mut inner = self.inner();
        if inner.topics.contains_key(name) {
            return Err(RegistryError::AlreadyExists(name.to_string()));
        }
        let topic = Topic::new(name, session, now);
        inner.topics.insert(name.to_string(), topic.clone());
        inner.order.push(name.to_string());
        debug!("created topic {name}");
        Ok(topic)
    }

    /// Adds `session` to an existing topic. A session that is already a
    /// member leaves the topic untouched.
    pub fn subscribe(
        &self,
        name: &str,
        session: SessionId,
    ) -> Result<SubscribeOutcome, RegistryError> {
        let mut inner = self.inner();
        let topic = inner
            .topics
            .get_mut(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        if topic.subscribe(session) {
            Ok(SubscribeOutcome::Subscribed)
        } else {
            Ok(SubscribeOutcome::AlreadySubscribed)
        }
    }

    /// Removes `session` from `name`, deleting the topic when it empties.
    pub fn unsubscribe(
        &self,
        name: &str,
        session: &SessionId,
    ) -> Result<UnsubscribeOutcome, RegistryError> {
        let mut inner = self.inner();
        let topic = inner
            .topics
            .get_mut(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        if !topic.unsubscribe(session) {
            return Ok(UnsubscribeOutcome::NotSubscribed);
        }
        if topic.subscribers.is_empty() {
            inner.remove_topic(name);
            debug!("removed empty topic {name}");
            return Ok(UnsubscribeOutcome::TopicRemoved);
        }
        Ok(UnsubscribeOutcome::Unsubscribed)
    }

    /// Subscribes `session` to `name`, creating the topic when it is absent.
    ///
    /// The lookup and the insert happen under one lock, so a topic deleted
    /// by a concurrent unsubscribe is simply recreated.
    pub fn subscribe_or_create(&self, name: &str, session: SessionId, now: i64) -> SubscribeOutcome {
        let mut inner = self.inner();
        match inner.topics.get_mut(name) {
            Some(topic) => {
                if topic.subscribe(session) {
                    SubscribeOutcome::Subscribed
                } else {
                    SubscribeOutcome::AlreadySubscribed
                }
            }
            None => {
                inner
                    .topics
                    .insert(name.to_string(), Topic::new(name, session, now));
                inner.order.push(name.to_string());
                debug!("created topic {name}");
                SubscribeOutcome::Created
            }
        }
    }

    /// Stores the latest content. Does not broadcast.
    pub fn publish(
        &self,
        name: &str,
        timestamp: i64,
        payload: String,
    ) -> Result<Topic, RegistryError> {
        let mut inner = self.inner();
        let topic = inner
            .topics
            .get_mut(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        topic.publish(timestamp, payload);
        Ok(topic.clone())
    }

    /// Stamps a broadcast of `name` at `now` and hands the topic's current
    /// update text and subscribers to `deliver` while the lock is held, so
    /// pushes for one topic go out in the order they were stamped.
    ///
    /// With `stale_after` set, nothing happens unless the topic is still
    /// stale at `now`. Returns the number of subscribers addressed, or `None`
    /// if the topic is gone, was never published to, or is fresh.
    pub fn broadcast<F>(
        &self,
        name: &str,
        now: i64,
        stale_after: Option<i64>,
        deliver: F,
    ) -> Option<usize>
    where
        F: FnOnce(&str, &[SessionId]),
    {
        let mut inner = self.inner();
        let topic = inner.topics.get_mut(name)?;
        if let Some(interval) = stale_after {
            if !topic.is_stale(now, interval) {
                return None;
            }
        }
        let text = topic.update_text()?;
        topic.mark_broadcast(now);
        deliver(&text, &topic.subscribers);
        Some(topic.subscribers.len())
    }

    /// Topic names in order of first creation.
    pub fn list(&self) -> Vec<String> {
        self.inner().order.clone()
    }

    /// Point-in-time copy of every topic, in registry order.
    pub fn snapshot(&self) -> Vec<Topic> {
        let inner = self.inner();
        inner
            .order
            .iter()
            .filter_map(|name| inner.topics.get(name).cloned())
            .collect()
    }

    /// Drops `session` from every topic. Returns the names of topics that
    /// were deleted because it was their last subscriber.
    pub fn remove_session(&self, session: &SessionId) -> Vec<String> {
        let mut inner = self.inner();
        let mut emptied = Vec::new();
        for (name, topic) in inner.topics.iter_mut() {
            if topic.unsubscribe(session) && topic.subscribers.is_empty() {
                emptied.push(name.clone());
            }
        }
        for name in &emptied {
            inner.remove_topic(name);
        }
        emptied
    }
}
