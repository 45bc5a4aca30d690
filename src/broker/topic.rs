use crate::client::SessionId;

/// State of one named topic.
///
/// Subscribers behave as an ordered set: insertion order is kept for display
/// and a session appears at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub name: String,
    pub content: Option<String>,
    pub last_publish_timestamp: Option<i64>,
    pub subscribers: Vec<SessionId>,
    pub last_broadcast_timestamp: i64,
}

impl Topic {
    /// Creates a topic with `first` as its sole subscriber.
    pub fn new(name: &str, first: SessionId, now: i64) -> Self {
        Self {
            name: name.to_string(),
            content: None,
            last_publish_timestamp: None,
            subscribers: vec![first],
            last_broadcast_timestamp: now,
        }
    }

    /// True if `id` is currently a subscriber.
    pub fn is_subscribed(&self, id: &SessionId) -> bool {
        self.subscribers.contains(id)
    }

    /// Adds the subscriber. Returns `false` if it was already present.
    pub fn subscribe(&mut self, id: SessionId) -> bool {
        if self.is_subscribed(&id) {
            return false;
        }
        self.subscribers.push(id);
        true
    }

    /// Removes the subscriber. Returns `false` if it was not present.
    pub fn unsubscribe(&mut self, id: &SessionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s != id);
        self.subscribers.len() != before
    }

    /// Replaces the content and the publisher-supplied timestamp.
    pub fn publish(&mut self, timestamp: i64, payload: String) {
        self.content = Some(payload);
        self.last_publish_timestamp = Some(timestamp);
    }

    /// Never moves the broadcast timestamp backwards.
    pub fn mark_broadcast(&mut self, now: i64) {
        self.last_broadcast_timestamp = self.last_broadcast_timestamp.max(now);
    }

    /// True when the heartbeat should push this topic again at `now`.
    pub fn is_stale(&self, now: i64, interval_secs: i64) -> bool {
        self.content.is_some() && now - self.last_broadcast_timestamp > interval_secs
    }

    /// The update pushed to subscribers, `None` before the first publish.
    pub fn update_text(&self) -> Option<String> {
        let content = self.content.as_ref()?;
        let ts = self.last_publish_timestamp?;
        Some(format!("{} ({}): {}", self.name, format_timestamp(ts), content))
    }
}

/// Local, human-readable rendering of an epoch-seconds timestamp.
pub fn format_timestamp(ts: i64) -> String {
    match chrono::DateTime::from_timestamp(ts, 0) {
        Some(utc) => utc
            .with_timezone(&chrono::Local)
            .format("%d-%m-%Y %H:%M:%S")
            .to_string(),
        None => ts.to_string(),
    }
}
