//! Heartbeat scheduler
//!
//! A background task that periodically re-sends the latest content of every
//! topic nobody has heard about for longer than the configured interval, so
//! subscribers that missed a push (or joined after it) catch up without a new
//! publish. Topics that were never published to are skipped.
//!
//! The task wakes every `TICK` rather than every interval: timestamps are
//! whole seconds and staleness is strict, so a topic becomes due one second
//! after the interval has elapsed and is pushed on that tick.
//!
//! The scheduler only reads topics and refreshes their broadcast timestamp;
//! it never creates, deletes or re-subscribes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::broker::dispatcher::deliver_update;
use crate::broker::registry::TopicRegistry;
use crate::client::SessionTable;

/// How often the task checks for stale topics.
pub const TICK: Duration = Duration::from_secs(1);

pub struct Heartbeat {
    registry: Arc<TopicRegistry>,
    sessions: Arc<SessionTable>,
    interval: Duration,
}

impl Heartbeat {
    pub fn new(registry: Arc<TopicRegistry>, sessions: Arc<SessionTable>, interval: Duration) -> Self {
        Self {
            registry,
            sessions,
            interval,
        }
    }

    /// Runs one cycle at `now` (epoch seconds). Returns how many topics were
    /// re-broadcast.
    pub fn tick(&self, now: i64) -> usize {
        let interval = i64::try_from(self.interval.as_secs()).unwrap_or(i64::MAX);
        let mut refreshed = 0;

        for topic in self.registry.snapshot() {
            if !topic.is_stale(now, interval) {
                continue;
            }
            // staleness is checked again under the lock: a publish may have
            // landed since the snapshot
            let Some(sent) =
                deliver_update(&self.registry, &self.sessions, &topic.name, now, Some(interval))
            else {
                continue;
            };
            debug!("heartbeat refreshed {} ({sent} subscribers)", topic.name);
            refreshed += 1;
        }

        refreshed
    }

    /// Starts the recurring task. It runs until `HeartbeatHandle::shutdown`
    /// is called or the handle is dropped.
    pub fn spawn(self) -> HeartbeatHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(TICK);
            info!("heartbeat started, interval {}s", self.interval.as_secs());

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.tick(chrono::Utc::now().timestamp());
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("heartbeat stopped");
        });

        HeartbeatHandle { stop_tx, task }
    }
}

pub struct HeartbeatHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl HeartbeatHandle {
    /// Signals the task and waits for it to finish its current cycle.
    pub async fn shutdown(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.task.await;
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
