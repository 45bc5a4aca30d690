//! The broker: topic registry, command dispatcher and heartbeat scheduler.
//!
//! The dispatcher and the heartbeat both reach the registry through an
//! `Arc<TopicRegistry>` and both send through the transport's
//! `SessionTable`.

pub mod dispatcher;
pub mod heartbeat;
pub mod registry;
pub mod topic;

pub use dispatcher::Dispatcher;
pub use heartbeat::{Heartbeat, HeartbeatHandle};
pub use registry::TopicRegistry;
pub use topic::Topic;
