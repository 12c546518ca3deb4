//! # sessionhub-realtime
//!
//! Connection-scoped presence for SessionHub. Provides:
//!
//! - Active-connection registry (session → live connections) with
//!   per-session serialisation of connect/disconnect
//! - An in-process connection transport for locally attached clients
//! - Presence notifier with isolated, time-bounded subscriber delivery
//! - Topic bridge forwarding presence changes to `/topic/users`
//! - Multi-node topic publishing via Redis pub/sub (feature `redis-pubsub`)

pub mod bridge;
pub mod connection;
pub mod message;
pub mod metrics;
pub mod presence;

pub use bridge::{MemoryPubSub, RedisPubSubBridge, TopicForwarder};
pub use connection::registry::{ActiveConnectionRegistry, EvictionReport};
pub use connection::transport::LocalTransport;
pub use message::OutboundMessage;
pub use metrics::PresenceMetrics;
pub use presence::notifier::{PresenceNotifier, PublishReport};
pub use presence::subscriber::{ChannelSubscriber, PresenceSubscriber};
