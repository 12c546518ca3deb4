//! Bridges between presence events and topic distribution.

pub mod memory_pubsub;
pub mod redis_pubsub;
pub mod topic_forwarder;

pub use memory_pubsub::MemoryPubSub;
pub use redis_pubsub::RedisPubSubBridge;
pub use topic_forwarder::TopicForwarder;
