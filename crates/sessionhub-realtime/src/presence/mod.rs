//! Presence notification.

pub mod notifier;
pub mod subscriber;

pub use notifier::{PresenceNotifier, PublishReport, SubscriberFailure};
pub use subscriber::{ChannelSubscriber, PresenceSubscriber};
