//! Domain events.

pub mod presence;

pub use presence::{DisconnectReason, PresenceEvent, PresenceKind};
