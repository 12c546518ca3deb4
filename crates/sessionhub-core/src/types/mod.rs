//! Shared domain types.

pub mod id;
pub mod session;

pub use id::{ConnectionId, SessionId, SubscriptionId};
pub use session::Session;
