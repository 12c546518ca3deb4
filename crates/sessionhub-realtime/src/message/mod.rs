//! Outbound message types.

pub mod types;

pub use types::OutboundMessage;
