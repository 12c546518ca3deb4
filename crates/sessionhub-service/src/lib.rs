//! # sessionhub-service
//!
//! Entry points for the layers around SessionHub. [`SessionService`] is
//! what the request and connection layers call; [`SessionHub`] builds the
//! store, registry, notifier and sweeper from configuration and owns their
//! background lifecycle.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time via `Arc` references.

pub mod hub;
pub mod session;

pub use hub::SessionHub;
pub use session::SessionService;
