//! Session lookup, lifecycle and connection notifications.

pub mod service;

pub use service::SessionService;
