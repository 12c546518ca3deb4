//! # sessionhub-store
//!
//! Session table implementations for SessionHub. Supports two modes:
//!
//! - **memory**: In-process sharded map using [dashmap](https://crates.io/crates/dashmap)
//! - **redis**: Redis-backed store using the [redis](https://crates.io/crates/redis) crate
//!
//! The provider is selected at runtime based on configuration and wrapped
//! in a retry layer for transient store failures.

pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;
pub mod retry;

pub use provider::SessionStoreManager;
