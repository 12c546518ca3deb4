//! # sessionhub-core
//!
//! Core crate for SessionHub. Contains the session model, configuration
//! schemas, typed identifiers, presence events, the trait seams shared by
//! the store, realtime and worker crates, and the unified error system.
//!
//! This crate has **no** internal dependencies on other SessionHub crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
