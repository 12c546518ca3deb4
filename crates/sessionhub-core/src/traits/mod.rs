//! Core traits defined in `sessionhub-core` and implemented by other crates.

pub mod session_repository;
pub mod topic;
pub mod transport;

pub use session_repository::SessionRepository;
pub use topic::TopicPublisher;
pub use transport::ConnectionTransport;
