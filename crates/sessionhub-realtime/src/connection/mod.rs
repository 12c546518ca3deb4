//! Connection tracking: registry, per-session locks, handles and the local transport.

pub mod handle;
pub mod locks;
pub mod registry;
pub mod transport;

pub use handle::{ConnectionHandle, ConnectionInfo};
pub use locks::{SessionLockGuard, SessionLocks};
pub use registry::{ActiveConnectionRegistry, EvictionReport};
pub use transport::LocalTransport;
