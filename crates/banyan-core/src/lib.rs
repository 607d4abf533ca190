//! Backend abstraction for banyan coordination primitives.
//!
//! A backend is a single Redis-compatible server endpoint. This crate defines
//! the capability traits the coordination layer is written against, the
//! backend error type, and a deterministic in-memory backend that implements
//! every capability for tests and simulations.
//!
//! Concrete network clients (connection pooling, wire protocol, pub/sub
//! subscriptions) live outside this workspace; they only need to implement
//! the traits here.

mod error;
pub mod inmemory;
pub mod test_support;
mod traits;

pub use error::BackendError;
pub use inmemory::DeterministicBackend;
pub use traits::CountDownLatchBackend;
pub use traits::LockBackend;
pub use traits::SemaphoreBackend;
