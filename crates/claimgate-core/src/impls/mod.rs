//! In-memory implementations of the ports, for development and tests.

pub mod inmem_bus;
pub mod inmem_store;

pub use inmem_bus::{EchoSigningAuthority, InMemorySubscription, RecordingTransport, ResponseInjector, channel};
pub use inmem_store::InMemorySignatureStore;
