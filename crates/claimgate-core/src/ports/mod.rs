//! Ports: injected capabilities at the engine's seams.
//!
//! Each trait hides an external system (the publishing channel, the bus
//! subscription, the signature store, the wall clock) so the engine can be
//! exercised against in-memory implementations.

pub mod clock;
pub mod id_generator;
pub mod response_source;
pub mod signature_store;
pub mod transport;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::response_source::{ListenError, ResponseSource};
pub use self::signature_store::{SignatureStore, SignatureUpload, StoreError, StoredSignature};
pub use self::transport::{ClaimTransport, TransportError};
