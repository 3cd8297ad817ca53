//! Id generation port.
//!
//! Request ids must be globally unique per run; ULIDs give that without
//! coordination. Generation goes through a trait so tests can pin the
//! timestamp half of the id.

use ulid::Ulid;

use crate::domain::ids::{Id, IdMarker, RequestId, RunId};
use crate::ports::clock::Clock;

pub trait IdGenerator: Send + Sync {
    fn request_id(&self) -> RequestId;
    fn run_id(&self) -> RunId;
}

/// ULID-based generator: timestamp from the injected clock, entropy from the
/// process RNG.
#[derive(Debug, Clone)]
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn mint<T: IdMarker>(&self) -> Id<T> {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        Id::from_ulid(Ulid::from_parts(timestamp_ms, rand::random()))
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn request_id(&self) -> RequestId {
        self.mint()
    }

    fn run_id(&self) -> RunId {
        self.mint()
    }
}
