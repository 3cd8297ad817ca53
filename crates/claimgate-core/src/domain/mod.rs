//! Domain model (ids, claims, responses, run state, errors).

pub mod claim;
pub mod errors;
pub mod ids;
pub mod response;
pub mod state;

pub use claim::{ClaimRequest, ManifestClaim};
pub use errors::{EngineError, TimeoutReport};
pub use ids::{Id, IdMarker, RequestId, RunId};
pub use response::{MalformedResponse, ResponseRecord};
pub use state::{Correlation, RunCounts, RunPhase, RunState};
