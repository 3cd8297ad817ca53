//! Run-level error taxonomy.
//!
//! Hard errors end the run and are surfaced synchronously to the caller. Soft
//! conditions (malformed, duplicate, or unknown responses) are logged where
//! they occur and never reach this type.

use std::collections::HashMap;

use thiserror::Error;

use super::ids::RequestId;
use super::response::ResponseRecord;
use crate::ports::response_source::ListenError;
use crate::ports::transport::TransportError;

/// Partial result carried by a timed-out run: what completed, and which ids
/// never received a response.
#[derive(Debug)]
pub struct TimeoutReport {
    pub completed: HashMap<RequestId, ResponseRecord>,
    pub unanswered: Vec<RequestId>,
    pub retry_passes: u32,
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// The transport port failed to hand off a batch. Fatal: the run ends
    /// without resending anything.
    #[error("transport failed to hand off {count} claim(s): {source}")]
    Transport {
        count: usize,
        #[source]
        source: TransportError,
    },

    /// The reply subscription failed while claims were outstanding.
    #[error("reply subscription failed before the run completed: {0}")]
    Listen(#[from] ListenError),

    /// The reply subscription closed while claims were outstanding.
    #[error("reply subscription closed before the run completed")]
    SubscriptionClosed,

    /// The watchdog expired with no retry budget left.
    #[error(
        "signing timed out: {} of {} claim(s) unanswered after {} retry pass(es)",
        .0.unanswered.len(),
        .0.unanswered.len() + .0.completed.len(),
        .0.retry_passes,
    )]
    Timeout(TimeoutReport),

    /// The caller cancelled the run; state was discarded without resending.
    #[error("run cancelled by caller")]
    Cancelled,
}
