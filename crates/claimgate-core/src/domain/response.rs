//! Signed-result records received from the signing authority.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ids::RequestId;

/// One signed result, parsed from an inbound bus message.
///
/// An empty `errors` list means the authority accepted the claim. The engine
/// never interprets the list itself; its own success/failure signal concerns
/// completeness and timing only, and the caller decides what a per-claim
/// rejection means for the larger workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub request_id: RequestId,
    pub manifest_digest: String,
    pub signed_claim: String,
    #[serde(default)]
    pub errors: Vec<String>,
}

/// An inbound message the listener must drop: not JSON, or missing required
/// fields. Soft: logged, never mutates run state.
#[derive(Debug, Error)]
pub enum MalformedResponse {
    #[error("inbound message is not valid JSON: {0}")]
    NotJson(serde_json::Error),

    #[error("inbound message is missing required fields: {0}")]
    MissingFields(serde_json::Error),
}

impl ResponseRecord {
    /// Decode an inbound message body.
    ///
    /// The signing authority wraps its payload in a `"msg"` envelope; bare
    /// records are accepted too. `errors` may be absent and defaults to empty.
    pub fn decode(body: &[u8]) -> Result<Self, MalformedResponse> {
        let value: serde_json::Value =
            serde_json::from_slice(body).map_err(MalformedResponse::NotJson)?;
        let record = match value.get("msg") {
            Some(inner) => inner.clone(),
            None => value,
        };
        serde_json::from_value(record).map_err(MalformedResponse::MissingFields)
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}
