//! Response listener: decode inbound bodies and classify them against the run.

use tracing::{debug, warn};

use crate::domain::{Correlation, ResponseRecord, RunState};

/// Feed one raw inbound message into the run. Returns true when a claim newly
/// completed (progress for the watchdog).
///
/// Malformed bodies and responses for ids that are not in-flight are logged
/// and dropped without touching any claim's state; the affected claim, if one
/// exists, is resolved by its own timeout or retry.
pub fn ingest(state: &mut RunState, body: &[u8]) -> bool {
    let record = match ResponseRecord::decode(body) {
        Ok(record) => record,
        Err(err) => {
            warn!(error = %err, "dropping malformed signing response");
            return false;
        }
    };

    let request_id = record.request_id;
    match state.correlate(record) {
        Correlation::Matched => {
            debug!(request_id = %request_id, counts = ?state.counts(), "signing response matched");
            true
        }
        Correlation::Duplicate => {
            warn!(request_id = %request_id, "ignoring duplicate signing response");
            false
        }
        Correlation::Unknown => {
            warn!(request_id = %request_id, "ignoring signing response for unknown request id");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClaimRequest, RequestId};
    use chrono::Utc;
    use ulid::Ulid;

    fn batch(n: usize) -> Vec<ClaimRequest> {
        (0..n)
            .map(|i| ClaimRequest {
                request_id: RequestId::from_ulid(Ulid::new()),
                sig_key_id: "key-a".to_string(),
                claim_file: "e30=".to_string(),
                task_id: "task-1".to_string(),
                manifest_digest: format!("sha256:{i}"),
                repo: "ns/acme----web".to_string(),
                image_name: "acme/web".to_string(),
                docker_reference: format!("registry.example.com/acme/web:{i}"),
                created: Utc::now(),
            })
            .collect()
    }

    fn body_for(id: RequestId) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "msg": {
                "request_id": id.as_ulid().to_string(),
                "manifest_digest": "sha256:0",
                "signed_claim": "c2lnbmVk",
                "errors": [],
            }
        }))
        .unwrap()
    }

    #[test]
    fn matched_response_reports_progress() {
        let claims = batch(1);
        let id = claims[0].request_id;
        let mut state = RunState::new(claims);
        state.admit(1);

        assert!(ingest(&mut state, &body_for(id)));
        assert_eq!(state.counts().completed, 1);
    }

    #[test]
    fn malformed_body_changes_nothing() {
        let mut state = RunState::new(batch(1));
        state.admit(1);
        let before = state.counts();

        assert!(!ingest(&mut state, b"{\"msg\": {\"manifest_digest\": \"x\"}}"));
        assert!(!ingest(&mut state, b"garbage"));
        assert_eq!(state.counts(), before);
    }

    #[test]
    fn foreign_id_changes_nothing() {
        let mut state = RunState::new(batch(1));
        state.admit(1);
        let before = state.counts();

        let foreign = RequestId::from_ulid(Ulid::new());
        assert!(!ingest(&mut state, &body_for(foreign)));
        assert_eq!(state.counts(), before);
    }
}
