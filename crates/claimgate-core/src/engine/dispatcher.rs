//! Claim admission: pending -> in-flight under the throttle ceiling.

use tracing::debug;

use crate::domain::{EngineError, RunState};
use crate::ports::ClaimTransport;

/// Admit as many pending claims as the throttle allows and hand them to the
/// transport as one batch. Returns the number of claims sent (zero when the
/// run is already at capacity or nothing is pending).
///
/// A transport error is terminal for the run: admitted claims are not moved
/// back to pending, because a failed hand-off reflects a channel problem, not
/// a missing reply.
pub async fn dispatch(
    state: &mut RunState,
    transport: &dyn ClaimTransport,
    throttle: usize,
) -> Result<usize, EngineError> {
    let batch = state.admit(throttle);
    if batch.is_empty() {
        return Ok(0);
    }

    debug!(count = batch.len(), counts = ?state.counts(), "dispatching claim batch");
    transport
        .send_claims(&batch)
        .await
        .map_err(|source| EngineError::Transport {
            count: batch.len(),
            source,
        })?;
    Ok(batch.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClaimRequest, RequestId};
    use crate::impls::inmem_bus::RecordingTransport;
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

    #[tokio::test]
    async fn sends_one_batch_up_to_the_throttle() {
        let mut state = RunState::new(batch(5));
        let transport = RecordingTransport::new();

        let sent = dispatch(&mut state, &transport, 3).await.unwrap();

        assert_eq!(sent, 3);
        let batches = transport.batches().await;
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 3);
        assert_eq!(state.counts().in_flight, 3);
    }

    #[tokio::test]
    async fn sends_nothing_at_capacity() {
        let mut state = RunState::new(batch(2));
        let transport = RecordingTransport::new();

        dispatch(&mut state, &transport, 2).await.unwrap();
        let sent = dispatch(&mut state, &transport, 2).await.unwrap();

        assert_eq!(sent, 0);
        assert_eq!(transport.batches().await.len(), 1);
    }

    #[tokio::test]
    async fn transport_failure_is_terminal_and_does_not_requeue() {
        let mut state = RunState::new(batch(2));
        let transport = RecordingTransport::failing("broker connection refused");

        let err = dispatch(&mut state, &transport, 2).await.unwrap_err();

        assert!(matches!(err, EngineError::Transport { count: 2, .. }));
        // Claims stay out of pending; the run is over either way.
        assert_eq!(state.counts().pending, 0);
    }
}
