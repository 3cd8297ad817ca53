//! In-memory bus: a transport/subscription pair for development and tests.
//!
//! Mirrors the asymmetric production setup: the engine hands batches to a
//! sender it does not own and receives results on its own run-scoped
//! subscription. Inbound bodies are funneled through a channel, so the
//! single-owner rule for run state holds no matter which task produced them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

use crate::domain::{ClaimRequest, ResponseRecord};
use crate::ports::{ClaimTransport, ListenError, ResponseSource, TransportError};

/// Producer half: injects raw message bodies into the subscription the way a
/// bus delivery would.
#[derive(Clone)]
pub struct ResponseInjector {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl ResponseInjector {
    /// Deliver a record the way the signing authority sends it: wrapped in a
    /// `"msg"` envelope.
    pub fn deliver(&self, record: &ResponseRecord) -> Result<(), serde_json::Error> {
        let body = serde_json::to_vec(&serde_json::json!({ "msg": record }))?;
        self.deliver_raw(body);
        Ok(())
    }

    /// Deliver an arbitrary body, malformed ones included.
    pub fn deliver_raw(&self, body: Vec<u8>) {
        // A closed subscription just drops the message, like a bus would.
        let _ = self.tx.send(body);
    }
}

/// Consumer half: the run-scoped subscription handed to the engine.
pub struct InMemorySubscription {
    address: String,
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

/// Build a subscription for the given reply address, plus the injector that
/// feeds it.
pub fn channel(address: &str) -> (ResponseInjector, InMemorySubscription) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ResponseInjector { tx },
        InMemorySubscription {
            address: address.to_string(),
            rx,
        },
    )
}

#[async_trait]
impl ResponseSource for InMemorySubscription {
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, ListenError> {
        let body = self.rx.recv().await;
        if body.is_none() {
            debug!(address = %self.address, "reply subscription closed");
        }
        Ok(body)
    }
}

/// Transport that signs every claim after a fixed latency, like a prompt
/// authority. The "signed" payload is the claim file itself; good enough for
/// demos and happy-path tests.
pub struct EchoSigningAuthority {
    injector: ResponseInjector,
    latency: Duration,
}

impl EchoSigningAuthority {
    pub fn new(injector: ResponseInjector, latency: Duration) -> Self {
        Self { injector, latency }
    }
}

#[async_trait]
impl ClaimTransport for EchoSigningAuthority {
    async fn send_claims(&self, batch: &[ClaimRequest]) -> Result<(), TransportError> {
        for claim in batch {
            let injector = self.injector.clone();
            let latency = self.latency;
            let record = ResponseRecord {
                request_id: claim.request_id,
                manifest_digest: claim.manifest_digest.clone(),
                signed_claim: claim.claim_file.clone(),
                errors: vec![],
            };
            tokio::spawn(async move {
                tokio::time::sleep(latency).await;
                let _ = injector.deliver(&record);
            });
        }
        Ok(())
    }
}

/// Transport that records every hand-off and never responds on its own;
/// tests drive responses through an injector. Clones share the record.
#[derive(Clone)]
pub struct RecordingTransport {
    sent: Arc<Mutex<Vec<Vec<ClaimRequest>>>>,
    failure: Option<String>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            failure: None,
        }
    }

    /// A transport whose every hand-off fails with the given reason.
    pub fn failing(reason: &str) -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            failure: Some(reason.to_string()),
        }
    }

    /// Batches handed off so far, in order.
    pub async fn batches(&self) -> Vec<Vec<ClaimRequest>> {
        self.sent.lock().await.clone()
    }
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClaimTransport for RecordingTransport {
    async fn send_claims(&self, batch: &[ClaimRequest]) -> Result<(), TransportError> {
        if let Some(reason) = &self.failure {
            return Err(TransportError(reason.clone()));
        }
        self.sent.lock().await.push(batch.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RequestId;
    use chrono::Utc;
    use ulid::Ulid;

    fn claim() -> ClaimRequest {
        ClaimRequest {
            request_id: RequestId::from_ulid(Ulid::new()),
            sig_key_id: "key-a".to_string(),
            claim_file: "e30=".to_string(),
            task_id: "task-1".to_string(),
            manifest_digest: "sha256:abc".to_string(),
            repo: "ns/acme----web".to_string(),
            image_name: "acme/web".to_string(),
            docker_reference: "registry.example.com/acme/web:latest".to_string(),
            created: Utc::now(),
        }
    }

    #[tokio::test]
    async fn injected_records_arrive_enveloped() {
        let (injector, mut subscription) = channel("queue://test");
        let record = ResponseRecord {
            request_id: RequestId::from_ulid(Ulid::new()),
            manifest_digest: "sha256:abc".to_string(),
            signed_claim: "c2lnbmVk".to_string(),
            errors: vec![],
        };

        injector.deliver(&record).unwrap();
        let body = subscription.recv().await.unwrap().unwrap();

        let decoded = ResponseRecord::decode(&body).unwrap();
        assert_eq!(decoded, record);
    }

    #[tokio::test]
    async fn dropped_injector_closes_the_subscription() {
        let (injector, mut subscription) = channel("queue://test");
        drop(injector);

        assert_eq!(subscription.recv().await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn echo_authority_answers_every_claim_after_its_latency() {
        let (injector, mut subscription) = channel("queue://test");
        let authority = EchoSigningAuthority::new(injector, Duration::from_millis(250));
        let sent = claim();

        authority.send_claims(std::slice::from_ref(&sent)).await.unwrap();

        let start = tokio::time::Instant::now();
        let body = subscription.recv().await.unwrap().unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(250));

        let record = ResponseRecord::decode(&body).unwrap();
        assert_eq!(record.request_id, sent.request_id);
        assert_eq!(record.signed_claim, sent.claim_file);
    }

    #[tokio::test]
    async fn recording_transport_keeps_batches_in_order() {
        let transport = RecordingTransport::new();
        transport.send_claims(&[claim(), claim()]).await.unwrap();
        transport.send_claims(&[claim()]).await.unwrap();

        let batches = transport.batches().await;
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[1].len(), 1);
    }

    #[tokio::test]
    async fn failing_transport_reports_its_reason() {
        let transport = RecordingTransport::failing("broker connection refused");
        let err = transport.send_claims(&[claim()]).await.unwrap_err();
        assert!(err.to_string().contains("broker connection refused"));
    }
}
