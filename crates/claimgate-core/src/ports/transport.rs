//! Transport port: hand a batch of claims to the caller's publishing channel.
//!
//! Publish rights on the bus belong to the orchestrating process, not this
//! engine, so sending is an injected capability with a single operation. The
//! channel is not assumed to guarantee delivery: absence of a timely response,
//! not a send error, is the default failure mode.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::ClaimRequest;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

#[async_trait]
pub trait ClaimTransport: Send + Sync {
    /// Submit one batch of claims. An error here is terminal for the run;
    /// retry policy lives at the run level, not the send layer.
    async fn send_claims(&self, batch: &[ClaimRequest]) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: ClaimTransport + ?Sized> ClaimTransport for std::sync::Arc<T> {
    async fn send_claims(&self, batch: &[ClaimRequest]) -> Result<(), TransportError> {
        (**self).send_claims(batch).await
    }
}
