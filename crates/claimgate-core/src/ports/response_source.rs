//! Response subscription port.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ListenError(pub String);

/// A run-scoped subscription to the reply destination.
///
/// Implementations deliver raw message bodies one at a time on the caller's
/// task. If the underlying bus client receives on its own thread, it must
/// funnel bodies through a channel into this trait rather than touch run
/// state directly. Dropping the source closes the subscription.
#[async_trait]
pub trait ResponseSource: Send {
    /// Next raw message body, or `Ok(None)` once the subscription is closed.
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, ListenError>;
}
