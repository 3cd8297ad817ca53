//! The end-to-end signing pass: filter, run, validate, upload.

use thiserror::Error;
use tracing::info;

use crate::domain::{ClaimRequest, EngineError, RunId};
use crate::engine::{ClaimEngine, RunPolicy};
use crate::ports::{ClaimTransport, ResponseSource, SignatureStore, StoreError};
use crate::sigstore::{self, SigningError};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct WorkflowConfig {
    /// Signing can be disabled per publishing target; the pass then does
    /// nothing at all.
    pub enabled: bool,
    pub policy: RunPolicy,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            policy: RunPolicy::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Signing(#[from] SigningError),
}

#[derive(Debug, PartialEq, Eq)]
pub enum WorkflowOutcome {
    /// Signing is disabled for this target.
    Skipped,
    /// Every claim already had a stored signature.
    NothingToSign,
    Signed { uploaded: usize, retry_passes: u32 },
}

/// One signing pass over a prepared claim batch.
///
/// Claims already present in the store are dropped first; the remaining ones
/// go through a correlation run; the signed results are validated and
/// uploaded. A claim rejected by the authority fails the pass here even
/// though the run itself completed.
pub async fn sign_and_reconcile<T, S>(
    run_id: RunId,
    claims: Vec<ClaimRequest>,
    transport: T,
    source: S,
    store: &dyn SignatureStore,
    config: WorkflowConfig,
) -> Result<WorkflowOutcome, WorkflowError>
where
    T: ClaimTransport,
    S: ResponseSource,
{
    if !config.enabled {
        info!("container signing disabled for this target, skipping");
        return Ok(WorkflowOutcome::Skipped);
    }

    let claims = sigstore::filter_existing(store, claims).await?;
    if claims.is_empty() {
        info!("no new claims to sign");
        return Ok(WorkflowOutcome::NothingToSign);
    }

    info!(count = claims.len(), "submitting claims for signing");
    let report = ClaimEngine::new(run_id, claims.clone(), transport, source, config.policy)
        .run()
        .await?;

    sigstore::validate_records(&claims, &report.records)?;
    let uploads = sigstore::assemble_uploads(&claims, &report.records);
    let uploaded = uploads.len();
    store.upload_signatures(uploads).await?;

    Ok(WorkflowOutcome::Signed {
        uploaded,
        retry_passes: report.retry_passes,
    })
}
