//! Signature store port: lookup and upload boundary.
//!
//! The store is an external collaborator; the engine itself never persists
//! signatures. Lookup criteria combine with OR: a stored signature matching
//! any requested reference or digest is returned.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct StoreError(pub String);

/// A signature already present in the store. The (reference, digest, key)
/// triple identifies a signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSignature {
    pub reference: String,
    pub manifest_digest: String,
    pub sig_key_id: String,
}

/// A new signature to persist after a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureUpload {
    pub manifest_digest: String,
    pub reference: String,
    pub repository: String,
    pub sig_key_id: String,
    pub signature_data: String,
}

#[async_trait]
pub trait SignatureStore: Send + Sync {
    /// Existing signatures matching any of the given references or digests.
    async fn existing_signatures(
        &self,
        references: &[String],
        digests: &[String],
    ) -> Result<Vec<StoredSignature>, StoreError>;

    async fn upload_signatures(
        &self,
        signatures: Vec<SignatureUpload>,
    ) -> Result<(), StoreError>;
}
