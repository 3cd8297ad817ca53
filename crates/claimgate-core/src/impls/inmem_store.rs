//! In-memory signature store.

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::ports::{SignatureStore, SignatureUpload, StoreError, StoredSignature};

/// Signature store backed by a Vec. Lookup criteria combine with OR, like the
/// real store's query API.
#[derive(Default)]
pub struct InMemorySignatureStore {
    signatures: Mutex<Vec<StoredSignature>>,
    uploads: Mutex<Vec<SignatureUpload>>,
}

impl InMemorySignatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed an existing signature.
    pub async fn seed(&self, signature: StoredSignature) {
        self.signatures.lock().await.push(signature);
    }

    /// Everything uploaded so far, in upload order.
    pub async fn uploaded(&self) -> Vec<SignatureUpload> {
        self.uploads.lock().await.clone()
    }
}

#[async_trait]
impl SignatureStore for InMemorySignatureStore {
    async fn existing_signatures(
        &self,
        references: &[String],
        digests: &[String],
    ) -> Result<Vec<StoredSignature>, StoreError> {
        let signatures = self.signatures.lock().await;
        Ok(signatures
            .iter()
            .filter(|signature| {
                references.contains(&signature.reference)
                    || digests.contains(&signature.manifest_digest)
            })
            .cloned()
            .collect())
    }

    async fn upload_signatures(&self, signatures: Vec<SignatureUpload>) -> Result<(), StoreError> {
        debug!(count = signatures.len(), "storing new signatures");
        let mut stored = self.signatures.lock().await;
        for upload in &signatures {
            stored.push(StoredSignature {
                reference: upload.reference.clone(),
                manifest_digest: upload.manifest_digest.clone(),
                sig_key_id: upload.sig_key_id.clone(),
            });
        }
        self.uploads.lock().await.extend(signatures);
        Ok(())
    }
}
