//! Claim construction: expand signing items into claim requests.
//!
//! Each manifest digest needs its own signature, and so does every
//! customer-visible variation of the image: destination registry, tag, and
//! signing key. The builder produces the full cross product with a fresh
//! correlation id per claim.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{ClaimRequest, ManifestClaim};
use crate::ports::{Clock, IdGenerator};

/// Default `creator` recorded in the optional section of each claim.
pub const DEFAULT_CREATOR: &str = "claimgate";

/// One image to sign: its external repository, destination tags, and the
/// manifest digests discovered upstream (one for a single-arch image, several
/// for a manifest list — the list digest itself is not signed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningItem {
    pub repo: String,
    pub tags: Vec<String>,
    pub digests: Vec<String>,
}

/// Builds claim batches for one publishing task.
pub struct ClaimBuilder<G, C> {
    task_id: String,
    namespace: String,
    registries: Vec<String>,
    signing_keys: Vec<String>,
    creator: String,
    ids: G,
    clock: C,
}

impl<G: IdGenerator, C: Clock> ClaimBuilder<G, C> {
    pub fn new(task_id: impl Into<String>, namespace: impl Into<String>, ids: G, clock: C) -> Self {
        Self {
            task_id: task_id.into(),
            namespace: namespace.into(),
            registries: Vec::new(),
            signing_keys: Vec::new(),
            creator: DEFAULT_CREATOR.to_string(),
            ids,
            clock,
        }
    }

    /// Registry hostnames customers will pull through.
    pub fn registries(mut self, registries: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.registries = registries.into_iter().map(Into::into).collect();
        self
    }

    pub fn signing_keys(mut self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.signing_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = creator.into();
        self
    }

    /// Claims for every (registry, signing key) variant of one tagged digest.
    pub fn variant_claims(
        &self,
        repo: &str,
        tag: &str,
        digest: &str,
    ) -> Result<Vec<ClaimRequest>, serde_json::Error> {
        let internal_repo = format!("{}/{}", self.namespace, internal_repo_name(repo));
        let mut claims = Vec::with_capacity(self.registries.len() * self.signing_keys.len());

        for registry in &self.registries {
            let reference = format!("{registry}/{repo}:{tag}");
            for key in &self.signing_keys {
                let claim = ManifestClaim::new(digest, reference.as_str(), self.creator.as_str());
                claims.push(ClaimRequest {
                    request_id: self.ids.request_id(),
                    sig_key_id: key.clone(),
                    claim_file: claim.encode()?,
                    task_id: self.task_id.clone(),
                    manifest_digest: digest.to_string(),
                    repo: internal_repo.clone(),
                    image_name: repo.to_string(),
                    docker_reference: reference.clone(),
                    created: self.clock.now(),
                });
            }
        }
        Ok(claims)
    }

    /// The full batch for one item: digests x tags x registries x keys.
    pub fn item_claims(&self, item: &SigningItem) -> Result<Vec<ClaimRequest>, serde_json::Error> {
        let mut claims = Vec::new();
        for digest in &item.digests {
            for tag in &item.tags {
                claims.extend(self.variant_claims(&item.repo, tag, digest)?);
            }
        }
        debug!(repo = %item.repo, count = claims.len(), "constructed claim batch");
        Ok(claims)
    }
}

/// Internal repository naming: path separators collapse to `----`, and the
/// result lives under the organization namespace.
pub fn internal_repo_name(repo: &str) -> String {
    repo.replace('/', "----")
}
