//! Signature-store reconciliation.
//!
//! Before a run: drop claims that already have a stored signature. After a
//! run: validate the signed results and assemble the uploads. Whether a
//! per-claim rejection fails the wider workflow is decided here, not in the
//! engine.

use std::collections::{BTreeSet, HashMap, HashSet};

use thiserror::Error;
use tracing::{error, info};

use crate::domain::{ClaimRequest, RequestId, ResponseRecord};
use crate::ports::{SignatureStore, SignatureUpload, StoreError};

#[derive(Debug, Error)]
#[error("signing of {failed}/{total} claim(s) failed")]
pub struct SigningError {
    pub failed: usize,
    pub total: usize,
}

/// Drop claims whose (reference, digest, key) triple already has a stored
/// signature.
///
/// The store is queried by the sorted, de-duplicated reference and digest
/// lists only; signing keys are deliberately left out of the query, which
/// would otherwise return too many irrelevant rows.
pub async fn filter_existing(
    store: &dyn SignatureStore,
    claims: Vec<ClaimRequest>,
) -> Result<Vec<ClaimRequest>, StoreError> {
    let references: Vec<String> = claims
        .iter()
        .map(|claim| claim.docker_reference.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let digests: Vec<String> = claims
        .iter()
        .map(|claim| claim.manifest_digest.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let stored = store.existing_signatures(&references, &digests).await?;
    let existing: HashSet<(&str, &str, &str)> = stored
        .iter()
        .map(|signature| {
            (
                signature.reference.as_str(),
                signature.manifest_digest.as_str(),
                signature.sig_key_id.as_str(),
            )
        })
        .collect();

    let before = claims.len();
    let remaining: Vec<ClaimRequest> = claims
        .into_iter()
        .filter(|claim| {
            !existing.contains(&(
                claim.docker_reference.as_str(),
                claim.manifest_digest.as_str(),
                claim.sig_key_id.as_str(),
            ))
        })
        .collect();

    info!(
        kept = remaining.len(),
        skipped = before - remaining.len(),
        "filtered claims against the signature store"
    );
    Ok(remaining)
}

/// Fail if any record carries authority errors, logging each rejected claim.
pub fn validate_records(
    claims: &[ClaimRequest],
    records: &HashMap<RequestId, ResponseRecord>,
) -> Result<(), SigningError> {
    let by_id: HashMap<RequestId, &ClaimRequest> =
        claims.iter().map(|claim| (claim.request_id, claim)).collect();

    let mut ids: Vec<&RequestId> = records.keys().collect();
    ids.sort();

    let mut failed = 0usize;
    for id in ids {
        let record = &records[id];
        if record.is_success() {
            continue;
        }
        let reference = by_id
            .get(id)
            .map(|claim| claim.docker_reference.as_str())
            .unwrap_or("<unknown>");
        error!(
            request_id = %id,
            reference,
            errors = ?record.errors,
            "signing authority rejected claim"
        );
        failed += 1;
    }

    if failed > 0 {
        return Err(SigningError {
            failed,
            total: claims.len(),
        });
    }
    Ok(())
}

/// Join completed records with their claims, ordered by request id. The
/// digest and signature come from the record, the naming from the claim.
pub fn assemble_uploads(
    claims: &[ClaimRequest],
    records: &HashMap<RequestId, ResponseRecord>,
) -> Vec<SignatureUpload> {
    let by_id: HashMap<RequestId, &ClaimRequest> =
        claims.iter().map(|claim| (claim.request_id, claim)).collect();

    let mut ids: Vec<&RequestId> = records.keys().collect();
    ids.sort();

    ids.into_iter()
        .filter_map(|id| {
            let claim = by_id.get(id)?;
            let record = &records[id];
            Some(SignatureUpload {
                manifest_digest: record.manifest_digest.clone(),
                reference: claim.docker_reference.clone(),
                repository: claim.image_name.clone(),
                sig_key_id: claim.sig_key_id.clone(),
                signature_data: record.signed_claim.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::InMemorySignatureStore;
    use crate::ports::StoredSignature;
    use chrono::Utc;
    use ulid::Ulid;

    fn claim(reference: &str, digest: &str, key: &str) -> ClaimRequest {
        ClaimRequest {
            request_id: RequestId::from_ulid(Ulid::new()),
            sig_key_id: key.to_string(),
            claim_file: "e30=".to_string(),
            task_id: "task-1".to_string(),
            manifest_digest: digest.to_string(),
            repo: "ns/acme----web".to_string(),
            image_name: "acme/web".to_string(),
            docker_reference: reference.to_string(),
            created: Utc::now(),
        }
    }

    fn record(id: RequestId, digest: &str, errors: Vec<String>) -> ResponseRecord {
        ResponseRecord {
            request_id: id,
            manifest_digest: digest.to_string(),
            signed_claim: "c2lnbmVk".to_string(),
            errors,
        }
    }

    #[tokio::test]
    async fn filter_drops_only_fully_matching_triples() {
        let store = InMemorySignatureStore::new();
        store
            .seed(StoredSignature {
                reference: "reg/acme/web:1".to_string(),
                manifest_digest: "sha256:aaa".to_string(),
                sig_key_id: "key-a".to_string(),
            })
            .await;

        let claims = vec![
            claim("reg/acme/web:1", "sha256:aaa", "key-a"), // already stored
            claim("reg/acme/web:1", "sha256:aaa", "key-b"), // different key
            claim("reg/acme/web:2", "sha256:aaa", "key-a"), // different reference
        ];

        let remaining = filter_existing(&store, claims).await.unwrap();

        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().all(|c| {
            (c.docker_reference.as_str(), c.sig_key_id.as_str()) != ("reg/acme/web:1", "key-a")
        }));
    }

    #[test]
    fn validate_counts_rejected_claims() {
        let claims = vec![
            claim("reg/acme/web:1", "sha256:aaa", "key-a"),
            claim("reg/acme/web:2", "sha256:bbb", "key-a"),
        ];
        let mut records = HashMap::new();
        records.insert(
            claims[0].request_id,
            record(claims[0].request_id, "sha256:aaa", vec![]),
        );
        records.insert(
            claims[1].request_id,
            record(
                claims[1].request_id,
                "sha256:bbb",
                vec!["key not allowed".to_string()],
            ),
        );

        let err = validate_records(&claims, &records).unwrap_err();
        assert_eq!(err.failed, 1);
        assert_eq!(err.total, 2);
        assert!(err.to_string().contains("1/2"));
    }

    #[test]
    fn validate_passes_when_all_records_are_clean() {
        let claims = vec![claim("reg/acme/web:1", "sha256:aaa", "key-a")];
        let mut records = HashMap::new();
        records.insert(
            claims[0].request_id,
            record(claims[0].request_id, "sha256:aaa", vec![]),
        );

        assert!(validate_records(&claims, &records).is_ok());
    }

    #[test]
    fn uploads_join_claim_naming_with_record_signature() {
        let claims = vec![
            claim("reg/acme/web:2", "sha256:bbb", "key-a"),
            claim("reg/acme/web:1", "sha256:aaa", "key-a"),
        ];
        let mut records = HashMap::new();
        for c in &claims {
            records.insert(c.request_id, record(c.request_id, &c.manifest_digest, vec![]));
        }

        let uploads = assemble_uploads(&claims, &records);

        assert_eq!(uploads.len(), 2);
        // Ordered by request id, not by batch position.
        let mut expected: Vec<RequestId> = claims.iter().map(|c| c.request_id).collect();
        expected.sort();
        let first_claim = claims
            .iter()
            .find(|c| c.request_id == expected[0])
            .unwrap();
        assert_eq!(uploads[0].reference, first_claim.docker_reference);
        assert_eq!(uploads[0].repository, "acme/web");
        assert_eq!(uploads[0].signature_data, "c2lnbmVk");
    }
}
