//! Claim requests and the manifest claim payload they carry.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::RequestId;

/// Claim type string mandated by the container signature convention.
pub const CLAIM_TYPE: &str = "atomic container signature";

/// The assertion to be signed: which manifest digest is published under which
/// customer-visible reference.
///
/// Field layout follows the atomic container signature convention: `critical`
/// holds the fields a verifier must understand, `optional` the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestClaim {
    pub critical: ClaimCritical,
    pub optional: ClaimOptional,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimCritical {
    #[serde(rename = "type")]
    pub kind: String,
    pub image: ClaimImage,
    pub identity: ClaimIdentity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimImage {
    #[serde(rename = "docker-manifest-digest")]
    pub docker_manifest_digest: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimIdentity {
    #[serde(rename = "docker-reference")]
    pub docker_reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimOptional {
    pub creator: String,
}

impl ManifestClaim {
    pub fn new(
        manifest_digest: impl Into<String>,
        docker_reference: impl Into<String>,
        creator: impl Into<String>,
    ) -> Self {
        Self {
            critical: ClaimCritical {
                kind: CLAIM_TYPE.to_string(),
                image: ClaimImage {
                    docker_manifest_digest: manifest_digest.into(),
                },
                identity: ClaimIdentity {
                    docker_reference: docker_reference.into(),
                },
            },
            optional: ClaimOptional {
                creator: creator.into(),
            },
        }
    }

    /// Base64 of the JSON form, as embedded in a claim request's `claim_file`.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        Ok(BASE64.encode(serde_json::to_vec(self)?))
    }
}

/// One signing request. Built once by the claim producer before the run
/// starts and never mutated; field names are the wire names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRequest {
    /// Correlation id, echoed back by the signing authority.
    pub request_id: RequestId,
    /// Key the authority should sign with.
    pub sig_key_id: String,
    /// Base64-encoded [`ManifestClaim`].
    pub claim_file: String,
    /// Identifier of the publishing task this run belongs to.
    pub task_id: String,
    /// Digest of the manifest being signed.
    pub manifest_digest: String,
    /// Internal destination repository.
    pub repo: String,
    /// External repository name.
    pub image_name: String,
    /// Reference customers will pull the image by.
    pub docker_reference: String,
    pub created: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    #[test]
    fn manifest_claim_uses_convention_field_names() {
        let claim = ManifestClaim::new(
            "sha256:abc",
            "registry.example.com/acme/web:latest",
            "acme release tools",
        );

        let value = serde_json::to_value(&claim).unwrap();
        assert_eq!(value["critical"]["type"], CLAIM_TYPE);
        assert_eq!(
            value["critical"]["image"]["docker-manifest-digest"],
            "sha256:abc"
        );
        assert_eq!(
            value["critical"]["identity"]["docker-reference"],
            "registry.example.com/acme/web:latest"
        );
        assert_eq!(value["optional"]["creator"], "acme release tools");
    }

    #[test]
    fn encode_roundtrips_through_base64() {
        use base64::Engine as _;

        let claim = ManifestClaim::new("sha256:abc", "registry.example.com/acme/web:1.0", "tests");
        let encoded = claim.encode().unwrap();

        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .unwrap();
        let back: ManifestClaim = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(back, claim);
    }

    #[test]
    fn claim_request_serializes_wire_names() {
        let request = ClaimRequest {
            request_id: RequestId::from_ulid(Ulid::new()),
            sig_key_id: "key-a".to_string(),
            claim_file: "e30=".to_string(),
            task_id: "task-42".to_string(),
            manifest_digest: "sha256:abc".to_string(),
            repo: "acme-org/acme----web".to_string(),
            image_name: "acme/web".to_string(),
            docker_reference: "registry.example.com/acme/web:latest".to_string(),
            created: Utc::now(),
        };

        let value = serde_json::to_value(&request).unwrap();
        for field in [
            "request_id",
            "sig_key_id",
            "claim_file",
            "task_id",
            "manifest_digest",
            "repo",
            "image_name",
            "docker_reference",
            "created",
        ] {
            assert!(value.get(field).is_some(), "missing wire field {field}");
        }
        assert_eq!(
            value["request_id"],
            request.request_id.as_ulid().to_string()
        );
    }
}
