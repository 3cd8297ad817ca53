//! Demo: sign a small batch of manifest claims against the in-memory bus.

use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use claimgate_core::bus::BusConfig;
use claimgate_core::claims::{ClaimBuilder, SigningItem};
use claimgate_core::impls::{EchoSigningAuthority, InMemorySignatureStore, channel};
use claimgate_core::ports::{IdGenerator, SystemClock, UlidGenerator};
use claimgate_core::workflow::{WorkflowConfig, sign_and_reconcile};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let task_id = std::env::args().nth(1).unwrap_or_else(|| "task-42".to_string());

    // (A) Build the claim batch for one pushed image.
    let ids = UlidGenerator::new(SystemClock);
    let run_id = ids.run_id();
    let builder = ClaimBuilder::new(task_id.as_str(), "acme-org", ids, SystemClock)
        .registries(["registry.example.com"])
        .signing_keys(["4096R/55A34A82 SHA-256"]);
    let item = SigningItem {
        repo: "acme/web".to_string(),
        tags: vec!["latest".to_string(), "1.4".to_string()],
        digests: vec![
            "sha256:6c3c624b58dbbcd3c0dd82b4c53f04194d1247c6eebdaab7c610cf7d66709b3b".to_string(),
            "sha256:1ff6c18fbef2045af6b9c16bf034cc421a29027b800e4f9b68ae9b1cb3e9ae07".to_string(),
        ],
    };
    let claims = builder.item_claims(&item)?;
    info!(count = claims.len(), "constructed claim batch");

    // (B) Wire the run-scoped subscription and a stand-in signing authority.
    let bus = BusConfig::new(
        vec!["amqps://broker-01.example.com:5671".to_string()],
        PathBuf::from("/etc/pki/claimgate/client.pem"),
        PathBuf::from("/etc/pki/tls/certs/ca-bundle.crt"),
    )?;
    let (injector, subscription) = channel(&bus.reply_address(&task_id));
    let authority = EchoSigningAuthority::new(injector, Duration::from_millis(300));

    // (C) Run the signing pass end to end.
    let store = InMemorySignatureStore::new();
    let outcome = sign_and_reconcile(
        run_id,
        claims,
        authority,
        subscription,
        &store,
        WorkflowConfig::default(),
    )
    .await?;
    info!(?outcome, "signing pass finished");

    for upload in store.uploaded().await {
        println!(
            "{}",
            serde_json::json!({
                "reference": upload.reference,
                "manifest_digest": upload.manifest_digest,
                "sig_key_id": upload.sig_key_id,
            })
        );
    }

    Ok(())
}
