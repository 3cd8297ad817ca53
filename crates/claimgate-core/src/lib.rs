//! claimgate-core
//!
//! Building blocks for signing container image manifests through an external,
//! independently-scheduled signing authority reachable over an asynchronous
//! message bus.
//!
//! Module map:
//! - **domain**: ids, claim requests, response records, run state, run errors
//! - **ports**: injected capabilities (claim transport, response source,
//!   signature store, clock, id generator)
//! - **engine**: the claim/response correlation engine (dispatcher, listener,
//!   watchdog, run loop, policy)
//! - **claims**: claim construction from signing items
//! - **sigstore**: signature-store filtering, result validation, and upload
//!   assembly
//! - **bus**: bus connection parameters and reply-address derivation
//! - **workflow**: the end-to-end signing pass
//! - **impls**: in-memory implementations for development and tests

pub mod bus;
pub mod claims;
pub mod domain;
pub mod engine;
pub mod impls;
pub mod ports;
pub mod sigstore;
pub mod workflow;
