//! Bus connection parameters.
//!
//! The engine subscribes to a reply destination scoped to the publishing
//! task, so responses from unrelated runs are never observed. The connection
//! (and its TLS credentials) belongs to exactly one run's engine instance.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placeholder substituted into the reply-address template.
pub const TASK_ID_PLACEHOLDER: &str = "{task_id}";

/// Default reply-address pattern.
pub const DEFAULT_REPLY_TEMPLATE: &str =
    "queue://Consumer.claimgate.{task_id}.VirtualTopic.eng.signing.container.sign";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reply address template must contain {{task_id}}: {template}")]
    MissingTaskIdPlaceholder { template: String },

    #[error("at least one broker URL is required")]
    NoBrokers,
}

/// Connection parameters for one run's bus subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    pub broker_urls: Vec<String>,
    pub reply_address_template: String,
    /// Client certificate (with key) for mutual TLS.
    pub client_cert: PathBuf,
    /// CA bundle the brokers are verified against.
    pub ca_cert: PathBuf,
}

impl BusConfig {
    pub fn new(
        broker_urls: Vec<String>,
        client_cert: PathBuf,
        ca_cert: PathBuf,
    ) -> Result<Self, ConfigError> {
        if broker_urls.is_empty() {
            return Err(ConfigError::NoBrokers);
        }
        Ok(Self {
            broker_urls,
            reply_address_template: DEFAULT_REPLY_TEMPLATE.to_string(),
            client_cert,
            ca_cert,
        })
    }

    pub fn with_reply_template(mut self, template: impl Into<String>) -> Result<Self, ConfigError> {
        let template = template.into();
        if !template.contains(TASK_ID_PLACEHOLDER) {
            return Err(ConfigError::MissingTaskIdPlaceholder { template });
        }
        self.reply_address_template = template;
        Ok(self)
    }

    /// Reply destination scoped to one publishing task.
    pub fn reply_address(&self, task_id: &str) -> String {
        self.reply_address_template
            .replace(TASK_ID_PLACEHOLDER, task_id)
    }
}
