//! Workflow configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::network::ResourceType;
use crate::{Error, Result};

/// Configuration for one selection/verification workflow
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// How responses are matched to actions
    #[serde(default)]
    pub correlation: CorrelationConfig,

    /// Random selection policy
    #[serde(default)]
    pub selection: SelectionConfig,
}

impl WorkflowConfig {
    pub fn validate(&self) -> Result<()> {
        self.correlation.validate()
    }
}

/// Response correlation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationConfig {
    /// Substring identifying the configurator AJAX endpoint (case-insensitive)
    #[serde(default = "default_endpoint_token")]
    pub endpoint_token: String,

    /// How long to wait for the matching response
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Resource types that count as the triggering fetch
    #[serde(default = "default_resource_types")]
    pub resource_types: Vec<ResourceType>,
}

fn default_endpoint_token() -> String {
    "cableguy_ajax".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_resource_types() -> Vec<ResourceType> {
    vec![ResourceType::Xhr, ResourceType::Fetch]
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            endpoint_token: default_endpoint_token(),
            timeout_ms: default_timeout_ms(),
            resource_types: default_resource_types(),
        }
    }
}

impl CorrelationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoint_token.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "correlation.endpoint_token must not be empty".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "correlation.timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.resource_types.is_empty() {
            return Err(Error::InvalidConfig(
                "correlation.resource_types must list at least one type".to_string(),
            ));
        }
        Ok(())
    }
}

/// Selection policy settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Seed for the random picker (None = OS entropy)
    #[serde(default)]
    pub seed: Option<u64>,

    /// Brand to verify when the backend lists it; otherwise a random one
    #[serde(default)]
    pub preferred_brand: Option<String>,
}
