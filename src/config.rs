//! Push settings loaded from the pipeline working directory
//!
//! `drover.yml` carries the account-level knobs that Herman-style pipelines
//! bake into the plugin config: provider endpoint, tagging keys, and the
//! optional variable-broker function. A missing or malformed settings file
//! is a configuration error and aborts the push.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const SETTINGS_FILE: &str = "drover.yml";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PushSettings {
    /// Provider gateway base URL, e.g. https://provider.internal/api
    pub endpoint: String,

    /// Region the push targets, e.g. us-east-1
    pub region: String,

    /// Deployment project name, used to derive the stack name
    pub project: String,

    /// Environment variable holding the bearer token for provider calls
    #[serde(default = "default_token_env")]
    pub auth_token_env: String,

    /// Tag key for the owning application
    #[serde(default = "default_app_tag_key")]
    pub app_tag_key: String,

    /// Tag key for the strategic business unit
    #[serde(default = "default_sbu_tag_key")]
    pub sbu_tag_key: String,

    /// Strategic business unit tag value
    #[serde(default)]
    pub sbu: String,

    /// Company prefix used for the group:artifact:version coordinate tag
    #[serde(default)]
    pub company: String,

    /// Variable-broker function name; empty disables the broker layer
    #[serde(default)]
    pub variable_broker_function: String,
}

fn default_token_env() -> String {
    "DROVER_TOKEN".to_string()
}

fn default_app_tag_key() -> String {
    "application".to_string()
}

fn default_sbu_tag_key() -> String {
    "business_unit".to_string()
}

impl PushSettings {
    /// Load settings from `drover.yml` under the working directory.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(SETTINGS_FILE);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let settings: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid {}", path.display()))?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Resolve the provider bearer token from the configured env var.
    pub fn auth_token(&self) -> Result<String> {
        std::env::var(&self.auth_token_env)
            .with_context(|| format!("Provider token not set in ${}", self.auth_token_env))
    }

    pub fn broker_enabled(&self) -> bool {
        !self.variable_broker_function.is_empty()
    }
}
