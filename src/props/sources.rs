//! Concrete property sources, in the order a push merges them

use anyhow::{Context, Result};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::HashMap;
use std::path::PathBuf;

use super::{file, PropertyLayer, PropertySource};
use crate::provider::FunctionApi;

const RANDOM_PASSWORD_LENGTH: usize = 20;

pub const BUILD_NUMBER: &str = "buildNumber";
pub const MAVEN_GROUP: &str = "maven.groupId";
pub const MAVEN_ARTIFACT: &str = "maven.artifactId";
pub const MAVEN_VERSION: &str = "maven.version";

/// The previous run's `stackoutput.properties`, lowest precedence.
pub struct PreviousOutputs {
    path: PathBuf,
}

impl PreviousOutputs {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl PropertySource for PreviousOutputs {
    fn name(&self) -> &str {
        "stackoutput.properties"
    }

    fn layer(&self) -> Result<Option<PropertyLayer>> {
        file::load(&self.path)
    }
}

/// The `{env}.properties` override file from the working directory.
pub struct EnvOverrides {
    path: PathBuf,
    name: String,
}

impl EnvOverrides {
    pub fn new(root: &std::path::Path, environment: &str) -> Self {
        let name = format!("{environment}.properties");
        Self {
            path: root.join(&name),
            name,
        }
    }
}

impl PropertySource for EnvOverrides {
    fn name(&self) -> &str {
        &self.name
    }

    fn layer(&self) -> Result<Option<PropertyLayer>> {
        file::load(&self.path)
    }
}

/// Build metadata injected by the CI pipeline, plus a fresh random secret.
pub struct BuildMetadata {
    variables: HashMap<String, String>,
    environment: String,
}

impl BuildMetadata {
    pub fn new(variables: HashMap<String, String>, environment: &str) -> Self {
        Self {
            variables,
            environment: environment.to_string(),
        }
    }

    /// group:artifact:version coordinates, when the pipeline supplied them.
    pub fn artifact_coordinates(&self) -> Option<String> {
        let artifact = self.variables.get(MAVEN_ARTIFACT)?;
        if artifact.is_empty() {
            return None;
        }
        let group = self.variables.get(MAVEN_GROUP).map_or("", String::as_str);
        let version = self.variables.get(MAVEN_VERSION).map_or("", String::as_str);
        Some(format!("{group}:{artifact}:{version}"))
    }
}

impl PropertySource for BuildMetadata {
    fn name(&self) -> &str {
        "build metadata"
    }

    fn layer(&self) -> Result<Option<PropertyLayer>> {
        let mut layer = PropertyLayer::new();

        layer.insert("RandomPassword".to_string(), random_password());

        let build = self
            .variables
            .get(BUILD_NUMBER)
            .map_or(String::new(), String::clone);
        layer.insert("BuildId".to_string(), format!("BUILD{build}"));

        if let Some(artifact) = self.variables.get(MAVEN_ARTIFACT) {
            layer.insert("ArtifactId".to_string(), artifact.clone());
        }
        if let Some(version) = self.variables.get(MAVEN_VERSION) {
            layer.insert("Version".to_string(), version.clone());
        }
        layer.insert("DeployEnvironment".to_string(), self.environment.clone());

        Ok(Some(layer))
    }
}

fn random_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}

/// The remote variable broker, highest precedence.
///
/// Invoked with the lowercase region name; must answer with a flat JSON
/// object whose values are all strings. Any other shape is fatal — the
/// environment's required configuration is unknown without it.
pub struct VariableBroker<'a> {
    api: &'a dyn FunctionApi,
    function_name: &'a str,
    region: &'a str,
}

impl<'a> VariableBroker<'a> {
    pub fn new(api: &'a dyn FunctionApi, function_name: &'a str, region: &'a str) -> Self {
        Self {
            api,
            function_name,
            region,
        }
    }
}

impl PropertySource for VariableBroker<'_> {
    fn name(&self) -> &str {
        "variable broker"
    }

    fn layer(&self) -> Result<Option<PropertyLayer>> {
        let payload = serde_json::Value::String(self.region.to_lowercase());
        let response = self
            .api
            .invoke(self.function_name, &payload)
            .with_context(|| format!("Variable broker {} failed", self.function_name))?;

        let variables: PropertyLayer = serde_json::from_value(response.clone())
            .with_context(|| format!("Unable to parse variables from {response}"))?;

        for (key, value) in &variables {
            crate::ui::info(&format!("Injecting {key} = {value}"));
        }
        Ok(Some(variables))
    }
}
