//! The function push verb
//!
//! Reads a function deployment descriptor (JSON preferred, YAML accepted),
//! substitutes the resolved property namespace into the descriptor text,
//! then creates or updates the remote function. Role and key provisioning
//! go through the brokering seams when configured.

use anyhow::{Context as AnyhowContext, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::broker::{KeyBroker, RoleBroker};
use crate::cli::PushArgs;
use crate::config::PushSettings;
use crate::engine::build_tags;
use crate::props::sources::{BuildMetadata, EnvOverrides, PreviousOutputs, VariableBroker};
use crate::props::{self, PropertyLayer, PropertySource};
use crate::provider::http::HttpProviderClient;
use crate::provider::{FunctionApi, FunctionRequest, ProviderError};
use crate::ui;
use crate::Context;

pub const DESCRIPTOR_JSON: &str = "function.json";
pub const DESCRIPTOR_YML: &str = "function.yml";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FunctionDescriptor {
    function_name: String,
    handler: String,
    runtime: String,
    zip_file_name: String,
    #[serde(default)]
    role: Option<String>,
    #[serde(default = "default_timeout")]
    timeout: u32,
    #[serde(default = "default_memory")]
    memory_size: u32,
    #[serde(default)]
    environment: IndexMap<String, String>,
    #[serde(default)]
    use_kms: bool,
}

fn default_timeout() -> u32 {
    30
}

fn default_memory() -> u32 {
    128
}

pub fn run(_ctx: &Context, args: &PushArgs) -> Result<()> {
    let root = PathBuf::from(&args.directory);
    let settings = PushSettings::load(&root)?;
    let token = settings.auth_token()?;
    let client = HttpProviderClient::new(&settings.endpoint, token);

    push(&client, None, None, &settings, &root, args)
}

fn push(
    api: &dyn FunctionApi,
    role_broker: Option<&dyn RoleBroker>,
    key_broker: Option<&dyn KeyBroker>,
    settings: &PushSettings,
    root: &Path,
    args: &PushArgs,
) -> Result<()> {
    let variables: HashMap<String, String> = args.variables.iter().cloned().collect();
    let metadata = BuildMetadata::new(variables, &args.environment);
    let coordinates = metadata.artifact_coordinates();

    let previous = PreviousOutputs::new(root.join(crate::engine::outputs::OUTPUT_FILE));
    let overrides = EnvOverrides::new(root, &args.environment);
    let broker = settings.broker_enabled().then(|| {
        VariableBroker::new(api, &settings.variable_broker_function, &settings.region)
    });

    let mut sources: Vec<&dyn PropertySource> = vec![&previous, &overrides, &metadata];
    if let Some(broker) = &broker {
        sources.push(broker);
    }
    let properties = props::resolve(&sources)?;

    let descriptor = load_descriptor(root, &properties)?;
    ui::header(&format!("Pushing function {}", descriptor.function_name));

    let tags = build_tags(
        &descriptor.function_name,
        &args.environment,
        settings,
        coordinates.as_deref(),
    );

    let role = match (role_broker, &descriptor.role) {
        (Some(broker), _) => {
            ui::info(&format!(
                "Brokering execution role for {}",
                descriptor.function_name
            ));
            broker.broker_role(&descriptor.function_name, &execution_policy(root)?)?
        }
        (None, Some(role)) => role.clone(),
        (None, None) => anyhow::bail!(
            "Descriptor names no execution role and no role broker is configured"
        ),
    };

    let kms_key_arn = if descriptor.use_kms {
        let broker = key_broker
            .context("Descriptor requests a KMS key but no key broker is configured")?;
        Some(broker.broker_key(&descriptor.function_name, &tags)?)
    } else {
        if let Some(broker) = key_broker {
            broker.delete_key(&descriptor.function_name)?;
        }
        None
    };

    let zip_path = root.join(&descriptor.zip_file_name);
    let code = fs::read(&zip_path)
        .with_context(|| format!("Failed to read zip file: {}", zip_path.display()))?;

    let request = FunctionRequest {
        function_name: descriptor.function_name.clone(),
        handler: descriptor.handler,
        runtime: descriptor.runtime,
        role,
        timeout: descriptor.timeout,
        memory_size: descriptor.memory_size,
        environment: descriptor.environment,
        kms_key_arn,
        code_zip: BASE64.encode(code),
        tags,
    };

    let config = match api.get_function(&descriptor.function_name) {
        Ok(_) => {
            ui::info("Function exists, attempting update...");
            api.update_function(&request)?
        }
        Err(ProviderError::NotFound(_)) => {
            ui::info("Pushing new function");
            api.create_function(&request)?
        }
        Err(err) => return Err(err.into()),
    };

    ui::kv("arn", &config.function_arn);
    if let Some(key) = &config.kms_key_arn {
        ui::info(&format!("Pushed function with KMS key {key}"));
    }

    let mut output = PropertyLayer::new();
    output.insert(
        format!("aws.function.{}", config.function_name),
        config.function_arn.clone(),
    );
    props::file::store(&root.join(crate::engine::outputs::OUTPUT_FILE), &output)?;

    ui::success(&format!("Function {} pushed", config.function_name));
    Ok(())
}

/// Pick the descriptor file, substitute properties into its text, parse.
///
/// JSON wins when both forms exist; no descriptor at all is fatal.
fn load_descriptor(root: &Path, properties: &PropertyLayer) -> Result<FunctionDescriptor> {
    let json_path = root.join(DESCRIPTOR_JSON);
    let yml_path = root.join(DESCRIPTOR_YML);

    let (path, is_json) = if json_path.exists() {
        (json_path, true)
    } else if yml_path.exists() {
        (yml_path, false)
    } else {
        anyhow::bail!("No function descriptor provided");
    };

    ui::info(&format!("Using {}", path.display()));
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("Could not read {}", path.display()))?;
    let rendered = props::substitute(&raw, properties);

    let descriptor = if is_json {
        serde_json::from_str(&rendered)
            .with_context(|| format!("Invalid descriptor {}", path.display()))?
    } else {
        serde_yaml::from_str(&rendered)
            .with_context(|| format!("Invalid descriptor {}", path.display()))?
    };
    Ok(descriptor)
}

/// The execution policy handed to the role broker: the working directory's
/// `iam-policy.json` when present, otherwise empty (the broker applies its
/// default).
fn execution_policy(root: &Path) -> Result<String> {
    let path = root.join("iam-policy.json");
    if path.exists() {
        fs::read_to_string(&path).with_context(|| format!("Could not read {}", path.display()))
    } else {
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::test_support::MockFunctionApi;
    use crate::provider::FunctionConfig;
    use serde_json::json;

    fn settings() -> PushSettings {
        PushSettings {
            endpoint: "https://provider.test/api".to_string(),
            region: "us-east-1".to_string(),
            project: "My Project".to_string(),
            auth_token_env: "DROVER_TOKEN".to_string(),
            app_tag_key: "application".to_string(),
            sbu_tag_key: "business_unit".to_string(),
            sbu: "cloud".to_string(),
            company: "acme".to_string(),
            variable_broker_function: String::new(),
        }
    }

    fn args(dir: &Path) -> PushArgs {
        PushArgs {
            directory: dir.display().to_string(),
            environment: "prod".to_string(),
            timeout: 1,
            variables: Vec::new(),
        }
    }

    fn write_descriptor(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    fn write_zip(dir: &Path) {
        fs::write(dir.join("code.zip"), b"zipbytes").unwrap();
    }

    const JSON_DESCRIPTOR: &str = r#"{
        "functionName": "billing-dev",
        "handler": "index.handler",
        "runtime": "nodejs20.x",
        "zipFileName": "code.zip",
        "role": "arn:aws:iam::123:role/exec"
    }"#;

    #[test]
    fn creates_function_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        write_descriptor(dir.path(), DESCRIPTOR_JSON, JSON_DESCRIPTOR);
        write_zip(dir.path());

        let api = MockFunctionApi::answering(json!({}));
        push(&api, None, None, &settings(), dir.path(), &args(dir.path())).unwrap();

        let created = api.created.borrow();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].function_name, "billing-dev");
        assert_eq!(created[0].timeout, 30);
        assert!(api.updated.borrow().is_empty());
    }

    #[test]
    fn push_writes_function_output_file() {
        let dir = tempfile::tempdir().unwrap();
        write_descriptor(dir.path(), DESCRIPTOR_JSON, JSON_DESCRIPTOR);
        write_zip(dir.path());

        let api = MockFunctionApi::answering(json!({}));
        push(&api, None, None, &settings(), dir.path(), &args(dir.path())).unwrap();

        let output = crate::props::file::load(&dir.path().join("stackoutput.properties"))
            .unwrap()
            .unwrap();
        assert_eq!(
            output.get("aws.function.billing-dev").unwrap(),
            "arn:aws:lambda:::function:billing-dev"
        );
    }

    #[test]
    fn updates_function_when_present() {
        let dir = tempfile::tempdir().unwrap();
        write_descriptor(dir.path(), DESCRIPTOR_JSON, JSON_DESCRIPTOR);
        write_zip(dir.path());

        let api = MockFunctionApi::answering(json!({})).with_existing(FunctionConfig {
            function_name: "billing-dev".to_string(),
            function_arn: "arn:aws:lambda:::function:billing-dev".to_string(),
            handler: "index.handler".to_string(),
            runtime: "nodejs20.x".to_string(),
            kms_key_arn: None,
        });
        push(&api, None, None, &settings(), dir.path(), &args(dir.path())).unwrap();

        assert!(api.created.borrow().is_empty());
        assert_eq!(api.updated.borrow().len(), 1);
    }

    #[test]
    fn yaml_descriptor_is_accepted_when_json_absent() {
        let dir = tempfile::tempdir().unwrap();
        write_descriptor(
            dir.path(),
            DESCRIPTOR_YML,
            "functionName: billing-DeployEnvironment\nhandler: index.handler\nruntime: nodejs20.x\nzipFileName: code.zip\nrole: arn:aws:iam::123:role/exec\n",
        );
        write_zip(dir.path());

        let api = MockFunctionApi::answering(json!({}));
        push(&api, None, None, &settings(), dir.path(), &args(dir.path())).unwrap();

        // Property substitution ran over the descriptor text first
        assert_eq!(api.created.borrow()[0].function_name, "billing-prod");
    }

    #[test]
    fn missing_descriptor_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let api = MockFunctionApi::answering(json!({}));

        let err =
            push(&api, None, None, &settings(), dir.path(), &args(dir.path())).unwrap_err();
        assert!(err.to_string().contains("No function descriptor"));
    }

    #[test]
    fn kms_request_without_key_broker_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_descriptor(
            dir.path(),
            DESCRIPTOR_JSON,
            r#"{
                "functionName": "billing-dev",
                "handler": "index.handler",
                "runtime": "nodejs20.x",
                "zipFileName": "code.zip",
                "role": "arn:aws:iam::123:role/exec",
                "useKms": true
            }"#,
        );
        write_zip(dir.path());

        let api = MockFunctionApi::answering(json!({}));
        let err =
            push(&api, None, None, &settings(), dir.path(), &args(dir.path())).unwrap_err();
        assert!(err.to_string().contains("no key broker"));
    }

    #[test]
    fn role_broker_overrides_descriptor_role() {
        struct FixedRole;
        impl RoleBroker for FixedRole {
            fn broker_role(&self, app_name: &str, _policy: &str) -> Result<String> {
                Ok(format!("arn:aws:iam::123:role/{app_name}-brokered"))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        write_descriptor(dir.path(), DESCRIPTOR_JSON, JSON_DESCRIPTOR);
        write_zip(dir.path());

        let api = MockFunctionApi::answering(json!({}));
        push(
            &api,
            Some(&FixedRole),
            None,
            &settings(),
            dir.path(),
            &args(dir.path()),
        )
        .unwrap();

        assert_eq!(
            api.created.borrow()[0].role,
            "arn:aws:iam::123:role/billing-dev-brokered"
        );
    }
}
