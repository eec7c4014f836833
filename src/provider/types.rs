//! Wire types for the provider gateway

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A typed template parameter forwarded on create/update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Parameter {
    pub parameter_key: String,
    pub parameter_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A stack create/update submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StackRequest {
    pub stack_name: String,
    pub template_body: String,
    pub parameters: Vec<Parameter>,
    pub tags: Vec<Tag>,
    pub capabilities: Vec<String>,
}

/// One stack's provider-reported status at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StackObservation {
    pub stack_name: String,
    pub stack_status: String,
    #[serde(default)]
    pub stack_status_reason: Option<String>,
}

/// One provisioned sub-resource under a stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StackResourceRecord {
    pub logical_resource_id: String,
    pub physical_resource_id: String,
    pub resource_type: String,
}

/// A function create/update submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FunctionRequest {
    pub function_name: String,
    pub handler: String,
    pub runtime: String,
    pub role: String,
    pub timeout: u32,
    pub memory_size: u32,
    #[serde(default)]
    pub environment: IndexMap<String, String>,
    #[serde(default)]
    pub kms_key_arn: Option<String>,
    /// Deployment package bytes, base64-encoded
    pub code_zip: String,
    pub tags: Vec<Tag>,
}

/// Provider-reported function configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FunctionConfig {
    pub function_name: String,
    pub function_arn: String,
    pub handler: String,
    pub runtime: String,
    #[serde(default)]
    pub kms_key_arn: Option<String>,
}
