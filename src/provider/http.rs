//! HTTP implementation of the provider seam
//!
//! Talks to the account's provider gateway: JSON bodies, bearer auth, no
//! client-side retry layer. Session acquisition is not handled here; the
//! token arrives ready to use from the settings.

use serde::Deserialize;
use std::time::Duration;
use ureq::http;
use ureq::Agent;

use super::error::ProviderError;
use super::types::{
    FunctionConfig, FunctionRequest, StackObservation, StackRequest, StackResourceRecord,
};
use super::{FunctionApi, StackApi};

const CALL_TIMEOUT: Duration = Duration::from_secs(60);

pub struct HttpProviderClient {
    agent: Agent,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeStacksBody {
    stacks: Vec<StackObservation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeResourcesBody {
    stack_resources: Vec<StackResourceRecord>,
}

impl HttpProviderClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        // Non-2xx responses are mapped by hand so error payloads stay readable
        let config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(CALL_TIMEOUT))
            .build();
        Self {
            agent: config.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Pull code/message out of an error response, falling back to raw text.
    fn error_body(response: &mut http::Response<ureq::Body>) -> ErrorBody {
        let raw = response
            .body_mut()
            .read_to_string()
            .unwrap_or_else(|e| e.to_string());
        serde_json::from_str(&raw).unwrap_or(ErrorBody {
            code: String::new(),
            message: raw,
        })
    }

    fn map_error(name: &str, mut response: http::Response<ureq::Body>) -> ProviderError {
        let status = response.status();
        let body = Self::error_body(&mut response);
        log::debug!(
            "Provider returned {} for {}: code={} message={}",
            status,
            name,
            body.code,
            body.message
        );
        if status == http::StatusCode::CONFLICT || body.code == "AlreadyExistsException" {
            ProviderError::AlreadyExists(name.to_string())
        } else if status == http::StatusCode::NOT_FOUND || body.code.contains("NotFound") {
            ProviderError::NotFound(name.to_string())
        } else {
            ProviderError::Rejected {
                message: if body.message.is_empty() {
                    format!("{} ({status})", body.code)
                } else {
                    body.message
                },
            }
        }
    }
}

impl StackApi for HttpProviderClient {
    fn create_stack(&self, request: &StackRequest) -> Result<(), ProviderError> {
        let response = self
            .agent
            .post(&self.url("/stacks"))
            .header("Authorization", &self.bearer())
            .send_json(request)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::map_error(&request.stack_name, response))
        }
    }

    fn update_stack(&self, request: &StackRequest) -> Result<(), ProviderError> {
        let mut response = self
            .agent
            .put(&self.url(&format!("/stacks/{}", request.stack_name)))
            .header("Authorization", &self.bearer())
            .send_json(request)?;

        if response.status().is_success() {
            Ok(())
        } else {
            // The benign "nothing changed" case is decided by message text,
            // in exactly one place
            let body = Self::error_body(&mut response);
            Err(ProviderError::from_update_rejection(body.message))
        }
    }

    fn describe_stacks(&self, stack_name: &str) -> Result<Vec<StackObservation>, ProviderError> {
        let mut response = self
            .agent
            .get(&self.url(&format!("/stacks/{stack_name}")))
            .header("Authorization", &self.bearer())
            .call()?;

        if !response.status().is_success() {
            return Err(Self::map_error(stack_name, response));
        }
        let body: DescribeStacksBody = response
            .body_mut()
            .read_json()
            .map_err(|e| ProviderError::Payload(e.to_string()))?;
        Ok(body.stacks)
    }

    fn describe_stack_resources(
        &self,
        stack_name: &str,
    ) -> Result<Vec<StackResourceRecord>, ProviderError> {
        let mut response = self
            .agent
            .get(&self.url(&format!("/stacks/{stack_name}/resources")))
            .header("Authorization", &self.bearer())
            .call()?;

        if !response.status().is_success() {
            return Err(Self::map_error(stack_name, response));
        }
        let body: DescribeResourcesBody = response
            .body_mut()
            .read_json()
            .map_err(|e| ProviderError::Payload(e.to_string()))?;
        Ok(body.stack_resources)
    }
}

impl FunctionApi for HttpProviderClient {
    fn invoke(
        &self,
        function_name: &str,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        let mut response = self
            .agent
            .post(&self.url(&format!("/functions/{function_name}/invocations")))
            .header("Authorization", &self.bearer())
            .send_json(payload)?;

        if !response.status().is_success() {
            return Err(Self::map_error(function_name, response));
        }
        response
            .body_mut()
            .read_json()
            .map_err(|e| ProviderError::Payload(e.to_string()))
    }

    fn get_function(&self, function_name: &str) -> Result<FunctionConfig, ProviderError> {
        let mut response = self
            .agent
            .get(&self.url(&format!("/functions/{function_name}")))
            .header("Authorization", &self.bearer())
            .call()?;

        if !response.status().is_success() {
            return Err(Self::map_error(function_name, response));
        }
        response
            .body_mut()
            .read_json()
            .map_err(|e| ProviderError::Payload(e.to_string()))
    }

    fn create_function(&self, request: &FunctionRequest) -> Result<FunctionConfig, ProviderError> {
        let mut response = self
            .agent
            .post(&self.url("/functions"))
            .header("Authorization", &self.bearer())
            .send_json(request)?;

        if !response.status().is_success() {
            return Err(Self::map_error(&request.function_name, response));
        }
        response
            .body_mut()
            .read_json()
            .map_err(|e| ProviderError::Payload(e.to_string()))
    }

    fn update_function(&self, request: &FunctionRequest) -> Result<FunctionConfig, ProviderError> {
        let mut response = self
            .agent
            .put(&self.url(&format!("/functions/{}", request.function_name)))
            .header("Authorization", &self.bearer())
            .send_json(request)?;

        if !response.status().is_success() {
            return Err(Self::map_error(&request.function_name, response));
        }
        response
            .body_mut()
            .read_json()
            .map_err(|e| ProviderError::Payload(e.to_string()))
    }
}
