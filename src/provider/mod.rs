//! Provider client seam
//!
//! The engine talks to the cloud provider through these two traits.
//! `http::HttpProviderClient` is the real implementation; tests supply
//! hand-rolled mocks from `test_support`.

pub mod error;
pub mod http;
pub mod types;

pub use error::{ErrorClass, ProviderError};
pub use types::{
    FunctionConfig, FunctionRequest, Parameter, StackObservation, StackRequest,
    StackResourceRecord, Tag,
};

/// Stack surface: create, update, and two read-only describe calls.
pub trait StackApi {
    fn create_stack(&self, request: &StackRequest) -> Result<(), ProviderError>;

    fn update_stack(&self, request: &StackRequest) -> Result<(), ProviderError>;

    /// Repeatable, read-only status query for every stack under the name.
    fn describe_stacks(&self, stack_name: &str) -> Result<Vec<StackObservation>, ProviderError>;

    /// Read-only sub-resource enumeration, called once after terminal success.
    fn describe_stack_resources(
        &self,
        stack_name: &str,
    ) -> Result<Vec<StackResourceRecord>, ProviderError>;
}

/// Function surface: synchronous invoke (variable broker) plus converge calls.
pub trait FunctionApi {
    fn invoke(
        &self,
        function_name: &str,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError>;

    fn get_function(&self, function_name: &str) -> Result<FunctionConfig, ProviderError>;

    fn create_function(&self, request: &FunctionRequest) -> Result<FunctionConfig, ProviderError>;

    fn update_function(&self, request: &FunctionRequest) -> Result<FunctionConfig, ProviderError>;
}
