//! Brokering seams for identity and encryption resources
//!
//! Role and key provisioning live outside this tool; a function push only
//! needs the converge-or-skip contract below. Implementations may create
//! the resource, update it in place, or return the existing one untouched.

use anyhow::Result;

use crate::provider::Tag;

/// Converges an execution role for an application and hands back its ARN.
pub trait RoleBroker {
    fn broker_role(&self, app_name: &str, policy_document: &str) -> Result<String>;
}

/// Converges (or retires) an encryption key for an application.
pub trait KeyBroker {
    /// Ensure a key exists for the application, returning its ARN.
    fn broker_key(&self, app_name: &str, tags: &[Tag]) -> Result<String>;

    /// Retire the application's key when encryption is switched off.
    fn delete_key(&self, app_name: &str) -> Result<()>;
}
