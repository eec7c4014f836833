//! Provider error taxonomy
//!
//! The convergence engine never inspects provider error text itself; the
//! classification of an update rejection into "benign no-op" versus "real
//! failure" happens once, here, behind a typed seam.

use thiserror::Error;

/// The provider's wording for an update that would change nothing. The
/// match must stay exact: anything else on an update is a real failure.
pub const NO_UPDATES_SIGNATURE: &str = "No updates are to be performed";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("resource already exists: {0}")]
    AlreadyExists(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("no updates to perform")]
    NoChanges,

    #[error("provider rejected the request: {message}")]
    Rejected { message: String },

    #[error("provider transport error: {0}")]
    Http(Box<ureq::Error>),

    #[error("unexpected provider payload: {0}")]
    Payload(String),
}

/// Coarse classes the engine branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Safe to continue the pipeline without waiting
    Benign,
    /// Aborts the push; retrying cannot succeed without operator intervention
    Fatal,
}

impl ProviderError {
    /// Classify an update rejection by the provider's error message.
    pub fn from_update_rejection(message: String) -> Self {
        if message.contains(NO_UPDATES_SIGNATURE) {
            Self::NoChanges
        } else {
            Self::Rejected { message }
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NoChanges => ErrorClass::Benign,
            _ => ErrorClass::Fatal,
        }
    }
}

impl From<ureq::Error> for ProviderError {
    fn from(err: ureq::Error) -> Self {
        Self::Http(Box::new(err))
    }
}
