use policies::PolicyError;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced to callers of the enforcer cache.
///
/// All variants are transient from the caller's point of view: none of them
/// says anything about whether access would be granted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Enforcer lookup timed out after {}", humantime::format_duration(*.0))]
    Timeout(Duration),

    #[error("Policy loader failed: {0}")]
    LoaderFailure(String),

    #[error("Invalid cache configuration: {0}")]
    Config(String),
}

/// Errors a [`crate::PolicyLoader`] may report.
#[derive(Error, Debug)]
pub enum LoaderError {
    /// The backing store could not be reached; the lookup may be retried.
    #[error("Policy store unavailable: {0}")]
    Unavailable(String),

    /// The stored document failed validation.
    #[error("Malformed policy: {0}")]
    Malformed(#[from] PolicyError),
}

/// Errors from modifying the in-memory policy store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Policy already exists: {0}")]
    AlreadyExists(String),

    #[error("Policy not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Policy(#[from] PolicyError),
}

pub type Result<T> = std::result::Result<T, CacheError>;
