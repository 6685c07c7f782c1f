//! Errors of the enforcement layer.
//!
//! # Security Note
//! A caller never learns whether a denial means "does not exist" or "not
//! allowed": both render as the same not-found error. Transient failures
//! stay distinguishable so that clients know to retry.

use enforcer_cache::CacheError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a command was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenialReason {
    NotFound,
    InsufficientPermissions,
    NamespaceBlocked,
}

/// Why no decision could be made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransientReason {
    Timeout,
    LoaderFailure,
}

impl From<&CacheError> for TransientReason {
    fn from(err: &CacheError) -> Self {
        match err {
            CacheError::Timeout(_) => TransientReason::Timeout,
            CacheError::LoaderFailure(_) | CacheError::Config(_) => TransientReason::LoaderFailure,
        }
    }
}

/// The caller-visible error for a command that was not allowed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnforcementError {
    #[error("The entity '{entity}' could not be found or the requester had insufficient permissions to access it")]
    NotAccessible { entity: String },

    #[error("The namespace '{namespace}' is blocked")]
    NamespaceBlocked { namespace: String },

    #[error("The authorization decision for '{entity}' is temporarily unavailable, please retry")]
    Unavailable {
        entity: String,
        reason: TransientReason,
    },
}

/// Serializable error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub status: u16,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl EnforcementError {
    /// HTTP-style status code for the error.
    pub fn status_code(&self) -> u16 {
        match self {
            EnforcementError::NotAccessible { .. } => 404,
            EnforcementError::NamespaceBlocked { .. } => 403,
            EnforcementError::Unavailable { .. } => 503,
        }
    }

    /// Get error code for the error type
    pub fn error_code(&self) -> &str {
        match self {
            EnforcementError::NotAccessible { .. } => "ENTITY_NOT_ACCESSIBLE",
            EnforcementError::NamespaceBlocked { .. } => "NAMESPACE_BLOCKED",
            EnforcementError::Unavailable { .. } => "AUTHORIZATION_UNAVAILABLE",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, EnforcementError::Unavailable { .. })
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: ErrorDetail {
                status: self.status_code(),
                code: self.error_code().to_string(),
                message: self.to_string(),
                retryable: self.is_retryable().then_some(true),
            },
        }
    }
}

/// Errors loading the enforcement configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Configuration I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

pub type Result<T> = std::result::Result<T, EnforcementError>;
