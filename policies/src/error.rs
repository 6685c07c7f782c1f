//! Error types for policy documents.
//!
//! Every structural problem with a policy document is rejected here, at the
//! model boundary, so the resolver never sees malformed input.

use thiserror::Error;

/// Errors raised while building or modifying a policy document.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The policy id is not of the form `<namespace>:<name>`.
    #[error("Invalid policy id: {0}")]
    InvalidPolicyId(String),

    /// A resource path is not a valid JSON pointer.
    #[error("Invalid JSON pointer: {0}")]
    InvalidPointer(String),

    /// A resource key is not of the form `<type>:<pointer>`.
    #[error("Invalid resource key: {0}")]
    InvalidResourceKey(String),

    /// A subject id is not of the form `<issuer>:<subject>`.
    #[error("Invalid subject id: {0}")]
    InvalidSubjectId(String),

    /// A policy entry label is empty.
    #[error("Policy entry label must not be empty")]
    EmptyLabel,

    /// A permission name is empty.
    #[error("Permission names must not be empty (resource {0})")]
    EmptyPermission(String),

    /// The same permission is both granted and revoked on one resource.
    #[error("Permission {permission} is both granted and revoked on {resource}")]
    ConflictingPermission { resource: String, permission: String },

    /// A modification names an entry label the policy does not have.
    #[error("Policy entry not found: {0}")]
    EntryNotFound(String),

    /// The policy is a tombstone and cannot be modified.
    #[error("Policy {0} is deleted")]
    PolicyDeleted(String),

    /// The document is not valid JSON for the policy wire format.
    #[error("Policy document error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for policy document operations.
pub type Result<T> = std::result::Result<T, PolicyError>;
