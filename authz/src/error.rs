//! Error types for the authorization engine.
//!
//! # Security Note
//! Error messages must not leak policy details. Deny decisions are plain
//! `false` results, not errors; these errors only cover input that never
//! reaches the resolver.

use thiserror::Error;

/// Errors that can occur while preparing an authorization decision.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// An enforcer was requested for a deleted policy.
    ///
    /// Callers treat this exactly like a missing policy.
    #[error("Policy not accessible: {0}")]
    PolicyNotAccessible(String),

    /// A caller-supplied subject or resource key could not be parsed.
    #[error("Invalid authorization input: {0}")]
    InvalidInput(#[from] policies::PolicyError),
}

/// A specialized Result type for authorization operations.
pub type Result<T> = std::result::Result<T, AuthzError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthzError::PolicyNotAccessible("org.example:lamp".into());
        assert_eq!(err.to_string(), "Policy not accessible: org.example:lamp");

        let err = AuthzError::from(policies::PolicyError::InvalidSubjectId("x".into()));
        assert_eq!(err.to_string(), "Invalid authorization input: Invalid subject id: x");
    }
}
