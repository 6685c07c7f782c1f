use crate::command::EntityId;
use crate::error::{DenialReason, EnforcementError, TransientReason};
use serde_json::Value;

/// Outcome of one enforcement decision.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthorizationResult {
    /// The command may proceed; queries carrying a response get it back
    /// pruned to the caller's view.
    Allowed(Option<Value>),
    Denied(DenialReason),
    Transient(TransientReason),
}

impl AuthorizationResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthorizationResult::Allowed(_))
    }

    /// Short outcome label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            AuthorizationResult::Allowed(_) => "allowed",
            AuthorizationResult::Denied(DenialReason::NotFound) => "denied: not found",
            AuthorizationResult::Denied(DenialReason::InsufficientPermissions) => {
                "denied: insufficient permissions"
            }
            AuthorizationResult::Denied(DenialReason::NamespaceBlocked) => "denied: namespace blocked",
            AuthorizationResult::Transient(TransientReason::Timeout) => "transient: timeout",
            AuthorizationResult::Transient(TransientReason::LoaderFailure) => {
                "transient: loader failure"
            }
        }
    }

    /// Convert into what the dispatch layer returns to the caller.
    pub fn into_result(self, entity: &EntityId) -> Result<Option<Value>, EnforcementError> {
        match self {
            AuthorizationResult::Allowed(response) => Ok(response),
            AuthorizationResult::Denied(DenialReason::NamespaceBlocked) => {
                Err(EnforcementError::NamespaceBlocked {
                    namespace: entity.namespace().to_string(),
                })
            }
            AuthorizationResult::Denied(_) => Err(EnforcementError::NotAccessible {
                entity: entity.to_string(),
            }),
            AuthorizationResult::Transient(reason) => Err(EnforcementError::Unavailable {
                entity: entity.to_string(),
                reason,
            }),
        }
    }
}
