//! Policy-based authorization for the twin platform.
//!
//! This crate turns a [`policies::Policy`] into an [`Enforcer`], the
//! decision function consulted for every command and response:
//!
//! - [`Enforcer::has_permission`] answers whether a set of subjects holds a
//!   permission at exactly one resource path.
//! - [`Enforcer::has_permission_on_or_below`] answers whether the permission
//!   holds at the path or anywhere underneath it.
//! - [`prune`] filters a JSON response down to the readable parts.
//!
//! Everything here is synchronous and free of shared mutable state; an
//! enforcer can be queried from any number of tasks at once.
//!
//! # Example
//!
//! ```
//! use authz::{has_permission, AuthorizationContext};
//! use policies::{permissions, Policy, PolicyEntry, PolicyId, ResourceKey};
//!
//! let policy = Policy::builder(PolicyId::parse("org.example:lamp").unwrap())
//!     .entry(
//!         PolicyEntry::builder("owner")
//!             .subject("google:sid")
//!             .grant("thing:/", [permissions::READ, permissions::WRITE])
//!             .revoke("thing:/attributes/serial", [permissions::WRITE])
//!             .build()
//!             .unwrap(),
//!     )
//!     .build();
//!
//! let subjects = AuthorizationContext::parse(["google:sid"]).unwrap();
//! let serial = ResourceKey::parse("thing:/attributes/serial").unwrap();
//! assert!(has_permission(&policy, &subjects, &serial, permissions::READ).unwrap());
//! assert!(!has_permission(&policy, &subjects, &serial, permissions::WRITE).unwrap());
//! ```
//!
//! # Security Note
//! Every query defaults to deny. A subject that matches no entry, a resource
//! type the policy never mentions and an empty policy all yield `false`.

pub mod enforcer;
pub mod error;
pub mod pruner;
pub mod types;

pub use enforcer::{Enforcer, ScopedEnforcer};
pub use error::{AuthzError, Result};
pub use pruner::prune;
pub use types::AuthorizationContext;

use policies::{Policy, ResourceKey};

/// One-off check against a policy document.
///
/// Builds a throwaway [`Enforcer`]; callers on a hot path should build the
/// enforcer once and keep it.
pub fn has_permission(
    policy: &Policy,
    subjects: &AuthorizationContext,
    resource: &ResourceKey,
    permission: &str,
) -> Result<bool> {
    Ok(Enforcer::new(policy)?.has_permission(resource, subjects, permission))
}

/// One-off variant of [`Enforcer::has_permission_on_or_below`].
pub fn has_permission_on_or_below(
    policy: &Policy,
    subjects: &AuthorizationContext,
    resource: &ResourceKey,
    permission: &str,
) -> Result<bool> {
    Ok(Enforcer::new(policy)?.has_permission_on_or_below(resource, subjects, permission))
}

#[cfg(test)]
mod tests {
    use super::*;
    use policies::{permissions, PolicyEntry, PolicyId};

    #[test]
    fn test_has_permission_on_deleted_policy_fails() {
        let policy = Policy::builder(PolicyId::parse("org.example:lamp").unwrap())
            .entry(
                PolicyEntry::builder("owner")
                    .subject("google:sid")
                    .grant("thing:/", [permissions::READ])
                    .build()
                    .unwrap(),
            )
            .build();
        let subjects = AuthorizationContext::parse(["google:sid"]).unwrap();
        let root = ResourceKey::parse("thing:/").unwrap();

        assert!(has_permission(&policy, &subjects, &root, permissions::READ).unwrap());
        assert!(has_permission_on_or_below(&policy, &subjects, &root, permissions::READ).unwrap());

        let deleted = policy.delete().unwrap();
        assert!(matches!(
            has_permission(&deleted, &subjects, &root, permissions::READ),
            Err(AuthzError::PolicyNotAccessible(_))
        ));
    }
}
