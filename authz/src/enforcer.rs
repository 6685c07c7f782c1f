//! Permission resolution over one policy revision.
//!
//! Resolution is nearest-path-wins with explicit-revoke precedence:
//!
//! 1. Only entries listing at least one of the caller's subjects take part.
//! 2. The resource path is walked from the most specific level up to the
//!    root. At each level a revoke by any matching entry denies, otherwise a
//!    grant by any matching entry allows; either ends the walk.
//! 3. Reaching past the root without a verdict denies.
//!
//! Revoke beats grant only at equal specificity: a grant on `/a/b` still
//! wins over a revoke on `/a` for everything below `/a/b`.

use crate::error::{AuthzError, Result};
use crate::types::AuthorizationContext;
use policies::{EffectedPermissions, JsonPointer, Policy, PolicyId, ResourceKey, SubjectId};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use tracing::debug;

/// Permissions attached to one path by one entry.
#[derive(Debug, Clone)]
struct Grant {
    entry: usize,
    permissions: EffectedPermissions,
}

/// All grants of one resource type, keyed by path.
type PermissionTree = BTreeMap<JsonPointer, Vec<Grant>>;

/// Outcome of inspecting a single path level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    Revoked,
    Granted,
    Undecided,
}

/// The queryable decision function derived from one policy revision.
///
/// Building an enforcer indexes every entry's resources by resource type and
/// path; queries never touch the policy document again. The enforcer is
/// immutable and can be shared between threads.
#[derive(Debug, Clone)]
pub struct Enforcer {
    policy_id: PolicyId,
    revision: i64,
    entry_subjects: Vec<BTreeSet<SubjectId>>,
    trees: HashMap<String, PermissionTree>,
}

impl Enforcer {
    /// Index an active policy.
    ///
    /// # Errors
    /// [`AuthzError::PolicyNotAccessible`] for a deleted policy.
    pub fn new(policy: &Policy) -> Result<Self> {
        if policy.is_deleted() {
            return Err(AuthzError::PolicyNotAccessible(policy.id().to_string()));
        }

        let mut entry_subjects = Vec::with_capacity(policy.entry_count());
        let mut trees: HashMap<String, PermissionTree> = HashMap::new();

        for (index, entry) in policy.entries().enumerate() {
            entry_subjects.push(entry.subjects().map(|s| s.id().clone()).collect());
            for (resource, permissions) in entry.resources() {
                trees
                    .entry(resource.resource_type().to_string())
                    .or_default()
                    .entry(resource.path().clone())
                    .or_default()
                    .push(Grant {
                        entry: index,
                        permissions: permissions.clone(),
                    });
            }
        }

        debug!(
            "Built enforcer for {} at revision {} ({} entries)",
            policy.id(),
            policy.revision(),
            entry_subjects.len()
        );

        Ok(Self {
            policy_id: policy.id().clone(),
            revision: policy.revision(),
            entry_subjects,
            trees,
        })
    }

    pub fn policy_id(&self) -> &PolicyId {
        &self.policy_id
    }

    pub fn revision(&self) -> i64 {
        self.revision
    }

    /// Restrict the enforcer to the entries matching `subjects`.
    ///
    /// Matching is computed once; reuse the scoped view when asking many
    /// questions for the same caller.
    pub fn scoped(&self, subjects: &AuthorizationContext) -> ScopedEnforcer<'_> {
        let matched: Vec<bool> = self
            .entry_subjects
            .iter()
            .map(|entry| subjects.iter().any(|s| entry.contains(s)))
            .collect();
        ScopedEnforcer {
            enforcer: self,
            matched,
        }
    }

    /// Is `permission` granted to `subjects` at exactly `resource`?
    pub fn has_permission(
        &self,
        resource: &ResourceKey,
        subjects: &AuthorizationContext,
        permission: &str,
    ) -> bool {
        self.scoped(subjects).has_permission(resource, permission)
    }

    /// Is `permission` granted at `resource` or anywhere below it?
    pub fn has_permission_on_or_below(
        &self,
        resource: &ResourceKey,
        subjects: &AuthorizationContext,
        permission: &str,
    ) -> bool {
        self.scoped(subjects)
            .has_permission_on_or_below(resource, permission)
    }

    /// Subjects that individually hold `permission` at `resource`.
    pub fn granted_subjects(&self, resource: &ResourceKey, permission: &str) -> BTreeSet<SubjectId> {
        let candidates: BTreeSet<&SubjectId> = self.entry_subjects.iter().flatten().collect();
        candidates
            .into_iter()
            .filter(|subject| {
                let single = AuthorizationContext::new([(*subject).clone()]);
                self.has_permission(resource, &single, permission)
            })
            .cloned()
            .collect()
    }

    fn tree(&self, resource_type: &str) -> Option<&PermissionTree> {
        self.trees.get(resource_type)
    }
}

/// An [`Enforcer`] bound to one caller's subjects.
#[derive(Debug, Clone)]
pub struct ScopedEnforcer<'a> {
    enforcer: &'a Enforcer,
    matched: Vec<bool>,
}

impl ScopedEnforcer<'_> {
    /// True if no entry applies to the caller at all.
    pub fn is_empty(&self) -> bool {
        !self.matched.iter().any(|m| *m)
    }

    pub fn has_permission(&self, resource: &ResourceKey, permission: &str) -> bool {
        self.has_permission_at(resource.resource_type(), resource.path().segments(), permission)
    }

    pub fn has_permission_on_or_below(&self, resource: &ResourceKey, permission: &str) -> bool {
        let resource_type = resource.resource_type();
        let path = resource.path().segments();
        self.has_permission_at(resource_type, path, permission)
            || self.granted_below(resource_type, path, permission)
    }

    pub(crate) fn has_permission_at(
        &self,
        resource_type: &str,
        path: &[String],
        permission: &str,
    ) -> bool {
        if self.is_empty() {
            return false;
        }
        for level in (0..=path.len()).rev() {
            match self.verdict_at(resource_type, &path[..level], permission) {
                Verdict::Revoked => return false,
                Verdict::Granted => return true,
                Verdict::Undecided => continue,
            }
        }
        false
    }

    /// The verdict of exactly one path level; revoke wins over grant.
    pub(crate) fn verdict_at(&self, resource_type: &str, path: &[String], permission: &str) -> Verdict {
        let Some(grants) = self
            .enforcer
            .tree(resource_type)
            .and_then(|tree| tree.get(path))
        else {
            return Verdict::Undecided;
        };

        let mut granted = false;
        for grant in grants.iter().filter(|g| self.matched[g.entry]) {
            if grant.permissions.revokes(permission) {
                return Verdict::Revoked;
            }
            granted |= grant.permissions.grants(permission);
        }
        if granted {
            Verdict::Granted
        } else {
            Verdict::Undecided
        }
    }

    /// Some descendant `D` of `path` is granted, with no revoke on any level
    /// from `path` down to `D` inclusive.
    pub(crate) fn granted_below(&self, resource_type: &str, path: &[String], permission: &str) -> bool {
        let Some(tree) = self.enforcer.tree(resource_type) else {
            return false;
        };
        if self.is_empty() || self.verdict_at(resource_type, path, permission) == Verdict::Revoked {
            return false;
        }

        descendants(tree, path).any(|(descendant, _)| {
            let segments = descendant.segments();
            self.verdict_at(resource_type, segments, permission) == Verdict::Granted
                && (path.len() + 1..segments.len())
                    .all(|n| self.verdict_at(resource_type, &segments[..n], permission) != Verdict::Revoked)
        })
    }

    /// True if any matching entry grants or revokes `permission` strictly
    /// below `path`.
    pub(crate) fn has_rules_below(&self, resource_type: &str, path: &[String], permission: &str) -> bool {
        let Some(tree) = self.enforcer.tree(resource_type) else {
            return false;
        };
        descendants(tree, path).any(|(_, grants)| {
            grants.iter().any(|g| {
                self.matched[g.entry]
                    && (g.permissions.grants(permission) || g.permissions.revokes(permission))
            })
        })
    }
}

fn descendants<'t>(
    tree: &'t PermissionTree,
    path: &'t [String],
) -> impl Iterator<Item = (&'t JsonPointer, &'t Vec<Grant>)> + 't {
    tree.range::<[String], _>((Bound::Excluded(path), Bound::Unbounded))
        .take_while(move |(key, _)| key.segments().starts_with(path))
}
