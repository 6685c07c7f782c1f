//! Response filtering: cut a JSON document down to what the caller may read.
//!
//! The walk carries the verdict of the parent path down the recursion, so a
//! node only inspects its own path level instead of re-walking every
//! ancestor. Array elements are addressed by their index (`/tags/0`); empty
//! objects and empty arrays are leaves.

use crate::enforcer::{Enforcer, ScopedEnforcer, Verdict};
use crate::types::AuthorizationContext;
use policies::ResourceKey;
use serde_json::{Map, Value};
use tracing::trace;

/// Prune `document`, located at `root`, to the parts `subjects` hold
/// `permission` on.
///
/// Leaves are kept when the permission holds at their own path. Objects and
/// arrays are descended into when the permission holds on or below them, and
/// a node whose every child was pruned is dropped. Surviving array elements
/// keep their order. The document root is never
/// dropped: an object root prunes to `{}` and any other root to `null`.
pub fn prune(
    enforcer: &Enforcer,
    subjects: &AuthorizationContext,
    root: &ResourceKey,
    document: &Value,
    permission: &str,
) -> Value {
    let scoped = enforcer.scoped(subjects);
    let mut walker = Walker {
        scoped: &scoped,
        resource_type: root.resource_type(),
        permission,
        path: root.path().segments().to_vec(),
    };

    let base = root.path().segments();
    let inherited = (0..base.len()).rev().find_map(|level| {
        match scoped.verdict_at(root.resource_type(), &base[..level], permission) {
            Verdict::Revoked => Some(false),
            Verdict::Granted => Some(true),
            Verdict::Undecided => None,
        }
    });

    match walker.visit(document, inherited.unwrap_or(false)) {
        Some(pruned) => pruned,
        None if document.is_object() => Value::Object(Map::new()),
        None => Value::Null,
    }
}

struct Walker<'a, 'e> {
    scoped: &'a ScopedEnforcer<'e>,
    resource_type: &'a str,
    permission: &'a str,
    path: Vec<String>,
}

impl Walker<'_, '_> {
    /// Visit the node at `self.path`; `inherited` is the parent's verdict.
    fn visit(&mut self, value: &Value, inherited: bool) -> Option<Value> {
        let readable = match self
            .scoped
            .verdict_at(self.resource_type, &self.path, self.permission)
        {
            Verdict::Revoked => false,
            Verdict::Granted => true,
            Verdict::Undecided => inherited,
        };

        let is_leaf = match value {
            Value::Object(fields) => fields.is_empty(),
            Value::Array(items) => items.is_empty(),
            _ => true,
        };
        if is_leaf {
            return readable.then(|| value.clone());
        }

        let has_rules_below =
            self.scoped
                .has_rules_below(self.resource_type, &self.path, self.permission);
        if readable && !has_rules_below {
            return Some(value.clone());
        }
        if !readable
            && !self
                .scoped
                .granted_below(self.resource_type, &self.path, self.permission)
        {
            trace!("Pruned subtree at /{}", self.path.join("/"));
            return None;
        }

        match value {
            Value::Object(fields) => {
                let mut kept = Map::new();
                for (name, child) in fields {
                    if let Some(pruned) = self.visit_child(name.clone(), child, readable) {
                        kept.insert(name.clone(), pruned);
                    }
                }
                (!kept.is_empty()).then_some(Value::Object(kept))
            }
            Value::Array(items) => {
                let kept: Vec<Value> = items
                    .iter()
                    .enumerate()
                    .filter_map(|(index, item)| self.visit_child(index.to_string(), item, readable))
                    .collect();
                (!kept.is_empty()).then_some(Value::Array(kept))
            }
            _ => None,
        }
    }

    fn visit_child(&mut self, segment: String, child: &Value, inherited: bool) -> Option<Value> {
        self.path.push(segment);
        let pruned = self.visit(child, inherited);
        self.path.pop();
        pruned
    }
}
