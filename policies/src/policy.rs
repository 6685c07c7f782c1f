//! The revisioned policy document and its lifecycle commands.
//!
//! A [`Policy`] is immutable. Every accepted modification returns a new value
//! whose revision is exactly one higher; a deleted policy is kept as a
//! tombstone and rejects further modifications.

use crate::entry::PolicyEntry;
use crate::error::{PolicyError, Result};
use crate::resource::{EffectedPermissions, ResourceKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Namespace-qualified policy identifier, `<namespace>:<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PolicyId {
    namespace: String,
    name: String,
}

impl PolicyId {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let namespace = namespace.into();
        let name = name.into();
        if !is_valid_namespace(&namespace) || name.is_empty() || name.contains(char::is_whitespace)
        {
            return Err(PolicyError::InvalidPolicyId(format!("{}:{}", namespace, name)));
        }
        Ok(Self { namespace, name })
    }

    pub fn parse(value: &str) -> Result<Self> {
        let (namespace, name) = value
            .split_once(':')
            .ok_or_else(|| PolicyError::InvalidPolicyId(value.to_string()))?;
        Self::new(namespace, name)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Namespaces are dot-separated groups of ASCII letters, digits, `_` and `-`.
fn is_valid_namespace(namespace: &str) -> bool {
    !namespace.is_empty()
        && namespace.split('.').all(|part| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        })
}

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

impl FromStr for PolicyId {
    type Err = PolicyError;

    fn from_str(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl Serialize for PolicyId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PolicyId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Whether a policy is live or a tombstone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Lifecycle {
    #[default]
    Active,
    Deleted,
}

/// A revisioned policy document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    id: PolicyId,
    revision: i64,
    lifecycle: Lifecycle,
    entries: BTreeMap<String, PolicyEntry>,
}

impl Policy {
    /// The result of a create command: revision 1, active.
    pub fn create<I>(id: PolicyId, entries: I) -> Self
    where
        I: IntoIterator<Item = PolicyEntry>,
    {
        Self::from_parts(id, 1, Lifecycle::Active, entries)
    }

    /// Reassemble a policy as stored; no revision bump.
    pub fn from_parts<I>(id: PolicyId, revision: i64, lifecycle: Lifecycle, entries: I) -> Self
    where
        I: IntoIterator<Item = PolicyEntry>,
    {
        Self {
            id,
            revision,
            lifecycle,
            entries: entries
                .into_iter()
                .map(|entry| (entry.label().to_string(), entry))
                .collect(),
        }
    }

    pub fn builder(id: PolicyId) -> PolicyBuilder {
        PolicyBuilder::new(id)
    }

    pub fn id(&self) -> &PolicyId {
        &self.id
    }

    pub fn revision(&self) -> i64 {
        self.revision
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_deleted(&self) -> bool {
        self.lifecycle == Lifecycle::Deleted
    }

    pub fn entries(&self) -> impl Iterator<Item = &PolicyEntry> {
        self.entries.values()
    }

    pub fn entry(&self, label: &str) -> Option<&PolicyEntry> {
        self.entries.get(label)
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Add an entry, or replace the entry with the same label.
    pub fn set_entry(&self, entry: PolicyEntry) -> Result<Policy> {
        self.ensure_active()?;
        let mut entries = self.entries.clone();
        entries.insert(entry.label().to_string(), entry);
        Ok(self.next(entries, Lifecycle::Active))
    }

    /// Remove an entry. Removing an absent label is not a modification and
    /// leaves the revision unchanged.
    pub fn remove_entry(&self, label: &str) -> Result<Policy> {
        self.ensure_active()?;
        if !self.entries.contains_key(label) {
            return Ok(self.clone());
        }
        let mut entries = self.entries.clone();
        entries.remove(label);
        Ok(self.next(entries, Lifecycle::Active))
    }

    /// Set the permissions of one resource inside an existing entry.
    pub fn set_resource(
        &self,
        label: &str,
        resource: ResourceKey,
        permissions: EffectedPermissions,
    ) -> Result<Policy> {
        self.ensure_active()?;
        let entry = self
            .entries
            .get(label)
            .ok_or_else(|| PolicyError::EntryNotFound(label.to_string()))?
            .clone()
            .with_resource(resource, permissions);
        let mut entries = self.entries.clone();
        entries.insert(label.to_string(), entry);
        Ok(self.next(entries, Lifecycle::Active))
    }

    /// Turn the policy into a tombstone. Content is retained.
    pub fn delete(&self) -> Result<Policy> {
        self.ensure_active()?;
        Ok(self.next(self.entries.clone(), Lifecycle::Deleted))
    }

    /// Copy of this policy without subjects that expired at `now`; same revision.
    pub fn without_expired_subjects(&self, now: DateTime<Utc>) -> Policy {
        Self {
            id: self.id.clone(),
            revision: self.revision,
            lifecycle: self.lifecycle,
            entries: self
                .entries
                .iter()
                .map(|(label, entry)| (label.clone(), entry.without_expired_subjects(now)))
                .collect(),
        }
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_deleted() {
            return Err(PolicyError::PolicyDeleted(self.id.to_string()));
        }
        Ok(())
    }

    fn next(&self, entries: BTreeMap<String, PolicyEntry>, lifecycle: Lifecycle) -> Policy {
        Self {
            id: self.id.clone(),
            revision: self.revision + 1,
            lifecycle,
            entries,
        }
    }
}

/// Collects entries and produces a frozen [`Policy`] at revision 1.
#[derive(Debug, Clone)]
pub struct PolicyBuilder {
    id: PolicyId,
    entries: Vec<PolicyEntry>,
}

impl PolicyBuilder {
    fn new(id: PolicyId) -> Self {
        Self {
            id,
            entries: Vec::new(),
        }
    }

    pub fn entry(mut self, entry: PolicyEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn build(self) -> Policy {
        Policy::create(self.id, self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy_id() -> PolicyId {
        PolicyId::parse("org.example:lamp").unwrap()
    }

    fn owner_entry() -> PolicyEntry {
        PolicyEntry::builder("owner")
            .subject("google:sid")
            .grant("thing:/", ["READ", "WRITE"])
            .build()
            .unwrap()
    }

    #[test]
    fn test_policy_id_parse() {
        let id = policy_id();
        assert_eq!(id.namespace(), "org.example");
        assert_eq!(id.name(), "lamp");
        assert_eq!(id.to_string(), "org.example:lamp");
    }

    #[test]
    fn test_policy_id_rejects_malformed() {
        for bad in ["lamp", ":lamp", "org.example:", "org..example:lamp", "org example:lamp"] {
            assert!(PolicyId::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_create_starts_at_revision_one() {
        let policy = Policy::builder(policy_id()).entry(owner_entry()).build();
        assert_eq!(policy.revision(), 1);
        assert_eq!(policy.lifecycle(), Lifecycle::Active);
        assert_eq!(policy.entry_count(), 1);
    }

    #[test]
    fn test_empty_policy_is_valid() {
        let policy = Policy::create(policy_id(), Vec::<PolicyEntry>::new());
        assert_eq!(policy.entry_count(), 0);
    }

    #[test]
    fn test_each_modification_bumps_revision_once() {
        let policy = Policy::create(policy_id(), [owner_entry()]);

        let reader = PolicyEntry::builder("reader")
            .subject("google:guest")
            .grant("thing:/features", ["READ"])
            .build()
            .unwrap();
        let policy = policy.set_entry(reader).unwrap();
        assert_eq!(policy.revision(), 2);

        let resource = ResourceKey::parse("thing:/attributes").unwrap();
        let permissions = EffectedPermissions::new(&resource, ["READ"], Vec::<String>::new()).unwrap();
        let policy = policy.set_resource("reader", resource, permissions).unwrap();
        assert_eq!(policy.revision(), 3);
        assert_eq!(policy.entry("reader").unwrap().resources().len(), 2);

        let policy = policy.remove_entry("reader").unwrap();
        assert_eq!(policy.revision(), 4);
        assert!(policy.entry("reader").is_none());
    }

    #[test]
    fn test_removing_absent_entry_keeps_revision() {
        let policy = Policy::create(policy_id(), [owner_entry()]);
        let same = policy.remove_entry("nobody").unwrap();
        assert_eq!(same.revision(), policy.revision());
    }

    #[test]
    fn test_set_resource_on_unknown_entry() {
        let policy = Policy::create(policy_id(), [owner_entry()]);
        let resource = ResourceKey::parse("thing:/").unwrap();
        let err = policy
            .set_resource("nobody", resource, EffectedPermissions::default())
            .unwrap_err();
        assert!(matches!(err, PolicyError::EntryNotFound(_)));
    }

    #[test]
    fn test_deleted_policy_is_a_tombstone() {
        let policy = Policy::create(policy_id(), [owner_entry()]);
        let deleted = policy.delete().unwrap();
        assert!(deleted.is_deleted());
        assert_eq!(deleted.revision(), 2);
        assert_eq!(deleted.entry_count(), 1);

        assert!(matches!(deleted.delete(), Err(PolicyError::PolicyDeleted(_))));
        assert!(matches!(
            deleted.set_entry(owner_entry()),
            Err(PolicyError::PolicyDeleted(_))
        ));
    }
}
