//! Policy entries: a labelled set of subjects and the permissions they hold.

use crate::error::{PolicyError, Result};
use crate::resource::{EffectedPermissions, ResourceKey};
use crate::subject::{Subject, SubjectId};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// One labelled entry of a policy.
///
/// An entry only takes part in a decision when the caller's subjects
/// intersect its subjects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyEntry {
    label: String,
    subjects: BTreeMap<SubjectId, Subject>,
    resources: BTreeMap<ResourceKey, EffectedPermissions>,
}

impl PolicyEntry {
    pub fn new<S, R>(label: impl Into<String>, subjects: S, resources: R) -> Result<Self>
    where
        S: IntoIterator<Item = Subject>,
        R: IntoIterator<Item = (ResourceKey, EffectedPermissions)>,
    {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(PolicyError::EmptyLabel);
        }
        Ok(Self {
            label,
            subjects: subjects
                .into_iter()
                .map(|subject| (subject.id().clone(), subject))
                .collect(),
            resources: resources.into_iter().collect(),
        })
    }

    /// Start building an entry from string inputs.
    pub fn builder(label: impl Into<String>) -> EntryBuilder {
        EntryBuilder::new(label)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn subjects(&self) -> impl Iterator<Item = &Subject> {
        self.subjects.values()
    }

    pub fn has_subject(&self, id: &SubjectId) -> bool {
        self.subjects.contains_key(id)
    }

    pub fn resources(&self) -> &BTreeMap<ResourceKey, EffectedPermissions> {
        &self.resources
    }

    pub fn permissions_on(&self, resource: &ResourceKey) -> Option<&EffectedPermissions> {
        self.resources.get(resource)
    }

    /// Add or replace the permissions for one resource.
    pub fn with_resource(mut self, resource: ResourceKey, permissions: EffectedPermissions) -> Self {
        self.resources.insert(resource, permissions);
        self
    }

    pub fn without_expired_subjects(&self, now: DateTime<Utc>) -> Self {
        let mut entry = self.clone();
        entry.subjects.retain(|_, subject| !subject.is_expired(now));
        entry
    }
}

/// Builder collecting raw strings; everything is validated in [`EntryBuilder::build`].
#[derive(Debug, Clone)]
pub struct EntryBuilder {
    label: String,
    subjects: Vec<(String, Option<String>)>,
    resources: BTreeMap<String, (Vec<String>, Vec<String>)>,
}

impl EntryBuilder {
    fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            subjects: Vec::new(),
            resources: BTreeMap::new(),
        }
    }

    pub fn subject(mut self, id: impl Into<String>) -> Self {
        self.subjects.push((id.into(), None));
        self
    }

    pub fn typed_subject(mut self, id: impl Into<String>, subject_type: impl Into<String>) -> Self {
        self.subjects.push((id.into(), Some(subject_type.into())));
        self
    }

    pub fn grant<I, P>(mut self, resource: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        let slot = self.resources.entry(resource.into()).or_default();
        slot.0.extend(permissions.into_iter().map(Into::into));
        self
    }

    pub fn revoke<I, P>(mut self, resource: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        let slot = self.resources.entry(resource.into()).or_default();
        slot.1.extend(permissions.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Result<PolicyEntry> {
        let mut subjects = Vec::with_capacity(self.subjects.len());
        for (id, subject_type) in self.subjects {
            let subject = Subject::new(SubjectId::parse(&id)?);
            subjects.push(match subject_type {
                Some(t) => subject.with_type(t),
                None => subject,
            });
        }

        let mut resources = Vec::with_capacity(self.resources.len());
        for (raw, (granted, revoked)) in self.resources {
            let key = ResourceKey::parse(&raw)?;
            let permissions = EffectedPermissions::new(&key, granted, revoked)?;
            resources.push((key, permissions));
        }

        PolicyEntry::new(self.label, subjects, resources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_builder_builds_entry() {
        let entry = PolicyEntry::builder("owner")
            .subject("google:sid")
            .grant("thing:/", ["READ", "WRITE"])
            .revoke("thing:/secret", ["READ"])
            .build()
            .unwrap();

        assert_eq!(entry.label(), "owner");
        assert!(entry.has_subject(&SubjectId::parse("google:sid").unwrap()));
        assert_eq!(entry.resources().len(), 2);

        let secret = ResourceKey::parse("thing:/secret").unwrap();
        assert!(entry.permissions_on(&secret).unwrap().revokes("READ"));
    }

    #[test]
    fn test_builder_rejects_bad_input() {
        assert!(PolicyEntry::builder("").subject("google:sid").build().is_err());
        assert!(PolicyEntry::builder("x").subject("nocolon").build().is_err());
        assert!(PolicyEntry::builder("x")
            .grant("thing:relative", ["READ"])
            .build()
            .is_err());
        assert!(PolicyEntry::builder("x")
            .grant("thing:/", ["READ"])
            .revoke("thing:/", ["READ"])
            .build()
            .is_err());
    }

    #[test]
    fn test_expired_subjects_are_dropped() {
        let now = Utc::now();
        let id = SubjectId::parse("google:temp").unwrap();
        let entry = PolicyEntry::new(
            "temp",
            [Subject::new(id.clone()).with_expiry(now - Duration::seconds(5))],
            Vec::<(ResourceKey, EffectedPermissions)>::new(),
        )
        .unwrap();

        assert!(entry.has_subject(&id));
        assert!(!entry.without_expired_subjects(now).has_subject(&id));
    }
}
