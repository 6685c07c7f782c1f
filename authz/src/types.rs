//! Caller identities for authorization requests.

use crate::error::Result;
use policies::SubjectId;
use std::collections::BTreeSet;

/// The set of subjects one request is authenticated as.
///
/// A request may carry several identities at once (a user id plus the
/// groups or integration it acts for). A policy entry applies when any of
/// them is listed in the entry.
///
/// # Security Note
/// The subjects must come from an authenticated session or a verified token,
/// never from request payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationContext {
    subjects: BTreeSet<SubjectId>,
}

impl AuthorizationContext {
    pub fn new<I>(subjects: I) -> Self
    where
        I: IntoIterator<Item = SubjectId>,
    {
        Self {
            subjects: subjects.into_iter().collect(),
        }
    }

    /// A context with no subjects; it matches no policy entry.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Parse `<issuer>:<subject>` strings.
    pub fn parse<I, S>(subjects: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = BTreeSet::new();
        for subject in subjects {
            parsed.insert(SubjectId::parse(subject.as_ref())?);
        }
        Ok(Self { subjects: parsed })
    }

    pub fn contains(&self, subject: &SubjectId) -> bool {
        self.subjects.contains(subject)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubjectId> {
        self.subjects.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }
}

impl FromIterator<SubjectId> for AuthorizationContext {
    fn from_iter<I: IntoIterator<Item = SubjectId>>(iter: I) -> Self {
        Self::new(iter)
    }
}
