//! Subjects: the caller identities a policy entry applies to.

use crate::error::{PolicyError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// An `<issuer>:<subject>` pair identifying one authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubjectId {
    issuer: String,
    subject: String,
}

impl SubjectId {
    pub fn new(issuer: impl Into<String>, subject: impl Into<String>) -> Result<Self> {
        let issuer = issuer.into();
        let subject = subject.into();
        if issuer.is_empty() || subject.is_empty() {
            return Err(PolicyError::InvalidSubjectId(format!("{}:{}", issuer, subject)));
        }
        Ok(Self { issuer, subject })
    }

    /// Parse `<issuer>:<subject>`; the subject part may itself contain colons.
    pub fn parse(value: &str) -> Result<Self> {
        let (issuer, subject) = value
            .split_once(':')
            .ok_or_else(|| PolicyError::InvalidSubjectId(value.to_string()))?;
        Self::new(issuer, subject)
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.issuer, self.subject)
    }
}

impl FromStr for SubjectId {
    type Err = PolicyError;

    fn from_str(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl Serialize for SubjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SubjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// A subject as listed in a policy entry, with its optional type and expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    id: SubjectId,
    subject_type: Option<String>,
    expiry: Option<DateTime<Utc>>,
}

impl Subject {
    pub fn new(id: SubjectId) -> Self {
        Self {
            id,
            subject_type: None,
            expiry: None,
        }
    }

    pub fn with_type(mut self, subject_type: impl Into<String>) -> Self {
        self.subject_type = Some(subject_type.into());
        self
    }

    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    pub fn id(&self) -> &SubjectId {
        &self.id
    }

    pub fn subject_type(&self) -> Option<&str> {
        self.subject_type.as_deref()
    }

    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.expiry
    }

    /// An expired subject no longer matches callers.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry.is_some_and(|expiry| expiry <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_subject_id_parse() {
        let id = SubjectId::parse("google:sid").unwrap();
        assert_eq!(id.issuer(), "google");
        assert_eq!(id.subject(), "sid");
        assert_eq!(id.to_string(), "google:sid");
    }

    #[test]
    fn test_subject_id_keeps_colons_in_subject() {
        let id = SubjectId::parse("integration:ditto:connection").unwrap();
        assert_eq!(id.issuer(), "integration");
        assert_eq!(id.subject(), "ditto:connection");
    }

    #[test]
    fn test_subject_id_rejects_malformed() {
        for bad in ["nocolon", ":sid", "google:"] {
            assert!(SubjectId::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_subject_expiry() {
        let now = Utc::now();
        let id = SubjectId::parse("google:sid").unwrap();
        let permanent = Subject::new(id.clone());
        let expired = Subject::new(id.clone()).with_expiry(now - Duration::minutes(1));
        let valid = Subject::new(id).with_expiry(now + Duration::minutes(1));

        assert!(!permanent.is_expired(now));
        assert!(expired.is_expired(now));
        assert!(!valid.is_expired(now));
    }
}
