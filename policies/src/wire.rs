//! JSON wire format of policy documents.
//!
//! ```json
//! { "policyId": "<ns>:<name>", "entries": {
//!     "<label>": {
//!       "subjects": { "<issuer>:<id>": { "type": "...", "expiry": "<iso8601>" } },
//!       "resources": { "<type>:<pointer>": { "grant": ["READ"], "revoke": [] } }
//!     } } }
//! ```
//!
//! `revision` and `lifecycle` are optional members; a document without them
//! is an active policy at revision 1.

use crate::entry::PolicyEntry;
use crate::error::{PolicyError, Result};
use crate::policy::{Lifecycle, Policy, PolicyId};
use crate::resource::{EffectedPermissions, ResourceKey};
use crate::subject::{Subject, SubjectId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PolicyDocument {
    policy_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    revision: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lifecycle: Option<Lifecycle>,
    #[serde(default)]
    entries: BTreeMap<String, EntryDocument>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct EntryDocument {
    #[serde(default)]
    subjects: BTreeMap<String, SubjectDocument>,
    #[serde(default)]
    resources: BTreeMap<String, PermissionsDocument>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SubjectDocument {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    subject_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expiry: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PermissionsDocument {
    #[serde(default)]
    grant: Vec<String>,
    #[serde(default)]
    revoke: Vec<String>,
}

impl Policy {
    /// Parse and validate a policy document.
    pub fn from_json(value: &Value) -> Result<Policy> {
        let document: PolicyDocument = serde_json::from_value(value.clone())?;
        let policy_id = document.policy_id.clone();
        document.into_policy().inspect_err(|e| {
            warn!("Rejecting malformed policy document {}: {}", policy_id, e);
        })
    }

    pub fn from_json_str(raw: &str) -> Result<Policy> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_json(&value)
    }

    /// Render the wire format, including `revision` and `lifecycle`.
    pub fn to_json(&self) -> Value {
        let document = PolicyDocument {
            policy_id: self.id().to_string(),
            revision: Some(self.revision()),
            lifecycle: Some(self.lifecycle()),
            entries: self
                .entries()
                .map(|entry| (entry.label().to_string(), EntryDocument::from_entry(entry)))
                .collect(),
        };
        // Only string keys and plain values; serialization cannot fail.
        serde_json::to_value(document).unwrap_or(Value::Null)
    }
}

impl PolicyDocument {
    fn into_policy(self) -> Result<Policy> {
        let id = PolicyId::parse(&self.policy_id)?;
        let mut entries = Vec::with_capacity(self.entries.len());
        for (label, entry) in self.entries {
            entries.push(entry.into_entry(label)?);
        }
        Ok(Policy::from_parts(
            id,
            self.revision.unwrap_or(1),
            self.lifecycle.unwrap_or_default(),
            entries,
        ))
    }
}

impl EntryDocument {
    fn into_entry(self, label: String) -> Result<PolicyEntry> {
        let mut subjects = Vec::with_capacity(self.subjects.len());
        for (raw, doc) in self.subjects {
            let mut subject = Subject::new(SubjectId::parse(&raw)?);
            if let Some(subject_type) = doc.subject_type {
                subject = subject.with_type(subject_type);
            }
            if let Some(expiry) = doc.expiry {
                subject = subject.with_expiry(expiry);
            }
            subjects.push(subject);
        }

        let mut resources = Vec::with_capacity(self.resources.len());
        for (raw, doc) in self.resources {
            let key = ResourceKey::parse(&raw)?;
            let permissions = EffectedPermissions::new(&key, doc.grant, doc.revoke)?;
            resources.push((key, permissions));
        }

        PolicyEntry::new(label, subjects, resources)
    }

    fn from_entry(entry: &PolicyEntry) -> Self {
        Self {
            subjects: entry
                .subjects()
                .map(|subject| {
                    (
                        subject.id().to_string(),
                        SubjectDocument {
                            subject_type: subject.subject_type().map(str::to_string),
                            expiry: subject.expiry(),
                        },
                    )
                })
                .collect(),
            resources: entry
                .resources()
                .iter()
                .map(|(key, permissions)| {
                    (
                        key.to_string(),
                        PermissionsDocument {
                            grant: permissions.granted().iter().cloned().collect(),
                            revoke: permissions.revoked().iter().cloned().collect(),
                        },
                    )
                })
                .collect(),
        }
    }
}

impl TryFrom<&Value> for Policy {
    type Error = PolicyError;

    fn try_from(value: &Value) -> Result<Self> {
        Policy::from_json(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "policyId": "org.example:lamp",
            "entries": {
                "all": {
                    "subjects": { "google:sid": { "type": "generated" } },
                    "resources": { "policy:/": { "grant": ["READ", "WRITE"], "revoke": [] } }
                },
                "revokeWriteOnPolicy": {
                    "subjects": { "google:sid": { "type": "generated" } },
                    "resources": { "policy:/policy": { "grant": [], "revoke": ["WRITE"] } }
                }
            }
        })
    }

    #[test]
    fn test_parse_sample_document() {
        let policy = Policy::from_json(&sample()).unwrap();
        assert_eq!(policy.id().to_string(), "org.example:lamp");
        assert_eq!(policy.revision(), 1);
        assert_eq!(policy.entry_count(), 2);

        let all = policy.entry("all").unwrap();
        let subject = all.subjects().next().unwrap();
        assert_eq!(subject.subject_type(), Some("generated"));
    }

    #[test]
    fn test_revision_and_lifecycle_are_read() {
        let mut value = sample();
        value["revision"] = json!(7);
        value["lifecycle"] = json!("DELETED");
        let policy = Policy::from_json(&value).unwrap();
        assert_eq!(policy.revision(), 7);
        assert!(policy.is_deleted());
    }

    #[test]
    fn test_to_json_renders_wire_format() {
        let policy = Policy::from_json(&sample()).unwrap();
        let rendered = policy.to_json();
        assert_eq!(rendered["policyId"], "org.example:lamp");
        assert_eq!(rendered["revision"], 1);
        assert_eq!(rendered["lifecycle"], "ACTIVE");
        assert_eq!(
            rendered["entries"]["revokeWriteOnPolicy"]["resources"]["policy:/policy"]["revoke"],
            json!(["WRITE"])
        );
        assert_eq!(Policy::from_json(&rendered).unwrap(), policy);
    }

    #[test]
    fn test_expiry_is_parsed() {
        let value = json!({
            "policyId": "org.example:lamp",
            "entries": { "temp": {
                "subjects": { "google:temp": { "expiry": "2020-01-01T00:00:00Z" } },
                "resources": {}
            } }
        });
        let policy = Policy::from_json(&value).unwrap();
        let subject = policy.entry("temp").unwrap().subjects().next().unwrap();
        assert!(subject.is_expired(Utc::now()));
    }

    #[test]
    fn test_malformed_documents_are_rejected() {
        let bad_pointer = json!({
            "policyId": "org.example:lamp",
            "entries": { "x": { "subjects": {}, "resources": { "thing:no-slash": { "grant": ["READ"] } } } }
        });
        assert!(matches!(
            Policy::from_json(&bad_pointer),
            Err(PolicyError::InvalidPointer(_))
        ));

        let bad_id = json!({ "policyId": "nonamespace", "entries": {} });
        assert!(matches!(
            Policy::from_json(&bad_id),
            Err(PolicyError::InvalidPolicyId(_))
        ));

        let not_an_object = json!(["policy"]);
        assert!(matches!(Policy::from_json(&not_an_object), Err(PolicyError::Json(_))));

        let empty_permission = json!({
            "policyId": "org.example:lamp",
            "entries": { "x": { "resources": { "thing:/": { "grant": [""] } } } }
        });
        assert!(matches!(
            Policy::from_json(&empty_permission),
            Err(PolicyError::EmptyPermission(_))
        ));
    }
}
