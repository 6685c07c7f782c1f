//! Resources and the permissions attached to them.

use crate::error::{PolicyError, Result};
use crate::pointer::JsonPointer;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Permission names used by the built-in command kinds.
pub mod permissions {
    pub const READ: &str = "READ";
    pub const WRITE: &str = "WRITE";
}

/// A `<resourceType>:<pointer>` key, e.g. `thing:/features/temperature`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    resource_type: String,
    path: JsonPointer,
}

impl ResourceKey {
    pub fn new(resource_type: impl Into<String>, path: JsonPointer) -> Result<Self> {
        let resource_type = resource_type.into();
        if resource_type.is_empty() || resource_type.contains(char::is_whitespace) {
            return Err(PolicyError::InvalidResourceKey(format!(
                "{}:{}",
                resource_type, path
            )));
        }
        Ok(Self {
            resource_type,
            path,
        })
    }

    pub fn parse(value: &str) -> Result<Self> {
        let (resource_type, path) = value
            .split_once(':')
            .ok_or_else(|| PolicyError::InvalidResourceKey(value.to_string()))?;
        let path = JsonPointer::parse(path)?;
        Self::new(resource_type, path)
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn path(&self) -> &JsonPointer {
        &self.path
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_type, self.path)
    }
}

impl FromStr for ResourceKey {
    type Err = PolicyError;

    fn from_str(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl Serialize for ResourceKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResourceKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Granted and revoked permission names on one resource of one entry.
///
/// The two sets are disjoint and never contain an empty name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectedPermissions {
    granted: BTreeSet<String>,
    revoked: BTreeSet<String>,
}

impl EffectedPermissions {
    pub fn new<G, R>(resource: &ResourceKey, granted: G, revoked: R) -> Result<Self>
    where
        G: IntoIterator,
        G::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        let granted: BTreeSet<String> = granted.into_iter().map(Into::into).collect();
        let revoked: BTreeSet<String> = revoked.into_iter().map(Into::into).collect();

        if granted.iter().chain(revoked.iter()).any(|p| p.is_empty()) {
            return Err(PolicyError::EmptyPermission(resource.to_string()));
        }
        if let Some(permission) = granted.intersection(&revoked).next() {
            return Err(PolicyError::ConflictingPermission {
                resource: resource.to_string(),
                permission: permission.clone(),
            });
        }

        Ok(Self { granted, revoked })
    }

    pub fn granted(&self) -> &BTreeSet<String> {
        &self.granted
    }

    pub fn revoked(&self) -> &BTreeSet<String> {
        &self.revoked
    }

    pub fn grants(&self, permission: &str) -> bool {
        self.granted.contains(permission)
    }

    pub fn revokes(&self, permission: &str) -> bool {
        self.revoked.contains(permission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(value: &str) -> ResourceKey {
        ResourceKey::parse(value).unwrap()
    }

    #[test]
    fn test_resource_key_parse() {
        let resource = key("thing:/features/temperature");
        assert_eq!(resource.resource_type(), "thing");
        assert_eq!(resource.path().to_string(), "/features/temperature");
        assert_eq!(resource.to_string(), "thing:/features/temperature");
    }

    #[test]
    fn test_resource_key_rejects_malformed() {
        assert!(ResourceKey::parse("thing").is_err());
        assert!(ResourceKey::parse(":/a").is_err());
        assert!(ResourceKey::parse("thing:a/b").is_err());
    }

    #[test]
    fn test_effected_permissions() {
        let resource = key("thing:/");
        let perms = EffectedPermissions::new(&resource, ["READ", "WRITE"], ["ADMIN"]).unwrap();
        assert!(perms.grants("READ"));
        assert!(perms.revokes("ADMIN"));
        assert!(!perms.grants("ADMIN"));
    }

    #[test]
    fn test_effected_permissions_must_be_disjoint() {
        let resource = key("thing:/");
        let err = EffectedPermissions::new(&resource, ["READ"], ["READ"]).unwrap_err();
        assert!(matches!(err, PolicyError::ConflictingPermission { .. }));
    }

    #[test]
    fn test_effected_permissions_reject_empty_names() {
        let resource = key("thing:/");
        let err = EffectedPermissions::new(&resource, [""], Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, PolicyError::EmptyPermission(_)));
    }
}
