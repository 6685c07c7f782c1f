use dashmap::DashSet;
use tracing::info;

/// Set-membership check on entity namespaces.
pub trait NamespaceBlocklist: Send + Sync {
    fn is_blocked(&self, namespace: &str) -> bool;
}

/// A mutable blocklist that can be updated while requests are in flight.
#[derive(Debug, Default)]
pub struct BlockedNamespaces {
    namespaces: DashSet<String>,
}

impl BlockedNamespaces {
    pub fn new<I, S>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            namespaces: namespaces.into_iter().map(Into::into).collect(),
        }
    }

    pub fn block(&self, namespace: impl Into<String>) -> bool {
        let namespace = namespace.into();
        info!("Blocking namespace {}", namespace);
        self.namespaces.insert(namespace)
    }

    pub fn unblock(&self, namespace: &str) -> bool {
        info!("Unblocking namespace {}", namespace);
        self.namespaces.remove(namespace).is_some()
    }

    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }
}

impl NamespaceBlocklist for BlockedNamespaces {
    fn is_blocked(&self, namespace: &str) -> bool {
        self.namespaces.contains(namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_and_unblock() {
        let blocklist = BlockedNamespaces::new(["org.blocked"]);
        assert!(blocklist.is_blocked("org.blocked"));
        assert!(!blocklist.is_blocked("org.example"));

        assert!(blocklist.block("org.example"));
        assert!(!blocklist.block("org.example"));
        assert!(blocklist.is_blocked("org.example"));

        assert!(blocklist.unblock("org.example"));
        assert!(!blocklist.unblock("org.example"));
        assert_eq!(blocklist.len(), 1);
    }

    #[test]
    fn test_namespaces_match_exactly() {
        let blocklist = BlockedNamespaces::new(["org"]);
        assert!(!blocklist.is_blocked("org.example"));
        assert!(BlockedNamespaces::default().is_empty());
    }
}
