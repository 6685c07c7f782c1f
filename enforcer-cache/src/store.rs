use crate::error::{LoaderError, StoreError};
use crate::loader::PolicyLoader;
use crate::notify::PolicyChange;
use async_trait::async_trait;
use policies::{Lifecycle, Policy, PolicyId};
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// A policy store kept in memory.
///
/// Every accepted modification replaces the stored revision and publishes a
/// [`PolicyChange`] to all subscribers. Deleted policies stay as tombstones
/// so that a later re-create continues the revision sequence.
pub struct InMemoryPolicyStore {
    policies: RwLock<HashMap<PolicyId, Policy>>,
    changes: broadcast::Sender<PolicyChange>,
}

impl Default for InMemoryPolicyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPolicyStore {
    pub fn new() -> Self {
        Self::with_channel_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_channel_capacity(capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity);
        Self {
            policies: RwLock::new(HashMap::new()),
            changes,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PolicyChange> {
        self.changes.subscribe()
    }

    pub async fn get(&self, id: &PolicyId) -> Option<Policy> {
        self.policies.read().await.get(id).cloned()
    }

    /// Store a new policy.
    ///
    /// Re-creating a deleted policy continues after the tombstone's
    /// revision.
    pub async fn create(&self, policy: Policy) -> Result<Policy, StoreError> {
        let mut policies = self.policies.write().await;
        let stored = match policies.get(policy.id()) {
            Some(existing) if !existing.is_deleted() => {
                return Err(StoreError::AlreadyExists(policy.id().to_string()));
            }
            Some(tombstone) => Policy::from_parts(
                policy.id().clone(),
                tombstone.revision() + 1,
                Lifecycle::Active,
                policy.entries().cloned(),
            ),
            None => policy,
        };

        info!("Created policy {} at revision {}", stored.id(), stored.revision());
        policies.insert(stored.id().clone(), stored.clone());
        self.publish(&stored);
        Ok(stored)
    }

    /// Apply a modification command to a stored policy.
    ///
    /// A command that leaves the revision unchanged is not stored and not
    /// published.
    pub async fn modify<F>(&self, id: &PolicyId, command: F) -> Result<Policy, StoreError>
    where
        F: FnOnce(&Policy) -> policies::Result<Policy>,
    {
        let mut policies = self.policies.write().await;
        let current = policies
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let modified = command(current)?;

        if modified.revision() == current.revision() {
            debug!("Policy {} unchanged at revision {}", id, current.revision());
            return Ok(modified);
        }

        debug!("Modified policy {} to revision {}", id, modified.revision());
        policies.insert(id.clone(), modified.clone());
        self.publish(&modified);
        Ok(modified)
    }

    pub async fn delete(&self, id: &PolicyId) -> Result<Policy, StoreError> {
        let deleted = self.modify(id, Policy::delete).await?;
        info!("Deleted policy {} at revision {}", id, deleted.revision());
        Ok(deleted)
    }

    fn publish(&self, policy: &Policy) {
        let change = PolicyChange {
            policy_id: policy.id().clone(),
            revision: policy.revision(),
        };
        if self.changes.send(change).is_err() {
            debug!("No subscribers for change of policy {}", policy.id());
        }
    }
}

#[async_trait]
impl PolicyLoader for InMemoryPolicyStore {
    async fn load(&self, id: &PolicyId) -> Result<Option<Policy>, LoaderError> {
        Ok(self.get(id).await)
    }
}
