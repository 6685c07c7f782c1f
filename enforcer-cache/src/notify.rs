//! Policy change notifications driving cache invalidation.

use crate::cache::EnforcerCache;
use policies::PolicyId;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Published once for every accepted policy modification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyChange {
    pub policy_id: PolicyId,
    pub revision: i64,
}

/// Invalidate `cache` for every change received until the channel closes.
///
/// A lagging receiver has missed notifications it cannot name, so it drops
/// the whole cache instead.
pub fn spawn_invalidation_listener(
    cache: EnforcerCache,
    mut changes: broadcast::Receiver<PolicyChange>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Policy change listener started");
        loop {
            match changes.recv().await {
                Ok(change) => {
                    debug!(
                        "Policy changed: key={}, revision={}",
                        change.policy_id, change.revision
                    );
                    cache.invalidate(&change.policy_id, change.revision).await;
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!("Missed {} policy change notifications, clearing cache", missed);
                    cache.invalidate_all();
                }
                Err(RecvError::Closed) => break,
            }
        }
        info!("Policy change listener stopped");
    })
}
