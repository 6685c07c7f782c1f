use crate::error::LoaderError;
use async_trait::async_trait;
use policies::{Policy, PolicyId};

/// Source of policy documents for the cache.
///
/// Implementations are typically backed by the policy persistence. A
/// deleted policy may be returned as its tombstone or as `None`; the cache
/// treats both as nonexistent.
#[async_trait]
pub trait PolicyLoader: Send + Sync {
    /// Fetch the latest revision of `id`.
    ///
    /// # Errors
    /// [`LoaderError::Unavailable`] for failures that may go away on retry,
    /// [`LoaderError::Malformed`] when the stored document is invalid.
    async fn load(&self, id: &PolicyId) -> Result<Option<Policy>, LoaderError>;
}
