//! Revisioned cache of policy enforcers.
//!
//! The cache sits on the hot path of every authorization decision. It maps a
//! [`policies::PolicyId`] to an [`Entry`] holding the built
//! [`authz::Enforcer`] (or a negative entry when the policy does not exist)
//! and fetches missing policies through a [`PolicyLoader`].
//!
//! [`InMemoryPolicyStore`] is a loader that also publishes
//! [`PolicyChange`] notifications; [`spawn_invalidation_listener`] feeds
//! those back into the cache.

pub mod cache;
pub mod config;
pub mod entry;
pub mod error;
pub mod loader;
pub mod notify;
pub mod store;

pub use cache::{CacheStats, CachedEnforcer, EnforcerCache};
pub use config::CacheConfig;
pub use entry::Entry;
pub use error::{CacheError, LoaderError, Result, StoreError};
pub use loader::PolicyLoader;
pub use notify::{spawn_invalidation_listener, PolicyChange};
pub use store::InMemoryPolicyStore;
