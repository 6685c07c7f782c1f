//! The revisioned, single-flight enforcer cache.

use crate::config::CacheConfig;
use crate::entry::Entry;
use crate::error::{CacheError, LoaderError, Result};
use crate::loader::PolicyLoader;
use authz::Enforcer;
use chrono::Utc;
use dashmap::mapref::entry::Entry as InFlightEntry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use moka::future::Cache;
use moka::ops::compute::Op;
use policies::PolicyId;
use std::future::ready;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How often one loading task re-reads a policy that keeps coming back older
/// than the latest change notification.
const MAX_LOAD_ATTEMPTS: usize = 3;

/// The value type handed out by the cache.
pub type CachedEnforcer = Entry<Arc<Enforcer>>;

type SharedLoad = Shared<BoxFuture<'static, Result<CachedEnforcer>>>;

/// What a cache slot holds.
#[derive(Debug, Clone)]
enum Slot {
    Ready(CachedEnforcer),
    /// A change notification arrived; nothing older than `revision` may be
    /// committed any more.
    Stale { revision: i64 },
}

/// Outcome of trying to commit a freshly loaded entry.
enum Commit {
    /// Stored; hand it out.
    Accepted(CachedEnforcer),
    /// The slot already holds something at least as new; hand that out.
    Kept(CachedEnforcer),
    /// Older than the last notification; load again.
    BelowFloor(CachedEnforcer),
    /// The whole cache was cleared while loading; hand it out uncommitted.
    Discarded(CachedEnforcer),
}

/// Statistics about the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Occupied slots, including stale markers.
    pub entry_count: u64,
    /// Loads currently in progress.
    pub loads_in_flight: usize,
}

/// Maps policy ids to built enforcers.
///
/// - Concurrent misses on one key share a single loader call.
/// - A slot only ever moves forward in revision; a load that completes late
///   never replaces a newer entry.
/// - Missing and deleted policies are cached as nonexistent entries.
/// - Slots are evicted by size and by age after write.
///
/// Cloning is cheap and yields a handle to the same cache.
#[derive(Clone)]
pub struct EnforcerCache {
    inner: Arc<Inner>,
}

struct Inner {
    slots: Cache<PolicyId, Slot>,
    in_flight: DashMap<PolicyId, SharedLoad>,
    loader: Arc<dyn PolicyLoader>,
    config: CacheConfig,
    epoch: AtomicU64,
}

impl EnforcerCache {
    /// Create a cache in front of `loader`.
    ///
    /// # Errors
    /// [`CacheError::Config`] when the configuration does not validate.
    pub fn new(loader: Arc<dyn PolicyLoader>, config: CacheConfig) -> Result<Self> {
        config.validate()?;

        let slots = Cache::builder()
            .max_capacity(config.maximum_size)
            .time_to_live(config.expire_after_write)
            .build();

        info!(
            "Enforcer cache initialized: maximum_size={}, expire_after_write={}, ask_timeout={}",
            config.maximum_size,
            humantime::format_duration(config.expire_after_write),
            humantime::format_duration(config.ask_timeout)
        );

        Ok(Self {
            inner: Arc::new(Inner {
                slots,
                in_flight: DashMap::new(),
                loader,
                config,
                epoch: AtomicU64::new(0),
            }),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Get the enforcer for `key`, loading it on a miss.
    ///
    /// Waits at most the configured `ask_timeout`.
    pub async fn get(&self, key: &PolicyId) -> Result<CachedEnforcer> {
        self.get_with_timeout(key, self.inner.config.ask_timeout)
            .await
    }

    /// Get the enforcer for `key`, waiting at most `timeout`.
    ///
    /// A timed-out caller gets [`CacheError::Timeout`]; the load itself keeps
    /// running for the benefit of other callers and later lookups.
    pub async fn get_with_timeout(&self, key: &PolicyId, timeout: Duration) -> Result<CachedEnforcer> {
        if let Some(Slot::Ready(entry)) = self.inner.slots.get(key).await {
            debug!("Enforcer cache hit: key={}, revision={}", key, entry.revision());
            return Ok(entry);
        }

        let load = Inner::join_or_start(&self.inner, key);
        match tokio::time::timeout(timeout, load).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Enforcer lookup timed out: key={}, timeout={}",
                    key,
                    humantime::format_duration(timeout)
                );
                Err(CacheError::Timeout(timeout))
            }
        }
    }

    /// Store `entry` unless the slot already holds a newer revision or was
    /// marked stale at a newer revision. Returns whether it was stored.
    pub async fn put(&self, key: &PolicyId, entry: CachedEnforcer) -> bool {
        let revision = entry.revision();
        let mut accepted = false;
        self.inner
            .slots
            .entry(key.clone())
            .and_compute_with(|current| {
                let floor = match current.map(|c| c.into_value()) {
                    None => None,
                    Some(Slot::Ready(existing)) => Some(existing.revision()),
                    Some(Slot::Stale { revision }) => Some(revision),
                };
                accepted = floor.map_or(true, |floor| revision >= floor);
                ready(if accepted {
                    Op::Put(Slot::Ready(entry))
                } else {
                    Op::Nop
                })
            })
            .await;

        if accepted {
            debug!("Stored enforcer: key={}, revision={}", key, revision);
        } else {
            warn!("Rejected outdated enforcer: key={}, revision={}", key, revision);
        }
        accepted
    }

    /// React to a policy change: the next lookup of `key` loads anew unless
    /// the slot already holds `revision` or newer.
    pub async fn invalidate(&self, key: &PolicyId, revision: i64) {
        self.inner
            .slots
            .entry(key.clone())
            .and_compute_with(|current| {
                ready(match current.map(|c| c.into_value()) {
                    Some(Slot::Ready(existing)) if existing.revision() >= revision => Op::Nop,
                    Some(Slot::Stale { revision: floor }) => Op::Put(Slot::Stale {
                        revision: floor.max(revision),
                    }),
                    _ => Op::Put(Slot::Stale { revision }),
                })
            })
            .await;

        info!("Invalidated enforcer: key={}, revision={}", key, revision);
    }

    /// Drop every slot. Loads in progress finish but do not commit.
    pub fn invalidate_all(&self) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        self.inner.slots.invalidate_all();
        info!("Invalidated all cached enforcers");
    }

    /// True if a usable entry (possibly a nonexistent one) is cached.
    pub async fn contains(&self, key: &PolicyId) -> bool {
        matches!(self.inner.slots.get(key).await, Some(Slot::Ready(_)))
    }

    /// Number of occupied slots after pending evictions have run.
    pub async fn entry_count(&self) -> u64 {
        self.inner.slots.run_pending_tasks().await;
        self.inner.slots.entry_count()
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.entry_count().await,
            loads_in_flight: self.inner.in_flight.len(),
        }
    }
}

impl Inner {
    /// Join the load in progress for `key` or start one.
    fn join_or_start(this: &Arc<Self>, key: &PolicyId) -> SharedLoad {
        let load = match this.in_flight.entry(key.clone()) {
            InFlightEntry::Occupied(running) => {
                debug!("Joining enforcer load in progress: key={}", key);
                return running.get().clone();
            }
            InFlightEntry::Vacant(slot) => {
                debug!("Enforcer cache miss: key={}", key);
                let inner = Arc::clone(this);
                let key = key.clone();
                let load = async move { inner.load(key).await }.boxed().shared();
                slot.insert(load.clone());
                load
            }
        };

        // Driven by its own task so that it completes even if every waiter
        // gives up.
        tokio::spawn(load.clone());
        load
    }

    async fn load(&self, key: PolicyId) -> Result<CachedEnforcer> {
        let result = self.load_and_commit(&key).await;
        self.in_flight.remove(&key);
        result
    }

    async fn load_and_commit(&self, key: &PolicyId) -> Result<CachedEnforcer> {
        let mut attempt = 1;
        loop {
            let epoch = self.epoch.load(Ordering::SeqCst);
            // A load that finished just before this one started may have
            // filled the slot already.
            let floor_at_start = match self.slots.get(key).await {
                Some(Slot::Ready(entry)) => return Ok(entry),
                Some(Slot::Stale { revision }) => Some(revision),
                None => None,
            };

            let candidate = self.fetch(key).await?;
            match self.commit(key, candidate, floor_at_start, epoch).await {
                Commit::Accepted(entry) => {
                    info!(
                        "Cached enforcer: key={}, revision={}, exists={}",
                        key,
                        entry.revision(),
                        entry.exists()
                    );
                    return Ok(entry);
                }
                Commit::Kept(entry) => {
                    debug!(
                        "Discarded late enforcer load: key={}, cached revision={}",
                        key,
                        entry.revision()
                    );
                    return Ok(entry);
                }
                Commit::Discarded(entry) => {
                    debug!("Cache was cleared during load: key={}", key);
                    return Ok(entry);
                }
                Commit::BelowFloor(entry) if attempt >= MAX_LOAD_ATTEMPTS => {
                    warn!(
                        "Policy store keeps returning an outdated revision: key={}, revision={}, attempts={}",
                        key,
                        entry.revision(),
                        attempt
                    );
                    return Ok(entry);
                }
                Commit::BelowFloor(entry) => {
                    debug!(
                        "Reloading outdated policy: key={}, revision={}",
                        key,
                        entry.revision()
                    );
                    attempt += 1;
                }
            }
        }
    }

    /// Ask the loader and build the enforcer.
    ///
    /// A loader call is bounded by `ask_timeout` as well, so a hung call
    /// releases its in-flight slot and the next lookup asks again.
    async fn fetch(&self, key: &PolicyId) -> Result<CachedEnforcer> {
        let bound = self.config.ask_timeout;
        let loaded = match tokio::time::timeout(bound, self.loader.load(key)).await {
            Ok(loaded) => loaded,
            Err(_) => {
                warn!(
                    "Policy loader call timed out: key={}, timeout={}",
                    key,
                    humantime::format_duration(bound)
                );
                return Err(CacheError::Timeout(bound));
            }
        };
        let policy = match loaded {
            Ok(Some(policy)) => policy,
            Ok(None) => {
                debug!("Policy not found: key={}", key);
                return Ok(Entry::nonexistent());
            }
            Err(LoaderError::Malformed(err)) => {
                warn!("Treating malformed policy as nonexistent: key={}, error={}", key, err);
                return Ok(Entry::nonexistent());
            }
            Err(LoaderError::Unavailable(reason)) => {
                warn!("Policy loader failed: key={}, reason={}", key, reason);
                return Err(CacheError::LoaderFailure(reason));
            }
        };

        let revision = policy.revision();
        match Enforcer::new(&policy.without_expired_subjects(Utc::now())) {
            Ok(enforcer) => Ok(Entry::new(revision, Arc::new(enforcer))),
            Err(err) => {
                debug!("Policy not usable: key={}, error={}", key, err);
                Ok(Entry::nonexistent())
            }
        }
    }

    async fn commit(
        &self,
        key: &PolicyId,
        candidate: CachedEnforcer,
        floor_at_start: Option<i64>,
        epoch: u64,
    ) -> Commit {
        let mut outcome = None;
        self.slots
            .entry(key.clone())
            .and_compute_with(|current| {
                let (op, commit) = if self.epoch.load(Ordering::SeqCst) != epoch {
                    (Op::Nop, Commit::Discarded(candidate))
                } else {
                    decide(current.map(|c| c.into_value()), candidate, floor_at_start)
                };
                outcome = Some(commit);
                ready(op)
            })
            .await;

        // The closure always runs exactly once.
        match outcome {
            Some(commit) => commit,
            None => Commit::Discarded(Entry::nonexistent()),
        }
    }
}

fn decide(current: Option<Slot>, candidate: CachedEnforcer, floor_at_start: Option<i64>) -> (Op<Slot>, Commit) {
    match current {
        None => (
            Op::Put(Slot::Ready(candidate.clone())),
            Commit::Accepted(candidate),
        ),
        Some(Slot::Ready(existing)) if candidate.supersedes(&existing) => (
            Op::Put(Slot::Ready(candidate.clone())),
            Commit::Accepted(candidate),
        ),
        Some(Slot::Ready(existing)) => (Op::Nop, Commit::Kept(existing)),
        Some(Slot::Stale { revision: floor }) => {
            let fresh = if candidate.exists() {
                candidate.revision() >= floor
            } else {
                // A miss carries no revision of its own; it is fresh when no
                // notification arrived after the load started.
                floor_at_start.is_some_and(|start| floor <= start)
            };
            if fresh {
                (
                    Op::Put(Slot::Ready(candidate.clone())),
                    Commit::Accepted(candidate),
                )
            } else {
                (Op::Nop, Commit::BelowFloor(candidate))
            }
        }
    }
}
