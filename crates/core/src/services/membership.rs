//! Membership cache.
//!
//! Holds the guild roles of recently seen identities so that permission
//! checks do not call the identity provider on every request. Entries
//! expire after a fixed TTL. Lookups treat an expired entry exactly like a
//! missing one, and a background sweep drops expired entries.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset_ms: AtomicU64,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// Create a clock frozen at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset_ms: AtomicU64::new(0),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        self.offset_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + Duration::from_millis(self.offset_ms.load(Ordering::SeqCst))
    }
}

/// Cached guild roles of one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedMembership {
    /// Role ids held in the guild.
    pub roles: Vec<u64>,
    /// When the roles were fetched.
    pub fetched_at: Instant,
    /// When the entry stops being served.
    pub expires_at: Instant,
}

/// TTL cache of identity roles.
///
/// Clones share the same map.
#[derive(Clone)]
pub struct MembershipCache {
    entries: Arc<RwLock<HashMap<u64, CachedMembership>>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl MembershipCache {
    /// Create a cache on the wall clock.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    /// Create a cache on a custom clock.
    #[must_use]
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            clock,
            ttl,
        }
    }

    /// Entry lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Roles of `identity`, if a fresh entry exists.
    pub async fn get(&self, identity: u64) -> Option<Vec<u64>> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        match entries.get(&identity) {
            Some(entry) if entry.expires_at > now => {
                debug!(identity, "Membership cache hit");
                Some(entry.roles.clone())
            }
            Some(_) => {
                debug!(identity, "Membership cache entry expired");
                None
            }
            None => {
                debug!(identity, "Membership cache miss");
                None
            }
        }
    }

    /// Store the roles of `identity` for one TTL.
    pub async fn insert(&self, identity: u64, roles: Vec<u64>) {
        let fetched_at = self.clock.now();
        let entry = CachedMembership {
            roles,
            fetched_at,
            expires_at: fetched_at + self.ttl,
        };
        self.entries.write().await.insert(identity, entry);
    }

    /// Drop every expired entry. Returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    /// Number of entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Start the periodic sweep. Cancel the returned token to stop it.
    #[must_use]
    pub fn spawn_sweeper(&self, every: Duration) -> CancellationToken {
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        let cache = self.clone();

        tokio::spawn(async move {
            cache.run_sweeper(every, cancel_clone).await;
        });

        cancel
    }

    async fn run_sweeper(&self, every: Duration, cancel: CancellationToken) {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(
            interval_secs = every.as_secs(),
            ttl_secs = self.ttl.as_secs(),
            "Membership cache sweeper started"
        );

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("Membership cache sweeper shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let purged = self.purge_expired().await;
                    if purged > 0 {
                        debug!(purged, "Purged expired membership entries");
                    }
                }
            }
        }
    }
}
