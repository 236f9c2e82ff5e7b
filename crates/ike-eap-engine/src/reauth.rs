//! Fast re-authentication cache
//!
//! Holds the EAP-SIM/AKA re-authentication context (counter and master keys)
//! issued with a successful full authentication, keyed by the
//! (re-authentication identity, permanent identity) pair it was issued for.
//!
//! The cache is bounded (least recently used entries are evicted first) and
//! entries expire after a fixed TTL. Expiry is checked lazily on insert and
//! lookup; there is no background sweep.

use ike_eap_proto::ProtocolLogger;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Default number of re-authentication contexts kept
pub const DEFAULT_REAUTH_CAPACITY: usize = 10;

/// Default lifetime of a re-authentication context
pub const DEFAULT_REAUTH_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// Longest accepted lifetime of a re-authentication context
pub const MAX_REAUTH_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Cache key
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct ReauthKey {
    pub reauth_id: String,
    pub permanent_id: String,
}

impl ReauthKey {
    pub fn new(reauth_id: impl Into<String>, permanent_id: impl Into<String>) -> Self {
        ReauthKey {
            reauth_id: reauth_id.into(),
            permanent_id: permanent_id.into(),
        }
    }
}

/// Re-authentication context
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ReauthInfo {
    pub counter: u16,
    pub mk: Vec<u8>,
    pub k_encr: Vec<u8>,
    pub k_aut: Vec<u8>,
    /// `None` when the lifetime runs past what `Instant` can represent
    #[zeroize(skip)]
    expires_at: Option<Instant>,
}

impl ReauthInfo {
    pub fn new(counter: u16, mk: Vec<u8>, k_encr: Vec<u8>, k_aut: Vec<u8>, ttl: Duration) -> Self {
        ReauthInfo {
            counter,
            mk,
            k_encr,
            k_aut,
            expires_at: Instant::now().checked_add(ttl),
        }
    }

    pub fn is_valid(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Instant::now() < expires_at,
            None => true,
        }
    }

    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }
}

impl std::fmt::Debug for ReauthInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReauthInfo")
            .field("counter", &self.counter)
            .field("valid", &self.is_valid())
            .finish_non_exhaustive()
    }
}

/// Storage for re-authentication contexts
///
/// Implementations own their synchronisation; every method takes `&self`.
pub trait ReauthStore: Send + Sync {
    /// Look up a valid context, refreshing its recency
    fn get(&self, key: &ReauthKey) -> Option<ReauthInfo>;

    /// Store a context, replacing any previous one for `key`
    fn put(&self, key: ReauthKey, info: ReauthInfo);

    /// Remove and return a context, valid or not
    fn remove(&self, key: &ReauthKey) -> Option<ReauthInfo>;

    /// Drop expired contexts, returning how many were removed
    fn garbage_collect(&self) -> usize;

    /// Remove a context and return it only if it has not expired
    ///
    /// A context is consumed by the attempt to use it, whether or not the
    /// attempt succeeds.
    fn take_valid(&self, key: &ReauthKey) -> Option<ReauthInfo> {
        self.remove(key).filter(ReauthInfo::is_valid)
    }
}

/// In-memory LRU store with TTL expiry
pub struct ReauthCache {
    entries: Mutex<LruCache<ReauthKey, ReauthInfo>>,
    ttl: Duration,
    logger: ProtocolLogger,
}

impl ReauthCache {
    /// Create a cache holding at most `capacity` contexts (minimum 1)
    ///
    /// `ttl` is capped at [`MAX_REAUTH_TTL`].
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        ReauthCache {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl: ttl.min(MAX_REAUTH_TTL),
            logger: ProtocolLogger::default(),
        }
    }

    pub fn with_logger(mut self, logger: ProtocolLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Store the context issued with a successful full authentication
    pub fn register(
        &self,
        reauth_id: &str,
        permanent_id: &str,
        counter: u16,
        mk: Vec<u8>,
        k_encr: Vec<u8>,
        k_aut: Vec<u8>,
    ) {
        debug!(
            reauth_id = %self.logger.pii_str(reauth_id),
            permanent_id = %self.logger.pii_str(permanent_id),
            counter = counter,
            "Registering re-authentication context"
        );
        let info = ReauthInfo::new(counter, mk, k_encr, k_aut, self.ttl);
        self.put(ReauthKey::new(reauth_id, permanent_id), info);
    }

    fn collect_expired(entries: &mut LruCache<ReauthKey, ReauthInfo>) -> usize {
        let expired: Vec<ReauthKey> = entries
            .iter()
            .filter(|(_, info)| !info.is_valid())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            entries.pop(key);
        }
        expired.len()
    }
}

impl Default for ReauthCache {
    fn default() -> Self {
        Self::new(DEFAULT_REAUTH_CAPACITY, DEFAULT_REAUTH_TTL)
    }
}

impl ReauthStore for ReauthCache {
    fn get(&self, key: &ReauthKey) -> Option<ReauthInfo> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(info) if info.is_valid() => Some(info.clone()),
            Some(_) => {
                entries.pop(key);
                debug!(
                    reauth_id = %self.logger.pii_str(&key.reauth_id),
                    "Re-authentication context expired"
                );
                None
            }
            None => None,
        }
    }

    fn put(&self, key: ReauthKey, info: ReauthInfo) {
        let mut entries = self.entries.lock();
        let removed = Self::collect_expired(&mut entries);
        if let Some((evicted, _)) = entries.push(key.clone(), info)
            && evicted != key
        {
            debug!(
                reauth_id = %self.logger.pii_str(&evicted.reauth_id),
                "Evicted least recently used re-authentication context"
            );
        }
        if removed > 0 {
            debug!(
                removed = removed,
                remaining = entries.len(),
                "Re-authentication cache cleanup completed"
            );
        }
    }

    fn remove(&self, key: &ReauthKey) -> Option<ReauthInfo> {
        self.entries.lock().pop(key)
    }

    fn garbage_collect(&self) -> usize {
        Self::collect_expired(&mut self.entries.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn register(cache: &ReauthCache, reauth_id: &str, counter: u16) {
        cache.register(reauth_id, "0001010123456789@nai", counter, vec![1; 20], vec![2; 16], vec![3; 16]);
    }

    fn key(reauth_id: &str) -> ReauthKey {
        ReauthKey::new(reauth_id, "0001010123456789@nai")
    }

    #[test]
    fn test_register_and_get() {
        let cache = ReauthCache::default();
        register(&cache, "reauth-1", 3);

        let info = cache.get(&key("reauth-1")).unwrap();
        assert_eq!(info.counter, 3);
        assert_eq!(info.mk, vec![1; 20]);
        assert_eq!(info.k_encr, vec![2; 16]);
        assert_eq!(info.k_aut, vec![3; 16]);
        assert!(cache.get(&ReauthKey::new("reauth-1", "other")).is_none());
    }

    #[test]
    fn test_take_valid_consumes_entry() {
        let cache = ReauthCache::default();
        register(&cache, "reauth-1", 1);

        assert!(cache.take_valid(&key("reauth-1")).is_some());
        assert!(cache.take_valid(&key("reauth-1")).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_lru_eviction() {
        let cache = ReauthCache::new(2, DEFAULT_REAUTH_TTL);
        register(&cache, "a", 1);
        register(&cache, "b", 1);

        // Touch "a" so "b" becomes least recently used
        assert!(cache.get(&key("a")).is_some());
        register(&cache, "c", 1);

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key("a")).is_some());
        assert!(cache.get(&key("b")).is_none());
        assert!(cache.get(&key("c")).is_some());
    }

    #[test]
    fn test_put_replaces_existing() {
        let cache = ReauthCache::default();
        register(&cache, "a", 1);
        register(&cache, "a", 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key("a")).unwrap().counter, 2);
    }

    #[test]
    fn test_expiry_on_lookup() {
        let cache = ReauthCache::new(4, Duration::from_millis(20));
        register(&cache, "a", 1);
        sleep(Duration::from_millis(40));

        assert!(cache.get(&key("a")).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_take_valid_drops_expired() {
        let cache = ReauthCache::new(4, Duration::from_millis(20));
        register(&cache, "a", 1);
        sleep(Duration::from_millis(40));

        assert!(cache.take_valid(&key("a")).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_lazy_sweep_on_insert() {
        let cache = ReauthCache::new(4, Duration::from_millis(20));
        register(&cache, "a", 1);
        register(&cache, "b", 1);
        sleep(Duration::from_millis(40));

        // Expired entries stay until the next insert or lookup
        assert_eq!(cache.len(), 2);
        register(&cache, "c", 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_garbage_collect() {
        let cache = ReauthCache::new(4, Duration::from_millis(20));
        register(&cache, "a", 1);
        sleep(Duration::from_millis(40));
        cache.put(
            key("fresh"),
            ReauthInfo::new(1, vec![], vec![], vec![], DEFAULT_REAUTH_TTL),
        );
        register(&cache, "b", 1);
        sleep(Duration::from_millis(40));

        assert_eq!(cache.garbage_collect(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&key("fresh")).is_some());
    }

    #[test]
    fn test_oversized_ttl_does_not_overflow() {
        let info = ReauthInfo::new(1, vec![], vec![], vec![], Duration::MAX);
        assert!(info.is_valid());
        assert!(info.expires_at().is_none());

        let cache = ReauthCache::new(4, Duration::from_secs(u64::MAX));
        assert_eq!(cache.ttl(), MAX_REAUTH_TTL);
        register(&cache, "a", 1);
        assert!(cache.get(&key("a")).is_some());
    }

    #[test]
    fn test_zero_capacity_clamped() {
        assert_eq!(ReauthCache::new(0, DEFAULT_REAUTH_TTL).capacity(), 1);
    }

    #[test]
    fn test_debug_hides_keys() {
        let info = ReauthInfo::new(7, vec![0xaa; 4], vec![], vec![], DEFAULT_REAUTH_TTL);
        let rendered = format!("{:?}", info);
        assert!(rendered.contains("counter: 7"));
        assert!(!rendered.contains("170"));
    }
}
