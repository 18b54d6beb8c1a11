//! Resolution cache: bounded, time-limited storage of materialized
//! resources keyed by resolved absolute path or canonical remote URL.
//!
//! Expiry is absolute: an entry dies `max_age` after creation no matter how
//! often it is read. Reads refresh `last_accessed` only, which orders
//! eviction when an insert would exceed capacity.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::types::MaterializedResource;

/// Default entry capacity.
pub const DEFAULT_MAX_ENTRIES: usize = 200;

/// Default time-to-live: thirty minutes.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(30 * 60);

/// Capacity floor enforced by `set_config`.
const MIN_MAX_ENTRIES: usize = 10;

/// TTL floor enforced by `set_config`.
const MIN_MAX_AGE: Duration = Duration::from_secs(60);

/// One cached materialization.
#[derive(Debug, Clone)]
struct CacheEntry {
    created_at: Instant,
    last_accessed: Instant,
    resource: MaterializedResource,
}

/// The cache itself. An explicit instance owned by the workspace context,
/// never module-level state.
pub struct ResolutionCache {
    entries: HashMap<String, CacheEntry>,
    max_age: Duration,
    max_entries: usize,
}

impl ResolutionCache {
    /// Cache with default capacity and TTL.
    pub fn new() -> Self {
        Self::with_config(DEFAULT_MAX_ENTRIES, DEFAULT_MAX_AGE)
    }

    /// Cache with explicit capacity and TTL, floors applied.
    pub fn with_config(max_entries: usize, max_age: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            max_age: max_age.max(MIN_MAX_AGE),
            max_entries: max_entries.max(MIN_MAX_ENTRIES),
        }
    }

    /// Fetch a live entry. Entries past `max_age` are evicted and reported
    /// as a miss. A hit refreshes `last_accessed` but never `created_at`.
    pub fn get(&mut self, key: &str) -> Option<MaterializedResource> {
        let now = Instant::now();
        let expired = match self.entries.get_mut(key) {
            None => return None,
            Some(entry) => {
                if now.duration_since(entry.created_at) <= self.max_age {
                    entry.last_accessed = now;
                    return Some(entry.resource.clone());
                }
                true
            }
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    /// Insert or overwrite. When the cache is at capacity and the key is
    /// new, expired entries are dropped first, then least-recently-accessed
    /// entries until there is room.
    pub fn set(&mut self, key: String, resource: MaterializedResource) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            self.cleanup();
        }
        let now = Instant::now();
        self.entries.insert(
            key,
            CacheEntry {
                created_at: now,
                last_accessed: now,
                resource,
            },
        );
    }

    /// Whether a key is present (liveness not checked; `get` decides that).
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove one entry.
    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries, live or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adjust capacity and TTL at runtime. Floors are enforced and a
    /// cleanup pass runs immediately so the new limits hold.
    pub fn set_config(&mut self, max_entries: usize, max_age: Duration) {
        self.max_entries = max_entries.max(MIN_MAX_ENTRIES);
        self.max_age = max_age.max(MIN_MAX_AGE);
        self.cleanup();
    }

    /// Drop expired entries, then least-recently-accessed entries until the
    /// count leaves room for one insert.
    fn cleanup(&mut self) {
        let now = Instant::now();
        let max_age = self.max_age;
        self.entries
            .retain(|_, e| now.duration_since(e.created_at) <= max_age);

        while self.entries.len() >= self.max_entries {
            let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_accessed)
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }

    /// Shift an entry's creation (and access) time into the past, standing
    /// in for advancing the clock.
    #[cfg(test)]
    pub(crate) fn backdate(&mut self, key: &str, age: Duration) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.created_at -= age;
            entry.last_accessed -= age;
        }
    }
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MaterializedResource, Origin, ResourceKind, Span};
    use std::path::PathBuf;

    fn resource(name: &str) -> MaterializedResource {
        MaterializedResource {
            byte_size: 1,
            codec: None,
            bitrate: None,
            dimensions: None,
            duration_secs: None,
            kind: ResourceKind::Image,
            local_path: PathBuf::from(name),
            optimize: None,
            origin: Origin::File,
            span: Span { start: 0, end: 1 },
            vcs: None,
        }
    }

    #[test]
    fn hit_within_ttl_miss_after() {
        let mut cache = ResolutionCache::with_config(10, Duration::from_secs(60));
        cache.set("k".to_string(), resource("a"));

        // Just inside the TTL: hit.
        cache.backdate("k", Duration::from_secs(60) - Duration::from_millis(1));
        assert!(cache.get("k").is_some());

        // Past the TTL: miss, and the entry is gone.
        cache.backdate("k", Duration::from_secs(61));
        assert!(cache.get("k").is_none());
        assert!(!cache.contains("k"));
    }

    #[test]
    fn hit_does_not_extend_lifetime() {
        let mut cache = ResolutionCache::with_config(10, Duration::from_secs(60));
        cache.set("k".to_string(), resource("a"));
        cache.backdate("k", Duration::from_secs(59));
        // The hit refreshes last_accessed only.
        assert!(cache.get("k").is_some());
        cache.backdate("k", Duration::from_secs(2));
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn eviction_prefers_least_recently_accessed() {
        let mut cache = ResolutionCache::with_config(10, Duration::from_secs(600));
        for i in 0..10 {
            cache.set(format!("k{i}"), resource("x"));
        }
        // Make k1 strictly the least recently accessed, then touch k0.
        for i in 0..10 {
            cache.backdate(&format!("k{i}"), Duration::from_secs(10));
        }
        cache.backdate("k1", Duration::from_secs(10));
        assert!(cache.get("k0").is_some());

        cache.set("fresh".to_string(), resource("y"));
        assert_eq!(cache.len(), 10);
        assert!(cache.contains("k0"));
        assert!(cache.contains("fresh"));
        assert!(!cache.contains("k1"));
    }

    #[test]
    fn expired_entries_cleaned_before_lru() {
        let mut cache = ResolutionCache::with_config(10, Duration::from_secs(60));
        for i in 0..10 {
            cache.set(format!("k{i}"), resource("x"));
        }
        for i in 0..10 {
            cache.backdate(&format!("k{i}"), Duration::from_secs(120));
        }
        cache.set("fresh".to_string(), resource("y"));
        // All ten stale entries went away in one cleanup pass.
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("fresh"));
    }

    #[test]
    fn overwrite_does_not_evict() {
        let mut cache = ResolutionCache::with_config(10, Duration::from_secs(600));
        for i in 0..10 {
            cache.set(format!("k{i}"), resource("x"));
        }
        cache.set("k3".to_string(), resource("replacement"));
        assert_eq!(cache.len(), 10);
    }

    #[test]
    fn set_config_enforces_floors_and_cleans() {
        let mut cache = ResolutionCache::with_config(100, Duration::from_secs(600));
        for i in 0..50 {
            cache.set(format!("k{i}"), resource("x"));
        }
        cache.set_config(0, Duration::ZERO);
        // Floors: capacity 10, TTL 60s. Cleanup brought the count down.
        assert!(cache.len() <= 10);
        cache.set("new".to_string(), resource("y"));
        assert!(cache.contains("new"));
    }
}
