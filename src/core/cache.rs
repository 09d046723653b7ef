//! Bounded TTL cache for crawled document content
//!
//! The scrape endpoint stores crawled content here so a follow-up chat
//! request carrying only the URL does not trigger a second crawl. Both
//! capacity and entry lifetime are bounded; the cache is an optimization,
//! never a source of truth.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// Default capacity.
pub const DEFAULT_MAX_ENTRIES: usize = 32;

struct CacheEntry {
    content: String,
    expires_at: Instant,
}

/// URL → crawled content cache with per-entry expiry and a size cap.
pub struct DocCache {
    ttl: Duration,
    max_entries: usize,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl DocCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Look up content for a URL, dropping the entry if it has expired.
    pub fn get(&self, url: &str) -> Option<String> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");

        match entries.get(url) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.content.clone()),
            Some(_) => {
                entries.remove(url);
                None
            }
            None => None,
        }
    }

    /// Store content for a URL.
    ///
    /// Expired entries are dropped first; if the cache is still full, the
    /// entry closest to expiry makes room.
    pub fn insert(&self, url: impl Into<String>, content: impl Into<String>) {
        let url = url.into();
        let now = Instant::now();
        let mut entries = self.entries.lock().expect("cache lock poisoned");

        entries.retain(|_, entry| entry.expires_at > now);

        if entries.len() >= self.max_entries && !entries.contains_key(&url) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(key, _)| key.clone());
            if let Some(key) = oldest {
                entries.remove(&key);
            }
        }

        entries.insert(
            url,
            CacheEntry {
                content: content.into(),
                expires_at: now + self.ttl,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DocCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_MAX_ENTRIES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_and_miss() {
        let cache = DocCache::default();
        cache.insert("https://a", "content a");

        assert_eq!(cache.get("https://a").as_deref(), Some("content a"));
        assert_eq!(cache.get("https://b"), None);
    }

    #[test]
    fn test_entries_expire() {
        let cache = DocCache::new(Duration::from_millis(10), 8);
        cache.insert("https://a", "content a");

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get("https://a"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_full_cache_evicts_soonest_to_expire() {
        let cache = DocCache::new(Duration::from_secs(60), 2);
        cache.insert("https://a", "a");
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("https://b", "b");
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("https://c", "c");

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("https://a"), None);
        assert_eq!(cache.get("https://b").as_deref(), Some("b"));
        assert_eq!(cache.get("https://c").as_deref(), Some("c"));
    }

    #[test]
    fn test_reinserting_same_url_does_not_evict_others() {
        let cache = DocCache::new(Duration::from_secs(60), 2);
        cache.insert("https://a", "a");
        cache.insert("https://b", "b");
        cache.insert("https://a", "a updated");

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("https://a").as_deref(), Some("a updated"));
        assert_eq!(cache.get("https://b").as_deref(), Some("b"));
    }
}
