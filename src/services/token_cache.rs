use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct CachedToken {
    pub token: String,
    pub expires_at: Instant,
}

impl CachedToken {
    pub fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Session tokens keyed by origin + identity + actor collection.
///
/// Cloning shares the same entries. Writes replace whole entries, so two callers that
/// miss at once both log in and the last write wins. Expired entries are only skipped
/// on read, never evicted.
#[derive(Debug, Clone, Default)]
pub struct TokenCache {
    entries: Arc<DashMap<String, CachedToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let entry = self.entries.get(key)?;
        entry
            .is_fresh(Instant::now())
            .then(|| entry.token.clone())
    }

    pub fn insert(&self, key: &str, token: &str, ttl: Duration) {
        self.insert_entry(
            key,
            CachedToken {
                token: token.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
    }

    pub fn insert_entry(&self, key: &str, entry: CachedToken) {
        self.entries.insert(key.to_string(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry; called when the host tears the client down.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{CachedToken, TokenCache};
    use std::time::{Duration, Instant};

    #[test]
    fn fresh_entry_is_returned() {
        let cache = TokenCache::new();
        cache.insert("k", "tok", Duration::from_secs(60));
        assert_eq!(cache.get("k").as_deref(), Some("tok"));
        assert_eq!(cache.get("other"), None);
    }

    #[test]
    fn expired_entry_is_skipped_but_kept() {
        let cache = TokenCache::new();
        cache.insert_entry(
            "k",
            CachedToken {
                token: "old".to_string(),
                expires_at: Instant::now()
                    .checked_sub(Duration::from_secs(1))
                    .unwrap_or_else(Instant::now),
            },
        );
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clones_share_entries_and_last_write_wins() {
        let cache = TokenCache::new();
        let shared = cache.clone();
        cache.insert("k", "first", Duration::from_secs(60));
        shared.insert("k", "second", Duration::from_secs(60));
        assert_eq!(cache.get("k").as_deref(), Some("second"));
        assert_eq!(cache.len(), 1);
        shared.clear();
        assert!(cache.is_empty());
    }
}
