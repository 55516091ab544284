use moka::future::Cache;
use std::time::Duration;

/// In-memory translation cache using moka with entry-count eviction.
pub struct MemoryCache {
    cache: Cache<String, String>,
}

impl MemoryCache {
    pub fn new(max_entries: u64, ttl_seconds: u64) -> Self {
        let mut builder = Cache::builder().max_capacity(max_entries);

        if ttl_seconds > 0 {
            builder = builder.time_to_live(Duration::from_secs(ttl_seconds));
        }

        Self {
            cache: builder.build(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.cache.get(key).await
    }

    pub async fn insert(&self, key: String, value: String) {
        self.cache.insert(key, value).await;
    }

    /// Snapshot of the current entries.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.cache
            .iter()
            .map(|(key, value)| (key.as_ref().clone(), value))
            .collect()
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_then_get() {
        let cache = MemoryCache::new(10, 0);
        cache.insert("Hallo".to_string(), "Hello".to_string()).await;
        assert_eq!(cache.get("Hallo").await.as_deref(), Some("Hello"));
        assert!(cache.get("Welt").await.is_none());
    }

    #[tokio::test]
    async fn test_entries_snapshot() {
        let cache = MemoryCache::new(10, 0);
        cache.insert("Hund".to_string(), "dog".to_string()).await;
        cache.insert("Katze".to_string(), "cat".to_string()).await;

        let mut entries = cache.entries();
        entries.sort();
        assert_eq!(
            entries,
            vec![
                ("Hund".to_string(), "dog".to_string()),
                ("Katze".to_string(), "cat".to_string()),
            ]
        );
    }
}
