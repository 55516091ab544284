mod disk;
mod key;
mod memory;

pub use disk::DiskCache;
pub use key::{CacheKey, MIN_KEY_CHARS};
pub use memory::MemoryCache;

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::error::{Error, Result};

/// Combined translation cache with memory and disk layers.
///
/// Maps normalized German text to its English translation. Entries are only
/// ever added after a successful translation; both layers are internally
/// synchronized so one cache can be shared across documents behind an `Arc`.
pub struct TranslationCache {
    memory: Option<MemoryCache>,
    disk: Option<DiskCache>,
}

impl TranslationCache {
    /// Create a new translation cache from configuration.
    ///
    /// `namespace` separates language pairs in the disk layer (e.g. `de-en`).
    pub fn new(config: &CacheConfig, namespace: &str) -> Result<Self> {
        let memory = config.memory_enabled.then(|| {
            MemoryCache::new(config.memory_max_entries, config.memory_ttl_seconds)
        });

        let disk = if config.disk_enabled {
            let path = config
                .disk_path
                .clone()
                .unwrap_or_else(crate::util::translation_cache_path);
            Some(DiskCache::new(path, namespace)?)
        } else {
            None
        };

        Ok(Self { memory, disk })
    }

    /// Memory-only cache with default capacity.
    pub fn in_memory() -> Self {
        let defaults = CacheConfig::default();
        Self {
            memory: Some(MemoryCache::new(
                defaults.memory_max_entries,
                defaults.memory_ttl_seconds,
            )),
            disk: None,
        }
    }

    /// Get a cached translation
    pub async fn get(&self, key: &CacheKey) -> Option<String> {
        let key_str = key.as_str();

        // Try memory cache first
        if let Some(ref memory) = self.memory
            && let Some(value) = memory.get(key_str).await
        {
            return Some(value);
        }

        // Try disk cache
        if let Some(ref disk) = self.disk
            && let Some(value) = disk.get(key_str)
        {
            // Populate memory cache on disk hit
            if let Some(ref memory) = self.memory {
                memory.insert(key_str.to_string(), value.clone()).await;
            }
            return Some(value);
        }

        None
    }

    /// Store a translation in cache
    pub async fn insert(&self, key: &CacheKey, value: String) {
        if let Some(ref disk) = self.disk
            && let Err(e) = disk.insert(key.as_str(), &value)
        {
            warn!("Failed to persist cache entry: {}", e);
        }

        if let Some(ref memory) = self.memory {
            memory.insert(key.as_str().to_string(), value).await;
        }
    }

    /// Check if a key exists in cache
    pub async fn contains(&self, key: &CacheKey) -> bool {
        self.get(key).await.is_some()
    }

    /// All entries of both layers, key-sorted. Memory wins on conflicts.
    pub fn entries(&self) -> Result<BTreeMap<String, String>> {
        let mut entries = BTreeMap::new();
        if let Some(ref disk) = self.disk {
            entries.extend(disk.entries()?);
        }
        if let Some(ref memory) = self.memory {
            entries.extend(memory.entries());
        }
        Ok(entries)
    }

    /// Merge a JSON cache file (flat object, text → translation).
    ///
    /// A missing file is not an error. Keys that would not be accepted as
    /// cache keys are skipped. Returns the number of entries loaded.
    pub async fn load_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No cache file at {}", path.display());
            return Ok(0);
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::CacheRead(format!("{}: {}", path.display(), e)))?;
        let entries: BTreeMap<String, String> = serde_json::from_str(&content)
            .map_err(|e| Error::CacheRead(format!("{}: {}", path.display(), e)))?;

        let mut loaded = 0;
        for (source, translation) in entries {
            match CacheKey::trimmed(&source) {
                Some(key) => {
                    self.insert(&key, translation).await;
                    loaded += 1;
                }
                None => debug!("Skipping cache file entry {:?}", source),
            }
        }

        info!("Loaded {} cached translations from {}", loaded, path.display());
        Ok(loaded)
    }

    /// Write every entry as a key-sorted JSON object, replacing `path` atomically.
    pub fn save_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let entries = self.entries()?;
        let json = serde_json::to_string_pretty(&entries)
            .map_err(|e| Error::CacheWrite(e.to_string()))?;

        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(json.as_bytes())?;
        tmp.persist(path)
            .map_err(|e| Error::CacheWrite(format!("{}: {}", path.display(), e)))?;

        if let Some(ref disk) = self.disk {
            disk.flush()?;
        }

        info!("Saved {} cached translations to {}", entries.len(), path.display());
        Ok(entries.len())
    }

    /// Clear all caches
    pub fn clear(&self) {
        if let Some(ref memory) = self.memory {
            memory.clear();
        }

        if let Some(ref disk) = self.disk
            && let Err(e) = disk.clear()
        {
            warn!("Failed to clear disk cache: {}", e);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn key(text: &str) -> CacheKey {
        CacheKey::trimmed(text).unwrap()
    }

    #[tokio::test]
    async fn test_memory_round_trip() {
        let cache = TranslationCache::in_memory();
        cache.insert(&key("Hallo"), "Hello".to_string()).await;
        assert_eq!(cache.get(&key("Hallo")).await.as_deref(), Some("Hello"));
        assert!(!cache.contains(&key("Tschüss")).await);
    }

    #[tokio::test]
    async fn test_disk_layer_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig {
            disk_enabled: true,
            disk_path: Some(dir.path().join("db")),
            ..Default::default()
        };

        {
            let cache = TranslationCache::new(&config, "de-en").unwrap();
            cache.insert(&key("Straße"), "street".to_string()).await;
            cache.disk.as_ref().unwrap().flush().unwrap();
        }

        let cache = TranslationCache::new(&config, "de-en").unwrap();
        assert_eq!(cache.get(&key("Straße")).await.as_deref(), Some("street"));
    }

    #[tokio::test]
    async fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");

        let cache = TranslationCache::in_memory();
        cache.insert(&key("Zug"), "train".to_string()).await;
        cache.insert(&key("Auto"), "car".to_string()).await;
        assert_eq!(cache.save_file(&path).unwrap(), 2);

        let written = std::fs::read_to_string(&path).unwrap();
        let auto = written.find("Auto").unwrap();
        let zug = written.find("Zug").unwrap();
        assert!(auto < zug, "keys must be sorted");

        let reloaded = TranslationCache::in_memory();
        assert_eq!(reloaded.load_file(&path).await.unwrap(), 2);
        assert_eq!(reloaded.get(&key("Zug")).await.as_deref(), Some("train"));
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TranslationCache::in_memory();
        assert_eq!(cache.load_file(dir.path().join("absent.json")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_load_skips_short_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, r#"{"a": "x", "Haus": "house"}"#).unwrap();

        let cache = TranslationCache::in_memory();
        assert_eq!(cache.load_file(&path).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_load_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "not json").unwrap();

        let cache = TranslationCache::in_memory();
        assert!(matches!(cache.load_file(&path).await, Err(Error::CacheRead(_))));
    }
}
