use sled::Tree;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Disk-based translation cache using sled.
///
/// Each language pair lives in its own tree of the same database, so one
/// cache directory can serve several pairs without key collisions.
pub struct DiskCache {
    db: sled::Db,
    tree: Tree,
}

impl DiskCache {
    pub fn new(path: impl AsRef<Path>, namespace: &str) -> Result<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::CacheInit(format!(
                    "Failed to create cache directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let db = sled::open(path).map_err(|e| {
            let err_str = e.to_string();
            // Detect lock errors and provide actionable fix
            if err_str.contains("WouldBlock") || err_str.contains("lock") {
                Error::CacheInit(format!(
                    "Cache locked at {}\n\n\
                    Another process is using the cache, or a previous instance crashed.\n\
                    To fix: rm {}/db/LOCK",
                    path.display(),
                    path.display()
                ))
            } else {
                Error::CacheInit(format!("Failed to open cache at {}: {}", path.display(), e))
            }
        })?;

        let tree = db
            .open_tree(namespace)
            .map_err(|e| Error::CacheInit(format!("Failed to open cache tree {namespace}: {e}")))?;

        debug!("Opened disk cache at {} ({})", path.display(), namespace);

        Ok(Self { db, tree })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match self.tree.get(key.as_bytes()) {
            Ok(Some(value)) => String::from_utf8(value.to_vec())
                .map_err(|e| warn!("Discarding non-UTF-8 cache entry for {:?}: {}", key, e))
                .ok(),
            Ok(None) => None,
            Err(e) => {
                warn!("Cache read error: {}", e);
                None
            }
        }
    }

    pub fn insert(&self, key: &str, value: &str) -> Result<()> {
        self.tree
            .insert(key.as_bytes(), value.as_bytes())
            .map_err(|e| Error::CacheWrite(e.to_string()))?;
        Ok(())
    }

    /// Read every entry of this language pair.
    pub fn entries(&self) -> Result<Vec<(String, String)>> {
        self.tree
            .iter()
            .map(|item| {
                let (key, value) = item.map_err(|e| Error::CacheRead(e.to_string()))?;
                Ok((
                    String::from_utf8_lossy(&key).into_owned(),
                    String::from_utf8_lossy(&value).into_owned(),
                ))
            })
            .collect()
    }

    pub fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| Error::CacheWrite(format!("Flush failed: {e}")))?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.tree.clear().map_err(|e| Error::CacheWrite(e.to_string()))?;
        self.flush()
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}
