//! Utility functions shared across the crate.

use std::path::PathBuf;

/// Get the user's config directory following XDG conventions.
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise `$HOME/.config`.
pub fn config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
}

/// Get the user's cache directory following XDG conventions.
///
/// Returns `$XDG_CACHE_HOME` if set, otherwise `$HOME/.cache`.
pub fn cache_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cache")))
}

/// Get the default on-disk translation cache path.
pub fn translation_cache_path() -> PathBuf {
    cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("layout-translate")
}

/// Collapse every run of whitespace into a single space and trim both ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Number of characters left after trimming surrounding whitespace.
pub fn trimmed_char_count(text: &str) -> usize {
    text.trim().chars().count()
}

/// Clear the on-disk translation cache, every language pair included.
///
/// Returns the number of entries cleared, or an error message.
pub fn clear_translation_cache() -> Result<usize, String> {
    let cache_path = translation_cache_path();

    if !cache_path.exists() {
        return Ok(0);
    }

    let db = sled::open(&cache_path)
        .map_err(|e| format!("Failed to open cache: {e}"))?;

    let mut count = 0;
    for name in db.tree_names() {
        let tree = db
            .open_tree(&name)
            .map_err(|e| format!("Failed to open cache tree: {e}"))?;
        count += tree.len();
        tree.clear().map_err(|e| format!("Failed to clear cache: {e}"))?;
    }
    db.flush().map_err(|e| format!("Failed to flush cache: {e}"))?;

    Ok(count)
}
