use crate::util::collapse_whitespace;

/// Shortest key (in characters) the cache accepts.
pub const MIN_KEY_CHARS: usize = 2;

/// Normalized source text used as a translation cache key.
///
/// Two normal forms exist:
/// - [`CacheKey::collapsed`]: whitespace runs folded into single spaces, used
///   by single-text lookups and as the fallback lookup for batches
/// - [`CacheKey::trimmed`]: only surrounding whitespace removed, used to store
///   batch results
///
/// Both reject text shorter than [`MIN_KEY_CHARS`] characters, so short or
/// empty strings can never enter the cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key from the whitespace-collapsed form of `text`.
    pub fn collapsed(text: &str) -> Option<Self> {
        Self::checked(collapse_whitespace(text))
    }

    /// Key from the trimmed form of `text`, inner whitespace untouched.
    pub fn trimmed(text: &str) -> Option<Self> {
        Self::checked(text.trim().to_string())
    }

    fn checked(normalized: String) -> Option<Self> {
        (normalized.chars().count() >= MIN_KEY_CHARS).then_some(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
