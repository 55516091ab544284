use std::sync::Arc;
use tracing::{debug, warn};

use super::Translator;
use crate::cache::{CacheKey, TranslationCache};
use crate::config::Lang;
use crate::util::trimmed_char_count;

/// Outcome of translating one text.
///
/// Every variant carries the text to use downstream, so callers never need
/// to fall back to the input themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    /// Freshly translated by the backend
    Translated(String),
    /// Served from the cache
    Cached(String),
    /// Too short to translate; the input, unchanged
    Skipped(String),
    /// The backend failed; the input, unchanged
    Fallback(String),
}

impl Translation {
    pub fn text(&self) -> &str {
        match self {
            Self::Translated(text) | Self::Cached(text) | Self::Skipped(text) | Self::Fallback(text) => {
                text
            }
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Translated(text) | Self::Cached(text) | Self::Skipped(text) | Self::Fallback(text) => {
                text
            }
        }
    }

    /// Whether the text actually went through translation (now or earlier).
    pub const fn is_translated(&self) -> bool {
        matches!(self, Self::Translated(_) | Self::Cached(_))
    }
}

/// Cache-aware adapter in front of a [`Translator`].
///
/// Never fails: per-text and per-chunk errors degrade to
/// [`Translation::Fallback`], and every call returns exactly one result per
/// input, in input order.
pub struct BatchTranslator {
    translator: Arc<dyn Translator>,
    cache: Arc<TranslationCache>,
    source: Lang,
    target: Lang,
    min_text_length: usize,
}

impl BatchTranslator {
    pub fn new(
        translator: Arc<dyn Translator>,
        cache: Arc<TranslationCache>,
        source: Lang,
        target: Lang,
        min_text_length: usize,
    ) -> Self {
        Self {
            translator,
            cache,
            source,
            target,
            min_text_length,
        }
    }

    /// Whether `text` is long enough to be translated at all.
    pub fn is_translatable(&self, text: &str) -> bool {
        trimmed_char_count(text) >= self.min_text_length
    }

    /// Translate a single text, consulting the cache by its collapsed form.
    pub async fn translate_one(&self, text: &str) -> Translation {
        if !self.is_translatable(text) {
            return Translation::Skipped(text.to_string());
        }
        let Some(key) = CacheKey::collapsed(text) else {
            return Translation::Skipped(text.to_string());
        };

        if let Some(hit) = self.cache.get(&key).await {
            debug!("Cache hit for {:?}", key.as_str());
            return Translation::Cached(hit);
        }

        match self
            .translator
            .translate(key.as_str(), &self.source, &self.target)
            .await
        {
            Ok(translated) if !translated.trim().is_empty() => {
                self.cache.insert(&key, translated.clone()).await;
                Translation::Translated(translated)
            }
            Ok(_) => {
                warn!("Empty translation for {:?}, keeping original", key.as_str());
                Translation::Fallback(text.to_string())
            }
            Err(e) => {
                warn!("Translation failed for {:?}: {}", key.as_str(), e);
                Translation::Fallback(text.to_string())
            }
        }
    }

    /// Translate `texts` in chunks of `batch_size`, one backend call per chunk.
    ///
    /// Short texts and cache hits are resolved locally; the remaining texts
    /// of a chunk are whitespace-collapsed and sent together. If that call
    /// fails or returns the wrong number of results, those texts fall back to
    /// their originals while the chunk's cache hits stay translated.
    /// Successful results are cached under the trimmed original text.
    pub async fn translate_batch(&self, texts: &[String], batch_size: usize) -> Vec<Translation> {
        let batch_size = batch_size.max(1);
        let mut results = Vec::with_capacity(texts.len());

        for (chunk_index, chunk) in texts.chunks(batch_size).enumerate() {
            let mut slots: Vec<Option<Translation>> = vec![None; chunk.len()];
            let mut pending: Vec<(usize, CacheKey, Option<CacheKey>)> = Vec::new();

            for (i, text) in chunk.iter().enumerate() {
                let collapsed = if self.is_translatable(text) {
                    CacheKey::collapsed(text)
                } else {
                    None
                };
                let Some(collapsed) = collapsed else {
                    slots[i] = Some(Translation::Skipped(text.clone()));
                    continue;
                };

                let trimmed = CacheKey::trimmed(text);
                if let Some(hit) = self.cached(trimmed.as_ref(), &collapsed).await {
                    slots[i] = Some(Translation::Cached(hit));
                } else {
                    pending.push((i, collapsed, trimmed));
                }
            }

            if !pending.is_empty() {
                let inputs: Vec<String> = pending
                    .iter()
                    .map(|(_, collapsed, _)| collapsed.as_str().to_string())
                    .collect();

                debug!(
                    "Translating chunk {} ({} of {} texts need the backend)",
                    chunk_index,
                    inputs.len(),
                    chunk.len()
                );

                match self
                    .translator
                    .translate_batch(&inputs, &self.source, &self.target)
                    .await
                {
                    Ok(outputs) if outputs.len() == inputs.len() => {
                        for ((i, _, trimmed), translated) in pending.into_iter().zip(outputs) {
                            if translated.trim().is_empty() {
                                warn!("Empty translation for {:?}, keeping original", chunk[i]);
                                continue;
                            }
                            if let Some(key) = trimmed {
                                self.cache.insert(&key, translated.clone()).await;
                            }
                            slots[i] = Some(Translation::Translated(translated));
                        }
                    }
                    Ok(outputs) => {
                        warn!(
                            "Chunk {} returned {} translations for {} texts, keeping originals",
                            chunk_index,
                            outputs.len(),
                            inputs.len()
                        );
                    }
                    Err(e) => {
                        warn!("Chunk {} failed, keeping originals: {}", chunk_index, e);
                    }
                }
            }

            results.extend(
                slots
                    .into_iter()
                    .zip(chunk)
                    .map(|(slot, text)| slot.unwrap_or_else(|| Translation::Fallback(text.clone()))),
            );
        }

        results
    }

    async fn cached(&self, trimmed: Option<&CacheKey>, collapsed: &CacheKey) -> Option<String> {
        if let Some(key) = trimmed
            && let Some(hit) = self.cache.get(key).await
        {
            return Some(hit);
        }
        self.cache.get(collapsed).await
    }
}
