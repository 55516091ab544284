use async_trait::async_trait;
use crate::config::Lang;
use crate::error::Result;

/// Information about a translator backend
#[derive(Debug, Clone)]
pub struct TranslatorInfo {
    /// Human-readable name
    pub name: &'static str,
    /// Whether this translator requires an API key
    pub requires_api_key: bool,
    /// Whether `translate_batch` is served by a single request
    pub native_batching: bool,
}

/// Trait for translation backends
#[async_trait]
pub trait Translator: Send + Sync {
    /// Get information about this translator
    fn info(&self) -> TranslatorInfo;

    /// Get the translator name (convenience method)
    fn name(&self) -> &'static str {
        self.info().name
    }

    /// Translate text from source language to target language
    async fn translate(
        &self,
        text: &str,
        source: &Lang,
        target: &Lang,
    ) -> Result<String>;

    /// Translate several texts at once.
    ///
    /// Implementations must return exactly one translation per input, in
    /// input order. The default translates one text at a time and fails as
    /// soon as any of them fails.
    async fn translate_batch(
        &self,
        texts: &[String],
        source: &Lang,
        target: &Lang,
    ) -> Result<Vec<String>> {
        let mut translations = Vec::with_capacity(texts.len());
        for text in texts {
            translations.push(self.translate(text, source, target).await?);
        }
        Ok(translations)
    }
}
