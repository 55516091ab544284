//! End-to-end document translation.
//!
//! Stages run strictly one after another for a document:
//! extract → collect distinct texts → batch translate → rewrite pages → save.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::cache::TranslationCache;
use crate::config::AppConfig;
use crate::error::Result;
use crate::layout::{LayoutExtractor, PageData, PageRewriter};
use crate::pdf::{DocumentHandle, PdfDocument};
use crate::translator::{BatchTranslator, Translation, Translator, TranslatorHandle};

/// Events reported while a document is processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Extracted { pages: usize, elements: usize },
    Translated { unique_texts: usize },
    PageDone { page: usize, total: usize },
    Saved,
}

/// Progress callback. Called on the task driving the pipeline; it may borrow
/// from the caller for the duration of the run.
pub type ProgressFn<'a> = dyn Fn(Progress) + Send + Sync + 'a;

/// Counters describing a finished document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentReport {
    pub pages: usize,
    pub elements: usize,
    pub unique_texts: usize,
    pub translated: usize,
    pub cached: usize,
    pub fallback: usize,
    pub replacements: usize,
    pub glyphs_removed: usize,
    pub insertion_failures: usize,
}

pub struct DocumentPipeline {
    config: AppConfig,
    translator: Arc<TranslatorHandle>,
    cache: Arc<TranslationCache>,
    extractor: LayoutExtractor,
    rewriter: PageRewriter,
}

impl DocumentPipeline {
    /// Build a pipeline whose translator is created on first use from
    /// `config.translator`.
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;
        let cache = TranslationCache::new(&config.cache, &config.language_pair())?;
        let rewriter = PageRewriter::from_config(&config)?;

        Ok(Self {
            translator: Arc::new(TranslatorHandle::lazy(config.translator.clone())),
            cache: Arc::new(cache),
            extractor: LayoutExtractor::new(),
            rewriter,
            config,
        })
    }

    /// Use an already constructed translator.
    #[must_use]
    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = Arc::new(TranslatorHandle::ready(translator));
        self
    }

    /// Share a translator handle with other pipelines.
    #[must_use]
    pub fn with_translator_handle(mut self, handle: Arc<TranslatorHandle>) -> Self {
        self.translator = handle;
        self
    }

    /// Share a cache with other pipelines.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<TranslationCache>) -> Self {
        self.cache = cache;
        self
    }

    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    pub const fn cache(&self) -> &Arc<TranslationCache> {
        &self.cache
    }

    /// Translate `input` into `output`, creating the output directory.
    ///
    /// When `cache.file` is configured it is merged into the cache before the
    /// run and rewritten after a successful run; failures there only warn.
    pub async fn translate_file(
        &self,
        input: &Path,
        output: &Path,
        progress: Option<&ProgressFn<'_>>,
    ) -> Result<DocumentReport> {
        if let Some(file) = &self.config.cache.file
            && let Err(e) = self.cache.load_file(file).await
        {
            warn!("Could not load cache file {}: {}", file.display(), e);
        }

        let mut doc = PdfDocument::open(input)?.with_redaction_fill(self.config.layout.redaction_fill);
        if let Some(title) = &doc.metadata().title {
            info!("Translating \"{}\"", title);
        }
        if let Some(parent) = output.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let report = self.translate_document(&mut doc, output, progress).await?;

        if let Some(file) = &self.config.cache.file
            && let Err(e) = self.cache.save_file(file)
        {
            warn!("Could not save cache file {}: {}", file.display(), e);
        }
        Ok(report)
    }

    /// Run every stage on an open document and save it to `output`.
    pub async fn translate_document<D: DocumentHandle + ?Sized>(
        &self,
        doc: &mut D,
        output: &Path,
        progress: Option<&ProgressFn<'_>>,
    ) -> Result<DocumentReport> {
        let report_progress = |event: Progress| {
            if let Some(callback) = progress {
                callback(event);
            }
        };

        let pages = self.extractor.extract(&*doc)?;
        let mut report = DocumentReport {
            pages: pages.len(),
            elements: pages.iter().map(|p| p.elements.len()).sum(),
            ..DocumentReport::default()
        };
        report_progress(Progress::Extracted {
            pages: report.pages,
            elements: report.elements,
        });

        let texts = self.unique_texts(&pages);
        report.unique_texts = texts.len();
        info!("{} distinct texts to translate", texts.len());

        let translations = self.translate_texts(&texts, &mut report).await?;
        report_progress(Progress::Translated {
            unique_texts: report.unique_texts,
        });

        let total = pages.len();
        for page in &pages {
            let outcome = self.rewriter.rewrite_page(doc, page, &translations)?;
            report.replacements += outcome.replacements;
            report.glyphs_removed += outcome.glyphs_removed;
            report.insertion_failures += outcome.insertion_failures;
            report_progress(Progress::PageDone {
                page: page.page_number,
                total,
            });
        }

        doc.save(output)?;
        report_progress(Progress::Saved);
        info!(
            "Wrote {}: {} replacements ({} translated, {} cached, {} kept)",
            output.display(),
            report.replacements,
            report.translated,
            report.cached,
            report.fallback
        );

        Ok(report)
    }

    /// Distinct trimmed texts long enough to translate, in first-seen order.
    fn unique_texts(&self, pages: &[PageData]) -> Vec<String> {
        let mut seen = HashSet::new();
        pages
            .iter()
            .flat_map(|p| &p.elements)
            .map(|e| e.key())
            .filter(|key| key.chars().count() >= self.config.min_text_length)
            .filter(|key| seen.insert(*key))
            .map(str::to_string)
            .collect()
    }

    async fn translate_texts(
        &self,
        texts: &[String],
        report: &mut DocumentReport,
    ) -> Result<HashMap<String, String>> {
        if texts.is_empty() {
            return Ok(HashMap::new());
        }

        let translator = self.translator.get().await?;
        let batch = BatchTranslator::new(
            translator,
            Arc::clone(&self.cache),
            self.config.source_lang.clone(),
            self.config.target_lang.clone(),
            self.config.min_text_length,
        );
        let results = batch.translate_batch(texts, self.config.batch_size).await;

        let mut translations = HashMap::with_capacity(texts.len());
        for (text, result) in texts.iter().zip(results) {
            match result {
                Translation::Translated(t) => {
                    report.translated += 1;
                    translations.insert(text.clone(), t);
                }
                Translation::Cached(t) => {
                    report.cached += 1;
                    translations.insert(text.clone(), t);
                }
                Translation::Fallback(_) => report.fallback += 1,
                Translation::Skipped(_) => {}
            }
        }
        Ok(translations)
    }
}
