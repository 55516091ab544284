//! Layout Translate Core Library
//!
//! Translates the text of PDF documents in place, keeping the layout:
//! - Text structure scanning (mupdf) and rewriting (lopdf content streams)
//! - Translation via OpenAI-compatible APIs, batched and cached
//! - Fitting translated text into the boxes of the original runs
//!
//! [`DocumentPipeline`] ties the stages together.

pub mod cache;
pub mod config;
pub mod error;
pub mod layout;
pub mod pdf;
pub mod pipeline;
pub mod task;
pub mod translator;
pub mod util;

pub use cache::{CacheKey, TranslationCache};
pub use config::{
    AppConfig, CacheConfig, DEFAULT_SOURCE_LANG, DEFAULT_TARGET_LANG, Lang, LayoutConfig, TextColor,
    TranslatorConfig,
};
pub use error::{Error, Result};
pub use layout::{
    FitEstimator, FitResult, FontResolver, LayoutExtractor, PageData, PageRewriter, TargetFont,
    TextElement,
};
pub use pdf::{BoundingBox, DocumentHandle, DocumentReader, DocumentWriter, PdfDocument, Point};
pub use pipeline::{DocumentPipeline, DocumentReport, Progress, ProgressFn};
pub use task::{TaskStatus, TranslationTask};
pub use translator::{
    BatchTranslator, OpenAiTranslator, Translation, Translator, TranslatorHandle, create_translator,
};
pub use util::clear_translation_cache;
