//! Integration tests for layout-translate-core
//!
//! These build small PDFs with lopdf, run them through the whole pipeline
//! with a mock translator and read the written files back.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use layout_translate_core::config::CacheConfig;
use layout_translate_core::translator::TranslatorInfo;
use layout_translate_core::{
    AppConfig, DocumentPipeline, DocumentReader, Error, Lang, PdfDocument, Progress, ProgressFn,
    Result, TranslationCache, Translator,
};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream};

// =============================================================================
// Test Fixtures
// =============================================================================

/// Mock translator backed by a small German-English dictionary
struct MockTranslator {
    should_fail: bool,
    calls: AtomicUsize,
}

impl MockTranslator {
    fn new() -> Self {
        Self {
            should_fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    fn failing() -> Self {
        Self {
            should_fail: true,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Translator for MockTranslator {
    fn info(&self) -> TranslatorInfo {
        TranslatorInfo {
            name: "mock",
            requires_api_key: false,
            native_batching: false,
        }
    }

    async fn translate(&self, text: &str, _source: &Lang, _target: &Lang) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(Error::TranslationRequest("Mock translation failure".to_string()));
        }
        Ok(match text {
            "Hallo Welt" => "Hello world".to_string(),
            "Seite eins" => "Page one".to_string(),
            other => format!("[EN] {other}"),
        })
    }
}

/// One-page letter-sized PDF with a Helvetica line of text per entry,
/// each starting at x = 72 on the given baseline.
fn create_test_pdf(lines: &[(&str, i64)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
    ]));
    let resources = Dictionary::from_iter([(
        "Font",
        Object::Dictionary(Dictionary::from_iter([("F1", Object::Reference(font_id))])),
    )]);

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 12.into()]),
    ];
    for (text, y) in lines {
        operations.push(Operation::new(
            "Tm",
            vec![1.into(), 0.into(), 0.into(), 1.into(), 72.into(), (*y).into()],
        ));
        operations.push(Operation::new("Tj", vec![Object::string_literal(*text)]));
    }
    operations.push(Operation::new("ET", vec![]));
    let content = Content { operations }.encode().unwrap();
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

    let page_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Page".to_vec())),
        ("Parent", Object::Reference(pages_id)),
        ("Contents", Object::Reference(content_id)),
        ("Resources", Object::Dictionary(resources)),
        ("MediaBox", Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()])),
    ]));
    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(vec![Object::Reference(page_id)])),
            ("Count", Object::Integer(1)),
        ])),
    );
    let catalog_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut output = Vec::new();
    doc.save_to(&mut output).unwrap();
    output
}

fn write_test_pdf(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("input.pdf");
    std::fs::write(&path, create_test_pdf(&[("Hallo Welt", 700), ("Seite eins", 650)])).unwrap();
    path
}

fn page_texts(path: &Path) -> Vec<String> {
    let doc = PdfDocument::open(path).expect("output should be a readable PDF");
    doc.scan_page(0)
        .unwrap()
        .spans()
        .map(|span| span.text.clone())
        .collect()
}

fn pipeline(translator: Arc<MockTranslator>) -> DocumentPipeline {
    DocumentPipeline::new(AppConfig::default())
        .unwrap()
        .with_translator(translator)
        .with_cache(Arc::new(TranslationCache::in_memory()))
}

// =============================================================================
// Pipeline Tests
// =============================================================================

#[tokio::test]
async fn test_translated_text_replaces_original() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_test_pdf(dir.path());
    let output = dir.path().join("out").join("translated.pdf");

    let report = pipeline(Arc::new(MockTranslator::new()))
        .translate_file(&input, &output, None)
        .await
        .unwrap();

    assert_eq!(report.pages, 1);
    assert_eq!(report.unique_texts, 2);
    assert_eq!(report.translated, 2);
    assert_eq!(report.replacements, 2);
    assert_eq!(report.insertion_failures, 0);
    assert!(report.glyphs_removed >= 18, "removed {}", report.glyphs_removed);

    let texts = page_texts(&output);
    assert!(texts.contains(&"Hello world".to_string()), "got {texts:?}");
    assert!(texts.contains(&"Page one".to_string()), "got {texts:?}");
    assert!(!texts.iter().any(|t| t.contains("Hallo")), "got {texts:?}");
}

#[tokio::test]
async fn test_translation_keeps_position() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_test_pdf(dir.path());
    let output = dir.path().join("translated.pdf");

    pipeline(Arc::new(MockTranslator::new()))
        .translate_file(&input, &output, None)
        .await
        .unwrap();

    let before = PdfDocument::open(&input).unwrap().scan_page(0).unwrap();
    let after = PdfDocument::open(&output).unwrap().scan_page(0).unwrap();
    let original = before.spans().find(|s| s.text == "Hallo Welt").unwrap();
    let translated = after.spans().find(|s| s.text == "Hello world").unwrap();

    assert!((translated.bbox.x0 - original.bbox.x0).abs() < 0.5);
    assert!((translated.bbox.y0 - original.bbox.y0).abs() < 3.0);
    assert!(translated.size <= original.size);
}

#[tokio::test]
async fn test_failing_translator_keeps_originals() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_test_pdf(dir.path());
    let output = dir.path().join("translated.pdf");

    let report = pipeline(Arc::new(MockTranslator::failing()))
        .translate_file(&input, &output, None)
        .await
        .expect("translation failures must not fail the document");

    assert_eq!(report.fallback, 2);
    assert_eq!(report.replacements, 0);
    assert_eq!(page_texts(&output), ["Hallo Welt", "Seite eins"]);
}

#[tokio::test]
async fn test_missing_input_fails() {
    let dir = tempfile::tempdir().unwrap();
    let result = pipeline(Arc::new(MockTranslator::new()))
        .translate_file(&dir.path().join("missing.pdf"), &dir.path().join("out.pdf"), None)
        .await;

    assert!(matches!(result, Err(Error::PdfOpen(_))));
    assert!(!dir.path().join("out.pdf").exists());
}

#[tokio::test]
async fn test_progress_callback_borrows_local_state() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_test_pdf(dir.path());
    let output = dir.path().join("translated.pdf");

    // Not 'static: the callback only lives for the call
    let events = std::sync::Mutex::new(Vec::new());
    let on_progress = |progress: Progress| events.lock().unwrap().push(progress);

    pipeline(Arc::new(MockTranslator::new()))
        .translate_file(&input, &output, Some(&on_progress as &ProgressFn<'_>))
        .await
        .unwrap();

    let events = events.into_inner().unwrap();
    assert!(matches!(events.first(), Some(Progress::Extracted { pages: 1, .. })));
    assert!(events.contains(&Progress::PageDone { page: 0, total: 1 }), "got {events:?}");
    assert!(matches!(events.last(), Some(Progress::Saved)));
}

// =============================================================================
// Cache Tests
// =============================================================================

#[tokio::test]
async fn test_second_run_is_served_from_cache() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_test_pdf(dir.path());
    let translator = Arc::new(MockTranslator::new());
    let pipeline = pipeline(Arc::clone(&translator));

    pipeline
        .translate_file(&input, &dir.path().join("a.pdf"), None)
        .await
        .unwrap();
    let calls = translator.calls.load(Ordering::SeqCst);

    let report = pipeline
        .translate_file(&input, &dir.path().join("b.pdf"), None)
        .await
        .unwrap();

    assert_eq!(translator.calls.load(Ordering::SeqCst), calls);
    assert_eq!(report.cached, 2);
    assert_eq!(report.translated, 0);
    assert_eq!(page_texts(&dir.path().join("b.pdf")).len(), 2);
}

#[tokio::test]
async fn test_cache_file_survives_between_runs() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_test_pdf(dir.path());
    let cache_file = dir.path().join("cache.json");
    let config = AppConfig {
        cache: CacheConfig {
            file: Some(cache_file.clone()),
            ..CacheConfig::default()
        },
        ..AppConfig::default()
    };

    DocumentPipeline::new(config.clone())
        .unwrap()
        .with_translator(Arc::new(MockTranslator::new()))
        .translate_file(&input, &dir.path().join("first.pdf"), None)
        .await
        .unwrap();

    let saved: BTreeMap<String, String> =
        serde_json::from_str(&std::fs::read_to_string(&cache_file).unwrap()).unwrap();
    assert_eq!(saved.get("Hallo Welt").map(String::as_str), Some("Hello world"));
    assert_eq!(saved.get("Seite eins").map(String::as_str), Some("Page one"));

    // A fresh pipeline whose backend is down still translates from the file.
    let failing = Arc::new(MockTranslator::failing());
    let report = DocumentPipeline::new(config)
        .unwrap()
        .with_translator(Arc::clone(&failing) as Arc<dyn Translator>)
        .translate_file(&input, &dir.path().join("second.pdf"), None)
        .await
        .unwrap();

    assert_eq!(failing.calls.load(Ordering::SeqCst), 0);
    assert_eq!(report.cached, 2);
    assert!(page_texts(&dir.path().join("second.pdf")).contains(&"Page one".to_string()));
}

// =============================================================================
// Document Tests
// =============================================================================

#[test]
fn test_scan_reads_fixture() {
    let doc = PdfDocument::from_bytes(&create_test_pdf(&[("Bericht 2024", 700)])).unwrap();
    assert_eq!(doc.page_count(), 1);
    assert_eq!(doc.page_size(0).unwrap(), (612.0, 792.0));

    let page = doc.scan_page(0).unwrap();
    let span = page.spans().next().unwrap();
    assert_eq!(span.text, "Bericht 2024");
    assert!(span.font.contains("Helvetica"), "font {}", span.font);
    assert!((span.size - 12.0).abs() < 1e-3);
}

#[test]
fn test_invalid_pdf_bytes() {
    assert!(matches!(PdfDocument::from_bytes(&[0, 1, 2, 3]), Err(Error::PdfOpen(_))));
    assert!(PdfDocument::from_bytes(&[]).is_err());
}

#[test]
fn test_invalid_page_number() {
    let doc = PdfDocument::from_bytes(&create_test_pdf(&[("Text", 700)])).unwrap();
    assert!(matches!(
        doc.scan_page(5),
        Err(Error::PdfInvalidPage { page: 5, total: 1 })
    ));
}
