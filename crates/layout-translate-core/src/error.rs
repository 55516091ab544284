use thiserror::Error;

/// Unified error type for layout-translate-core
///
/// Only document-level failures surface through this type:
/// - PDF operations (opening, scanning, redacting, saving)
/// - Translation backend setup and requests
/// - Cache operations (initialization, reading, writing)
/// - Configuration operations (loading, validation)
/// - General I/O operations
///
/// Per-text and per-insertion failures are absorbed by the pipeline and
/// only reported through logs and `DocumentReport` counters.
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // PDF Errors
    // ==========================================================================
    /// Failed to open or parse a PDF file
    #[error("failed to open PDF: {0}")]
    PdfOpen(String),

    /// Invalid page number requested
    #[error("invalid page number {page} (document has {total} pages)")]
    PdfInvalidPage { page: usize, total: usize },

    /// Failed to scan the text structure of a page
    #[error("failed to scan page {page}: {reason}")]
    PdfScan { page: usize, reason: String },

    /// Failed to apply redactions to a page
    #[error("failed to redact page {page}: {reason}")]
    PdfRedaction { page: usize, reason: String },

    /// Failed to insert a text run on a page
    #[error("failed to insert text on page {page}: {reason}")]
    PdfInsert { page: usize, reason: String },

    /// Failed to save a PDF
    #[error("failed to save PDF: {0}")]
    PdfSave(String),

    /// Error from the lopdf library
    #[error("lopdf error: {0}")]
    Lopdf(String),

    // ==========================================================================
    // Translation Errors
    // ==========================================================================
    /// The translation backend could not be constructed
    #[error("failed to initialize translator: {0}")]
    TranslatorInit(String),

    /// Translation API request failed
    #[error("translation API request failed: {0}")]
    TranslationRequest(String),

    /// Invalid response from translation API
    #[error("invalid translation API response: {0}")]
    TranslationInvalidResponse(String),

    /// Rate limited by translation API
    #[error("translation rate limited{}", retry_after.map(|s| format!(", retry after {s} seconds")).unwrap_or_default())]
    TranslationRateLimited { retry_after: Option<u64> },

    /// Translation request timed out
    #[error("translation request timed out")]
    TranslationTimeout,

    /// Maximum retry attempts exceeded for translation
    #[error("translation failed after maximum retries")]
    TranslationMaxRetriesExceeded,

    // ==========================================================================
    // Cache Errors
    // ==========================================================================
    /// Failed to initialize the cache
    #[error("failed to initialize cache: {0}")]
    CacheInit(String),

    /// Failed to read from cache
    #[error("failed to read from cache: {0}")]
    CacheRead(String),

    /// Failed to write to cache
    #[error("failed to write to cache: {0}")]
    CacheWrite(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<lopdf::Error> for Error {
    fn from(e: lopdf::Error) -> Self {
        Self::Lopdf(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
