use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Language codes following ISO 639-1 with regional variants
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lang(pub String);

impl Lang {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Default source language code
pub const DEFAULT_SOURCE_LANG: &str = "de";
/// Default target language code
pub const DEFAULT_TARGET_LANG: &str = "en";

fn default_source_lang() -> Lang {
    Lang::new(DEFAULT_SOURCE_LANG)
}

fn default_target_lang() -> Lang {
    Lang::new(DEFAULT_TARGET_LANG)
}

impl Default for Lang {
    fn default() -> Self {
        default_target_lang()
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Lang {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Lang {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// RGB color with channels in `[0, 1]`, as used by PDF fill operators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl TextColor {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub const fn black() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub const fn white() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }

    /// Decode a packed `0xRRGGBB` integer.
    ///
    /// `0` maps to black, which is also what an unset color decodes to:
    /// the extractor reports both "no color" and "explicit black" as `0`.
    pub fn from_packed(color: u32) -> Self {
        if color == 0 {
            return Self::black();
        }
        let channel = |shift: u32| f32::from(u8::try_from((color >> shift) & 0xFF).unwrap_or(0)) / 255.0;
        Self::new(channel(16), channel(8), channel(0))
    }

    /// Pack into a `0xRRGGBB` integer (channels are clamped and rounded).
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to_packed(&self) -> u32 {
        let (r, g, b) = self.to_rgb_bytes();
        (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
    }

    /// Convert to RGB bytes (0-255)
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to_rgb_bytes(&self) -> (u8, u8, u8) {
        // Values are clamped to 0.0-1.0 range, so conversion is safe
        (
            (self.r.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.g.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.b.clamp(0.0, 1.0) * 255.0).round() as u8,
        )
    }
}

impl Default for TextColor {
    fn default() -> Self {
        Self::black()
    }
}

/// Translator backend configuration for OpenAI-compatible APIs.
///
/// Supports llama.cpp, Ollama, DeepSeek, OpenAI, and any other OpenAI-compatible API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl TranslatorConfig {
    /// Create a new translator config
    pub fn new(
        api_base: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_base: api_base.into(),
            api_key,
            model: model.into(),
            ..Self::default()
        }
    }
}

fn default_api_base() -> String {
    "http://localhost:8080/v1".to_string()
}

fn default_model() -> String {
    "default_model".to_string()
}

const fn default_retry_count() -> u32 {
    3
}

const fn default_retry_delay_ms() -> u64 {
    1000
}

const fn default_timeout_secs() -> u64 {
    60
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: None,
            model: default_model(),
            retry_count: default_retry_count(),
            retry_delay_ms: default_retry_delay_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Enable memory cache
    #[serde(default = "default_true")]
    pub memory_enabled: bool,

    /// Maximum number of cached translations held in memory
    #[serde(default = "default_memory_max_entries")]
    pub memory_max_entries: u64,

    /// Memory cache TTL in seconds (0 = no expiry)
    #[serde(default)]
    pub memory_ttl_seconds: u64,

    /// Enable the persistent sled cache
    #[serde(default)]
    pub disk_enabled: bool,

    /// Disk cache directory (defaults to ~/.cache/layout-translate)
    #[serde(default)]
    pub disk_path: Option<PathBuf>,

    /// JSON cache file loaded before and saved after a run
    #[serde(default)]
    pub file: Option<PathBuf>,
}

const fn default_true() -> bool {
    true
}

const fn default_memory_max_entries() -> u64 {
    100_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_enabled: true,
            memory_max_entries: default_memory_max_entries(),
            memory_ttl_seconds: 0,
            disk_enabled: false,
            disk_path: None,
            file: None,
        }
    }
}

/// Layout adaptation settings used by the fit estimator and page rewriter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Average glyph width as a fraction of the font size
    #[serde(default = "default_char_width_factor")]
    pub char_width_factor: f32,

    /// Absolute lower bound for a shrunk font size, in points
    #[serde(default = "default_min_font_size")]
    pub min_font_size: f32,

    /// Lower bound for a shrunk font size relative to the original size
    #[serde(default = "default_min_scale")]
    pub min_scale: f32,

    /// Baseline offset below the top of the span, as a fraction of the font size
    #[serde(default = "default_baseline_factor")]
    pub baseline_factor: f32,

    /// TrueType/OpenType file whose advance widths replace the average-width heuristic
    #[serde(default)]
    pub metrics_font: Option<PathBuf>,

    /// Fill painted over redacted regions (`None` leaves the background untouched)
    #[serde(default = "default_redaction_fill")]
    pub redaction_fill: Option<TextColor>,
}

const fn default_char_width_factor() -> f32 {
    0.6
}

const fn default_min_font_size() -> f32 {
    6.0
}

const fn default_min_scale() -> f32 {
    0.7
}

const fn default_baseline_factor() -> f32 {
    0.8
}

#[allow(clippy::unnecessary_wraps)]
const fn default_redaction_fill() -> Option<TextColor> {
    Some(TextColor::white())
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            char_width_factor: default_char_width_factor(),
            min_font_size: default_min_font_size(),
            min_scale: default_min_scale(),
            baseline_factor: default_baseline_factor(),
            metrics_font: None,
            redaction_fill: default_redaction_fill(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Source language
    #[serde(default = "default_source_lang")]
    pub source_lang: Lang,

    /// Target language
    #[serde(default = "default_target_lang")]
    pub target_lang: Lang,

    /// Number of texts sent to the translator per request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Texts shorter than this (in characters, after trimming) are never translated
    #[serde(default = "default_min_text_length")]
    pub min_text_length: usize,

    /// Shrink translated runs that overflow their original box
    #[serde(default = "default_true")]
    pub preserve_formatting: bool,

    /// Translator backend configuration
    #[serde(default)]
    pub translator: TranslatorConfig,

    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Layout adaptation settings
    #[serde(default)]
    pub layout: LayoutConfig,
}

const fn default_batch_size() -> usize {
    16
}

const fn default_min_text_length() -> usize {
    2
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source_lang: default_source_lang(),
            target_lang: default_target_lang(),
            batch_size: default_batch_size(),
            min_text_length: default_min_text_length(),
            preserve_formatting: true,
            translator: TranslatorConfig::default(),
            cache: CacheConfig::default(),
            layout: LayoutConfig::default(),
        }
    }
}

/// Prefix for environment overrides, e.g. `LAYOUT_TRANSLATE__BATCH_SIZE=32`
/// or `LAYOUT_TRANSLATE__TRANSLATOR__MODEL=...`.
pub const ENV_PREFIX: &str = "LAYOUT_TRANSLATE";

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations, layered in increasing priority:
    /// `~/.config/layout-translate/config.toml`, `./config.toml`, then
    /// `LAYOUT_TRANSLATE__*` environment variables.
    ///
    /// Falls back to defaults (with a warning) when the layers are invalid.
    pub fn load() -> Self {
        match Self::load_layered() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring invalid configuration: {}", e);
                Self::default()
            }
        }
    }

    fn load_layered() -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("layout-translate").join("config.toml");
            if user_config.exists() {
                tracing::debug!("Loading config from {}", user_config.display());
            }
            builder = builder.add_source(config::File::from(user_config).required(false));
        }

        builder = builder
            .add_source(config::File::from(PathBuf::from("config.toml")).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: Self = builder
            .build()
            .and_then(config::Config::try_deserialize)
            .map_err(|e| Error::ConfigLoad(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &str, reason: &str| Error::ConfigInvalid {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        if self.batch_size == 0 {
            return Err(invalid("batch_size", "must be at least 1"));
        }
        if self.min_text_length == 0 {
            return Err(invalid("min_text_length", "must be at least 1"));
        }
        if !(self.layout.char_width_factor > 0.0) {
            return Err(invalid("layout.char_width_factor", "must be positive"));
        }
        if !(self.layout.min_scale > 0.0 && self.layout.min_scale <= 1.0) {
            return Err(invalid("layout.min_scale", "must be in (0, 1]"));
        }
        if self.layout.min_font_size < 0.0 {
            return Err(invalid("layout.min_font_size", "must not be negative"));
        }
        Ok(())
    }

    /// Cache namespace for the configured language pair (e.g. `de-en`).
    pub fn language_pair(&self) -> String {
        format!("{}-{}", self.source_lang, self.target_lang)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.source_lang.as_str(), "de");
        assert_eq!(config.target_lang.as_str(), "en");
        assert_eq!(config.batch_size, 16);
        assert_eq!(config.min_text_length, 2);
        assert!(config.preserve_formatting);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            batch_size = 4

            [translator]
            model = "opus-mt"

            [layout]
            char_width_factor = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(config.batch_size, 4);
        assert_eq!(config.translator.model, "opus-mt");
        assert_eq!(config.translator.retry_count, 3);
        assert!((config.layout.char_width_factor - 0.5).abs() < f32::EPSILON);
        assert!((config.layout.min_font_size - 6.0).abs() < f32::EPSILON);
        assert_eq!(config.layout.redaction_fill, Some(TextColor::white()));
    }

    #[test]
    fn test_validate_rejects_zero_batch_size() {
        let config = AppConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::ConfigInvalid { field, .. }) if field == "batch_size"
        ));
    }

    #[test]
    fn test_color_from_packed_green() {
        let color = TextColor::from_packed(0x00FF00);
        assert_eq!(color, TextColor::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_color_zero_is_black() {
        assert_eq!(TextColor::from_packed(0), TextColor::black());
    }

    #[test]
    fn test_color_packing_round_trip() {
        let color = TextColor::from_packed(0x12_34_56);
        assert_eq!(color.to_packed(), 0x12_34_56);
        assert_eq!(color.to_rgb_bytes(), (0x12, 0x34, 0x56));
    }

    #[test]
    fn test_language_pair() {
        assert_eq!(AppConfig::default().language_pair(), "de-en");
    }
}
