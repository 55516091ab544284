//! Estimating how a translated text fits the box of the original.
//!
//! Widths come from a [`TextMeasure`]. [`AverageCharWidth`] assumes every
//! character is `factor × font_size` wide; [`GlyphMetrics`] uses the real
//! advance widths of a TrueType/OpenType font.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use ttf_parser::Face;

use crate::config::LayoutConfig;
use crate::error::{Error, Result};

/// Width of a text run in points.
pub trait TextMeasure: Send + Sync {
    fn text_width(&self, text: &str, font_size: f32) -> f32;
}

/// Every character is `factor × font_size` wide.
#[derive(Debug, Clone, Copy)]
pub struct AverageCharWidth {
    pub factor: f32,
}

impl Default for AverageCharWidth {
    fn default() -> Self {
        Self { factor: 0.6 }
    }
}

impl TextMeasure for AverageCharWidth {
    #[allow(clippy::cast_precision_loss)]
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        text.chars().count() as f32 * font_size * self.factor
    }
}

/// Advance widths read from a font file, as fractions of the em.
#[derive(Debug, Clone)]
pub struct GlyphMetrics {
    widths: HashMap<char, f32>,
    /// Used for characters the font has no glyph for
    fallback: f32,
}

/// Character ranges whose advances are read from the font
const MEASURED_RANGES: &[(u32, u32)] = &[
    (0x0020, 0x007F), // Basic Latin
    (0x00A0, 0x00FF), // Latin-1 Supplement
    (0x0100, 0x017F), // Latin Extended-A
    (0x0180, 0x024F), // Latin Extended-B
    (0x2000, 0x206F), // General Punctuation
    (0x20AC, 0x20AC), // Euro sign
];

impl GlyphMetrics {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| Error::ConfigInvalid {
            field: "layout.metrics_font".to_string(),
            reason: format!("Failed to read {}: {e}", path.display()),
        })?;
        Self::from_bytes(&data)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let face = Face::parse(data, 0).map_err(|e| Error::ConfigInvalid {
            field: "layout.metrics_font".to_string(),
            reason: format!("Failed to parse font: {e}"),
        })?;
        let units_per_em = f32::from(face.units_per_em());

        let mut widths = HashMap::new();
        for &(start, end) in MEASURED_RANGES {
            for c in (start..=end).filter_map(char::from_u32) {
                if let Some(advance) = face
                    .glyph_index(c)
                    .and_then(|gid| face.glyph_hor_advance(gid))
                {
                    widths.insert(c, f32::from(advance) / units_per_em);
                }
            }
        }

        Ok(Self::from_widths(widths))
    }

    /// Build from a character → em-fraction map. The fallback width is the
    /// mean of the lowercase Latin letters present, else 0.5 em.
    pub fn from_widths(widths: HashMap<char, f32>) -> Self {
        let lowercase: Vec<f32> = ('a'..='z').filter_map(|c| widths.get(&c).copied()).collect();
        #[allow(clippy::cast_precision_loss)]
        let fallback = if lowercase.is_empty() {
            0.5
        } else {
            lowercase.iter().sum::<f32>() / lowercase.len() as f32
        };
        Self { widths, fallback }
    }
}

impl TextMeasure for GlyphMetrics {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        text.chars()
            .map(|c| self.widths.get(&c).copied().unwrap_or(self.fallback))
            .sum::<f32>()
            * font_size
    }
}

/// Lower bounds for shrinking: never below `min_font_size` points nor
/// below `min_scale` of the original size (whichever is larger), and never
/// above the original size.
#[derive(Debug, Clone, Copy)]
pub struct FitPolicy {
    pub min_font_size: f32,
    pub min_scale: f32,
}

impl Default for FitPolicy {
    fn default() -> Self {
        Self {
            min_font_size: 6.0,
            min_scale: 0.7,
        }
    }
}

impl FitPolicy {
    pub fn floor(&self, font_size: f32) -> f32 {
        self.min_font_size.max(font_size * self.min_scale).min(font_size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FitResult {
    /// Translated width fits the available width before any shrinking
    pub fits: bool,
    pub scale_factor: f32,
    pub adjusted_font_size: f32,
    pub original_width: f32,
    pub translated_width: f32,
    pub available_width: f32,
}

/// Compares original and translated widths against the original box.
pub struct FitEstimator {
    measure: Box<dyn TextMeasure>,
    policy: FitPolicy,
}

impl Default for FitEstimator {
    fn default() -> Self {
        Self::new(Box::new(AverageCharWidth::default()), FitPolicy::default())
    }
}

impl FitEstimator {
    pub fn new(measure: Box<dyn TextMeasure>, policy: FitPolicy) -> Self {
        Self { measure, policy }
    }

    /// Build from layout settings, loading the metrics font when configured.
    pub fn from_config(config: &LayoutConfig) -> Result<Self> {
        let measure: Box<dyn TextMeasure> = match &config.metrics_font {
            Some(path) => Box::new(GlyphMetrics::from_file(path)?),
            None => Box::new(AverageCharWidth {
                factor: config.char_width_factor,
            }),
        };
        Ok(Self::new(
            measure,
            FitPolicy {
                min_font_size: config.min_font_size,
                min_scale: config.min_scale,
            },
        ))
    }

    /// Estimate the fit of `translated` in a box `available_width` wide that
    /// held `original` at `font_size`. Never fails.
    pub fn estimate(&self, original: &str, translated: &str, available_width: f32, font_size: f32) -> FitResult {
        let original_width = self.measure.text_width(original, font_size);
        let translated_width = self.measure.text_width(translated, font_size);
        let fits = translated_width <= available_width;

        let (scale_factor, adjusted_font_size) =
            if translated_width > available_width && available_width > 0.0 && font_size > 0.0 {
                let scale = available_width / translated_width;
                let floor = self.policy.floor(font_size);
                let adjusted = font_size * scale;
                if adjusted < floor {
                    (floor / font_size, floor)
                } else {
                    (scale, adjusted)
                }
            } else {
                (1.0, font_size)
            };

        FitResult {
            fits,
            scale_factor,
            adjusted_font_size,
            original_width,
            translated_width,
            available_width,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_overflow_is_floored() {
        let fit = FitEstimator::default().estimate("Hallo", "Hello there everyone", 100.0, 12.0);

        assert!(!fit.fits);
        assert!(approx(fit.translated_width, 144.0));
        assert!(approx(fit.original_width, 36.0));
        // 100 / 144 would give 8.33, below the 8.4 floor
        assert!(approx(fit.adjusted_font_size, 8.4));
        assert!(approx(fit.scale_factor, 0.7));
    }

    #[test]
    fn test_moderate_overflow_scales_proportionally() {
        let fit = FitEstimator::default().estimate("abc", "abcdefghij", 60.0, 12.0);
        // 10 chars * 7.2 = 72 > 60
        assert!(approx(fit.scale_factor, 60.0 / 72.0));
        assert!(approx(fit.adjusted_font_size, 10.0));
    }

    #[test]
    fn test_fitting_text_is_untouched() {
        let fit = FitEstimator::default().estimate("Haus", "House", 100.0, 12.0);
        assert!(fit.fits);
        assert!(approx(fit.scale_factor, 1.0));
        assert!(approx(fit.adjusted_font_size, 12.0));
    }

    #[test]
    fn test_zero_width_box_is_untouched() {
        let fit = FitEstimator::default().estimate("a", "abc", 0.0, 12.0);
        assert!(!fit.fits);
        assert!(approx(fit.adjusted_font_size, 12.0));
    }

    #[test]
    fn test_small_fonts_never_grow() {
        // Floor max(6, 3.5) would exceed the original 5pt
        let fit = FitEstimator::default().estimate("a", "a much longer text", 10.0, 5.0);
        assert!(fit.adjusted_font_size <= 5.0);
        assert!(approx(fit.scale_factor, 1.0));
    }

    #[test]
    fn test_scale_stays_in_range() {
        let estimator = FitEstimator::default();
        for len in 1..60 {
            let translated = "x".repeat(len);
            for size in [4.0, 8.0, 12.0, 24.0] {
                let fit = estimator.estimate("x", &translated, 50.0, size);
                assert!(fit.scale_factor > 0.0 && fit.scale_factor <= 1.0);
                assert!(fit.adjusted_font_size <= size);
            }
        }
    }

    #[test]
    fn test_longer_text_never_grows() {
        let estimator = FitEstimator::default();
        let mut previous = f32::MAX;
        for len in 1..40 {
            let fit = estimator.estimate("x", &"y".repeat(len), 80.0, 12.0);
            assert!(fit.adjusted_font_size <= previous);
            previous = fit.adjusted_font_size;
        }
    }

    #[test]
    fn test_configured_factor() {
        let config = LayoutConfig {
            char_width_factor: 0.5,
            ..LayoutConfig::default()
        };
        let fit = FitEstimator::from_config(&config).unwrap().estimate("ab", "abcd", 100.0, 10.0);
        assert!(approx(fit.translated_width, 20.0));
    }

    #[test]
    fn test_glyph_metrics_widths() {
        let metrics = GlyphMetrics::from_widths(HashMap::from([('i', 0.25), ('m', 0.75), (' ', 0.3)]));
        assert!(approx(metrics.text_width("mi", 10.0), 10.0));
        // Unknown characters use the lowercase mean
        assert!(approx(metrics.text_width("Q", 10.0), 5.0));
    }

    #[test]
    fn test_glyph_metrics_rejects_garbage() {
        assert!(matches!(
            GlyphMetrics::from_bytes(b"definitely not a font"),
            Err(Error::ConfigInvalid { .. })
        ));
        assert!(GlyphMetrics::from_file("/nonexistent/font.ttf").is_err());
    }
}
