use serde::Serialize;

use crate::pdf::{BoundingBox, RawSpan};

/// Ascender used when a span carries none
pub const DEFAULT_ASCENDER: f32 = 0.8;
/// Descender used when a span carries none
pub const DEFAULT_DESCENDER: f32 = -0.2;

/// One styled run of text on a page, in top-left page coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextElement {
    pub text: String,
    pub bbox: BoundingBox,
    pub font: String,
    pub size: f32,
    /// Packed `0xRRGGBB`; 0 also stands for "unset"
    pub color: u32,
    /// Style bitmask, passed through from the scanner
    pub flags: u32,
    pub ascender: f32,
    pub descender: f32,
}

impl TextElement {
    /// Build an element from a scanned span.
    ///
    /// Returns `None` for whitespace-only spans and spans without a usable
    /// box or size.
    pub fn from_span(span: &RawSpan) -> Option<Self> {
        if span.text.trim().is_empty() || !span.bbox.is_valid() || !(span.size > 0.0) {
            return None;
        }
        Some(Self {
            text: span.text.clone(),
            bbox: span.bbox,
            font: span.font.clone(),
            size: span.size,
            color: span.color,
            flags: span.flags,
            ascender: span.ascender.unwrap_or(DEFAULT_ASCENDER),
            descender: span.descender.unwrap_or(DEFAULT_DESCENDER),
        })
    }

    /// Text with surrounding whitespace removed, used as translation key.
    pub fn key(&self) -> &str {
        self.text.trim()
    }
}

/// Elements of one page in structural order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageData {
    /// 0-based
    pub page_number: usize,
    /// `(width, height)` in points
    pub page_size: (f32, f32),
    pub elements: Vec<TextElement>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn span(text: &str, bbox: BoundingBox) -> RawSpan {
        RawSpan {
            text: text.to_string(),
            bbox,
            font: "Helvetica".to_string(),
            size: 11.0,
            color: 0x00_33_66,
            flags: 16,
            ascender: None,
            descender: Some(-0.25),
        }
    }

    #[test]
    fn test_from_span_defaults_metrics() {
        let element = TextElement::from_span(&span("Hallo ", BoundingBox::new(1.0, 2.0, 30.0, 14.0))).unwrap();
        assert!((element.ascender - DEFAULT_ASCENDER).abs() < f32::EPSILON);
        assert!((element.descender + 0.25).abs() < f32::EPSILON);
        assert_eq!(element.key(), "Hallo");
        assert_eq!(element.flags, 16);
        assert_eq!(element.color, 0x00_33_66);
    }

    #[test]
    fn test_from_span_rejects_blank_and_degenerate() {
        assert!(TextElement::from_span(&span("  ", BoundingBox::new(1.0, 2.0, 30.0, 14.0))).is_none());
        assert!(TextElement::from_span(&span("x", BoundingBox::new(1.0, 2.0, 1.0, 14.0))).is_none());
    }
}
