//! Structural text model: blocks of lines of styled spans.
//!
//! mupdf reports blocks, lines and characters. A line is cut into spans
//! wherever the character size changes; whitespace at either end of a span
//! is dropped.

use serde::Serialize;

use super::geometry::BoundingBox;

/// Style bit: italic or oblique
pub const STYLE_ITALIC: u32 = 2;
/// Style bit: serif face
pub const STYLE_SERIF: u32 = 4;
/// Style bit: monospaced face
pub const STYLE_MONOSPACE: u32 = 8;
/// Style bit: bold weight
pub const STYLE_BOLD: u32 = 16;

/// A run of uniformly styled text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawSpan {
    pub text: String,
    pub bbox: BoundingBox,
    pub font: String,
    pub size: f32,
    pub color: u32,
    pub flags: u32,
    pub ascender: Option<f32>,
    pub descender: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    pub bbox: BoundingBox,
    pub spans: Vec<RawSpan>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub bbox: BoundingBox,
    pub lines: Vec<Line>,
}

/// Text structure of one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredPage {
    pub width: f32,
    pub height: f32,
    pub blocks: Vec<Block>,
}

impl StructuredPage {
    pub fn spans(&self) -> impl Iterator<Item = &RawSpan> {
        self.blocks
            .iter()
            .flat_map(|b| &b.lines)
            .flat_map(|l| &l.spans)
    }
}

/// One character of a scanned line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScannedChar {
    pub c: char,
    /// Top-left page coordinates
    pub bbox: BoundingBox,
    pub size: f32,
    /// Height above the baseline, as a fraction of `size`
    pub ascender: f32,
    /// Depth below the baseline, as a negative fraction of `size`
    pub descender: f32,
}

/// Font attributes shared by a scanned line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineStyle {
    pub font: String,
    pub flags: u32,
}

impl LineStyle {
    /// Style bits from the family, weight and style names mupdf reports.
    pub fn from_names(font: &str, family: &str, weight: &str, style: &str) -> Self {
        let mut flags = 0;
        if style == "italic" {
            flags |= STYLE_ITALIC;
        }
        match family {
            "serif" => flags |= STYLE_SERIF,
            "monospace" => flags |= STYLE_MONOSPACE,
            _ => {}
        }
        if weight == "bold" {
            flags |= STYLE_BOLD;
        }
        Self {
            font: strip_subset_tag(font).to_string(),
            flags,
        }
    }
}

/// Remove a `ABCDEF+` subset prefix from a font name.
pub fn strip_subset_tag(name: &str) -> &str {
    match name.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.chars().all(|c| c.is_ascii_uppercase()) => rest,
        _ => name,
    }
}

impl Line {
    /// Build a line from its characters; `None` when it holds only whitespace.
    pub fn from_chars(chars: &[ScannedChar], style: &LineStyle) -> Option<Self> {
        let mut spans = Vec::new();
        let mut start = 0;
        for i in 1..=chars.len() {
            let split = i == chars.len() || (chars[i].size - chars[start].size).abs() > chars[start].size * 0.01;
            if split {
                spans.extend(span_of(&chars[start..i], style));
                start = i;
            }
        }

        let bbox = spans
            .iter()
            .map(|s: &RawSpan| s.bbox)
            .reduce(|a, b| a.union(&b))?;
        Some(Self { bbox, spans })
    }
}

impl Block {
    /// Group lines into a block; `None` when no line carries text.
    pub fn from_lines(lines: Vec<Line>) -> Option<Self> {
        let bbox = lines.iter().map(|l| l.bbox).reduce(|a, b| a.union(&b))?;
        Some(Self { bbox, lines })
    }
}

fn span_of(chars: &[ScannedChar], style: &LineStyle) -> Option<RawSpan> {
    let first = chars.iter().position(|c| !c.c.is_whitespace())?;
    let last = chars.iter().rposition(|c| !c.c.is_whitespace())?;
    let chars = &chars[first..=last];

    let text: String = chars.iter().map(|c| c.c).collect();
    let bbox = chars
        .iter()
        .filter(|c| !c.c.is_whitespace())
        .map(|c| c.bbox)
        .reduce(|a, b| a.union(&b))?;
    let lead = chars[0];

    Some(RawSpan {
        text,
        bbox,
        font: style.font.clone(),
        size: lead.size,
        // No colour in the scan; 0 reads as black
        color: 0,
        flags: style.flags,
        ascender: Some(lead.ascender).filter(|a| a.is_finite() && *a > 0.0),
        descender: Some(lead.descender).filter(|d| d.is_finite() && *d < 0.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Characters of a 10pt font, 6pt advance, laid out from `x` on `baseline`.
    fn word(text: &str, x: f32, baseline: f32, size: f32) -> Vec<ScannedChar> {
        text.chars()
            .enumerate()
            .map(|(i, c)| {
                #[allow(clippy::cast_precision_loss)]
                let x0 = x + i as f32 * 6.0;
                ScannedChar {
                    c,
                    bbox: BoundingBox::new(x0, baseline - 0.8 * size, x0 + 6.0, baseline + 0.2 * size),
                    size,
                    ascender: 0.8,
                    descender: -0.2,
                }
            })
            .collect()
    }

    fn courier() -> LineStyle {
        LineStyle::from_names("Courier", "monospace", "normal", "normal")
    }

    #[test]
    fn test_spaces_at_ends_are_trimmed() {
        let line = Line::from_chars(&word(" Guten Tag ", 100.0, 50.0, 10.0), &courier()).unwrap();

        assert_eq!(line.spans.len(), 1);
        let span = &line.spans[0];
        assert_eq!(span.text, "Guten Tag");
        assert!((span.bbox.x0 - 106.0).abs() < 1e-3);
        assert!((span.bbox.x1 - 160.0).abs() < 1e-3);
        assert_eq!(span.flags, STYLE_MONOSPACE);
        assert_eq!(span.ascender, Some(0.8));
    }

    #[test]
    fn test_size_change_splits_span_not_line() {
        let mut chars = word("Titel ", 100.0, 50.0, 10.0);
        chars.extend(word("klein", 136.0, 50.0, 7.0));
        let line = Line::from_chars(&chars, &courier()).unwrap();

        let texts: Vec<_> = line.spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, ["Titel", "klein"]);
        assert!((line.spans[1].size - 7.0).abs() < f32::EPSILON);
        assert!((line.bbox.x1 - 166.0).abs() < 1e-3);
    }

    #[test]
    fn test_whitespace_line_is_dropped() {
        assert!(Line::from_chars(&word("   ", 0.0, 10.0, 10.0), &courier()).is_none());
        assert!(Line::from_chars(&[], &courier()).is_none());
        assert!(Block::from_lines(Vec::new()).is_none());
    }

    #[test]
    fn test_block_box_covers_lines() {
        let first = Line::from_chars(&word("Erste", 50.0, 100.0, 10.0), &courier()).unwrap();
        let second = Line::from_chars(&word("Zweite", 50.0, 112.0, 10.0), &courier()).unwrap();
        let block = Block::from_lines(vec![first, second]).unwrap();

        assert!((block.bbox.y0 - 92.0).abs() < 1e-3);
        assert!((block.bbox.y1 - 114.0).abs() < 1e-3);
        let page = StructuredPage { width: 600.0, height: 800.0, blocks: vec![block] };
        assert_eq!(page.spans().count(), 2);
    }

    #[test]
    fn test_style_names_to_flags() {
        let style = LineStyle::from_names("ABCDEF+Times-BoldItalic", "serif", "bold", "italic");
        assert_eq!(style.font, "Times-BoldItalic");
        assert_eq!(style.flags, STYLE_ITALIC | STYLE_SERIF | STYLE_BOLD);
        assert_eq!(LineStyle::from_names("Helvetica", "sans-serif", "normal", "normal").flags, 0);
    }

    #[test]
    fn test_strip_subset_tag() {
        assert_eq!(strip_subset_tag("ABCDEF+Arial-BoldMT"), "Arial-BoldMT");
        assert_eq!(strip_subset_tag("Helvetica"), "Helvetica");
        assert_eq!(strip_subset_tag("abc+Foo"), "abc+Foo");
    }
}
