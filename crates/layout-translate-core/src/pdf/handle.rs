//! Document capabilities used by the layout layer.

use std::path::Path;

use super::geometry::{BoundingBox, Point};
use super::structure::StructuredPage;
use crate::config::TextColor;
use crate::error::Result;

/// Standard-14 fonts available for inserted text without embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardFont {
    Helvetica,
    TimesRoman,
    Courier,
}

impl StandardFont {
    /// PostScript name used as `/BaseFont`.
    pub const fn base_font(self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::TimesRoman => "Times-Roman",
            Self::Courier => "Courier",
        }
    }

    /// Name under which the font is registered in page resources.
    pub const fn resource_name(self) -> &'static str {
        match self {
            Self::Helvetica => "LTHelv",
            Self::TimesRoman => "LTTiRo",
            Self::Courier => "LTCour",
        }
    }
}

/// Read access to page geometry and text structure.
pub trait DocumentReader {
    fn page_count(&self) -> usize;

    /// Page `(width, height)` in points.
    fn page_size(&self, page: usize) -> Result<(f32, f32)>;

    /// Text structure of a page in top-left coordinates.
    fn scan_page(&self, page: usize) -> Result<StructuredPage>;
}

/// Page edits. Redactions are queued with [`redact`](Self::redact) and
/// take effect on [`apply_redactions`](Self::apply_redactions); inserted text
/// is drawn above everything else once the document is saved.
pub trait DocumentWriter {
    fn redact(&mut self, page: usize, region: BoundingBox) -> Result<()>;

    /// Apply every queued redaction of a page, returning the number of
    /// glyphs removed.
    fn apply_redactions(&mut self, page: usize) -> Result<usize>;

    /// Draw `text` with its baseline starting at `point` (top-left coordinates).
    fn insert_text(
        &mut self,
        page: usize,
        point: Point,
        text: &str,
        font: StandardFont,
        size: f32,
        color: TextColor,
    ) -> Result<()>;

    fn save(&mut self, path: &Path) -> Result<()>;
}

/// A document that can be both read and rewritten.
pub trait DocumentHandle: DocumentReader + DocumentWriter {}

impl<T: DocumentReader + DocumentWriter> DocumentHandle for T {}
