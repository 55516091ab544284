use tracing::{debug, info};

use super::element::{PageData, TextElement};
use crate::error::Result;
use crate::pdf::DocumentReader;

/// Turns scanned page structure into [`PageData`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LayoutExtractor;

impl LayoutExtractor {
    pub const fn new() -> Self {
        Self
    }

    /// Extract one page. Elements keep the structural order of the scan.
    pub fn extract_page<D: DocumentReader + ?Sized>(&self, doc: &D, page: usize) -> Result<PageData> {
        let page_size = doc.page_size(page)?;
        let structure = doc.scan_page(page)?;
        let elements: Vec<TextElement> = structure.spans().filter_map(TextElement::from_span).collect();
        debug!("Page {}: {} text elements", page, elements.len());

        Ok(PageData {
            page_number: page,
            page_size,
            elements,
        })
    }

    /// Extract every page. The first failing page aborts the extraction.
    pub fn extract<D: DocumentReader + ?Sized>(&self, doc: &D) -> Result<Vec<PageData>> {
        let pages = (0..doc.page_count())
            .map(|page| self.extract_page(doc, page))
            .collect::<Result<Vec<_>>>()?;
        info!(
            "Extracted {} elements from {} pages",
            pages.iter().map(|p| p.elements.len()).sum::<usize>(),
            pages.len()
        );
        Ok(pages)
    }
}
