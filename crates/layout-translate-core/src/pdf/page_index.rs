//! Page index newtype for safe conversion between 0-based page numbers,
//! mupdf's `i32` page numbers and lopdf's 1-based page map.

use std::fmt;

use crate::error::Error;

/// A 0-based page index validated against a document's page count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageIndex(usize);

impl PageIndex {
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// The 1-based page number used as key in `Document::get_pages()`.
    ///
    /// Returns `None` only for indices beyond `u32::MAX - 1`, which no
    /// loaded document can have.
    #[must_use]
    pub fn as_lopdf_page_number(self) -> Option<u32> {
        u32::try_from(self.0).ok()?.checked_add(1)
    }

    /// The 0-based page number taken by mupdf's `load_page`.
    #[must_use]
    pub fn as_mupdf_page_number(self) -> Option<i32> {
        i32::try_from(self.0).ok()
    }

    /// Validate a 0-based page number against the total page count.
    pub fn try_from_page_num(page_num: usize, total_pages: usize) -> Result<Self, Error> {
        if page_num >= total_pages {
            return Err(Error::PdfInvalidPage {
                page: page_num,
                total: total_pages,
            });
        }
        Ok(Self(page_num))
    }
}

impl From<PageIndex> for usize {
    fn from(index: PageIndex) -> Self {
        index.0
    }
}

impl fmt::Display for PageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_try_from_page_num_valid() {
        let idx = PageIndex::try_from_page_num(5, 10).unwrap();
        assert_eq!(idx.as_usize(), 5);
        assert_eq!(usize::from(idx), 5);
    }

    #[test]
    fn test_try_from_page_num_out_of_range() {
        let err = PageIndex::try_from_page_num(10, 5).unwrap_err();
        assert!(matches!(err, Error::PdfInvalidPage { page: 10, total: 5 }));
        assert!(PageIndex::try_from_page_num(0, 0).is_err());
    }

    #[test]
    fn test_as_lopdf_page_number() {
        assert_eq!(PageIndex::try_from_page_num(0, 3).unwrap().as_lopdf_page_number(), Some(1));
        assert_eq!(PageIndex::try_from_page_num(2, 3).unwrap().as_lopdf_page_number(), Some(3));
    }

    #[test]
    fn test_as_mupdf_page_number() {
        assert_eq!(PageIndex::try_from_page_num(2, 3).unwrap().as_mupdf_page_number(), Some(2));
        let huge = PageIndex::try_from_page_num(usize::MAX - 1, usize::MAX).unwrap();
        assert_eq!(huge.as_mupdf_page_number(), None);
    }

    #[test]
    fn test_display() {
        let idx = PageIndex::try_from_page_num(7, 8).unwrap();
        assert_eq!(format!("{idx}"), "7");
    }
}
