//! PDF reading through mupdf, rewriting on top of `lopdf`.

pub mod content;
mod document;
mod geometry;
mod handle;
mod page_index;
pub mod redact;
mod resources;
mod structure;
mod text;

pub use document::{DocumentMetadata, PdfDocument};
pub use geometry::{BoundingBox, MediaBox, Point};
pub use handle::{DocumentHandle, DocumentReader, DocumentWriter, StandardFont};
pub use page_index::PageIndex;
pub use structure::{Block, Line, RawSpan, StructuredPage};
