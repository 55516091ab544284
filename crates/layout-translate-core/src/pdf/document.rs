use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::io::Write as _;
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, StringFormat};
use mupdf::{Document as MuDocument, MetadataName};
use tracing::{debug, info};

use super::content::ContentInterpreter;
use super::geometry::{BoundingBox, MediaBox, Point};
use super::handle::{DocumentReader, DocumentWriter, StandardFont};
use super::page_index::PageIndex;
use super::redact::{fill_regions, redact_operations};
use super::resources::{
    add_font_to_page, encode_operations, page_operations, page_resources, set_page_content,
    standard_font_dict,
};
use super::structure::StructuredPage;
use super::text::scan_blocks;
use crate::config::TextColor;
use crate::error::{Error, Result};

/// Document metadata
#[derive(Debug, Clone, Default)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
}

/// Pending edits of one page.
#[derive(Debug, Default)]
struct PageEdits {
    /// Regions queued by `redact`, not yet applied
    queued: Vec<BoundingBox>,
    /// Applied regions still to be painted
    fills: Vec<BoundingBox>,
    /// Text-drawing operations appended on save
    overlay: Vec<Operation>,
}

impl PageEdits {
    fn is_empty(&self) -> bool {
        self.fills.is_empty() && self.overlay.is_empty()
    }
}

/// An editable PDF: mupdf reads the text, `lopdf` rewrites the pages.
pub struct PdfDocument {
    /// The bytes as loaded
    source: Vec<u8>,
    doc: Document,
    /// Page object ids keyed by 1-based page number
    pages: BTreeMap<u32, ObjectId>,
    edits: HashMap<usize, PageEdits>,
    /// Font objects added for inserted text, shared by all pages
    fonts: HashMap<StandardFont, ObjectId>,
    redaction_fill: Option<TextColor>,
    metadata: DocumentMetadata,
    /// Content streams rewritten since loading; scans then read `doc`
    rewritten: bool,
}

impl PdfDocument {
    /// Open a PDF from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let reader = MuDocument::from_bytes(bytes, "")
            .map_err(|e| Error::PdfOpen(format!("Failed to parse PDF: {e}")))?;

        // mupdf returns empty strings for missing entries
        let get_meta = |name| -> Option<String> { reader.metadata(name).ok().filter(|s| !s.is_empty()) };
        let metadata = DocumentMetadata {
            title: get_meta(MetadataName::Title),
            author: get_meta(MetadataName::Author),
            subject: get_meta(MetadataName::Subject),
            keywords: get_meta(MetadataName::Keywords),
            creator: get_meta(MetadataName::Creator),
            producer: get_meta(MetadataName::Producer),
        };

        let doc = Document::load_mem(bytes)
            .map_err(|e| Error::PdfOpen(format!("Failed to parse PDF: {e}")))?;

        Ok(Self {
            source: bytes.to_vec(),
            pages: doc.get_pages(),
            doc,
            edits: HashMap::new(),
            fonts: HashMap::new(),
            redaction_fill: Some(TextColor::white()),
            metadata,
            rewritten: false,
        })
    }

    /// Open a PDF from a file path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| Error::PdfOpen(format!("Failed to read file {}: {e}", path.display())))?;
        let document = Self::from_bytes(&bytes)?;
        info!("Opened {} ({} pages)", path.display(), document.pages.len());
        Ok(document)
    }

    /// Colour painted over redacted regions; `None` leaves them unpainted.
    #[must_use]
    pub const fn with_redaction_fill(mut self, fill: Option<TextColor>) -> Self {
        self.redaction_fill = fill;
        self
    }

    pub const fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }

    fn page_index(&self, page: usize) -> Result<PageIndex> {
        PageIndex::try_from_page_num(page, self.pages.len())
    }

    fn page_id(&self, page: usize) -> Result<ObjectId> {
        self.page_index(page)?
            .as_lopdf_page_number()
            .and_then(|number| self.pages.get(&number))
            .copied()
            .ok_or(Error::PdfInvalidPage {
                page,
                total: self.pages.len(),
            })
    }

    fn media_box(&self, page_id: ObjectId) -> Result<MediaBox> {
        let page_obj = self.doc.get_object(page_id)?;
        Ok(MediaBox::of_page(&self.doc, page_obj))
    }

    /// Open the current state of the document for reading.
    fn open_reader(&self) -> Result<MuDocument> {
        let bytes = if self.rewritten {
            let mut doc = self.doc.clone();
            let mut bytes = Vec::new();
            doc.save_to(&mut bytes)
                .map_err(|e| Error::Lopdf(format!("Failed to serialize document: {e}")))?;
            Cow::Owned(bytes)
        } else {
            Cow::Borrowed(self.source.as_slice())
        };
        MuDocument::from_bytes(&bytes, "").map_err(|e| Error::PdfOpen(format!("Failed to open document: {e}")))
    }

    fn font_id(&mut self, font: StandardFont) -> ObjectId {
        if let Some(id) = self.fonts.get(&font) {
            return *id;
        }
        let id = self.doc.add_object(standard_font_dict(font.base_font()));
        self.fonts.insert(font, id);
        id
    }

    /// Encode `text` with the inserted font's encoding; characters it cannot
    /// represent become `?`. Returns the bytes and the number replaced.
    fn encode_text(&self, font_id: ObjectId, text: &str) -> Result<(Vec<u8>, usize)> {
        let encoding = self.doc.get_dictionary(font_id)?.get_font_encoding(&self.doc)?;
        let mut bytes = Vec::with_capacity(text.len());
        let mut replaced = 0;
        let mut buf = [0; 4];
        for c in text.chars() {
            let encoded = Document::encode_text(&encoding, c.encode_utf8(&mut buf));
            if encoded.is_empty() {
                replaced += 1;
                bytes.push(b'?');
            } else {
                bytes.extend(encoded);
            }
        }
        Ok((bytes, replaced))
    }

    /// Wrap the original content in `q`/`Q` and append fills and inserted
    /// text as one stream.
    fn flush_page(&mut self, page: usize, edits: PageEdits) -> Result<()> {
        let page_id = self.page_id(page)?;
        let media_box = self.media_box(page_id)?;
        let original = self.doc.get_page_content(page_id).map_err(|e| Error::PdfSave(format!(
            "Failed to read content of page {page}: {e}"
        )))?;

        let mut operations = match self.redaction_fill {
            Some(fill) => fill_regions(&edits.fills, &media_box, fill),
            None => Vec::new(),
        };
        operations.extend(edits.overlay);
        let added = Content { operations }
            .encode()
            .map_err(|e| Error::PdfSave(format!("Failed to encode page {page}: {e}")))?;

        let mut content = Vec::with_capacity(original.len() + added.len() + 8);
        content.extend_from_slice(b"q\n");
        content.extend_from_slice(&original);
        content.extend_from_slice(b"\nQ\n");
        content.extend_from_slice(&added);

        set_page_content(&mut self.doc, page_id, content)
    }
}

impl DocumentReader for PdfDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_size(&self, page: usize) -> Result<(f32, f32)> {
        let media_box = self.media_box(self.page_id(page)?)?;
        Ok((media_box.width(), media_box.height()))
    }

    fn scan_page(&self, page: usize) -> Result<StructuredPage> {
        let (width, height) = self.page_size(page)?;
        let number = self
            .page_index(page)?
            .as_mupdf_page_number()
            .ok_or(Error::PdfInvalidPage {
                page,
                total: self.pages.len(),
            })?;

        let reader = self.open_reader()?;
        let mu_page = reader.load_page(number).map_err(|e| Error::PdfScan {
            page,
            reason: format!("Failed to load page: {e}"),
        })?;

        Ok(StructuredPage {
            width,
            height,
            blocks: scan_blocks(&mu_page, page)?,
        })
    }
}

impl DocumentWriter for PdfDocument {
    fn redact(&mut self, page: usize, region: BoundingBox) -> Result<()> {
        self.page_id(page)?;
        self.edits.entry(page).or_default().queued.push(region);
        Ok(())
    }

    fn apply_redactions(&mut self, page: usize) -> Result<usize> {
        let page_id = self.page_id(page)?;
        let regions = self
            .edits
            .get_mut(&page)
            .map(|edits| std::mem::take(&mut edits.queued))
            .unwrap_or_default();
        if regions.is_empty() {
            return Ok(0);
        }

        let media_box = self.media_box(page_id)?;
        let resources = page_resources(&self.doc, page_id)?;
        let operations = page_operations(&self.doc, page_id, page).map_err(|e| Error::PdfRedaction {
            page,
            reason: e.to_string(),
        })?;
        let glyphs = ContentInterpreter::new(&self.doc, &resources, media_box).run(&operations);

        let (operations, removed) = redact_operations(operations, &glyphs, &regions);
        if removed > 0 {
            let content = encode_operations(operations, page)?;
            set_page_content(&mut self.doc, page_id, content)?;
            self.rewritten = true;
        }
        debug!("Page {}: {} regions removed {} glyphs", page, regions.len(), removed);

        self.edits.entry(page).or_default().fills.extend(regions);
        Ok(removed)
    }

    fn insert_text(
        &mut self,
        page: usize,
        point: Point,
        text: &str,
        font: StandardFont,
        size: f32,
        color: TextColor,
    ) -> Result<()> {
        let page_id = self.page_id(page)?;
        if !size.is_finite() || size <= 0.0 {
            return Err(Error::PdfInsert {
                page,
                reason: format!("invalid font size {size}"),
            });
        }
        if text.is_empty() {
            return Ok(());
        }

        let media_box = self.media_box(page_id)?;
        let font_id = self.font_id(font);
        add_font_to_page(&mut self.doc, page_id, font.resource_name(), font_id).map_err(|e| {
            Error::PdfInsert {
                page,
                reason: e.to_string(),
            }
        })?;

        let (bytes, replaced) = self.encode_text(font_id, text).map_err(|e| Error::PdfInsert {
            page,
            reason: e.to_string(),
        })?;
        if replaced > 0 {
            debug!("Page {}: {} characters not in WinAnsi replaced", page, replaced);
        }
        let (x, y) = media_box.to_user_space(point);

        let overlay = &mut self.edits.entry(page).or_default().overlay;
        overlay.extend([
            Operation::new("q", vec![]),
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(font.resource_name().as_bytes().to_vec()), Object::Real(size)],
            ),
            Operation::new(
                "rg",
                vec![Object::Real(color.r), Object::Real(color.g), Object::Real(color.b)],
            ),
            // OCR layers leave invisible mode (3) behind
            Operation::new("Tr", vec![Object::Integer(0)]),
            Operation::new(
                "Tm",
                vec![
                    Object::Integer(1),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(1),
                    Object::Real(x),
                    Object::Real(y),
                ],
            ),
            Operation::new("Tj", vec![Object::String(bytes, StringFormat::Hexadecimal)]),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ]);

        Ok(())
    }

    fn save(&mut self, path: &Path) -> Result<()> {
        let mut pages: Vec<(usize, PageEdits)> = self
            .edits
            .drain()
            .filter(|(_, edits)| !edits.is_empty())
            .collect();
        pages.sort_by_key(|(page, _)| *page);
        let edited = pages.len();
        for (page, edits) in pages {
            self.flush_page(page, edits)?;
        }

        self.doc.compress();

        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut file = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| Error::PdfSave(format!("Failed to create temporary file: {e}")))?;
        self.doc
            .save_to(&mut file)
            .map_err(|e| Error::PdfSave(format!("Failed to write PDF: {e}")))?;
        file.flush()?;
        file.persist(path)
            .map_err(|e| Error::PdfSave(format!("Failed to persist {}: {e}", path.display())))?;
        self.rewritten = true;

        info!("Saved {} ({} pages edited)", path.display(), edited);
        Ok(())
    }
}
