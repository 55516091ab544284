//! Page resources and content streams.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::{Error, Result};

/// Resolve the Resources dictionary for a page, handling indirect references
/// and inheritance from parent Pages nodes.
///
/// Resources may be an inline dictionary, an indirect reference, or
/// inherited from an ancestor Pages node. A page with none gets an empty
/// dictionary.
pub fn page_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let page = doc.get_object(page_id)?;
    Ok(lookup_resources(doc, page, 10).unwrap_or_default())
}

fn lookup_resources(doc: &Document, node: &Object, depth: usize) -> Option<Dictionary> {
    if depth == 0 {
        return None;
    }
    let dict = node.as_dict().ok()?;

    if let Some(resources) = dict.get(b"Resources").ok().and_then(|obj| resolve_dict(doc, obj)) {
        return Some(resources);
    }

    let parent_id = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
    lookup_resources(doc, doc.get_object(parent_id).ok()?, depth - 1)
}

/// Clone a dictionary, following one level of indirection.
fn resolve_dict(doc: &Document, obj: &Object) -> Option<Dictionary> {
    match obj {
        Object::Dictionary(d) => Some(d.clone()),
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(Object::Dictionary(d)) => Some(d.clone()),
            _ => None,
        },
        _ => None,
    }
}

/// Register `font_id` under `/Font /<name>` in the page's resources.
///
/// The resolved resources are written back inline on the page so the new
/// entry never leaks into a Resources dictionary shared with other pages.
pub fn add_font_to_page(doc: &mut Document, page_id: ObjectId, name: &str, font_id: ObjectId) -> Result<()> {
    let mut resources = page_resources(doc, page_id)?;

    let mut fonts = resources
        .get(b"Font")
        .ok()
        .and_then(|obj| resolve_dict(doc, obj))
        .unwrap_or_default();

    if fonts.get(name.as_bytes()).and_then(Object::as_reference).ok() == Some(font_id) {
        return Ok(());
    }
    fonts.set(name, Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(fonts));

    let page = doc.get_object_mut(page_id)?;
    if let Object::Dictionary(page_dict) = page {
        page_dict.set("Resources", Object::Dictionary(resources));
    }
    Ok(())
}

/// Font dictionary for a standard-14 Type1 font with `WinAnsiEncoding`.
pub fn standard_font_dict(base_font: &str) -> Dictionary {
    Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(base_font.as_bytes().to_vec())),
        ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
    ])
}

/// Decode all content streams of a page into one operation list.
pub fn page_operations(doc: &Document, page_id: ObjectId, page: usize) -> Result<Vec<Operation>> {
    let bytes = doc.get_page_content(page_id).map_err(|e| Error::PdfScan {
        page,
        reason: format!("Failed to read content: {e}"),
    })?;
    let content = Content::decode(&bytes).map_err(|e| Error::PdfScan {
        page,
        reason: format!("Failed to parse content: {e}"),
    })?;
    Ok(content.operations)
}

/// Replace the page's content with a single stream.
pub fn set_page_content(doc: &mut Document, page_id: ObjectId, content: Vec<u8>) -> Result<()> {
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

    let page = doc.get_object_mut(page_id)?;
    if let Object::Dictionary(dict) = page {
        dict.set("Contents", Object::Reference(content_id));
    }
    Ok(())
}

/// Encode operations back to content bytes.
pub fn encode_operations(operations: Vec<Operation>, page: usize) -> Result<Vec<u8>> {
    Content { operations }
        .encode()
        .map_err(|e| Error::PdfRedaction {
            page,
            reason: format!("Failed to encode content: {e}"),
        })
}
