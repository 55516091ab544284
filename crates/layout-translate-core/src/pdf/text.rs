//! Page text through mupdf's structured text.
//!
//! Characters, boxes and sizes come from the typed text page. Font names and
//! styles are only exposed per line by the JSON export of the same page, so
//! the two are walked side by side.

use mupdf::text_page::TextBlockType;
use mupdf::{Page, TextPageOptions};
use serde::Deserialize;
use tracing::debug;

use super::geometry::BoundingBox;
use super::structure::{Block, Line, LineStyle, ScannedChar};
use crate::error::{Error, Result};

#[derive(Debug, Default, Deserialize)]
struct JsonPage {
    #[serde(default)]
    blocks: Vec<JsonBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct JsonBlock {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    lines: Vec<JsonLine>,
}

#[derive(Debug, Default, Deserialize)]
struct JsonLine {
    #[serde(default)]
    font: JsonFont,
}

#[derive(Debug, Default, Deserialize)]
struct JsonFont {
    #[serde(default)]
    name: String,
    #[serde(default)]
    family: String,
    #[serde(default)]
    weight: String,
    #[serde(default)]
    style: String,
}

/// Per-line styles of the page's text blocks, in scan order.
fn line_styles(page: &Page, page_num: usize) -> Result<Vec<Vec<LineStyle>>> {
    let json = page.stext_page_as_json_from_page(1.0).map_err(|e| Error::PdfScan {
        page: page_num,
        reason: format!("Failed to export text page: {e}"),
    })?;
    let parsed: JsonPage = serde_json::from_str(&json).map_err(|e| Error::PdfScan {
        page: page_num,
        reason: format!("Failed to parse text page: {e}"),
    })?;

    Ok(parsed
        .blocks
        .into_iter()
        .filter(|block| block.kind == "text")
        .map(|block| {
            block
                .lines
                .into_iter()
                .map(|line| {
                    let font = line.font;
                    LineStyle::from_names(&font.name, &font.family, &font.weight, &font.style)
                })
                .collect()
        })
        .collect())
}

/// Scan the text blocks of a loaded page (coordinates relative to the
/// page's top-left corner).
pub fn scan_blocks(page: &Page, page_num: usize) -> Result<Vec<Block>> {
    let text_page = page
        .to_text_page(TextPageOptions::empty())
        .map_err(|e| Error::PdfScan {
            page: page_num,
            reason: format!("Failed to get text page: {e}"),
        })?;
    let styles = line_styles(page, page_num)?;
    let unstyled = Vec::new();

    let mut blocks = Vec::new();
    let text_blocks = text_page
        .blocks()
        .filter(|block| block.r#type() == TextBlockType::Text);
    for (index, block) in text_blocks.enumerate() {
        let block_styles = styles.get(index).unwrap_or(&unstyled);
        let mut lines = Vec::new();

        for (line_index, line) in block.lines().enumerate() {
            let chars: Vec<ScannedChar> = line
                .chars()
                .filter_map(|text_char| {
                    let c = text_char.char()?;
                    let quad = text_char.quad();
                    let origin = text_char.origin();
                    let size = text_char.size();
                    let bbox = BoundingBox::from_quad(&quad);
                    Some(ScannedChar {
                        c,
                        bbox,
                        size,
                        ascender: (origin.y - quad.ul.y) / size,
                        descender: (origin.y - quad.ll.y) / size,
                    })
                })
                .collect();

            let style = block_styles.get(line_index).cloned().unwrap_or_default();
            lines.extend(Line::from_chars(&chars, &style));
        }
        blocks.extend(Block::from_lines(lines));
    }

    debug!("Page {}: {} text blocks", page_num, blocks.len());
    Ok(blocks)
}
