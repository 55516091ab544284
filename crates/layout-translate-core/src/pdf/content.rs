//! Locating shown glyphs in a page's content stream.
//!
//! Reading text is left to mupdf. Rewriting a content stream still needs to
//! know where each character code of a text showing operator lands on the
//! page, so this walker tracks the graphics state (`q`/`Q`, `cm`), the text
//! state (`Tf`, `Tc`, `Tw`, `Tz`, `TL`, `Ts`) and text positioning (`BT`,
//! `Td`, `TD`, `Tm`, `T*`). Each code shown by `Tj`, `TJ`, `'` or `"` becomes
//! a [`Glyph`] carrying its page box and the location of its bytes.
//!
//! Advances come from the font's own `/Widths` or `/W` arrays. Fonts that
//! omit them (the standard 14) are measured with mupdf's built-in faces.
//! Form XObjects (`Do`) are not descended into.

use std::collections::HashMap;

use lopdf::content::Operation;
use lopdf::{Dictionary, Document, Encoding, Object};
use tracing::debug;

use super::geometry::{BoundingBox, Matrix, MediaBox, number};

/// Ascent used for glyph boxes, as a fraction of the font size
pub const DEFAULT_ASCENT: f32 = 0.8;
/// Descent used for glyph boxes, as a fraction of the font size
pub const DEFAULT_DESCENT: f32 = -0.2;

/// Location of a glyph's bytes: operation index, string index inside the
/// operation (`TJ` array element, or 0), byte offset and byte length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlyphSource {
    pub op: usize,
    pub item: usize,
    pub byte: usize,
    pub len: usize,
}

/// One shown character code.
#[derive(Debug, Clone)]
pub struct Glyph {
    /// Top-left page coordinates
    pub bbox: BoundingBox,
    /// Baseline y in top-left page coordinates
    pub baseline: f32,
    pub source: GlyphSource,
    /// `TJ` adjustment (thousandths of text space) equivalent to this glyph's advance
    pub displacement: f32,
}

/// Advance widths of one font resource, in thousandths of the font size.
struct FontWidths<'a> {
    composite: bool,
    first_char: u32,
    widths: Vec<f32>,
    cid_widths: HashMap<u32, f32>,
    default_width: f32,
    /// Built-in face and the font's encoding, for fonts without `/Widths`
    builtin: Option<(mupdf::Font, Option<Encoding<'a>>)>,
}

impl<'a> FontWidths<'a> {
    fn from_dict(doc: &'a Document, font: &'a Dictionary) -> Self {
        let composite = font.get(b"Subtype").and_then(Object::as_name).ok() == Some(b"Type0".as_slice());

        if composite {
            let descendant = font
                .get_deref(b"DescendantFonts", doc)
                .and_then(Object::as_array)
                .ok()
                .and_then(|fonts| fonts.first())
                .and_then(|obj| doc.dereference(obj).ok())
                .and_then(|(_, obj)| obj.as_dict().ok());
            let default_width = descendant
                .and_then(|d| d.get(b"DW").ok())
                .and_then(number)
                .unwrap_or(1000.0);
            let cid_widths = descendant
                .and_then(|d| d.get_deref(b"W", doc).ok())
                .and_then(|obj| obj.as_array().ok())
                .map(|w| cid_widths(doc, w))
                .unwrap_or_default();
            return Self {
                composite,
                first_char: 0,
                widths: Vec::new(),
                cid_widths,
                default_width,
                builtin: None,
            };
        }

        let first_char = font
            .get(b"FirstChar")
            .and_then(Object::as_i64)
            .ok()
            .and_then(|c| u32::try_from(c).ok())
            .unwrap_or(0);
        let widths: Vec<f32> = font
            .get_deref(b"Widths", doc)
            .and_then(Object::as_array)
            .map(|w| {
                w.iter()
                    .map(|v| doc.dereference(v).ok().and_then(|(_, v)| number(v)).unwrap_or(0.0))
                    .collect()
            })
            .unwrap_or_default();
        let missing_width = font
            .get_deref(b"FontDescriptor", doc)
            .and_then(Object::as_dict)
            .and_then(|d| d.get(b"MissingWidth"))
            .ok()
            .and_then(number)
            .filter(|w| *w > 0.0);

        let builtin = if widths.is_empty() {
            let base_font = font
                .get(b"BaseFont")
                .and_then(Object::as_name)
                .map(|n| String::from_utf8_lossy(n).into_owned())
                .unwrap_or_default();
            builtin_face(&base_font).map(|face| (face, font.get_font_encoding(doc).ok()))
        } else {
            None
        };

        Self {
            composite,
            first_char,
            widths,
            cid_widths: HashMap::new(),
            default_width: missing_width.unwrap_or(500.0),
            builtin,
        }
    }

    /// Fallback for font names missing from resources.
    fn builtin_only(name: &str) -> Self {
        Self {
            composite: false,
            first_char: 0,
            widths: Vec::new(),
            cid_widths: HashMap::new(),
            default_width: 500.0,
            builtin: builtin_face(name).map(|face| (face, None)),
        }
    }

    /// Split a shown string into `(code, byte_offset, byte_len)` triples.
    fn codes(&self, bytes: &[u8]) -> Vec<(u32, usize, usize)> {
        let width = if self.composite { 2 } else { 1 };
        bytes
            .chunks(width)
            .enumerate()
            .map(|(i, chunk)| {
                let code = chunk.iter().fold(0_u32, |acc, b| (acc << 8) | u32::from(*b));
                (code, i * width, chunk.len())
            })
            .collect()
    }

    fn width(&self, code: u32) -> f32 {
        if self.composite {
            return self.cid_widths.get(&code).copied().unwrap_or(self.default_width);
        }
        code.checked_sub(self.first_char)
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| self.widths.get(i))
            .copied()
            .filter(|w| *w > 0.0)
            .or_else(|| self.builtin_width(code))
            .unwrap_or(self.default_width)
    }

    fn builtin_width(&self, code: u32) -> Option<f32> {
        let (face, encoding) = self.builtin.as_ref()?;
        let byte = u8::try_from(code).ok()?;
        let unicode = match encoding {
            Some(encoding) => encoding.bytes_to_string(&[byte]).ok()?.chars().next()?,
            // Latin-1 when the encoding is unknown
            None => char::from(byte),
        };
        let glyph = face.encode_character(i32::try_from(u32::from(unicode)).ok()?).ok()?;
        face.advance_glyph(glyph)
            .ok()
            .map(|w| w * 1000.0)
            .filter(|w| *w > 0.0)
    }
}

/// mupdf's face for a standard font name, Helvetica when the name is unknown.
fn builtin_face(base_font: &str) -> Option<mupdf::Font> {
    let name = base_font.split_once('+').map_or(base_font, |(_, rest)| rest);
    mupdf::Font::new(name)
        .or_else(|_| mupdf::Font::new("Helvetica"))
        .inspect_err(|e| debug!("No built-in metrics for {}: {}", name, e))
        .ok()
}

/// Parse a CIDFont `/W` array: `c [w1 w2 ...]` and `c_first c_last w` forms.
fn cid_widths(doc: &Document, array: &[Object]) -> HashMap<u32, f32> {
    let mut widths = HashMap::new();
    let items: Vec<&Object> = array
        .iter()
        .filter_map(|o| doc.dereference(o).ok().map(|(_, o)| o))
        .collect();
    let mut i = 0;

    while i < items.len() {
        let Some(first) = items[i].as_i64().ok().and_then(|c| u32::try_from(c).ok()) else {
            break;
        };
        match items.get(i + 1) {
            Some(Object::Array(list)) => {
                for (offset, w) in list.iter().enumerate() {
                    if let (Some(w), Ok(offset)) = (number(w), u32::try_from(offset)) {
                        widths.insert(first + offset, w);
                    }
                }
                i += 2;
            }
            Some(last) => {
                let last = last.as_i64().ok().and_then(|c| u32::try_from(c).ok());
                let w = items.get(i + 2).copied().and_then(number);
                if let (Some(last), Some(w)) = (last, w) {
                    for code in first..=last.min(first.saturating_add(0xFFFF)) {
                        widths.insert(code, w);
                    }
                }
                i += 3;
            }
            None => break,
        }
    }

    widths
}

#[derive(Debug, Clone)]
struct TextState {
    font: Option<Vec<u8>>,
    size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    leading: f32,
    rise: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: None,
            size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct GraphicsState {
    ctm: Matrix,
    text: TextState,
}

/// Walks the operations of one page.
pub struct ContentInterpreter<'a> {
    doc: &'a Document,
    font_resources: Option<&'a Dictionary>,
    media_box: MediaBox,
    fonts: HashMap<Vec<u8>, FontWidths<'a>>,
    gs: GraphicsState,
    stack: Vec<GraphicsState>,
    tm: Matrix,
    tlm: Matrix,
    glyphs: Vec<Glyph>,
}

impl<'a> ContentInterpreter<'a> {
    pub fn new(doc: &'a Document, resources: &'a Dictionary, media_box: MediaBox) -> Self {
        let font_resources = resources
            .get_deref(b"Font", doc)
            .and_then(Object::as_dict)
            .ok();

        Self {
            doc,
            font_resources,
            media_box,
            fonts: HashMap::new(),
            gs: GraphicsState::default(),
            stack: Vec::new(),
            tm: Matrix::IDENTITY,
            tlm: Matrix::IDENTITY,
            glyphs: Vec::new(),
        }
    }

    /// Run every operation and return the glyphs inside the MediaBox, in
    /// content order.
    pub fn run(mut self, operations: &[Operation]) -> Vec<Glyph> {
        for (index, operation) in operations.iter().enumerate() {
            self.apply(index, operation);
        }
        self.glyphs
    }

    fn apply(&mut self, index: usize, operation: &Operation) {
        let operands = &operation.operands;
        let num = |i: usize| operands.get(i).and_then(number);

        match operation.operator.as_str() {
            "q" => self.stack.push(self.gs.clone()),
            "Q" => {
                if let Some(gs) = self.stack.pop() {
                    self.gs = gs;
                } else {
                    debug!("Unbalanced Q in content stream");
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    self.gs.ctm = m.then(&self.gs.ctm);
                }
            }
            "BT" => {
                self.tm = Matrix::IDENTITY;
                self.tlm = Matrix::IDENTITY;
            }
            "Tf" => {
                if let (Some(Object::Name(name)), Some(size)) = (operands.first(), num(1)) {
                    self.load_font(name);
                    self.gs.text.font = Some(name.clone());
                    self.gs.text.size = size;
                }
            }
            "Tc" => self.gs.text.char_spacing = num(0).unwrap_or(0.0),
            "Tw" => self.gs.text.word_spacing = num(0).unwrap_or(0.0),
            "Tz" => self.gs.text.horizontal_scale = num(0).unwrap_or(100.0) / 100.0,
            "TL" => self.gs.text.leading = num(0).unwrap_or(0.0),
            "Ts" => self.gs.text.rise = num(0).unwrap_or(0.0),
            "Td" => {
                if let (Some(tx), Some(ty)) = (num(0), num(1)) {
                    self.move_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (num(0), num(1)) {
                    self.gs.text.leading = -ty;
                    self.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    self.tm = m;
                    self.tlm = m;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(bytes, index, 0);
                }
            }
            "'" => {
                self.next_line();
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(bytes, index, 0);
                }
            }
            "\"" => {
                if let (Some(aw), Some(ac)) = (num(0), num(1)) {
                    self.gs.text.word_spacing = aw;
                    self.gs.text.char_spacing = ac;
                }
                self.next_line();
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    self.show(bytes, index, 0);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    for (item, element) in items.iter().enumerate() {
                        match element {
                            Object::String(bytes, _) => self.show(bytes, index, item),
                            other => {
                                if let Some(adjust) = number(other) {
                                    let text = &self.gs.text;
                                    let tx = -adjust / 1000.0 * text.size * text.horizontal_scale;
                                    self.tm = Matrix::translation(tx, 0.0).then(&self.tm);
                                }
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.tlm = Matrix::translation(tx, ty).then(&self.tlm);
        self.tm = self.tlm;
    }

    fn next_line(&mut self) {
        let leading = self.gs.text.leading;
        self.move_line(0.0, -leading);
    }

    fn load_font(&mut self, name: &[u8]) {
        if self.fonts.contains_key(name) {
            return;
        }
        let doc = self.doc;
        let font = self
            .font_resources
            .and_then(|fonts| fonts.get_deref(name, doc).ok())
            .and_then(|obj| obj.as_dict().ok())
            .map_or_else(
                || {
                    let name = String::from_utf8_lossy(name);
                    debug!("Font /{} not in resources", name);
                    FontWidths::builtin_only(&name)
                },
                |dict| FontWidths::from_dict(doc, dict),
            );
        self.fonts.insert(name.to_vec(), font);
    }

    fn show(&mut self, bytes: &[u8], op: usize, item: usize) {
        let text = self.gs.text.clone();
        let Some(font) = text.font.as_ref().and_then(|key| self.fonts.get(key)) else {
            return;
        };
        let page = self.media_box.page_box();
        let h_size = text.size * text.horizontal_scale;

        for (code, byte, len) in font.codes(bytes) {
            let w0 = font.width(code) / 1000.0;
            let word_space = if len == 1 && code == 32 {
                text.word_spacing
            } else {
                0.0
            };
            let advance = (w0 * text.size + text.char_spacing + word_space) * text.horizontal_scale;

            let to_user = self.tm.then(&self.gs.ctm);
            let glyph_width = w0 * h_size;
            let bottom = text.rise + DEFAULT_DESCENT * text.size;
            let top = text.rise + DEFAULT_ASCENT * text.size;

            let corners = [(0.0, bottom), (glyph_width, bottom), (0.0, top), (glyph_width, top)]
                .map(|(x, y)| {
                    let (ux, uy) = to_user.apply(x, y);
                    self.media_box.to_top_left(ux, uy)
                });
            let bbox = corners.iter().skip(1).fold(
                BoundingBox::new(corners[0].x, corners[0].y, corners[0].x, corners[0].y),
                |acc, p| acc.union(&BoundingBox::new(p.x, p.y, p.x, p.y)),
            );
            let (_, baseline_y) = to_user.apply(0.0, text.rise);
            let baseline = self.media_box.to_top_left(0.0, baseline_y).y;

            if page.contains(bbox.center()) {
                self.glyphs.push(Glyph {
                    bbox,
                    baseline,
                    source: GlyphSource { op, item, byte, len },
                    displacement: if h_size.abs() > f32::EPSILON {
                        -advance / h_size * 1000.0
                    } else {
                        0.0
                    },
                });
            }

            self.tm = Matrix::translation(advance, 0.0).then(&self.tm);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use lopdf::content::Content;

    fn helvetica() -> Dictionary {
        Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(b"Helvetica".to_vec())),
            ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
        ])
    }

    fn run_with(font: Dictionary, ops: &[Operation]) -> Vec<Glyph> {
        let doc = Document::with_version("1.5");
        let resources = Dictionary::from_iter([(
            "Font",
            Object::Dictionary(Dictionary::from_iter([("F1", Object::Dictionary(font))])),
        )]);
        ContentInterpreter::new(&doc, &resources, MediaBox::LETTER).run(ops)
    }

    fn run(ops: &[Operation]) -> Vec<Glyph> {
        run_with(helvetica(), ops)
    }

    #[test]
    fn test_tj_positions_glyphs() {
        let glyphs = run(&[
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 10.into()]),
            Operation::new("Td", vec![100.into(), 700.into()]),
            Operation::new("Tj", vec![Object::string_literal("Hi")]),
            Operation::new("ET", vec![]),
        ]);

        assert_eq!(glyphs.len(), 2);
        let h = &glyphs[0];
        assert!((h.bbox.x0 - 100.0).abs() < 1e-3);
        // Helvetica H is 722/1000 em wide
        assert!((h.bbox.x1 - 107.22).abs() < 1e-2);
        // Baseline at 792 - 700; the box spans 0.8 em above and 0.2 em below it
        assert!((h.baseline - 92.0).abs() < 1e-3);
        assert!((h.bbox.y0 - 84.0).abs() < 1e-3);
        assert!((h.bbox.y1 - 94.0).abs() < 1e-3);
        assert!((glyphs[1].bbox.x0 - 107.22).abs() < 1e-2);
        assert_eq!(h.source, GlyphSource { op: 3, item: 0, byte: 0, len: 1 });
        assert!((h.displacement + 722.0).abs() < 1.0);
    }

    #[test]
    fn test_declared_widths_win_over_builtin_metrics() {
        let mut font = helvetica();
        font.set("FirstChar", Object::Integer(72));
        font.set("Widths", Object::Array(vec![Object::Integer(1000), Object::Integer(250)]));
        let glyphs = run_with(
            font,
            &[
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
                Operation::new("Tj", vec![Object::string_literal("HI")]),
                Operation::new("ET", vec![]),
            ],
        );

        assert!((glyphs[0].bbox.width() - 10.0).abs() < 1e-3);
        // 'I' (73) gets the second entry
        assert!((glyphs[1].bbox.width() - 2.5).abs() < 1e-3);
    }

    #[test]
    fn test_tj_array_adjustments_and_scaling() {
        let glyphs = run(&[
            Operation::new("q", vec![]),
            Operation::new("cm", vec![2.into(), 0.into(), 0.into(), 2.into(), 0.into(), 0.into()]),
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 10.into()]),
            Operation::new("Tm", vec![1.into(), 0.into(), 0.into(), 1.into(), 10.into(), 300.into()]),
            Operation::new(
                "TJ",
                vec![Object::Array(vec![
                    Object::string_literal("A"),
                    Object::Integer(-1000),
                    Object::string_literal("B"),
                ])],
            ),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ]);

        assert_eq!(glyphs.len(), 2);
        // A is 667 wide, the adjustment adds one em; all doubled by the CTM
        let expected_b = 2.0 * (10.0 + 6.67 + 10.0);
        assert!((glyphs[1].bbox.x0 - expected_b).abs() < 2e-2);
        assert_eq!(glyphs[1].source.item, 2);
        // 0.8 + 0.2 em at 10pt, doubled
        assert!((glyphs[0].bbox.height() - 20.0).abs() < 1e-3);
    }

    #[test]
    fn test_state_restore_after_q() {
        let glyphs = run(&[
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Tm", vec![1.into(), 0.into(), 0.into(), 1.into(), 72.into(), 600.into()]),
            Operation::new("q", vec![]),
            Operation::new("Tf", vec!["F1".into(), 24.into()]),
            Operation::new("Q", vec![]),
            Operation::new("Tj", vec![Object::string_literal("k")]),
            Operation::new("ET", vec![]),
        ]);

        assert!((glyphs[0].bbox.height() - 12.0).abs() < 1e-3);
    }

    #[test]
    fn test_line_operators() {
        let glyphs = run(&[
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 10.into()]),
            Operation::new("TD", vec![50.into(), 500.into()]),
            Operation::new("TD", vec![0.into(), (-14).into()]),
            Operation::new("Tj", vec![Object::string_literal("a")]),
            Operation::new("'", vec![Object::string_literal("b")]),
            Operation::new("ET", vec![]),
        ]);

        assert!((glyphs[0].baseline - (792.0 - 486.0)).abs() < 1e-3);
        assert!((glyphs[1].baseline - (792.0 - 472.0)).abs() < 1e-3);
        assert!((glyphs[1].bbox.x0 - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_glyphs_outside_media_box_are_clipped() {
        let glyphs = run(&[
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 10.into()]),
            Operation::new("Td", vec![(-200).into(), 700.into()]),
            Operation::new("Tj", vec![Object::string_literal("gone")]),
            Operation::new("ET", vec![]),
        ]);
        assert!(glyphs.is_empty());
    }

    #[test]
    fn test_composite_font_uses_two_byte_codes() {
        let descendant = Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"CIDFontType2".to_vec())),
            ("DW", Object::Integer(1000)),
            (
                "W",
                Object::Array(vec![Object::Integer(5), Object::Array(vec![Object::Integer(500)])]),
            ),
        ]);
        let font = Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type0".to_vec())),
            ("BaseFont", Object::Name(b"ABCDEF+NotoSans".to_vec())),
            ("Encoding", Object::Name(b"Identity-H".to_vec())),
            ("DescendantFonts", Object::Array(vec![Object::Dictionary(descendant)])),
        ]);
        let content = Content::decode(b"BT /F1 10 Tf 100 600 Td <00050006> Tj ET").unwrap();
        let glyphs = run_with(font, &content.operations);

        assert_eq!(glyphs.len(), 2);
        assert_eq!(glyphs[1].source, GlyphSource { op: 3, item: 0, byte: 2, len: 2 });
        assert!((glyphs[0].bbox.width() - 5.0).abs() < 1e-3);
        assert!((glyphs[1].bbox.width() - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_decoded_stream() {
        let content = Content::decode(b"BT /F1 12 Tf 72 720 Td (Hallo Welt) Tj ET").unwrap();
        let glyphs = run(&content.operations);
        assert_eq!(glyphs.len(), 10);
        assert!(glyphs.windows(2).all(|w| w[0].bbox.x0 < w[1].bbox.x0));
    }
}
