//! Removing glyphs from content streams.
//!
//! A glyph is removed when the centre of its box lies in a redaction region.
//! Its bytes are cut out of the showing operator and replaced by a `TJ`
//! adjustment of the same advance, so the glyphs that remain keep their
//! positions. Text showing operators that lose glyphs are rewritten as `TJ`:
//!
//! - `Tj s` becomes `[..] TJ`
//! - `' s` becomes `T* [..] TJ`
//! - `" aw ac s` becomes `aw Tw ac Tc T* [..] TJ`

use std::collections::HashMap;

use lopdf::content::Operation;
use lopdf::{Object, StringFormat};

use super::content::Glyph;
use super::geometry::{BoundingBox, MediaBox, Point};
use crate::config::TextColor;

/// A glyph cut: byte range and the `TJ` adjustment standing in for it.
#[derive(Debug, Clone, Copy)]
struct Cut {
    byte: usize,
    len: usize,
    displacement: f32,
}

/// Remove every glyph whose centre lies in one of `regions`.
///
/// `glyphs` must come from interpreting exactly `operations`. Returns the
/// rewritten operations and the number of glyphs removed.
pub fn redact_operations(
    operations: Vec<Operation>,
    glyphs: &[Glyph],
    regions: &[BoundingBox],
) -> (Vec<Operation>, usize) {
    let mut cuts: HashMap<usize, HashMap<usize, Vec<Cut>>> = HashMap::new();
    let mut removed = 0;

    for glyph in glyphs {
        let center = glyph.bbox.center();
        if regions.iter().any(|r| r.contains(center)) {
            cuts.entry(glyph.source.op)
                .or_default()
                .entry(glyph.source.item)
                .or_default()
                .push(Cut {
                    byte: glyph.source.byte,
                    len: glyph.source.len,
                    displacement: glyph.displacement,
                });
            removed += 1;
        }
    }

    if cuts.is_empty() {
        return (operations, 0);
    }

    let mut rewritten = Vec::with_capacity(operations.len() + cuts.len() * 3);
    for (index, operation) in operations.into_iter().enumerate() {
        match cuts.get_mut(&index) {
            Some(items) => rewrite_operation(operation, items, &mut rewritten),
            None => rewritten.push(operation),
        }
    }

    (rewritten, removed)
}

fn rewrite_operation(
    operation: Operation,
    cuts: &mut HashMap<usize, Vec<Cut>>,
    out: &mut Vec<Operation>,
) {
    let Operation { operator, mut operands } = operation;

    let elements = match operator.as_str() {
        "Tj" | "'" if !operands.is_empty() => {
            if operator == "'" {
                out.push(Operation::new("T*", vec![]));
            }
            vec![operands.swap_remove(0)]
        }
        "\"" if operands.len() >= 3 => {
            let text = operands.swap_remove(2);
            let mut spacing = operands.into_iter();
            if let Some(aw) = spacing.next() {
                out.push(Operation::new("Tw", vec![aw]));
            }
            if let Some(ac) = spacing.next() {
                out.push(Operation::new("Tc", vec![ac]));
            }
            out.push(Operation::new("T*", vec![]));
            vec![text]
        }
        "TJ" => match operands.into_iter().next() {
            Some(Object::Array(items)) => items,
            _ => return,
        },
        _ => {
            out.push(Operation { operator, operands });
            return;
        }
    };

    let mut array = TjBuilder::default();
    for (item, element) in elements.into_iter().enumerate() {
        match (element, cuts.get_mut(&item)) {
            (Object::String(bytes, _), Some(item_cuts)) => {
                item_cuts.sort_by_key(|c| c.byte);
                let mut cursor = 0;
                for cut in item_cuts.iter() {
                    if cut.byte > cursor {
                        array.push_bytes(&bytes[cursor..cut.byte.min(bytes.len())]);
                    }
                    array.push_adjust(cut.displacement);
                    cursor = cursor.max(cut.byte + cut.len);
                }
                if cursor < bytes.len() {
                    array.push_bytes(&bytes[cursor..]);
                }
            }
            (Object::String(bytes, _), None) => array.push_bytes(&bytes),
            (Object::Integer(n), _) => {
                #[allow(clippy::cast_precision_loss)]
                array.push_adjust(n as f32);
            }
            (Object::Real(n), _) => array.push_adjust(n),
            _ => {}
        }
    }

    out.push(Operation::new("TJ", vec![Object::Array(array.finish())]));
}

/// Accumulates a `TJ` array, merging consecutive adjustments.
#[derive(Default)]
struct TjBuilder {
    items: Vec<Object>,
    adjust: f32,
}

impl TjBuilder {
    fn push_bytes(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.flush_adjust();
        self.items
            .push(Object::String(bytes.to_vec(), StringFormat::Hexadecimal));
    }

    fn push_adjust(&mut self, amount: f32) {
        self.adjust += amount;
    }

    fn flush_adjust(&mut self) {
        if self.adjust.abs() > 1e-3 {
            self.items.push(Object::Real(self.adjust));
        }
        self.adjust = 0.0;
    }

    fn finish(mut self) -> Vec<Object> {
        self.flush_adjust();
        self.items
    }
}

/// Operations that paint `regions` with `color`, in user space.
pub fn fill_regions(regions: &[BoundingBox], media_box: &MediaBox, color: TextColor) -> Vec<Operation> {
    if regions.is_empty() {
        return Vec::new();
    }

    let mut operations = vec![
        Operation::new("q", vec![]),
        Operation::new(
            "rg",
            vec![Object::Real(color.r), Object::Real(color.g), Object::Real(color.b)],
        ),
    ];
    for region in regions {
        let (x, y) = media_box.to_user_space(Point::new(region.x0, region.y1));
        operations.push(Operation::new(
            "re",
            vec![
                Object::Real(x),
                Object::Real(y),
                Object::Real(region.width()),
                Object::Real(region.height()),
            ],
        ));
        operations.push(Operation::new("f", vec![]));
    }
    operations.push(Operation::new("Q", vec![]));
    operations
}
