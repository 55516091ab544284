//! Page geometry.
//!
//! # Coordinate System
//!
//! PDF user space has a **bottom-left origin** (Y grows upward), while every
//! box and point this crate exposes uses a **top-left origin** (Y grows
//! downward) relative to the page's MediaBox:
//! ```text
//! top_x = pdf_x - media_box.x0
//! top_y = media_box.y1 - pdf_y
//! ```

use lopdf::{Document, Object};
use serde::{Deserialize, Serialize};

/// Axis-aligned box in top-left page coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BoundingBox {
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Box enclosing a mupdf quad
    pub fn from_quad(quad: &mupdf::Quad) -> Self {
        let xs = [quad.ul.x, quad.ur.x, quad.ll.x, quad.lr.x];
        let ys = [quad.ul.y, quad.ur.y, quad.ll.y, quad.lr.y];
        Self {
            x0: xs.iter().copied().fold(f32::INFINITY, f32::min),
            y0: ys.iter().copied().fold(f32::INFINITY, f32::min),
            x1: xs.iter().copied().fold(f32::NEG_INFINITY, f32::max),
            y1: ys.iter().copied().fold(f32::NEG_INFINITY, f32::max),
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Both extents are strictly positive.
    pub fn is_valid(&self) -> bool {
        self.x1 > self.x0 && self.y1 > self.y0
    }

    /// Convert to array format [x0, y0, x1, y1]
    pub const fn as_array(self) -> [f32; 4] {
        [self.x0, self.y0, self.x1, self.y1]
    }

    pub fn center(&self) -> Point {
        Point::new((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x0 && point.x <= self.x1 && point.y >= self.y0 && point.y <= self.y1
    }

    pub fn intersects(&self, other: &Self) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1 && self.y0 < other.y1 && other.y0 < self.y1
    }

    /// Smallest box containing both.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

/// Point in top-left page coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Affine transform `[a b c d e f]` using the PDF row-vector convention:
/// `x' = a*x + c*y + e`, `y' = b*x + d*y + f`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Matrix {
    pub const IDENTITY: Self = Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    pub const fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub const fn translation(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// `self × other`: apply `self` first, then `other`.
    #[must_use]
    pub fn then(&self, other: &Self) -> Self {
        Self {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Length of the transformed unit Y vector, i.e. the vertical scale.
    pub fn vertical_scale(&self) -> f32 {
        self.c.hypot(self.d)
    }

    /// Read six numeric operands (`cm`, `Tm`).
    pub fn from_operands(operands: &[Object]) -> Option<Self> {
        match operands {
            [a, b, c, d, e, f] => Some(Self::new(
                number(a)?,
                number(b)?,
                number(c)?,
                number(d)?,
                number(e)?,
                number(f)?,
            )),
            _ => None,
        }
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Read a numeric PDF object.
#[allow(clippy::cast_precision_loss)]
pub fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Page MediaBox in PDF user space (bottom-left origin).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl MediaBox {
    /// US Letter, used when a page tree declares no MediaBox at all
    pub const LETTER: Self = Self {
        x0: 0.0,
        y0: 0.0,
        x1: 612.0,
        y1: 792.0,
    };

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// User-space point to top-left page coordinates.
    pub fn to_top_left(&self, x: f32, y: f32) -> Point {
        Point::new(x - self.x0, self.y1 - y)
    }

    /// Top-left page point to user space.
    pub fn to_user_space(&self, point: Point) -> (f32, f32) {
        (point.x + self.x0, self.y1 - point.y)
    }

    pub fn page_box(&self) -> BoundingBox {
        BoundingBox::new(0.0, 0.0, self.width(), self.height())
    }

    /// Resolve the MediaBox of a page, walking up the page tree for inherited
    /// values. Indirect arrays are followed.
    pub fn of_page(doc: &Document, page: &Object) -> Self {
        Self::lookup(doc, page, 10).unwrap_or(Self::LETTER)
    }

    fn lookup(doc: &Document, node: &Object, depth: usize) -> Option<Self> {
        if depth == 0 {
            return None;
        }
        let dict = node.as_dict().ok()?;

        if let Ok(media_box) = dict.get(b"MediaBox") {
            let media_box = match media_box {
                Object::Reference(id) => doc.get_object(*id).ok()?,
                other => other,
            };
            if let Ok(values) = media_box.as_array()
                && let [x0, y0, x1, y1] = values.as_slice()
                && let (Some(x0), Some(y0), Some(x1), Some(y1)) =
                    (number(x0), number(y0), number(x1), number(y1))
            {
                // Normalize boxes given as [urx ury llx lly]
                return Some(Self {
                    x0: x0.min(x1),
                    y0: y0.min(y1),
                    x1: x0.max(x1),
                    y1: y0.max(y1),
                });
            }
        }

        let parent_id = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
        let parent = doc.get_object(parent_id).ok()?;
        Self::lookup(doc, parent, depth - 1)
    }
}
