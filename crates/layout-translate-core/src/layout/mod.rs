//! Layout model and layout-preserving rewriting.

mod element;
mod extract;
mod fit;
mod font;
mod rewrite;

pub use element::{DEFAULT_ASCENDER, DEFAULT_DESCENDER, PageData, TextElement};
pub use extract::LayoutExtractor;
pub use fit::{AverageCharWidth, FitEstimator, FitPolicy, FitResult, GlyphMetrics, TextMeasure};
pub use font::{FontMatcher, FontResolver, TargetFont};
pub use rewrite::{PageOutcome, PagePlan, PageRewriter, Replacement};
