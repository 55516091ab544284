//! Replacing original text runs with their translations.
//!
//! Rewriting a page happens in two steps. [`PageRewriter::plan_page`] is
//! pure: it decides which elements change, how large their translation is
//! drawn and where. [`PageRewriter::apply_plan`] then removes every affected
//! run in a single redaction pass and draws the translations.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use super::element::PageData;
use super::fit::{FitEstimator, FitResult};
use super::font::{FontResolver, TargetFont};
use crate::config::{AppConfig, Lang, TextColor};
use crate::error::Result;
use crate::pdf::{BoundingBox, DocumentWriter, Point};

/// One translated run to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Replacement {
    /// Index of the source element in `PageData::elements`
    pub element: usize,
    pub text: String,
    /// Baseline start in top-left page coordinates
    pub point: Point,
    pub font: TargetFont,
    pub size: f32,
    pub color: TextColor,
    pub fit: FitResult,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PagePlan {
    pub page_number: usize,
    pub redactions: Vec<BoundingBox>,
    pub replacements: Vec<Replacement>,
}

impl PagePlan {
    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }
}

/// What happened to a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PageOutcome {
    pub page_number: usize,
    pub replacements: usize,
    pub glyphs_removed: usize,
    pub inserted: usize,
    pub insertion_failures: usize,
}

pub struct PageRewriter {
    estimator: FitEstimator,
    resolver: FontResolver,
    target: Lang,
    preserve_formatting: bool,
    /// Baseline offset below the box top, as a fraction of the font size
    baseline_factor: f32,
}

impl PageRewriter {
    pub fn new(estimator: FitEstimator, resolver: FontResolver, target: Lang, preserve_formatting: bool) -> Self {
        Self {
            estimator,
            resolver,
            target,
            preserve_formatting,
            baseline_factor: 0.8,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            estimator: FitEstimator::from_config(&config.layout)?,
            resolver: FontResolver::default(),
            target: config.target_lang.clone(),
            preserve_formatting: config.preserve_formatting,
            baseline_factor: config.layout.baseline_factor,
        })
    }

    /// Decide the replacements of a page.
    ///
    /// `translations` maps trimmed original text to its translation. Elements
    /// without an entry, or whose translation equals the original, are left
    /// alone.
    pub fn plan_page(&self, page: &PageData, translations: &HashMap<String, String>) -> PagePlan {
        let mut plan = PagePlan {
            page_number: page.page_number,
            ..PagePlan::default()
        };

        for (index, element) in page.elements.iter().enumerate() {
            let key = element.key();
            let Some(translated) = translations.get(key) else {
                continue;
            };
            if translated.trim().is_empty() || translated == key {
                continue;
            }

            let fit = self
                .estimator
                .estimate(key, translated, element.bbox.width(), element.size);
            let size = if self.preserve_formatting {
                fit.adjusted_font_size
            } else {
                element.size
            };
            let font = self.resolver.resolve(&element.font, &self.target);

            plan.redactions.push(element.bbox);
            plan.replacements.push(Replacement {
                element: index,
                text: translated.clone(),
                point: Point::new(element.bbox.x0, element.bbox.y0 + size * self.baseline_factor),
                font,
                size,
                color: TextColor::from_packed(element.color),
                fit,
            });
        }

        plan
    }

    /// Apply a plan: redact every region at once, then draw each
    /// replacement. Failed insertions are logged and counted, never fatal.
    pub fn apply_plan<D: DocumentWriter + ?Sized>(&self, doc: &mut D, plan: &PagePlan) -> Result<PageOutcome> {
        let page = plan.page_number;
        let mut outcome = PageOutcome {
            page_number: page,
            replacements: plan.replacements.len(),
            ..PageOutcome::default()
        };
        if plan.is_empty() {
            return Ok(outcome);
        }

        for region in &plan.redactions {
            doc.redact(page, *region)?;
        }
        outcome.glyphs_removed = doc.apply_redactions(page)?;

        for replacement in &plan.replacements {
            match doc.insert_text(
                page,
                replacement.point,
                &replacement.text,
                replacement.font.standard_font(),
                replacement.size,
                replacement.color,
            ) {
                Ok(()) => outcome.inserted += 1,
                Err(e) => {
                    warn!(
                        "Page {}: failed to insert {:?}: {}",
                        page, replacement.text, e
                    );
                    outcome.insertion_failures += 1;
                }
            }
        }

        debug!(
            "Page {}: {} replacements, {} glyphs removed",
            page, outcome.replacements, outcome.glyphs_removed
        );
        Ok(outcome)
    }

    pub fn rewrite_page<D: DocumentWriter + ?Sized>(
        &self,
        doc: &mut D,
        page: &PageData,
        translations: &HashMap<String, String>,
    ) -> Result<PageOutcome> {
        let plan = self.plan_page(page, translations);
        self.apply_plan(doc, &plan)
    }
}

impl Default for PageRewriter {
    fn default() -> Self {
        Self::new(FitEstimator::default(), FontResolver::default(), Lang::default(), true)
    }
}
