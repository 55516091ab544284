//! Choosing a replacement font for an extracted font name.

use serde::Serialize;

use crate::config::Lang;
use crate::pdf::StandardFont;

/// Fonts translated text is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TargetFont {
    TimesRoman,
    Helvetica,
    Arial,
    Courier,
}

impl TargetFont {
    pub const fn base_font(self) -> &'static str {
        match self {
            Self::TimesRoman => "Times-Roman",
            Self::Helvetica => "Helvetica",
            Self::Arial => "Arial",
            Self::Courier => "Courier",
        }
    }

    /// The standard font used to draw this target. Arial is metrically
    /// compatible with Helvetica and drawn as such.
    pub const fn standard_font(self) -> StandardFont {
        match self {
            Self::TimesRoman => StandardFont::TimesRoman,
            Self::Helvetica | Self::Arial => StandardFont::Helvetica,
            Self::Courier => StandardFont::Courier,
        }
    }
}

/// How a rule matches an extracted font name.
#[derive(Debug, Clone)]
pub enum FontMatcher {
    /// The whole name, case-sensitive
    Exact(&'static str),
    /// Any of the needles, case-insensitive
    ContainsAny(&'static [&'static str]),
}

impl FontMatcher {
    fn matches(&self, name: &str, lower: &str) -> bool {
        match self {
            Self::Exact(exact) => name == *exact,
            Self::ContainsAny(needles) => needles.iter().any(|n| lower.contains(n)),
        }
    }
}

/// Ordered `(matcher, font)` rules; the first match wins.
#[derive(Debug, Clone)]
pub struct FontResolver {
    rules: Vec<(FontMatcher, TargetFont)>,
    fallback: TargetFont,
}

impl Default for FontResolver {
    fn default() -> Self {
        Self {
            rules: vec![
                (FontMatcher::Exact("Times-Roman"), TargetFont::TimesRoman),
                (FontMatcher::Exact("Helvetica"), TargetFont::Helvetica),
                (FontMatcher::Exact("Arial"), TargetFont::Arial),
                (FontMatcher::Exact("Courier"), TargetFont::Courier),
                (FontMatcher::ContainsAny(&["times", "serif"]), TargetFont::TimesRoman),
                (FontMatcher::ContainsAny(&["helvetica", "arial"]), TargetFont::Helvetica),
                (FontMatcher::ContainsAny(&["courier", "mono"]), TargetFont::Courier),
            ],
            fallback: TargetFont::Helvetica,
        }
    }
}

impl FontResolver {
    pub fn new(rules: Vec<(FontMatcher, TargetFont)>, fallback: TargetFont) -> Self {
        Self { rules, fallback }
    }

    /// Resolve a font name. The language is accepted for script-specific
    /// rules; the Latin-script rules ignore it.
    pub fn resolve(&self, font_name: &str, _lang: &Lang) -> TargetFont {
        let lower = font_name.to_lowercase();
        self.rules
            .iter()
            .find(|(matcher, _)| matcher.matches(font_name, &lower))
            .map_or(self.fallback, |(_, font)| *font)
    }
}
