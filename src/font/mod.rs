//! # Font Management
//!
//! Resolves resolved [`Font`] values to font data and measures text with
//! real glyph metrics. The standard PDF fonts (Helvetica, Times, Courier)
//! need no embedding; custom TrueType fonts are parsed with ttf-parser and
//! embedded by the PDF backend.

pub mod metrics;

pub use metrics::StandardFontMetrics;

use crate::error::{FolioError, Result};
use crate::graphics::{FontMetrics, TextMeasurer};
use crate::model::{Document, Font};
use std::collections::HashMap;

/// A font registry that maps family + bold + italic to font data.
pub struct FontRegistry {
    fonts: HashMap<FontKey, FontData>,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct FontKey {
    pub family: String,
    pub bold: bool,
    pub italic: bool,
}

#[derive(Debug, Clone)]
pub enum FontData {
    /// One of the standard PDF fonts. No embedding needed.
    Standard(StandardFont),
    /// A TrueType/OpenType font that needs to be embedded.
    Custom {
        data: Vec<u8>,
        metrics: CustomFontMetrics,
    },
}

/// Parsed metrics from a TrueType/OpenType font via ttf-parser.
#[derive(Debug, Clone)]
pub struct CustomFontMetrics {
    pub units_per_em: u16,
    pub advance_widths: HashMap<char, u16>,
    pub default_advance: u16,
    pub ascender: i16,
    pub descender: i16,
    pub line_gap: i16,
}

impl CustomFontMetrics {
    /// Get the advance width of a character in points.
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        let w = self
            .advance_widths
            .get(&ch)
            .copied()
            .unwrap_or(self.default_advance);
        (w as f64 / self.units_per_em as f64) * font_size
    }

    /// Parse metrics from font data using ttf-parser.
    pub fn from_font_data(data: &[u8]) -> Option<Self> {
        let face = ttf_parser::Face::parse(data, 0).ok()?;
        let units_per_em = face.units_per_em();

        let mut advance_widths = HashMap::new();
        let mut default_advance = 0u16;

        for code in 32u32..=0xFFFF {
            if let Some(ch) = char::from_u32(code) {
                if let Some(glyph_id) = face.glyph_index(ch) {
                    let advance = face.glyph_hor_advance(glyph_id).unwrap_or(0);
                    advance_widths.insert(ch, advance);
                    if ch == ' ' {
                        default_advance = advance;
                    }
                }
            }
        }

        if default_advance == 0 {
            default_advance = units_per_em / 2;
        }

        Some(CustomFontMetrics {
            units_per_em,
            advance_widths,
            default_advance,
            ascender: face.ascender(),
            descender: face.descender(),
            line_gap: face.line_gap(),
        })
    }
}

/// The standard PDF fonts the engine measures without embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
}

impl StandardFont {
    /// The PDF name for this font.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::HelveticaOblique => "Helvetica-Oblique",
            Self::HelveticaBoldOblique => "Helvetica-BoldOblique",
            Self::TimesRoman => "Times-Roman",
            Self::TimesBold => "Times-Bold",
            Self::TimesItalic => "Times-Italic",
            Self::TimesBoldItalic => "Times-BoldItalic",
            Self::Courier => "Courier",
            Self::CourierBold => "Courier-Bold",
            Self::CourierOblique => "Courier-Oblique",
            Self::CourierBoldOblique => "Courier-BoldOblique",
        }
    }
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

const DEFAULT_FAMILY: &str = "Helvetica";

/// Fold common family aliases onto the standard families.
fn canonical_family(family: &str) -> &str {
    match family.to_ascii_lowercase().as_str() {
        "helvetica" | "arial" | "sans-serif" => "Helvetica",
        "times" | "times new roman" | "times-roman" | "serif" => "Times",
        "courier" | "courier new" | "monospace" => "Courier",
        _ => family,
    }
}

impl FontRegistry {
    pub fn new() -> Self {
        let mut fonts = HashMap::new();

        let standard_mappings = [
            (("Helvetica", false, false), StandardFont::Helvetica),
            (("Helvetica", true, false), StandardFont::HelveticaBold),
            (("Helvetica", false, true), StandardFont::HelveticaOblique),
            (("Helvetica", true, true), StandardFont::HelveticaBoldOblique),
            (("Times", false, false), StandardFont::TimesRoman),
            (("Times", true, false), StandardFont::TimesBold),
            (("Times", false, true), StandardFont::TimesItalic),
            (("Times", true, true), StandardFont::TimesBoldItalic),
            (("Courier", false, false), StandardFont::Courier),
            (("Courier", true, false), StandardFont::CourierBold),
            (("Courier", false, true), StandardFont::CourierOblique),
            (("Courier", true, true), StandardFont::CourierBoldOblique),
        ];

        for ((family, bold, italic), font) in standard_mappings {
            fonts.insert(
                FontKey {
                    family: family.to_string(),
                    bold,
                    italic,
                },
                FontData::Standard(font),
            );
        }

        Self { fonts }
    }

    /// Resolve a font to its registry key, falling back to Helvetica.
    ///
    /// A family given as the literal string "null" is treated as unset.
    /// Known approximation: an upstream style could legitimately carry that
    /// name, but it is read as "no font chosen".
    pub fn resolve_key(&self, font: &Font) -> FontKey {
        let name = font.name.trim();
        let family = if name.is_empty() || name == "null" {
            DEFAULT_FAMILY
        } else {
            canonical_family(name)
        };
        let key = FontKey {
            family: family.to_string(),
            bold: font.bold,
            italic: font.italic,
        };
        if self.fonts.contains_key(&key) {
            return key;
        }
        // Try the upright regular face of a custom family before giving up.
        let regular = FontKey {
            family: family.to_string(),
            bold: false,
            italic: false,
        };
        if self.fonts.contains_key(&regular) {
            return regular;
        }
        FontKey {
            family: DEFAULT_FAMILY.to_string(),
            bold: font.bold,
            italic: font.italic,
        }
    }

    pub fn get(&self, key: &FontKey) -> &FontData {
        static FALLBACK: FontData = FontData::Standard(StandardFont::Helvetica);
        self.fonts.get(key).unwrap_or(&FALLBACK)
    }

    /// Register a custom font.
    pub fn register(
        &mut self,
        family: &str,
        bold: bool,
        italic: bool,
        data: Vec<u8>,
    ) -> Result<()> {
        let metrics = CustomFontMetrics::from_font_data(&data).ok_or_else(|| {
            FolioError::Font(format!("'{family}' is not a TrueType/OpenType font"))
        })?;
        self.fonts.insert(
            FontKey {
                family: family.to_string(),
                bold,
                italic,
            },
            FontData::Custom { data, metrics },
        );
        Ok(())
    }
}

/// Shared font context used by layout and the PDF backend.
pub struct FontContext {
    registry: FontRegistry,
}

impl Default for FontContext {
    fn default() -> Self {
        Self::new()
    }
}

impl FontContext {
    pub fn new() -> Self {
        Self {
            registry: FontRegistry::new(),
        }
    }

    /// A context with the document's custom fonts registered.
    pub fn for_document(document: &Document) -> Result<Self> {
        let mut ctx = Self::new();
        for entry in &document.fonts {
            let data = crate::image_loader::read_source_bytes(&entry.src)
                .map_err(|e| FolioError::Font(format!("font '{}': {}", entry.family, e)))?;
            ctx.registry
                .register(&entry.family, entry.bold, entry.italic, data)?;
        }
        Ok(ctx)
    }

    pub fn resolve(&self, font: &Font) -> (FontKey, &FontData) {
        let key = self.registry.resolve_key(font);
        let data = self.registry.get(&key);
        (key, data)
    }

    /// Access the underlying font registry.
    pub fn registry(&self) -> &FontRegistry {
        &self.registry
    }

    /// Access the underlying font registry mutably.
    pub fn registry_mut(&mut self) -> &mut FontRegistry {
        &mut self.registry
    }
}

impl TextMeasurer for FontContext {
    fn measure_text(&self, text: &str, font: &Font) -> f64 {
        let size = font.effective_size();
        match self.resolve(font).1 {
            FontData::Standard(std_font) => std_font.metrics().measure_string(text, size, 0.0),
            FontData::Custom { metrics, .. } => {
                text.chars().map(|ch| metrics.char_width(ch, size)).sum()
            }
        }
    }

    fn metrics(&self, font: &Font) -> FontMetrics {
        let size = font.size;
        let (ascender, descender, line_gap, units) = match self.resolve(font).1 {
            FontData::Standard(std_font) => {
                let m = std_font.metrics();
                (m.ascender, m.descender, m.line_gap, 1000.0)
            }
            FontData::Custom { metrics, .. } => (
                metrics.ascender,
                metrics.descender,
                metrics.line_gap,
                metrics.units_per_em as f64,
            ),
        };
        let ascent = ascender as f64 * size / units;
        let descent = descender.unsigned_abs() as f64 * size / units;
        FontMetrics {
            ascent,
            descent,
            line_spacing: ascent + descent + line_gap as f64 * size / units,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn font(name: &str, bold: bool) -> Font {
        Font {
            bold,
            ..Font::new(name, 12.0)
        }
    }

    #[test]
    fn helvetica_space_width() {
        let ctx = FontContext::new();
        let w = ctx.measure_text(" ", &font("Helvetica", false));
        assert!((w - 3.336).abs() < 0.001);
    }

    #[test]
    fn bold_is_wider() {
        let ctx = FontContext::new();
        let regular = ctx.measure_text("A", &font("Helvetica", false));
        let bold = ctx.measure_text("A", &font("Helvetica", true));
        assert!(bold > regular);
    }

    #[test]
    fn unknown_family_falls_back_to_helvetica() {
        let ctx = FontContext::new();
        let w1 = ctx.measure_text("Abc", &font("Helvetica", false));
        let w2 = ctx.measure_text("Abc", &font("UnknownFont", false));
        assert!((w1 - w2).abs() < 0.001);
    }

    #[test]
    fn null_font_name_reads_as_unset() {
        let ctx = FontContext::new();
        let (key, _) = ctx.resolve(&font("null", false));
        assert_eq!(key.family, "Helvetica");
    }

    #[test]
    fn aliases_map_to_standard_families() {
        let ctx = FontContext::new();
        let (key, data) = ctx.resolve(&font("Times New Roman", true));
        assert_eq!(key.family, "Times");
        assert!(matches!(data, FontData::Standard(StandardFont::TimesBold)));
    }

    #[test]
    fn line_spacing_exceeds_size() {
        let ctx = FontContext::new();
        let m = ctx.metrics(&font("Helvetica", false));
        assert!(m.line_spacing > 12.0 && m.line_spacing < 15.0);
        assert!((m.ascent + m.descent - 13.404).abs() < 0.01);
    }

    #[test]
    fn garbage_font_data_is_rejected() {
        let mut ctx = FontContext::new();
        let err = ctx.registry_mut().register("Bad", false, false, vec![1, 2, 3]);
        assert!(err.is_err());
    }
}
