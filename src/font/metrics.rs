//! Glyph widths and vertical metrics for the standard PDF fonts, in
//! 1/1000 em units (Adobe AFM values). Oblique and italic faces reuse the
//! upright widths.

use super::StandardFont;

/// Widths for the printable ASCII range 0x20..=0x7E.
type AsciiWidths = [u16; 95];

#[rustfmt::skip]
static HELVETICA: AsciiWidths = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
static HELVETICA_BOLD: AsciiWidths = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

#[rustfmt::skip]
static TIMES_ROMAN: AsciiWidths = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

#[rustfmt::skip]
static TIMES_BOLD: AsciiWidths = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
    930, 722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778,
    611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333, 278, 333, 581, 500,
    333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500,
    556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520,
];

/// Metrics for one standard font face.
#[derive(Debug, Clone, Copy)]
pub struct StandardFontMetrics {
    widths: Option<&'static AsciiWidths>,
    /// Width used for every glyph of a monospaced face, and for glyphs
    /// missing from the table otherwise.
    default_width: u16,
    pub ascender: i16,
    pub descender: i16,
    pub line_gap: i16,
    serif: bool,
}

impl StandardFontMetrics {
    /// Advance width of a character, in 1/1000 em.
    pub fn char_units(&self, ch: char) -> u16 {
        let Some(widths) = self.widths else {
            return self.default_width;
        };
        let cp = ch as u32;
        if (0x20..=0x7E).contains(&cp) {
            return widths[(cp - 0x20) as usize];
        }
        match ch {
            '\u{a0}' => widths[0],
            '•' => 350,
            '€' => if self.serif { 500 } else { 556 },
            '©' | '®' => if self.serif { 760 } else { 737 },
            '™' => if self.serif { 980 } else { 1000 },
            '—' => 1000,
            '–' => if self.serif { 500 } else { 556 },
            '¬' => if self.serif { 564 } else { 584 },
            '\u{2018}' | '\u{2019}' => 333,
            '\u{201c}' | '\u{201d}' => if self.serif { 444 } else { 500 },
            '…' => 1000,
            _ => self.default_width,
        }
    }

    /// Advance width of a character in points.
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        self.char_units(ch) as f64 * font_size / 1000.0
    }

    pub fn measure_string(&self, text: &str, font_size: f64, letter_spacing: f64) -> f64 {
        text.chars()
            .map(|ch| self.char_width(ch, font_size) + letter_spacing)
            .sum()
    }
}

impl StandardFont {
    pub fn metrics(&self) -> StandardFontMetrics {
        use StandardFont::*;
        let (widths, default_width, serif) = match self {
            Helvetica | HelveticaOblique => (Some(&HELVETICA), 556, false),
            HelveticaBold | HelveticaBoldOblique => (Some(&HELVETICA_BOLD), 556, false),
            TimesRoman | TimesItalic => (Some(&TIMES_ROMAN), 500, true),
            TimesBold | TimesBoldItalic => (Some(&TIMES_BOLD), 500, true),
            Courier | CourierBold | CourierOblique | CourierBoldOblique => (None, 600, false),
        };
        let (ascender, descender, line_gap) = match self {
            Helvetica | HelveticaOblique | HelveticaBold | HelveticaBoldOblique => (905, -212, 33),
            TimesRoman | TimesItalic | TimesBold | TimesBoldItalic => (891, -216, 42),
            Courier | CourierBold | CourierOblique | CourierBoldOblique => (833, -300, 0),
        };
        StandardFontMetrics {
            widths,
            default_width,
            ascender,
            descender,
            line_gap,
            serif,
        }
    }
}
