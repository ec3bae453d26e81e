//! # Resolved Formats
//!
//! Fully inherited formatting snapshots. Whatever flattened the style chain
//! upstream has already done its job: every value here is final, and the
//! layout engine only reads it.

use serde::{Deserialize, Serialize};

/// Points per centimetre.
pub const POINTS_PER_CM: f64 = 72.0 / 2.54;

/// Convert centimetres to points.
pub fn cm(v: f64) -> f64 {
    v * POINTS_PER_CM
}

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64, // 0.0 - 1.0
    pub g: f64,
    pub b: f64,
    #[serde(default = "opaque")]
    pub a: f64,
}

fn opaque() -> f64 {
    1.0
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };
    pub const RED: Color = Color {
        r: 1.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const LIGHT_GRAY: Color = Color {
        r: 0.83,
        g: 0.83,
        b: 0.83,
        a: 1.0,
    };

    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn hex(hex: &str) -> Self {
        let hex = hex.trim_start_matches('#');
        let channel = |s: &str| u8::from_str_radix(s, 16).unwrap_or(0) as f64 / 255.0;
        match hex.len() {
            3 => Self::rgb(
                channel(&hex[0..1].repeat(2)),
                channel(&hex[1..2].repeat(2)),
                channel(&hex[2..3].repeat(2)),
            ),
            6 => Self::rgb(channel(&hex[0..2]), channel(&hex[2..4]), channel(&hex[4..6])),
            _ => Color::BLACK,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

// ── Character formatting ────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Underline {
    #[default]
    None,
    Single,
    Double,
    Dotted,
}

/// A resolved font.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Font {
    pub name: String,
    /// Size in points.
    pub size: f64,
    pub bold: bool,
    pub italic: bool,
    pub underline: Underline,
    pub color: Color,
    pub superscript: bool,
    pub subscript: bool,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            name: "Helvetica".to_string(),
            size: 10.0,
            bold: false,
            italic: false,
            underline: Underline::None,
            color: Color::BLACK,
            superscript: false,
            subscript: false,
        }
    }
}

impl Font {
    pub fn new(name: &str, size: f64) -> Self {
        Self {
            name: name.to_string(),
            size,
            ..Default::default()
        }
    }

    /// Scale applied to superscript and subscript glyphs.
    pub const SCRIPT_SCALE: f64 = 0.6;

    /// The size glyphs are actually drawn at.
    pub fn effective_size(&self) -> f64 {
        if self.superscript || self.subscript {
            self.size * Self::SCRIPT_SCALE
        } else {
            self.size
        }
    }

    /// Vertical baseline shift in points (negative moves up).
    pub fn baseline_shift(&self) -> f64 {
        if self.superscript {
            -self.size * 0.33
        } else if self.subscript {
            self.size * 0.15
        } else {
            0.0
        }
    }
}

// ── Paragraph formatting ────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineSpacingRule {
    #[default]
    Single,
    OnePtFive,
    Double,
    /// `line_spacing` is a minimum height in points.
    AtLeast,
    /// `line_spacing` is the exact height in points.
    Exactly,
    /// `line_spacing` is a multiplier.
    Multiple,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TabAlignment {
    #[default]
    Left,
    Center,
    Right,
    Decimal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TabLeader {
    #[default]
    Spaces,
    Dots,
    Dashes,
    Lines,
    Heavy,
    MiddleDot,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabStop {
    /// Offset from the left edge of the paragraph area.
    pub position: f64,
    #[serde(default)]
    pub alignment: TabAlignment,
    #[serde(default)]
    pub leader: TabLeader,
}

impl TabStop {
    pub fn new(position: f64, alignment: TabAlignment) -> Self {
        Self {
            position,
            alignment,
            leader: TabLeader::Spaces,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListType {
    #[default]
    BulletList1,
    BulletList2,
    BulletList3,
    /// 1. 2. 3.
    NumberList1,
    /// a. b. c.
    NumberList2,
    /// i. ii. iii.
    NumberList3,
}

impl ListType {
    pub fn is_numbered(self) -> bool {
        matches!(
            self,
            ListType::NumberList1 | ListType::NumberList2 | ListType::NumberList3
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListInfo {
    #[serde(default)]
    pub list_type: ListType,
    /// Continue numbering from the previous paragraph of the same list type.
    #[serde(default = "default_true")]
    pub continue_previous_list: bool,
}

fn default_true() -> bool {
    true
}

/// A fully resolved paragraph format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParagraphFormat {
    pub font: Font,
    pub alignment: Alignment,
    pub left_indent: f64,
    pub right_indent: f64,
    /// Added to the left indent on the first line (negative for hanging).
    pub first_line_indent: f64,
    pub space_before: f64,
    pub space_after: f64,
    pub line_spacing_rule: LineSpacingRule,
    pub line_spacing: f64,
    pub tab_stops: Vec<TabStop>,
    pub keep_together: bool,
    pub keep_with_next: bool,
    pub widow_control: bool,
    pub page_break_before: bool,
    pub borders: Borders,
    pub shading: Option<Shading>,
    pub list_info: Option<ListInfo>,
    /// Insert soft hyphens algorithmically when the document is normalised.
    pub hyphenate: bool,
}

impl Default for ParagraphFormat {
    fn default() -> Self {
        Self {
            font: Font::default(),
            alignment: Alignment::Left,
            left_indent: 0.0,
            right_indent: 0.0,
            first_line_indent: 0.0,
            space_before: 0.0,
            space_after: 0.0,
            line_spacing_rule: LineSpacingRule::Single,
            line_spacing: 0.0,
            tab_stops: Vec::new(),
            keep_together: false,
            keep_with_next: false,
            widow_control: true,
            page_break_before: false,
            borders: Borders::default(),
            shading: None,
            list_info: None,
            hyphenate: false,
        }
    }
}

// ── Borders and shading ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BorderStyle {
    None,
    #[default]
    Single,
    Dot,
    DashSmallGap,
    DashLargeGap,
    DashDot,
    DashDotDot,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Border {
    #[serde(default = "default_border_width")]
    pub width: f64,
    #[serde(default)]
    pub color: Color,
    #[serde(default)]
    pub style: BorderStyle,
    #[serde(default = "default_true")]
    pub visible: bool,
}

fn default_border_width() -> f64 {
    0.5
}

impl Border {
    pub fn new(width: f64, color: Color) -> Self {
        Self {
            width,
            color,
            style: BorderStyle::Single,
            visible: true,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible && self.style != BorderStyle::None && self.width > 0.0
    }
}

impl Default for Border {
    fn default() -> Self {
        Border::new(default_border_width(), Color::BLACK)
    }
}

/// Which edge of a bordered box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BorderSide {
    Top,
    Left,
    Bottom,
    Right,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Borders {
    pub top: Option<Border>,
    pub left: Option<Border>,
    pub bottom: Option<Border>,
    pub right: Option<Border>,
    pub distance_from_top: f64,
    pub distance_from_left: f64,
    pub distance_from_bottom: f64,
    pub distance_from_right: f64,
}

impl Borders {
    pub fn uniform(border: Border) -> Self {
        Self {
            top: Some(border),
            left: Some(border),
            bottom: Some(border),
            right: Some(border),
            ..Default::default()
        }
    }

    pub fn get(&self, side: BorderSide) -> Option<&Border> {
        match side {
            BorderSide::Top => self.top.as_ref(),
            BorderSide::Left => self.left.as_ref(),
            BorderSide::Bottom => self.bottom.as_ref(),
            BorderSide::Right => self.right.as_ref(),
        }
    }

    pub fn set(&mut self, side: BorderSide, border: Option<Border>) {
        match side {
            BorderSide::Top => self.top = border,
            BorderSide::Left => self.left = border,
            BorderSide::Bottom => self.bottom = border,
            BorderSide::Right => self.right = border,
        }
    }

    pub fn distance(&self, side: BorderSide) -> f64 {
        match side {
            BorderSide::Top => self.distance_from_top,
            BorderSide::Left => self.distance_from_left,
            BorderSide::Bottom => self.distance_from_bottom,
            BorderSide::Right => self.distance_from_right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shading {
    #[serde(default = "default_true")]
    pub visible: bool,
    pub color: Color,
}

impl Shading {
    pub fn new(color: Color) -> Self {
        Self {
            visible: true,
            color,
        }
    }
}

// ── Tables ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerticalAlignment {
    #[default]
    Top,
    Center,
    Bottom,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowHeightRule {
    #[default]
    Auto,
    AtLeast,
    Exactly,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowAlignment {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundedCorner {
    #[default]
    None,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableFormat {
    pub left_indent: f64,
    pub alignment: RowAlignment,
    pub keep_together: bool,
    pub keep_with_next: bool,
    pub space_before: f64,
    pub space_after: f64,
}

impl Default for TableFormat {
    fn default() -> Self {
        Self {
            left_indent: 0.0,
            alignment: RowAlignment::Left,
            keep_together: false,
            keep_with_next: false,
            space_before: 0.0,
            space_after: 0.0,
        }
    }
}

// ── Shapes ──────────────────────────────────────────────────────

/// Where a shape sits relative to its reference box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum ShapePosition {
    /// Explicit offset in points from the reference box's near edge.
    Offset(f64),
    #[default]
    Near,
    Center,
    Far,
    Inside,
    Outside,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelativeHorizontal {
    Character,
    #[default]
    Column,
    Margin,
    Page,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelativeVertical {
    Line,
    #[default]
    Paragraph,
    Margin,
    Page,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WrapStyle {
    #[default]
    TopBottom,
    Through,
    None,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WrapFormat {
    pub style: WrapStyle,
    pub distance_top: f64,
    pub distance_bottom: f64,
    pub distance_left: f64,
    pub distance_right: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DashStyle {
    #[default]
    Solid,
    Dash,
    Dot,
    DashDot,
    DashDotDot,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineFormat {
    #[serde(default = "default_border_width")]
    pub width: f64,
    #[serde(default)]
    pub color: Color,
    #[serde(default)]
    pub dash_style: DashStyle,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShapeFormat {
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub left: ShapePosition,
    pub top: ShapePosition,
    pub relative_horizontal: RelativeHorizontal,
    pub relative_vertical: RelativeVertical,
    pub wrap: WrapFormat,
    pub line: Option<LineFormat>,
    pub fill: Option<Color>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors() {
        let c = Color::hex("#ff0000");
        assert!((c.r - 1.0).abs() < 1e-9 && c.g == 0.0);
        let short = Color::hex("0f0");
        assert!((short.g - 1.0).abs() < 1e-9);
    }

    #[test]
    fn invisible_border_has_no_effect() {
        let mut b = Border::new(2.0, Color::BLACK);
        assert!(b.is_visible());
        b.style = BorderStyle::None;
        assert!(!b.is_visible());
    }

    #[test]
    fn paragraph_format_defaults_from_empty_json() {
        let format: ParagraphFormat = serde_json::from_str("{}").unwrap();
        assert!(format.widow_control);
        assert_eq!(format.font.size, 10.0);
        assert_eq!(format.line_spacing_rule, LineSpacingRule::Single);
    }

    #[test]
    fn script_fonts_shrink() {
        let font = Font {
            superscript: true,
            ..Font::new("Helvetica", 10.0)
        };
        assert!((font.effective_size() - 6.0).abs() < 1e-9);
        assert!(font.baseline_shift() < 0.0);
    }
}
