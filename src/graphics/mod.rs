//! # Measurement and Drawing Service
//!
//! The engine never touches pixels or files. It measures text through a
//! [`TextMeasurer`] and draws through a [`Graphics`] surface. Coordinates are
//! in points with the origin at the top-left corner of the page and y growing
//! downward; backends flip as needed.
//!
//! [`DisplayList`] records every call and is what the tests inspect.

use crate::layout::area::Rectangle;
use crate::model::{Barcode, BorderStyle, Chart, Color, DashStyle, Font, LinkTarget};
use serde::Serialize;

/// Vertical font metrics in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    pub ascent: f64,
    /// Positive distance below the baseline.
    pub descent: f64,
    /// Single line spacing (ascent + descent + line gap).
    pub line_spacing: f64,
}

/// Pure text measurement.
pub trait TextMeasurer {
    /// Advance width of `text` drawn in `font`.
    fn measure_text(&self, text: &str, font: &Font) -> f64;
    fn metrics(&self, font: &Font) -> FontMetrics;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Dash {
    #[default]
    Solid,
    Dot,
    Dash,
    LongDash,
    DashDot,
    DashDotDot,
}

impl Dash {
    /// Dash array in multiples of the line width.
    pub fn pattern(self) -> &'static [f64] {
        match self {
            Dash::Solid => &[],
            Dash::Dot => &[1.0, 1.0],
            Dash::Dash => &[3.0, 1.0],
            Dash::LongDash => &[8.0, 3.0],
            Dash::DashDot => &[3.0, 1.0, 1.0, 1.0],
            Dash::DashDotDot => &[3.0, 1.0, 1.0, 1.0, 1.0, 1.0],
        }
    }
}

impl From<BorderStyle> for Dash {
    fn from(style: BorderStyle) -> Self {
        match style {
            BorderStyle::None | BorderStyle::Single => Dash::Solid,
            BorderStyle::Dot => Dash::Dot,
            BorderStyle::DashSmallGap => Dash::Dash,
            BorderStyle::DashLargeGap => Dash::LongDash,
            BorderStyle::DashDot => Dash::DashDot,
            BorderStyle::DashDotDot => Dash::DashDotDot,
        }
    }
}

impl From<DashStyle> for Dash {
    fn from(style: DashStyle) -> Self {
        match style {
            DashStyle::Solid => Dash::Solid,
            DashStyle::Dash => Dash::Dash,
            DashStyle::Dot => Dash::Dot,
            DashStyle::DashDot => Dash::DashDot,
            DashStyle::DashDotDot => Dash::DashDotDot,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pen {
    pub width: f64,
    #[serde(skip)]
    pub color: Color,
    pub dash: Dash,
}

impl Pen {
    pub fn new(width: f64, color: Color) -> Self {
        Self {
            width,
            color,
            dash: Dash::Solid,
        }
    }
}

/// Which quarter of a circle a rounded corner traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Quadrant {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Content whose drawing is delegated wholesale to the backend.
#[derive(Debug, Clone, Copy)]
pub enum Embedded<'a> {
    Chart(&'a Chart),
    Barcode(&'a Barcode),
}

/// A drawing surface. Pages are opened and closed explicitly.
pub trait Graphics {
    fn begin_page(&mut self, width: f64, height: f64);
    fn end_page(&mut self);

    /// Draw `text` with its baseline at `y`.
    fn draw_text(&mut self, text: &str, font: &Font, x: f64, y: f64);
    fn draw_line(&mut self, pen: &Pen, x1: f64, y1: f64, x2: f64, y2: f64);
    fn draw_rect(&mut self, rect: Rectangle, pen: Option<&Pen>, fill: Option<Color>);
    /// Stroke a quarter circle of radius `r` around (`cx`, `cy`).
    fn draw_quarter_arc(&mut self, pen: &Pen, cx: f64, cy: f64, r: f64, quadrant: Quadrant);
    fn draw_image(&mut self, source: &str, rect: Rectangle);
    fn draw_embedded(&mut self, content: Embedded<'_>, rect: Rectangle);
    fn add_link(&mut self, rect: Rectangle, target: &LinkTarget);

    fn save_state(&mut self);
    fn restore_state(&mut self);
    /// Concatenate an affine matrix `[a b c d e f]` in page coordinates.
    fn transform(&mut self, matrix: [f64; 6]);
}

/// One recorded drawing call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op")]
pub enum DrawOp {
    BeginPage {
        width: f64,
        height: f64,
    },
    EndPage,
    Text {
        text: String,
        font: String,
        size: f64,
        x: f64,
        y: f64,
        #[serde(skip)]
        color: Color,
    },
    Line {
        pen: Pen,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
    },
    Rect {
        rect: Rectangle,
        pen: Option<Pen>,
        #[serde(skip)]
        fill: Option<Color>,
    },
    Arc {
        pen: Pen,
        cx: f64,
        cy: f64,
        r: f64,
        quadrant: Quadrant,
    },
    Image {
        source: String,
        rect: Rectangle,
    },
    Embedded {
        kind: String,
        rect: Rectangle,
    },
    Link {
        rect: Rectangle,
        target: String,
    },
    Save,
    Restore,
    Transform {
        matrix: [f64; 6],
    },
}

/// A [`Graphics`] implementation that records operations in order.
#[derive(Debug, Default)]
pub struct DisplayList {
    pub ops: Vec<DrawOp>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text runs with their x and baseline positions.
    pub fn texts(&self) -> Vec<(&str, f64, f64)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, x, y, .. } => Some((text.as_str(), *x, *y)),
                _ => None,
            })
            .collect()
    }

    /// All text on the recorded pages joined with single spaces.
    pub fn joined_text(&self) -> String {
        self.texts()
            .iter()
            .map(|(t, _, _)| *t)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn page_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::BeginPage { .. }))
            .count()
    }
}

impl Graphics for DisplayList {
    fn begin_page(&mut self, width: f64, height: f64) {
        self.ops.push(DrawOp::BeginPage { width, height });
    }

    fn end_page(&mut self) {
        self.ops.push(DrawOp::EndPage);
    }

    fn draw_text(&mut self, text: &str, font: &Font, x: f64, y: f64) {
        self.ops.push(DrawOp::Text {
            text: text.to_string(),
            font: font.name.clone(),
            size: font.effective_size(),
            x,
            y,
            color: font.color,
        });
    }

    fn draw_line(&mut self, pen: &Pen, x1: f64, y1: f64, x2: f64, y2: f64) {
        self.ops.push(DrawOp::Line {
            pen: *pen,
            x1,
            y1,
            x2,
            y2,
        });
    }

    fn draw_rect(&mut self, rect: Rectangle, pen: Option<&Pen>, fill: Option<Color>) {
        self.ops.push(DrawOp::Rect {
            rect,
            pen: pen.copied(),
            fill,
        });
    }

    fn draw_quarter_arc(&mut self, pen: &Pen, cx: f64, cy: f64, r: f64, quadrant: Quadrant) {
        self.ops.push(DrawOp::Arc {
            pen: *pen,
            cx,
            cy,
            r,
            quadrant,
        });
    }

    fn draw_image(&mut self, source: &str, rect: Rectangle) {
        self.ops.push(DrawOp::Image {
            source: source.to_string(),
            rect,
        });
    }

    fn draw_embedded(&mut self, content: Embedded<'_>, rect: Rectangle) {
        let kind = match content {
            Embedded::Chart(c) => format!("chart:{}", c.chart_type),
            Embedded::Barcode(b) => format!("barcode:{}", b.barcode_type),
        };
        self.ops.push(DrawOp::Embedded { kind, rect });
    }

    fn add_link(&mut self, rect: Rectangle, target: &LinkTarget) {
        let target = match target {
            LinkTarget::Url(u) => u.clone(),
            LinkTarget::Bookmark(b) => format!("#{b}"),
        };
        self.ops.push(DrawOp::Link { rect, target });
    }

    fn save_state(&mut self) {
        self.ops.push(DrawOp::Save);
    }

    fn restore_state(&mut self) {
        self.ops.push(DrawOp::Restore);
    }

    fn transform(&mut self, matrix: [f64; 6]) {
        self.ops.push(DrawOp::Transform { matrix });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_list_records_in_order() {
        let mut g = DisplayList::new();
        g.begin_page(100.0, 200.0);
        g.draw_text("Hi", &Font::default(), 10.0, 20.0);
        g.draw_rect(Rectangle::new(0.0, 0.0, 5.0, 5.0), None, Some(Color::RED));
        g.end_page();
        assert_eq!(g.page_count(), 1);
        assert_eq!(g.texts(), vec![("Hi", 10.0, 20.0)]);
        assert!(matches!(g.ops.last(), Some(DrawOp::EndPage)));
    }

    #[test]
    fn border_styles_map_to_dashes() {
        assert_eq!(Dash::from(BorderStyle::Dot), Dash::Dot);
        assert!(Dash::from(BorderStyle::Single).pattern().is_empty());
    }
}
