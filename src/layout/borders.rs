//! Border, shading and line resolvers.
//!
//! Widths here are *effective* widths: a border that is missing, hidden or
//! styled `None` takes no space. Drawing centres each border line on the edge
//! of the box it belongs to.

use super::area::Rectangle;
use crate::graphics::{Dash, Graphics, Pen, Quadrant};
use crate::model::{Border, BorderSide, Borders, LineFormat, RoundedCorner, Shading};

/// Width a border occupies.
pub fn effective_width(border: Option<&Border>) -> f64 {
    match border {
        Some(b) if b.is_visible() => b.width,
        _ => 0.0,
    }
}

/// Space between the box edge and its content on `side`: the border width
/// plus its distance, or nothing when that side has no visible border.
pub fn offset(borders: &Borders, side: BorderSide) -> f64 {
    let width = effective_width(borders.get(side));
    if width > 0.0 {
        width + borders.distance(side)
    } else {
        0.0
    }
}

pub fn pen(border: &Border) -> Pen {
    Pen {
        width: border.width,
        color: border.color,
        dash: Dash::from(border.style),
    }
}

pub fn line_pen(line: &LineFormat) -> Pen {
    Pen {
        width: line.width,
        color: line.color,
        dash: Dash::from(line.dash_style),
    }
}

/// The two sides that meet at a rounded corner.
pub fn corner_sides(corner: RoundedCorner) -> Option<(BorderSide, BorderSide)> {
    match corner {
        RoundedCorner::None => None,
        RoundedCorner::TopLeft => Some((BorderSide::Top, BorderSide::Left)),
        RoundedCorner::TopRight => Some((BorderSide::Top, BorderSide::Right)),
        RoundedCorner::BottomLeft => Some((BorderSide::Bottom, BorderSide::Left)),
        RoundedCorner::BottomRight => Some((BorderSide::Bottom, BorderSide::Right)),
    }
}

/// Make the horizontal and vertical border meeting at a rounded corner
/// identical, copying whichever one is visible onto the other.
pub fn equalize_rounded_corner(borders: &mut Borders, corner: RoundedCorner) {
    let Some((horizontal, vertical)) = corner_sides(corner) else {
        return;
    };
    let h = borders.get(horizontal).copied().filter(Border::is_visible);
    let v = borders.get(vertical).copied().filter(Border::is_visible);
    match (h, v) {
        (Some(h), None) => borders.set(vertical, Some(h)),
        (None, Some(v)) => borders.set(horizontal, Some(v)),
        _ => {}
    }
}

pub fn render_shading(g: &mut dyn Graphics, shading: Option<&Shading>, rect: Rectangle) {
    if let Some(s) = shading.filter(|s| s.visible) {
        g.draw_rect(rect, None, Some(s.color));
    }
}

/// Draw the borders of a box. Top and bottom are skipped for the parts of a
/// split paragraph that do not start or end in this box.
pub fn render_box(
    g: &mut dyn Graphics,
    borders: &Borders,
    rect: Rectangle,
    draw_top: bool,
    draw_bottom: bool,
) {
    render_sides(g, borders, rect, draw_top, draw_bottom, RoundedCorner::None);
}

/// Draw cell borders, replacing the rounded corner (if any) with an arc.
pub fn render_cell_borders(
    g: &mut dyn Graphics,
    borders: &Borders,
    rect: Rectangle,
    corner: RoundedCorner,
) {
    render_sides(g, borders, rect, true, true, corner);
}

/// Radius of a rounded cell corner.
pub fn corner_radius(rect: Rectangle) -> f64 {
    (rect.width.min(rect.height) / 4.0).min(10.0)
}

fn render_sides(
    g: &mut dyn Graphics,
    borders: &Borders,
    rect: Rectangle,
    draw_top: bool,
    draw_bottom: bool,
    corner: RoundedCorner,
) {
    let r = if corner == RoundedCorner::None {
        0.0
    } else {
        corner_radius(rect)
    };
    let trim = |c: RoundedCorner| if c == corner { r } else { 0.0 };
    let (x0, y0, x1, y1) = (rect.x, rect.y, rect.right(), rect.bottom());

    let visible = |side| borders.get(side).filter(|b: &&Border| b.is_visible());
    if let Some(b) = visible(BorderSide::Top).filter(|_| draw_top) {
        let y = y0 + b.width / 2.0;
        g.draw_line(
            &pen(b),
            x0 + trim(RoundedCorner::TopLeft),
            y,
            x1 - trim(RoundedCorner::TopRight),
            y,
        );
    }
    if let Some(b) = visible(BorderSide::Bottom).filter(|_| draw_bottom) {
        let y = y1 - b.width / 2.0;
        g.draw_line(
            &pen(b),
            x0 + trim(RoundedCorner::BottomLeft),
            y,
            x1 - trim(RoundedCorner::BottomRight),
            y,
        );
    }
    if let Some(b) = visible(BorderSide::Left) {
        let x = x0 + b.width / 2.0;
        g.draw_line(
            &pen(b),
            x,
            y0 + trim(RoundedCorner::TopLeft),
            x,
            y1 - trim(RoundedCorner::BottomLeft),
        );
    }
    if let Some(b) = visible(BorderSide::Right) {
        let x = x1 - b.width / 2.0;
        g.draw_line(
            &pen(b),
            x,
            y0 + trim(RoundedCorner::TopRight),
            x,
            y1 - trim(RoundedCorner::BottomRight),
        );
    }

    if r > 0.0 {
        let Some((horizontal, _)) = corner_sides(corner) else {
            return;
        };
        if let Some(b) = visible(horizontal) {
            let (cx, cy, quadrant) = match corner {
                RoundedCorner::TopLeft => (x0 + r, y0 + r, Quadrant::TopLeft),
                RoundedCorner::TopRight => (x1 - r, y0 + r, Quadrant::TopRight),
                RoundedCorner::BottomLeft => (x0 + r, y1 - r, Quadrant::BottomLeft),
                _ => (x1 - r, y1 - r, Quadrant::BottomRight),
            };
            g.draw_quarter_arc(&pen(b), cx, cy, r - b.width / 2.0, quadrant);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::{DisplayList, DrawOp};
    use crate::model::{BorderStyle, Color};

    #[test]
    fn hidden_borders_take_no_space() {
        let mut borders = Borders::uniform(Border::new(2.0, Color::BLACK));
        borders.distance_from_top = 3.0;
        assert_eq!(offset(&borders, BorderSide::Top), 5.0);
        borders.top = Some(Border {
            style: BorderStyle::None,
            ..Border::new(2.0, Color::BLACK)
        });
        assert_eq!(offset(&borders, BorderSide::Top), 0.0);
        assert_eq!(offset(&Borders::default(), BorderSide::Left), 0.0);
    }

    #[test]
    fn rounded_corner_copies_visible_border() {
        let mut borders = Borders {
            left: Some(Border::new(1.5, Color::RED)),
            ..Default::default()
        };
        equalize_rounded_corner(&mut borders, RoundedCorner::TopLeft);
        assert_eq!(borders.top, borders.left);
        assert!(borders.bottom.is_none());
    }

    #[test]
    fn split_box_skips_top_border() {
        let mut g = DisplayList::new();
        let borders = Borders::uniform(Border::new(1.0, Color::BLACK));
        render_box(&mut g, &borders, Rectangle::new(0.0, 0.0, 50.0, 20.0), false, true);
        let lines = g.ops.iter().filter(|op| matches!(op, DrawOp::Line { .. })).count();
        assert_eq!(lines, 3);
    }

    #[test]
    fn rounded_cell_corner_draws_an_arc() {
        let mut g = DisplayList::new();
        let borders = Borders::uniform(Border::new(1.0, Color::BLACK));
        let rect = Rectangle::new(0.0, 0.0, 40.0, 40.0);
        render_cell_borders(&mut g, &borders, rect, RoundedCorner::BottomRight);
        assert!(g
            .ops
            .iter()
            .any(|op| matches!(op, DrawOp::Arc { quadrant: Quadrant::BottomRight, .. })));
    }
}
