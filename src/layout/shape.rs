//! Shapes: images, charts, barcodes and text frames.
//!
//! A shape formats to a fixed box. Images take their size from the file
//! (pixels at a resolution) scaled or overridden by the shape format; charts
//! and barcodes are opaque boxes handed to the backend; text frames run their
//! own flow over a single area.

use super::area::{Rectangle, TOLERANCE};
use super::borders::line_pen;
use super::formatter::format_in_area;
use super::info::{
    ElementAlignment, Floating, HorizontalReference, LayoutInfo, RenderInfo, VerticalReference,
};
use super::{render_block, FormatContext, RenderContext};
use crate::error::Result;
use crate::graphics::{Embedded, Graphics, Pen};
use crate::image_loader::{ImageCache, ImageFailure};
use crate::model::{
    Block, Color, Font, Image, RelativeHorizontal, RelativeVertical, ShapeFormat, ShapePosition,
    TextFrame, TextOrientation, WrapStyle, POINTS_PER_CM,
};

/// Side of the square drawn for an image that cannot be used.
pub const PLACEHOLDER_SIZE: f64 = 2.5 * POINTS_PER_CM;

/// Size of a chart, barcode or text frame without an explicit size.
const DEFAULT_SHAPE_SIZE: f64 = 72.0;

const PLACEHOLDER_FONT_SIZE: f64 = 6.0;

/// The box an image occupies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageExtent {
    pub width: f64,
    pub height: f64,
    pub failure: Option<ImageFailure>,
}

/// Resolve an image's drawn size. Unusable images get the placeholder size.
pub fn image_extent(cache: &ImageCache, image: &Image) -> ImageExtent {
    let probe = match cache.probe(&image.source) {
        Ok(probe) => probe,
        Err(failure) => {
            return ImageExtent {
                width: PLACEHOLDER_SIZE,
                height: PLACEHOLDER_SIZE,
                failure: Some(failure),
            }
        }
    };
    let dpi = image.resolution.or(probe.dpi).filter(|d| *d > 0.0).unwrap_or(72.0);
    let natural_w = probe.width_px as f64 * 72.0 / dpi;
    let natural_h = probe.height_px as f64 * 72.0 / dpi;

    let (width, height) = match (image.shape.width, image.shape.height) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) if image.lock_aspect_ratio => (w, w * natural_h / natural_w),
        (Some(w), None) => (w, natural_h * image.scale_height),
        (None, Some(h)) if image.lock_aspect_ratio => (h * natural_w / natural_h, h),
        (None, Some(h)) => (natural_w * image.scale_width, h),
        (None, None) => {
            let (sx, sy) = if image.lock_aspect_ratio {
                let s = if image.scale_width != 1.0 {
                    image.scale_width
                } else {
                    image.scale_height
                };
                (s, s)
            } else {
                (image.scale_width, image.scale_height)
            };
            (natural_w * sx, natural_h * sy)
        }
    };
    if width <= 0.0 || height <= 0.0 || !width.is_finite() || !height.is_finite() {
        return ImageExtent {
            width: PLACEHOLDER_SIZE,
            height: PLACEHOLDER_SIZE,
            failure: Some(ImageFailure::EmptySize),
        };
    }
    ImageExtent {
        width,
        height,
        failure: None,
    }
}

/// Draw an image into `rect`, or the failure placeholder: a light-gray box
/// with the reason in red.
pub fn draw_image(g: &mut dyn Graphics, image: &Image, extent: &ImageExtent, rect: Rectangle) {
    match extent.failure {
        None => g.draw_image(&image.source, rect),
        Some(failure) => {
            g.draw_rect(rect, Some(&Pen::new(0.5, Color::LIGHT_GRAY)), Some(Color::LIGHT_GRAY));
            let font = Font {
                size: PLACEHOLDER_FONT_SIZE,
                color: Color::RED,
                ..Font::default()
            };
            g.draw_text(
                &failure.to_string(),
                &font,
                rect.x + 2.0,
                rect.y + (rect.height + PLACEHOLDER_FONT_SIZE) / 2.0,
            );
        }
    }
}

/// A formatted shape.
#[derive(Debug, Clone)]
pub struct ShapeFormatInfo<'d> {
    /// The shape flows with the text and does not fit.
    pub is_empty: bool,
    pub width: f64,
    pub height: f64,
    /// Set when an image was replaced by its placeholder.
    pub failure: Option<ImageFailure>,
    /// Text frame content, formatted at the origin of the frame's inner box.
    pub content: Vec<RenderInfo<'d>>,
}

fn shape_format(block: &Block) -> Option<&ShapeFormat> {
    match block {
        Block::Image(i) => Some(&i.shape),
        Block::Chart(c) => Some(&c.shape),
        Block::Barcode(b) => Some(&b.shape),
        Block::TextFrame(f) => Some(&f.shape),
        _ => None,
    }
}

fn alignment_of(position: ShapePosition) -> (ElementAlignment, f64) {
    match position {
        ShapePosition::Offset(v) => (ElementAlignment::Near, v),
        ShapePosition::Near => (ElementAlignment::Near, 0.0),
        ShapePosition::Center => (ElementAlignment::Center, 0.0),
        ShapePosition::Far => (ElementAlignment::Far, 0.0),
        ShapePosition::Inside => (ElementAlignment::Inside, 0.0),
        ShapePosition::Outside => (ElementAlignment::Outside, 0.0),
    }
}

pub fn initial_layout(block: &Block) -> LayoutInfo {
    let Some(shape) = shape_format(block) else {
        return LayoutInfo::default();
    };
    let (horizontal_alignment, left) = alignment_of(shape.left);
    let (vertical_alignment, top) = alignment_of(shape.top);
    let mut layout = LayoutInfo {
        floating: match shape.wrap.style {
            WrapStyle::TopBottom => Floating::TopBottom,
            WrapStyle::Through | WrapStyle::None => Floating::None,
        },
        horizontal_reference: match shape.relative_horizontal {
            RelativeHorizontal::Character | RelativeHorizontal::Column => {
                HorizontalReference::AreaBoundary
            }
            RelativeHorizontal::Margin => HorizontalReference::PageMargin,
            RelativeHorizontal::Page => HorizontalReference::Page,
        },
        vertical_reference: match shape.relative_vertical {
            RelativeVertical::Line | RelativeVertical::Paragraph => {
                VerticalReference::PreviousElement
            }
            RelativeVertical::Margin => VerticalReference::Margin,
            RelativeVertical::Page => VerticalReference::Page,
        },
        horizontal_alignment,
        vertical_alignment,
        left,
        top,
        ..Default::default()
    };
    if layout.floating == Floating::TopBottom {
        layout.margin_top = shape.wrap.distance_top;
        layout.margin_bottom = shape.wrap.distance_bottom;
        layout.margin_left = shape.wrap.distance_left;
        layout.margin_right = shape.wrap.distance_right;
    }
    layout
}

/// Width of the flow inside a text frame, and its height if fixed.
fn frame_flow_box(frame: &TextFrame) -> (f64, Option<f64>) {
    let width = frame.shape.width.unwrap_or(DEFAULT_SHAPE_SIZE);
    let height = frame.shape.height;
    match frame.orientation {
        TextOrientation::Horizontal => (
            (width - frame.margin_left - frame.margin_right).max(0.0),
            height.map(|h| (h - frame.margin_top - frame.margin_bottom).max(0.0)),
        ),
        // Rotated text runs along the frame's height.
        TextOrientation::Upward | TextOrientation::Downward => (
            (height.unwrap_or(DEFAULT_SHAPE_SIZE) - frame.margin_top - frame.margin_bottom)
                .max(0.0),
            Some((width - frame.margin_left - frame.margin_right).max(0.0)),
        ),
    }
}

pub fn format_shape<'d>(
    ctx: &FormatContext<'_>,
    block: &'d Block,
    area: Rectangle,
) -> Result<(ShapeFormatInfo<'d>, LayoutInfo)> {
    let mut failure = None;
    let mut content = Vec::new();
    let (width, height) = match block {
        Block::Image(image) => {
            let extent = image_extent(&ctx.images, image);
            failure = extent.failure;
            (extent.width, extent.height)
        }
        Block::TextFrame(frame) => {
            let (flow_width, flow_height) = frame_flow_box(frame);
            let flow_area = match flow_height {
                Some(h) => Rectangle::new(0.0, 0.0, flow_width, h),
                None => Rectangle::unbounded(0.0, 0.0, flow_width),
            };
            let (infos, content_height) =
                format_in_area(ctx, &frame.blocks, flow_area, "a text frame")?;
            content = infos;
            let width = frame.shape.width.unwrap_or(DEFAULT_SHAPE_SIZE);
            let height = frame
                .shape
                .height
                .unwrap_or(content_height + frame.margin_top + frame.margin_bottom);
            (width, height)
        }
        other => {
            let shape = shape_format(other).copied().unwrap_or_default();
            (
                shape.width.unwrap_or(DEFAULT_SHAPE_SIZE),
                shape.height.unwrap_or(DEFAULT_SHAPE_SIZE),
            )
        }
    };

    let mut layout = initial_layout(block);
    layout.content_area = Rectangle::new(area.x, area.y, width, height);
    layout.starting_height = height;
    layout.trailing_height = height;
    let is_empty = layout.advances_flow() && height > area.height + TOLERANCE;
    if is_empty {
        tracing::debug!(
            kind = block.kind_name(),
            height,
            available = area.height,
            "shape does not fit"
        );
    }
    Ok((
        ShapeFormatInfo {
            is_empty,
            width,
            height,
            failure,
            content,
        },
        layout,
    ))
}

pub fn render_shape(
    rc: &mut RenderContext<'_, '_>,
    block: &Block,
    info: &ShapeFormatInfo<'_>,
    layout: &LayoutInfo,
) {
    let rect = layout.content_area;
    let shape = shape_format(block);
    if let Some(fill) = shape.and_then(|s| s.fill) {
        rc.graphics.draw_rect(rect, None, Some(fill));
    }
    match block {
        Block::Image(image) => {
            let extent = ImageExtent {
                width: info.width,
                height: info.height,
                failure: info.failure,
            };
            draw_image(rc.graphics, image, &extent, rect);
        }
        Block::Chart(chart) => rc.graphics.draw_embedded(Embedded::Chart(chart), rect),
        Block::Barcode(barcode) => rc.graphics.draw_embedded(Embedded::Barcode(barcode), rect),
        Block::TextFrame(frame) => render_frame_content(rc, frame, info, rect),
        _ => {}
    }
    if let Some(line) = shape.and_then(|s| s.line) {
        rc.graphics.draw_rect(rect, Some(&line_pen(&line)), None);
    }
}

fn render_frame_content(
    rc: &mut RenderContext<'_, '_>,
    frame: &TextFrame,
    info: &ShapeFormatInfo<'_>,
    rect: Rectangle,
) {
    // Maps frame-local (u, v) onto the page.
    let matrix = match frame.orientation {
        TextOrientation::Horizontal => {
            for child in &info.content {
                let child = child.translated(rect.x + frame.margin_left, rect.y + frame.margin_top);
                render_block(rc, &child);
            }
            return;
        }
        TextOrientation::Upward => [
            0.0,
            -1.0,
            1.0,
            0.0,
            rect.x + frame.margin_left,
            rect.bottom() - frame.margin_bottom,
        ],
        TextOrientation::Downward => [
            0.0,
            1.0,
            -1.0,
            0.0,
            rect.right() - frame.margin_right,
            rect.y + frame.margin_top,
        ],
    };
    rc.graphics.save_state();
    rc.graphics.transform(matrix);
    for child in &info.content {
        render_block(rc, child);
    }
    rc.graphics.restore_state();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::{DisplayList, DrawOp};
    use crate::image_loader::tests::png_data_uri;
    use crate::layout::info::FormatInfo;
    use crate::layout::testing::{render_context, FixedMeasurer};
    use crate::layout::{LayoutOptions, RenderContext};
    use crate::model::ParagraphFormat;

    #[test]
    fn missing_image_becomes_placeholder() {
        let measurer = FixedMeasurer;
        let options = LayoutOptions::default();
        let ctx = FormatContext::new(&measurer, &options);
        let block = Block::Image(Image::new("./no/such/image.png"));
        let area = Rectangle::new(10.0, 20.0, 400.0, 400.0);
        let (info, layout) = format_shape(&ctx, &block, area).unwrap();
        assert_eq!(info.failure, Some(ImageFailure::FileNotFound));
        assert!((info.width - 70.866).abs() < 1e-2);
        assert_eq!(info.width, info.height);
        assert!(!info.is_empty);

        let (fields, images) = render_context();
        let mut g = DisplayList::new();
        let mut rc = RenderContext {
            measurer: &measurer,
            options: &options,
            fields: &fields,
            images: &images,
            graphics: &mut g,
        };
        render_shape(&mut rc, &block, &info, &layout);
        assert!(g.ops.iter().any(|op| matches!(
            op,
            DrawOp::Rect { fill: Some(c), .. } if *c == Color::LIGHT_GRAY
        )));
        assert!(g.ops.iter().any(|op| matches!(
            op,
            DrawOp::Text { text, color, .. } if text == "Image not found" && *color == Color::RED
        )));
        assert!(!g.ops.iter().any(|op| matches!(op, DrawOp::Image { .. })));
    }

    #[test]
    fn locked_aspect_ratio_follows_width() {
        let cache = ImageCache::new();
        let mut image = Image::new(&png_data_uri(40, 20));
        image.shape.width = Some(100.0);
        let extent = image_extent(&cache, &image);
        assert_eq!((extent.width, extent.height), (100.0, 50.0));
        image.resolution = Some(144.0);
        image.shape.width = None;
        let extent = image_extent(&cache, &image);
        assert_eq!((extent.width, extent.height), (20.0, 10.0));
    }

    #[test]
    fn flowing_shape_that_does_not_fit_is_empty() {
        let measurer = FixedMeasurer;
        let options = LayoutOptions::default();
        let ctx = FormatContext::new(&measurer, &options);
        let mut chart = crate::model::Chart::default();
        chart.shape.height = Some(50.0);
        let block = Block::Chart(chart);
        let (info, _) = format_shape(&ctx, &block, Rectangle::new(0.0, 0.0, 100.0, 40.0)).unwrap();
        assert!(info.is_empty);

        let mut floating = crate::model::Chart::default();
        floating.shape.height = Some(50.0);
        floating.shape.wrap.style = WrapStyle::None;
        let block = Block::Chart(floating);
        let area = Rectangle::new(0.0, 0.0, 100.0, 40.0);
        let (info, layout) = format_shape(&ctx, &block, area).unwrap();
        assert!(!info.is_empty);
        assert!(!layout.advances_flow());
    }

    #[test]
    fn text_frame_grows_with_content() {
        let measurer = FixedMeasurer;
        let options = LayoutOptions::default();
        let ctx = FormatContext::new(&measurer, &options);
        let mut frame = TextFrame {
            margin_top: 2.0,
            margin_bottom: 3.0,
            ..Default::default()
        };
        frame.shape.width = Some(200.0);
        let mut p = crate::model::Paragraph::new(ParagraphFormat::default());
        p.add_text("one").add_line_break().add_text("two");
        frame.blocks.push(Block::Paragraph(p));
        let block = Block::TextFrame(frame);
        let (info, _) = format_shape(&ctx, &block, Rectangle::new(0.0, 0.0, 300.0, 300.0)).unwrap();
        assert_eq!(info.height, 25.0);
        assert_eq!(info.content.len(), 1);
        assert!(matches!(info.content[0].format, FormatInfo::Paragraph(_)));
    }
}
