//! Format and layout records.
//!
//! Every block formats into a [`RenderInfo`]: the block it came from, where it
//! sits ([`LayoutInfo`]) and what part of it fits ([`FormatInfo`]). Render
//! infos are the only thing that crosses from the format pass to the render
//! pass.

use super::area::Rectangle;
use super::paragraph::ParagraphFormatInfo;
use super::shape::ShapeFormatInfo;
use super::table::TableFormatInfo;
use crate::model::Block;

/// Whether an element pushes the flow cursor down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Floating {
    #[default]
    TopBottom,
    None,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HorizontalReference {
    #[default]
    AreaBoundary,
    PageMargin,
    Page,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VerticalReference {
    #[default]
    PreviousElement,
    AreaBoundary,
    Margin,
    Page,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ElementAlignment {
    #[default]
    Near,
    Center,
    Far,
    Inside,
    Outside,
}

/// Placement of a formatted element.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutInfo {
    pub content_area: Rectangle,
    /// Height of the part that must not be separated from the start.
    pub starting_height: f64,
    /// Height of the part that must not be separated from the end.
    pub trailing_height: f64,
    pub margin_top: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    pub margin_right: f64,
    pub keep_together: bool,
    pub keep_with_next: bool,
    pub page_break_before: bool,
    pub floating: Floating,
    pub horizontal_reference: HorizontalReference,
    pub vertical_reference: VerticalReference,
    pub horizontal_alignment: ElementAlignment,
    pub vertical_alignment: ElementAlignment,
    /// Explicit offset from the horizontal reference.
    pub left: f64,
    /// Explicit offset from the vertical reference.
    pub top: f64,
}

impl Default for LayoutInfo {
    fn default() -> Self {
        Self {
            content_area: Rectangle::new(0.0, 0.0, 0.0, 0.0),
            starting_height: 0.0,
            trailing_height: 0.0,
            margin_top: 0.0,
            margin_bottom: 0.0,
            margin_left: 0.0,
            margin_right: 0.0,
            keep_together: false,
            keep_with_next: false,
            page_break_before: false,
            floating: Floating::TopBottom,
            horizontal_reference: HorizontalReference::AreaBoundary,
            vertical_reference: VerticalReference::PreviousElement,
            horizontal_alignment: ElementAlignment::Near,
            vertical_alignment: ElementAlignment::Near,
            left: 0.0,
            top: 0.0,
        }
    }
}

impl LayoutInfo {
    /// Whether placing this element moves the flow cursor.
    pub fn advances_flow(&self) -> bool {
        self.vertical_reference == VerticalReference::PreviousElement
            && self.floating != Floating::None
    }
}

/// How much of a block fits one area.
#[derive(Debug, Clone)]
pub enum FormatInfo<'d> {
    Paragraph(ParagraphFormatInfo),
    Table(TableFormatInfo<'d>),
    Shape(ShapeFormatInfo<'d>),
    PageBreak,
}

impl FormatInfo<'_> {
    /// The first part of the block is in this area.
    pub fn is_starting(&self) -> bool {
        match self {
            FormatInfo::Paragraph(p) => p.is_starting,
            FormatInfo::Table(t) => t.is_starting(),
            FormatInfo::Shape(_) | FormatInfo::PageBreak => true,
        }
    }

    /// The last part of the block is in this area.
    pub fn is_ending(&self) -> bool {
        match self {
            FormatInfo::Paragraph(p) => p.is_ending,
            FormatInfo::Table(t) => t.is_ending,
            FormatInfo::Shape(s) => !s.is_empty,
            FormatInfo::PageBreak => true,
        }
    }

    /// Nothing fits.
    pub fn is_empty(&self) -> bool {
        match self {
            FormatInfo::Paragraph(p) => p.lines.is_empty(),
            FormatInfo::Table(t) => t.is_empty,
            FormatInfo::Shape(s) => s.is_empty,
            FormatInfo::PageBreak => false,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.is_starting() && self.is_ending()
    }

    pub fn starting_is_complete(&self) -> bool {
        match self {
            FormatInfo::Paragraph(p) => p.starting_is_complete(),
            _ => self.is_starting() && !self.is_empty(),
        }
    }

    pub fn ending_is_complete(&self) -> bool {
        match self {
            FormatInfo::Paragraph(p) => p.ending_is_complete(),
            FormatInfo::Table(_) => true,
            _ => self.is_ending(),
        }
    }
}

/// A formatted block: the persisted layout record.
#[derive(Debug, Clone)]
pub struct RenderInfo<'d> {
    pub block: &'d Block,
    pub layout: LayoutInfo,
    pub format: FormatInfo<'d>,
}

impl<'d> RenderInfo<'d> {
    /// The same record moved by (`dx`, `dy`). Renderers position everything
    /// from the content area, so this relocates the whole element.
    pub fn translated(&self, dx: f64, dy: f64) -> RenderInfo<'d> {
        let mut moved = self.clone();
        moved.layout.content_area.x += dx;
        moved.layout.content_area.y += dy;
        moved
    }

    /// A copy with the ending moved out, or `None` when nothing can be
    /// removed without breaking the start constraints.
    pub fn with_ending_removed(&self) -> Option<RenderInfo<'d>> {
        match &self.format {
            FormatInfo::Paragraph(p) => {
                let (shorter, height) = p.with_ending_removed()?;
                let mut layout = self.layout.clone();
                layout.content_area.height = height;
                layout.trailing_height = shorter.trailing_height();
                Some(RenderInfo {
                    block: self.block,
                    layout,
                    format: FormatInfo::Paragraph(shorter),
                })
            }
            FormatInfo::Table(t) => {
                let (shorter, height) = t.with_ending_removed()?;
                let mut layout = self.layout.clone();
                layout.content_area.height = height;
                Some(RenderInfo {
                    block: self.block,
                    layout,
                    format: FormatInfo::Table(shorter),
                })
            }
            FormatInfo::Shape(_) | FormatInfo::PageBreak => None,
        }
    }
}
