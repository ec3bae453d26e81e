//! # Document Pagination
//!
//! Flows every section's blocks into pages. A page offers one area per text
//! column; a section starts on a fresh page (inserting a blank page when it
//! must start on an odd or even page). Once the body is placed the page count
//! and bookmark pages are known, so headers and footers are formatted last,
//! against the final field values of their page.

use super::area::Rectangle;
use super::fields::FieldValues;
use super::formatter::{
    align_horizontally, align_vertically, format_in_area, AreaProvider, TopDownFormatter,
};
use super::info::{FormatInfo, HorizontalReference, LayoutInfo, RenderInfo, VerticalReference};
use super::{paragraph, render_block, FormatContext, LayoutOptions, RenderContext};
use crate::error::Result;
use crate::graphics::{Graphics, TextMeasurer};
use crate::image_loader::ImageCache;
use crate::model::{Block, Document, PageSetup, Section, SectionStart};
use serde::Serialize;
use std::collections::HashMap;

/// Where a bookmark landed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkTarget {
    /// Physical page index, 0-based.
    pub page_index: usize,
    pub y: f64,
}

/// One laid out page.
#[derive(Debug)]
pub struct PageLayout<'d> {
    pub width: f64,
    pub height: f64,
    /// Index of the section the page belongs to.
    pub section: usize,
    /// Displayed page number.
    pub number: usize,
    pub first_in_section: bool,
    /// Inserted so the next section starts on an odd or even page.
    pub blank: bool,
    pub header: Vec<RenderInfo<'d>>,
    pub body: Vec<RenderInfo<'d>>,
    pub footer: Vec<RenderInfo<'d>>,
    /// Field values drawn on this page.
    pub fields: FieldValues,
}

impl PageLayout<'_> {
    fn even(&self) -> bool {
        self.number % 2 == 0
    }
}

/// Left and right margins of a page, swapped on even pages when mirrored.
fn horizontal_margins(setup: &PageSetup, number: usize) -> (f64, f64) {
    if setup.mirror_margins && number % 2 == 0 {
        (setup.margin.right, setup.margin.left)
    } else {
        (setup.margin.left, setup.margin.right)
    }
}

fn body_rect(setup: &PageSetup, number: usize) -> Rectangle {
    let (width, height) = setup.page_dimensions();
    let (left, right) = horizontal_margins(setup, number);
    Rectangle::new(
        left,
        setup.margin.top,
        (width - left - right).max(0.0),
        (height - setup.margin.top - setup.margin.bottom).max(0.0),
    )
}

fn column_rect(setup: &PageSetup, number: usize, column: usize) -> Rectangle {
    let body = body_rect(setup, number);
    let columns = setup.columns.max(1);
    let spacing = setup.column_spacing * (columns - 1) as f64;
    let width = ((body.width - spacing) / columns as f64).max(0.0);
    Rectangle::new(
        body.x + column as f64 * (width + setup.column_spacing),
        body.y,
        width,
        body.height,
    )
}

/// Hands out the text columns of a section's pages.
struct PageProvider<'c, 'a, 'd> {
    ctx: &'c FormatContext<'a>,
    section_index: usize,
    section: &'d Section,
    pages: Vec<PageLayout<'d>>,
    /// (page index, column) of every area handed out, in order.
    areas: Vec<(usize, usize)>,
    stored: usize,
    /// A page break closed the last area.
    force_new_page: bool,
}

impl<'c, 'a, 'd> PageProvider<'c, 'a, 'd> {
    fn new(
        ctx: &'c FormatContext<'a>,
        section_index: usize,
        section: &'d Section,
        pages: Vec<PageLayout<'d>>,
    ) -> Self {
        Self {
            ctx,
            section_index,
            section,
            pages,
            areas: Vec::new(),
            stored: 0,
            force_new_page: false,
        }
    }

    fn setup(&self) -> &'d PageSetup {
        &self.section.page_setup
    }

    fn next_number(&self) -> usize {
        let last = self.pages.last().map_or(0, |p| p.number);
        if self.areas.is_empty() {
            self.setup().starting_number.unwrap_or(last + 1)
        } else {
            last + 1
        }
    }

    fn push_page(&mut self, number: usize, blank: bool) {
        let (width, height) = self.setup().page_dimensions();
        let first_in_section = !blank
            && !self
                .pages
                .iter()
                .any(|p| p.section == self.section_index && !p.blank);
        let fields = self.ctx.fields.borrow().clone();
        self.pages.push(PageLayout {
            width,
            height,
            section: self.section_index,
            number,
            first_in_section,
            blank,
            header: Vec::new(),
            body: Vec::new(),
            footer: Vec::new(),
            fields,
        });
    }

    fn current_column(&self) -> Option<(usize, usize)> {
        self.areas.last().copied()
    }

    /// The (page number, column) the next area would be on, and whether it
    /// needs a new page.
    fn upcoming(&self) -> (usize, usize, bool) {
        match self.current_column() {
            Some((page, column))
                if !self.force_new_page && column + 1 < self.setup().columns.max(1) =>
            {
                (self.pages[page].number, column + 1, false)
            }
            _ => (self.next_number(), 0, true),
        }
    }

    fn current_page(&self) -> Option<&PageLayout<'d>> {
        self.current_column().map(|(page, _)| &self.pages[page])
    }

    fn reference(
        &self,
        horizontal: Option<HorizontalReference>,
        vertical: Option<VerticalReference>,
    ) -> Rectangle {
        let Some((page_index, column)) = self.current_column() else {
            return Rectangle::new(0.0, 0.0, 0.0, 0.0);
        };
        let page = &self.pages[page_index];
        let setup = self.setup();
        let page_rect = Rectangle::new(0.0, 0.0, page.width, page.height);
        match (horizontal, vertical) {
            (Some(HorizontalReference::Page), _) | (_, Some(VerticalReference::Page)) => page_rect,
            (Some(HorizontalReference::PageMargin), _) | (_, Some(VerticalReference::Margin)) => {
                body_rect(setup, page.number)
            }
            _ => column_rect(setup, page.number, column),
        }
    }

    fn into_pages(self) -> Vec<PageLayout<'d>> {
        self.pages
    }
}

impl<'d> AreaProvider<'d> for PageProvider<'_, '_, 'd> {
    fn next_area(&mut self) -> Option<Rectangle> {
        let (mut number, column, new_page) = self.upcoming();
        if new_page {
            let starts_section = self.areas.is_empty();
            let wanted_parity = match self.setup().section_start {
                SectionStart::OddPage => Some(1),
                SectionStart::EvenPage => Some(0),
                SectionStart::NewPage => None,
            };
            if starts_section && wanted_parity.is_some_and(|p| number % 2 != p) {
                tracing::debug!(section = self.section_index, number, "blank page inserted");
                self.push_page(number, true);
                number += 1;
            }
            {
                let mut fields = self.ctx.fields.borrow_mut();
                fields.page = number;
                fields.section = self.section_index + 1;
                fields.num_pages = self.pages.len() + 1;
                fields.section_pages = self
                    .pages
                    .iter()
                    .filter(|p| p.section == self.section_index)
                    .count()
                    + 1;
            }
            self.push_page(number, false);
            self.force_new_page = false;
            tracing::debug!(section = self.section_index, number, "new page");
        }
        let page_index = self.pages.len() - 1;
        self.areas.push((page_index, column));
        Some(column_rect(self.setup(), number, column))
    }

    fn probe_next_area(&self) -> Option<Rectangle> {
        let (number, column, _) = self.upcoming();
        Some(column_rect(self.setup(), number, column))
    }

    fn position_horizontally(&self, layout: &mut LayoutInfo) -> bool {
        let reference = self.reference(Some(layout.horizontal_reference), None);
        let odd = self.current_page().map_or(true, |p| !p.even());
        align_horizontally(layout, reference, odd)
    }

    fn position_vertically(&self, layout: &mut LayoutInfo) -> bool {
        let reference = self.reference(None, Some(layout.vertical_reference));
        align_vertically(layout, reference)
    }

    fn store_render_infos(&mut self, infos: Vec<RenderInfo<'d>>) {
        if infos.last().is_some_and(|i| matches!(i.block, Block::PageBreak)) {
            self.force_new_page = true;
        }
        if let Some((page, _)) = self.areas.get(self.stored) {
            self.pages[*page].body.extend(infos);
        }
        self.stored += 1;
    }

    fn is_area_break_before(&self, layout: &LayoutInfo) -> bool {
        layout.page_break_before
    }

    fn check_supported(&self, _block: &Block) -> Result<()> {
        Ok(())
    }
}

/// Bookmarks placed by a record, with their y position.
fn collect_bookmarks<'d>(info: &RenderInfo<'d>, dx: f64, dy: f64, out: &mut Vec<(&'d str, f64)>) {
    match (&info.format, info.block) {
        (FormatInfo::Paragraph(p), Block::Paragraph(model)) => {
            for name in paragraph::bookmarks(model, p) {
                out.push((name, info.layout.content_area.y + dy));
            }
        }
        (FormatInfo::Table(t), _) => {
            let g = &t.geometry;
            let Some(end) = t.end_row else {
                return;
            };
            let origin_x = info.layout.content_area.x + dx;
            let body_shift = info.layout.content_area.y + dy + g.heading_height()
                - g.bottom_borders[t.start_row];
            for cell in &g.formatted {
                let row = cell.anchor.row;
                let in_heading = t.is_starting() && g.last_heading_row.is_some_and(|h| row <= h);
                let in_body = row >= t.start_row && row <= end;
                if !(in_heading || in_body) {
                    continue;
                }
                let top = if in_body {
                    body_shift
                } else {
                    info.layout.content_area.y + dy
                } + g.bottom_borders[row];
                for child in &cell.content {
                    collect_bookmarks(child, origin_x + g.column_x[cell.anchor.column], top, out);
                }
            }
        }
        (FormatInfo::Shape(s), _) => {
            let area = info.layout.content_area;
            for child in &s.content {
                collect_bookmarks(child, area.x + dx, area.y + dy, out);
            }
        }
        _ => {}
    }
}

/// Lays out documents with one measurer and set of options.
pub struct LayoutEngine<'m> {
    measurer: &'m dyn TextMeasurer,
    options: LayoutOptions,
}

impl<'m> LayoutEngine<'m> {
    pub fn new(measurer: &'m dyn TextMeasurer, options: LayoutOptions) -> Self {
        Self { measurer, options }
    }

    pub fn layout<'d>(&self, document: &'d Document) -> Result<DocumentLayout<'d>>
    where
        'm: 'd,
    {
        let ctx = FormatContext::for_document(self.measurer, &self.options, document);

        let mut pages = Vec::new();
        for (index, section) in document.sections.iter().enumerate() {
            let mut provider = PageProvider::new(&ctx, index, section, pages);
            TopDownFormatter::new(&ctx, &section.blocks).format_on_areas(&mut provider)?;
            pages = provider.into_pages();
        }

        let mut bookmarks = HashMap::new();
        for (page_index, page) in pages.iter().enumerate() {
            let mut found = Vec::new();
            for info in &page.body {
                collect_bookmarks(info, 0.0, 0.0, &mut found);
            }
            for (name, y) in found {
                bookmarks
                    .entry(name.to_string())
                    .or_insert(BookmarkTarget { page_index, y });
            }
        }

        let num_pages = pages.len();
        let mut section_pages = vec![0; document.sections.len()];
        for page in &pages {
            section_pages[page.section] += 1;
        }
        let base = ctx.fields.borrow().clone();
        let bookmark_numbers: HashMap<String, usize> = bookmarks
            .iter()
            .map(|(name, target)| (name.clone(), pages[target.page_index].number))
            .collect();
        for page in &mut pages {
            page.fields = FieldValues {
                page: page.number,
                num_pages,
                section: page.section + 1,
                section_pages: section_pages[page.section],
                bookmarks: bookmark_numbers.clone(),
                ..base.clone()
            };
        }

        for page in &mut pages {
            *ctx.fields.borrow_mut() = page.fields.clone();
            let section = &document.sections[page.section];
            let setup = &section.page_setup;
            let body = body_rect(setup, page.number);

            let header_blocks = section.headers.for_page(setup, page.first_in_section, page.even());
            let header_area = Rectangle::unbounded(body.x, setup.header_distance, body.width);
            page.header = format_in_area(&ctx, header_blocks, header_area, "a header")?.0;

            let footer_blocks = section.footers.for_page(setup, page.first_in_section, page.even());
            let footer_area = Rectangle::unbounded(body.x, 0.0, body.width);
            let (footer, height) = format_in_area(&ctx, footer_blocks, footer_area, "a footer")?;
            let dy = page.height - setup.footer_distance - height;
            page.footer = footer.iter().map(|info| info.translated(0.0, dy)).collect();
        }

        tracing::debug!(pages = pages.len(), bookmarks = bookmarks.len(), "document laid out");
        Ok(DocumentLayout {
            pages,
            bookmarks,
            measurer: self.measurer,
            options: self.options.clone(),
            images: ctx.images,
        })
    }
}

/// The result of the format pass, ready to render.
pub struct DocumentLayout<'d> {
    pub pages: Vec<PageLayout<'d>>,
    pub bookmarks: HashMap<String, BookmarkTarget>,
    measurer: &'d dyn TextMeasurer,
    options: LayoutOptions,
    images: ImageCache,
}

impl std::fmt::Debug for DocumentLayout<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentLayout")
            .field("pages", &self.pages)
            .field("bookmarks", &self.bookmarks)
            .field("options", &self.options)
            .field("images", &self.images)
            .finish_non_exhaustive()
    }
}

impl<'d> DocumentLayout<'d> {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Draw page `index` as one page of `g`. Out of range indices draw
    /// nothing.
    pub fn render_page(&self, index: usize, g: &mut dyn Graphics) {
        let Some(page) = self.pages.get(index) else {
            return;
        };
        g.begin_page(page.width, page.height);
        {
            let mut rc = RenderContext {
                measurer: self.measurer,
                options: &self.options,
                fields: &page.fields,
                images: &self.images,
                graphics: &mut *g,
            };
            for info in page.header.iter().chain(&page.body).chain(&page.footer) {
                render_block(&mut rc, info);
            }
        }
        g.end_page();
    }

    pub fn render_all(&self, g: &mut dyn Graphics) {
        for index in 0..self.pages.len() {
            self.render_page(index, g);
        }
    }

    /// A serializable outline of every placed element.
    pub fn summary(&self) -> LayoutSummary {
        let pages = self
            .pages
            .iter()
            .map(|page| {
                let region = |name: &'static str, infos: &[RenderInfo<'_>]| {
                    infos
                        .iter()
                        .map(|info| ElementSummary {
                            region: name,
                            kind: info.block.kind_name(),
                            x: info.layout.content_area.x,
                            y: info.layout.content_area.y,
                            width: info.layout.content_area.width,
                            height: info.layout.content_area.height,
                            starting: info.format.is_starting(),
                            ending: info.format.is_ending(),
                        })
                        .collect::<Vec<_>>()
                };
                let mut elements = region("header", &page.header);
                elements.extend(region("body", &page.body));
                elements.extend(region("footer", &page.footer));
                PageSummary {
                    width: page.width,
                    height: page.height,
                    number: page.number,
                    section: page.section,
                    blank: page.blank,
                    elements,
                }
            })
            .collect();
        LayoutSummary { pages }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSummary {
    pub pages: Vec<PageSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSummary {
    pub width: f64,
    pub height: f64,
    pub number: usize,
    pub section: usize,
    pub blank: bool,
    pub elements: Vec<ElementSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementSummary {
    pub region: &'static str,
    pub kind: &'static str,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub starting: bool,
    pub ending: bool,
}
