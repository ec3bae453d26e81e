//! # Table Pager
//!
//! The first format call builds a [`TableGeometry`]: the merged-cell index,
//! every anchor cell's content formatted at the origin of an unbounded cell
//! area, the heading range and the bottom-border map (the top offset of every
//! row). Later calls only walk that map, so each area costs a scan over row
//! spans.
//!
//! A span is a row advanced to its last connected row (merges and
//! `keep_with` pull rows together); spans are never split across areas.
//! Heading rows are drawn at the top of every part that shows a body row.

use super::area::{Rectangle, TOLERANCE};
use super::borders::{self, effective_width};
use super::formatter::format_cell_blocks;
use super::info::{ElementAlignment, LayoutInfo, RenderInfo};
use super::merged_cells::{Anchor, MergedCells};
use super::{render_block, FormatContext, RenderContext};
use crate::error::Result;
use crate::model::{RowAlignment, RowHeightRule, Table, VerticalAlignment};
use std::rc::Rc;

/// Smallest step between two row boundaries.
const MIN_ROW_STEP: f64 = 1e-3;

/// An anchor cell with its content laid out.
#[derive(Debug)]
pub struct FormattedCell<'d> {
    pub anchor: Anchor,
    /// Content formatted against an area whose origin is (0, 0).
    pub content: Vec<RenderInfo<'d>>,
    pub content_height: f64,
    /// Height of the cell from its top edge to its bottom border.
    pub inner_height: f64,
}

/// One-time table setup shared by every part of the table.
#[derive(Debug)]
pub struct TableGeometry<'d> {
    pub cells: MergedCells<'d>,
    /// Parallel to `cells.anchors()`.
    pub formatted: Vec<FormattedCell<'d>>,
    /// Left offset of every column boundary, `columns + 1` entries.
    pub column_x: Vec<f64>,
    /// Top offset of every row boundary, `rows + 1` entries.
    pub bottom_borders: Vec<f64>,
    /// Last row of every span starting at a row.
    pub connected_rows: Vec<usize>,
    pub last_heading_row: Option<usize>,
    consider_heading_repeats: bool,
}

impl<'d> TableGeometry<'d> {
    pub fn build(ctx: &FormatContext<'_>, table: &'d Table) -> Result<Self> {
        let cells = MergedCells::build(table)?;
        let mut column_x = Vec::with_capacity(table.columns.len() + 1);
        let mut x = 0.0;
        column_x.push(x);
        for column in &table.columns {
            x += column.width;
            column_x.push(x);
        }

        let mut formatted = Vec::with_capacity(cells.anchors().len());
        for anchor in cells.anchors() {
            let cell = cells.cell(anchor);
            let first = &table.columns[anchor.column];
            let last = &table.columns[anchor.last_column()];
            let width = column_x[anchor.last_column() + 1] - column_x[anchor.column];
            let inner_width = (width - first.left_padding - last.right_padding).max(0.0);
            let (content, content_height) = format_cell_blocks(ctx, &cell.blocks, inner_width)?;

            let row = &table.rows[anchor.row];
            let bottom_padding = table.rows[anchor.last_row()].bottom_padding;
            let padded = row.top_padding + content_height + bottom_padding;
            let inner_height = match row.height_rule {
                RowHeightRule::Exactly => row.height,
                RowHeightRule::Auto => padded,
                RowHeightRule::AtLeast => padded.max(row.height),
            };
            formatted.push(FormattedCell {
                anchor: *anchor,
                content,
                content_height,
                inner_height,
            });
        }

        let mut geometry = Self {
            cells,
            formatted,
            column_x,
            bottom_borders: Vec::new(),
            connected_rows: Vec::new(),
            last_heading_row: None,
            consider_heading_repeats: ctx.options.heading_repeat_borders,
        };
        geometry.connected_rows = (0..table.rows.len())
            .map(|r| geometry.last_connected_row(r))
            .collect();
        geometry.last_heading_row = geometry.calc_last_heading_row();
        geometry.bottom_borders = geometry.create_bottom_border_map();
        tracing::debug!(
            rows = table.rows.len(),
            anchors = geometry.formatted.len(),
            last_heading_row = ?geometry.last_heading_row,
            "table geometry built"
        );
        Ok(geometry)
    }

    pub fn table(&self) -> &'d Table {
        self.cells.table()
    }

    pub fn row_count(&self) -> usize {
        self.table().rows.len()
    }

    pub fn first_body_row(&self) -> usize {
        self.last_heading_row.map_or(0, |h| h + 1)
    }

    pub fn heading_height(&self) -> f64 {
        self.bottom_borders[self.first_body_row()]
    }

    pub fn width(&self) -> f64 {
        self.column_x.last().copied().unwrap_or(0.0)
    }

    /// Last row pulled into the span starting at `row` by merges and
    /// `keep_with`.
    fn last_connected_row(&self, row: usize) -> usize {
        let rows = self.table().rows.len();
        let mut last = row;
        for anchor in self.cells.anchors() {
            if anchor.row > last {
                break;
            }
            let down = self.table().rows[anchor.row].keep_with.max(anchor.merge_down);
            last = last.max(anchor.row + down);
        }
        last.min(rows.saturating_sub(1))
    }

    /// Leading heading rows, extended to their connected rows. A heading
    /// covering the whole table is ignored.
    fn calc_last_heading_row(&self) -> Option<usize> {
        let rows = &self.table().rows;
        let mut last = None;
        for (i, row) in rows.iter().enumerate() {
            if !row.heading {
                break;
            }
            last = Some(i);
        }
        let last = self.connected_rows.get(last?).copied()?;
        (last + 1 < rows.len()).then_some(last)
    }

    fn bottom_border_width(&self, anchor: &Anchor) -> f64 {
        let borders = self
            .cells
            .effective_borders(anchor, self.consider_heading_repeats, self.last_heading_row);
        effective_width(borders.bottom.as_ref())
    }

    /// Boundary offsets, advancing from the least merged anchor that ends at
    /// the current boundary.
    fn create_bottom_border_map(&self) -> Vec<f64> {
        let rows = self.row_count();
        let mut map: Vec<Option<f64>> = vec![None; rows + 1];
        map[0] = Some(0.0);
        let mut last_row = 0;
        let mut last_pos = 0.0;
        while last_row < rows {
            let Some(min_index) = self.min_merged_cell(last_row) else {
                // Only reachable for a row with no anchors, which the index
                // never produces; give the row a nominal height.
                last_row += 1;
                last_pos += MIN_ROW_STEP;
                map[last_row] = Some(last_pos);
                continue;
            };
            let min_cell = &self.formatted[min_index];
            let bottom_row = min_cell.anchor.last_row();
            let mut max_pos =
                last_pos + min_cell.inner_height + self.bottom_border_width(&min_cell.anchor);
            for cell in &self.formatted {
                if cell.anchor.row > bottom_row {
                    break;
                }
                if cell.anchor.last_row() == bottom_row {
                    let top = map[cell.anchor.row].unwrap_or(last_pos);
                    let pos = top + cell.inner_height + self.bottom_border_width(&cell.anchor);
                    max_pos = max_pos.max(pos);
                }
            }
            // Leaves room for a nominal step per row the merge spans.
            let spanned = (bottom_row - last_row + 1) as f64;
            last_pos = max_pos.max(last_pos + MIN_ROW_STEP * spanned);
            last_row = bottom_row + 1;
            map[last_row] = Some(last_pos);
        }
        let mut filled = Vec::with_capacity(rows + 1);
        let mut previous = 0.0;
        for entry in map {
            // Rows inside a vertical merge share the merge's start offset
            // plus a nominal step so the map stays strictly increasing.
            let value = match entry {
                Some(v) => v,
                None => previous + MIN_ROW_STEP,
            };
            filled.push(value);
            previous = value;
        }
        filled
    }

    /// Index of the anchor at `row` with the smallest downward merge.
    fn min_merged_cell(&self, row: usize) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, cell) in self.formatted.iter().enumerate() {
            if cell.anchor.row > row {
                break;
            }
            if cell.anchor.row == row {
                if cell.anchor.merge_down == 0 {
                    return Some(i);
                }
                let shorter =
                    |b: usize| cell.anchor.merge_down < self.formatted[b].anchor.merge_down;
                if best.map_or(true, shorter) {
                    best = Some(i);
                }
            }
        }
        best
    }

    fn span_height(&self, start_row: usize, last_row: usize) -> f64 {
        self.heading_height() + self.bottom_borders[last_row + 1] - self.bottom_borders[start_row]
    }
}

/// The rows of a table placed in one area.
#[derive(Debug, Clone)]
pub struct TableFormatInfo<'d> {
    pub geometry: Rc<TableGeometry<'d>>,
    /// First body row of this part.
    pub start_row: usize,
    /// Last body row of this part, `None` when nothing fits.
    pub end_row: Option<usize>,
    /// Last row of every accepted span.
    pub spans: Vec<usize>,
    pub is_ending: bool,
    pub is_empty: bool,
}

impl<'d> TableFormatInfo<'d> {
    pub fn is_starting(&self) -> bool {
        self.start_row == self.geometry.first_body_row()
    }

    pub fn content_height(&self) -> f64 {
        match self.end_row {
            Some(end) => self.geometry.span_height(self.start_row, end),
            None => 0.0,
        }
    }

    /// A copy without the last span, with its new content height.
    pub fn with_ending_removed(&self) -> Option<(TableFormatInfo<'d>, f64)> {
        if self.spans.is_empty() {
            return None;
        }
        let mut shorter = self.clone();
        shorter.spans.pop();
        shorter.end_row = shorter.spans.last().copied();
        shorter.is_ending = false;
        shorter.is_empty = shorter.spans.is_empty();
        let height = shorter.content_height();
        Some((shorter, height))
    }
}

pub fn initial_layout(table: &Table) -> LayoutInfo {
    let f = &table.format;
    LayoutInfo {
        margin_top: f.space_before,
        margin_bottom: f.space_after,
        keep_together: f.keep_together,
        keep_with_next: f.keep_with_next,
        left: f.left_indent,
        horizontal_alignment: match f.alignment {
            RowAlignment::Left => ElementAlignment::Near,
            RowAlignment::Center => ElementAlignment::Center,
            RowAlignment::Right => ElementAlignment::Far,
        },
        ..Default::default()
    }
}

/// Format the next row range of `table` into `area`.
pub fn format_table<'d>(
    ctx: &FormatContext<'_>,
    table: &'d Table,
    area: Rectangle,
    previous: Option<&TableFormatInfo<'d>>,
    max_element_height: f64,
) -> Result<(TableFormatInfo<'d>, LayoutInfo)> {
    let geometry = match previous {
        Some(p) => Rc::clone(&p.geometry),
        None => Rc::new(TableGeometry::build(ctx, table)?),
    };
    let rows = geometry.row_count();
    let start_row = match previous {
        Some(p) => p
            .end_row
            .map_or(p.start_row, |e| e + 1)
            .max(geometry.first_body_row()),
        None => geometry.first_body_row(),
    };

    let mut spans = Vec::new();
    let mut height = 0.0;
    let mut probe = start_row;
    while probe < rows {
        let last = geometry.connected_rows[probe];
        let mut span_height = geometry.span_height(start_row, last);
        if span_height > area.height + TOLERANCE {
            let never_fits = spans.is_empty()
                && max_element_height.is_finite()
                && span_height > max_element_height - TOLERANCE;
            if !never_fits {
                break;
            }
            // Accept an oversized first span so the table always advances.
            span_height = max_element_height - TOLERANCE;
            tracing::debug!(start_row, last, "table span taller than any area, clamped");
        }
        spans.push(last);
        height = span_height;
        probe = last + 1;
    }

    let end_row = spans.last().copied();
    let info = TableFormatInfo {
        start_row,
        end_row,
        is_ending: start_row >= rows || end_row == Some(rows - 1),
        is_empty: spans.is_empty() && start_row < rows,
        spans,
        geometry,
    };
    tracing::debug!(start_row, end_row = ?info.end_row, height, "table rows placed");

    let mut layout = initial_layout(table);
    layout.content_area = Rectangle::new(area.x, area.y, info.geometry.width(), height);
    if let Some(first) = info.spans.first() {
        layout.starting_height = info.geometry.span_height(start_row, *first).min(height);
    }
    if let Some(last) = info.spans.last() {
        let span_start = info.spans.iter().rev().nth(1).map_or(start_row, |r| r + 1);
        let bottoms = &info.geometry.bottom_borders;
        layout.trailing_height = bottoms[last + 1] - bottoms[span_start];
    }
    Ok((info, layout))
}

pub fn render_table(
    rc: &mut RenderContext<'_, '_>,
    info: &TableFormatInfo<'_>,
    layout: &LayoutInfo,
) {
    let Some(end_row) = info.end_row else {
        return;
    };
    let g = &info.geometry;
    let origin_x = layout.content_area.x;
    let origin_y = layout.content_area.y;
    let bottom = origin_y + layout.content_area.height;

    if !info.is_starting() {
        g.cells.mark_heading_repeat(info.start_row);
    }
    if let Some(last_heading) = g.last_heading_row {
        for cell in g.formatted.iter().filter(|c| c.anchor.row <= last_heading) {
            render_cell(rc, g, cell, origin_x, origin_y, bottom);
        }
    }
    let shift = origin_y + g.heading_height() - g.bottom_borders[info.start_row];
    for cell in g
        .formatted
        .iter()
        .filter(|c| c.anchor.row >= info.start_row && c.anchor.row <= end_row)
    {
        render_cell(rc, g, cell, origin_x, shift, bottom);
    }
}

fn render_cell(
    rc: &mut RenderContext<'_, '_>,
    g: &TableGeometry<'_>,
    cell: &FormattedCell<'_>,
    origin_x: f64,
    origin_y: f64,
    clip_bottom: f64,
) {
    let a = &cell.anchor;
    let table = g.table();
    let model = g.cells.cell(a);
    let top = origin_y + g.bottom_borders[a.row];
    let height =
        (g.bottom_borders[a.last_row() + 1] - g.bottom_borders[a.row]).min(clip_bottom - top);
    let rect = Rectangle::new(
        origin_x + g.column_x[a.column],
        top,
        g.column_x[a.last_column() + 1] - g.column_x[a.column],
        height.max(0.0),
    );

    let borders = g
        .cells
        .effective_borders(a, g.consider_heading_repeats, g.last_heading_row);
    borders::render_shading(rc.graphics, model.shading.as_ref(), rect);

    let first_row = &table.rows[a.row];
    let last_row = &table.rows[a.last_row()];
    let bottom_border = effective_width(borders.bottom.as_ref());
    let free = (rect.height
        - first_row.top_padding
        - last_row.bottom_padding
        - bottom_border
        - cell.content_height)
        .max(0.0);
    let dy = first_row.top_padding
        + match model.vertical_alignment.unwrap_or(first_row.vertical_alignment) {
            VerticalAlignment::Top => 0.0,
            VerticalAlignment::Center => free / 2.0,
            VerticalAlignment::Bottom => free,
        };
    let dx = rect.x + table.columns[a.column].left_padding;
    for info in &cell.content {
        render_block(rc, &info.translated(dx, rect.y + dy));
    }

    borders::render_cell_borders(rc.graphics, &borders, rect, model.rounded_corner);
}
