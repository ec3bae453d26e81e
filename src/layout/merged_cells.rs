//! # Merged-Cell Index
//!
//! A table's grid reduced to one anchor per merged region (the region's
//! top-left cell), in row-major order. Every grid position is covered by
//! exactly one anchor; positions hidden by a merge are never laid out.
//!
//! Effective borders resolve what a cell actually draws once merges and
//! touching neighbours are taken into account. Results are cached under a
//! content key (position, heading flag, redirect row), so registering a
//! heading repeat never invalidates anything: it simply produces a
//! different key.

use super::borders::{effective_width, equalize_rounded_corner};
use crate::error::{FolioError, Result};
use crate::model::{BorderSide, Borders, Cell, RoundedCorner, Table};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};

/// Top-left cell of a merged region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Anchor {
    pub row: usize,
    pub column: usize,
    pub merge_down: usize,
    pub merge_right: usize,
}

impl Anchor {
    pub fn last_row(&self) -> usize {
        self.row + self.merge_down
    }

    pub fn last_column(&self) -> usize {
        self.column + self.merge_right
    }

    pub fn covers(&self, row: usize, column: usize) -> bool {
        (self.row..=self.last_row()).contains(&row)
            && (self.column..=self.last_column()).contains(&column)
    }
}

type BorderKey = (usize, usize, bool, Option<usize>);

#[derive(Debug)]
pub struct MergedCells<'d> {
    table: &'d Table,
    anchors: Vec<Anchor>,
    /// Anchor index for every grid position, row-major.
    grid: Vec<usize>,
    heading_repeats: RefCell<BTreeSet<usize>>,
    border_cache: RefCell<HashMap<BorderKey, Borders>>,
}

impl<'d> MergedCells<'d> {
    pub fn build(table: &'d Table) -> Result<Self> {
        let rows = table.rows.len();
        let columns = table.columns.len();
        for (r, row) in table.rows.iter().enumerate() {
            if row.cells.len() > columns {
                return Err(FolioError::TooManyCells {
                    row: r,
                    cells: row.cells.len(),
                    columns,
                });
            }
        }

        let mut grid = vec![usize::MAX; rows * columns];
        let mut anchors = Vec::new();
        for r in 0..rows {
            for c in 0..columns {
                let cell = table.cell(r, c);
                let owner = grid[r * columns + c];
                if owner != usize::MAX {
                    if cell.merge_down > 0 || cell.merge_right > 0 {
                        let a: &Anchor = &anchors[owner];
                        return Err(FolioError::OverlappingMerge {
                            row: r,
                            column: c,
                            anchor_row: a.row,
                            anchor_column: a.column,
                        });
                    }
                    continue;
                }
                if r + cell.merge_down >= rows || c + cell.merge_right >= columns {
                    return Err(FolioError::MergeOutOfRange {
                        row: r,
                        column: c,
                        merge_down: cell.merge_down,
                        merge_right: cell.merge_right,
                        rows,
                        columns,
                    });
                }
                let index = anchors.len();
                for pr in r..=r + cell.merge_down {
                    for pc in c..=c + cell.merge_right {
                        let slot = &mut grid[pr * columns + pc];
                        if *slot != usize::MAX {
                            let a: &Anchor = &anchors[*slot];
                            return Err(FolioError::OverlappingMerge {
                                row: r,
                                column: c,
                                anchor_row: a.row,
                                anchor_column: a.column,
                            });
                        }
                        *slot = index;
                    }
                }
                anchors.push(Anchor {
                    row: r,
                    column: c,
                    merge_down: cell.merge_down,
                    merge_right: cell.merge_right,
                });
            }
        }

        Ok(Self {
            table,
            anchors,
            grid,
            heading_repeats: RefCell::new(BTreeSet::new()),
            border_cache: RefCell::new(HashMap::new()),
        })
    }

    pub fn table(&self) -> &'d Table {
        self.table
    }

    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    pub fn row_count(&self) -> usize {
        self.table.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.table.columns.len()
    }

    /// The anchor whose span contains (`row`, `column`).
    pub fn covering_cell(&self, row: usize, column: usize) -> Option<&Anchor> {
        if row >= self.row_count() || column >= self.column_count() {
            return None;
        }
        self.anchors.get(self.grid[row * self.column_count() + column])
    }

    /// Position of `anchor` in the ordered list.
    pub fn index_of(&self, anchor: &Anchor) -> Option<usize> {
        self.anchors
            .binary_search_by(|a| (a.row, a.column).cmp(&(anchor.row, anchor.column)))
            .ok()
    }

    pub fn cell(&self, anchor: &Anchor) -> &'d Cell {
        self.table.cell(anchor.row, anchor.column)
    }

    /// The anchor touching `anchor` on `side`, looked up at the anchor's
    /// first row or column.
    pub fn neighbor(&self, anchor: &Anchor, side: BorderSide) -> Option<&Anchor> {
        match side {
            BorderSide::Left => anchor
                .column
                .checked_sub(1)
                .and_then(|c| self.covering_cell(anchor.row, c)),
            BorderSide::Right => self.covering_cell(anchor.row, anchor.last_column() + 1),
            BorderSide::Top => anchor
                .row
                .checked_sub(1)
                .and_then(|r| self.covering_cell(r, anchor.column)),
            BorderSide::Bottom => self.covering_cell(anchor.last_row() + 1, anchor.column),
        }
    }

    /// Register that `row` is drawn directly below a repeated heading.
    pub fn mark_heading_repeat(&self, row: usize) {
        self.heading_repeats.borrow_mut().insert(row);
    }

    pub fn follows_heading_repeat(&self, row: usize) -> bool {
        self.heading_repeats.borrow().contains(&row)
    }

    /// A cell's own borders with the right and bottom edges taken from the
    /// far end of its merge span.
    fn span_borders(&self, anchor: &Anchor) -> Borders {
        let mut borders = self.cell(anchor).borders;
        if anchor.merge_right > 0 {
            borders.right = self.table.cell(anchor.row, anchor.last_column()).borders.right;
        }
        if anchor.merge_down > 0 {
            borders.bottom = self.table.cell(anchor.last_row(), anchor.column).borders.bottom;
        }
        borders
    }

    /// The borders `anchor` draws.
    ///
    /// With `consider_heading_repeats`, a row registered as following a
    /// repeated heading takes its top edge from `last_heading_row` instead of
    /// the row physically above it. Without it, a heading row above never
    /// contributes a top edge.
    pub fn effective_borders(
        &self,
        anchor: &Anchor,
        consider_heading_repeats: bool,
        last_heading_row: Option<usize>,
    ) -> Borders {
        let redirect = last_heading_row
            .filter(|_| consider_heading_repeats && self.follows_heading_repeat(anchor.row));
        let key = (anchor.row, anchor.column, consider_heading_repeats, redirect);
        if let Some(cached) = self.border_cache.borrow().get(&key) {
            return *cached;
        }

        let own_corner = self.cell(anchor).rounded_corner;
        let mut borders = self.span_borders(anchor);

        let blocked =
            |corner: RoundedCorner, a: RoundedCorner, b: RoundedCorner| corner == a || corner == b;

        if let Some(n) = self.neighbor(anchor, BorderSide::Left) {
            let corner = self.cell(n).rounded_corner;
            if !blocked(corner, RoundedCorner::TopRight, RoundedCorner::BottomRight)
                && !blocked(own_corner, RoundedCorner::TopLeft, RoundedCorner::BottomLeft)
            {
                let theirs = self.span_borders(n).right;
                if effective_width(theirs.as_ref()) >= effective_width(borders.left.as_ref()) {
                    borders.left = theirs;
                }
            }
        }

        if let Some(n) = self.neighbor(anchor, BorderSide::Right) {
            let corner = self.cell(n).rounded_corner;
            if !blocked(corner, RoundedCorner::TopLeft, RoundedCorner::BottomLeft)
                && !blocked(own_corner, RoundedCorner::TopRight, RoundedCorner::BottomRight)
            {
                let theirs = self.span_borders(n).left;
                if effective_width(theirs.as_ref()) > effective_width(borders.right.as_ref()) {
                    borders.right = theirs;
                }
            }
        }

        let top = match redirect {
            Some(heading) => self.covering_cell(heading, anchor.column),
            None => self
                .neighbor(anchor, BorderSide::Top)
                .filter(|n| consider_heading_repeats || !self.table.rows[n.row].heading),
        };
        if let Some(n) = top {
            let corner = self.cell(n).rounded_corner;
            if !blocked(corner, RoundedCorner::BottomLeft, RoundedCorner::BottomRight)
                && !blocked(own_corner, RoundedCorner::TopLeft, RoundedCorner::TopRight)
            {
                let theirs = self.span_borders(n).bottom;
                if effective_width(theirs.as_ref()) >= effective_width(borders.top.as_ref()) {
                    borders.top = theirs;
                }
            }
        }

        if let Some(n) = self.neighbor(anchor, BorderSide::Bottom) {
            let corner = self.cell(n).rounded_corner;
            if !blocked(corner, RoundedCorner::TopLeft, RoundedCorner::TopRight)
                && !blocked(own_corner, RoundedCorner::BottomLeft, RoundedCorner::BottomRight)
            {
                let theirs = self.span_borders(n).top;
                if effective_width(theirs.as_ref()) > effective_width(borders.bottom.as_ref()) {
                    borders.bottom = theirs;
                }
            }
        }

        equalize_rounded_corner(&mut borders, own_corner);
        self.border_cache.borrow_mut().insert(key, borders);
        borders
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Border, Color};

    fn grid(rows: usize, columns: usize) -> Table {
        let mut table = Table::new(&vec![50.0; columns]);
        for _ in 0..rows {
            let row = table.add_row();
            for _ in 0..columns {
                row.add_cell();
            }
        }
        table
    }

    #[test]
    fn every_position_has_exactly_one_anchor() {
        let mut table = grid(4, 4);
        table.rows[0].cells[0].merge_right = 1;
        table.rows[1].cells[2].merge_down = 2;
        table.rows[1].cells[2].merge_right = 1;
        table.rows[2].cells[0].merge_down = 1;
        let index = MergedCells::build(&table).unwrap();
        for r in 0..4 {
            for c in 0..4 {
                let covering: Vec<_> = index.anchors().iter().filter(|a| a.covers(r, c)).collect();
                assert_eq!(covering.len(), 1, "({r}, {c})");
                assert_eq!(index.covering_cell(r, c), Some(covering[0]));
            }
        }
        assert!(index.covering_cell(4, 0).is_none());
        let sorted = index
            .anchors()
            .windows(2)
            .all(|w| (w[0].row, w[0].column) < (w[1].row, w[1].column));
        assert!(sorted);
    }

    #[test]
    fn span_past_grid_is_rejected() {
        let mut table = grid(2, 2);
        table.rows[1].cells[1].merge_down = 1;
        match MergedCells::build(&table) {
            Err(FolioError::MergeOutOfRange { row: 1, column: 1, .. }) => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn overlapping_spans_are_rejected() {
        let mut table = grid(2, 3);
        table.rows[0].cells[0].merge_right = 1;
        table.rows[0].cells[1].merge_down = 1;
        assert!(matches!(
            MergedCells::build(&table),
            Err(FolioError::OverlappingMerge { .. })
        ));
    }

    #[test]
    fn extra_cells_are_rejected() {
        let mut table = grid(1, 2);
        table.rows[0].add_cell();
        assert!(matches!(MergedCells::build(&table), Err(FolioError::TooManyCells { .. })));
    }

    #[test]
    fn merged_right_edge_without_border_is_none() {
        let mut table = grid(2, 2);
        table.rows[0].cells[0].merge_right = 1;
        table.rows[0].cells[0].borders.left = Some(Border::default());
        let index = MergedCells::build(&table).unwrap();
        let anchor = *index.covering_cell(0, 0).unwrap();
        let borders = index.effective_borders(&anchor, true, None);
        assert!(borders.right.is_none());
        assert!(borders.left.is_some());
    }

    #[test]
    fn wider_neighbor_edge_wins() {
        let mut table = grid(1, 2);
        table.rows[0].cells[0].borders.right = Some(Border::new(0.5, Color::BLACK));
        table.rows[0].cells[1].borders.left = Some(Border::new(2.0, Color::RED));
        let index = MergedCells::build(&table).unwrap();
        let left = *index.covering_cell(0, 0).unwrap();
        assert_eq!(index.effective_borders(&left, true, None).right.unwrap().width, 2.0);
        let right = *index.covering_cell(0, 1).unwrap();
        assert_eq!(index.effective_borders(&right, true, None).left.unwrap().width, 2.0);
    }

    #[test]
    fn rounded_neighbor_is_ignored() {
        let mut table = grid(1, 2);
        table.rows[0].cells[0].rounded_corner = RoundedCorner::TopRight;
        table.rows[0].cells[0].borders.right = Some(Border::new(3.0, Color::BLACK));
        let index = MergedCells::build(&table).unwrap();
        let right = *index.covering_cell(0, 1).unwrap();
        assert!(index.effective_borders(&right, true, None).left.is_none());
    }

    #[test]
    fn repeated_heading_redirects_top_edge() {
        let mut table = grid(3, 1);
        table.rows[0].heading = true;
        table.rows[0].cells[0].borders.bottom = Some(Border::new(2.0, Color::BLACK));
        table.rows[1].cells[0].borders.bottom = Some(Border::new(1.0, Color::BLACK));
        let index = MergedCells::build(&table).unwrap();
        let third = *index.covering_cell(2, 0).unwrap();
        assert_eq!(index.effective_borders(&third, true, Some(0)).top.unwrap().width, 1.0);
        index.mark_heading_repeat(2);
        assert_eq!(index.effective_borders(&third, true, Some(0)).top.unwrap().width, 2.0);

        let second = *index.covering_cell(1, 0).unwrap();
        assert!(index.effective_borders(&second, false, Some(0)).top.is_none());
        assert_eq!(index.effective_borders(&second, true, Some(0)).top.unwrap().width, 2.0);
    }
}
