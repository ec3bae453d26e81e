//! # Top-Down Flow Formatter
//!
//! Places a sequence of blocks into the areas handed out by an
//! [`AreaProvider`], top to bottom. Each block is formatted against what is
//! left of the current area; the outcome decides whether it is accepted,
//! continued on the next area, or pushed there whole.
//!
//! Keep rules look ahead: a block with `keep_with_next` is only accepted if
//! the chain of blocks it is kept with can start in the same area (at most
//! [`MAX_COMBINE`] blocks are examined). When the tail of a split block is
//! too short to stand alone, the part left on the previous area gives up its
//! ending and the block is formatted again. All of this is decided on
//! immutable format records, so probing a block has no side effects.

use super::area::{Rectangle, TOLERANCE};
use super::info::{ElementAlignment, LayoutInfo, RenderInfo, VerticalReference};
use super::{format_block, initial_layout_info, FormatContext};
use crate::error::{FolioError, Result};
use crate::model::Block;

/// Upper bound on the blocks chained by `keep_with_next`.
pub const MAX_COMBINE: usize = 10;

/// A source of areas and the sink for what was placed in them.
///
/// The Nth call to [`AreaProvider::store_render_infos`] carries the content of
/// the Nth area returned by [`AreaProvider::next_area`].
pub trait AreaProvider<'d> {
    fn next_area(&mut self) -> Option<Rectangle>;
    /// The area `next_area` would return, without advancing.
    fn probe_next_area(&self) -> Option<Rectangle>;
    /// Resolve the element's x position. `false` leaves it where it is.
    fn position_horizontally(&self, layout: &mut LayoutInfo) -> bool;
    /// Resolve the element's y position. `false` leaves it in the flow.
    fn position_vertically(&self, layout: &mut LayoutInfo) -> bool;
    fn store_render_infos(&mut self, infos: Vec<RenderInfo<'d>>);
    /// Whether the element must start a new area.
    fn is_area_break_before(&self, layout: &LayoutInfo) -> bool;
    /// Reject blocks this kind of area cannot hold.
    fn check_supported(&self, block: &Block) -> Result<()>;
}

/// Combine the bottom margin of one element with the top margin of the next:
/// the larger wins, negative margins add up.
pub fn margin_max(bottom: f64, top: f64) -> f64 {
    if bottom >= 0.0 && top >= 0.0 {
        bottom.max(top)
    } else {
        bottom + top
    }
}

/// Place an element horizontally inside `reference`.
pub fn align_horizontally(layout: &mut LayoutInfo, reference: Rectangle, odd_page: bool) -> bool {
    let width = layout.content_area.width;
    let near = if layout.left != 0.0 {
        reference.x + layout.left
    } else {
        reference.x + layout.margin_left
    };
    let far = reference.right() - width - layout.margin_right;
    layout.content_area.x = match layout.horizontal_alignment {
        ElementAlignment::Near => near,
        ElementAlignment::Far => far,
        ElementAlignment::Center => reference.x + (reference.width - width) / 2.0,
        ElementAlignment::Inside if odd_page => near,
        ElementAlignment::Inside => far,
        ElementAlignment::Outside if odd_page => far,
        ElementAlignment::Outside => near,
    };
    true
}

/// Place an element vertically inside `reference`. Flowing elements stay put.
pub fn align_vertically(layout: &mut LayoutInfo, reference: Rectangle) -> bool {
    if layout.vertical_reference == VerticalReference::PreviousElement {
        return false;
    }
    let height = layout.content_area.height;
    layout.content_area.y = match layout.vertical_alignment {
        ElementAlignment::Near | ElementAlignment::Inside => {
            if layout.top != 0.0 {
                reference.y + layout.top
            } else {
                reference.y + layout.margin_top
            }
        }
        ElementAlignment::Center => reference.y + (reference.height - height) / 2.0,
        ElementAlignment::Far | ElementAlignment::Outside => {
            reference.bottom() - height - layout.margin_bottom
        }
    };
    true
}

/// Flows `blocks` into areas.
pub struct TopDownFormatter<'c, 'a, 'd> {
    ctx: &'c FormatContext<'a>,
    blocks: &'d [Block],
}

/// The lists of one area waiting to be stored: held back while its last
/// element continues, since that element may still give up its ending.
type Pending<'d> = Option<Vec<RenderInfo<'d>>>;

impl<'c, 'a, 'd> TopDownFormatter<'c, 'a, 'd> {
    pub fn new(ctx: &'c FormatContext<'a>, blocks: &'d [Block]) -> Self {
        Self { ctx, blocks }
    }

    pub fn format_on_areas(&self, provider: &mut dyn AreaProvider<'d>) -> Result<()> {
        let Some(mut area) = provider.next_area() else {
            return Ok(());
        };
        if self.blocks.is_empty() {
            provider.store_render_infos(Vec::new());
            return Ok(());
        }

        let mut max_height = area.height;
        let mut current: Vec<RenderInfo<'d>> = Vec::new();
        let mut pending: Pending<'d> = None;
        let mut continuation: Option<RenderInfo<'d>> = None;
        let mut first = true;
        let mut prev_bottom = 0.0;
        let mut retracted = false;
        let mut area_open = true;
        let mut idx = 0;

        while idx < self.blocks.len() {
            let block = &self.blocks[idx];
            provider.check_supported(block)?;

            let initial = initial_layout_info(block);
            let mut formatting_area = area;
            if continuation.is_none() && initial.advances_flow() {
                let distance = if first {
                    0.0
                } else {
                    margin_max(prev_bottom, initial.margin_top)
                };
                formatting_area = area.lower(distance);
            }

            let previous = continuation.as_ref().map(|c| &c.format);
            let mut info = format_block(self.ctx, block, formatting_area, previous, max_height)?;

            let break_before = !first
                && (provider.is_area_break_before(&info.layout)
                    || self.is_forced_area_break(
                        provider,
                        idx,
                        &info,
                        formatting_area,
                        max_height,
                    )?);

            if !break_before && info.format.is_ending() {
                if let Some(prev) = continuation.as_ref().filter(|_| !retracted) {
                    let trailing = prev.layout.trailing_height + info.layout.trailing_height;
                    if !info.format.ending_is_complete() && max_height > trailing + TOLERANCE {
                        if let Some(shorter) = prev.with_ending_removed() {
                            tracing::debug!(
                                block = idx,
                                kind = block.kind_name(),
                                "previous part gives up its ending"
                            );
                            if let Some(list) = pending.as_mut() {
                                list.pop();
                                if !shorter.format.is_empty() {
                                    list.push(shorter.clone());
                                }
                            }
                            continuation = Some(shorter);
                            retracted = true;
                            continue;
                        }
                    }
                }

                let move_ending = self.needs_ending_on_next_area(
                    provider,
                    idx,
                    &info,
                    formatting_area,
                    first,
                    max_height,
                )?;
                if move_ending {
                    if let Some(shorter) = info.with_ending_removed() {
                        tracing::debug!(
                            block = idx,
                            kind = block.kind_name(),
                            "ending moved to keep with next"
                        );
                        continuation =
                            self.finish_area(provider, shorter, false, &mut current, &mut pending);
                        retracted = false;
                        match provider.next_area() {
                            Some(next) => area = next,
                            None => {
                                area_open = false;
                                break;
                            }
                        }
                        max_height = area.height;
                        first = true;
                        prev_bottom = 0.0;
                        continue;
                    }
                }

                self.accept(provider, &mut info);
                let advances = info.layout.advances_flow();
                if advances {
                    area = formatting_area.lower(info.layout.content_area.height);
                    prev_bottom = info.layout.margin_bottom;
                    first = false;
                }
                let is_page_break = matches!(block, Block::PageBreak);
                current.push(info);
                continuation = None;
                retracted = false;
                if let Some(list) = pending.take() {
                    provider.store_render_infos(list);
                }
                idx += 1;

                if is_page_break && idx < self.blocks.len() {
                    self.finish_current(provider, &mut current, &mut pending);
                    match provider.next_area() {
                        Some(next) => area = next,
                        None => {
                            area_open = false;
                            break;
                        }
                    }
                    max_height = area.height;
                    first = true;
                    prev_bottom = 0.0;
                }
            } else if info.format.is_empty() && first {
                tracing::debug!(
                    block = idx,
                    kind = block.kind_name(),
                    "block fits no area, placed unbounded"
                );
                let unbounded = Rectangle::unbounded(
                    formatting_area.x,
                    formatting_area.y,
                    formatting_area.width,
                );
                let previous = continuation.as_ref().map(|c| &c.format);
                let mut info = format_block(self.ctx, block, unbounded, previous, max_height)?;
                self.accept(provider, &mut info);
                area = formatting_area.lower(info.layout.content_area.height);
                prev_bottom = info.layout.margin_bottom;
                first = false;
                current.push(info);
                continuation = None;
                retracted = false;
                if let Some(list) = pending.take() {
                    provider.store_render_infos(list);
                }
                idx += 1;
            } else {
                tracing::debug!(block = idx, kind = block.kind_name(), break_before, "area break");
                continuation =
                    self.finish_area(provider, info, break_before, &mut current, &mut pending);
                retracted = false;
                match provider.next_area() {
                    Some(next) => area = next,
                    None => {
                        area_open = false;
                        break;
                    }
                }
                max_height = area.height;
                first = true;
                prev_bottom = 0.0;
            }
        }

        if let Some(list) = pending.take() {
            provider.store_render_infos(list);
        }
        if area_open {
            provider.store_render_infos(current);
        }
        Ok(())
    }

    fn accept(&self, provider: &dyn AreaProvider<'d>, info: &mut RenderInfo<'d>) {
        provider.position_horizontally(&mut info.layout);
        provider.position_vertically(&mut info.layout);
    }

    /// Close the current area with `last` as its final record. Returns the
    /// part to continue from on the next area.
    fn finish_area(
        &self,
        provider: &mut dyn AreaProvider<'d>,
        mut last: RenderInfo<'d>,
        break_before: bool,
        current: &mut Vec<RenderInfo<'d>>,
        pending: &mut Pending<'d>,
    ) -> Option<RenderInfo<'d>> {
        let mut continuation = None;
        if !(last.format.is_empty() || break_before) {
            self.accept(provider, &mut last);
            if !last.format.is_ending() {
                continuation = Some(last.clone());
            }
            current.push(last);
        }
        if let Some(list) = pending.take() {
            provider.store_render_infos(list);
        }
        let list = std::mem::take(current);
        if continuation.is_some() {
            *pending = Some(list);
        } else {
            provider.store_render_infos(list);
        }
        continuation
    }

    fn finish_current(
        &self,
        provider: &mut dyn AreaProvider<'d>,
        current: &mut Vec<RenderInfo<'d>>,
        pending: &mut Pending<'d>,
    ) {
        if let Some(list) = pending.take() {
            provider.store_render_infos(list);
        }
        provider.store_render_infos(std::mem::take(current));
    }

    fn is_forced_area_break(
        &self,
        provider: &dyn AreaProvider<'d>,
        idx: usize,
        info: &RenderInfo<'d>,
        area: Rectangle,
        max_height: f64,
    ) -> Result<bool> {
        let format = &info.format;
        let layout = &info.layout;
        if format.is_starting() && !format.starting_is_complete() {
            return Ok(true);
        }
        if layout.keep_together && !format.is_complete() {
            return Ok(true);
        }
        if layout.keep_together && layout.keep_with_next {
            let rest = area.lower(layout.content_area.height);
            return self.next_elements_dont_fit(
                provider,
                idx,
                rest,
                layout.margin_bottom,
                max_height,
            );
        }
        Ok(false)
    }

    fn needs_ending_on_next_area(
        &self,
        provider: &dyn AreaProvider<'d>,
        idx: usize,
        info: &RenderInfo<'d>,
        area: Rectangle,
        first: bool,
        max_height: f64,
    ) -> Result<bool> {
        let layout = &info.layout;
        if first || !layout.keep_with_next || !info.format.ending_is_complete() {
            return Ok(false);
        }
        if provider.probe_next_area().is_none() {
            return Ok(false);
        }
        let rest = area.lower(layout.content_area.height);
        self.next_elements_dont_fit(provider, idx, rest, layout.margin_bottom, max_height)
    }

    /// Whether the blocks kept with block `idx` fail to start in `area`.
    fn next_elements_dont_fit(
        &self,
        provider: &dyn AreaProvider<'d>,
        idx: usize,
        mut area: Rectangle,
        mut prev_bottom: f64,
        max_height: f64,
    ) -> Result<bool> {
        let end = (idx + 1 + MAX_COMBINE).min(self.blocks.len());
        for block in &self.blocks[idx + 1..end] {
            let initial = initial_layout_info(block);
            if provider.is_area_break_before(&initial) {
                return Ok(false);
            }
            area = area.lower(margin_max(prev_bottom, initial.margin_top));
            if area.height <= 0.0 {
                return Ok(true);
            }
            let info = format_block(self.ctx, block, area, None, max_height)?;
            if info.layout.vertical_reference != VerticalReference::PreviousElement {
                return Ok(false);
            }
            if !info.format.starting_is_complete() {
                return Ok(true);
            }
            if info.layout.keep_together && !info.format.is_complete() {
                return Ok(true);
            }
            if !(info.layout.keep_together && info.layout.keep_with_next) {
                return Ok(false);
            }
            area = area.lower(info.layout.content_area.height);
            prev_bottom = info.layout.margin_bottom;
        }
        Ok(false)
    }
}

/// One area, handed out once. Table cells, text frames and headers/footers
/// are flowed into it.
pub struct SingleAreaProvider<'d> {
    area: Rectangle,
    context: &'static str,
    handed_out: bool,
    infos: Vec<RenderInfo<'d>>,
}

impl<'d> SingleAreaProvider<'d> {
    pub fn new(area: Rectangle, context: &'static str) -> Self {
        Self {
            area,
            context,
            handed_out: false,
            infos: Vec::new(),
        }
    }

    pub fn into_render_infos(self) -> Vec<RenderInfo<'d>> {
        self.infos
    }
}

impl<'d> AreaProvider<'d> for SingleAreaProvider<'d> {
    fn next_area(&mut self) -> Option<Rectangle> {
        if self.handed_out {
            return None;
        }
        self.handed_out = true;
        Some(self.area)
    }

    fn probe_next_area(&self) -> Option<Rectangle> {
        (!self.handed_out).then_some(self.area)
    }

    fn position_horizontally(&self, layout: &mut LayoutInfo) -> bool {
        align_horizontally(layout, self.area, true)
    }

    fn position_vertically(&self, layout: &mut LayoutInfo) -> bool {
        align_vertically(layout, self.area)
    }

    fn store_render_infos(&mut self, infos: Vec<RenderInfo<'d>>) {
        self.infos.extend(infos);
    }

    fn is_area_break_before(&self, _layout: &LayoutInfo) -> bool {
        false
    }

    fn check_supported(&self, block: &Block) -> Result<()> {
        match block {
            Block::PageBreak => Err(FolioError::UnsupportedElement {
                element: "page break",
                context: self.context,
            }),
            _ => Ok(()),
        }
    }
}

/// Height taken by flowed content: the lowest bottom edge plus the last
/// element's bottom margin.
pub fn content_height(infos: &[RenderInfo<'_>], top: f64) -> f64 {
    let flowing = infos.iter().filter(|i| i.layout.advances_flow());
    let bottom = flowing.clone().map(|i| i.layout.content_area.bottom() - top).fold(0.0, f64::max);
    let margin = flowing.last().map_or(0.0, |i| i.layout.margin_bottom);
    bottom + margin
}

/// Flow `blocks` into one area. Content that does not fit a bounded area is
/// dropped.
pub fn format_in_area<'d>(
    ctx: &FormatContext<'_>,
    blocks: &'d [Block],
    area: Rectangle,
    context: &'static str,
) -> Result<(Vec<RenderInfo<'d>>, f64)> {
    let mut provider = SingleAreaProvider::new(area, context);
    TopDownFormatter::new(ctx, blocks).format_on_areas(&mut provider)?;
    let infos = provider.into_render_infos();
    let height = content_height(&infos, area.y);
    Ok((infos, height))
}

/// Flow a table cell's blocks into an unbounded area at the origin.
pub fn format_cell_blocks<'d>(
    ctx: &FormatContext<'_>,
    blocks: &'d [Block],
    width: f64,
) -> Result<(Vec<RenderInfo<'d>>, f64)> {
    format_in_area(ctx, blocks, Rectangle::unbounded(0.0, 0.0, width), "a table cell")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::info::FormatInfo;
    use crate::layout::testing::FixedMeasurer;
    use crate::layout::LayoutOptions;
    use crate::model::{Paragraph, ParagraphFormat};

    /// Equal areas 100 pt wide, each area's records kept separately.
    struct Areas<'d> {
        height: f64,
        remaining: usize,
        stored: Vec<Vec<RenderInfo<'d>>>,
    }

    impl<'d> Areas<'d> {
        fn new(height: f64, count: usize) -> Self {
            Self {
                height,
                remaining: count,
                stored: Vec::new(),
            }
        }

        /// Lines per area for every record, as (block index, lines).
        fn lines(&self, blocks: &[Block]) -> Vec<Vec<(usize, usize)>> {
            self.stored
                .iter()
                .map(|area| {
                    area.iter()
                        .map(|info| {
                            let idx = blocks
                                .iter()
                                .position(|b| std::ptr::eq(b, info.block))
                                .unwrap();
                            let lines = match &info.format {
                                FormatInfo::Paragraph(p) => p.lines.len(),
                                _ => 0,
                            };
                            (idx, lines)
                        })
                        .collect()
                })
                .collect()
        }
    }

    impl<'d> AreaProvider<'d> for Areas<'d> {
        fn next_area(&mut self) -> Option<Rectangle> {
            if self.remaining == 0 {
                return None;
            }
            self.remaining -= 1;
            Some(Rectangle::new(0.0, 0.0, 100.0, self.height))
        }

        fn probe_next_area(&self) -> Option<Rectangle> {
            (self.remaining > 0).then(|| Rectangle::new(0.0, 0.0, 100.0, self.height))
        }

        fn position_horizontally(&self, layout: &mut LayoutInfo) -> bool {
            align_horizontally(layout, Rectangle::new(0.0, 0.0, 100.0, self.height), true)
        }

        fn position_vertically(&self, layout: &mut LayoutInfo) -> bool {
            align_vertically(layout, Rectangle::new(0.0, 0.0, 100.0, self.height))
        }

        fn store_render_infos(&mut self, infos: Vec<RenderInfo<'d>>) {
            self.stored.push(infos);
        }

        fn is_area_break_before(&self, layout: &LayoutInfo) -> bool {
            layout.page_break_before
        }

        fn check_supported(&self, _block: &Block) -> Result<()> {
            Ok(())
        }
    }

    /// A paragraph of `lines` hard-broken 10 pt lines.
    fn lines(lines: usize, format: ParagraphFormat) -> Block {
        let mut p = Paragraph::new(format);
        for i in 0..lines {
            if i > 0 {
                p.add_line_break();
            }
            p.add_text("x");
        }
        Block::Paragraph(p)
    }

    fn run(blocks: &[Block], height: f64) -> Vec<Vec<(usize, usize)>> {
        let measurer = FixedMeasurer;
        let options = LayoutOptions::default();
        let ctx = FormatContext::new(&measurer, &options);
        let mut areas = Areas::new(height, 20);
        TopDownFormatter::new(&ctx, blocks).format_on_areas(&mut areas).unwrap();
        areas.lines(blocks)
    }

    fn plain() -> ParagraphFormat {
        ParagraphFormat {
            widow_control: false,
            ..Default::default()
        }
    }

    #[test]
    fn margins_combine_by_maximum() {
        assert_eq!(margin_max(6.0, 4.0), 6.0);
        assert_eq!(margin_max(6.0, -4.0), 2.0);
        assert_eq!(margin_max(-1.0, -2.0), -3.0);
    }

    #[test]
    fn paragraph_overflows_into_next_area() {
        let blocks = vec![lines(3, plain()), lines(1, plain())];
        assert_eq!(run(&blocks, 25.0), vec![vec![(0, 2)], vec![(0, 1), (1, 1)]]);
    }

    #[test]
    fn space_between_uses_the_larger_margin() {
        let first = ParagraphFormat {
            space_after: 6.0,
            ..plain()
        };
        let second = ParagraphFormat {
            space_before: 4.0,
            ..plain()
        };
        let blocks = vec![lines(1, first), lines(1, second)];
        let measurer = FixedMeasurer;
        let options = LayoutOptions::default();
        let ctx = FormatContext::new(&measurer, &options);
        let mut areas = Areas::new(100.0, 1);
        TopDownFormatter::new(&ctx, &blocks).format_on_areas(&mut areas).unwrap();
        let ys: Vec<f64> = areas.stored[0].iter().map(|i| i.layout.content_area.y).collect();
        assert_eq!(ys, vec![0.0, 16.0]);
    }

    #[test]
    fn keep_together_moves_whole_paragraph() {
        let kept = ParagraphFormat {
            keep_together: true,
            ..plain()
        };
        let blocks = vec![lines(2, plain()), lines(2, kept)];
        assert_eq!(run(&blocks, 35.0), vec![vec![(0, 2)], vec![(1, 2)]]);
    }

    #[test]
    fn keep_with_next_pulls_heading_along() {
        let heading = ParagraphFormat {
            keep_with_next: true,
            keep_together: true,
            ..plain()
        };
        let kept_body = ParagraphFormat {
            keep_together: true,
            ..plain()
        };
        let blocks = vec![lines(2, plain()), lines(1, heading), lines(2, kept_body)];
        assert_eq!(run(&blocks, 40.0), vec![vec![(0, 2)], vec![(1, 1), (2, 2)]]);
    }

    #[test]
    fn keep_with_next_looks_ahead_at_most_ten_blocks() {
        let chained = ParagraphFormat {
            keep_with_next: true,
            keep_together: true,
            ..plain()
        };
        let kept = ParagraphFormat {
            keep_together: true,
            ..plain()
        };
        let mut blocks = vec![lines(1, plain())];
        blocks.extend((0..11).map(|_| lines(1, chained.clone())));
        blocks.push(lines(4, kept));
        assert_eq!(blocks.len(), 13);

        // Block 1 cannot see block 12, which will not fit after block 11,
        // so it stays. Block 2 can, and breaks to the next area.
        let mut second: Vec<(usize, usize)> = (2..12).map(|i| (i, 1)).collect();
        second.push((12, 4));
        assert_eq!(run(&blocks, 150.0), vec![vec![(0, 1), (1, 1)], second]);
    }

    #[test]
    fn widow_line_pulls_one_line_back() {
        let widowed = ParagraphFormat::default();
        let blocks = vec![lines(1, plain()), lines(4, widowed)];
        // 4 lines after one: three fit, the last would be alone.
        assert_eq!(run(&blocks, 40.0), vec![vec![(0, 1), (1, 2)], vec![(1, 2)]]);
    }

    #[test]
    fn page_break_before_starts_new_area() {
        let breaking = ParagraphFormat {
            page_break_before: true,
            ..plain()
        };
        let blocks = vec![lines(1, plain()), lines(1, breaking)];
        assert_eq!(run(&blocks, 100.0), vec![vec![(0, 1)], vec![(1, 1)]]);
    }

    #[test]
    fn oversized_block_is_placed_unbounded() {
        let mut chart = crate::model::Chart::default();
        chart.shape.height = Some(500.0);
        let blocks = vec![Block::Chart(chart), lines(1, plain())];
        assert_eq!(run(&blocks, 100.0), vec![vec![(0, 0)], vec![(1, 1)]]);
    }

    #[test]
    fn single_area_rejects_page_breaks() {
        let measurer = FixedMeasurer;
        let options = LayoutOptions::default();
        let ctx = FormatContext::new(&measurer, &options);
        let blocks = vec![Block::PageBreak];
        let err = format_cell_blocks(&ctx, &blocks, 100.0).unwrap_err();
        assert!(matches!(err, FolioError::UnsupportedElement { element: "page break", .. }));
    }

    #[test]
    fn cell_height_includes_last_bottom_margin() {
        let measurer = FixedMeasurer;
        let options = LayoutOptions::default();
        let ctx = FormatContext::new(&measurer, &options);
        let spaced = ParagraphFormat {
            space_after: 4.0,
            ..plain()
        };
        let blocks = vec![lines(2, plain()), lines(1, spaced)];
        let (infos, height) = format_cell_blocks(&ctx, &blocks, 100.0).unwrap();
        assert_eq!(infos.len(), 2);
        assert_eq!(height, 34.0);
    }
}
