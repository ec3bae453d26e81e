//! # Layout Engine
//!
//! Two passes over a borrowed document. The format pass flows blocks into
//! areas and records, for every area, what part of each block landed there
//! ([`RenderInfo`]). The render pass replays those records onto a
//! [`Graphics`] surface page by page.
//!
//! Formatting is speculative: keep rules and remove-ending format the same
//! block several times against different areas. Nothing a format call does
//! is observable afterwards. List numbers are assigned before the pass,
//! bookmarks are collected after it, and heading-repeat marks are only made
//! while rendering.

pub mod area;
pub mod borders;
pub mod document;
pub mod fields;
pub mod formatter;
pub mod info;
pub mod merged_cells;
pub mod paragraph;
pub mod shape;
pub mod table;

pub use area::Rectangle;
pub use document::{DocumentLayout, LayoutEngine, PageLayout};
pub use fields::FieldValues;
pub use formatter::{AreaProvider, TopDownFormatter};
pub use info::{FormatInfo, LayoutInfo, RenderInfo};

use crate::error::Result;
use crate::graphics::{Graphics, TextMeasurer};
use crate::image_loader::ImageCache;
use crate::model::{Block, Document, Field, ListType, Metadata, NumberFormat, Paragraph};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;

/// Engine settings that are not part of the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutOptions {
    /// Interval of the implicit tab stops.
    pub default_tab_stop: f64,
    /// Character decimal tabs align on.
    pub decimal_separator: char,
    /// A row continued below a repeated heading takes its top border from
    /// the heading's last row.
    pub heading_repeat_borders: bool,
    /// Value for date fields. The current local time when unset.
    pub date: Option<NaiveDateTime>,
    /// Hyphenation language for documents that declare none.
    pub hyphenation_language: Option<String>,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            default_tab_stop: crate::model::cm(1.25),
            decimal_separator: '.',
            heading_repeat_borders: true,
            date: None,
            hyphenation_language: None,
        }
    }
}

/// Everything a format call may read.
pub struct FormatContext<'a> {
    pub measurer: &'a dyn TextMeasurer,
    pub options: &'a LayoutOptions,
    /// Provisional field values for the page being formatted.
    pub fields: RefCell<FieldValues>,
    pub images: ImageCache,
    /// List symbol per paragraph, keyed by the paragraph's address.
    list_symbols: HashMap<usize, String>,
    list_counters: [usize; 6],
}

impl<'a> FormatContext<'a> {
    pub fn new(measurer: &'a dyn TextMeasurer, options: &'a LayoutOptions) -> Self {
        let date = options.date.unwrap_or_else(|| chrono::Local::now().naive_local());
        Self {
            measurer,
            options,
            fields: RefCell::new(FieldValues::new(date, Metadata::default())),
            images: ImageCache::new(),
            list_symbols: HashMap::new(),
            list_counters: [0; 6],
        }
    }

    /// A context for laying out `document`: its metadata feeds info fields
    /// and every list paragraph gets its symbol.
    pub fn for_document(
        measurer: &'a dyn TextMeasurer,
        options: &'a LayoutOptions,
        document: &Document,
    ) -> Self {
        let mut ctx = Self::new(measurer, options);
        ctx.fields.get_mut().metadata = document.metadata.clone();
        for section in &document.sections {
            ctx.register_lists(&section.blocks);
        }
        ctx
    }

    /// Number the list paragraphs in `blocks`, in document order. Counters
    /// run per list type and restart where a paragraph does not continue the
    /// previous list.
    pub fn register_lists(&mut self, blocks: &[Block]) {
        for block in blocks {
            match block {
                Block::Paragraph(p) => self.register_paragraph(p),
                Block::Table(t) => {
                    for row in &t.rows {
                        for cell in &row.cells {
                            self.register_lists(&cell.blocks);
                        }
                    }
                }
                Block::TextFrame(f) => self.register_lists(&f.blocks),
                _ => {}
            }
        }
    }

    fn register_paragraph(&mut self, p: &Paragraph) {
        let Some(list) = p.format.list_info else {
            return;
        };
        let counter = &mut self.list_counters[list.list_type as usize];
        *counter = if list.continue_previous_list { *counter + 1 } else { 1 };
        let n = *counter;
        let symbol = match list.list_type {
            ListType::BulletList1 => "•".to_string(),
            ListType::BulletList2 => "o".to_string(),
            ListType::BulletList3 => "–".to_string(),
            ListType::NumberList1 => format!("{n}."),
            ListType::NumberList2 => {
                format!("{}.", fields::format_number(n, NumberFormat::LowerAlpha))
            }
            ListType::NumberList3 => {
                format!("{}.", fields::format_number(n, NumberFormat::LowerRoman))
            }
        };
        self.list_symbols.insert(p as *const Paragraph as usize, symbol);
    }

    pub fn list_symbol(&self, paragraph: &Paragraph) -> Option<&str> {
        self.list_symbols
            .get(&(paragraph as *const Paragraph as usize))
            .map(String::as_str)
    }

    /// A field's text as currently known.
    pub fn field_text(&self, field: &Field) -> String {
        self.fields.borrow().display(field)
    }
}

/// Everything a render call may use.
pub struct RenderContext<'g, 'a> {
    pub measurer: &'a dyn TextMeasurer,
    pub options: &'a LayoutOptions,
    /// Final field values for the page being drawn.
    pub fields: &'a FieldValues,
    pub images: &'a ImageCache,
    pub graphics: &'g mut dyn Graphics,
}

/// Layout facts known before a block is formatted.
pub fn initial_layout_info(block: &Block) -> LayoutInfo {
    match block {
        Block::Paragraph(p) => paragraph::initial_layout(p),
        Block::Table(t) => table::initial_layout(t),
        Block::PageBreak => LayoutInfo::default(),
        other => shape::initial_layout(other),
    }
}

/// Format `block` into `area`, continuing from `previous` (the part placed
/// in the previous area).
pub fn format_block<'d>(
    ctx: &FormatContext<'_>,
    block: &'d Block,
    area: Rectangle,
    previous: Option<&FormatInfo<'d>>,
    max_element_height: f64,
) -> Result<RenderInfo<'d>> {
    let (format, layout) = match block {
        Block::Paragraph(p) => {
            let previous = match previous {
                Some(FormatInfo::Paragraph(prev)) => Some(prev),
                _ => None,
            };
            let (info, layout) =
                paragraph::format_paragraph(ctx, p, area, previous, max_element_height);
            (FormatInfo::Paragraph(info), layout)
        }
        Block::Table(t) => {
            let previous = match previous {
                Some(FormatInfo::Table(prev)) => Some(prev),
                _ => None,
            };
            let (info, layout) = table::format_table(ctx, t, area, previous, max_element_height)?;
            (FormatInfo::Table(info), layout)
        }
        Block::PageBreak => {
            let layout = LayoutInfo {
                content_area: Rectangle::new(area.x, area.y, area.width, 0.0),
                ..LayoutInfo::default()
            };
            (FormatInfo::PageBreak, layout)
        }
        other => {
            let (info, layout) = shape::format_shape(ctx, other, area)?;
            (FormatInfo::Shape(info), layout)
        }
    };
    Ok(RenderInfo { block, layout, format })
}

pub fn render_block(rc: &mut RenderContext<'_, '_>, info: &RenderInfo<'_>) {
    match (&info.format, info.block) {
        (FormatInfo::Paragraph(f), Block::Paragraph(p)) => {
            paragraph::render_paragraph(rc, p, f, &info.layout)
        }
        (FormatInfo::Table(t), _) => table::render_table(rc, t, &info.layout),
        (FormatInfo::Shape(s), block) => shape::render_shape(rc, block, s, &info.layout),
        _ => {}
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::graphics::FontMetrics;
    use crate::model::Font;

    /// Every character is half the font size wide; lines are exactly the
    /// font size high.
    pub(crate) struct FixedMeasurer;

    impl TextMeasurer for FixedMeasurer {
        fn measure_text(&self, text: &str, font: &Font) -> f64 {
            text.chars().count() as f64 * font.effective_size() * 0.5
        }

        fn metrics(&self, font: &Font) -> FontMetrics {
            let size = font.effective_size();
            FontMetrics {
                ascent: size * 0.8,
                descent: size * 0.2,
                line_spacing: size,
            }
        }
    }

    /// Field values and an image cache for render calls.
    pub(crate) fn render_context() -> (FieldValues, ImageCache) {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default();
        (FieldValues::new(date, Metadata::default()), ImageCache::new())
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FixedMeasurer;
    use super::*;
    use crate::model::{ListInfo, ParagraphFormat};

    fn list_paragraph(list_type: ListType, continue_previous_list: bool) -> Block {
        let mut p = Paragraph::new(ParagraphFormat::default());
        p.format.list_info = Some(ListInfo {
            list_type,
            continue_previous_list,
        });
        p.add_text("item");
        Block::Paragraph(p)
    }

    #[test]
    fn list_numbers_restart_and_run_per_type() {
        let blocks = vec![
            list_paragraph(ListType::NumberList2, true),
            list_paragraph(ListType::NumberList1, true),
            list_paragraph(ListType::NumberList2, true),
            list_paragraph(ListType::NumberList2, false),
            list_paragraph(ListType::BulletList2, true),
        ];
        let measurer = FixedMeasurer;
        let options = LayoutOptions::default();
        let mut ctx = FormatContext::new(&measurer, &options);
        ctx.register_lists(&blocks);
        let symbols: Vec<_> = blocks
            .iter()
            .map(|b| match b {
                Block::Paragraph(p) => ctx.list_symbol(p).map(str::to_string),
                _ => None,
            })
            .collect();
        let expected = ["a.", "1.", "b.", "a.", "o"].map(|s| Some(s.to_string()));
        assert_eq!(symbols, expected.to_vec());
    }

    #[test]
    fn options_read_from_partial_json() {
        let options: LayoutOptions =
            serde_json::from_str(r#"{ "decimalSeparator": "," }"#).unwrap();
        assert_eq!(options.decimal_separator, ',');
        assert!(options.heading_repeat_borders);
        assert!((options.default_tab_stop - 35.433).abs() < 1e-3);
    }
}
