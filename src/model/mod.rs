//! # Document Model
//!
//! The input representation for the layout engine. A document is a list of
//! sections, each carrying a page setup, headers and footers, and a flat
//! stream of blocks. Paragraph content is a small tree: leaves (words,
//! blanks, tabs, fields, inline images) wrapped in formatted-text and
//! hyperlink containers.
//!
//! Every format in the tree is already fully resolved. The engine borrows the
//! tree for the whole layout pass and never mutates it.

pub mod format;

pub use format::*;

use crate::error::Result;
use crate::text;
use serde::{Deserialize, Serialize};

/// A complete document ready for layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub sections: Vec<Section>,
    /// Custom fonts to register before layout.
    #[serde(default)]
    pub fonts: Vec<FontEntry>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a document from JSON and normalise its text into leaves.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_json_with_language(json, None)
    }

    /// Like [`Document::from_json`], hyphenating in `fallback_lang` when the
    /// document declares no language.
    pub fn from_json_with_language(json: &str, fallback_lang: Option<&str>) -> Result<Self> {
        let mut document: Document = serde_json::from_str(json)?;
        if document.metadata.lang.is_none() {
            document.metadata.lang = fallback_lang.map(str::to_string);
        }
        document.normalize();
        Ok(document)
    }

    pub fn add_section(&mut self, section: Section) -> &mut Section {
        self.sections.push(section);
        let last = self.sections.len() - 1;
        &mut self.sections[last]
    }

    /// Split every text leaf into words, blanks, tabs, line breaks and soft
    /// hyphens. Paragraphs with `hyphenate` set get algorithmic soft hyphens
    /// in the document language.
    pub fn normalize(&mut self) {
        let lang = self.metadata.lang.clone();
        for section in &mut self.sections {
            let lang = lang.as_deref();
            for blocks in section.headers.all_mut().chain(section.footers.all_mut()) {
                normalize_blocks(blocks, lang);
            }
            normalize_blocks(&mut section.blocks, lang);
        }
    }
}

fn normalize_blocks(blocks: &mut [Block], lang: Option<&str>) {
    for block in blocks {
        match block {
            Block::Paragraph(p) => p.normalize(lang),
            Block::Table(t) => {
                for row in &mut t.rows {
                    for cell in &mut row.cells {
                        normalize_blocks(&mut cell.blocks, lang);
                    }
                }
            }
            Block::TextFrame(f) => normalize_blocks(&mut f.blocks, lang),
            _ => {}
        }
    }
}

/// A custom font to register with the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontEntry {
    /// Font family name (e.g. "Inter").
    pub family: String,
    /// Base64-encoded font data, a data URI, or a file path.
    pub src: String,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
}

/// Document metadata embedded in the output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    /// Document language (BCP 47 tag, e.g. "en-US"). Drives hyphenation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

// ── Page setup ──────────────────────────────────────────────────

/// Standard page sizes in points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Custom {
        width: f64,
        height: f64,
    },
}

impl PageSize {
    /// Returns (width, height) in points, portrait.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::A3 => (841.89, 1190.55),
            PageSize::A5 => (419.53, 595.28),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Where a section's first page goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionStart {
    #[default]
    NewPage,
    OddPage,
    EvenPage,
}

/// Edge values (margins).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Edges {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Edges {
    pub fn uniform(v: f64) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageSetup {
    pub size: PageSize,
    pub orientation: Orientation,
    pub margin: Edges,
    /// Distance from the top page edge to the header.
    pub header_distance: f64,
    /// Distance from the bottom page edge to the footer.
    pub footer_distance: f64,
    pub columns: usize,
    pub column_spacing: f64,
    pub different_first_page: bool,
    pub odd_and_even_pages: bool,
    pub section_start: SectionStart,
    /// Restart page numbering at this value.
    pub starting_number: Option<usize>,
    /// Mirror left/right margins on even pages.
    pub mirror_margins: bool,
}

impl Default for PageSetup {
    fn default() -> Self {
        Self {
            size: PageSize::A4,
            orientation: Orientation::Portrait,
            margin: Edges::uniform(cm(2.5)),
            header_distance: cm(1.25),
            footer_distance: cm(1.25),
            columns: 1,
            column_spacing: cm(1.25),
            different_first_page: false,
            odd_and_even_pages: false,
            section_start: SectionStart::NewPage,
            starting_number: None,
            mirror_margins: false,
        }
    }
}

impl PageSetup {
    /// Page (width, height) after orientation.
    pub fn page_dimensions(&self) -> (f64, f64) {
        let (w, h) = self.size.dimensions();
        match self.orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }
}

// ── Sections ────────────────────────────────────────────────────

/// Header or footer content, per page kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeaderFooter {
    pub primary: Vec<Block>,
    pub first_page: Vec<Block>,
    pub even_page: Vec<Block>,
}

impl HeaderFooter {
    fn all_mut(&mut self) -> impl Iterator<Item = &mut Vec<Block>> {
        [&mut self.primary, &mut self.first_page, &mut self.even_page].into_iter()
    }

    /// The blocks to show on a page. Empty if the page has no header.
    pub fn for_page(&self, setup: &PageSetup, first_in_section: bool, even: bool) -> &[Block] {
        if setup.different_first_page && first_in_section {
            &self.first_page
        } else if setup.odd_and_even_pages && even {
            &self.even_page
        } else {
            &self.primary
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Section {
    pub page_setup: PageSetup,
    pub headers: HeaderFooter,
    pub footers: HeaderFooter,
    pub blocks: Vec<Block>,
}

impl Section {
    pub fn new(page_setup: PageSetup) -> Self {
        Self {
            page_setup,
            ..Default::default()
        }
    }

    pub fn add_block(&mut self, block: impl Into<Block>) {
        self.blocks.push(block.into());
    }

    pub fn add_paragraph(&mut self, text: &str, format: ParagraphFormat) -> &mut Paragraph {
        let mut p = Paragraph::new(format);
        p.add_text(text);
        self.blocks.push(Block::Paragraph(p));
        match self.blocks.last_mut() {
            Some(Block::Paragraph(p)) => p,
            _ => unreachable!("a paragraph was just pushed"),
        }
    }
}

// ── Blocks ──────────────────────────────────────────────────────

/// A block-level element.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
    TextFrame(TextFrame),
    Image(Image),
    Chart(Chart),
    Barcode(Barcode),
    PageBreak,
}

impl Block {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Block::Paragraph(_) => "Paragraph",
            Block::Table(_) => "Table",
            Block::TextFrame(_) => "TextFrame",
            Block::Image(_) => "Image",
            Block::Chart(_) => "Chart",
            Block::Barcode(_) => "Barcode",
            Block::PageBreak => "PageBreak",
        }
    }
}

impl From<Paragraph> for Block {
    fn from(p: Paragraph) -> Self {
        Block::Paragraph(p)
    }
}

impl From<Table> for Block {
    fn from(t: Table) -> Self {
        Block::Table(t)
    }
}

impl From<TextFrame> for Block {
    fn from(f: TextFrame) -> Self {
        Block::TextFrame(f)
    }
}

impl From<Image> for Block {
    fn from(i: Image) -> Self {
        Block::Image(i)
    }
}

// ── Paragraph content ───────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Paragraph {
    pub format: ParagraphFormat,
    pub content: Vec<Inline>,
}

impl Paragraph {
    pub fn new(format: ParagraphFormat) -> Self {
        Self {
            format,
            content: Vec::new(),
        }
    }

    /// Append text, split into word/blank/tab/break leaves.
    pub fn add_text(&mut self, s: &str) -> &mut Self {
        self.content.extend(text::split_into_leaves(s, None));
        self
    }

    pub fn add_inline(&mut self, inline: Inline) -> &mut Self {
        self.content.push(inline);
        self
    }

    pub fn add_formatted_text(&mut self, s: &str, font: Font) -> &mut Self {
        self.content.push(Inline::FormattedText(FormattedText {
            font,
            content: text::split_into_leaves(s, None),
        }));
        self
    }

    pub fn add_tab(&mut self) -> &mut Self {
        self.content.push(Inline::Tab);
        self
    }

    pub fn add_line_break(&mut self) -> &mut Self {
        self.content.push(Inline::LineBreak);
        self
    }

    pub fn add_field(&mut self, field: Field) -> &mut Self {
        self.content.push(Inline::Field { field });
        self
    }

    fn normalize(&mut self, lang: Option<&str>) {
        let hyphen_lang = if self.format.hyphenate {
            Some(lang.unwrap_or("en"))
        } else {
            None
        };
        let content = std::mem::take(&mut self.content);
        self.content = normalize_inlines(content, hyphen_lang);
    }
}

fn normalize_inlines(content: Vec<Inline>, lang: Option<&str>) -> Vec<Inline> {
    let mut out = Vec::with_capacity(content.len());
    for inline in content {
        match inline {
            Inline::Text { text: t } => out.extend(text::split_into_leaves(&t, lang)),
            Inline::FormattedText(ft) => out.push(Inline::FormattedText(FormattedText {
                font: ft.font,
                content: normalize_inlines(ft.content, lang),
            })),
            Inline::Hyperlink(h) => out.push(Inline::Hyperlink(Hyperlink {
                target: h.target,
                content: normalize_inlines(h.content, lang),
            })),
            other => out.push(other),
        }
    }
    out
}

/// Inline content of a paragraph. Everything except `FormattedText` and
/// `Hyperlink` is a leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Inline {
    /// A word fragment. After normalisation it contains no whitespace.
    Text { text: String },
    Blank,
    Tab,
    LineBreak,
    SoftHyphen,
    Symbol { symbol: Symbol },
    Field { field: Field },
    Image(Image),
    FormattedText(FormattedText),
    Hyperlink(Hyperlink),
}

impl Inline {
    pub fn text(s: &str) -> Self {
        Inline::Text {
            text: s.to_string(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        !matches!(self, Inline::FormattedText(_) | Inline::Hyperlink(_))
    }

    /// Children of a container, or `None` for a leaf.
    pub fn children(&self) -> Option<&[Inline]> {
        match self {
            Inline::FormattedText(ft) => Some(&ft.content),
            Inline::Hyperlink(h) => Some(&h.content),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedText {
    pub font: Font,
    #[serde(default)]
    pub content: Vec<Inline>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LinkTarget {
    Url(String),
    Bookmark(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperlink {
    pub target: LinkTarget,
    #[serde(default)]
    pub content: Vec<Inline>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Symbol {
    Euro,
    Copyright,
    Trademark,
    RegisteredTrademark,
    Bullet,
    Not,
    EmDash,
    EnDash,
    NonBreakableBlank,
    EnSpace,
    EmSpace,
    EmQuarterSpace,
}

impl Symbol {
    pub fn as_char(self) -> char {
        match self {
            Symbol::Euro => '€',
            Symbol::Copyright => '©',
            Symbol::Trademark => '™',
            Symbol::RegisteredTrademark => '®',
            Symbol::Bullet => '•',
            Symbol::Not => '¬',
            Symbol::EmDash => '—',
            Symbol::EnDash => '–',
            Symbol::NonBreakableBlank => '\u{a0}',
            Symbol::EnSpace => '\u{2002}',
            Symbol::EmSpace => '\u{2003}',
            Symbol::EmQuarterSpace => '\u{2005}',
        }
    }

    /// Spacing symbols are measured by font size, not glyph width.
    pub fn fixed_width(self, font_size: f64) -> Option<f64> {
        match self {
            Symbol::EnSpace => Some(font_size / 2.0),
            Symbol::EmSpace => Some(font_size),
            Symbol::EmQuarterSpace => Some(font_size / 4.0),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InfoField {
    #[default]
    Title,
    Author,
    Subject,
    Keywords,
}

/// Number formats for page fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumberFormat {
    #[default]
    Arabic,
    LowerRoman,
    UpperRoman,
    LowerAlpha,
    UpperAlpha,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Field {
    PageNumber {
        #[serde(default)]
        format: NumberFormat,
    },
    NumPages {
        #[serde(default)]
        format: NumberFormat,
    },
    Section {
        #[serde(default)]
        format: NumberFormat,
    },
    SectionPages {
        #[serde(default)]
        format: NumberFormat,
    },
    /// `format` is a chrono strftime pattern.
    Date { format: String },
    Info { info: InfoField },
    /// The page number a bookmark lands on.
    PageRef {
        bookmark: String,
        #[serde(default)]
        format: NumberFormat,
    },
    /// Zero-width anchor.
    Bookmark { name: String },
}

// ── Tables ──────────────────────────────────────────────────────

/// Default cell padding left and right of the content (1.2 mm).
pub const DEFAULT_CELL_PADDING: f64 = 3.4;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Table {
    pub format: TableFormat,
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
}

static EMPTY_CELL: Cell = Cell::EMPTY;

impl Table {
    pub fn new(column_widths: &[f64]) -> Self {
        Self {
            format: TableFormat::default(),
            columns: column_widths.iter().map(|w| Column::new(*w)).collect(),
            rows: Vec::new(),
        }
    }

    pub fn add_row(&mut self) -> &mut Row {
        self.rows.push(Row::default());
        let last = self.rows.len() - 1;
        &mut self.rows[last]
    }

    /// The cell stored at a grid position, or an empty cell when the row
    /// defines fewer cells than columns.
    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.cells.get(column))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn width(&self) -> f64 {
        self.columns.iter().map(|c| c.width).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Column {
    pub width: f64,
    pub left_padding: f64,
    pub right_padding: f64,
}

impl Column {
    pub fn new(width: f64) -> Self {
        Self {
            width,
            ..Default::default()
        }
    }
}

impl Default for Column {
    fn default() -> Self {
        Self {
            width: cm(2.5),
            left_padding: DEFAULT_CELL_PADDING,
            right_padding: DEFAULT_CELL_PADDING,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Row {
    pub height: f64,
    pub height_rule: RowHeightRule,
    /// Heading rows repeat at the top of every area the table spans.
    pub heading: bool,
    /// Keep this many following rows in the same area.
    pub keep_with: usize,
    pub top_padding: f64,
    pub bottom_padding: f64,
    pub vertical_alignment: VerticalAlignment,
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn add_cell(&mut self) -> &mut Cell {
        self.cells.push(Cell::default());
        let last = self.cells.len() - 1;
        &mut self.cells[last]
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Cell {
    pub merge_right: usize,
    pub merge_down: usize,
    pub borders: Borders,
    pub shading: Option<Shading>,
    pub rounded_corner: RoundedCorner,
    /// Overrides the row's vertical alignment.
    pub vertical_alignment: Option<VerticalAlignment>,
    pub blocks: Vec<Block>,
}

impl Cell {
    pub const EMPTY: Cell = Cell {
        merge_right: 0,
        merge_down: 0,
        borders: Borders {
            top: None,
            left: None,
            bottom: None,
            right: None,
            distance_from_top: 0.0,
            distance_from_left: 0.0,
            distance_from_bottom: 0.0,
            distance_from_right: 0.0,
        },
        shading: None,
        rounded_corner: RoundedCorner::None,
        vertical_alignment: None,
        blocks: Vec::new(),
    };

    pub fn add_paragraph(&mut self, text: &str, format: ParagraphFormat) -> &mut Self {
        let mut p = Paragraph::new(format);
        p.add_text(text);
        self.blocks.push(Block::Paragraph(p));
        self
    }
}

// ── Shapes ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextOrientation {
    #[default]
    Horizontal,
    /// Rotated 90° counter-clockwise.
    Upward,
    /// Rotated 90° clockwise.
    Downward,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextFrame {
    pub shape: ShapeFormat,
    pub orientation: TextOrientation,
    pub margin_left: f64,
    pub margin_right: f64,
    pub margin_top: f64,
    pub margin_bottom: f64,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    /// File path, data URI, or raw base64.
    pub source: String,
    #[serde(default)]
    pub shape: ShapeFormat,
    #[serde(default = "unit_scale")]
    pub scale_width: f64,
    #[serde(default = "unit_scale")]
    pub scale_height: f64,
    #[serde(default = "default_lock")]
    pub lock_aspect_ratio: bool,
    /// Pixels per inch used to derive the natural size. Defaults to 72.
    #[serde(default)]
    pub resolution: Option<f64>,
}

fn unit_scale() -> f64 {
    1.0
}

fn default_lock() -> bool {
    true
}

impl Image {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            shape: ShapeFormat::default(),
            scale_width: 1.0,
            scale_height: 1.0,
            lock_aspect_ratio: true,
            resolution: None,
        }
    }
}

/// A chart, laid out as an opaque sized block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Chart {
    pub shape: ShapeFormat,
    pub chart_type: String,
    pub data: serde_json::Value,
}

/// A barcode, laid out as an opaque sized block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Barcode {
    pub shape: ShapeFormat,
    pub barcode_type: String,
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_json_splits_words() {
        let json = r#"{
            "sections": [{
                "blocks": [
                    {
                        "type": "Paragraph",
                        "content": [ { "type": "Text", "text": "Hello big\tworld" } ]
                    }
                ]
            }]
        }"#;
        let doc = Document::from_json(json).unwrap();
        let Block::Paragraph(p) = &doc.sections[0].blocks[0] else {
            panic!("expected a paragraph");
        };
        assert_eq!(
            p.content,
            vec![
                Inline::text("Hello"),
                Inline::Blank,
                Inline::text("big"),
                Inline::Tab,
                Inline::text("world"),
            ]
        );
    }

    #[test]
    fn missing_cells_read_as_empty() {
        let mut table = Table::new(&[50.0, 50.0]);
        table.add_row().add_cell();
        assert!(table.cell(0, 1).blocks.is_empty());
        assert_eq!(table.cell(5, 5).merge_down, 0);
    }

    #[test]
    fn landscape_swaps_dimensions() {
        let setup = PageSetup {
            orientation: Orientation::Landscape,
            ..Default::default()
        };
        let (w, h) = setup.page_dimensions();
        assert!(w > h);
    }

    #[test]
    fn header_selection() {
        let setup = PageSetup {
            different_first_page: true,
            odd_and_even_pages: true,
            ..Default::default()
        };
        let mut hf = HeaderFooter::default();
        hf.primary.push(Block::PageBreak);
        hf.even_page.push(Block::PageBreak);
        hf.even_page.push(Block::PageBreak);
        assert_eq!(hf.for_page(&setup, true, false).len(), 0);
        assert_eq!(hf.for_page(&setup, false, true).len(), 2);
        assert_eq!(hf.for_page(&setup, false, false).len(), 1);
    }
}
