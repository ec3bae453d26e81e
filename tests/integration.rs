//! Integration tests for the Folio layout pipeline.
//!
//! These tests drive the public API end to end:
//! - the merged-cell index and the row boundary map
//! - the paragraph line-breaker across areas
//! - justification and decimal tabs as drawn
//! - tables paged across areas with repeated headings
//! - the image failure placeholder
//! - PDF output from JSON

use folio::graphics::{DisplayList, DrawOp, FontMetrics, TextMeasurer};
use folio::layout::merged_cells::MergedCells;
use folio::layout::paragraph::format_paragraph;
use folio::layout::table::TableGeometry;
use folio::layout::{FormatContext, FormatInfo, LayoutEngine, LayoutOptions, Rectangle};
use folio::model::*;

// ─── Helpers ────────────────────────────────────────────────────

/// Every character is half the font size wide; lines are exactly the font
/// size high with the baseline at 80%.
struct HalfEm;

impl TextMeasurer for HalfEm {
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

fn options() -> LayoutOptions {
    LayoutOptions {
        date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).and_then(|d| d.and_hms_opt(12, 0, 0)),
        ..Default::default()
    }
}

/// 200 x 100 pt pages with 10 pt margins: a 180 x 80 pt body.
fn small_page() -> PageSetup {
    PageSetup {
        size: PageSize::Custom {
            width: 200.0,
            height: 100.0,
        },
        margin: Edges::uniform(10.0),
        ..Default::default()
    }
}

fn single_section(blocks: Vec<Block>) -> Document {
    let mut doc = Document::new();
    let section = doc.add_section(Section::new(small_page()));
    section.blocks = blocks;
    doc
}

fn paragraph(text: &str, format: ParagraphFormat) -> Paragraph {
    let mut p = Paragraph::new(format);
    p.add_text(text);
    p
}

fn render(doc: &Document) -> DisplayList {
    let measurer = HalfEm;
    let layout = LayoutEngine::new(&measurer, options()).layout(doc).unwrap();
    let mut g = DisplayList::new();
    layout.render_all(&mut g);
    g
}

fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 50, "PDF too small to be valid");
    assert!(bytes.starts_with(b"%PDF-1.7"), "Missing PDF header");
    assert!(bytes.windows(5).any(|w| w == b"%%EOF"), "Missing %%EOF marker");
    assert!(bytes.windows(4).any(|w| w == b"xref"), "Missing xref table");
    assert!(bytes.windows(7).any(|w| w == b"trailer"), "Missing trailer");
}

/// A grid of single-line cells, text "r{row}c{column}".
fn grid(rows: usize, columns: usize) -> Table {
    let mut table = Table::new(&vec![60.0; columns]);
    for r in 0..rows {
        let row = table.add_row();
        for c in 0..columns {
            row.add_cell().add_paragraph(&format!("r{r}c{c}"), ParagraphFormat::default());
        }
    }
    table
}

// ─── Merged cells ───────────────────────────────────────────────

#[test]
fn every_position_has_exactly_one_anchor() {
    let mut table = grid(4, 3);
    table.rows[0].cells[0].merge_right = 1;
    table.rows[1].cells[0].merge_down = 2;
    table.rows[1].cells[1].merge_right = 1;
    table.rows[1].cells[1].merge_down = 1;
    let cells = MergedCells::build(&table).unwrap();

    for row in 0..4 {
        for column in 0..3 {
            let covering: Vec<_> = cells
                .anchors()
                .iter()
                .filter(|a| a.covers(row, column))
                .collect();
            assert_eq!(covering.len(), 1, "({row}, {column}) covered by {covering:?}");
            assert_eq!(cells.covering_cell(row, column), Some(covering[0]));
        }
    }
}

#[test]
fn overlapping_merges_are_rejected_before_layout() {
    let mut table = grid(2, 2);
    table.rows[0].cells[1].merge_down = 1;
    table.rows[1].cells[0].merge_right = 1;
    let doc = single_section(vec![Block::Table(table)]);
    let measurer = HalfEm;
    let err = LayoutEngine::new(&measurer, options()).layout(&doc).unwrap_err();
    assert!(matches!(err, folio::FolioError::OverlappingMerge { .. }), "{err}");
}

#[test]
fn merged_right_edge_without_a_neighbor_has_no_border() {
    let mut table = grid(2, 2);
    table.rows[0].cells[0].merge_right = 1;
    // Interior edges of a merged region never surface.
    table.rows[0].cells[1].borders.left = Some(Border::new(2.0, Color::BLACK));
    let cells = MergedCells::build(&table).unwrap();
    let anchor = *cells.covering_cell(0, 1).unwrap();
    assert_eq!((anchor.row, anchor.column), (0, 0));
    let borders = cells.effective_borders(&anchor, false, None);
    assert!(borders.right.is_none());
}

#[test]
fn row_boundaries_increase_strictly_from_zero() {
    let mut table = grid(5, 2);
    table.rows[0].cells[0].merge_down = 2;
    // An empty row still gets its own boundary.
    table.rows[3].cells.clear();
    let measurer = HalfEm;
    let options = options();
    let ctx = FormatContext::new(&measurer, &options);
    let geometry = TableGeometry::build(&ctx, &table).unwrap();

    assert_eq!(geometry.bottom_borders.len(), 6);
    assert_eq!(geometry.bottom_borders[0], 0.0);
    for pair in geometry.bottom_borders.windows(2) {
        assert!(pair[1] > pair[0], "{:?}", geometry.bottom_borders);
    }
}

// ─── Paragraphs ─────────────────────────────────────────────────

fn no_widows() -> ParagraphFormat {
    ParagraphFormat {
        font: Font::new("Helvetica", 12.0),
        widow_control: false,
        ..Default::default()
    }
}

#[test]
fn three_lines_into_thirty_points() {
    // One 4-letter word (24 pt) per 30 pt wide line, 12 pt per line.
    let p = paragraph("aaaa bbbb cccc", no_widows());
    let measurer = HalfEm;
    let options = options();
    let ctx = FormatContext::new(&measurer, &options);
    let area = Rectangle::new(0.0, 0.0, 30.0, 30.0);

    let (first, _) = format_paragraph(&ctx, &p, area, None, f64::INFINITY);
    assert_eq!(first.lines.len(), 2);
    assert!(first.is_starting);
    assert!(!first.ending_is_complete());

    let (second, layout) = format_paragraph(&ctx, &p, area, Some(&first), f64::INFINITY);
    assert_eq!(second.lines.len(), 1);
    assert!(second.is_ending);
    assert!(!second.is_starting);
    assert_eq!(layout.content_area.height, 12.0);
}

#[test]
fn line_breaking_always_progresses() {
    // The middle word is wider than the area and must be placed anyway.
    let p = paragraph("a mmmmmmmmmmmmmmmmmmmm b c d e f", no_widows());
    let measurer = HalfEm;
    let options = options();
    let ctx = FormatContext::new(&measurer, &options);
    let area = Rectangle::new(0.0, 0.0, 20.0, 12.0);

    let mut previous = None;
    let mut areas = 0;
    loop {
        let (info, _) = format_paragraph(&ctx, &p, area, previous.as_ref(), f64::INFINITY);
        areas += 1;
        assert!(areas < 50, "line breaking stalled");
        assert!(!info.lines.is_empty());
        if info.is_ending {
            break;
        }
        previous = Some(info);
    }
    assert_eq!(areas, 5);
}

#[test]
fn justified_lines_fill_the_width_except_the_last() {
    // "xx" is 10 pt, a blank 5 pt: twelve words (175 pt) fit 180 pt.
    let words: Vec<String> = (0..15)
        .map(|i| format!("{}{}", (b'a' + i) as char, (b'a' + i) as char))
        .collect();
    let format = ParagraphFormat {
        alignment: Alignment::Justify,
        ..Default::default()
    };
    let doc = single_section(vec![Block::Paragraph(paragraph(&words.join(" "), format))]);
    let g = render(&doc);
    let texts = g.texts();

    let first_line: Vec<_> = texts.iter().filter(|t| t.2 == 18.0).collect();
    assert_eq!(first_line.len(), 12);
    let last = first_line[11];
    assert!((last.1 + 10.0 - 190.0).abs() < 1e-9, "line ends at {}", last.1 + 10.0);

    let second_line: Vec<f64> = texts.iter().filter(|t| t.2 == 28.0).map(|t| t.1).collect();
    assert_eq!(second_line, vec![10.0, 25.0, 40.0]);
}

fn tabbed(value: &str) -> Block {
    let format = ParagraphFormat {
        tab_stops: vec![TabStop::new(100.0, TabAlignment::Decimal)],
        ..Default::default()
    };
    let mut p = Paragraph::new(format);
    p.add_tab();
    p.add_text(value);
    Block::Paragraph(p)
}

#[test]
fn decimal_tab_aligns_on_the_separator() {
    let doc = single_section(vec![tabbed("12.34"), tabbed("1234")]);
    let g = render(&doc);
    let texts = g.texts();
    let x_of = |s: &str| texts.iter().find(|t| t.0 == s).map(|t| t.1);

    // "12" (10 pt) ends on the stop at 10 + 100.
    assert_eq!(x_of("12.34"), Some(100.0));
    // Without a separator the stop acts as a right tab.
    assert_eq!(x_of("1234"), Some(90.0));
}

// ─── Tables ─────────────────────────────────────────────────────

#[test]
fn every_body_row_lands_on_exactly_one_page() {
    let mut table = grid(16, 1);
    table.rows[0].heading = true;
    table.rows[0].cells[0].blocks =
        vec![Block::Paragraph(paragraph("Head", ParagraphFormat::default()))];
    let doc = single_section(vec![Block::Table(table)]);
    let measurer = HalfEm;
    let layout = LayoutEngine::new(&measurer, options()).layout(&doc).unwrap();

    let mut seen = vec![0; 16];
    let mut endings = 0;
    for page in &layout.pages {
        for info in &page.body {
            let FormatInfo::Table(t) = &info.format else {
                continue;
            };
            if let Some(end) = t.end_row {
                for row in t.start_row..=end {
                    seen[row] += 1;
                }
            }
            if t.is_ending {
                endings += 1;
            }
        }
    }
    assert_eq!(seen[0], 0, "heading rows are not body rows");
    assert!(seen[1..].iter().all(|n| *n == 1), "{seen:?}");
    assert_eq!(endings, 1);
    assert!(layout.page_count() >= 3);

    let mut g = DisplayList::new();
    layout.render_all(&mut g);
    let heads = g.texts().iter().filter(|t| t.0 == "Head").count();
    assert_eq!(heads, layout.page_count());
}

#[test]
fn page_break_inside_a_cell_is_an_error() {
    let mut table = grid(1, 1);
    table.rows[0].cells[0].blocks.push(Block::PageBreak);
    let doc = single_section(vec![Block::Table(table)]);
    let measurer = HalfEm;
    let err = LayoutEngine::new(&measurer, options()).layout(&doc).unwrap_err();
    assert!(err.to_string().contains("table cell"), "{err}");
}

// ─── Images ─────────────────────────────────────────────────────

#[test]
fn missing_image_becomes_a_placeholder() {
    let doc = single_section(vec![Block::Image(Image::new("/nonexistent/picture.png"))]);
    let measurer = HalfEm;
    let layout = LayoutEngine::new(&measurer, options()).layout(&doc).unwrap();
    let area = layout.pages[0].body[0].layout.content_area;
    let side = 2.5 * 72.0 / 2.54;
    assert!((area.width - side).abs() < 1e-9);
    assert!((area.height - side).abs() < 1e-9);

    let mut g = DisplayList::new();
    layout.render_all(&mut g);
    let gray_box = g
        .ops
        .iter()
        .any(|op| matches!(op, DrawOp::Rect { fill: Some(c), .. } if *c == Color::LIGHT_GRAY));
    assert!(gray_box);
    let red_text = g.ops.iter().find_map(|op| match op {
        DrawOp::Text { text, color, .. } if *color == Color::RED => Some(text.clone()),
        _ => None,
    });
    assert_eq!(red_text.as_deref(), Some("Image not found"));
}

// ─── End to end ─────────────────────────────────────────────────

#[test]
fn json_document_renders_to_pdf() {
    let json = r#"{
        "metadata": { "title": "Report" },
        "sections": [{
            "footers": { "primary": [
                { "type": "Paragraph", "content": [
                    { "type": "Field", "field": { "PageNumber": {} } }
                ] }
            ] },
            "blocks": [
                { "type": "Paragraph", "content": [ { "type": "Text", "text": "Hello, World!" } ] },
                { "type": "PageBreak" },
                { "type": "Paragraph", "content": [ { "type": "Text", "text": "Second page" } ] }
            ]
        }]
    }"#;
    let bytes = folio::render_json(json, options()).unwrap();
    assert_valid_pdf(&bytes);
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("/Count 2"));
    assert!(text.contains("/Title (Report)"));
}

#[test]
fn invalid_json_reports_a_parse_error() {
    let err = folio::render_json("{ \"sections\": [ }", options()).unwrap_err();
    assert!(matches!(err, folio::FolioError::Parse { .. }));
}
