//! # PDF Backend
//!
//! A [`Graphics`] surface that writes a PDF 1.7 file.
//!
//! Drawing calls arrive in top-left page coordinates. Every content stream
//! starts by flipping the y axis, so coordinates and affine transforms pass
//! straight through; text and images flip themselves back upright.
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- catalog, page tree, fonts, images, pages, links
//! ...
//! xref                <- byte offset of every object
//! trailer             <- points to the catalog and the info dictionary
//! %%EOF
//! ```

use std::collections::HashMap;
use std::fmt::Write as FmtWrite;
use std::io::Write as IoWrite;

use crate::font::{FontContext, FontData, FontKey};
use crate::graphics::{Embedded, Graphics, Pen, Quadrant, TextMeasurer};
use crate::image_loader::{load_image, ImagePixelData, JpegColorSpace, LoadedImage};
use crate::layout::area::Rectangle;
use crate::layout::document::BookmarkTarget;
use crate::model::{Color, Font, LinkTarget, Metadata, Underline};
use miniz_oxide::deflate::compress_to_vec_zlib;

/// Bezier control distance for a quarter circle of radius 1.
const KAPPA: f64 = 0.552_284_749_8;

struct PdfPage {
    width: f64,
    height: f64,
    stream: String,
    links: Vec<(Rectangle, LinkTarget)>,
}

/// Records drawing calls and serializes them with [`PdfGraphics::finish`].
pub struct PdfGraphics<'f> {
    fonts: &'f FontContext,
    pages: Vec<PdfPage>,
    /// Fonts in resource order, `/F0`, `/F1`, ...
    font_keys: Vec<FontKey>,
    /// Images in resource order, `/Im0`, ...; `None` when loading failed.
    images: Vec<Option<LoadedImage>>,
    image_index: HashMap<String, usize>,
    bookmarks: HashMap<String, BookmarkTarget>,
}

impl<'f> PdfGraphics<'f> {
    pub fn new(fonts: &'f FontContext) -> Self {
        Self {
            fonts,
            pages: Vec::new(),
            font_keys: Vec::new(),
            images: Vec::new(),
            image_index: HashMap::new(),
            bookmarks: HashMap::new(),
        }
    }

    /// Resolve internal links against these bookmark positions.
    pub fn with_bookmarks(mut self, bookmarks: HashMap<String, BookmarkTarget>) -> Self {
        self.bookmarks = bookmarks;
        self
    }

    fn stream(&mut self) -> Option<&mut String> {
        self.pages.last_mut().map(|p| &mut p.stream)
    }

    fn font_index(&mut self, font: &Font) -> usize {
        let (key, _) = self.fonts.resolve(font);
        match self.font_keys.iter().position(|k| *k == key) {
            Some(i) => i,
            None => {
                self.font_keys.push(key);
                self.font_keys.len() - 1
            }
        }
    }

    fn image_slot(&mut self, source: &str) -> usize {
        if let Some(&i) = self.image_index.get(source) {
            return i;
        }
        let loaded = match load_image(source) {
            Ok(image) => Some(image),
            Err(e) => {
                tracing::warn!(error = %e, "image left out of the PDF");
                None
            }
        };
        self.images.push(loaded);
        let i = self.images.len() - 1;
        self.image_index.insert(source.to_string(), i);
        i
    }

    fn stroke_setup(stream: &mut String, pen: &Pen) {
        let c = pen.color;
        let _ = write!(stream, "{:.3} {:.3} {:.3} RG\n{:.2} w\n", c.r, c.g, c.b, pen.width);
        let pattern = pen.dash.pattern();
        if !pattern.is_empty() {
            let dashes: Vec<String> =
                pattern.iter().map(|d| format!("{:.2}", d * pen.width)).collect();
            let _ = writeln!(stream, "[{}] 0 d", dashes.join(" "));
        }
    }

    /// Write the finished document.
    pub fn finish(self, metadata: &Metadata) -> Vec<u8> {
        let mut objects: Vec<Vec<u8>> = vec![Vec::new(), Vec::new(), Vec::new()];

        let mut font_ids = Vec::with_capacity(self.font_keys.len());
        for key in &self.font_keys {
            font_ids.push(self.write_font(&mut objects, key));
        }

        let mut image_ids: Vec<Option<usize>> = Vec::with_capacity(self.images.len());
        for image in &self.images {
            image_ids.push(image.as_ref().map(|i| write_image(&mut objects, i)));
        }

        let font_resources: String = font_ids
            .iter()
            .enumerate()
            .map(|(i, id)| format!("/F{i} {id} 0 R"))
            .collect::<Vec<_>>()
            .join(" ");
        let image_resources: String = image_ids
            .iter()
            .enumerate()
            .filter_map(|(i, id)| id.map(|id| format!("/Im{i} {id} 0 R")))
            .collect::<Vec<_>>()
            .join(" ");

        // Page objects are numbered up front so links can point at them.
        let first_page = objects.len();
        let page_id = |i: usize| first_page + 2 * i + 1;
        let mut next_annot = first_page + 2 * self.pages.len();
        let mut annotations = Vec::new();

        for (index, page) in self.pages.iter().enumerate() {
            let compressed = compress_to_vec_zlib(&latin1(&page.stream), 6);
            let mut content: Vec<u8> = Vec::new();
            let _ = write!(
                content,
                "<< /Length {} /Filter /FlateDecode >>\nstream\n",
                compressed.len()
            );
            content.extend_from_slice(&compressed);
            content.extend_from_slice(b"\nendstream");
            objects.push(content);

            let mut annot_refs = Vec::new();
            for (rect, target) in &page.links {
                let Some(action) = self.link_action(target, &page_id) else {
                    continue;
                };
                let dict = format!(
                    "<< /Type /Annot /Subtype /Link \
                     /Rect [{:.2} {:.2} {:.2} {:.2}] /Border [0 0 0] {} >>",
                    rect.x,
                    page.height - rect.bottom(),
                    rect.right(),
                    page.height - rect.y,
                    action
                );
                annot_refs.push(format!("{next_annot} 0 R"));
                annotations.push(dict.into_bytes());
                next_annot += 1;
            }
            let annots = if annot_refs.is_empty() {
                String::new()
            } else {
                format!(" /Annots [{}]", annot_refs.join(" "))
            };

            let page_dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] /Contents {} 0 R \
                 /Resources << /Font << {} >> /XObject << {} >> >>{} >>",
                page.width,
                page.height,
                first_page + 2 * index,
                font_resources,
                image_resources,
                annots
            );
            objects.push(page_dict.into_bytes());
        }
        objects.extend(annotations);

        objects[1] = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();
        let kids: Vec<String> = (0..self.pages.len())
            .map(|i| format!("{} 0 R", page_id(i)))
            .collect();
        objects[2] = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            self.pages.len()
        )
        .into_bytes();

        let info_id = write_info(&mut objects, metadata);
        tracing::debug!(pages = self.pages.len(), objects = objects.len(), "pdf written");
        serialize(&objects, info_id)
    }

    fn link_action(
        &self,
        target: &LinkTarget,
        page_id: &dyn Fn(usize) -> usize,
    ) -> Option<String> {
        match target {
            LinkTarget::Url(url) => {
                Some(format!("/A << /S /URI /URI ({}) >>", escape_pdf_string(url)))
            }
            LinkTarget::Bookmark(name) => {
                let Some(target) = self.bookmarks.get(name) else {
                    tracing::warn!(bookmark = %name, "link to unknown bookmark dropped");
                    return None;
                };
                let height = self.pages.get(target.page_index).map_or(0.0, |p| p.height);
                Some(format!(
                    "/Dest [{} 0 R /XYZ 0 {:.2} null]",
                    page_id(target.page_index),
                    height - target.y
                ))
            }
        }
    }

    fn write_font(&self, objects: &mut Vec<Vec<u8>>, key: &FontKey) -> usize {
        let dict = match self.fonts.registry().get(key) {
            FontData::Standard(std_font) => format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                std_font.pdf_name()
            ),
            FontData::Custom { data, metrics } => {
                let compressed = compress_to_vec_zlib(data, 6);
                let mut file: Vec<u8> = Vec::new();
                let _ = write!(
                    file,
                    "<< /Length {} /Length1 {} /Filter /FlateDecode >>\nstream\n",
                    compressed.len(),
                    data.len()
                );
                file.extend_from_slice(&compressed);
                file.extend_from_slice(b"\nendstream");
                objects.push(file);
                let file_id = objects.len() - 1;

                let name = base_font_name(key);
                let scale = 1000.0 / metrics.units_per_em as f64;
                let descriptor = format!(
                    "<< /Type /FontDescriptor /FontName /{} /Flags 32 \
                     /FontBBox [0 {:.0} 1000 {:.0}] /ItalicAngle {} \
                     /Ascent {:.0} /Descent {:.0} /CapHeight {:.0} /StemV 80 /FontFile2 {} 0 R >>",
                    name,
                    metrics.descender as f64 * scale,
                    metrics.ascender as f64 * scale,
                    if key.italic { -12 } else { 0 },
                    metrics.ascender as f64 * scale,
                    metrics.descender as f64 * scale,
                    metrics.ascender as f64 * scale,
                    file_id
                );
                objects.push(descriptor.into_bytes());
                let descriptor_id = objects.len() - 1;

                let widths: Vec<String> = (32u8..=255)
                    .map(|code| format!("{:.0}", metrics.char_width(win_ansi_char(code), 1000.0)))
                    .collect();
                format!(
                    "<< /Type /Font /Subtype /TrueType /BaseFont /{} /FirstChar 32 /LastChar 255 \
                     /Widths [{}] /FontDescriptor {} 0 R /Encoding /WinAnsiEncoding >>",
                    name,
                    widths.join(" "),
                    descriptor_id
                )
            }
        };
        objects.push(dict.into_bytes());
        objects.len() - 1
    }
}

impl Graphics for PdfGraphics<'_> {
    fn begin_page(&mut self, width: f64, height: f64) {
        let mut stream = String::new();
        // Flip to top-down coordinates.
        let _ = writeln!(stream, "1 0 0 -1 0 {height:.2} cm");
        self.pages.push(PdfPage {
            width,
            height,
            stream,
            links: Vec::new(),
        });
    }

    fn end_page(&mut self) {}

    fn draw_text(&mut self, text: &str, font: &Font, x: f64, y: f64) {
        if text.is_empty() {
            return;
        }
        let index = self.font_index(font);
        let size = font.effective_size();
        let width = match font.underline {
            Underline::None => 0.0,
            _ => self.fonts.measure_text(text, font),
        };
        let Some(stream) = self.stream() else {
            return;
        };
        let c = font.color;
        let _ = write!(
            stream,
            "BT\n{:.3} {:.3} {:.3} rg\n/F{} {:.2} Tf\n1 0 0 -1 {:.2} {:.2} Tm\n(",
            c.r, c.g, c.b, index, size, x, y
        );
        stream.push_str(&escape_pdf_string(&encode_win_ansi(text)));
        stream.push_str(") Tj\nET\n");

        if width > 0.0 {
            let pen = Pen {
                dash: match font.underline {
                    Underline::Dotted => crate::graphics::Dash::Dot,
                    _ => crate::graphics::Dash::Solid,
                },
                ..Pen::new((size / 18.0).max(0.5), c)
            };
            let offset = size * 0.12;
            let _ = stream.write_str("q\n");
            Self::stroke_setup(stream, &pen);
            let _ = write!(
                stream,
                "{:.2} {:.2} m\n{:.2} {:.2} l\nS\n",
                x,
                y + offset,
                x + width,
                y + offset
            );
            if font.underline == Underline::Double {
                let second = offset + pen.width * 2.0;
                let _ = write!(
                    stream,
                    "{:.2} {:.2} m\n{:.2} {:.2} l\nS\n",
                    x,
                    y + second,
                    x + width,
                    y + second
                );
            }
            let _ = stream.write_str("Q\n");
        }
    }

    fn draw_line(&mut self, pen: &Pen, x1: f64, y1: f64, x2: f64, y2: f64) {
        let Some(stream) = self.stream() else {
            return;
        };
        let _ = stream.write_str("q\n");
        Self::stroke_setup(stream, pen);
        let _ = write!(stream, "{x1:.2} {y1:.2} m\n{x2:.2} {y2:.2} l\nS\nQ\n");
    }

    fn draw_rect(&mut self, rect: Rectangle, pen: Option<&Pen>, fill: Option<Color>) {
        let Some(stream) = self.stream() else {
            return;
        };
        let fill = fill.filter(|c| c.a > 0.0);
        let op = match (pen.is_some(), fill.is_some()) {
            (true, true) => "B",
            (true, false) => "S",
            (false, true) => "f",
            (false, false) => return,
        };
        let _ = stream.write_str("q\n");
        if let Some(c) = fill {
            let _ = writeln!(stream, "{:.3} {:.3} {:.3} rg", c.r, c.g, c.b);
        }
        if let Some(pen) = pen {
            Self::stroke_setup(stream, pen);
        }
        let _ = write!(
            stream,
            "{:.2} {:.2} {:.2} {:.2} re\n{}\nQ\n",
            rect.x, rect.y, rect.width, rect.height, op
        );
    }

    fn draw_quarter_arc(&mut self, pen: &Pen, cx: f64, cy: f64, r: f64, quadrant: Quadrant) {
        let Some(stream) = self.stream() else {
            return;
        };
        // Start on the horizontal radius, end on the vertical one.
        let (sx, sy) = match quadrant {
            Quadrant::TopLeft | Quadrant::BottomLeft => (-1.0, 0.0),
            Quadrant::TopRight | Quadrant::BottomRight => (1.0, 0.0),
        };
        let ey = match quadrant {
            Quadrant::TopLeft | Quadrant::TopRight => -1.0,
            Quadrant::BottomLeft | Quadrant::BottomRight => 1.0,
        };
        let (x0, y0) = (cx + sx * r, cy + sy * r);
        let (x3, y3) = (cx, cy + ey * r);
        let _ = stream.write_str("q\n");
        Self::stroke_setup(stream, pen);
        let _ = write!(
            stream,
            "{:.2} {:.2} m\n{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c\nS\nQ\n",
            x0,
            y0,
            x0,
            y0 + ey * r * KAPPA,
            x3 + sx * r * KAPPA,
            y3,
            x3,
            y3
        );
    }

    fn draw_image(&mut self, source: &str, rect: Rectangle) {
        let slot = self.image_slot(source);
        if self.images[slot].is_none() {
            return;
        }
        let Some(stream) = self.stream() else {
            return;
        };
        let _ = write!(
            stream,
            "q\n{:.2} 0 0 {:.2} {:.2} {:.2} cm\n/Im{} Do\nQ\n",
            rect.width,
            -rect.height,
            rect.x,
            rect.bottom(),
            slot
        );
    }

    fn draw_embedded(&mut self, content: Embedded<'_>, rect: Rectangle) {
        let label = match content {
            Embedded::Chart(c) => c.chart_type.clone(),
            Embedded::Barcode(b) => b.code.clone(),
        };
        let frame = Pen::new(0.5, Color::rgb(0.5, 0.5, 0.5));
        self.draw_rect(rect, Some(&frame), Some(Color::rgb(0.95, 0.95, 0.95)));
        let font = Font::new("Helvetica", 8.0);
        self.draw_text(&label, &font, rect.x + 4.0, rect.y + 12.0);
    }

    fn add_link(&mut self, rect: Rectangle, target: &LinkTarget) {
        if let Some(page) = self.pages.last_mut() {
            page.links.push((rect, target.clone()));
        }
    }

    fn save_state(&mut self) {
        if let Some(stream) = self.stream() {
            stream.push_str("q\n");
        }
    }

    fn restore_state(&mut self) {
        if let Some(stream) = self.stream() {
            stream.push_str("Q\n");
        }
    }

    fn transform(&mut self, m: [f64; 6]) {
        if let Some(stream) = self.stream() {
            let _ = writeln!(
                stream,
                "{:.4} {:.4} {:.4} {:.4} {:.2} {:.2} cm",
                m[0], m[1], m[2], m[3], m[4], m[5]
            );
        }
    }
}

fn base_font_name(key: &FontKey) -> String {
    let mut name: String = key.family.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    match (key.bold, key.italic) {
        (true, true) => name.push_str(",BoldItalic"),
        (true, false) => name.push_str(",Bold"),
        (false, true) => name.push_str(",Italic"),
        (false, false) => {}
    }
    name
}

/// The Unicode character at a WinAnsi code point.
fn win_ansi_char(code: u8) -> char {
    match code {
        0x80 => '€',
        0x85 => '…',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201c}',
        0x94 => '\u{201d}',
        0x95 => '•',
        0x96 => '–',
        0x97 => '—',
        0x99 => '™',
        c => c as char,
    }
}

/// Encode text as WinAnsi bytes, carried in a `String` of chars below 256.
/// Characters outside the encoding become `?`.
fn encode_win_ansi(text: &str) -> String {
    text.chars()
        .map(|ch| {
            let code = match ch {
                '€' => 0x80,
                '…' => 0x85,
                '\u{2018}' => 0x91,
                '\u{2019}' => 0x92,
                '\u{201c}' => 0x93,
                '\u{201d}' => 0x94,
                '•' => 0x95,
                '–' => 0x96,
                '—' => 0x97,
                '™' => 0x99,
                '\u{a0}' => 0x20,
                c if (c as u32) < 0x80 || (0xA0..=0xFF).contains(&(c as u32)) => c as u32,
                _ => '?' as u32,
            };
            char::from_u32(code).unwrap_or('?')
        })
        .collect()
}

/// Bytes of a string whose chars are all below 256.
fn latin1(s: &str) -> Vec<u8> {
    s.chars().map(|c| c as u8).collect()
}

/// Escape special characters in a PDF string.
fn escape_pdf_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('(', "\\(").replace(')', "\\)")
}

fn write_image(objects: &mut Vec<Vec<u8>>, image: &LoadedImage) -> usize {
    let mut data: Vec<u8> = Vec::new();
    match &image.pixel_data {
        ImagePixelData::Jpeg { data: jpeg, color_space } => {
            let space = match color_space {
                JpegColorSpace::DeviceRGB => "DeviceRGB",
                JpegColorSpace::DeviceGray => "DeviceGray",
            };
            let _ = write!(
                data,
                "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /{} \
                 /BitsPerComponent 8 /Filter /DCTDecode /Length {} >>\nstream\n",
                image.width_px,
                image.height_px,
                space,
                jpeg.len()
            );
            data.extend_from_slice(jpeg);
        }
        ImagePixelData::Decoded { rgb, alpha } => {
            let smask = alpha.as_ref().map(|alpha| {
                let compressed = compress_to_vec_zlib(alpha, 6);
                let mut mask: Vec<u8> = Vec::new();
                let _ = write!(
                    mask,
                    "<< /Type /XObject /Subtype /Image /Width {} /Height {} \
                     /ColorSpace /DeviceGray /BitsPerComponent 8 /Filter /FlateDecode \
                     /Length {} >>\nstream\n",
                    image.width_px,
                    image.height_px,
                    compressed.len()
                );
                mask.extend_from_slice(&compressed);
                mask.extend_from_slice(b"\nendstream");
                objects.push(mask);
                objects.len() - 1
            });
            let compressed = compress_to_vec_zlib(rgb, 6);
            let smask = smask.map(|id| format!(" /SMask {id} 0 R")).unwrap_or_default();
            let _ = write!(
                data,
                "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceRGB \
                 /BitsPerComponent 8 /Filter /FlateDecode /Length {}{} >>\nstream\n",
                image.width_px,
                image.height_px,
                compressed.len(),
                smask
            );
            data.extend_from_slice(&compressed);
        }
    }
    data.extend_from_slice(b"\nendstream");
    objects.push(data);
    objects.len() - 1
}

fn write_info(objects: &mut Vec<Vec<u8>>, metadata: &Metadata) -> Option<usize> {
    let fields = [
        ("Title", &metadata.title),
        ("Author", &metadata.author),
        ("Subject", &metadata.subject),
        ("Keywords", &metadata.keywords),
    ];
    if fields.iter().all(|(_, v)| v.is_none()) {
        return None;
    }
    let mut info = String::from("<< ");
    for (name, value) in fields {
        if let Some(value) = value {
            let _ = write!(info, "/{} ({}) ", name, escape_pdf_string(&encode_win_ansi(value)));
        }
    }
    info.push_str("/Producer (Folio) >>");
    objects.push(latin1(&info));
    Some(objects.len() - 1)
}

/// Serialize all objects into the final PDF byte stream.
fn serialize(objects: &[Vec<u8>], info_id: Option<usize>) -> Vec<u8> {
    let mut output: Vec<u8> = Vec::new();
    let mut offsets: Vec<usize> = vec![0; objects.len()];

    output.extend_from_slice(b"%PDF-1.7\n");
    output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

    for (i, obj) in objects.iter().enumerate().skip(1) {
        offsets[i] = output.len();
        let _ = write!(output, "{i} 0 obj\n");
        output.extend_from_slice(obj);
        output.extend_from_slice(b"\nendobj\n\n");
    }

    let xref_offset = output.len();
    let _ = write!(output, "xref\n0 {}\n", objects.len());
    let _ = write!(output, "0000000000 65535 f \n");
    for offset in offsets.iter().skip(1) {
        let _ = write!(output, "{offset:010} 00000 n \n");
    }

    let _ = write!(output, "trailer\n<< /Size {} /Root 1 0 R", objects.len());
    if let Some(info_id) = info_id {
        let _ = write!(output, " /Info {info_id} 0 R");
    }
    let _ = write!(output, " >>\nstartxref\n{xref_offset}\n%%EOF\n");

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contains(bytes: &[u8], needle: &str) -> bool {
        bytes.windows(needle.len()).any(|w| w == needle.as_bytes())
    }

    #[test]
    fn escape_pdf_string_handles_parens_and_backslash() {
        assert_eq!(escape_pdf_string("Hello (World)"), "Hello \\(World\\)");
        assert_eq!(escape_pdf_string("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn win_ansi_maps_typographic_characters() {
        assert_eq!(encode_win_ansi("a–b•"), "a\u{96}b\u{95}");
        assert_eq!(encode_win_ansi("日"), "?");
        assert_eq!(win_ansi_char(0x95), '•');
    }

    #[test]
    fn empty_page_produces_valid_pdf() {
        let fonts = FontContext::new();
        let mut g = PdfGraphics::new(&fonts);
        g.begin_page(595.28, 841.89);
        g.end_page();
        let bytes = g.finish(&Metadata::default());
        assert!(bytes.starts_with(b"%PDF-1.7"));
        assert!(contains(&bytes, "%%EOF"));
        assert!(contains(&bytes, "/Count 1"));
        assert!(contains(&bytes, "trailer"));
    }

    #[test]
    fn metadata_goes_into_info_dictionary() {
        let fonts = FontContext::new();
        let mut g = PdfGraphics::new(&fonts);
        g.begin_page(100.0, 100.0);
        let metadata = Metadata {
            title: Some("Report".to_string()),
            author: Some("Ann".to_string()),
            ..Default::default()
        };
        let bytes = g.finish(&metadata);
        assert!(contains(&bytes, "/Title (Report)"));
        assert!(contains(&bytes, "/Author (Ann)"));
    }

    #[test]
    fn bold_font_registered_separately() {
        let fonts = FontContext::new();
        let mut g = PdfGraphics::new(&fonts);
        g.begin_page(100.0, 100.0);
        g.draw_text("A", &Font::new("Helvetica", 12.0), 10.0, 20.0);
        let bold = Font {
            bold: true,
            ..Font::new("Helvetica", 12.0)
        };
        g.draw_text("A", &bold, 10.0, 40.0);
        let bytes = g.finish(&Metadata::default());
        assert!(contains(&bytes, "/BaseFont /Helvetica "));
        assert!(contains(&bytes, "/BaseFont /Helvetica-Bold"));
    }

    #[test]
    fn bookmark_links_point_at_their_page() {
        let fonts = FontContext::new();
        let bookmarks = HashMap::from([(
            "end".to_string(),
            BookmarkTarget {
                page_index: 1,
                y: 10.0,
            },
        )]);
        let mut g = PdfGraphics::new(&fonts).with_bookmarks(bookmarks);
        g.begin_page(100.0, 100.0);
        g.add_link(
            Rectangle::new(0.0, 0.0, 10.0, 10.0),
            &LinkTarget::Bookmark("end".into()),
        );
        g.add_link(
            Rectangle::new(0.0, 0.0, 10.0, 10.0),
            &LinkTarget::Bookmark("missing".into()),
        );
        g.begin_page(100.0, 100.0);
        let bytes = g.finish(&Metadata::default());
        assert!(contains(&bytes, "/XYZ 0 90.00 null"));
        assert_eq!(bytes.windows(12).filter(|w| *w == b"/Subtype /Li").count(), 1);
    }

    #[test]
    fn unreadable_image_is_skipped() {
        let fonts = FontContext::new();
        let mut g = PdfGraphics::new(&fonts);
        g.begin_page(100.0, 100.0);
        g.draw_image("/nonexistent/picture.png", Rectangle::new(0.0, 0.0, 10.0, 10.0));
        let bytes = g.finish(&Metadata::default());
        assert!(!contains(&bytes, "/Subtype /Image"));
    }
}
