//! # Folio
//!
//! A two-pass document layout engine in the MigraDoc tradition.
//!
//! A document is a list of sections. Each section flows paragraphs, tables,
//! images and text frames from top to bottom into the text columns of its
//! pages, honoring keep-together, keep-with-next and widow rules. Tables
//! break between rows and repeat their heading rows. Headers and footers are
//! formatted once the page count is known.
//!
//! ## Architecture
//!
//! ```text
//! Input (JSON/API)
//!       ↓
//!   [model]    Document tree: sections, blocks, inline content
//!       ↓
//!   [layout]   Format pass: blocks flowed into areas, render records kept
//!       ↓
//!   [graphics] Render pass: records replayed onto a drawing surface
//!       ↓
//!   [pdf]      One such surface, writing PDF bytes
//! ```

pub mod error;
pub mod font;
pub mod graphics;
pub mod image_loader;
pub mod layout;
pub mod model;
pub mod pdf;
pub mod text;

pub use error::{FolioError, Result};

use font::FontContext;
use layout::{LayoutEngine, LayoutOptions};
use model::Document;
use pdf::PdfGraphics;

/// Lay out and render a document to PDF bytes.
pub fn render(document: &Document, options: LayoutOptions) -> Result<Vec<u8>> {
    let fonts = FontContext::for_document(document)?;
    let engine = LayoutEngine::new(&fonts, options);
    let layout = engine.layout(document)?;
    let mut pdf = PdfGraphics::new(&fonts).with_bookmarks(layout.bookmarks.clone());
    layout.render_all(&mut pdf);
    Ok(pdf.finish(&document.metadata))
}

/// Render a document described as JSON to PDF bytes.
pub fn render_json(json: &str, options: LayoutOptions) -> Result<Vec<u8>> {
    let document =
        Document::from_json_with_language(json, options.hyphenation_language.as_deref())?;
    render(&document, options)
}
