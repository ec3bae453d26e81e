//! # Folio CLI
//!
//! Usage:
//!   folio input.json -o output.pdf
//!   echo '{ ... }' | folio -o output.pdf
//!   folio input.json --layout > layout.json

use anyhow::Context;
use clap::{ArgAction, Parser};
use folio::font::FontContext;
use folio::layout::{LayoutEngine, LayoutOptions};
use folio::model::Document;
use folio::pdf::PdfGraphics;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Lay out a JSON document and write it as PDF.
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Document JSON; read from stdin when omitted
    input: Option<PathBuf>,

    /// Where to write the PDF
    #[arg(short, long, default_value = "output.pdf")]
    output: PathBuf,

    /// Print the page layout as JSON instead of writing a PDF
    #[arg(long, action = ArgAction::SetTrue)]
    layout: bool,

    /// Layout options as JSON (tab stops, decimal separator, date, ...)
    #[arg(long)]
    options: Option<PathBuf>,

    /// Hyphenation language for documents that declare none
    #[arg(long)]
    lang: Option<String>,

    /// Log layout decisions to stderr
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("folio=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("folio=warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let input = match &args.input {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
        }
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).context("reading stdin")?;
            buf
        }
    };

    let mut options = match &args.options {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str::<LayoutOptions>(&json).context("parsing layout options")?
        }
        None => LayoutOptions::default(),
    };
    if args.lang.is_some() {
        options.hyphenation_language = args.lang.clone();
    }

    let document =
        Document::from_json_with_language(&input, options.hyphenation_language.as_deref())?;
    let fonts = FontContext::for_document(&document)?;
    let layout = LayoutEngine::new(&fonts, options).layout(&document)?;
    tracing::info!(pages = layout.page_count(), "layout finished");

    if args.layout {
        println!("{}", serde_json::to_string_pretty(&layout.summary())?);
        return Ok(());
    }

    let mut pdf = PdfGraphics::new(&fonts).with_bookmarks(layout.bookmarks.clone());
    layout.render_all(&mut pdf);
    let bytes = pdf.finish(&document.metadata);
    fs::write(&args.output, &bytes)
        .with_context(|| format!("writing {}", args.output.display()))?;
    eprintln!("✓ Written {} bytes to {}", bytes.len(), args.output.display());
    Ok(())
}
