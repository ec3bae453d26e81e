//! Structured error types for the Folio layout engine.
//!
//! Only fatal conditions live here. A missing image is not an error (it
//! degrades to a placeholder, see [`crate::image_loader::ImageFailure`]) and
//! an area that is too small is a protocol signal carried by
//! [`crate::layout::FormatInfo::is_empty`].

use thiserror::Error;

/// The unified error type returned by all public Folio API functions.
#[derive(Error, Debug)]
pub enum FolioError {
    /// JSON input failed to parse as a valid Folio document.
    #[error("failed to parse document: {source}{hint}")]
    Parse {
        #[source]
        source: serde_json::Error,
        hint: String,
    },

    /// A merged cell's span runs past the table grid.
    #[error(
        "cell ({row}, {column}) merges {merge_down} down and {merge_right} right, \
         past the {rows}x{columns} grid"
    )]
    MergeOutOfRange {
        row: usize,
        column: usize,
        merge_down: usize,
        merge_right: usize,
        rows: usize,
        columns: usize,
    },

    /// Two merged regions claim the same grid position.
    #[error(
        "cell ({row}, {column}) overlaps the merged region anchored at \
         ({anchor_row}, {anchor_column})"
    )]
    OverlappingMerge {
        row: usize,
        column: usize,
        anchor_row: usize,
        anchor_column: usize,
    },

    /// A row defines more cells than the table has columns.
    #[error("row {row} has {cells} cells but the table defines {columns} columns")]
    TooManyCells {
        row: usize,
        cells: usize,
        columns: usize,
    },

    /// An element was placed where no renderer exists for it.
    #[error("{element} cannot be laid out inside {context}")]
    UnsupportedElement {
        element: &'static str,
        context: &'static str,
    },

    /// A font could not be loaded or parsed.
    #[error("font error: {0}")]
    Font(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for FolioError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "\n  Hint: check for trailing commas, missing quotes, or unescaped characters."
            }
            serde_json::error::Category::Data => {
                "\n  Hint: the JSON is valid but doesn't match the document schema. \
                 Check field names and types."
            }
            serde_json::error::Category::Eof => {
                "\n  Hint: unexpected end of input, is the JSON truncated?"
            }
            serde_json::error::Category::Io => "",
        };
        FolioError::Parse {
            source: e,
            hint: hint.to_string(),
        }
    }
}

/// Convenience Result type alias for FolioError.
pub type Result<T> = std::result::Result<T, FolioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_error_names_coordinates() {
        let err = FolioError::MergeOutOfRange {
            row: 1,
            column: 2,
            merge_down: 3,
            merge_right: 0,
            rows: 2,
            columns: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("(1, 2)"), "{msg}");
        assert!(msg.contains("2x3"), "{msg}");
    }

    #[test]
    fn parse_error_carries_hint() {
        let err: FolioError = serde_json::from_str::<serde_json::Value>("{\"a\": 1,}")
            .unwrap_err()
            .into();
        assert!(err.to_string().contains("Hint"));
    }
}
