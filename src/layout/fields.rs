//! Field values: page numbers, counts, dates, document info and bookmark
//! references.
//!
//! During formatting the values are provisional (the page count is not known
//! yet); the render pass receives the final values for each page.

use crate::model::{Field, InfoField, Metadata, NumberFormat};
use chrono::NaiveDateTime;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct FieldValues {
    /// Display page number.
    pub page: usize,
    pub num_pages: usize,
    /// 1-based section number.
    pub section: usize,
    pub section_pages: usize,
    pub date: NaiveDateTime,
    pub metadata: Metadata,
    /// Bookmark name to display page number.
    pub bookmarks: HashMap<String, usize>,
}

impl FieldValues {
    pub fn new(date: NaiveDateTime, metadata: Metadata) -> Self {
        Self {
            page: 1,
            num_pages: 1,
            section: 1,
            section_pages: 1,
            date,
            metadata,
            bookmarks: HashMap::new(),
        }
    }

    /// The text a field shows.
    pub fn display(&self, field: &Field) -> String {
        match field {
            Field::PageNumber { format } => format_number(self.page, *format),
            Field::NumPages { format } => format_number(self.num_pages, *format),
            Field::Section { format } => format_number(self.section, *format),
            Field::SectionPages { format } => format_number(self.section_pages, *format),
            Field::Date { format } => self.date.format(format).to_string(),
            Field::Info { info } => {
                let value = match info {
                    InfoField::Title => &self.metadata.title,
                    InfoField::Author => &self.metadata.author,
                    InfoField::Subject => &self.metadata.subject,
                    InfoField::Keywords => &self.metadata.keywords,
                };
                value.clone().unwrap_or_default()
            }
            // Unresolved references show a placeholder of typical width.
            Field::PageRef { bookmark, format } => match self.bookmarks.get(bookmark) {
                Some(page) => format_number(*page, *format),
                None => "??".to_string(),
            },
            Field::Bookmark { .. } => String::new(),
        }
    }
}

pub fn format_number(n: usize, format: NumberFormat) -> String {
    match format {
        NumberFormat::Arabic => n.to_string(),
        NumberFormat::LowerRoman => to_roman(n).to_lowercase(),
        NumberFormat::UpperRoman => to_roman(n),
        NumberFormat::LowerAlpha => to_alpha(n),
        NumberFormat::UpperAlpha => to_alpha(n).to_uppercase(),
    }
}

fn to_roman(mut n: usize) -> String {
    const NUMERALS: [(usize, &str); 13] = [
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];
    let mut out = String::new();
    for (value, numeral) in NUMERALS {
        while n >= value {
            out.push_str(numeral);
            n -= value;
        }
    }
    out
}

/// a, b, ..., z, aa, bb, ... (letters repeat, spreadsheet style is not used).
fn to_alpha(n: usize) -> String {
    if n == 0 {
        return String::new();
    }
    let letter = (b'a' + ((n - 1) % 26) as u8) as char;
    std::iter::repeat(letter).take((n - 1) / 26 + 1).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn values() -> FieldValues {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        FieldValues::new(
            date,
            Metadata {
                title: Some("Report".into()),
                ..Default::default()
            },
        )
    }

    #[test]
    fn numbers_in_all_formats() {
        assert_eq!(format_number(14, NumberFormat::UpperRoman), "XIV");
        assert_eq!(format_number(4, NumberFormat::LowerRoman), "iv");
        assert_eq!(format_number(28, NumberFormat::LowerAlpha), "bb");
        assert_eq!(format_number(3, NumberFormat::UpperAlpha), "C");
    }

    #[test]
    fn date_and_info_fields() {
        let v = values();
        assert_eq!(
            v.display(&Field::Date {
                format: "%d.%m.%Y".into()
            }),
            "09.03.2024"
        );
        assert_eq!(
            v.display(&Field::Info {
                info: InfoField::Title
            }),
            "Report"
        );
    }

    #[test]
    fn page_ref_resolves_bookmarks() {
        let mut v = values();
        let field = Field::PageRef {
            bookmark: "intro".into(),
            format: NumberFormat::Arabic,
        };
        assert_eq!(v.display(&field), "??");
        v.bookmarks.insert("intro".into(), 7);
        assert_eq!(v.display(&field), "7");
    }
}
