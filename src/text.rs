//! # Text Normalisation
//!
//! Splits raw strings into the leaf sequence the line breaker consumes:
//! words, blanks, tabs, line breaks and soft hyphens. Words are further cut
//! at UAX#14 break opportunities (so "high-level" can wrap after the hyphen)
//! and, when hyphenation is enabled, at syllable boundaries.

use crate::model::Inline;
use unicode_linebreak::{linebreaks, BreakOpportunity};

/// Split `text` into inline leaves. With `lang` set, words get soft hyphens
/// between syllables.
pub fn split_into_leaves(text: &str, lang: Option<&str>) -> Vec<Inline> {
    let hyphen_lang = lang.and_then(resolve_hypher_lang);
    let mut leaves = Vec::new();
    let mut word = String::new();

    for ch in text.chars() {
        let leaf = match ch {
            ' ' => Some(Inline::Blank),
            '\t' => Some(Inline::Tab),
            '\n' => Some(Inline::LineBreak),
            '\u{ad}' => Some(Inline::SoftHyphen),
            '\r' => continue,
            _ => None,
        };
        match leaf {
            Some(leaf) => {
                push_word(&mut leaves, &word, hyphen_lang);
                word.clear();
                leaves.push(leaf);
            }
            None => word.push(ch),
        }
    }
    push_word(&mut leaves, &word, hyphen_lang);
    leaves
}

fn push_word(leaves: &mut Vec<Inline>, word: &str, lang: Option<hypher::Lang>) {
    if word.is_empty() {
        return;
    }
    for segment in break_segments(word) {
        match lang {
            Some(lang) => push_syllables(leaves, segment, lang),
            None => leaves.push(Inline::text(segment)),
        }
    }
}

/// Cut a word at allowed UAX#14 break opportunities.
fn break_segments(word: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    for (offset, opp) in linebreaks(word) {
        // The final offset is always the end of the text.
        if offset >= word.len() {
            break;
        }
        if matches!(opp, BreakOpportunity::Allowed | BreakOpportunity::Mandatory) {
            segments.push(&word[start..offset]);
            start = offset;
        }
    }
    segments.push(&word[start..]);
    segments
}

fn push_syllables(leaves: &mut Vec<Inline>, segment: &str, lang: hypher::Lang) {
    // Patterns are lowercase; map the syllable lengths back onto the
    // original casing.
    let lower = segment.to_lowercase();
    if lower.chars().count() != segment.chars().count() {
        leaves.push(Inline::text(segment));
        return;
    }
    let mut chars = segment.chars();
    let mut first = true;
    for syllable in hypher::hyphenate(&lower, lang) {
        let n = syllable.chars().count();
        let piece: String = chars.by_ref().take(n).collect();
        if !first {
            leaves.push(Inline::SoftHyphen);
        }
        leaves.push(Inline::Text { text: piece });
        first = false;
    }
}

/// Map a BCP 47 language tag to a `hypher::Lang`.
fn resolve_hypher_lang(lang: &str) -> Option<hypher::Lang> {
    let primary = lang.split(['-', '_']).next().unwrap_or("").to_lowercase();
    match primary.as_str() {
        "af" => Some(hypher::Lang::Afrikaans),
        "sq" => Some(hypher::Lang::Albanian),
        "be" => Some(hypher::Lang::Belarusian),
        "bg" => Some(hypher::Lang::Bulgarian),
        "ca" => Some(hypher::Lang::Catalan),
        "hr" => Some(hypher::Lang::Croatian),
        "cs" => Some(hypher::Lang::Czech),
        "da" => Some(hypher::Lang::Danish),
        "nl" => Some(hypher::Lang::Dutch),
        "en" => Some(hypher::Lang::English),
        "et" => Some(hypher::Lang::Estonian),
        "fi" => Some(hypher::Lang::Finnish),
        "fr" => Some(hypher::Lang::French),
        "de" => Some(hypher::Lang::German),
        "el" => Some(hypher::Lang::Greek),
        "hu" => Some(hypher::Lang::Hungarian),
        "is" => Some(hypher::Lang::Icelandic),
        "it" => Some(hypher::Lang::Italian),
        "la" => Some(hypher::Lang::Latin),
        "lt" => Some(hypher::Lang::Lithuanian),
        "nb" | "nn" | "no" => Some(hypher::Lang::Norwegian),
        "pl" => Some(hypher::Lang::Polish),
        "pt" => Some(hypher::Lang::Portuguese),
        "ru" => Some(hypher::Lang::Russian),
        "sr" => Some(hypher::Lang::Serbian),
        "sk" => Some(hypher::Lang::Slovak),
        "sl" => Some(hypher::Lang::Slovenian),
        "es" => Some(hypher::Lang::Spanish),
        "sv" => Some(hypher::Lang::Swedish),
        "tr" => Some(hypher::Lang::Turkish),
        "uk" => Some(hypher::Lang::Ukrainian),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(leaves: &[Inline]) -> Vec<String> {
        leaves
            .iter()
            .map(|l| match l {
                Inline::Text { text } => text.clone(),
                Inline::Blank => " ".to_string(),
                Inline::SoftHyphen => "~".to_string(),
                other => format!("{other:?}"),
            })
            .collect()
    }

    #[test]
    fn blanks_become_separate_leaves() {
        let leaves = split_into_leaves("a  b", None);
        assert_eq!(words(&leaves), vec!["a", " ", " ", "b"]);
    }

    #[test]
    fn hyphenated_compound_splits_after_hyphen() {
        let leaves = split_into_leaves("high-level", None);
        assert_eq!(words(&leaves), vec!["high-", "level"]);
    }

    #[test]
    fn explicit_soft_hyphen() {
        let leaves = split_into_leaves("con\u{ad}tent", None);
        assert_eq!(words(&leaves), vec!["con", "~", "tent"]);
    }

    #[test]
    fn hyphenation_inserts_soft_hyphens() {
        let leaves = split_into_leaves("Hyphenation", Some("en-US"));
        assert!(leaves.contains(&Inline::SoftHyphen));
        let joined: String = leaves
            .iter()
            .filter_map(|l| match l {
                Inline::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(joined, "Hyphenation");
    }

    #[test]
    fn unknown_language_leaves_words_whole() {
        let leaves = split_into_leaves("Hyphenation", Some("xx"));
        assert_eq!(leaves.len(), 1);
    }
}
