//! Cleaning of scraped release metadata.
//!
//! Two flavours exist. [`normalize`] keeps readable casing and punctuation and
//! is what goes into catalog queries. [`normalize_for_comparison`] folds case
//! and diacritics away and is only ever used for scoring.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Parenthesised annotations containing one of these are dropped.
const EDITION_MARKERS: &[&str] = &["edition", "remaster", "version", "deluxe", "bonus"];

/// `Abbey Road (2)` style disambiguation suffix used by catalog sites.
static TRAILING_DISAMBIGUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(\d+\)\s*$").expect("valid disambiguation regex"));

static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("valid bracket regex"));

/// Clean a raw scraped field into a search-ready term.
///
/// Steps run in a fixed order since later ones assume the earlier cleanup:
/// trailing `(N)` suffix, `[...]` spans, edition-like `(...)` spans (nested
/// ones included), curly quotes, whitespace. Missing input yields an empty string.
pub fn normalize<'a>(raw: impl Into<Option<&'a str>>) -> String {
    let Some(raw) = raw.into() else {
        return String::new();
    };

    let without_suffix = TRAILING_DISAMBIGUATION.replace(raw, "");
    let without_brackets = BRACKETED.replace_all(&without_suffix, " ");
    let without_editions = strip_edition_parentheticals(&without_brackets);

    let straightened: String = without_editions
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            other => other,
        })
        .collect();

    collapse_whitespace(&straightened)
}

/// Stricter variant of [`normalize`] used only when scoring candidates.
///
/// Lowercases, strips diacritics (canonical decomposition, combining marks
/// discarded) and turns every character that is neither alphanumeric nor
/// whitespace into a space.
pub fn normalize_for_comparison<'a>(raw: impl Into<Option<&'a str>>) -> String {
    let cleaned = normalize(raw).to_lowercase();

    let folded: String = cleaned
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    collapse_whitespace(&folded)
}

/// Drop every outermost `(...)` span that mentions an edition marker anywhere
/// inside it, nested spans included. Unbalanced parentheses are kept as-is.
fn strip_edition_parentheticals(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut span = String::new();
    let mut depth = 0usize;

    for c in s.chars() {
        match c {
            '(' => {
                depth += 1;
                span.push(c);
            }
            ')' if depth > 0 => {
                depth -= 1;
                span.push(c);
                if depth == 0 {
                    let content = span.to_lowercase();
                    if EDITION_MARKERS.iter().any(|marker| content.contains(marker)) {
                        out.push(' ');
                    } else {
                        out.push_str(&span);
                    }
                    span.clear();
                }
            }
            _ if depth > 0 => span.push(c),
            _ => out.push(c),
        }
    }

    out.push_str(&span);
    out
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
