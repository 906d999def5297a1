//! Player name normalization for cross-source identity matching

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Generational suffixes dropped when they are the trailing token
const GENERATIONAL_SUFFIXES: [&str; 4] = [" jr.", " jr", " sr.", " sr"];

/// Canonicalize a display name so that spellings from different sources compare equal.
///
/// Accents are removed ("Đoković" and "Dokovic" agree), case is folded,
/// whitespace runs collapse to one space and a trailing generational suffix is
/// dropped. The result is a fixed point: `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(name: &str) -> String {
    let folded: String = strip_marks(name).chars().map(fold_stroke).collect();
    let lowered = strip_marks(&folded.to_lowercase());

    let mut normalized = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    while let Some(stripped) = strip_suffix(&normalized) {
        normalized = stripped;
    }
    normalized
}

fn strip_marks(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

fn strip_suffix(name: &str) -> Option<String> {
    GENERATIONAL_SUFFIXES
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix))
        .map(|rest| rest.trim_end().to_string())
}

/// Latin letters with a stroke have no canonical decomposition.
fn fold_stroke(c: char) -> char {
    match c {
        'Đ' | 'đ' => 'd',
        'Ø' | 'ø' => 'o',
        'Ł' | 'ł' => 'l',
        'Ħ' | 'ħ' => 'h',
        _ => c,
    }
}
