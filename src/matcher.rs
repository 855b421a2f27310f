//! Accent- and case-insensitive comparison of Greek word forms.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Reduces a word to its comparison key.
///
/// The word is NFD-decomposed and combining marks (accents, breathings,
/// dialytika, iota subscripts) are dropped, then letters are lowercased and
/// final sigma collapses into medial sigma. Only marks are removed; distinct
/// base letters (e.g. omicron vs omega) never fold together.
pub fn fold(word: &str) -> String {
    let mut key = String::with_capacity(word.len());
    for ch in word.nfd() {
        if is_combining_mark(ch) {
            continue;
        }
        for lower in ch.to_lowercase() {
            key.push(if lower == 'ς' { 'σ' } else { lower });
        }
    }
    key
}

/// Returns the position of the first candidate equal to `target` under
/// [`fold`], in encounter order, or `None` when nothing matches.
///
/// An empty target never matches, and an empty candidate sequence yields
/// `None`. The returned index is part of the contract: it selects the
/// per-match-position highlight class a word receives.
pub fn find_match_index<I, S>(candidates: I, target: &str) -> Option<usize>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let key = fold(target);
    if key.is_empty() {
        return None;
    }
    candidates
        .into_iter()
        .position(|candidate| fold(candidate.as_ref()) == key)
}
