// src/normalize.rs
//! Text normalization: tokenization, English canonicalization, ASCII pinyin.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::lexicon::Lexicon;

/// Upper bound on canonicalization passes. Every pass either shortens the token or
/// lands on a synonym target, so real tokens settle long before this.
const MAX_CANONICAL_PASSES: usize = 32;

/// Lowercase alphanumeric tokens in order; punctuation and whitespace are separators.
pub fn to_tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Lowercase, map everything outside `[a-z0-9\s]` to a space, collapse whitespace.
pub fn normalize_english_text(text: &str) -> String {
    let mapped: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    collapse_whitespace(&mapped)
}

/// One canonicalization pass: synonym, inflection strip, synonym.
pub fn canonical_token_once(token: &str, lexicon: &Lexicon) -> String {
    let mut t = lexicon.synonym(token).unwrap_or(token).to_string();
    let len = t.chars().count();
    if len > 5 && t.ends_with("ing") {
        t.truncate(t.len() - 3);
    } else if len > 4 && t.ends_with("ed") {
        t.truncate(t.len() - 2);
    } else if len > 4 && t.ends_with('s') {
        t.truncate(t.len() - 1);
    }
    match lexicon.synonym(&t) {
        Some(s) => s.to_string(),
        None => t,
    }
}

/// Repeats `canonical_token_once` until the token stops changing.
pub fn canonical_token(token: &str, lexicon: &Lexicon) -> String {
    let mut current = token.to_string();
    for _ in 0..MAX_CANONICAL_PASSES {
        let next = canonical_token_once(&current, lexicon);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// Lowercase, strip tone marks (NFD + combining marks), fold ü, keep `[a-z' ]`.
pub fn normalize_pinyin_ascii(text: &str) -> String {
    let folded: String = text
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| match c {
            'ü' | 'ǖ' | 'ǘ' | 'ǚ' | 'ǜ' => 'u',
            c if c.is_ascii_lowercase() || c == '\'' || c.is_whitespace() => c,
            _ => ' ',
        })
        .collect();
    collapse_whitespace(&folded)
}

/// ASCII pinyin syllables; tone digits are dropped by the normalization.
pub fn pinyin_syllables(text: &str) -> Vec<String> {
    normalize_pinyin_ascii(text)
        .split_whitespace()
        .map(|s| s.trim_matches('\'').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Answer tokens of an English gloss: lowercase `[a-z]+` runs of length >= 3 that are
/// not answer stopwords. Order of first appearance, no duplicates.
pub fn answer_tokens(english: &str, lexicon: &Lexicon) -> Vec<String> {
    let lower = english.to_lowercase();
    let mut out: Vec<String> = Vec::new();
    for run in lower.split(|c: char| !c.is_ascii_lowercase()) {
        if run.len() < 3 || lexicon.answer_stopwords.contains(run) {
            continue;
        }
        if !out.iter().any(|t| t == run) {
            out.push(run.to_string());
        }
    }
    out
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
