// src/quality/sanitize.rs
//! Safe hint construction: strip leaking text out of a story before it is shown as a hint.

use once_cell::sync::Lazy;
use regex::Regex;

use super::classifiers::is_literal_shape_hint;
use super::profile::{Check, Profile};
use crate::deck::Card;
use crate::lexicon::Lexicon;
use crate::normalize::{answer_tokens, collapse_whitespace, pinyin_syllables};

static RE_SOUNDS_LIKE_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bsounds?\s+like\b[^.?!]*[.?!]?").expect("sounds-like clause regex")
});
static RE_THINK_OF_CLAUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bthink of\b[^.?!]*[.?!]?").expect("think-of clause regex"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HintOptions {
    pub forbid_pinyin: bool,
    pub forbid_english_answer: bool,
    pub forbid_phonetic_cue: bool,
    pub forbid_literal_shape: bool,
}

impl HintOptions {
    pub fn for_profile(profile: &Profile) -> Self {
        Self {
            forbid_pinyin: profile.enabled(Check::Pinyin),
            forbid_english_answer: profile.enabled(Check::EnglishAnswer),
            forbid_phonetic_cue: profile.enabled(Check::PhoneticCue),
            forbid_literal_shape: profile.enabled(Check::LiteralShape),
        }
    }
}

/// Removes the raw pinyin (case-insensitive) and every ASCII syllable as a whole word.
pub fn strip_pinyin(text: &str, pinyin: &str) -> String {
    let raw = pinyin.trim();
    if raw.is_empty() {
        return collapse_whitespace(text);
    }
    let mut out = text.to_string();
    if let Ok(re) = Regex::new(&format!("(?i){}", regex::escape(raw))) {
        out = re.replace_all(&out, " ").into_owned();
    }
    for syl in pinyin_syllables(raw) {
        if let Ok(re) = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(&syl))) {
            out = re.replace_all(&out, " ").into_owned();
        }
    }
    collapse_whitespace(&out)
}

/// Removes every word that starts with a gloss answer token.
pub fn strip_english_answer(text: &str, english: &str, lexicon: &Lexicon) -> String {
    let mut out = text.to_string();
    for token in answer_tokens(english, lexicon) {
        if let Ok(re) = Regex::new(&format!(r"(?i)\b{}\w*", regex::escape(&token))) {
            out = re.replace_all(&out, " ").into_owned();
        }
    }
    collapse_whitespace(&out)
}

/// Drops "sounds like ..." and "think of ..." up to the next sentence terminator.
pub fn strip_phonetic_cue(text: &str) -> String {
    let out = RE_SOUNDS_LIKE_CLAUSE.replace_all(text, " ");
    let out = RE_THINK_OF_CLAUSE.replace_all(&out, " ");
    collapse_whitespace(&out)
}

pub fn build_safe_hint(card: &Card, opts: HintOptions, lexicon: &Lexicon) -> String {
    let mut text = card.story_text();
    if opts.forbid_pinyin {
        text = strip_pinyin(&text, &card.pinyin);
    }
    if opts.forbid_english_answer {
        text = strip_english_answer(&text, &card.english, lexicon);
    }
    if opts.forbid_phonetic_cue {
        text = strip_phonetic_cue(&text);
    }
    if opts.forbid_literal_shape && is_literal_shape_hint(&text) {
        text.clear();
    }
    text.trim().to_string()
}
