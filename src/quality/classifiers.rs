// src/quality/classifiers.rs
//! Story classifiers. Every predicate trims its input and answers `false` for empty text.

use regex::Regex;

use super::patterns::{
    ABSTRACT, BOILERPLATE, COMPONENT_META, CONCRETE_SCENE_VERBS, LITERAL_SHAPE, META_TEMPLATE,
    PHONETIC_CUE,
};
use crate::anchor::extract_canonical_anchor_words;
use crate::lexicon::Lexicon;
use crate::normalize::{answer_tokens, pinyin_syllables};

/// True when some gloss answer token starts a word in the story (`\btoken`).
pub fn contains_english_answer(story: &str, english: &str, lexicon: &Lexicon) -> bool {
    let story = story.trim();
    if story.is_empty() {
        return false;
    }
    answer_tokens(english, lexicon).iter().any(|token| {
        Regex::new(&format!(r"(?i)\b{}", regex::escape(token)))
            .is_ok_and(|re| re.is_match(story))
    })
}

/// Raw pinyin with no letter on either side, or any ASCII syllable as a whole word.
pub fn contains_pinyin(story: &str, pinyin: &str) -> bool {
    let story = story.trim();
    let raw = pinyin.trim();
    if story.is_empty() || raw.is_empty() {
        return false;
    }
    if contains_raw_unbounded_by_letters(story, raw) {
        return true;
    }
    pinyin_syllables(raw).iter().any(|syl| {
        Regex::new(&format!(r"(?i)\b{}\b", regex::escape(syl))).is_ok_and(|re| re.is_match(story))
    })
}

// The regex crate has no lookaround, so neighbours are checked by hand.
fn contains_raw_unbounded_by_letters(text: &str, raw: &str) -> bool {
    let Ok(re) = Regex::new(&format!("(?i){}", regex::escape(raw))) else {
        return false;
    };
    let hit = re.find_iter(text).any(|m| {
        let before = text[..m.start()].chars().next_back();
        let after = text[m.end()..].chars().next();
        !before.is_some_and(char::is_alphabetic) && !after.is_some_and(char::is_alphabetic)
    });
    hit
}

pub fn contains_phonetic_cue(story: &str) -> bool {
    PHONETIC_CUE.is_match(story.trim())
}

pub fn is_literal_shape_hint(story: &str) -> bool {
    let s = story.trim();
    !s.is_empty() && LITERAL_SHAPE.is_match(s)
}

pub fn has_boilerplate_phrase(story: &str) -> bool {
    let s = story.trim();
    !s.is_empty() && BOILERPLATE.is_match(s)
}

/// Dangling sentence fragments, a lowercase opening, or stacked punctuation.
pub fn is_likely_incoherent(story: &str) -> bool {
    let s = story.trim();
    if s.is_empty() {
        return false;
    }
    if s.starts_with(|c: char| c.is_ascii_lowercase()) {
        return true;
    }
    let chars: Vec<char> = s.chars().collect();
    // ". ." with only whitespace between two periods
    let mut last_period: Option<usize> = None;
    for (i, c) in chars.iter().enumerate() {
        if *c == '.' {
            if let Some(p) = last_period {
                if i > p + 1 && chars[p + 1..i].iter().all(|c| c.is_whitespace()) {
                    return true;
                }
            }
            last_period = Some(i);
        } else if !c.is_whitespace() {
            last_period = None;
        }
    }
    chars
        .windows(2)
        .any(|w| w.iter().all(|c| matches!(c, '!' | '?' | '.' | ',')))
}

pub fn is_likely_abstract(story: &str) -> bool {
    let s = story.trim();
    !s.is_empty() && ABSTRACT.is_match(s)
}

/// Talks about components/radicals without a scene, an anchor or a meaning hook.
pub fn is_likely_component_only(
    story: &str,
    has_sound_anchor: bool,
    english: &str,
    lexicon: &Lexicon,
) -> bool {
    let s = story.trim();
    if s.is_empty() {
        return false;
    }
    COMPONENT_META.is_match(s)
        && !CONCRETE_SCENE_VERBS.is_match(s)
        && !has_sound_anchor
        && !contains_english_answer(s, english, lexicon)
}

/// The story narrates the memorization itself instead of painting a scene.
pub fn is_meta_template_story(story: &str) -> bool {
    let s = story.trim();
    !s.is_empty() && META_TEMPLATE.is_match(s)
}

/// Story opens with a bare anchor word jammed against a non-connector, e.g.
/// `"BEE hovers near the flower."`.
pub fn is_anchor_grammatically_isolated(anchor: &str, story: &str, lexicon: &Lexicon) -> bool {
    let words = extract_canonical_anchor_words(anchor);
    if words.is_empty() {
        return false;
    }
    let mut tokens = story.split_whitespace();
    let Some(first_raw) = tokens.next() else {
        return false;
    };
    let first: String = first_raw
        .chars()
        .filter(|c| c.is_alphabetic() || *c == '-')
        .collect();
    if !words.iter().any(|w| w.eq_ignore_ascii_case(&first)) {
        return false;
    }
    if first_raw.ends_with(|c: char| matches!(c, ',' | ';' | ':' | '.' | '!' | '?')) {
        return false;
    }
    let Some(next_raw) = tokens.next() else {
        return false;
    };
    let next: String = next_raw
        .chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .collect();
    !lexicon.is_safe_follower(&next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex() -> &'static Lexicon {
        Lexicon::builtin()
    }

    #[test]
    fn empty_input_is_never_flagged() {
        let l = lex();
        for s in ["", "   "] {
            assert!(!contains_english_answer(s, "mouth", l));
            assert!(!contains_pinyin(s, "kǒu"));
            assert!(!contains_phonetic_cue(s));
            assert!(!is_literal_shape_hint(s));
            assert!(!has_boilerplate_phrase(s));
            assert!(!is_likely_incoherent(s));
            assert!(!is_likely_abstract(s));
            assert!(!is_likely_component_only(s, false, "mouth", l));
            assert!(!is_meta_template_story(s));
            assert!(!is_anchor_grammatically_isolated("Think of BEE.", s, l));
        }
    }

    #[test]
    fn english_answer_is_prefix_bounded() {
        let l = lex();
        assert!(contains_english_answer("The Runner waits.", "run", l));
        assert!(!contains_english_answer("A rerun airs.", "run", l));
        // stopwords and short tokens never count
        assert!(!contains_english_answer("It is on the table.", "to be on", l));
    }

    #[test]
    fn pinyin_raw_and_syllables() {
        assert!(contains_pinyin("She yells kǒu at dawn.", "kǒu"));
        assert!(contains_pinyin("She yells KOU at dawn.", "kǒu"));
        assert!(!contains_pinyin("A kouk sits.", "kǒu"));
        assert!(contains_pinyin("Say ni and hao.", "nǐ hǎo"));
        assert!(!contains_pinyin("Nine hounds run.", "nǐ hǎo"));
        // raw tone-marked string glued to letters does not count
        assert!(!contains_pinyin("xkǒux", "kǒu"));
    }

    #[test]
    fn phonetic_cue_and_shape() {
        assert!(contains_phonetic_cue("It sounds like rain."));
        assert!(contains_phonetic_cue("Think of a bell."));
        assert!(!contains_phonetic_cue("I think often."));
        assert!(is_literal_shape_hint("Two vertical lines."));
        assert!(!is_literal_shape_hint("A liner sails."));
    }

    #[test]
    fn incoherence_signals() {
        assert!(is_likely_incoherent("the cat sleeps."));
        assert!(is_likely_incoherent("A cat. . sleeps"));
        assert!(is_likely_incoherent("Wait!? Now."));
        assert!(is_likely_incoherent("A cat sleeps..."));
        assert!(!is_likely_incoherent("A cat sleeps. A dog barks."));
        assert!(!is_likely_incoherent("\"quoted\" start"));
    }

    #[test]
    fn abstract_and_meta() {
        assert!(is_likely_abstract("The concept of motion."));
        assert!(is_likely_abstract("It Symbolises peace."));
        assert!(!is_likely_abstract("A horse gallops."));
        assert!(is_meta_template_story("I remember the JET by its roar."));
        assert!(is_meta_template_story("This character shows a door."));
        assert!(!is_meta_template_story("A JET roars over the harbor."));
    }

    #[test]
    fn component_only_needs_every_condition() {
        let l = lex();
        let s = "The radical on the left side guides meaning.";
        assert!(is_likely_component_only(s, false, "stone", l));
        assert!(!is_likely_component_only(s, true, "stone", l));
        assert!(!is_likely_component_only(s, false, "meaning", l));
        assert!(!is_likely_component_only(
            "The radical on the left side walks away.",
            false,
            "stone",
            l
        ));
    }

    #[test]
    fn grammatical_isolation() {
        let l = lex();
        assert!(is_anchor_grammatically_isolated("Think of BEE.", "BEE hovers near the flower.", l));
        assert!(!is_anchor_grammatically_isolated("Think of BEE.", "A BEE hovers near the flower.", l));
        assert!(!is_anchor_grammatically_isolated("Think of BEE.", "BEE, hovering, finds nectar.", l));
        assert!(!is_anchor_grammatically_isolated("Think of BEE.", "Bee and wasp share a flower.", l));
        assert!(!is_anchor_grammatically_isolated("sounds like bee", "BEE hovers.", l));
        assert!(is_anchor_grammatically_isolated("Think of JET, DAY.", "Day dawns grey.", l));
    }
}
