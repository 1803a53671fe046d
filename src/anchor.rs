// src/anchor.rs
//! Sound-anchor grammar and story integration.
//!
//! A canonical anchor reads `Think of WORD.` or `Think of WORD, WORD.` with upper-case
//! words. A story integrates the anchor when every word (or one of its aliases) shows up
//! as a whole word, case-insensitively, or when the upper-case word carries a lower-case
//! inflection (`He EYEs his friend`).

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::config::PhoneticConfig;
use crate::lexicon::Lexicon;
use crate::normalize::{collapse_whitespace, normalize_english_text, pinyin_syllables};

/// Upper-case anchor word -> lower-case aliases that also count as integration.
pub type AliasMap = BTreeMap<String, Vec<String>>;

static RE_SINGLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Think of ([A-Z]+)\.$").expect("single anchor regex"));
static RE_MULTI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Think of ([A-Z]+(?:, [A-Z]+)*)\.$").expect("multi anchor regex")
});
static RE_SOUNDS_LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bsounds?\s+like\b").expect("sounds-like regex"));

/// Case-insensitive whole-word regex for a literal form.
pub(crate) fn word_regex(form: &str) -> Option<Regex> {
    let form = form.trim();
    if form.is_empty() {
        return None;
    }
    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(form))).ok()
}

pub(crate) fn contains_word(text: &str, form: &str) -> bool {
    word_regex(form).is_some_and(|re| re.is_match(text))
}

/// Keys upper-cased and trimmed; aliases trimmed, lower-cased, deduplicated in order.
pub fn normalize_alias_map(raw: &HashMap<String, Vec<String>>) -> AliasMap {
    let mut out = AliasMap::new();
    for (word, aliases) in raw {
        let key = word.trim().to_uppercase();
        if key.is_empty() {
            continue;
        }
        let entry = out.entry(key).or_default();
        for alias in aliases {
            let a = alias.trim().to_lowercase();
            if !a.is_empty() && !entry.contains(&a) {
                entry.push(a);
            }
        }
    }
    out
}

/// `WORD` from a strict single-word anchor.
pub fn extract_canonical_anchor_word(text: &str) -> Option<String> {
    RE_SINGLE
        .captures(text.trim())
        .map(|caps| caps[1].to_string())
}

/// Every word of a (single- or multi-word) canonical anchor; empty when not canonical.
pub fn extract_canonical_anchor_words(text: &str) -> Vec<String> {
    match RE_MULTI.captures(text.trim()) {
        Some(caps) => caps[1].split(", ").map(str::to_string).collect(),
        None => Vec::new(),
    }
}

pub fn is_canonical_anchor(text: &str) -> bool {
    let t = text.trim();
    RE_MULTI.is_match(t) && !RE_SOUNDS_LIKE.is_match(t)
}

pub fn is_single_word_anchor(text: &str) -> bool {
    RE_SINGLE.is_match(text.trim())
}

/// The word itself followed by its aliases.
pub fn word_forms(word: &str, aliases: &AliasMap) -> Vec<String> {
    let key = word.to_uppercase();
    let mut forms = vec![key.clone()];
    if let Some(list) = aliases.get(&key) {
        forms.extend(list.iter().cloned());
    }
    forms
}

/// `[WORD, ...aliases]` for a single-word canonical anchor, else empty.
pub fn anchor_forms_for_story(anchor: &str, aliases: &AliasMap) -> Vec<String> {
    match extract_canonical_anchor_word(anchor) {
        Some(word) => word_forms(&word, aliases),
        None => Vec::new(),
    }
}

/// Upper-case `word` in `story` with no letter or hyphen before it and no upper-case letter
/// or hyphen after it, so `EYEs` counts for `EYE` but `EYELID` and `eyes` do not.
fn contains_inflected_caps(story: &str, word: &str) -> bool {
    if word.is_empty() {
        return false;
    }
    story.match_indices(word).any(|(start, m)| {
        let before = story[..start].chars().next_back();
        let after = story[start + m.len()..].chars().next();
        !before.is_some_and(|c| c.is_alphabetic() || c == '-')
            && !after.is_some_and(|c| c.is_uppercase() || c == '-')
    })
}

pub fn anchor_integrated_in_story_with_aliases(
    anchor: &str,
    story: &str,
    aliases: &AliasMap,
) -> bool {
    let words = extract_canonical_anchor_words(anchor);
    if words.is_empty() || story.trim().is_empty() {
        return false;
    }
    words.iter().all(|word| {
        contains_inflected_caps(story, word)
            || word_forms(word, aliases)
                .iter()
                .any(|form| contains_word(story, form))
    })
}

/// Story with the anchor's words removed, so the anchor itself never trips a pinyin check.
pub fn story_text_excluding_anchor(story: &str, anchor: &str) -> String {
    let mut out = story.to_string();
    for word in extract_canonical_anchor_words(anchor) {
        if let Some(re) = word_regex(&word) {
            out = re.replace_all(&out, " ").into_owned();
        }
    }
    collapse_whitespace(&out)
}

/// Content words of a story (>= 3 chars, no raw stopwords), minus the anchor word.
pub fn story_content_words(story: &str, anchor_word: &str, lexicon: &Lexicon) -> BTreeSet<String> {
    let anchor = anchor_word.to_lowercase();
    normalize_english_text(story)
        .split(' ')
        .filter(|w| w.len() >= 3 && *w != anchor && !lexicon.raw_stopwords.contains(*w))
        .map(str::to_string)
        .collect()
}

pub fn jaccard_similarity(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Anchor words missing from the allow-list.
pub fn disallowed_anchor_words(anchor: &str, allowed: &HashSet<String>) -> Vec<String> {
    extract_canonical_anchor_words(anchor)
        .into_iter()
        .filter(|w| !allowed.contains(w))
        .collect()
}

pub fn anchor_words_allowed(anchor: &str, allowed: &HashSet<String>) -> bool {
    !extract_canonical_anchor_words(anchor).is_empty()
        && disallowed_anchor_words(anchor, allowed).is_empty()
}

/// Whether the story's first word (letters and hyphens only) is one of `forms`.
pub fn story_starts_with_form(story: &str, forms: &[String]) -> bool {
    let first: String = story
        .split_whitespace()
        .next()
        .unwrap_or("")
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || *c == '-')
        .collect();
    !first.is_empty() && forms.iter().any(|f| f.eq_ignore_ascii_case(&first))
}

/// `Think of WORD.` for the first syllable of `pinyin`, when a candidate exists and is allowed.
pub fn suggest_anchor(pinyin: &str, config: &PhoneticConfig) -> Option<String> {
    let syllable = pinyin_syllables(pinyin).into_iter().next()?;
    let word = config.phonetic_anchor_candidates.get(&syllable)?.trim().to_uppercase();
    if word.is_empty() || !config.allowed_anchor_words().contains(&word) {
        return None;
    }
    Some(format!("Think of {}.", word))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aliases() -> AliasMap {
        let mut raw = HashMap::new();
        raw.insert(" wei ".to_string(), vec![" Way ".into(), "way".into(), "".into()]);
        raw.insert("".to_string(), vec!["ignored".into()]);
        normalize_alias_map(&raw)
    }

    #[test]
    fn alias_map_is_normalized() {
        let map = aliases();
        assert_eq!(map.len(), 1);
        assert_eq!(map["WEI"], vec!["way".to_string()]);
    }

    #[test]
    fn canonical_grammar() {
        assert_eq!(extract_canonical_anchor_word(" Think of JET. ").as_deref(), Some("JET"));
        assert_eq!(extract_canonical_anchor_word("Think of JET, DAY."), None);
        assert_eq!(extract_canonical_anchor_words("Think of JET, DAY."), vec!["JET", "DAY"]);
        assert!(is_canonical_anchor("Think of JET, DAY."));
        assert!(!is_canonical_anchor("Think of jet."));
        assert!(!is_canonical_anchor("Sounds like JET."));
        assert!(!is_canonical_anchor("Think of JET"));
        assert!(is_single_word_anchor("Think of BEE."));
        assert!(!is_single_word_anchor("Think of JET, DAY."));
    }

    #[test]
    fn integration_is_case_insensitive_and_whole_word() {
        let map = AliasMap::new();
        assert!(anchor_integrated_in_story_with_aliases("Think of JET.", "A JET roars past.", &map));
        assert!(anchor_integrated_in_story_with_aliases("Think of JET.", "A jet roars past.", &map));
        assert!(!anchor_integrated_in_story_with_aliases("Think of JET.", "Jetsam floats by.", &map));
        assert!(anchor_integrated_in_story_with_aliases("Think of EYE.", "He EYEs his friend.", &map));
        assert!(!anchor_integrated_in_story_with_aliases("Think of EYE.", "An EYELID droops.", &map));
        assert!(!anchor_integrated_in_story_with_aliases("Think of EYE.", "A red-EYEs flight.", &map));
        assert!(!anchor_integrated_in_story_with_aliases("Think of JET.", "", &map));
        assert!(!anchor_integrated_in_story_with_aliases("sounds like jet", "A jet roars.", &map));
    }

    #[test]
    fn integration_uses_aliases_and_needs_every_word() {
        let map = aliases();
        assert!(anchor_integrated_in_story_with_aliases(
            "Think of WEI.",
            "She finds a way home.",
            &map
        ));
        assert!(!anchor_integrated_in_story_with_aliases(
            "Think of JET, DAY.",
            "A JET lands at dusk.",
            &map
        ));
        assert!(anchor_integrated_in_story_with_aliases(
            "Think of JET, DAY.",
            "A JET lands on a bright DAY.",
            &map
        ));
    }

    #[test]
    fn forms_only_for_single_word_anchor() {
        let map = aliases();
        assert_eq!(anchor_forms_for_story("Think of WEI.", &map), vec!["WEI", "way"]);
        assert!(anchor_forms_for_story("Think of WEI, JET.", &map).is_empty());
        assert!(anchor_forms_for_story("", &map).is_empty());
    }

    #[test]
    fn excluding_anchor_removes_words() {
        assert_eq!(
            story_text_excluding_anchor("The SHE she sells shells.", "Think of SHE."),
            "The sells shells."
        );
        assert_eq!(story_text_excluding_anchor("No anchor here.", ""), "No anchor here.");
    }

    #[test]
    fn content_words_and_jaccard() {
        let lex = Lexicon::builtin();
        let a = story_content_words("The JET lands on the red runway.", "JET", lex);
        let b = story_content_words("A JET lands near the red barn.", "jet", lex);
        assert!(!a.contains("jet"));
        assert!(!a.contains("the"));
        let sim = jaccard_similarity(&a, &b);
        // {lands, red, runway} vs {lands, near, red, barn}
        assert!((sim - 2.0 / 5.0).abs() < 1e-9);
        assert_eq!(jaccard_similarity(&BTreeSet::new(), &BTreeSet::new()), 0.0);
    }

    #[test]
    fn allow_list_checks_every_word() {
        let allowed: HashSet<String> = ["JET".to_string(), "DAY".to_string()].into_iter().collect();
        assert!(anchor_words_allowed("Think of JET, DAY.", &allowed));
        assert_eq!(disallowed_anchor_words("Think of JET, BEE.", &allowed), vec!["BEE"]);
        assert!(!anchor_words_allowed("Think of jet.", &allowed));
    }

    #[test]
    fn start_placement() {
        let forms = vec!["BEE".to_string(), "bee".to_string()];
        assert!(story_starts_with_form("Bee, hovering, lands.", &forms));
        assert!(!story_starts_with_form("A bee lands.", &forms));
        assert!(!story_starts_with_form("", &forms));
    }

    #[test]
    fn suggests_allowed_candidate() {
        let cfg = PhoneticConfig::from_json_str(
            r#"{"englishSoundAnchorWords": ["jet"],
                "phoneticAnchorCandidates": {"jie": "jet", "ma": "mop"}}"#,
        )
        .unwrap();
        assert_eq!(suggest_anchor("jiě jie", &cfg).as_deref(), Some("Think of JET."));
        assert_eq!(suggest_anchor("mā", &cfg), None);
        assert_eq!(suggest_anchor("", &cfg), None);
    }
}
