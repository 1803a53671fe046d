// src/curation.rs
//! Deck-wide curation regression checks.
//!
//! Every check returns its failure messages; an empty list is a pass. `run_suite` runs
//! the full battery with thresholds from `[curation]` in the TOML config.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

use crate::anchor::{
    anchor_forms_for_story, anchor_integrated_in_story_with_aliases,
    disallowed_anchor_words, extract_canonical_anchor_word, extract_canonical_anchor_words,
    is_canonical_anchor, jaccard_similarity, story_content_words, story_starts_with_form,
    story_text_excluding_anchor, word_regex, AliasMap,
};
use crate::deck::{Card, Deck};
use crate::lexicon::Lexicon;
use crate::normalize::{collapse_whitespace, word_count};
use crate::quality::classifiers::*;

static RE_NON_TEMPLATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z{}\s]").expect("template char regex"));
static RE_ASCII_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z]+").expect("word regex"));

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CurationThresholds {
    pub max_story_words: usize,
    pub min_hsk1_stories: usize,
    pub min_hsk1_anchors: usize,
    pub min_integrated_anchors: usize,
    pub min_single_char_anchor_ratio: f64,
    pub min_non_hsk1_story_ratio: f64,
    pub min_non_hsk1_anchor_ratio: f64,
    pub max_template_reuse: usize,
    pub max_anchor_start_ratio: f64,
    pub max_radical_anchor_start_ratio: f64,
    pub max_shared_anchor_similarity: f64,
}

impl Default for CurationThresholds {
    fn default() -> Self {
        Self {
            max_story_words: 12,
            min_hsk1_stories: 25,
            min_hsk1_anchors: 80,
            min_integrated_anchors: 75,
            min_single_char_anchor_ratio: 0.95,
            min_non_hsk1_story_ratio: 0.95,
            min_non_hsk1_anchor_ratio: 0.8,
            max_template_reuse: 8,
            max_anchor_start_ratio: 0.6,
            max_radical_anchor_start_ratio: 0.5,
            max_shared_anchor_similarity: 0.3,
        }
    }
}

/// Shared inputs for every check.
pub struct CurationContext<'a> {
    pub lexicon: &'a Lexicon,
    pub aliases: &'a AliasMap,
    pub allowed_anchor_words: &'a HashSet<String>,
    pub thresholds: &'a CurationThresholds,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    pub name: &'static str,
    pub failures: Vec<String>,
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CurationReport {
    pub checks: Vec<CheckOutcome>,
}

impl CurationReport {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(CheckOutcome::passed)
    }

    pub fn failure_count(&self) -> usize {
        self.checks.iter().map(|c| c.failures.len()).sum()
    }
}

fn label(card: &Card) -> String {
    format!("{} ({})", card.hanzi, card.english)
}

/// One decimal place percentage, e.g. `0.9512 -> 95.1`.
fn pct(ratio: f64) -> f64 {
    (ratio * 1000.0).round() / 10.0
}

fn ratio_or_one(num: usize, den: usize) -> f64 {
    if den == 0 {
        1.0
    } else {
        num as f64 / den as f64
    }
}

/// Shape problems with an anchor that is present; nothing for an empty anchor.
pub fn canonical_anchor_failures(anchor: &str, label: &str) -> Vec<String> {
    let anchor = anchor.trim();
    if anchor.is_empty() || is_canonical_anchor(anchor) {
        return Vec::new();
    }
    vec![format!(
        "{}: soundAnchor must be canonical ALL-CAPS phrase (e.g. \"Think of JET.\" or \"Think of JET, DAY.\")",
        label
    )]
}

/// Story classifier failures for one card. `force_anchor` treats the card as anchored
/// for the English-leak and component-only checks.
fn story_failures(card: &Card, lexicon: &Lexicon, force_anchor: bool) -> Vec<String> {
    let story = card.story_text();
    if story.is_empty() {
        return Vec::new();
    }
    let label = label(card);
    let anchor = card.sound_anchor();
    let has_anchor = force_anchor || !anchor.is_empty();
    let mut out = Vec::new();
    let mut fail = |cond: bool, msg: &str| {
        if cond {
            out.push(format!("{}: {}", label, msg));
        }
    };

    fail(
        !has_anchor && contains_english_answer(&story, &card.english, lexicon),
        "story leaks English answer token",
    );
    fail(
        contains_pinyin(&story_text_excluding_anchor(&story, anchor), &card.pinyin),
        "story leaks pinyin token",
    );
    fail(contains_phonetic_cue(&story), "story uses forbidden phonetic cue phrasing");
    fail(is_literal_shape_hint(&story), "story uses forbidden literal shape phrasing");
    fail(has_boilerplate_phrase(&story), "story uses forbidden boilerplate phrasing");
    fail(is_likely_incoherent(&story), "story appears incoherent");
    fail(is_likely_abstract(&story), "story appears abstract/non-scene");
    fail(
        is_likely_component_only(&story, has_anchor, &card.english, lexicon),
        "story appears to rely only on component/radical explanation",
    );
    fail(is_meta_template_story(&story), "story uses forbidden meta-template language");
    out
}

pub fn check_story_safety(cards: &[Card], ctx: &CurationContext<'_>) -> Vec<String> {
    cards
        .iter()
        .flat_map(|card| story_failures(card, ctx.lexicon, false))
        .collect()
}

/// Per-card structure and safety plus a floor on non-empty stories.
pub fn check_mnemonic_data_coverage(cards: &[Card], min_non_empty: usize, ctx: &CurationContext<'_>) -> Vec<String> {
    let mut out = Vec::new();
    for card in cards {
        if card.mnemonic_data.is_none() {
            out.push(format!("{}: missing mnemonicData object", label(card)));
            continue;
        }
        out.extend(canonical_anchor_failures(card.sound_anchor(), &label(card)));
        out.extend(story_failures(card, ctx.lexicon, false));
    }
    let non_empty = cards.iter().filter(|c| !c.story_text().is_empty()).count();
    if non_empty < min_non_empty {
        out.push(format!(
            "Expected at least {} cards with non-empty compliant stories, got {}",
            min_non_empty, non_empty
        ));
    }
    out
}

pub fn check_sound_anchor_batch(cards: &[Card], ctx: &CurationContext<'_>) -> Vec<String> {
    let mut out = Vec::new();
    let mut anchors = 0;
    let mut integrated = 0;
    for card in cards {
        let anchor = card.sound_anchor();
        if anchor.is_empty() {
            continue;
        }
        anchors += 1;
        let label = label(card);
        out.extend(canonical_anchor_failures(anchor, &label));
        if extract_canonical_anchor_words(anchor).is_empty() {
            out.push(format!("{}: unable to parse canonical anchor word(s)", label));
        }
        for word in disallowed_anchor_words(anchor, ctx.allowed_anchor_words) {
            out.push(format!(
                "{}: anchor word \"{}\" is outside allowed English anchor set",
                label, word
            ));
        }
        if anchor_integrated_in_story_with_aliases(anchor, &card.story_text(), ctx.aliases) {
            integrated += 1;
        }
    }
    let t = ctx.thresholds;
    if anchors < t.min_hsk1_anchors {
        out.push(format!(
            "Expected at least {} HSK1 cards with sound anchors, got {}",
            t.min_hsk1_anchors, anchors
        ));
    }
    if integrated < t.min_integrated_anchors {
        out.push(format!(
            "Expected at least {} HSK1 sound anchors integrated into stories, got {}",
            t.min_integrated_anchors, integrated
        ));
    }
    out
}

pub fn check_single_char_anchor_coverage(cards: &[Card], min_ratio: f64) -> Vec<String> {
    let eligible: Vec<&Card> = cards.iter().filter(|c| c.is_single_char()).collect();
    let anchored = eligible.iter().filter(|c| c.has_sound_anchor()).count();
    let ratio = ratio_or_one(anchored, eligible.len());
    if ratio >= min_ratio {
        return Vec::new();
    }
    vec![format!(
        "Expected at least {}% single-character HSK1 cards with sound anchors, got {}% ({}/{})",
        pct(min_ratio),
        pct(ratio),
        anchored,
        eligible.len()
    )]
}

pub fn check_non_hsk1_coverage(deck: &Deck, min_story_ratio: f64, min_anchor_ratio: f64) -> Vec<String> {
    let cards = deck.non_hsk1_cards();
    let with_story = cards.iter().filter(|c| !c.story_text().is_empty()).count();
    let with_anchor = cards.iter().filter(|c| c.has_sound_anchor()).count();
    let story_ratio = ratio_or_one(with_story, cards.len());
    let anchor_ratio = ratio_or_one(with_anchor, cards.len());
    let mut out = Vec::new();
    if story_ratio < min_story_ratio {
        out.push(format!(
            "Expected at least {}% non-HSK1 vocab story coverage, got {}% ({}/{})",
            pct(min_story_ratio),
            pct(story_ratio),
            with_story,
            cards.len()
        ));
    }
    if anchor_ratio < min_anchor_ratio {
        out.push(format!(
            "Expected at least {}% non-HSK1 vocab anchor coverage, got {}% ({}/{})",
            pct(min_anchor_ratio),
            pct(anchor_ratio),
            with_anchor,
            cards.len()
        ));
    }
    out
}

pub fn check_radicals_fully_curated(radicals: &[Card], ctx: &CurationContext<'_>) -> Vec<String> {
    let mut out = Vec::new();
    for card in radicals {
        let label = label(card);
        if card.mnemonic_data.is_none() {
            out.push(format!("{}: radicals deck entries must use mnemonicData", label));
            continue;
        }
        let anchor = card.sound_anchor();
        if anchor.is_empty() {
            out.push(format!("{}: radical cards must include soundAnchor", label));
            continue;
        }
        out.extend(canonical_anchor_failures(anchor, &label));
        let story = card.story_text();
        if story.is_empty() {
            out.push(format!("{}: story must be non-empty", label));
            continue;
        }
        // radicals never get the anchor exemption for the English leak
        if contains_english_answer(&story, &card.english, ctx.lexicon) {
            out.push(format!("{}: story leaks English answer token", label));
        }
        out.extend(
            story_failures(card, ctx.lexicon, true)
                .into_iter()
                .filter(|m| !m.ends_with("story leaks English answer token")),
        );
        if is_anchor_grammatically_isolated(anchor, &story, ctx.lexicon) {
            out.push(format!(
                "{}: anchor is grammatically isolated (jammed before a noun with no connector)",
                label
            ));
        }
        if !anchor_integrated_in_story_with_aliases(anchor, &story, ctx.aliases) {
            out.push(format!("{}: anchor must be integrated in story text", label));
        }
    }
    out
}

pub fn check_story_word_count(cards: &[Card], max_words: usize) -> Vec<String> {
    cards
        .iter()
        .filter_map(|card| {
            let words = word_count(&card.story_text());
            (words > max_words).then(|| {
                format!("{}: story too long ({} > {})", label(card), words, max_words)
            })
        })
        .collect()
}

/// Story skeleton with `{anchor}` and `{meaning}` placeholders, letters and braces only.
pub fn normalize_story_template(card: &Card, aliases: &AliasMap) -> String {
    let mut normalized = card.story_text().to_lowercase();
    for form in anchor_forms_for_story(card.sound_anchor(), aliases) {
        if let Some(re) = word_regex(&form.to_lowercase()) {
            normalized = re.replace_all(&normalized, " {anchor} ").into_owned();
        }
    }
    let english = card.english.to_lowercase();
    for token in RE_ASCII_WORD.find_iter(&english).map(|m| m.as_str()) {
        if token.len() < 3 {
            continue;
        }
        if let Some(re) = word_regex(token) {
            normalized = re.replace_all(&normalized, " {meaning} ").into_owned();
        }
    }
    collapse_whitespace(&RE_NON_TEMPLATE.replace_all(&normalized, " "))
}

pub fn check_template_diversity<'a, I>(cards: I, aliases: &AliasMap, max_reuse: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a Card>,
{
    let mut buckets: BTreeMap<String, Vec<&Card>> = BTreeMap::new();
    for card in cards {
        if card.story_text().is_empty() {
            continue;
        }
        let template = normalize_story_template(card, aliases);
        if template.is_empty() {
            continue;
        }
        buckets.entry(template).or_default().push(card);
    }
    let mut repeated: Vec<(String, Vec<&Card>)> = buckets
        .into_iter()
        .filter(|(_, list)| list.len() > max_reuse)
        .collect();
    repeated.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
    repeated
        .iter()
        .take(5)
        .map(|(template, list)| {
            let sample: Vec<String> = list.iter().take(5).map(|c| label(c)).collect();
            format!(
                "template {:?} reused {} times (max {}): [{}]",
                template,
                list.len(),
                max_reuse,
                sample.join(", ")
            )
        })
        .collect()
}

pub fn check_anchor_placement<'a, I>(cards: I, aliases: &AliasMap, max_start_ratio: f64) -> Vec<String>
where
    I: IntoIterator<Item = &'a Card>,
{
    let mut anchored = 0usize;
    let mut at_start = 0usize;
    for card in cards {
        let story = card.story_text();
        if story.is_empty() {
            continue;
        }
        let forms = anchor_forms_for_story(card.sound_anchor(), aliases);
        if forms.is_empty() || !anchor_integrated_in_story_with_aliases(card.sound_anchor(), &story, aliases) {
            continue;
        }
        anchored += 1;
        if story_starts_with_form(&story, &forms) {
            at_start += 1;
        }
    }
    let ratio = if anchored == 0 {
        0.0
    } else {
        at_start as f64 / anchored as f64
    };
    if ratio <= max_start_ratio {
        return Vec::new();
    }
    vec![format!(
        "Anchor placement diversity regression: {}% of anchored stories start with anchor token (max {}%)",
        pct(ratio),
        pct(max_start_ratio)
    )]
}

pub fn check_shared_anchor_distinctness<'a, I>(cards: I, max_similarity: f64, lexicon: &Lexicon) -> Vec<String>
where
    I: IntoIterator<Item = &'a Card>,
{
    let mut by_anchor: BTreeMap<String, Vec<&Card>> = BTreeMap::new();
    for card in cards {
        if let Some(word) = extract_canonical_anchor_word(card.sound_anchor()) {
            by_anchor.entry(word).or_default().push(card);
        }
    }
    let mut out = Vec::new();
    for (anchor, group) in &by_anchor {
        for (i, a) in group.iter().enumerate() {
            for b in &group[i + 1..] {
                if a.hanzi == b.hanzi {
                    continue;
                }
                let words_a = story_content_words(&a.story_text(), anchor, lexicon);
                let words_b = story_content_words(&b.story_text(), anchor, lexicon);
                let sim = jaccard_similarity(&words_a, &words_b);
                if sim > max_similarity {
                    out.push(format!(
                        "{} and {} share anchor {} and have too-similar stories (Jaccard {:.0}% > {:.0}%)",
                        label(a),
                        label(b),
                        anchor,
                        sim * 100.0,
                        max_similarity * 100.0
                    ));
                }
            }
        }
    }
    out
}

/// Stories that must never appear: placeholder scaffolding left by bulk generation.
pub fn check_no_placeholder_templates<'a, I>(cards: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Card>,
{
    cards
        .into_iter()
        .filter(|c| {
            let story = c.story_text();
            !story.is_empty() && has_boilerplate_phrase(&story)
        })
        .map(|c| format!("{}: story uses banned placeholder template language", label(c)))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorGap {
    pub hanzi: String,
    pub pinyin: String,
    pub anchor_words: Vec<String>,
    pub story: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorValidation {
    pub total: usize,
    pub integrated: usize,
    pub missing: Vec<AnchorGap>,
    pub cue_phrase_leaks: Vec<AnchorGap>,
}

impl AnchorValidation {
    /// Rounded integration percentage; 0 with no anchors.
    pub fn integrated_pct(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((100 * self.integrated) as f64 / self.total as f64).round() as u32
    }
}

/// Integration status of every canonical anchor on the given cards, plus stories that
/// still carry "think of" / "sounds like" phrasing.
pub fn validate_anchor_stories(cards: &[Card], aliases: &AliasMap) -> AnchorValidation {
    let mut out = AnchorValidation::default();
    for card in cards {
        let anchor = card.sound_anchor();
        let anchor_words = extract_canonical_anchor_words(anchor);
        if anchor_words.is_empty() {
            continue;
        }
        out.total += 1;
        let story = card.story_text();
        let gap = || AnchorGap {
            hanzi: card.hanzi.clone(),
            pinyin: card.pinyin.clone(),
            anchor_words: anchor_words.clone(),
            story: story.clone(),
        };
        if anchor_integrated_in_story_with_aliases(anchor, &story, aliases) {
            out.integrated += 1;
        } else {
            out.missing.push(gap());
        }
        if contains_phonetic_cue(&story) {
            out.cue_phrase_leaks.push(gap());
        }
    }
    out
}

pub fn run_suite(deck: &Deck, ctx: &CurationContext<'_>) -> CurationReport {
    let t = ctx.thresholds;
    let hsk1 = deck.hsk1_cards();
    let everything = || deck.vocab.iter().chain(deck.radicals.iter());

    let checks = vec![
        CheckOutcome {
            name: "story_safety",
            failures: check_story_safety(&deck.vocab, ctx),
        },
        CheckOutcome {
            name: "hsk1_mnemonic_data",
            failures: check_mnemonic_data_coverage(hsk1, t.min_hsk1_stories, ctx),
        },
        CheckOutcome {
            name: "hsk1_sound_anchors",
            failures: check_sound_anchor_batch(hsk1, ctx),
        },
        CheckOutcome {
            name: "single_char_anchor_coverage",
            failures: check_single_char_anchor_coverage(hsk1, t.min_single_char_anchor_ratio),
        },
        CheckOutcome {
            name: "non_hsk1_coverage",
            failures: check_non_hsk1_coverage(deck, t.min_non_hsk1_story_ratio, t.min_non_hsk1_anchor_ratio),
        },
        CheckOutcome {
            name: "radical_mnemonic_data",
            failures: check_mnemonic_data_coverage(&deck.radicals, deck.radicals.len(), ctx),
        },
        CheckOutcome {
            name: "radicals_fully_curated",
            failures: check_radicals_fully_curated(&deck.radicals, ctx),
        },
        CheckOutcome {
            name: "no_placeholder_templates",
            failures: check_no_placeholder_templates(everything()),
        },
        CheckOutcome {
            name: "template_diversity",
            failures: check_template_diversity(everything(), ctx.aliases, t.max_template_reuse),
        },
        CheckOutcome {
            name: "anchor_placement",
            failures: check_anchor_placement(everything(), ctx.aliases, t.max_anchor_start_ratio),
        },
        CheckOutcome {
            name: "radical_anchor_placement",
            failures: check_anchor_placement(&deck.radicals, ctx.aliases, t.max_radical_anchor_start_ratio),
        },
        CheckOutcome {
            name: "shared_anchor_distinctness",
            failures: check_shared_anchor_distinctness(everything(), t.max_shared_anchor_similarity, ctx.lexicon),
        },
        CheckOutcome {
            name: "story_word_count",
            failures: check_story_word_count(&deck.vocab, t.max_story_words)
                .into_iter()
                .chain(check_story_word_count(&deck.radicals, t.max_story_words))
                .collect(),
        },
    ];

    for check in &checks {
        debug!(target: "curator::curation", check = check.name, failures = check.failures.len(), "check done");
    }
    let report = CurationReport { checks };
    info!(target: "curator::curation", passed = report.passed(), failures = report.failure_count(), "curation suite finished");
    report
}
