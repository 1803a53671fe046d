// src/relevance.rs
//! Story relevance scoring: penalty table, meaning-cue expansion, cue regex, ranking.
//!
//! Every card starts at 100; each triggered condition subtracts its penalty and the
//! result is floored at 0. Penalties live in the `[relevance.penalties]` TOML table.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::anchor::{
    anchor_integrated_in_story_with_aliases, extract_canonical_anchor_words, word_forms,
    word_regex, AliasMap,
};
use crate::deck::Card;
use crate::lexicon::Lexicon;
use crate::normalize::{answer_tokens, word_count};
use crate::quality::classifiers::{
    contains_phonetic_cue, contains_pinyin, has_boilerplate_phrase, is_likely_abstract,
    is_likely_component_only, is_likely_incoherent, is_literal_shape_hint,
};

pub const START_SCORE: i64 = 100;

/// Penalty per triggered condition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Penalties {
    pub anchor_not_integrated: u32,
    pub anchored_no_meaning_hit: u32,
    pub unanchored_no_meaning_hit: u32,
    pub anchor_meaning_split: u32,
    pub incoherent: u32,
    #[serde(rename = "abstract")]
    pub abstract_story: u32,
    pub component_only: u32,
    pub boilerplate: u32,
    pub shape_literal: u32,
    pub phonetic_cue: u32,
    pub pinyin_leak: u32,
    pub too_long: u32,
}

impl Default for Penalties {
    fn default() -> Self {
        Self {
            anchor_not_integrated: 35,
            anchored_no_meaning_hit: 25,
            unanchored_no_meaning_hit: 18,
            anchor_meaning_split: 12,
            incoherent: 30,
            abstract_story: 20,
            component_only: 20,
            boilerplate: 20,
            shape_literal: 15,
            phonetic_cue: 15,
            pinyin_leak: 10,
            too_long: 10,
        }
    }
}

/// `[relevance]` config section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RelevanceSection {
    /// Stories longer than this many words are penalized.
    pub max_words: usize,
    pub penalties: Penalties,
}

impl Default for RelevanceSection {
    fn default() -> Self {
        Self {
            max_words: 12,
            penalties: Penalties::default(),
        }
    }
}

/// Result of scoring one card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryRelevance {
    pub score: u32,
    pub reasons: Vec<String>,
    pub meaning_token_hits: usize,
    pub meaning_token_count: usize,
    pub has_anchor: bool,
    pub anchor_integrated: bool,
}

/// One ranked output row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelevanceRow {
    pub hanzi: String,
    pub pinyin: String,
    pub english: String,
    pub sound_anchor: String,
    pub story: String,
    #[serde(flatten)]
    pub relevance: StoryRelevance,
}

/// Row filters applied after scoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RankFilter {
    pub non_empty: bool,
    /// Keep rows scoring at most this much.
    pub max_score: Option<u32>,
}

/// Regex deciding whether a meaning cue occurs in a story, tolerant of simple inflections.
pub fn cue_regex(cue: &str) -> Option<Regex> {
    let cue = cue.trim();
    if cue.is_empty() {
        return None;
    }
    let base = regex::escape(cue);
    let alphabetic = cue.chars().all(|c| c.is_ascii_alphabetic());
    let pattern = if !alphabetic || cue.len() < 3 {
        format!(r"(?i)\b{}\b", base)
    } else if cue.ends_with('e') && cue.len() >= 4 {
        // smile -> smiling, hope -> hoping
        let stem = regex::escape(&cue[..cue.len() - 1]);
        format!(r"(?i)\b(?:{}|{}(?:e|es|ed|ing|ings))\b", base, stem)
    } else {
        format!(r"(?i)\b{}(?:s|es|ed|ing)?\b", base)
    };
    Regex::new(&pattern).ok()
}

pub(crate) fn truncate_vec<T: ToString>(v: &[T], max: usize) -> Vec<String> {
    v.iter().take(max).map(|x| x.to_string()).collect()
}

pub struct RelevanceEngine {
    cfg: RelevanceSection,
    lexicon: Lexicon,
    aliases: AliasMap,
}

impl RelevanceEngine {
    pub fn new(cfg: RelevanceSection, lexicon: Lexicon, aliases: AliasMap) -> Self {
        Self {
            cfg,
            lexicon,
            aliases,
        }
    }

    /// Build from a bare `[relevance]`-shaped TOML document.
    pub fn from_toml_str(toml_str: &str, lexicon: Lexicon, aliases: AliasMap) -> anyhow::Result<Self> {
        let cfg: RelevanceSection = toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("relevance config parse error: {}", e))?;
        Ok(Self::new(cfg, lexicon, aliases))
    }

    pub fn config(&self) -> &RelevanceSection {
        &self.cfg
    }

    /// Answer tokens with their cue expansions, plus phrase cues the gloss contains.
    /// Lowercase, first-seen order, no duplicates.
    pub fn collect_meaning_cues(&self, english: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut push = |cue: &str| {
            let c = cue.to_lowercase();
            if !out.contains(&c) {
                out.push(c);
            }
        };
        for token in answer_tokens(english, &self.lexicon) {
            push(token.as_str());
            for extra in self.lexicon.cues_for(&token) {
                push(extra.as_str());
            }
        }
        let lower = english.to_lowercase();
        for (phrase, cues) in &self.lexicon.phrase_cues {
            if lower.contains(phrase.as_str()) {
                for cue in cues {
                    push(cue.as_str());
                }
            }
        }
        out
    }

    fn cue_hits(cues: &[Regex], text: &str) -> usize {
        cues.iter().filter(|re| re.is_match(text)).count()
    }

    pub fn score_card(&self, card: &Card) -> StoryRelevance {
        let story = card.story_text();
        let anchor = card.sound_anchor();
        let cues = self.collect_meaning_cues(&card.english);
        let has_anchor = !anchor.is_empty();
        let anchor_integrated =
            !has_anchor || anchor_integrated_in_story_with_aliases(anchor, &story, &self.aliases);

        if story.is_empty() {
            return StoryRelevance {
                score: 0,
                reasons: vec!["empty_story".to_string()],
                meaning_token_hits: 0,
                meaning_token_count: cues.len(),
                has_anchor,
                anchor_integrated,
            };
        }

        let cue_res: Vec<Regex> = cues.iter().filter_map(|c| cue_regex(c)).collect();
        let hits = Self::cue_hits(&cue_res, &story);
        let p = &self.cfg.penalties;

        let mut score = START_SCORE;
        let mut reasons: Vec<String> = Vec::new();
        let mut hit = |cond: bool, penalty: u32, reason: &str| {
            if cond {
                score -= i64::from(penalty);
                reasons.push(reason.to_string());
            }
        };

        hit(has_anchor && !anchor_integrated, p.anchor_not_integrated, "anchor_not_integrated");
        hit(
            !cues.is_empty() && has_anchor && hits == 0,
            p.anchored_no_meaning_hit,
            "anchored_no_meaning_hit",
        );
        hit(
            !cues.is_empty() && !has_anchor && hits == 0,
            p.unanchored_no_meaning_hit,
            "unanchored_no_meaning_hit",
        );
        hit(
            has_anchor && anchor_integrated && hits > 0 && self.anchor_meaning_split(anchor, &story, &cue_res),
            p.anchor_meaning_split,
            "anchor_meaning_split",
        );
        hit(is_likely_incoherent(&story), p.incoherent, "incoherent");
        hit(is_likely_abstract(&story), p.abstract_story, "abstract");
        hit(
            is_likely_component_only(&story, has_anchor, &card.english, &self.lexicon),
            p.component_only,
            "component_only",
        );
        hit(has_boilerplate_phrase(&story), p.boilerplate, "boilerplate");
        hit(is_literal_shape_hint(&story), p.shape_literal, "shape_literal");
        hit(contains_phonetic_cue(&story), p.phonetic_cue, "phonetic_cue");
        hit(contains_pinyin(&story, &card.pinyin), p.pinyin_leak, "pinyin_leak");
        hit(word_count(&story) > self.cfg.max_words, p.too_long, "too_long");

        let score = score.max(0) as u32;
        debug!(
            target: "curator::relevance",
            hanzi = %card.hanzi, score,
            reasons = ?truncate_vec(&reasons, 5),
            "scored story"
        );

        StoryRelevance {
            score,
            reasons,
            meaning_token_hits: hits,
            meaning_token_count: cues.len(),
            has_anchor,
            anchor_integrated,
        }
    }

    /// Anchor and meaning cues sit in different `;` clauses.
    fn anchor_meaning_split(&self, anchor: &str, story: &str, cues: &[Regex]) -> bool {
        if !story.contains(';') {
            return false;
        }
        let forms: Vec<Regex> = extract_canonical_anchor_words(anchor)
            .iter()
            .flat_map(|w| word_forms(w, &self.aliases))
            .filter_map(|f| word_regex(&f))
            .collect();
        let clauses: Vec<&str> = story.split(';').map(str::trim).collect();
        let anchor_clause = clauses
            .iter()
            .position(|c| forms.iter().any(|re| re.is_match(c)));
        let meaning_clause = clauses.iter().position(|c| Self::cue_hits(cues, c) > 0);
        matches!((anchor_clause, meaning_clause), (Some(a), Some(m)) if a != m)
    }

    pub fn row(&self, card: &Card) -> RelevanceRow {
        RelevanceRow {
            hanzi: card.hanzi.clone(),
            pinyin: card.pinyin.clone(),
            english: card.english.clone(),
            sound_anchor: card.sound_anchor().to_string(),
            story: card.story_text(),
            relevance: self.score_card(card),
        }
    }

    /// Score, filter, then sort ascending by score with hanzi as tie-break.
    pub fn rank_cards<'a, I>(&self, cards: I, filter: RankFilter) -> Vec<RelevanceRow>
    where
        I: IntoIterator<Item = &'a Card>,
    {
        let mut rows: Vec<RelevanceRow> = cards
            .into_iter()
            .map(|c| self.row(c))
            .filter(|r| !filter.non_empty || !r.story.is_empty())
            .filter(|r| filter.max_score.map_or(true, |max| r.relevance.score <= max))
            .collect();
        rows.sort_by(|a, b| {
            a.relevance
                .score
                .cmp(&b.relevance.score)
                .then_with(|| a.hanzi.cmp(&b.hanzi))
        });
        rows
    }
}
