// src/export.rs
//! JSON exports that feed external story rewriting and review.
//!
//! Rows are camelCase so the rewrite output (`rewrittenStory`, ...) can be produced from
//! them without renaming.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::anchor::{
    anchor_integrated_in_story_with_aliases, extract_canonical_anchor_words, suggest_anchor, AliasMap,
};
use crate::config::PhoneticConfig;
use crate::deck::{Card, Component, Deck};

static RE_CONTEXT_DESCRIPTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)compact component|flank marker|appears in (?:characters|actions|terms|many|words)")
        .expect("context description regex")
});
static RE_MULTI_ANCHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",|and\s+[A-Z]").expect("multi anchor regex"));
static RE_ASCII_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z]+").expect("word regex"));

const QUESTION_WORDS: &[&str] = &["which", "who", "what", "how", "where", "when"];
const TIME_WORDS: &[&str] = &[
    "morning", "afternoon", "noon", "today", "tomorrow", "yesterday", "week", "moment", "time",
];
const DIRECTION_WORDS: &[&str] = &["front", "behind", "below", "under", "above"];

/// Which export to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Anchors,
    Missing,
    Problems,
    All,
}

impl FromStr for ExportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anchors" | "anchor-stories" => Ok(ExportKind::Anchors),
            "missing" | "missing-stories" => Ok(ExportKind::Missing),
            "problems" | "problem-stories" => Ok(ExportKind::Problems),
            "all" | "all-stories" => Ok(ExportKind::All),
            other => Err(format!("unknown export `{}` (anchors|missing|problems|all)", other)),
        }
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExportKind::Anchors => "anchors",
            ExportKind::Missing => "missing",
            ExportKind::Problems => "problems",
            ExportKind::All => "all",
        };
        f.write_str(s)
    }
}

fn optional(text: &str) -> Option<String> {
    let t = text.trim();
    (!t.is_empty()).then(|| t.to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorStoryRow {
    pub hanzi: String,
    pub pinyin: String,
    pub english: String,
    pub sound_anchor: String,
    pub anchor_words: Vec<String>,
    pub current_story: String,
    pub components: Vec<Component>,
    pub anchor_integrated: bool,
}

/// Anchored HSK1 cards. With `needs_rewrite`, only stories that miss their anchor.
pub fn export_anchor_stories(deck: &Deck, aliases: &AliasMap, needs_rewrite: bool) -> Vec<AnchorStoryRow> {
    deck.hsk1_cards()
        .iter()
        .filter_map(|card| {
            let anchor = card.sound_anchor();
            let anchor_words = extract_canonical_anchor_words(anchor);
            if anchor_words.is_empty() {
                return None;
            }
            let story = card.story_text();
            let integrated = anchor_integrated_in_story_with_aliases(anchor, &story, aliases);
            if needs_rewrite && integrated {
                return None;
            }
            Some(AnchorStoryRow {
                hanzi: card.hanzi.clone(),
                pinyin: card.pinyin.clone(),
                english: card.english.clone(),
                sound_anchor: anchor.to_string(),
                anchor_words,
                current_story: story,
                components: card.components().to_vec(),
                anchor_integrated: integrated,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryCategory {
    QuestionOrParticle,
    Time,
    Direction,
    Compound,
    Other,
}

/// Rough writing hint for a card that has no story yet.
pub fn categorize(card: &Card) -> StoryCategory {
    let eng = card.english.to_lowercase();
    let tokens: Vec<&str> = RE_ASCII_WORD.find_iter(&eng).map(|m| m.as_str()).collect();
    let has_any = |list: &[&str]| tokens.iter().any(|t| list.contains(t));

    if has_any(QUESTION_WORDS) || eng.contains("particle") {
        StoryCategory::QuestionOrParticle
    } else if has_any(TIME_WORDS) {
        StoryCategory::Time
    } else if has_any(DIRECTION_WORDS) || eng.contains("in front") || eng.contains("behind") {
        StoryCategory::Direction
    } else if card.hanzi.chars().count() > 1 {
        StoryCategory::Compound
    } else {
        StoryCategory::Other
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingStoryRow {
    pub hanzi: String,
    pub pinyin: String,
    pub english: String,
    pub components: Vec<Component>,
    /// Reference only; legacy text leaks the answer.
    pub legacy_mnemonic: String,
    pub sound_anchor: Option<String>,
    /// Candidate anchor from the syllable table, only for cards without one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_anchor: Option<String>,
    pub category: StoryCategory,
}

pub fn export_missing_stories(deck: &Deck, phonetic: &PhoneticConfig) -> Vec<MissingStoryRow> {
    deck.hsk1_cards()
        .iter()
        .filter(|card| card.story_text().is_empty())
        .map(|card| MissingStoryRow {
            hanzi: card.hanzi.clone(),
            pinyin: card.pinyin.clone(),
            english: card.english.clone(),
            components: card.components().to_vec(),
            legacy_mnemonic: card.mnemonic.as_deref().unwrap_or("").trim().to_string(),
            sound_anchor: optional(card.sound_anchor()),
            suggested_anchor: if card.has_sound_anchor() {
                None
            } else {
                suggest_anchor(&card.pinyin, phonetic)
            },
            category: categorize(card),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    BrokenFragment,
    ContextDescription,
    MultiAnchor,
}

impl IssueType {
    pub fn detail(self) -> &'static str {
        match self {
            IssueType::BrokenFragment => "malformed story text",
            IssueType::ContextDescription => "describes usage context, not imagery",
            IssueType::MultiAnchor => "soundAnchor lists multiple words; simplify to one",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemStoryRow {
    pub hanzi: String,
    pub pinyin: String,
    pub english: String,
    pub components: Vec<Component>,
    pub current_story: String,
    pub sound_anchor: Option<String>,
    pub legacy_mnemonic: Option<String>,
    pub issue_type: IssueType,
    pub issue_detail: &'static str,
}

/// Double spaces, a dangling `! .` ending, or a lowercase opening.
pub fn is_broken_story(story: &str) -> bool {
    if story.is_empty() {
        return false;
    }
    if story.contains("  ") || story.trim().starts_with(|c: char| c.is_ascii_lowercase()) {
        return true;
    }
    // "[!?] +." at the very end
    let Some(rest) = story.strip_suffix('.') else {
        return false;
    };
    let trimmed = rest.trim_end();
    trimmed.len() < rest.len() && trimmed.ends_with(['!', '?'])
}

pub fn is_context_description(story: &str) -> bool {
    RE_CONTEXT_DESCRIPTION.is_match(story)
}

pub fn is_multi_anchor(anchor: &str) -> bool {
    !anchor.is_empty() && RE_MULTI_ANCHOR.is_match(anchor)
}

/// Broken HSK1 fragments, radical context descriptions, HSK1 multi-word anchors. A card
/// is listed once, under its first issue.
pub fn export_problem_stories(deck: &Deck) -> Vec<ProblemStoryRow> {
    let mut rows = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut add = |card: &Card, issue: IssueType, rows: &mut Vec<ProblemStoryRow>| {
        if !seen.insert(card.hanzi.clone()) {
            return;
        }
        rows.push(ProblemStoryRow {
            hanzi: card.hanzi.clone(),
            pinyin: card.pinyin.clone(),
            english: card.english.clone(),
            components: card.components().to_vec(),
            current_story: card.story_text(),
            sound_anchor: optional(card.sound_anchor()),
            legacy_mnemonic: card.mnemonic.as_deref().and_then(optional),
            issue_type: issue,
            issue_detail: issue.detail(),
        });
    };

    let hsk1 = deck.hsk1_cards();
    for card in hsk1 {
        if is_broken_story(&card.story_text()) {
            add(card, IssueType::BrokenFragment, &mut rows);
        }
    }
    for card in &deck.radicals {
        let story = card.story_text();
        if !story.is_empty() && is_context_description(&story) {
            add(card, IssueType::ContextDescription, &mut rows);
        }
    }
    for card in hsk1 {
        if is_multi_anchor(card.sound_anchor()) {
            add(card, IssueType::MultiAnchor, &mut rows);
        }
    }
    rows
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryRow {
    pub deck: &'static str,
    pub hanzi: String,
    pub pinyin: String,
    pub english: String,
    pub sound_anchor: Option<String>,
    pub story: String,
    pub components: Vec<Component>,
}

fn story_row(card: &Card, deck: &'static str) -> StoryRow {
    StoryRow {
        deck,
        hanzi: card.hanzi.clone(),
        pinyin: card.pinyin.clone(),
        english: card.english.clone(),
        sound_anchor: optional(card.sound_anchor()),
        story: card.story_text(),
        components: card.components().to_vec(),
    }
}

/// HSK1 vocab then radicals.
pub fn export_all_stories(deck: &Deck) -> Vec<StoryRow> {
    deck.hsk1_cards()
        .iter()
        .map(|c| story_row(c, "hsk1"))
        .chain(deck.radicals.iter().map(|c| story_row(c, "radicals")))
        .collect()
}
