// src/quality/profile.rs
//! Hint profiles: which checks apply to a card for a given prompt direction.

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use super::classifiers::*;
use crate::anchor::{is_single_word_anchor, story_text_excluding_anchor};
use crate::deck::Card;
use crate::lexicon::Lexicon;

/// TOML override table: check name -> enabled.
pub type ProfileOverride = BTreeMap<String, bool>;

/// Checks in violation-report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    EnglishAnswer,
    Pinyin,
    PhoneticCue,
    LiteralShape,
    Boilerplate,
    Incoherent,
    Abstract,
    ComponentOnly,
    MetaTemplate,
    AnchorIsolated,
    NoncanonicalAnchor,
}

impl Check {
    pub const ALL: [Check; 11] = [
        Check::EnglishAnswer,
        Check::Pinyin,
        Check::PhoneticCue,
        Check::LiteralShape,
        Check::Boilerplate,
        Check::Incoherent,
        Check::Abstract,
        Check::ComponentOnly,
        Check::MetaTemplate,
        Check::AnchorIsolated,
        Check::NoncanonicalAnchor,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Check::EnglishAnswer => "english_answer",
            Check::Pinyin => "pinyin",
            Check::PhoneticCue => "phonetic_cue",
            Check::LiteralShape => "literal_shape",
            Check::Boilerplate => "boilerplate",
            Check::Incoherent => "incoherent",
            Check::Abstract => "abstract",
            Check::ComponentOnly => "component_only",
            Check::MetaTemplate => "meta_template",
            Check::AnchorIsolated => "anchor_isolated",
            Check::NoncanonicalAnchor => "noncanonical_anchor",
        }
    }

    pub fn from_name(name: &str) -> Option<Check> {
        Check::ALL.into_iter().find(|c| c.name() == name.trim())
    }

    pub fn violation_code(self) -> &'static str {
        match self {
            Check::EnglishAnswer => "english_answer_leak",
            Check::Pinyin => "pinyin_leak",
            Check::PhoneticCue => "explicit_phonetic_cue",
            Check::LiteralShape => "literal_shape_description",
            Check::Boilerplate => "boilerplate_phrase",
            Check::Incoherent => "likely_incoherent_story",
            Check::Abstract => "likely_abstract_story",
            Check::ComponentOnly => "likely_component_only_story",
            Check::MetaTemplate => "meta_template_story",
            Check::AnchorIsolated => "anchor_grammatically_isolated",
            Check::NoncanonicalAnchor => "multi_or_noncanonical_sound_anchor",
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    enabled: BTreeMap<Check, bool>,
    /// Whether a sound anchor on the card waives the English-leak check.
    anchor_exempts: bool,
}

impl Profile {
    pub const ENGLISH_PROMPT: &'static str = "english_prompt";
    pub const HANZI_PROMPT: &'static str = "hanzi_prompt";
    pub const RADICAL: &'static str = "radical";

    fn all_on(name: &str) -> Self {
        Self {
            name: name.to_string(),
            enabled: Check::ALL.into_iter().map(|c| (c, true)).collect(),
            anchor_exempts: true,
        }
    }

    /// English -> Hanzi: the learner must not see any part of the answer.
    pub fn english_prompt() -> Self {
        Self::all_on(Self::ENGLISH_PROMPT)
    }

    /// Hanzi -> English: pinyin and shape talk are fair game.
    pub fn hanzi_prompt() -> Self {
        Self::all_on(Self::HANZI_PROMPT)
            .with(Check::Pinyin, false)
            .with(Check::LiteralShape, false)
    }

    /// Radicals are judged as if unanchored.
    pub fn radical() -> Self {
        let mut p = Self::hanzi_prompt();
        p.name = Self::RADICAL.to_string();
        p.anchor_exempts = false;
        p
    }

    pub fn anchor_exempts(&self) -> bool {
        self.anchor_exempts
    }

    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            Self::ENGLISH_PROMPT => Some(Self::english_prompt()),
            Self::HANZI_PROMPT => Some(Self::hanzi_prompt()),
            Self::RADICAL => Some(Self::radical()),
            _ => None,
        }
    }

    pub fn with(mut self, check: Check, on: bool) -> Self {
        self.enabled.insert(check, on);
        self
    }

    pub fn enabled(&self, check: Check) -> bool {
        self.enabled.get(&check).copied().unwrap_or(false)
    }

    /// Apply a TOML override table; unknown check names are an error.
    pub fn apply_override(mut self, table: &ProfileOverride) -> Result<Self> {
        for (key, on) in table {
            let check = Check::from_name(key)
                .ok_or_else(|| anyhow!("profile `{}`: unknown check `{}`", self.name, key))?;
            self.enabled.insert(check, *on);
        }
        Ok(self)
    }

    /// Violation codes for a card, in `Check::ALL` order. Empty stories yield nothing.
    pub fn collect_violations(&self, card: &Card, lexicon: &Lexicon) -> Vec<&'static str> {
        let story = card.story_text();
        if story.is_empty() {
            return Vec::new();
        }
        let anchor = card.sound_anchor();
        let has_anchor = !anchor.is_empty();
        let exempt = self.anchor_exempts && has_anchor;

        Check::ALL
            .into_iter()
            .filter(|c| self.enabled(*c))
            .filter(|c| match c {
                Check::EnglishAnswer => {
                    !exempt && contains_english_answer(&story, &card.english, lexicon)
                }
                Check::Pinyin => {
                    contains_pinyin(&story_text_excluding_anchor(&story, anchor), &card.pinyin)
                }
                Check::PhoneticCue => contains_phonetic_cue(&story),
                Check::LiteralShape => is_literal_shape_hint(&story),
                Check::Boilerplate => has_boilerplate_phrase(&story),
                Check::Incoherent => is_likely_incoherent(&story),
                Check::Abstract => is_likely_abstract(&story),
                Check::ComponentOnly => {
                    is_likely_component_only(&story, exempt, &card.english, lexicon)
                }
                Check::MetaTemplate => is_meta_template_story(&story),
                Check::AnchorIsolated => {
                    has_anchor && is_anchor_grammatically_isolated(anchor, &story, lexicon)
                }
                Check::NoncanonicalAnchor => has_anchor && !is_single_word_anchor(anchor),
            })
            .map(Check::violation_code)
            .collect()
    }
}

/// Built-in profiles with config overrides applied. Overrides naming an unknown profile
/// start from an all-enabled profile.
pub fn resolve_profiles(overrides: &BTreeMap<String, ProfileOverride>) -> Result<BTreeMap<String, Profile>> {
    let mut out: BTreeMap<String, Profile> = [
        Profile::english_prompt(),
        Profile::hanzi_prompt(),
        Profile::radical(),
    ]
    .into_iter()
    .map(|p| (p.name.clone(), p))
    .collect();

    for (name, table) in overrides {
        let base = out
            .remove(name)
            .unwrap_or_else(|| Profile::all_on(name));
        out.insert(name.clone(), base.apply_override(table)?);
    }
    Ok(out)
}
