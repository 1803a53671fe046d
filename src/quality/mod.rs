// src/quality/mod.rs
//! Quality classifier engine: pattern tables, per-story classifiers, profiles and the
//! hint sanitizer, plus the audit report built on top of them.

pub mod classifiers;
pub mod patterns;
pub mod profile;
pub mod sanitize;

pub use classifiers::*;
pub use profile::{resolve_profiles, Check, Profile, ProfileOverride};
pub use sanitize::{build_safe_hint, HintOptions};

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::deck::{CardGroup, CardKind, Deck, DeckMode};
use crate::lexicon::Lexicon;

/// One flagged card in an audit section.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRow {
    pub hanzi: String,
    pub pinyin: String,
    pub english: String,
    pub text: String,
    pub violations: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditSection {
    pub label: String,
    pub rows: Vec<AuditRow>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub sections: Vec<AuditSection>,
    /// `(group label, empty stories, cards)` per selected group.
    pub empty_stories: Vec<(String, usize, usize)>,
}

impl AuditReport {
    pub fn total_violations(&self) -> usize {
        self.sections.iter().map(|s| s.rows.len()).sum()
    }
}

fn audit_group(group: &CardGroup<'_>, profile: &Profile, lexicon: &Lexicon) -> Vec<AuditRow> {
    group
        .cards
        .iter()
        .filter_map(|card| {
            let violations = profile.collect_violations(card, lexicon);
            if violations.is_empty() {
                return None;
            }
            debug!(target: "curator", hanzi = %card.hanzi, profile = %profile.name, ?violations, "audit hit");
            #[cfg(feature = "debug")]
            debug!(target: "curator::patterns", hanzi = %card.hanzi, hits = ?patterns::explain(&card.story_text()), "pattern hits");
            Some(AuditRow {
                hanzi: card.hanzi.clone(),
                pinyin: card.pinyin.clone(),
                english: card.english.clone(),
                text: card.story_text(),
                violations,
            })
        })
        .collect()
}

/// Audit the groups selected by `mode`: vocab groups under both prompt directions,
/// radicals under the radical profile.
pub fn audit_deck(
    deck: &Deck,
    mode: DeckMode,
    profiles: &BTreeMap<String, Profile>,
    lexicon: &Lexicon,
) -> AuditReport {
    let pick = |name: &str| {
        profiles
            .get(name)
            .cloned()
            .or_else(|| Profile::builtin(name))
            .unwrap_or_else(Profile::english_prompt)
    };
    let english = pick(Profile::ENGLISH_PROMPT);
    let hanzi = pick(Profile::HANZI_PROMPT);
    let radical = pick(Profile::RADICAL);

    let mut sections = Vec::new();
    let mut empty_stories = Vec::new();
    for group in deck.groups(mode) {
        let empty = group.cards.iter().filter(|c| c.story_text().is_empty()).count();
        empty_stories.push((group.label.to_string(), empty, group.cards.len()));
        match group.kind {
            CardKind::Vocab => {
                sections.push(AuditSection {
                    label: format!("{} English to Hanzi Hint Profile", group.label),
                    rows: audit_group(&group, &english, lexicon),
                });
                sections.push(AuditSection {
                    label: format!("{} Hanzi to English Hint Profile", group.label),
                    rows: audit_group(&group, &hanzi, lexicon),
                });
            }
            CardKind::Radical => sections.push(AuditSection {
                label: format!("{} Hint Profile", group.label),
                rows: audit_group(&group, &radical, lexicon),
            }),
        }
    }
    AuditReport {
        sections,
        empty_stories,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::Card;

    fn deck() -> Deck {
        Deck {
            hsk1_card_count: 1,
            vocab: vec![
                Card::new("口", "kǒu", "mouth").with_mnemonic("", "A kou shout fills the hall."),
                Card::new("三", "sān", "three").with_mnemonic("", ""),
            ],
            radicals: vec![Card::new("氵", "shuǐ", "water")
                .with_mnemonic("Think of SHOE.", "A SHOE floats on the water.")],
            ..Deck::default()
        }
    }

    #[test]
    fn all_mode_has_three_sections() {
        let report = audit_deck(&deck(), DeckMode::All, &resolve_profiles(&BTreeMap::new()).unwrap(), Lexicon::builtin());
        let labels: Vec<&str> = report.sections.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "All Vocab English to Hanzi Hint Profile",
                "All Vocab Hanzi to English Hint Profile",
                "Radicals Hint Profile",
            ]
        );
        // pinyin only counts for english prompts
        assert_eq!(report.sections[0].rows[0].violations, vec!["pinyin_leak"]);
        assert!(report.sections[1].rows.is_empty());
        // radicals get no anchor exemption: the story still names "water"
        assert_eq!(report.sections[2].rows.len(), 1);
        assert!(report.sections[2].rows[0]
            .violations
            .contains(&"english_answer_leak"));
        assert_eq!(report.total_violations(), 2);
        assert_eq!(report.empty_stories[0], ("All Vocab".to_string(), 1, 2));
    }

    #[test]
    fn hsk1_mode_limits_cards() {
        let report = audit_deck(&deck(), DeckMode::Hsk1, &BTreeMap::new(), Lexicon::builtin());
        assert_eq!(report.sections.len(), 2);
        assert_eq!(report.empty_stories[0].2, 1);
    }

    #[test]
    fn anchored_radical_still_flags_english_leak() {
        let deck = Deck {
            radicals: vec![Card::new("氵", "shuǐ", "water")
                .with_mnemonic("Think of SHOE.", "A SHOE floats on the water.")],
            ..Deck::default()
        };
        let profiles = resolve_profiles(&BTreeMap::new()).unwrap();
        let report = audit_deck(&deck, DeckMode::Radicals, &profiles, Lexicon::builtin());
        assert_eq!(report.sections.len(), 1);
        let rad = &report.sections[0];
        assert_eq!(rad.label, "Radicals Hint Profile");
        assert!(rad.rows.iter().any(|r| r.violations.contains(&"english_answer_leak")));
    }
}
