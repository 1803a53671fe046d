// src/rewrite.rs
//! Applies externally written story rewrites to the deck.
//!
//! A rewrite only lands when the anchor it will be shown with (the new one if given,
//! else the card's current one) is canonical and integrated in the new story.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::anchor::{anchor_integrated_in_story_with_aliases, is_canonical_anchor, AliasMap};
use crate::deck::{Card, Deck, MnemonicData};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteEntry {
    #[serde(default)]
    pub hanzi: Option<String>,
    #[serde(default)]
    pub rewritten_story: Option<String>,
    #[serde(default)]
    pub rewritten_sound_anchor: Option<String>,
}

pub fn load_rewrites(path: &Path) -> Result<Vec<RewriteEntry>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading rewrites from {}", path.display()))?;
    serde_json::from_str(&raw)
        .map_err(|e| anyhow!("rewrite file parse error: {}", e))
        .with_context(|| format!("loading {}", path.display()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoncanonicalAnchor,
    AnchorNotIntegrated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRewrite {
    pub hanzi: String,
    pub pinyin: String,
    pub anchor: String,
    pub story: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedRewrite {
    pub hanzi: String,
    pub story: String,
    pub new_anchor: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteSummary {
    pub dry_run: bool,
    pub applied: Vec<AppliedRewrite>,
    pub skipped: Vec<SkippedRewrite>,
}

struct Pending {
    story: String,
    anchor: Option<String>,
}

/// Usable entries keyed by hanzi; a later entry for the same hanzi wins.
fn pending_map(entries: &[RewriteEntry]) -> HashMap<String, Pending> {
    entries
        .iter()
        .filter_map(|e| {
            let hanzi = e.hanzi.as_deref()?.trim();
            let story = e.rewritten_story.as_deref()?;
            if hanzi.is_empty() {
                return None;
            }
            Some((
                hanzi.to_string(),
                Pending {
                    story: story.trim().to_string(),
                    anchor: e.rewritten_sound_anchor.as_deref().map(|a| a.trim().to_string()),
                },
            ))
        })
        .collect()
}

fn apply_to_cards(
    cards: &mut [Card],
    pending: &HashMap<String, Pending>,
    aliases: &AliasMap,
    summary: &mut RewriteSummary,
) {
    for card in cards.iter_mut() {
        let Some(p) = pending.get(&card.hanzi) else {
            continue;
        };
        let anchor = p
            .anchor
            .as_deref()
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| card.sound_anchor())
            .to_string();

        if !anchor.is_empty() {
            let reason = if !is_canonical_anchor(&anchor) {
                Some(SkipReason::NoncanonicalAnchor)
            } else if !anchor_integrated_in_story_with_aliases(&anchor, &p.story, aliases) {
                Some(SkipReason::AnchorNotIntegrated)
            } else {
                None
            };
            if let Some(reason) = reason {
                warn!(target: "curator::rewrite", hanzi = %card.hanzi, ?reason, "skipping rewrite");
                summary.skipped.push(SkippedRewrite {
                    hanzi: card.hanzi.clone(),
                    pinyin: card.pinyin.clone(),
                    anchor,
                    story: p.story.clone(),
                    reason,
                });
                continue;
            }
        }

        if !summary.dry_run {
            let data = card.mnemonic_data.get_or_insert_with(MnemonicData::default);
            data.story = p.story.clone();
            if let Some(a) = &p.anchor {
                data.sound_anchor = a.clone();
            }
        }
        summary.applied.push(AppliedRewrite {
            hanzi: card.hanzi.clone(),
            story: p.story.clone(),
            new_anchor: p.anchor.clone(),
        });
    }
}

/// Apply to vocab then radicals. With `dry_run` the deck is left untouched and the
/// summary describes what would change.
pub fn apply_rewrites(deck: &mut Deck, entries: &[RewriteEntry], aliases: &AliasMap, dry_run: bool) -> RewriteSummary {
    let pending = pending_map(entries);
    let mut summary = RewriteSummary {
        dry_run,
        ..RewriteSummary::default()
    };
    apply_to_cards(&mut deck.vocab, &pending, aliases, &mut summary);
    apply_to_cards(&mut deck.radicals, &pending, aliases, &mut summary);
    info!(
        target: "curator::rewrite",
        applied = summary.applied.len(),
        skipped = summary.skipped.len(),
        dry_run,
        "rewrites processed"
    );
    summary
}
