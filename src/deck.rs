// src/deck.rs
//! Deck data model: cards, structured mnemonic data, selection modes and legacy story text.

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Hanzi that make up a "numbers" card.
pub const CHINESE_NUMERALS: &str = "零一二三四五六七八九十百千万两";

/// Hand-edited decks carry `null`, `false` or numbers where text belongs; read those as text.
fn lenient_string<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::String(s) => s,
        Value::Null | Value::Bool(false) => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "true".to_string(),
        Value::Array(_) | Value::Object(_) => String::new(),
    })
}

/// Any numeric-looking value, floored and clamped at zero; everything else is 0.
fn lenient_count<'de, D: Deserializer<'de>>(de: D) -> Result<usize, D::Error> {
    let n = match Value::deserialize(de)? {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(if n.is_finite() && n > 0.0 { n.floor() as usize } else { 0 })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    #[serde(default)]
    pub hanzi: String,
    #[serde(default)]
    pub meaning: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MnemonicData {
    #[serde(default, deserialize_with = "lenient_string")]
    pub sound_anchor: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub story: String,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    #[serde(default, deserialize_with = "lenient_string")]
    pub hanzi: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub pinyin: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub english: String,
    /// Legacy free-text mnemonic, used only when `mnemonic_data` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mnemonic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mnemonic_data: Option<MnemonicData>,
    /// Fields this tool does not interpret (id, audio, tags...). Written back untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Card {
    pub fn new(hanzi: &str, pinyin: &str, english: &str) -> Self {
        Self {
            hanzi: hanzi.to_string(),
            pinyin: pinyin.to_string(),
            english: english.to_string(),
            ..Self::default()
        }
    }

    /// Builder used heavily by tests and rewrite application.
    pub fn with_mnemonic(mut self, sound_anchor: &str, story: &str) -> Self {
        let data = self.mnemonic_data.get_or_insert_with(MnemonicData::default);
        data.sound_anchor = sound_anchor.trim().to_string();
        data.story = story.trim().to_string();
        self
    }

    /// Trimmed sound anchor; empty when absent.
    pub fn sound_anchor(&self) -> &str {
        self.mnemonic_data
            .as_ref()
            .map(|d| d.sound_anchor.trim())
            .unwrap_or("")
    }

    pub fn has_sound_anchor(&self) -> bool {
        !self.sound_anchor().is_empty()
    }

    /// Story text: structured story when present, else derived from the legacy mnemonic.
    pub fn story_text(&self) -> String {
        match &self.mnemonic_data {
            Some(data) => data.story.trim().to_string(),
            None => legacy_story_text(self.mnemonic.as_deref().unwrap_or("")),
        }
    }

    pub fn components(&self) -> &[Component] {
        self.mnemonic_data
            .as_ref()
            .map(|d| d.components.as_slice())
            .unwrap_or(&[])
    }

    pub fn id(&self) -> Option<String> {
        match self.extra.get("id")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn is_numeral_card(&self) -> bool {
        !self.hanzi.is_empty() && self.hanzi.chars().all(|c| CHINESE_NUMERALS.contains(c))
    }

    pub fn is_single_char(&self) -> bool {
        self.hanzi.chars().count() == 1
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    #[serde(default, deserialize_with = "lenient_count")]
    pub hsk1_card_count: usize,
    #[serde(default)]
    pub vocab: Vec<Card>,
    #[serde(default)]
    pub radicals: Vec<Card>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Deck {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| anyhow!("deck parse error: {}", e))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading deck from {}", path.display()))?;
        Self::from_json_str(&raw).with_context(|| format!("loading deck {}", path.display()))
    }

    /// Pretty JSON with a trailing newline.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        fs::write(path, out).with_context(|| format!("writing deck to {}", path.display()))
    }

    pub fn hsk1_cards(&self) -> &[Card] {
        let n = self.hsk1_card_count.min(self.vocab.len());
        &self.vocab[..n]
    }

    /// Vocab cards past the HSK1 prefix.
    pub fn non_hsk1_cards(&self) -> &[Card] {
        let n = self.hsk1_card_count.min(self.vocab.len());
        &self.vocab[n..]
    }

    pub fn numeral_cards(&self) -> Vec<&Card> {
        self.vocab.iter().filter(|c| c.is_numeral_card()).collect()
    }

    /// Vocab followed by radicals.
    pub fn all_cards(&self) -> impl Iterator<Item = &Card> {
        self.vocab.iter().chain(self.radicals.iter())
    }

    /// Card groups selected by `mode`, in report order.
    pub fn groups(&self, mode: DeckMode) -> Vec<CardGroup<'_>> {
        let vocab = || CardGroup {
            label: "All Vocab",
            kind: CardKind::Vocab,
            cards: self.vocab.iter().collect(),
        };
        let radicals = || CardGroup {
            label: "Radicals",
            kind: CardKind::Radical,
            cards: self.radicals.iter().collect(),
        };
        match mode {
            DeckMode::All => vec![vocab(), radicals()],
            DeckMode::Vocab => vec![vocab()],
            DeckMode::Radicals => vec![radicals()],
            DeckMode::Hsk1 => vec![CardGroup {
                label: "HSK1",
                kind: CardKind::Vocab,
                cards: self.hsk1_cards().iter().collect(),
            }],
            DeckMode::Numbers => vec![CardGroup {
                label: "Numbers",
                kind: CardKind::Vocab,
                cards: self.numeral_cards(),
            }],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardKind {
    Vocab,
    Radical,
}

#[derive(Debug, Clone)]
pub struct CardGroup<'a> {
    pub label: &'static str,
    pub kind: CardKind,
    pub cards: Vec<&'a Card>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeckMode {
    #[default]
    All,
    Vocab,
    Hsk1,
    Radicals,
    Numbers,
}

impl FromStr for DeckMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "vocab" => Ok(Self::Vocab),
            "hsk1" => Ok(Self::Hsk1),
            "radicals" => Ok(Self::Radicals),
            "numbers" => Ok(Self::Numbers),
            other => Err(format!(
                "unknown mode `{}` (expected all|vocab|hsk1|radicals|numbers)",
                other
            )),
        }
    }
}

impl fmt::Display for DeckMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::All => "all",
            Self::Vocab => "vocab",
            Self::Hsk1 => "hsk1",
            Self::Radicals => "radicals",
            Self::Numbers => "numbers",
        };
        f.write_str(s)
    }
}

static RE_CJK_WITH_GLOSS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x{3400}-\x{9fff}]+\s*\([^)]+\)").expect("cjk gloss regex"));
static RE_CJK_GLOSS_CAPTURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([\x{3400}-\x{9fff}]+)\s*\([^)]+\)").expect("cjk capture regex"));
static RE_CJK_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x{3400}-\x{9fff}]+").expect("cjk run regex"));
static RE_PAREN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([^)]*\)").expect("paren regex"));
static RE_PLUS_EQ: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[+＋=＝]\s*").expect("plus/eq regex"));
static RE_DASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[-–—]\s*").expect("dash regex"));
static RE_LEADING_JUNK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^a-zA-Z0-9]+").expect("leading junk regex"));
static RE_SENTENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^.!?]+[.!?]?").expect("sentence regex"));

/// Story text recovered from a legacy free-text mnemonic such as
/// `"口 (mouth) + 人 (person). A person opens a mouth."`.
pub fn legacy_story_text(mnemonic: &str) -> String {
    let trimmed = mnemonic.trim();
    let mut text = trimmed.to_string();

    // Drop a leading "component (meaning)" breakdown sentence.
    if let Some((idx, ch)) = text.char_indices().find(|(_, c)| matches!(c, '。' | '.' | '!' | '?')) {
        let head_end = idx + ch.len_utf8();
        if RE_CJK_WITH_GLOSS.is_match(&text[..head_end]) {
            text = text[head_end..].trim().to_string();
        }
    }

    if text.is_empty() {
        let keep_hanzi = RE_CJK_GLOSS_CAPTURE.replace_all(trimmed, "$1");
        let spaced = RE_PLUS_EQ.replace_all(&keep_hanzi, " ");
        text = crate::normalize::collapse_whitespace(&spaced);
    }

    let text = RE_CJK_RUN.replace_all(&text, " ");
    let text = RE_PAREN.replace_all(&text, " ");
    let text = RE_PLUS_EQ.replace_all(&text, " ");
    let text = RE_DASH.replace_all(&text, " — ");
    let text = RE_LEADING_JUNK.replace(&text, "");
    let text = crate::normalize::collapse_whitespace(&text);

    let sentences: Vec<&str> = RE_SENTENCE
        .find_iter(&text)
        .map(|m| m.as_str().trim())
        .collect();
    if sentences.len() > 2 {
        return sentences[..2].join(" ").trim().to_string();
    }
    text
}
