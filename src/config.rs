// src/config.rs
//! Runtime configuration: `config/curator.toml` plus the phonetic config JSON.
//!
//! Resolution order for the TOML file:
//! 1) `$CURATOR_CONFIG_PATH` (must exist)
//! 2) `config/curator.toml`
//! 3) built-in defaults

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::anchor::{normalize_alias_map, AliasMap};
use crate::curation::CurationThresholds;
use crate::lexicon::Lexicon;
use crate::quality::profile::ProfileOverride;
use crate::relevance::RelevanceSection;

pub const DEFAULT_CURATOR_CONFIG_PATH: &str = "config/curator.toml";
pub const ENV_CURATOR_CONFIG_PATH: &str = "CURATOR_CONFIG_PATH";
pub const ENV_MAX_QUOTE_CHARS: &str = "CURATOR_MAX_QUOTE_CHARS";

pub const DEFAULT_MAX_QUOTE_CHARS: usize = 24;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub deck: PathBuf,
    pub phonetic: PathBuf,
    pub tidbits: PathBuf,
    /// Optional replacement for the embedded lexicon.
    pub lexicon: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            deck: PathBuf::from("data/deck-data.json"),
            phonetic: PathBuf::from("data/phonetic-config.json"),
            tidbits: PathBuf::from("data/tidbits.json"),
            lexicon: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TidbitSection {
    pub max_quote_chars: usize,
    pub min_coverage_ratio: f64,
}

impl Default for TidbitSection {
    fn default() -> Self {
        Self {
            max_quote_chars: DEFAULT_MAX_QUOTE_CHARS,
            min_coverage_ratio: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CuratorConfig {
    pub paths: PathsConfig,
    pub tidbits: TidbitSection,
    pub relevance: RelevanceSection,
    pub curation: CurationThresholds,
    /// Per-profile check toggles, keyed by profile name.
    pub profiles: BTreeMap<String, ProfileOverride>,
}

// parse optional positive integer env; 0 is clamped up to 1
fn parse_max_quote_env(raw: Option<String>) -> Option<usize> {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
        .map(|v| v.max(1))
}

impl CuratorConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut cfg: CuratorConfig =
            toml::from_str(raw).map_err(|e| anyhow!("curator config parse error: {}", e))?;
        cfg.tidbits.max_quote_chars = cfg.tidbits.max_quote_chars.max(1);
        Ok(cfg)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading curator config from {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("loading {}", path.display()))
    }

    /// Load using env var + fallbacks, then apply env overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CURATOR_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!(
                    "{} points to non-existent path {}",
                    ENV_CURATOR_CONFIG_PATH,
                    pb.display()
                ));
            }
            Self::from_path(&pb)?
        } else {
            let default = PathBuf::from(DEFAULT_CURATOR_CONFIG_PATH);
            if default.exists() {
                Self::from_path(&default)?
            } else {
                debug!(target: "curator", "no {} found, using defaults", DEFAULT_CURATOR_CONFIG_PATH);
                Self::default()
            }
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn apply_env_overrides(&mut self) {
        let raw = std::env::var(ENV_MAX_QUOTE_CHARS).ok();
        if let Some(v) = parse_max_quote_env(raw.clone()) {
            self.tidbits.max_quote_chars = v;
        } else if let Some(bad) = raw {
            warn!(target: "curator", value = %bad, "ignoring invalid {}", ENV_MAX_QUOTE_CHARS);
        }
    }

    /// Built-in lexicon unless `paths.lexicon` names a file.
    pub fn load_lexicon(&self) -> Result<Lexicon> {
        match &self.paths.lexicon {
            Some(p) => Lexicon::from_path(p),
            None => Ok(Lexicon::builtin().clone()),
        }
    }
}

/// `data/phonetic-config.json`: anchor allow-list, aliases and syllable candidates.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhoneticConfig {
    pub english_sound_anchor_words: Vec<String>,
    pub phonetic_anchor_aliases: HashMap<String, Vec<String>>,
    /// ASCII pinyin syllable -> suggested anchor word.
    pub phonetic_anchor_candidates: HashMap<String, String>,
}

impl PhoneticConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| anyhow!("phonetic config parse error: {}", e))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading phonetic config from {}", path.display()))?;
        Self::from_json_str(&raw).with_context(|| format!("loading {}", path.display()))
    }

    /// Upper-cased allow-list.
    pub fn allowed_anchor_words(&self) -> HashSet<String> {
        self.english_sound_anchor_words
            .iter()
            .map(|w| w.trim().to_uppercase())
            .filter(|w| !w.is_empty())
            .collect()
    }

    pub fn alias_map(&self) -> AliasMap {
        normalize_alias_map(&self.phonetic_anchor_aliases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg = CuratorConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.tidbits.max_quote_chars, DEFAULT_MAX_QUOTE_CHARS);
        assert_eq!(cfg.paths.deck, PathBuf::from("data/deck-data.json"));
        assert_eq!(cfg.relevance.max_words, 12);
        assert_eq!(cfg.curation.max_story_words, 12);
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn sections_override_defaults() {
        let raw = r#"
            [paths]
            deck = "fixtures/deck.json"

            [tidbits]
            max_quote_chars = 0

            [relevance.penalties]
            too_long = 4

            [profiles.hanzi_prompt]
            literal_shape = true
        "#;
        let cfg = CuratorConfig::from_toml_str(raw).unwrap();
        assert_eq!(cfg.paths.deck, PathBuf::from("fixtures/deck.json"));
        assert_eq!(cfg.paths.tidbits, PathBuf::from("data/tidbits.json"));
        assert_eq!(cfg.tidbits.max_quote_chars, 1);
        assert_eq!(cfg.relevance.penalties.too_long, 4);
        assert_eq!(cfg.relevance.penalties.incoherent, 30);
        assert_eq!(cfg.profiles["hanzi_prompt"].get("literal_shape"), Some(&true));
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let err = CuratorConfig::from_toml_str("[tidbits\nmax_quote_chars = 3").unwrap_err();
        assert!(err.to_string().contains("parse error"));
    }

    #[test]
    fn max_quote_env_parsing() {
        assert_eq!(parse_max_quote_env(Some(" 30 ".into())), Some(30));
        assert_eq!(parse_max_quote_env(Some("0".into())), Some(1));
        assert_eq!(parse_max_quote_env(Some("lots".into())), None);
        assert_eq!(parse_max_quote_env(None), None);
    }

    #[test]
    fn phonetic_config_helpers() {
        let cfg = PhoneticConfig::from_json_str(
            r#"{"englishSoundAnchorWords": ["jet", " Bee ", ""],
                "phoneticAnchorAliases": {"wei": ["Way"]}}"#,
        )
        .unwrap();
        let allowed = cfg.allowed_anchor_words();
        assert!(allowed.contains("JET") && allowed.contains("BEE"));
        assert_eq!(allowed.len(), 2);
        assert_eq!(cfg.alias_map()["WEI"], vec!["way".to_string()]);
    }
}
