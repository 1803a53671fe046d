// src/lexicon.rs
//! Word tables shared by the classifiers, the story relevance scorer and the tidbit matcher.
//!
//! A default lexicon is embedded from `config/lexicon.json`; a custom file with the same
//! shape can be loaded instead (see `config::CuratorConfig::load_lexicon`).

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::normalize::canonical_token_once;

static BUILTIN: Lazy<Lexicon> = Lazy::new(|| {
    let raw = include_str!("../config/lexicon.json");
    Lexicon::from_json_str(raw).expect("valid built-in lexicon")
});

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Lexicon {
    /// Gloss words ignored when extracting answer tokens.
    pub answer_stopwords: HashSet<String>,
    /// Function words dropped from raw meaning-token sets.
    pub raw_stopwords: HashSet<String>,
    /// Grammatical gloss words that never count as a meaning match.
    pub noisy_meaning_tokens: HashSet<String>,
    /// Canonical tokens too broad to justify a tidbit match on their own.
    pub generic_canonical_tokens: HashSet<String>,
    pub token_synonyms: HashMap<String, String>,
    /// Answer token -> story words that count as a meaning hit.
    pub token_cues: HashMap<String, Vec<String>>,
    /// Gloss phrase -> story words that count as a meaning hit.
    pub phrase_cues: BTreeMap<String, Vec<String>>,
    /// Words that may follow a leading anchor without making it dangle.
    pub safe_followers: HashSet<String>,
}

impl Lexicon {
    /// Shared built-in lexicon.
    pub fn builtin() -> &'static Lexicon {
        &BUILTIN
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let parsed: Lexicon =
            serde_json::from_str(raw).map_err(|e| anyhow!("lexicon parse error: {}", e))?;
        let lex = parsed.normalized();
        lex.validate()?;
        Ok(lex)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading lexicon from {}", path.display()))?;
        Self::from_json_str(&raw).with_context(|| format!("loading lexicon {}", path.display()))
    }

    /// Synonym target for `token`, if any.
    pub fn synonym(&self, token: &str) -> Option<&str> {
        self.token_synonyms.get(token).map(String::as_str)
    }

    pub fn cues_for(&self, token: &str) -> &[String] {
        self.token_cues.get(token).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_safe_follower(&self, word: &str) -> bool {
        self.safe_followers.contains(word)
    }

    fn normalized(self) -> Self {
        fn set(items: HashSet<String>) -> HashSet<String> {
            items
                .into_iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        }
        fn list(items: Vec<String>) -> Vec<String> {
            let mut seen = HashSet::new();
            items
                .into_iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty() && seen.insert(s.clone()))
                .collect()
        }

        Self {
            answer_stopwords: set(self.answer_stopwords),
            raw_stopwords: set(self.raw_stopwords),
            noisy_meaning_tokens: set(self.noisy_meaning_tokens),
            generic_canonical_tokens: set(self.generic_canonical_tokens),
            token_synonyms: self
                .token_synonyms
                .into_iter()
                .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_lowercase()))
                .filter(|(k, v)| !k.is_empty() && !v.is_empty())
                .collect(),
            token_cues: self
                .token_cues
                .into_iter()
                .map(|(k, v)| (k.trim().to_lowercase(), list(v)))
                .filter(|(k, _)| !k.is_empty())
                .collect(),
            phrase_cues: self
                .phrase_cues
                .into_iter()
                .map(|(k, v)| (k.trim().to_lowercase(), list(v)))
                .filter(|(k, _)| !k.is_empty())
                .collect(),
            safe_followers: set(self.safe_followers),
        }
    }

    /// Synonym targets must already be canonical: not a key that maps elsewhere and
    /// unchanged by one canonicalization pass.
    fn validate(&self) -> Result<()> {
        for (from, to) in &self.token_synonyms {
            if let Some(next) = self.token_synonyms.get(to) {
                if next != to {
                    return Err(anyhow!(
                        "synonym `{}` -> `{}` chains to `{}`",
                        from,
                        to,
                        next
                    ));
                }
            }
            let settled = canonical_token_once(to, self);
            if &settled != to {
                return Err(anyhow!(
                    "synonym `{}` -> `{}` is not canonical (becomes `{}`)",
                    from,
                    to,
                    settled
                ));
            }
        }
        Ok(())
    }
}
