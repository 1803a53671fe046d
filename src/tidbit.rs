// src/tidbit.rs
//! Classical tidbit matching: meaning-token overlap scoring, bounded candidate pools,
//! date-seeded selection and corpus coverage stats.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::deck::Card;
use crate::lexicon::Lexicon;
use crate::normalize::{canonical_token, normalize_english_text};

/// Max candidates kept per card.
pub const MAX_POOL: usize = 6;
/// Candidates within this many points of the top score stay in the pool.
pub const POOL_SCORE_SLACK: u32 = 1;
pub const TIDBIT_URL_PREFIX: &str = "https://ctext.org/";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tidbit {
    #[serde(default)]
    pub quote: String,
    #[serde(default)]
    pub translation: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub relevance: Vec<String>,
}

impl Tidbit {
    /// Quote length in chars, whitespace excluded.
    pub fn quote_len(&self) -> usize {
        self.quote.chars().filter(|c| !c.is_whitespace()).count()
    }
}

pub fn load_tidbits(path: &Path) -> Result<Vec<Tidbit>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading tidbits from {}", path.display()))?;
    serde_json::from_str(&raw)
        .map_err(|e| anyhow!("tidbit corpus parse error: {}", e))
        .with_context(|| format!("loading {}", path.display()))
}

/// Raw meaning tokens: normalized words of length >= 2 minus stopwords and noise.
pub fn raw_meaning_tokens(text: &str, lexicon: &Lexicon) -> HashSet<String> {
    normalize_english_text(text)
        .split(' ')
        .filter(|t| t.len() >= 2)
        .filter(|t| !lexicon.raw_stopwords.contains(*t) && !lexicon.noisy_meaning_tokens.contains(*t))
        .map(str::to_string)
        .collect()
}

/// Canonical meaning tokens: noise and stopwords dropped before canonicalization.
pub fn canonical_meaning_tokens(text: &str, lexicon: &Lexicon) -> HashSet<String> {
    normalize_english_text(text)
        .split(' ')
        .filter(|t| !t.is_empty())
        .filter(|t| !lexicon.noisy_meaning_tokens.contains(*t) && !lexicon.raw_stopwords.contains(*t))
        .map(|t| canonical_token(t, lexicon))
        .filter(|t| t.len() >= 2)
        .collect()
}

fn overlap(a: &HashSet<String>, b: &HashSet<String>) -> u32 {
    a.iter().filter(|t| b.contains(*t)).count() as u32
}

/// Java-style string hash over UTF-16 code units, wrapping at 2^32.
pub fn hash_seed(s: &str) -> u32 {
    s.encode_utf16()
        .fold(0u32, |h, unit| h.wrapping_mul(31).wrapping_add(u32::from(unit)))
}

#[derive(Debug)]
struct TidbitMeta {
    index: usize,
    quote_len: usize,
    tokens: HashSet<String>,
    raw_tokens: HashSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<'a> {
    pub tidbit: &'a Tidbit,
    pub index: usize,
    pub quote_len: usize,
    pub score: u32,
    pub raw_score: u32,
    pub canonical_score: u32,
    pub canonical_specific_score: u32,
}

#[derive(Debug, Clone, Default)]
pub struct CandidatePool<'a> {
    /// Number of eligible tidbits before pooling.
    pub raw_matches: usize,
    /// Top candidates, best first, at most `MAX_POOL`.
    pub candidates: Vec<Candidate<'a>>,
    /// Every eligible tidbit in rank order.
    pub scored: Vec<Candidate<'a>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickOptions {
    /// `YYYY-MM-DD`.
    pub date: String,
    pub salt: i64,
}

impl Default for PickOptions {
    fn default() -> Self {
        Self {
            date: chrono::Utc::now().format("%Y-%m-%d").to_string(),
            salt: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageStats {
    pub covered: usize,
    pub total: usize,
    pub ratio: f64,
    pub worst_raw_matches: usize,
    pub worst_word: String,
    pub primary_share: f64,
    pub matched_words: usize,
}

impl CoverageStats {
    pub fn meets(&self, min_ratio: f64) -> bool {
        self.ratio >= min_ratio
    }
}

pub struct TidbitModel {
    tidbits: Vec<Tidbit>,
    meta: Vec<TidbitMeta>,
    max_quote_chars: usize,
    lexicon: Lexicon,
}

impl TidbitModel {
    pub fn new(tidbits: Vec<Tidbit>, max_quote_chars: usize, lexicon: Lexicon) -> Self {
        let meta = tidbits
            .iter()
            .enumerate()
            .map(|(index, t)| {
                let joined = t.relevance.join(" ");
                TidbitMeta {
                    index,
                    quote_len: t.quote_len(),
                    tokens: canonical_meaning_tokens(&joined, &lexicon),
                    raw_tokens: raw_meaning_tokens(&joined, &lexicon),
                }
            })
            .collect();
        Self {
            tidbits,
            meta,
            max_quote_chars,
            lexicon,
        }
    }

    pub fn tidbits(&self) -> &[Tidbit] {
        &self.tidbits
    }

    pub fn max_quote_chars(&self) -> usize {
        self.max_quote_chars
    }

    pub fn candidates_for_card(&self, card: &Card) -> CandidatePool<'_> {
        let card_tokens = canonical_meaning_tokens(&card.english, &self.lexicon);
        let card_raw = raw_meaning_tokens(&card.english, &self.lexicon);
        if card_tokens.is_empty() && card_raw.is_empty() {
            return CandidatePool::default();
        }

        let mut scored: Vec<Candidate<'_>> = self
            .meta
            .iter()
            .filter(|m| m.quote_len <= self.max_quote_chars)
            .filter_map(|m| {
                let canonical_score = overlap(&card_tokens, &m.tokens);
                let raw_score = overlap(&card_raw, &m.raw_tokens);
                let canonical_specific_score = card_tokens
                    .iter()
                    .filter(|t| !self.lexicon.generic_canonical_tokens.contains(*t))
                    .filter(|t| m.tokens.contains(*t))
                    .count() as u32;
                if raw_score == 0 && canonical_specific_score == 0 {
                    return None;
                }
                Some(Candidate {
                    tidbit: &self.tidbits[m.index],
                    index: m.index,
                    quote_len: m.quote_len,
                    score: raw_score * 3 + canonical_specific_score * 2 + canonical_score,
                    raw_score,
                    canonical_score,
                    canonical_specific_score,
                })
            })
            .collect();

        if scored.is_empty() {
            return CandidatePool::default();
        }
        scored.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.quote_len.cmp(&b.quote_len))
                .then_with(|| a.index.cmp(&b.index))
        });
        let floor = scored[0].score.saturating_sub(POOL_SCORE_SLACK);
        let candidates: Vec<Candidate<'_>> = scored
            .iter()
            .filter(|c| c.score >= floor)
            .take(MAX_POOL)
            .cloned()
            .collect();
        CandidatePool {
            raw_matches: scored.len(),
            candidates,
            scored,
        }
    }

    /// Deterministic pick from the candidate pool for `(hanzi, date, salt)`.
    pub fn pick_tidbit_for_card(&self, card: &Card, opts: &PickOptions) -> Option<&Tidbit> {
        let pool = self.candidates_for_card(card);
        if pool.candidates.is_empty() {
            return None;
        }
        let seed = hash_seed(&format!("{}|{}|{}", card.hanzi, opts.date, opts.salt));
        let idx = seed as usize % pool.candidates.len();
        debug!(target: "curator::tidbit", hanzi = %card.hanzi, seed, idx, pool = pool.candidates.len(), "picked tidbit");
        Some(pool.candidates[idx].tidbit)
    }

    pub fn compute_coverage_stats(&self, vocab: &[Card]) -> CoverageStats {
        let mut covered = 0;
        let mut worst_raw_matches = 0;
        let mut worst_word = String::new();
        let mut primary_count: HashMap<&str, usize> = HashMap::new();

        for card in vocab {
            let pool = self.candidates_for_card(card);
            if pool.raw_matches > worst_raw_matches {
                worst_raw_matches = pool.raw_matches;
                worst_word = card.hanzi.clone();
            }
            if let Some(top) = pool.candidates.first() {
                covered += 1;
                *primary_count.entry(top.tidbit.quote.as_str()).or_insert(0) += 1;
            }
        }

        let total = vocab.len();
        let ratio = if total == 0 { 0.0 } else { covered as f64 / total as f64 };
        let primary_max = primary_count.values().copied().max().unwrap_or(0);
        let primary_share = if covered == 0 {
            0.0
        } else {
            primary_max as f64 / covered as f64
        };

        CoverageStats {
            covered,
            total,
            ratio,
            worst_raw_matches,
            worst_word,
            primary_share,
            matched_words: covered,
        }
    }

    pub fn list_unmatched_words<'c>(&self, vocab: &'c [Card]) -> Vec<&'c Card> {
        vocab
            .iter()
            .filter(|c| self.candidates_for_card(c).candidates.is_empty())
            .collect()
    }
}

/// Corpus problems, one message per issue.
pub fn validate_tidbits(tidbits: &[Tidbit], max_quote_chars: usize) -> Vec<String> {
    let mut problems = Vec::new();
    for (i, t) in tidbits.iter().enumerate() {
        let label = if t.quote.trim().is_empty() {
            format!("tidbit #{}", i)
        } else {
            format!("tidbit #{} ({})", i, t.quote.trim())
        };
        for (field, value) in [
            ("quote", &t.quote),
            ("translation", &t.translation),
            ("source", &t.source),
            ("url", &t.url),
        ] {
            if value.trim().is_empty() {
                problems.push(format!("{}: missing {}", label, field));
            }
        }
        if !t.url.trim().is_empty() && !t.url.trim().starts_with(TIDBIT_URL_PREFIX) {
            problems.push(format!("{}: url must start with {}", label, TIDBIT_URL_PREFIX));
        }
        if t.relevance.iter().all(|r| r.trim().is_empty()) {
            problems.push(format!("{}: relevance list is empty", label));
        }
        if t.quote_len() > max_quote_chars {
            problems.push(format!(
                "{}: quote too long ({} > {} chars)",
                label,
                t.quote_len(),
                max_quote_chars
            ));
        }
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tidbit(quote: &str, relevance: &[&str]) -> Tidbit {
        Tidbit {
            quote: quote.to_string(),
            translation: "t".to_string(),
            source: "s".to_string(),
            url: "https://ctext.org/dao-de-jing".to_string(),
            relevance: relevance.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn model(tidbits: Vec<Tidbit>) -> TidbitModel {
        TidbitModel::new(tidbits, 24, Lexicon::builtin().clone())
    }

    #[test]
    fn hash_matches_known_values() {
        assert_eq!(hash_seed(""), 0);
        assert_eq!(hash_seed("a"), 97);
        assert_eq!(hash_seed("ab"), 97 * 31 + 98);
        // wraps instead of overflowing
        let long = "水".repeat(64);
        let _ = hash_seed(&long);
    }

    #[test]
    fn token_sets_drop_noise() {
        let lex = Lexicon::builtin();
        let raw = raw_meaning_tokens("the possessive particle of water", lex);
        assert_eq!(raw, ["water".to_string()].into_iter().collect());
        let canon = canonical_meaning_tokens("Rains and rivers", lex);
        assert_eq!(canon, ["water".to_string()].into_iter().collect());
    }

    #[test]
    fn scoring_prefers_raw_overlap_then_short_quotes() {
        let m = model(vec![
            tidbit("上善若水", &["water", "goodness"]),
            tidbit("雨", &["rain"]),
            tidbit("知者樂水，仁者樂山", &["water", "mountain"]),
        ]);
        let card = Card::new("水", "shuǐ", "water");
        let pool = m.candidates_for_card(&card);
        assert_eq!(pool.raw_matches, 3);
        let order: Vec<usize> = pool.candidates.iter().map(|c| c.index).collect();
        // raw+canonical (3+2+1) beat canonical-only (2+1); ties broken by length
        assert_eq!(order, vec![0, 2]);
        assert_eq!(pool.candidates[0].score, 6);
        assert_eq!(pool.scored[2].score, 3);
    }

    #[test]
    fn generic_tokens_alone_are_not_eligible() {
        let m = model(vec![tidbit("有朋自遠方來", &["have", "friend"])]);
        let card = Card::new("有", "yǒu", "to have; there is");
        let pool = m.candidates_for_card(&card);
        // "have" is a raw match, so it still qualifies
        assert_eq!(pool.raw_matches, 1);
        let card = Card::new("在", "zài", "exist");
        // canonical "exist" is generic and "exist" != "have" raw
        assert!(m.candidates_for_card(&card).candidates.is_empty());
    }

    #[test]
    fn long_quotes_are_skipped() {
        let long = "一二三四五六七八九十一二三四五六七八九十一二三四五";
        let m = model(vec![tidbit(long, &["water"])]);
        assert!(m.candidates_for_card(&Card::new("水", "", "water")).candidates.is_empty());
    }

    #[test]
    fn pool_is_capped() {
        let tidbits: Vec<Tidbit> = (0..10).map(|i| tidbit(&format!("水{}", i), &["water"])).collect();
        let m = model(tidbits);
        let pool = m.candidates_for_card(&Card::new("水", "", "water"));
        assert_eq!(pool.raw_matches, 10);
        assert_eq!(pool.candidates.len(), MAX_POOL);
    }

    #[test]
    fn pick_is_deterministic_and_salt_sensitive() {
        let tidbits: Vec<Tidbit> = (0..6).map(|i| tidbit(&format!("水{}", i), &["water"])).collect();
        let m = model(tidbits);
        let card = Card::new("水", "", "water");
        let opts = PickOptions {
            date: "2024-03-01".to_string(),
            salt: 0,
        };
        let a = m.pick_tidbit_for_card(&card, &opts).unwrap();
        let b = m.pick_tidbit_for_card(&card, &opts).unwrap();
        assert_eq!(a, b);
        let expected = hash_seed("水|2024-03-01|0") as usize % 6;
        assert_eq!(a.quote, format!("水{}", expected));
        assert!(m.pick_tidbit_for_card(&Card::new("?", "", ""), &opts).is_none());
    }

    #[test]
    fn coverage_stats() {
        let m = model(vec![tidbit("上善若水", &["water"]), tidbit("雨", &["rain"])]);
        let vocab = vec![
            Card::new("水", "", "water"),
            Card::new("雨", "", "rain"),
            Card::new("山", "", "mountain"),
        ];
        let stats = m.compute_coverage_stats(&vocab);
        assert_eq!(stats.covered, 2);
        assert_eq!(stats.total, 3);
        assert!((stats.ratio - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.worst_raw_matches, 2);
        assert_eq!(stats.worst_word, "水");
        assert!((stats.primary_share - 0.5).abs() < 1e-9);
        assert!(!stats.meets(0.8));
        let unmatched = m.list_unmatched_words(&vocab);
        assert_eq!(unmatched.len(), 1);
        assert_eq!(unmatched[0].hanzi, "山");
    }

    #[test]
    fn validation_reports_each_problem() {
        let mut bad = tidbit("", &[]);
        bad.url = "http://example.com".to_string();
        let problems = validate_tidbits(&[tidbit("上善若水", &["water"]), bad], 24);
        assert_eq!(
            problems,
            vec![
                "tidbit #1: missing quote".to_string(),
                "tidbit #1: url must start with https://ctext.org/".to_string(),
                "tidbit #1: relevance list is empty".to_string(),
            ]
        );
    }
}
