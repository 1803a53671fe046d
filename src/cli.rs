// src/cli.rs
//! Command-line drivers. Each subcommand loads what it needs, calls into the library and
//! prints a human-readable summary; JSON goes to stdout or `--out`.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::config::{CuratorConfig, PhoneticConfig};
use crate::curation::{run_suite, validate_anchor_stories, CurationContext};
use crate::deck::{Card, Deck, DeckMode};
use crate::export::{
    export_all_stories, export_anchor_stories, export_missing_stories, export_problem_stories, ExportKind,
};
use crate::quality::{audit_deck, build_safe_hint, resolve_profiles, HintOptions, Profile};
use crate::relevance::{RankFilter, RelevanceEngine};
use crate::rewrite::{apply_rewrites, load_rewrites};
use crate::tidbit::{load_tidbits, validate_tidbits, PickOptions, TidbitModel};

pub const DEFAULT_RANKING_OUT: &str = "work/story-relevance-ranking.json";

#[derive(Parser, Debug)]
#[command(name = "mnemonic-curator")]
#[command(about = "Quality checks and tidbit matching for a Mandarin mnemonic deck", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Curator TOML config (overrides CURATOR_CONFIG_PATH)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Deck JSON (overrides paths.deck)
    #[arg(long, global = true)]
    pub deck: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run hint-profile classifiers over the deck.
    Audit {
        /// all | vocab | hsk1 | radicals | numbers
        #[arg(long, default_value = "all")]
        mode: DeckMode,
        #[arg(long)]
        fail_on_violations: bool,
    },

    /// Print the story of a card with leaking text stripped for a prompt profile.
    Hint {
        hanzi: String,
        /// english_prompt | hanzi_prompt | radical, or a profile from the config
        #[arg(long, default_value = Profile::ENGLISH_PROMPT)]
        profile: String,
    },

    /// Score story relevance and write a ranking, lowest first.
    Score {
        #[arg(long, default_value = DEFAULT_RANKING_OUT)]
        out: PathBuf,
        /// Drop cards without a story
        #[arg(long)]
        non_empty: bool,
        /// Keep rows scoring at or below N
        #[arg(long)]
        min_score: Option<u32>,
        /// Rows to print
        #[arg(long, default_value_t = 30)]
        limit: usize,
    },

    /// Check that HSK1 anchors show up in their stories.
    ValidateAnchors {
        #[arg(long)]
        fail_on_missing: bool,
    },

    /// Run the deck-wide curation regression suite.
    CurationTest,

    /// Share of vocab cards with at least one tidbit candidate.
    TidbitCoverage {
        /// Defaults to tidbits.min_coverage_ratio
        #[arg(long)]
        min_ratio: Option<f64>,
    },

    /// Pick the tidbit of the day for a card.
    TidbitPick {
        hanzi: String,
        /// YYYY-MM-DD, defaults to today (UTC)
        #[arg(long)]
        date: Option<String>,
        #[arg(long, default_value_t = 0)]
        salt: i64,
    },

    /// List vocab cards without any tidbit candidate.
    TidbitUnmatched,

    /// Validate the tidbit corpus.
    TidbitValidate,

    /// Apply story rewrites from a JSON file.
    ApplyRewrites {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        dry_run: bool,
        /// Where to write the deck (defaults to the input deck)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Export rows for rewriting or review: anchors | missing | problems | all
    Export {
        kind: ExportKind,
        /// anchors only: keep stories that miss their anchor
        #[arg(long)]
        needs_rewrite: bool,
        /// Write JSON here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn load_config(cli: &Cli) -> Result<CuratorConfig> {
    match &cli.config {
        Some(path) => {
            let mut cfg = CuratorConfig::from_path(path)?;
            cfg.apply_env_overrides();
            Ok(cfg)
        }
        None => CuratorConfig::load(),
    }
}

fn deck_path(cli: &Cli, cfg: &CuratorConfig) -> PathBuf {
    cli.deck.clone().unwrap_or_else(|| cfg.paths.deck.clone())
}

fn write_json<T: Serialize + ?Sized>(value: &T, out: Option<&Path>) -> Result<()> {
    let mut body = serde_json::to_string_pretty(value)?;
    body.push('\n');
    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            fs::write(path, body).with_context(|| format!("writing {}", path.display()))
        }
        None => {
            print!("{}", body);
            Ok(())
        }
    }
}

fn exit_if(failed: bool) -> ExitCode {
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn find_card<'a>(deck: &'a Deck, hanzi: &str) -> Option<&'a Card> {
    deck.all_cards().find(|c| c.hanzi == hanzi)
}

pub fn run(cli: Cli) -> Result<ExitCode> {
    let cfg = load_config(&cli)?;
    let deck_path = deck_path(&cli, &cfg);
    let lexicon = cfg.load_lexicon()?;
    info!(target: "curator", command = ?cli.command, deck = %deck_path.display(), "starting");

    match &cli.command {
        Command::Audit {
            mode,
            fail_on_violations,
        } => {
            let deck = Deck::load(&deck_path)?;
            let profiles = resolve_profiles(&cfg.profiles)?;
            let report = audit_deck(&deck, *mode, &profiles, &lexicon);
            for (label, empty, total) in &report.empty_stories {
                println!("{} cards with empty story (intentional skip): {}/{}", label, empty, total);
            }
            for section in &report.sections {
                println!("\n## {}", section.label);
                if section.rows.is_empty() {
                    println!("No violations.");
                    continue;
                }
                for row in &section.rows {
                    println!(
                        "- {} ({}) [{}] -> {} :: {}",
                        row.hanzi,
                        row.pinyin,
                        row.english,
                        row.violations.join(", "),
                        row.text
                    );
                }
            }
            let total = report.total_violations();
            println!("\nTotal cards with violations: {}", total);
            Ok(exit_if(*fail_on_violations && total > 0))
        }

        Command::Hint { hanzi, profile } => {
            let deck = Deck::load(&deck_path)?;
            let card = find_card(&deck, hanzi).ok_or_else(|| anyhow!("no card with hanzi {}", hanzi))?;
            let profiles = resolve_profiles(&cfg.profiles)?;
            let profile = profiles
                .get(profile)
                .ok_or_else(|| anyhow!("unknown profile `{}`", profile))?;
            let hint = build_safe_hint(card, HintOptions::for_profile(profile), &lexicon);
            if hint.is_empty() {
                println!("(no safe hint)");
            } else {
                println!("{}", hint);
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Score {
            out,
            non_empty,
            min_score,
            limit,
        } => {
            let deck = Deck::load(&deck_path)?;
            let phonetic = PhoneticConfig::load(&cfg.paths.phonetic)?;
            let engine = RelevanceEngine::new(cfg.relevance.clone(), lexicon, phonetic.alias_map());
            let filter = RankFilter {
                non_empty: *non_empty,
                max_score: *min_score,
            };
            let rows = engine.rank_cards(deck.all_cards(), filter);
            write_json(&rows, Some(out.as_path()))?;
            println!("Wrote {} scored rows to {}", rows.len(), out.display());
            println!("Lowest {} rows:", (*limit).min(rows.len()));
            for row in rows.iter().take(*limit) {
                let reasons = if row.relevance.reasons.is_empty() {
                    "ok".to_string()
                } else {
                    row.relevance.reasons.join(",")
                };
                let story = if row.story.is_empty() { "(empty)" } else { row.story.as_str() };
                println!("{}\t{}\t{}\t[{}]\t{}", row.relevance.score, row.hanzi, row.english, reasons, story);
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::ValidateAnchors { fail_on_missing } => {
            let deck = Deck::load(&deck_path)?;
            let phonetic = PhoneticConfig::load(&cfg.paths.phonetic)?;
            let v = validate_anchor_stories(deck.hsk1_cards(), &phonetic.alias_map());
            println!("Cards with sound anchors:   {}", v.total);
            println!("Anchor integrated in story: {} / {} ({}%)", v.integrated, v.total, v.integrated_pct());
            println!("Not yet integrated:         {}", v.missing.len());
            println!("Forbidden cue phrases:      {}", v.cue_phrase_leaks.len());
            if !v.missing.is_empty() {
                println!("\nNeeds integration:");
                for gap in &v.missing {
                    println!("  {} ({}) [{}] \"{}\"", gap.hanzi, gap.pinyin, gap.anchor_words.join(", "), gap.story);
                }
            }
            if !v.cue_phrase_leaks.is_empty() {
                println!("\nForbidden phonetic cue phrase in story:");
                for gap in &v.cue_phrase_leaks {
                    println!("  {} ({}) \"{}\"", gap.hanzi, gap.pinyin, gap.story);
                }
            }
            Ok(exit_if(*fail_on_missing && !v.missing.is_empty()))
        }

        Command::CurationTest => {
            let deck = Deck::load(&deck_path)?;
            let phonetic = PhoneticConfig::load(&cfg.paths.phonetic)?;
            let aliases = phonetic.alias_map();
            let allowed = phonetic.allowed_anchor_words();
            let ctx = CurationContext {
                lexicon: &lexicon,
                aliases: &aliases,
                allowed_anchor_words: &allowed,
                thresholds: &cfg.curation,
            };
            let report = run_suite(&deck, &ctx);
            for check in report.checks.iter().filter(|c| !c.passed()) {
                eprintln!("\n## {} ({} failures)", check.name, check.failures.len());
                for failure in &check.failures {
                    eprintln!("- {}", failure);
                }
            }
            if report.passed() {
                println!("mnemonic curation test passed");
            } else {
                println!("mnemonic curation test failed: {} failures", report.failure_count());
            }
            Ok(exit_if(!report.passed()))
        }

        Command::TidbitCoverage { min_ratio } => {
            let deck = Deck::load(&deck_path)?;
            let model = TidbitModel::new(load_tidbits(&cfg.paths.tidbits)?, cfg.tidbits.max_quote_chars, lexicon);
            let stats = model.compute_coverage_stats(&deck.vocab);
            let min_ratio = min_ratio.unwrap_or(cfg.tidbits.min_coverage_ratio);
            println!(
                "tidbit coverage: {}/{} ({:.1}%)",
                stats.covered,
                stats.total,
                stats.ratio * 100.0
            );
            println!("minimum threshold: {:.1}%", min_ratio * 100.0);
            println!(
                "worst raw matches: {} ({}), primary share: {:.1}%",
                stats.worst_raw_matches,
                stats.worst_word,
                stats.primary_share * 100.0
            );
            if !stats.meets(min_ratio) {
                eprintln!("coverage below threshold");
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::TidbitPick { hanzi, date, salt } => {
            let deck = Deck::load(&deck_path)?;
            let card = find_card(&deck, hanzi).ok_or_else(|| anyhow!("no card with hanzi {}", hanzi))?;
            let model = TidbitModel::new(load_tidbits(&cfg.paths.tidbits)?, cfg.tidbits.max_quote_chars, lexicon);
            let mut opts = PickOptions {
                salt: *salt,
                ..PickOptions::default()
            };
            if let Some(d) = date {
                opts.date = d.clone();
            }
            match model.pick_tidbit_for_card(card, &opts) {
                Some(tidbit) => {
                    write_json(tidbit, None)?;
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    eprintln!("no tidbit candidates for {} ({})", card.hanzi, card.english);
                    Ok(ExitCode::FAILURE)
                }
            }
        }

        Command::TidbitUnmatched => {
            let deck = Deck::load(&deck_path)?;
            let model = TidbitModel::new(load_tidbits(&cfg.paths.tidbits)?, cfg.tidbits.max_quote_chars, lexicon);
            let unmatched = model.list_unmatched_words(&deck.vocab);
            println!("unmatched words: {}/{}", unmatched.len(), deck.vocab.len());
            for card in unmatched {
                println!("{}: {}", card.hanzi, card.english);
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::TidbitValidate => {
            let tidbits = load_tidbits(&cfg.paths.tidbits)?;
            let problems = validate_tidbits(&tidbits, cfg.tidbits.max_quote_chars);
            for p in &problems {
                eprintln!("- {}", p);
            }
            println!("tidbits checked: {}, problems: {}", tidbits.len(), problems.len());
            Ok(exit_if(!problems.is_empty()))
        }

        Command::ApplyRewrites { input, dry_run, out } => {
            let mut deck = Deck::load(&deck_path)?;
            let phonetic = PhoneticConfig::load(&cfg.paths.phonetic)?;
            let entries = load_rewrites(input)?;
            let summary = apply_rewrites(&mut deck, &entries, &phonetic.alias_map(), *dry_run);
            for skip in &summary.skipped {
                eprintln!(
                    "SKIP {} ({}): {:?} anchor [{}] story: \"{}\"",
                    skip.hanzi, skip.pinyin, skip.reason, skip.anchor, skip.story
                );
            }
            if *dry_run {
                for a in &summary.applied {
                    let note = a
                        .new_anchor
                        .as_ref()
                        .map(|n| format!(" [anchor -> \"{}\"]", n))
                        .unwrap_or_default();
                    println!("[dry-run] {}{} -> \"{}\"", a.hanzi, note, a.story);
                }
            } else {
                let target = out.clone().unwrap_or_else(|| deck_path.clone());
                deck.save(&target)?;
                println!("Wrote deck to {}", target.display());
            }
            println!("Applied: {}, skipped: {}", summary.applied.len(), summary.skipped.len());
            Ok(ExitCode::SUCCESS)
        }

        Command::Export {
            kind,
            needs_rewrite,
            out,
        } => {
            let deck = Deck::load(&deck_path)?;
            let out = out.as_deref();
            let count = match kind {
                ExportKind::Anchors => {
                    let phonetic = PhoneticConfig::load(&cfg.paths.phonetic)?;
                    let rows = export_anchor_stories(&deck, &phonetic.alias_map(), *needs_rewrite);
                    write_json(&rows, out)?;
                    rows.len()
                }
                ExportKind::Missing => {
                    let phonetic = PhoneticConfig::load(&cfg.paths.phonetic)?;
                    let rows = export_missing_stories(&deck, &phonetic);
                    write_json(&rows, out)?;
                    rows.len()
                }
                ExportKind::Problems => {
                    let rows = export_problem_stories(&deck);
                    write_json(&rows, out)?;
                    rows.len()
                }
                ExportKind::All => {
                    let rows = export_all_stories(&deck);
                    write_json(&rows, out)?;
                    rows.len()
                }
            };
            eprintln!("Exported {} {} rows.", count, kind);
            Ok(ExitCode::SUCCESS)
        }
    }
}
