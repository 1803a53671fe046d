// tests/cli_commands.rs
// Drives `cli::run` against temp fixtures and checks exit codes and written files.

use clap::Parser;
use mnemonic_curator::cli::{run, Cli};
use mnemonic_curator::deck::Deck;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn manifest(rel: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(rel)
}

struct Fixture {
    dir: tempfile::TempDir,
    config: PathBuf,
    deck: PathBuf,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let deck = dir.path().join("deck.json");
    fs::copy(manifest("data/deck-data.json"), &deck).unwrap();
    let config = dir.path().join("curator.toml");
    fs::write(
        &config,
        format!(
            "[paths]\ndeck = {:?}\nphonetic = {:?}\ntidbits = {:?}\n\n[tidbits]\nmin_coverage_ratio = 0.5\n",
            deck.display().to_string(),
            manifest("data/phonetic-config.json").display().to_string(),
            manifest("data/tidbits.json").display().to_string(),
        ),
    )
    .unwrap();
    Fixture { dir, config, deck }
}

fn exec(f: &Fixture, args: &[&str]) -> ExitCode {
    let mut argv = vec!["mnemonic-curator", "--config", f.config.to_str().unwrap()];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).expect("valid arguments");
    run(cli).expect("command runs")
}

fn is_success(code: ExitCode) -> bool {
    format!("{:?}", code) == format!("{:?}", ExitCode::SUCCESS)
}

#[serial_test::serial]
#[test]
fn coverage_gate_exit_code_follows_min_ratio() {
    let f = fixture();
    assert!(is_success(exec(&f, &["tidbit-coverage", "--min-ratio", "0.1"])));
    assert!(!is_success(exec(&f, &["tidbit-coverage", "--min-ratio", "1.0"])));
}

#[serial_test::serial]
#[test]
fn score_writes_ranking_json() {
    let f = fixture();
    let out = f.dir.path().join("work/ranking.json");
    let code = exec(&f, &["score", "--out", out.to_str().unwrap(), "--non-empty", "--limit", "3"]);
    assert!(is_success(code));
    let rows: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    let rows = rows.as_array().expect("array of rows");
    assert!(!rows.is_empty());
    // relevance fields sit at the top level of each row
    for r in rows {
        assert!(r.get("relevance").is_none());
        assert!(r["reasons"].is_array());
        assert!(r["hasAnchor"].is_boolean());
    }
    let scores: Vec<u64> = rows.iter().map(|r| r["score"].as_u64().unwrap()).collect();
    assert!(scores.windows(2).all(|w| w[0] <= w[1]));
    assert!(rows.iter().all(|r| !r["story"].as_str().unwrap().is_empty()));
}

#[serial_test::serial]
#[test]
fn apply_rewrites_writes_to_out_only() {
    let f = fixture();
    let input = f.dir.path().join("rewrites.json");
    fs::write(
        &input,
        r#"[{"hanzi":"朋友","rewrittenStory":"Two pals share one umbrella in the rain."}]"#,
    )
    .unwrap();
    let out = f.dir.path().join("deck.out.json");
    let code = exec(
        &f,
        &["apply-rewrites", "--input", input.to_str().unwrap(), "--out", out.to_str().unwrap()],
    );
    assert!(is_success(code));
    let written = Deck::load(&out).unwrap();
    let card = written.vocab.iter().find(|c| c.hanzi == "朋友").unwrap();
    assert_eq!(card.story_text(), "Two pals share one umbrella in the rain.");
    let untouched = Deck::load(&f.deck).unwrap();
    let card = untouched.vocab.iter().find(|c| c.hanzi == "朋友").unwrap();
    assert_eq!(card.story_text(), "Two friends share one umbrella in the rain.");
}

#[serial_test::serial]
#[test]
fn exports_and_validation_run() {
    let f = fixture();
    let out = f.dir.path().join("missing.json");
    assert!(is_success(exec(&f, &["export", "missing", "--out", out.to_str().unwrap()])));
    let rows: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert!(rows
        .as_array()
        .unwrap()
        .iter()
        .any(|r| r["hanzi"] == "三"));

    assert!(is_success(exec(&f, &["tidbit-validate"])));
    assert!(is_success(exec(&f, &["validate-anchors"])));
    assert!(is_success(exec(&f, &["tidbit-pick", "水", "--date", "2026-02-16"])));
    assert!(is_success(exec(&f, &["hint", "爱", "--profile", "hanzi_prompt"])));
}

#[serial_test::serial]
#[test]
fn unknown_card_is_an_error() {
    let f = fixture();
    let cli = Cli::try_parse_from([
        "mnemonic-curator",
        "--config",
        f.config.to_str().unwrap(),
        "tidbit-pick",
        "龘",
    ])
    .unwrap();
    let err = run(cli).unwrap_err();
    assert!(format!("{:#}", err).contains("龘"));
}
