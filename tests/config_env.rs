// tests/config_env.rs
// Config resolution: env path, then config/curator.toml, then defaults; env overrides last.

use mnemonic_curator::config::{CuratorConfig, ENV_CURATOR_CONFIG_PATH, ENV_MAX_QUOTE_CHARS};
use std::{env, fs};

#[serial_test::serial]
#[test]
fn load_uses_env_then_fallbacks() {
    // isolate CWD so the repo's config/ is not picked up
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    env::remove_var(ENV_CURATOR_CONFIG_PATH);
    env::remove_var(ENV_MAX_QUOTE_CHARS);

    // 1) nothing on disk -> defaults
    let cfg = CuratorConfig::load().unwrap();
    assert_eq!(cfg.tidbits.max_quote_chars, 24);

    // 2) ./config/curator.toml
    fs::create_dir_all(tmp.path().join("config")).unwrap();
    fs::write(
        tmp.path().join("config/curator.toml"),
        "[tidbits]\nmax_quote_chars = 18\nmin_coverage_ratio = 0.8\n",
    )
    .unwrap();
    let cfg = CuratorConfig::load().unwrap();
    assert_eq!(cfg.tidbits.max_quote_chars, 18);
    assert!((cfg.tidbits.min_coverage_ratio - 0.8).abs() < 1e-9);

    // 3) env path wins
    let p_env = tmp.path().join("other.toml");
    fs::write(&p_env, "[tidbits]\nmax_quote_chars = 30\n").unwrap();
    env::set_var(ENV_CURATOR_CONFIG_PATH, p_env.display().to_string());
    let cfg = CuratorConfig::load().unwrap();
    assert_eq!(cfg.tidbits.max_quote_chars, 30);

    // 4) a dangling env path is an error, not a silent fallback
    env::set_var(ENV_CURATOR_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
    assert!(CuratorConfig::load().is_err());

    env::remove_var(ENV_CURATOR_CONFIG_PATH);
    env::set_current_dir(&old).unwrap();
}

#[serial_test::serial]
#[test]
fn max_quote_chars_env_override() {
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    env::remove_var(ENV_CURATOR_CONFIG_PATH);

    env::set_var(ENV_MAX_QUOTE_CHARS, "12");
    assert_eq!(CuratorConfig::load().unwrap().tidbits.max_quote_chars, 12);

    env::set_var(ENV_MAX_QUOTE_CHARS, "0");
    assert_eq!(CuratorConfig::load().unwrap().tidbits.max_quote_chars, 1);

    env::set_var(ENV_MAX_QUOTE_CHARS, "lots");
    assert_eq!(CuratorConfig::load().unwrap().tidbits.max_quote_chars, 24);

    env::remove_var(ENV_MAX_QUOTE_CHARS);
    env::set_current_dir(&old).unwrap();
}

#[test]
fn bundled_config_parses() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("config/curator.toml");
    let cfg = CuratorConfig::from_path(&path).unwrap();
    assert_eq!(cfg.relevance.penalties.abstract_story, 20);
    assert_eq!(cfg.curation.max_template_reuse, 8);
    assert_eq!(cfg.profiles["hanzi_prompt"]["pinyin"], false);
}
