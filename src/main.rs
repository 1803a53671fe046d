// src/main.rs
//! mnemonic-curator binary entrypoint.
//!
//! Loads `.env`, installs tracing, parses the command line and hands off to `cli::run`.

use clap::Parser;
use mnemonic_curator::cli::{self, Cli};
use mnemonic_curator::logging::init_tracing;
use std::process::ExitCode;

fn main() -> ExitCode {
    // CURATOR_CONFIG_PATH / RUST_LOG may come from .env in local runs
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { ExitCode::FAILURE } else { ExitCode::SUCCESS };
            let _ = e.print();
            return code;
        }
    };

    match cli::run(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(target: "curator", error = %e, "command failed");
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
