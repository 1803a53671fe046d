// src/lib.rs
// Public library surface for the CLI and integration tests.

pub mod anchor;
pub mod config;
pub mod curation;
pub mod deck;
pub mod export;
pub mod lexicon;
pub mod logging;
pub mod normalize;
pub mod quality;
pub mod relevance;
pub mod rewrite;
pub mod tidbit;

pub mod cli;

// ---- Re-exports for stable public API ----
pub use crate::anchor::AliasMap;
pub use crate::config::{CuratorConfig, PhoneticConfig};
pub use crate::deck::{Card, Deck, DeckMode};
pub use crate::lexicon::Lexicon;
pub use crate::relevance::RelevanceEngine;
pub use crate::tidbit::{Tidbit, TidbitModel};
