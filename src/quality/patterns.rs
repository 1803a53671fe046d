// src/quality/patterns.rs
//! Compiled pattern tables for the story classifiers.
//!
//! Each table is a list of `(id, pattern)` pairs so a hit can be reported by name in
//! debug logs. All patterns are case-insensitive.

use once_cell::sync::Lazy;
use regex::Regex;

/// A named, compiled pattern list.
pub struct PatternSet {
    name: &'static str,
    patterns: Vec<(&'static str, Regex)>,
}

impl PatternSet {
    fn compile(name: &'static str, raw: &[(&'static str, &'static str)]) -> Self {
        let patterns = raw
            .iter()
            .map(|(id, pat)| {
                let re = Regex::new(&format!("(?i){}", pat))
                    .unwrap_or_else(|e| panic!("{} pattern `{}` regex error: {}", name, id, e));
                (*id, re)
            })
            .collect();
        Self { name, patterns }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.patterns.iter().any(|(_, re)| re.is_match(text))
    }

    /// Id of the first pattern that matches, in table order.
    pub fn first_match(&self, text: &str) -> Option<&'static str> {
        self.patterns
            .iter()
            .find(|(_, re)| re.is_match(text))
            .map(|(id, _)| *id)
    }
}

pub static LITERAL_SHAPE: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::compile(
        "literal_shape",
        &[
            ("looks_like", r"\blooks like\b"),
            ("shape", r"\bshape\b"),
            ("stroke", r"\bstrokes?\b"),
            ("line", r"\blines?\b"),
            ("box", r"\bbox(?:es)?\b"),
            ("rectangle", r"\brectangle\b"),
            ("cross", r"\bcross\b"),
            ("hook", r"\bhook\b"),
            ("vertical", r"\bvertical\b"),
            ("horizontal", r"\bhorizontal\b"),
        ],
    )
});

pub static BOILERPLATE: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::compile(
        "boilerplate",
        &[
            ("flash_into_scene", r"\bflash(?:es)?\s+into\s+the\s+scene\b"),
            ("forms_near_gate", r"\bforms near the old gate\b"),
            (
                "lantern_smoke",
                r"\blantern smoke curls above stones beside a quiet gate\b",
            ),
            ("meets_near_gate", r"\bmeets\b.*\bnear the old gate\b"),
        ],
    )
});

pub static ABSTRACT: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::compile(
        "abstract",
        &[
            ("concept_of", r"\bconcept of\b"),
            ("idea_of", r"\bidea of\b"),
            ("essence_of", r"\bessence of\b"),
            ("energy_of", r"\benergy of\b"),
            ("state_of", r"\bstate of\b"),
            ("notion_of", r"\bnotion of\b"),
            ("symbolizes", r"\bsymboli[sz]es?\b"),
            ("represents", r"\brepresents?\b"),
            ("definition_of", r"\bdefinition of\b"),
        ],
    )
});

pub static COMPONENT_META: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::compile(
        "component_meta",
        &[
            ("component", r"\bcomponents?\b"),
            ("radical", r"\bradicals?\b"),
            ("semantic", r"\bsemantic\b"),
            ("phonetic", r"\bphonetic\b"),
            ("used_in_compounds", r"\bused in compounds\b"),
            ("appears_in", r"\bappears in (?:characters|words|terms)\b"),
            ("left_side", r"\bleft side\b"),
            ("right_side", r"\bright side\b"),
            ("top", r"\btop\b"),
            ("bottom", r"\bbottom\b"),
        ],
    )
});

pub static META_TEMPLATE: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::compile(
        "meta_template",
        &[
            ("i_recall", r"\bI recall\b"),
            ("i_remember", r"\bI remember\b"),
            ("the_cue", r"\bthe cue\b"),
            ("comes_to_mind", r"\bcomes? to mind\b"),
            ("reminds_me", r"\breminds? me\b"),
            ("to_remember", r"\bto remember\b"),
            ("mnemonic", r"\bmnemonics?\b"),
            ("memory_hook", r"\bmemory hooks?\b"),
            ("this_character", r"\bthis character\b"),
            ("the_anchor", r"\bthe anchor\b"),
        ],
    )
});

pub static PHONETIC_CUE: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::compile(
        "phonetic_cue",
        &[
            ("sounds_like", r"\bsounds?\s+like\b"),
            ("think_of", r"\bthink of\b"),
        ],
    )
});

/// `(table, pattern id)` for the first hit in every classifier table.
pub fn explain(text: &str) -> Vec<(&'static str, &'static str)> {
    [
        &*LITERAL_SHAPE,
        &*BOILERPLATE,
        &*ABSTRACT,
        &*COMPONENT_META,
        &*META_TEMPLATE,
        &*PHONETIC_CUE,
    ]
    .into_iter()
    .filter_map(|set| set.first_match(text).map(|id| (set.name(), id)))
    .collect()
}

/// Verbs that make a story a scene rather than a description of parts.
pub static CONCRETE_SCENE_VERBS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:walk|run|step|call|ask|open|close|hold|carry|move|stand|sit|eat|drink|kick|push|pull|lean|point|shout|speak|arrive|cross|raise|duck|hide|wait|glide|pack|gather|confess|settle|remain|head|roll|roam|jump|leap|write|read|watch|look|find|search|check|rest|sleep|swim|dance|buy|sell)\w*\b",
    )
    .expect("scene verb regex")
});
