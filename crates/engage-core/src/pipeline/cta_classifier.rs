//! Stage 4: classify how promotional the selected response is.
//!
//! Pure rule-based pattern matching — no LLM call. Three ordered tiers
//! (direct > medium > soft), first match wins; no match is level 0 (none).

use crate::model::{Cta, CtaType};
use regex::Regex;
use std::sync::OnceLock;

const DIRECT_PATTERNS: &[&str] = &[
    r"sign\s*up",
    r"get\s*started",
    r"try\s*(it\s*)?free",
    r"click\s*here",
    r"use\s*code",
    r"%\s*off",
    r"discount",
    r"https?://",
    r"www\.",
    r"\.com/",
    r"\[link\]",
    r"register\s*(now|today|here)",
];

const MEDIUM_PATTERNS: &[&str] = &[
    r"i\s*(built|created|made|developed)",
    r"check\s*(out|it out)",
    r"my\s*(app|tool|product|service|team)",
    r"our\s*(app|tool|product|service)",
    r"called\s+\w+",
    r"named\s+\w+",
];

const SOFT_PATTERNS: &[&str] = &[
    r"there\s*are\s*(some\s*)?(apps?|tools?|solutions?)",
    r"(apps?|tools?)\s*(that\s*)?(can|could|might)\s*help",
    r"some\s*people\s*(use|find|try)",
    r"you\s*could\s*try\s*(using|some)",
    r"(journaling|meditation|tracking)\s*(apps?|tools?)",
];

struct CompiledTiers {
    direct: Vec<Regex>,
    medium: Vec<Regex>,
    soft: Vec<Regex>,
}

fn tiers() -> &'static CompiledTiers {
    static TIERS: OnceLock<CompiledTiers> = OnceLock::new();
    TIERS.get_or_init(|| CompiledTiers {
        direct: compile(DIRECT_PATTERNS),
        medium: compile(MEDIUM_PATTERNS),
        soft: compile(SOFT_PATTERNS),
    })
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(&format!("(?i){p}")).expect("static cta pattern"))
        .collect()
}

fn first_match(text: &str, patterns: &[Regex]) -> Option<String> {
    patterns
        .iter()
        .find_map(|re| re.find(text).map(|m| m.as_str().to_string()))
}

/// Classify the CTA level of a generated response.
pub fn run(response_text: &str) -> Cta {
    let text_lower = response_text.to_lowercase();
    let compiled = tiers();

    if first_match(&text_lower, &compiled.direct).is_some() {
        return Cta {
            cta_level: CtaType::Direct.level(),
            cta_type: CtaType::Direct,
        };
    }

    if first_match(&text_lower, &compiled.medium).is_some() {
        return Cta {
            cta_level: CtaType::Medium.level(),
            cta_type: CtaType::Medium,
        };
    }

    if first_match(&text_lower, &compiled.soft).is_some() {
        return Cta {
            cta_level: CtaType::Soft.level(),
            cta_type: CtaType::Soft,
        };
    }

    Cta {
        cta_level: CtaType::None.level(),
        cta_type: CtaType::None,
    }
}
