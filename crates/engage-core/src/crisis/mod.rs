//! Pattern-based crisis detection: the first gate in risk scoring (§4.2).
//!
//! Runs before any LLM call. Dangerous content (self-harm, violence,
//! mental-health crisis language) is caught by compiled regex rather than
//! waiting on a round trip, so the pipeline can block engagement in
//! microseconds instead of seconds.

use regex::Regex;
use std::sync::OnceLock;

/// One compiled detection pattern within a crisis category.
struct CrisisPattern {
    regex: Regex,
    category: &'static str,
    severity: f64,
    description: &'static str,
}

/// Result of scanning text for crisis indicators.
#[derive(Debug, Clone, PartialEq)]
pub struct CrisisDetection {
    pub is_crisis: bool,
    pub matched_patterns: Vec<String>,
    pub crisis_category: Option<String>,
    pub confidence: f64,
}

impl CrisisDetection {
    fn safe() -> Self {
        Self {
            is_crisis: false,
            matched_patterns: Vec::new(),
            crisis_category: None,
            confidence: 0.0,
        }
    }
}

const SELF_HARM_PATTERNS: &[(&str, &str, f64)] = &[
    (r"\b(kill\s*(my)?self)\b", "explicit self-harm intent", 1.0),
    (r"\b(end\s*(it\s*)?all)\b", "suicidal ideation phrase", 0.95),
    (r"\b(suicide|suicidal)\b", "suicide keyword", 0.9),
    (r"\b(want\s*to\s*die)\b", "death wish expression", 0.95),
    (r"\b(better\s*off\s*dead)\b", "suicidal ideation", 0.95),
    (r"\b(take\s*my\s*(own\s*)?life)\b", "explicit self-harm intent", 1.0),
    (r"\b(slit\s*(my\s*)?(wrist|throat)s?)\b", "self-harm method", 1.0),
    (r"\b(overdose|od)\b.*\b(myself|me)\b", "self-harm method", 0.9),
    (r"\b(hang\s*(my)?self)\b", "self-harm method", 1.0),
    (
        r"\b(jump\s*(off|from))\b.*\b(bridge|building|roof)\b",
        "self-harm method",
        0.9,
    ),
    (r"\b(no\s*reason\s*to\s*live)\b", "suicidal ideation", 0.9),
    (r"\b(cut\s*(my)?self)\b", "self-harm behavior", 0.85),
    (r"\b(self[- ]?harm)\b", "self-harm keyword", 0.85),
    (
        r"\b(don'?t\s*want\s*to\s*be\s*(here|alive))\b",
        "suicidal ideation",
        0.9,
    ),
];

const VIOLENCE_PATTERNS: &[(&str, &str, f64)] = &[
    (
        r"\b(kill\s*(him|her|them|you|someone|people))\b",
        "violent threat",
        0.95,
    ),
    (
        r"\b(hurt\s*(someone|people|them|him|her))\b",
        "violent intent",
        0.85,
    ),
    (
        r"\b(revenge)\b.*\b(kill|hurt|attack|shoot|stab)\b",
        "revenge violence",
        0.95,
    ),
    (
        r"\b(shoot\s*(up|them|people|everyone))\b",
        "mass violence threat",
        1.0,
    ),
    (
        r"\b(bomb|bombing)\b.*\b(place|school|building|people)\b",
        "terrorism threat",
        1.0,
    ),
    (r"\b(murder|murderous)\b", "murder reference", 0.8),
    (r"\b(attack\s*(people|them|someone))\b", "violent intent", 0.85),
    (r"\b(stab\s*(someone|them|him|her))\b", "violent threat", 0.95),
    (
        r"\b(beat\s*(up|them|him|her)\s*(badly|to\s*death)?)\b",
        "violent intent",
        0.85,
    ),
    (
        r"\b(make\s*(them|him|her)\s*pay)\b.*\b(hurt|suffer|die)\b",
        "revenge violence",
        0.9,
    ),
    (r"\b(bring\s*a\s*(gun|weapon|knife))\b", "weapon threat", 0.95),
];

const MENTAL_HEALTH_CRISIS_PATTERNS: &[(&str, &str, f64)] = &[
    (r"\b(can'?t\s*go\s*on)\b", "crisis expression", 0.8),
    (r"\b(no\s*point)\b.*\b(living|life|anymore)\b", "hopelessness", 0.9),
    (
        r"\b(give\s*up)\b.*\b(life|everything|living)\b",
        "giving up on life",
        0.85,
    ),
    (
        r"\b(everyone\s*(would\s*be|is)\s*better\s*off\s*without\s*me)\b",
        "suicidal ideation",
        0.95,
    ),
    (r"\b(goodbye)\b.*\b(forever|final|last)\b", "final goodbye", 0.85),
    (
        r"\b(this\s*is\s*(my\s*)?(goodbye|the\s*end))\b",
        "farewell message",
        0.9,
    ),
    (
        r"\b(can'?t\s*take\s*(it|this)\s*(anymore|any\s*more))\b",
        "crisis expression",
        0.75,
    ),
    (r"\b(nothing\s*matters\s*anymore)\b", "hopelessness", 0.8),
    (r"\b(no\s*way\s*out)\b", "hopelessness", 0.85),
    (r"\b(lost\s*all\s*hope)\b", "hopelessness", 0.85),
    (
        r"\b(voices\s*(tell|telling)\s*me)\b.*\b(hurt|kill|die)\b",
        "psychiatric crisis",
        0.95,
    ),
];

fn compiled_patterns() -> &'static Vec<CrisisPattern> {
    static PATTERNS: OnceLock<Vec<CrisisPattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let groups: &[(&[(&str, &str, f64)], &str)] = &[
            (SELF_HARM_PATTERNS, "self_harm"),
            (VIOLENCE_PATTERNS, "violence"),
            (MENTAL_HEALTH_CRISIS_PATTERNS, "mental_health_crisis"),
        ];
        let mut patterns = Vec::new();
        for (list, category) in groups {
            for (pattern, description, severity) in *list {
                patterns.push(CrisisPattern {
                    regex: Regex::new(&format!("(?i){pattern}")).expect("static crisis pattern"),
                    category,
                    severity: *severity,
                    description,
                });
            }
        }
        patterns
    })
}

/// Fold leetspeak substitutions and collapse single-letter, whitespace
/// separated runs (`k i l l` -> `kill`) so obfuscated crisis text still
/// matches the plain-word patterns above.
fn normalize(text: &str) -> String {
    let mut normalized = text.to_lowercase();
    const LEET: &[(char, char)] = &[
        ('0', 'o'),
        ('1', 'i'),
        ('3', 'e'),
        ('4', 'a'),
        ('5', 's'),
        ('7', 't'),
        ('@', 'a'),
        ('$', 's'),
    ];
    for (from, to) in LEET {
        normalized = normalized.replace(*from, &to.to_string());
    }

    let mut cleaned_words: Vec<String> = Vec::new();
    let mut run = String::new();
    for word in normalized.split_whitespace() {
        let is_single_letter = word.chars().count() == 1 && word.chars().all(|c| c.is_alphabetic());
        if is_single_letter {
            run.push_str(word);
        } else {
            if !run.is_empty() {
                cleaned_words.push(std::mem::take(&mut run));
            }
            cleaned_words.push(word.to_string());
        }
    }
    if !run.is_empty() {
        cleaned_words.push(run);
    }
    cleaned_words.join(" ")
}

/// Scan `text` for crisis indicators. Safe to call on every post; this is
/// the constant-time gate that must run before any LLM risk-scoring call.
pub fn detect(text: &str) -> CrisisDetection {
    if text.trim().is_empty() {
        return CrisisDetection::safe();
    }

    let normalized = normalize(text);
    let mut matched_patterns = Vec::new();
    let mut categories_found: std::collections::HashMap<&'static str, f64> =
        std::collections::HashMap::new();

    for pattern in compiled_patterns() {
        if pattern.regex.is_match(&normalized) {
            matched_patterns.push(format!("{}: {}", pattern.category, pattern.description));
            let entry = categories_found.entry(pattern.category).or_insert(0.0);
            if pattern.severity > *entry {
                *entry = pattern.severity;
            }
        }
    }

    if matched_patterns.is_empty() {
        return CrisisDetection::safe();
    }

    let (primary_category, confidence) = categories_found
        .iter()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(category, severity)| (category.to_string(), *severity))
        .expect("at least one category present when matched_patterns is non-empty");

    CrisisDetection {
        is_crisis: true,
        matched_patterns,
        crisis_category: Some(primary_category),
        confidence,
    }
}

/// Quick boolean check, for callers that only need a gate decision.
pub fn is_safe(text: &str) -> bool {
    !detect(text).is_crisis
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn benign_text_is_safe() {
        let result = detect("I feel happy today!");
        assert!(!result.is_crisis);
        assert!(result.crisis_category.is_none());
    }

    #[test]
    fn explicit_self_harm_is_detected() {
        let result = detect("I want to end it all");
        assert!(result.is_crisis);
        assert_eq!(result.crisis_category.as_deref(), Some("self_harm"));
        assert!(result.confidence >= 0.9);
    }

    #[test]
    fn violence_threat_is_detected() {
        let result = detect("I'm going to shoot up the building");
        assert!(result.is_crisis);
        assert_eq!(result.crisis_category.as_deref(), Some("violence"));
    }

    #[test]
    fn mental_health_crisis_phrase_is_detected() {
        let result = detect("I've lost all hope and nothing matters anymore");
        assert!(result.is_crisis);
        assert_eq!(
            result.crisis_category.as_deref(),
            Some("mental_health_crisis")
        );
    }

    #[test]
    fn empty_text_is_safe() {
        assert!(!detect("").is_crisis);
        assert!(!detect("   ").is_crisis);
    }

    #[test]
    fn leetspeak_obfuscation_still_matches() {
        let result = detect("i want to s u i c i d e myself");
        assert!(result.is_crisis);
    }

    #[test]
    fn spaced_out_letters_collapse_before_matching() {
        let result = detect("i will k i l l myself tonight");
        assert!(result.is_crisis);
        assert_eq!(result.crisis_category.as_deref(), Some("self_harm"));
    }

    #[test]
    fn is_safe_matches_detect() {
        assert!(is_safe("staying organized is hard"));
        assert!(!is_safe("i want to die"));
    }

    #[test]
    fn highest_severity_category_wins_when_multiple_match() {
        let result = detect("i can't go on, i want to kill myself");
        assert!(result.is_crisis);
        assert_eq!(result.crisis_category.as_deref(), Some("self_harm"));
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn matched_patterns_list_is_non_empty_when_crisis() {
        let result = detect("better off dead");
        assert!(!result.matched_patterns.is_empty());
    }
}
