//! Stage 3: generate three candidate responses and select one for the
//! incoming risk level.
//!
//! One LLM call produces all three variants (value-first, soft-cta,
//! contextual) in a single structured response, then each is lightly
//! adapted for the target platform's tone before selection.

use crate::error::PipelineError;
use crate::llm::{GenerationParams, LlmProvider};
use crate::model::{Platform, Responses, RiskLevel, TenantContext};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

const SYSTEM_PROMPT: &str = "You are a helpful, empathetic voice writing on behalf of a \
product team, replying to a stranger's post online. Generate three response variants: \
value_first_response (pure value, no mention of any product), soft_cta_response (value plus a \
subtle, generic mention that tools/apps exist for this), and contextual_response (a natural, \
conversational reply appropriate to the platform). Respond with a single JSON object containing: \
value_first_response, soft_cta_response, contextual_response, problem_understanding, \
emotional_tone, key_pain_points (array), and response_strategy. Do not include any text outside \
the JSON object.";

#[derive(Debug, Deserialize)]
struct LlmResponseAnalysis {
    value_first_response: String,
    soft_cta_response: String,
    contextual_response: String,
}

fn format_user_prompt(
    text: &str,
    problem_category: &str,
    risk_level: RiskLevel,
    platform: Platform,
    tenant_context: &TenantContext,
) -> String {
    format!(
        "Original post ({platform}):\n{text}\n\nProblem category: {problem_category}\n\
         Risk level: {risk_level}\n\nProduct context:\n- App: {}\n- Value proposition: {}\n\
         - Target audience: {}\n- Key benefits: {}\n- Website: {}\n\n\
         Generate three response variants appropriate for {platform}.",
        tenant_context.app_name,
        tenant_context.value_prop,
        tenant_context.target_audience,
        tenant_context.key_benefits.join(", "),
        tenant_context.website_url,
    )
}

/// Run response generation and select the variant for `risk_level`.
///
/// Falls back to a conservative templated response on LLM failure rather
/// than failing the whole pipeline; the fallback is always the
/// lowest-commitment variant (contextual-only) regardless of risk level.
pub async fn run(
    llm: &dyn LlmProvider,
    text: &str,
    problem_category: &str,
    risk_level: RiskLevel,
    platform: Platform,
    tenant_context: &TenantContext,
) -> Result<Responses, PipelineError> {
    let prompt = format_user_prompt(text, problem_category, risk_level, platform, tenant_context);
    let params = GenerationParams::default();

    let response = match llm.complete(SYSTEM_PROMPT, &prompt, &params).await {
        Ok(r) => r,
        Err(_) => return Ok(fallback_responses(risk_level)),
    };

    let parsed: LlmResponseAnalysis = match serde_json::from_str(&response.text) {
        Ok(p) => p,
        Err(_) => return Ok(fallback_responses(risk_level)),
    };

    let value_first = adapt_tone(&parsed.value_first_response, platform);
    let soft_cta = adapt_tone(&parsed.soft_cta_response, platform);
    let contextual = adapt_tone(&parsed.contextual_response, platform);

    Ok(Responses::select_for_risk(
        risk_level,
        value_first,
        soft_cta,
        contextual,
    ))
}

fn fallback_responses(risk_level: RiskLevel) -> Responses {
    let fallback = "Thanks for sharing this — it sounds like a tough situation. Hope things \
        get easier soon."
        .to_string();
    Responses::select_for_risk(
        risk_level,
        fallback.clone(),
        fallback.clone(),
        fallback,
    )
}

struct PlatformLimits {
    max_len: usize,
}

fn limits_for(platform: Platform) -> PlatformLimits {
    match platform {
        Platform::Twitter => PlatformLimits { max_len: 280 },
        Platform::Reddit => PlatformLimits { max_len: 500 },
        Platform::Quora => PlatformLimits { max_len: 800 },
    }
}

fn corporate_phrase_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        const PHRASES: &[&str] = &[
            "leverage",
            r"synergy",
            r"circle\s*back",
            r"touch\s*base",
            r"move\s*the\s*needle",
            r"at\s*the\s*end\s*of\s*the\s*day",
            r"best\s*in\s*class",
            r"value\s*add",
            r"deep\s*dive",
            r"low\s*hanging\s*fruit",
            r"win[\-\s]win",
            r"scalable\s*solution",
        ];
        PHRASES
            .iter()
            .map(|p| Regex::new(&format!("(?i){p}")).expect("static tone pattern"))
            .collect()
    })
}

/// Lightly reshape a generated response for platform norms: strip
/// corporate jargon everywhere, and truncate at a sentence boundary where
/// the platform has a tighter optimal length (Twitter in particular).
fn adapt_tone(response: &str, platform: Platform) -> String {
    let mut adapted = response.to_string();
    for pattern in corporate_phrase_patterns() {
        adapted = pattern.replace_all(&adapted, "").to_string();
    }
    adapted = adapted.split_whitespace().collect::<Vec<_>>().join(" ");

    let limits = limits_for(platform);
    if adapted.len() > limits.max_len {
        adapted = smart_truncate(&adapted, limits.max_len);
    }
    adapted.trim().to_string()
}

/// Largest byte index `<= index` that lands on a UTF-8 character boundary
/// of `text`. Lets us slice at an arbitrary length limit without panicking
/// on multibyte output (stable equivalent of the nightly-only
/// `str::floor_char_boundary`).
fn floor_char_boundary(text: &str, index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    let mut boundary = index;
    while boundary > 0 && !text.is_char_boundary(boundary) {
        boundary -= 1;
    }
    boundary
}

fn smart_truncate(text: &str, max_length: usize) -> String {
    if text.len() <= max_length {
        return text.to_string();
    }
    let truncated = &text[..floor_char_boundary(text, max_length)];
    let last_boundary = ['.', '?', '!']
        .iter()
        .filter_map(|c| truncated.rfind(*c))
        .max();

    match last_boundary {
        Some(pos) if pos as f64 > max_length as f64 * 0.5 => truncated[..=pos].trim().to_string(),
        _ => match truncated.rfind(' ') {
            Some(pos) if pos as f64 > max_length as f64 * 0.7 => {
                format!("{}...", truncated[..pos].trim())
            }
            _ => format!("{}...", truncated.trim()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::llm::{LlmResponse, TokenUsage};
    use async_trait::async_trait;

    struct FixedLlm(Result<String, ()>);

    #[async_trait]
    impl LlmProvider for FixedLlm {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(
            &self,
            _system: &str,
            _user_message: &str,
            _params: &GenerationParams,
        ) -> Result<LlmResponse, LlmError> {
            match &self.0 {
                Ok(text) => Ok(LlmResponse {
                    text: text.clone(),
                    usage: TokenUsage::default(),
                    model: "fixed".to_string(),
                }),
                Err(()) => Err(LlmError::NotConfigured),
            }
        }

        async fn health_check(&self) -> Result<(), LlmError> {
            Ok(())
        }
    }

    fn tenant() -> TenantContext {
        TenantContext {
            app_name: "BudgetBuddy".to_string(),
            value_prop: "Shared budgeting for couples".to_string(),
            target_audience: "couples".to_string(),
            key_benefits: vec!["shared tracking".to_string()],
            website_url: "https://example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn high_risk_selects_value_first() {
        let llm = FixedLlm(Ok(serde_json::json!({
            "value_first_response": "Try a weekly budget check-in.",
            "soft_cta_response": "Some apps can help track shared expenses.",
            "contextual_response": "That sounds really stressful.",
            "problem_understanding": "money stress",
            "emotional_tone": "anxious",
            "key_pain_points": ["arguments"],
            "response_strategy": "empathize"
        })
        .to_string()));

        let responses = run(
            &llm,
            "text",
            "financial_stress",
            RiskLevel::High,
            Platform::Reddit,
            &tenant(),
        )
        .await
        .unwrap();
        assert_eq!(responses.selected_response, responses.value_first_response);
    }

    #[tokio::test]
    async fn low_risk_selects_contextual() {
        let llm = FixedLlm(Ok(serde_json::json!({
            "value_first_response": "Try a weekly budget check-in.",
            "soft_cta_response": "Some apps can help track shared expenses.",
            "contextual_response": "That sounds really stressful.",
            "problem_understanding": "money stress",
            "emotional_tone": "anxious",
            "key_pain_points": ["arguments"],
            "response_strategy": "empathize"
        })
        .to_string()));

        let responses = run(
            &llm,
            "text",
            "financial_stress",
            RiskLevel::Low,
            Platform::Reddit,
            &tenant(),
        )
        .await
        .unwrap();
        assert_eq!(responses.selected_response, responses.contextual_response);
    }

    #[tokio::test]
    async fn llm_failure_falls_back_without_panicking() {
        let llm = FixedLlm(Err(()));
        let responses = run(
            &llm,
            "text",
            "financial_stress",
            RiskLevel::Medium,
            Platform::Twitter,
            &tenant(),
        )
        .await
        .unwrap();
        assert!(!responses.selected_response.is_empty());
    }

    #[test]
    fn corporate_jargon_is_stripped() {
        let adapted = adapt_tone("Let's leverage this to move the needle.", Platform::Reddit);
        assert!(!adapted.to_lowercase().contains("leverage"));
    }

    #[test]
    fn twitter_responses_are_truncated() {
        let long_text = "This is a sentence. ".repeat(30);
        let adapted = adapt_tone(&long_text, Platform::Twitter);
        assert!(adapted.len() <= 280);
    }

    #[test]
    fn truncation_does_not_panic_on_multibyte_boundary() {
        // Each "é" is 2 bytes, so a naive byte-index slice at an odd offset
        // would land mid-character and panic.
        let long_text = "é".repeat(200);
        let adapted = smart_truncate(&long_text, 281);
        assert!(adapted.len() <= 281 + "...".len());
    }
}
