//! Stage 1: classify the problem a post describes.
//!
//! Single LLM call, strict JSON response. Falls back to a low-confidence
//! "other" signal rather than failing the pipeline outright — an LLM outage
//! should degrade gracefully, not block crawling.

use crate::error::PipelineError;
use crate::llm::{GenerationParams, LlmProvider};
use crate::model::{Platform, Signal, PROBLEM_CATEGORIES};
use serde::Deserialize;

const SYSTEM_PROMPT: &str = "You are a content analyst identifying the core problem or need \
expressed in a social media post. Respond with a single JSON object containing: \
problem_category (string), emotional_intensity (0.0-1.0), keywords (array of strings), \
confidence (0.0-1.0), and reasoning (string). Do not include any text outside the JSON object.";

#[derive(Debug, Deserialize)]
struct LlmAnalysis {
    problem_category: String,
    emotional_intensity: f64,
    #[serde(default)]
    keywords: Vec<String>,
    confidence: f64,
    #[serde(default)]
    #[allow(dead_code)]
    reasoning: String,
}

fn format_user_prompt(text: &str, platform: Platform) -> String {
    format!(
        "Platform: {platform}\n\nPost content:\n{text}\n\n\
         Identify the problem category, emotional intensity, relevant keywords, and your \
         confidence in this analysis."
    )
}

/// Run signal detection for one post.
///
/// Never returns `Err` for LLM/parse failures — those degrade to a
/// low-confidence `"other"` signal so a flaky provider doesn't stall the
/// whole pipeline. Only a programming-level misuse would surface as
/// [`PipelineError::SignalDetection`], which this function does not
/// currently produce.
pub async fn run(
    llm: &dyn LlmProvider,
    text: &str,
    platform: Platform,
) -> Result<Signal, PipelineError> {
    let prompt = format_user_prompt(text, platform);
    let params = GenerationParams::default();

    let response = match llm.complete(SYSTEM_PROMPT, &prompt, &params).await {
        Ok(r) => r,
        Err(_) => return Ok(fallback_signal()),
    };

    let parsed: LlmAnalysis = match serde_json::from_str(&response.text) {
        Ok(p) => p,
        Err(_) => return Ok(fallback_signal()),
    };

    let problem_category = if PROBLEM_CATEGORIES.contains(&parsed.problem_category.as_str()) {
        parsed.problem_category
    } else {
        "other".to_string()
    };

    Ok(Signal {
        problem_category,
        emotional_intensity: parsed.emotional_intensity.clamp(0.0, 1.0),
        keywords: parsed.keywords,
        confidence: parsed.confidence.clamp(0.0, 1.0),
    })
}

fn fallback_signal() -> Signal {
    Signal {
        problem_category: "other".to_string(),
        emotional_intensity: 0.5,
        keywords: Vec::new(),
        confidence: 0.0,
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

    #[tokio::test]
    async fn valid_response_is_parsed() {
        let llm = FixedLlm(Ok(serde_json::json!({
            "problem_category": "workplace_conflict",
            "emotional_intensity": 0.7,
            "keywords": ["manager", "conflict"],
            "confidence": 0.9,
            "reasoning": "workplace tension"
        })
        .to_string()));

        let signal = run(&llm, "my manager keeps undermining me", Platform::Reddit)
            .await
            .unwrap();
        assert_eq!(signal.problem_category, "workplace_conflict");
        assert_eq!(signal.confidence, 0.9);
    }

    #[tokio::test]
    async fn unknown_category_defaults_to_other() {
        let llm = FixedLlm(Ok(serde_json::json!({
            "problem_category": "totally_made_up",
            "emotional_intensity": 0.5,
            "keywords": [],
            "confidence": 0.5,
            "reasoning": ""
        })
        .to_string()));

        let signal = run(&llm, "text", Platform::Twitter).await.unwrap();
        assert_eq!(signal.problem_category, "other");
    }

    #[tokio::test]
    async fn llm_failure_falls_back_gracefully() {
        let llm = FixedLlm(Err(()));
        let signal = run(&llm, "text", Platform::Quora).await.unwrap();
        assert_eq!(signal.problem_category, "other");
        assert_eq!(signal.confidence, 0.0);
    }

    #[tokio::test]
    async fn malformed_json_falls_back_gracefully() {
        let llm = FixedLlm(Ok("not json at all".to_string()));
        let signal = run(&llm, "text", Platform::Reddit).await.unwrap();
        assert_eq!(signal.problem_category, "other");
    }
}
