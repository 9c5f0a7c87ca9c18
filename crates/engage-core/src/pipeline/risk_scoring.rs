//! Stage 2: assess how risky it is to engage with a post.
//!
//! Two-stage gate: the pattern-based [`crate::crisis`] detector runs first
//! and can short-circuit straight to `Blocked` without ever calling an LLM.
//! Only non-crisis text reaches the LLM-based nuanced assessment, and even
//! that falls back to a heuristic score if the LLM call fails.

use crate::crisis;
use crate::error::PipelineError;
use crate::llm::{GenerationParams, LlmProvider};
use crate::model::{Risk, RiskLevel};
use serde::Deserialize;

const SYSTEM_PROMPT: &str = "You are a risk assessment analyst for an automated social media \
engagement system. Evaluate whether it is safe and appropriate to engage with this post. \
Respond with a single JSON object containing: risk_score (0.0-1.0), risk_factors (array of \
strings), context_flags (array of strings), sentiment (string), and engagement_recommendation \
(string). Do not include any text outside the JSON object.";

#[derive(Debug, Deserialize)]
struct LlmRiskAnalysis {
    risk_score: f64,
    #[serde(default)]
    risk_factors: Vec<String>,
    #[serde(default)]
    context_flags: Vec<String>,
    #[serde(default)]
    #[allow(dead_code)]
    sentiment: String,
    #[serde(default)]
    engagement_recommendation: String,
}

/// Heuristic fallback weight added on top of emotional intensity for a
/// fixed subset of [`crate::model::PROBLEM_CATEGORIES`] that plausibly
/// carry elevated risk. Categories outside this subset contribute zero.
/// See DESIGN.md Open Question 1: the full ~22-category vocabulary has no
/// obvious universal risk weighting, so only the categories with a clear
/// crisis-adjacent reading are weighted here.
fn heuristic_category_weight(problem_category: &str) -> f64 {
    match problem_category {
        "mental_health_depression" => 0.2,
        "mental_health_anxiety" => 0.15,
        "mental_health_stress" => 0.1,
        "family_conflict" => 0.15,
        "financial_stress" => 0.15,
        _ => 0.0,
    }
}

fn risk_level_for_score(score: f64) -> RiskLevel {
    if score >= 0.7 {
        RiskLevel::High
    } else if score >= 0.3 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

fn recommended_action(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Blocked => {
            "DO NOT ENGAGE. Crisis content detected. Route to crisis intervention protocol."
        }
        RiskLevel::High => "Requires manual review before any engagement. Escalate to senior moderator.",
        RiskLevel::Medium => "Queue for review. Consider tone adjustment before engagement.",
        RiskLevel::Low => "Safe for automated engagement with standard brand voice.",
    }
}

fn format_user_prompt(
    text: &str,
    emotional_intensity: f64,
    problem_category: &str,
    keywords: &[String],
) -> String {
    let keywords_str = if keywords.is_empty() {
        "None".to_string()
    } else {
        keywords.join(", ")
    };
    format!(
        "Post content:\n{text}\n\nSignal detection found:\n- Emotional intensity: \
         {emotional_intensity:.2}\n- Problem category: {problem_category}\n- Keywords: \
         {keywords_str}\n\nAssess the risk of engaging with this post."
    )
}

/// Run risk scoring for one post.
pub async fn run(
    llm: &dyn LlmProvider,
    text: &str,
    emotional_intensity: f64,
    problem_category: &str,
    keywords: &[String],
) -> Result<Risk, PipelineError> {
    let crisis_result = crisis::detect(text);
    if crisis_result.is_crisis {
        let category = crisis_result
            .crisis_category
            .clone()
            .unwrap_or_else(|| "unknown".to_string());
        return Ok(Risk {
            risk_level: RiskLevel::Blocked,
            risk_score: 1.0,
            risk_factors: crisis_result.matched_patterns,
            context_flags: vec![
                format!("crisis_category:{category}"),
                "requires_immediate_attention".to_string(),
                "do_not_engage".to_string(),
            ],
            recommended_action: recommended_action(RiskLevel::Blocked).to_string(),
        });
    }

    let prompt = format_user_prompt(text, emotional_intensity, problem_category, keywords);
    let params = GenerationParams::default();

    let response = match llm.complete(SYSTEM_PROMPT, &prompt, &params).await {
        Ok(r) => r,
        Err(_) => return Ok(heuristic_fallback(emotional_intensity, problem_category)),
    };

    let parsed: LlmRiskAnalysis = match serde_json::from_str(&response.text) {
        Ok(p) => p,
        Err(_) => return Ok(heuristic_fallback(emotional_intensity, problem_category)),
    };

    let risk_score = parsed.risk_score.clamp(0.0, 1.0);
    let risk_level = risk_level_for_score(risk_score);

    Ok(Risk {
        risk_level,
        risk_score,
        risk_factors: parsed.risk_factors,
        context_flags: parsed.context_flags,
        recommended_action: if parsed.engagement_recommendation.is_empty() {
            recommended_action(risk_level).to_string()
        } else {
            parsed.engagement_recommendation
        },
    })
}

fn heuristic_fallback(emotional_intensity: f64, problem_category: &str) -> Risk {
    let base_score = emotional_intensity;
    let category_weight = heuristic_category_weight(problem_category);
    let risk_score = (base_score + category_weight).min(0.99);
    let risk_level = risk_level_for_score(risk_score);

    Risk {
        risk_level,
        risk_score: (risk_score * 100.0).round() / 100.0,
        risk_factors: vec![
            format!("Emotional intensity: {emotional_intensity:.2}"),
            format!("Problem category: {problem_category}"),
            "LLM analysis unavailable - using heuristic assessment".to_string(),
        ],
        context_flags: if problem_category.is_empty() {
            Vec::new()
        } else {
            vec![problem_category.to_string()]
        },
        recommended_action: format!("Review recommended. {}", recommended_action(risk_level)),
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
    async fn crisis_text_blocks_without_calling_llm() {
        let llm = FixedLlm(Err(()));
        let risk = run(&llm, "i want to kill myself", 0.9, "mental_health_depression", &[])
            .await
            .unwrap();
        assert_eq!(risk.risk_level, RiskLevel::Blocked);
        assert_eq!(risk.risk_score, 1.0);
    }

    #[tokio::test]
    async fn llm_response_drives_risk_level() {
        let llm = FixedLlm(Ok(serde_json::json!({
            "risk_score": 0.2,
            "risk_factors": ["mild frustration"],
            "context_flags": [],
            "sentiment": "negative",
            "engagement_recommendation": "safe"
        })
        .to_string()));

        let risk = run(&llm, "text", 0.3, "workplace_conflict", &[]).await.unwrap();
        assert_eq!(risk.risk_level, RiskLevel::Low);
        assert_eq!(risk.risk_score, 0.2);
    }

    #[tokio::test]
    async fn llm_failure_uses_heuristic_fallback() {
        let llm = FixedLlm(Err(()));
        let risk = run(&llm, "text", 0.6, "financial_stress", &[]).await.unwrap();
        assert_eq!(risk.risk_score, 0.75);
        assert_eq!(risk.risk_level, RiskLevel::High);
    }

    #[tokio::test]
    async fn heuristic_fallback_caps_below_one() {
        let llm = FixedLlm(Err(()));
        let risk = run(&llm, "text", 1.0, "mental_health_depression", &[]).await.unwrap();
        assert!(risk.risk_score <= 0.99);
    }

    #[test]
    fn unweighted_category_contributes_no_bonus() {
        let risk = heuristic_fallback(0.5, "decision_making");
        assert_eq!(risk.risk_score, 0.5);
    }
}
