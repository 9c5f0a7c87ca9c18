//! The five-stage analysis pipeline (§4.5): signal detection, risk scoring,
//! response generation, CTA classification, and the CTS decision.
//!
//! Modeled as a fixed node graph rather than a general-purpose
//! graph-execution dependency — the edge table below is the entire state
//! machine, and every transition is total (no panics on unexpected states).
//!
//! ```text
//! signal_detection -> risk_scoring -> [blocked]    -> handle_blocked -> END
//!                                   -> [low/med/hi] -> response_generation
//!                                                      -> cta_classifier
//!                                                      -> cts_decision -> END
//! ```

pub mod cta_classifier;
pub mod cts_decision;
pub mod response_generation;
pub mod risk_scoring;
pub mod signal_detection;

use crate::error::PipelineError;
use crate::llm::LlmProvider;
use crate::model::{Cta, Cts, CtsBreakdown, Platform, Responses, Risk, RiskLevel, Signal, TenantContext};

/// Everything known about one post as it moves through the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineInput {
    pub text: String,
    pub platform: Platform,
    pub tenant_context: TenantContext,
}

/// Accumulated pipeline output. Fields fill in as each node completes;
/// `risk.risk_level == Blocked` means `responses`/`cta`/`cts` are never set.
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    pub signal: Option<Signal>,
    pub risk: Option<Risk>,
    pub responses: Option<Responses>,
    pub cta: Option<Cta>,
    pub cts: Option<Cts>,
    /// Set when risk scoring blocks the post; `cts` is still populated in
    /// that case, with a sentinel "do not engage" value (§4.5 `handle_blocked`).
    pub blocked: bool,
}

/// Run the full pipeline for one post, short-circuiting to a blocked result
/// when risk scoring trips the crisis gate.
pub async fn run(
    llm: &dyn LlmProvider,
    input: PipelineInput,
) -> Result<PipelineOutput, PipelineError> {
    let mut out = PipelineOutput::default();

    let signal = signal_detection::run(llm, &input.text, input.platform).await?;

    let risk = risk_scoring::run(
        llm,
        &input.text,
        signal.emotional_intensity,
        &signal.problem_category,
        &signal.keywords,
    )
    .await?;

    let blocked = risk.risk_level == RiskLevel::Blocked;
    out.signal = Some(signal.clone());
    out.risk = Some(risk.clone());
    out.blocked = blocked;

    if blocked {
        out.cts = Some(blocked_cts());
        return Ok(out);
    }

    let responses = response_generation::run(
        llm,
        &input.text,
        &signal.problem_category,
        risk.risk_level,
        input.platform,
        &input.tenant_context,
    )
    .await?;

    let cta = cta_classifier::run(&responses.selected_response);

    let cts = cts_decision::run(signal.confidence, risk.risk_level, risk.risk_score, cta.cta_level);

    out.responses = Some(responses);
    out.cta = Some(cta);
    out.cts = Some(cts);

    Ok(out)
}

/// Build a placeholder [`Cts`] for a blocked post, matching what the
/// original `_handle_blocked` node returns: zero confidence, not eligible,
/// explained in `decision_factors`/`auto_post_reason`.
pub fn blocked_cts() -> Cts {
    Cts {
        cts_score: 0.0,
        can_auto_post: false,
        auto_post_reason: "Content blocked by crisis detection; auto-post not evaluated."
            .to_string(),
        breakdown: CtsBreakdown {
            signal_component: 0.0,
            risk_component: 0.0,
            cta_component: 0.0,
        },
        decision_factors: vec!["risk_level is blocked".to_string()],
        recommended_action: "DO NOT ENGAGE. Crisis content detected. Route to crisis intervention protocol.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::llm::{GenerationParams, LlmResponse, TokenUsage};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedLlm {
        responses: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            _system: &str,
            _user_message: &str,
            _params: &GenerationParams,
        ) -> Result<LlmResponse, LlmError> {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(LlmError::NotConfigured);
            }
            let text = responses.remove(0);
            Ok(LlmResponse {
                text,
                usage: TokenUsage::default(),
                model: "scripted".to_string(),
            })
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
    async fn crisis_text_short_circuits_to_blocked() {
        let llm = ScriptedLlm {
            responses: Mutex::new(vec![serde_json::json!({
                "problem_category": "mental_health_depression",
                "emotional_intensity": 0.9,
                "keywords": ["hopeless"],
                "confidence": 0.8,
                "reasoning": "crisis text"
            })
            .to_string()]),
        };

        let input = PipelineInput {
            text: "I want to end it all".to_string(),
            platform: Platform::Reddit,
            tenant_context: tenant(),
        };

        let out = run(&llm, input).await.unwrap();
        assert!(out.blocked);
        assert_eq!(out.risk.unwrap().risk_level, RiskLevel::Blocked);
        assert!(out.responses.is_none());
        let cts = out.cts.unwrap();
        assert!(!cts.can_auto_post);
        assert_eq!(cts.cts_score, 0.0);
        assert!(cts.recommended_action.to_lowercase().contains("crisis"));
    }

    #[tokio::test]
    async fn non_crisis_text_runs_all_five_stages() {
        let llm = ScriptedLlm {
            responses: Mutex::new(vec![
                serde_json::json!({
                    "problem_category": "financial_stress",
                    "emotional_intensity": 0.5,
                    "keywords": ["budget", "argument"],
                    "confidence": 0.8,
                    "reasoning": "money stress"
                })
                .to_string(),
                serde_json::json!({
                    "risk_score": 0.2,
                    "risk_factors": ["mild frustration"],
                    "context_flags": [],
                    "sentiment": "negative",
                    "engagement_recommendation": "safe to engage"
                })
                .to_string(),
                serde_json::json!({
                    "problem_understanding": "struggling with budgeting",
                    "emotional_tone": "frustrated",
                    "key_pain_points": ["money arguments"],
                    "response_strategy": "empathize",
                    "value_first_response": "Budgeting conversations are hard, especially early on.",
                    "soft_cta_response": "Some couples find a shared tracking app helps.",
                    "contextual_response": "It might help to set a regular check-in time."
                })
                .to_string(),
            ]),
        };

        let input = PipelineInput {
            text: "My partner and I keep fighting about money.".to_string(),
            platform: Platform::Reddit,
            tenant_context: tenant(),
        };

        let out = run(&llm, input).await.unwrap();
        assert!(!out.blocked);
        assert_eq!(out.risk.unwrap().risk_level, RiskLevel::Low);
        assert!(out.responses.is_some());
        assert!(out.cta.is_some());
        let cts = out.cts.unwrap();
        assert!(cts.cts_score > 0.0);
    }

    #[test]
    fn blocked_cts_is_never_eligible() {
        let cts = blocked_cts();
        assert!(!cts.can_auto_post);
        assert_eq!(cts.cts_score, 0.0);
    }
}
