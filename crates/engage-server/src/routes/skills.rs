//! `POST /skills/{stage}` (§6) — individual pipeline stage endpoints,
//! mirroring each node's own I/O rather than the full `/pipeline/analyze`
//! chain. Useful for operators tuning one stage in isolation.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use engage_core::model::{Cta, Cts, Platform, Responses, Risk, RiskLevel, Signal, TenantContext};
use engage_core::pipeline::{cta_classifier, cts_decision, response_generation, risk_scoring, signal_detection};
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

fn require_llm(state: &AppState) -> Result<&Arc<dyn engage_core::llm::LlmProvider>, ApiError> {
    state
        .llm
        .as_ref()
        .ok_or_else(|| ApiError::BadRequest("no LLM provider configured".to_string()))
}

#[derive(Debug, Deserialize)]
pub struct SignalDetectionRequest {
    pub text: String,
    pub platform: Platform,
}

/// `POST /skills/signal-detection`.
pub async fn signal_detection(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignalDetectionRequest>,
) -> Result<Json<Signal>, ApiError> {
    let llm = require_llm(&state)?;
    let signal = signal_detection::run(llm.as_ref(), &req.text, req.platform).await?;
    Ok(Json(signal))
}

#[derive(Debug, Deserialize)]
pub struct RiskScoringRequest {
    pub text: String,
    pub emotional_intensity: f64,
    pub problem_category: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// `POST /skills/risk-scoring`.
pub async fn risk_scoring(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RiskScoringRequest>,
) -> Result<Json<Risk>, ApiError> {
    let llm = require_llm(&state)?;
    let risk = risk_scoring::run(
        llm.as_ref(),
        &req.text,
        req.emotional_intensity,
        &req.problem_category,
        &req.keywords,
    )
    .await?;
    Ok(Json(risk))
}

#[derive(Debug, Deserialize)]
pub struct ResponseGenerationRequest {
    pub text: String,
    pub problem_category: String,
    pub risk_level: RiskLevel,
    pub platform: Platform,
    pub tenant_context: TenantContext,
}

/// `POST /skills/response-generation`.
pub async fn response_generation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResponseGenerationRequest>,
) -> Result<Json<Responses>, ApiError> {
    let llm = require_llm(&state)?;
    let responses = response_generation::run(
        llm.as_ref(),
        &req.text,
        &req.problem_category,
        req.risk_level,
        req.platform,
        &req.tenant_context,
    )
    .await?;
    Ok(Json(responses))
}

#[derive(Debug, Deserialize)]
pub struct CtaClassifierRequest {
    pub response_text: String,
}

/// `POST /skills/cta-classifier` — pure function, no LLM call.
pub async fn cta_classifier(Json(req): Json<CtaClassifierRequest>) -> Json<Cta> {
    Json(cta_classifier::run(&req.response_text))
}

#[derive(Debug, Deserialize)]
pub struct CtsDecisionRequest {
    pub signal_confidence: f64,
    pub risk_level: RiskLevel,
    pub risk_score: f64,
    pub cta_level: i32,
}

/// `POST /skills/cts-decision` — pure function, no LLM call.
pub async fn cts_decision(Json(req): Json<CtsDecisionRequest>) -> Json<Cts> {
    Json(cts_decision::run(
        req.signal_confidence,
        req.risk_level,
        req.risk_score,
        req.cta_level,
    ))
}
