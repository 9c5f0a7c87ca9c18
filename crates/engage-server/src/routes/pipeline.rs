//! `POST /pipeline/analyze` (§6) — runs the full five-stage pipeline.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use engage_core::model::{Cta, Cts, Platform, Responses, Risk, Signal, TenantContext};
use engage_core::pipeline::{self, PipelineInput};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub text: String,
    pub platform: Platform,
    #[serde(default)]
    pub tenant_context: Option<TenantContext>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub signal: Option<Signal>,
    pub risk: Option<Risk>,
    pub responses: Option<Responses>,
    pub cta: Option<Cta>,
    pub cts: Option<Cts>,
    pub blocked: bool,
}

/// `POST /pipeline/analyze` — input `{text, platform, tenant_context}`;
/// returns `{signal?, risk?, responses?, cta?, cts?, blocked, error?}`.
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let Some(llm) = state.llm.as_ref() else {
        return Err(ApiError::BadRequest(
            "no LLM provider configured".to_string(),
        ));
    };

    let tenant_context = req.tenant_context.unwrap_or_else(|| TenantContext {
        app_name: state.config.org.app_name.clone(),
        value_prop: state.config.org.value_prop.clone(),
        target_audience: state.config.org.target_audience.clone(),
        key_benefits: state.config.org.key_benefits.clone(),
        website_url: state.config.org.website_url.clone(),
    });

    let input = PipelineInput {
        text: req.text,
        platform: req.platform,
        tenant_context,
    };

    let out = pipeline::run(llm.as_ref(), input).await?;

    Ok(Json(AnalyzeResponse {
        signal: out.signal,
        risk: out.risk,
        responses: out.responses,
        cta: out.cta,
        cts: out.cts,
        blocked: out.blocked,
    }))
}
