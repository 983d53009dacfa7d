use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::time::Instant;
use validator::Validate;

use crate::{
    handlers::subject_id,
    middleware::AuthUser,
    services::{
        metrics, prompt,
        providers::{CompletionRequest, TokenUsage},
    },
    AppState,
};

/// Summarization request body.
#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    /// Long-form input to summarize.
    #[validate(length(min = 1, message = "text must not be empty"))]
    pub text: String,
    /// Preferred snippet format name; unrecognized values use the default.
    pub format: Option<String>,
    /// Preferred tone name; unrecognized values use the default.
    pub persona: Option<String>,
    pub model: Option<String>,
    #[validate(range(min = 0.0, max = 2.0, message = "temperature must be between 0 and 2"))]
    pub temperature: Option<f32>,
    #[validate(range(min = 1, message = "max_tokens must be positive"))]
    pub max_tokens: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub snippets: Vec<String>,
    pub snippet_count: usize,
    pub model: String,
    pub usage: TokenUsage,
    pub plan: PlanInfo,
}

/// Pre-call plan snapshot echoed back to the client.
#[derive(Debug, Serialize)]
pub struct PlanInfo {
    pub plan: String,
    pub remaining: i64,
}

/// Main endpoint: extract short-form snippets from long-form text.
///
/// Strict sequencing: authenticate (middleware) → quota check → compose →
/// upstream call → best-effort usage write → respond. A later stage never
/// runs when an earlier one failed.
#[axum::debug_handler]
pub async fn chat(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    req.validate().map_err(|e| {
        metrics::record_request("validation_error");
        AppError::from(e)
    })?;
    if req.text.trim().is_empty() {
        metrics::record_request("validation_error");
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "text must not be empty"
        )));
    }

    let user_id = subject_id(&user.0)?;

    // 1. Authorize against the plan before any paid work. A store failure
    //    here rejects the request: authorization cannot be confirmed.
    let decision = state.store.check_limit(user_id).await.map_err(|e| {
        metrics::record_db_error("check_limit");
        e
    })?;

    if !decision.allowed {
        if let Some(reason) = decision.reason {
            tracing::info!(user_id = %user_id, reason = reason.as_str(), "Request denied by quota");
            metrics::record_quota_denial(reason.as_str());
        }
        metrics::record_request("quota_denied");
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Usage limit exceeded. Please upgrade your plan."
        )));
    }

    // 2. Merge the service prompt template with client preferences.
    let composed = prompt::compose(&req.text, req.format.as_deref(), req.persona.as_deref());

    // 3. Call the upstream model, budgeting output per requested snippet.
    let model = req
        .model
        .clone()
        .unwrap_or_else(|| state.config.models.default_model.clone());
    let max_tokens = req
        .max_tokens
        .unwrap_or(state.config.models.default_max_tokens)
        .saturating_mul(composed.snippet_count as i64)
        .min(state.config.models.max_completion_tokens);

    let request = CompletionRequest {
        model,
        messages: composed.messages,
        temperature: req
            .temperature
            .unwrap_or(state.config.models.default_temperature),
        max_tokens,
    };

    let started = Instant::now();
    let completion = state.provider.complete(&request).await.map_err(|e| {
        tracing::error!(error = %e, model = %request.model, "Upstream completion failed");
        metrics::record_provider_error("openai", e.kind());
        metrics::record_request("upstream_error");
        AppError::from(e)
    })?;
    metrics::record_provider_latency("openai", &request.model, started.elapsed().as_secs_f64());

    // 4. Parse the model output into individual snippets.
    let snippets = prompt::split_snippets(&completion.content);

    // 5. Account for consumption. A write failure must not unwind the
    //    response the user already paid for; it is logged and counted.
    if let Err(e) = state
        .store
        .record_usage(user_id, &completion.model, completion.usage.total_tokens)
        .await
    {
        tracing::error!(error = %e, user_id = %user_id, "Failed to record usage");
        metrics::record_usage_write_failure();
    }

    metrics::record_tokens(
        &completion.model,
        completion.usage.prompt_tokens,
        completion.usage.completion_tokens,
    );
    metrics::record_request("ok");

    Ok(Json(ChatResponse {
        snippet_count: snippets.len(),
        snippets,
        model: completion.model,
        usage: completion.usage,
        plan: PlanInfo {
            plan: decision.plan,
            remaining: decision.remaining,
        },
    }))
}
