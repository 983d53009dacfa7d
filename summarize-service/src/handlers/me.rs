use axum::{extract::State, Json};
use serde::Serialize;
use service_core::error::AppError;

use crate::{handlers::subject_id, middleware::AuthUser, AppState};

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub plan: String,
    pub remaining: i64,
}

/// Current subject's plan and remaining allowance.
///
/// Read-only: uses the same arithmetic as the pre-call quota check but
/// never denies — a subject with no plan simply reads as zero remaining.
#[axum::debug_handler]
pub async fn get_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<MeResponse>, AppError> {
    let claims = user.0;
    let user_id = subject_id(&claims)?;

    let decision = state.store.read_plan(user_id).await?;

    Ok(Json(MeResponse {
        subject: claims.sub,
        email: claims.email,
        plan: decision.plan,
        remaining: decision.remaining,
    }))
}
