use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::{
    services::{metrics, AccessClaims},
    AppState,
};

/// Middleware to require a valid bearer token.
///
/// Every verification failure reads as the same 401 externally; the
/// precise cause is only logged.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let Some(token) = token else {
        metrics::record_request("unauthenticated");
        return Err(AppError::Unauthorized(anyhow::anyhow!(
            "Missing or invalid Authorization header"
        )));
    };

    let claims = state.verifier.verify(token).map_err(|e| {
        tracing::debug!(kind = ?e.kind(), "Token rejected");
        metrics::record_request("unauthenticated");
        AppError::Unauthorized(anyhow::anyhow!("Invalid or expired token"))
    })?;

    // Store claims in request extensions so handlers can access them
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Extractor to easily get claims in handlers
pub struct AuthUser(pub AccessClaims);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts.extensions.get::<AccessClaims>().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Auth claims missing from request extensions"
            ))
        })?;

        Ok(AuthUser(claims.clone()))
    }
}
