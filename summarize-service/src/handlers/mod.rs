pub mod chat;
pub mod me;
pub mod metrics;

use crate::services::AccessClaims;
use service_core::error::AppError;
use uuid::Uuid;

/// The store keys subjects by UUID; a token whose subject claim is not one
/// cannot belong to a known account.
pub(crate) fn subject_id(claims: &AccessClaims) -> Result<Uuid, AppError> {
    Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized(anyhow::anyhow!("Invalid subject identifier")))
}
