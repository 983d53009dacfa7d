//! Usage-log rows written after successful upstream calls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Row in the external `usage_log` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UsageRecord {
    pub usage_id: Uuid,
    pub user_id: Uuid,
    /// Model as reported by the upstream provider.
    pub model: String,
    pub token_count: i64,
    pub recorded_utc: DateTime<Utc>,
}
