//! Account and plan rows read from the identity platform's store.
//!
//! The schema belongs to the identity platform; this service only reads it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Row in the external `users` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AccountRow {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub active: bool,
    pub plan_id: Option<String>,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
}

/// Row in the external `plans` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlanRow {
    pub plan_id: String,
    pub active: bool,
    pub token_limit: Option<i64>,
}
