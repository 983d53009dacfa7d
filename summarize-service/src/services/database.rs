//! External-store access for quota decisions and usage accounting.
//!
//! The account, plan and usage tables live in the identity platform's
//! PostgreSQL database; this service reads them per request (no caching)
//! and appends usage rows after successful upstream calls. The check and
//! the subsequent write are deliberately not one atomic store operation.

use crate::models::{evaluate, AccountRow, AccountState, PlanRow, QuotaDecision, UsageRecord};
use async_trait::async_trait;
use chrono::Utc;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

/// Capability interface over the external store.
///
/// `check_limit` authorizes a call, `read_plan` backs `/api/me` with the
/// same arithmetic, `record_usage` accounts for consumption afterwards.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    async fn check_limit(&self, user_id: Uuid) -> Result<QuotaDecision, AppError>;

    async fn read_plan(&self, user_id: Uuid) -> Result<QuotaDecision, AppError>;

    async fn record_usage(
        &self,
        user_id: Uuid,
        model: &str,
        token_count: i64,
    ) -> Result<(), AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    #[instrument(skip(database_url), fields(service = "summarize-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Assemble the subject's account, plan and current-period consumption
    /// into one state snapshot.
    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn load_account_state(&self, user_id: Uuid) -> Result<Option<AccountState>, AppError> {
        let account = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT user_id, email, active, plan_id, current_period_start, current_period_end
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to load account: {}", e)))?;

        let Some(account) = account else {
            return Ok(None);
        };

        let mut state = AccountState {
            active: account.active,
            plan_id: account.plan_id.clone(),
            plan_active: false,
            token_limit: None,
            current_period_start: account.current_period_start,
            current_period_end: account.current_period_end,
            tokens_used: 0,
        };

        if let Some(plan_id) = &account.plan_id {
            let plan = sqlx::query_as::<_, PlanRow>(
                r#"
                SELECT plan_id, active, token_limit
                FROM plans
                WHERE plan_id = $1
                "#,
            )
            .bind(plan_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to load plan: {}", e)))?;

            if let Some(plan) = plan {
                state.plan_active = plan.active;
                state.token_limit = plan.token_limit;
            }
        }

        let tokens_used: i64 = if let Some(period_start) = account.current_period_start {
            sqlx::query_scalar(
                r#"
                SELECT COALESCE(SUM(token_count), 0)::bigint
                FROM usage_log
                WHERE user_id = $1 AND recorded_utc >= $2
                "#,
            )
            .bind(user_id)
            .bind(period_start)
            .fetch_one(&self.pool)
            .await
        } else {
            sqlx::query_scalar(
                r#"
                SELECT COALESCE(SUM(token_count), 0)::bigint
                FROM usage_log
                WHERE user_id = $1
                "#,
            )
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
        }
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to sum usage: {}", e)))?;

        state.tokens_used = tokens_used;

        Ok(Some(state))
    }
}

#[async_trait]
impl QuotaStore for Database {
    async fn check_limit(&self, user_id: Uuid) -> Result<QuotaDecision, AppError> {
        let state = self.load_account_state(user_id).await?;
        Ok(evaluate(state.as_ref(), Utc::now()))
    }

    async fn read_plan(&self, user_id: Uuid) -> Result<QuotaDecision, AppError> {
        self.check_limit(user_id).await
    }

    #[instrument(skip(self), fields(user_id = %user_id, model = %model))]
    async fn record_usage(
        &self,
        user_id: Uuid,
        model: &str,
        token_count: i64,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO usage_log (usage_id, user_id, model, token_count, recorded_utc)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(model)
        .bind(token_count)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to record usage: {}", e)))?;

        info!(tokens = token_count, "Usage recorded");

        Ok(())
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }
}

/// In-memory store for tests and local development without PostgreSQL.
///
/// Counts reads so tests can assert that rejected requests never touched
/// the store, and supports scripted read/write failures.
#[derive(Default)]
pub struct InMemoryQuotaStore {
    accounts: Mutex<HashMap<Uuid, AccountState>>,
    usage: Mutex<Vec<UsageRecord>>,
    reads: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl InMemoryQuotaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_account(&self, user_id: Uuid, state: AccountState) {
        self.accounts.lock().unwrap().insert(user_id, state);
    }

    pub fn usage(&self) -> Vec<UsageRecord> {
        self.usage.lock().unwrap().clone()
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl QuotaStore for InMemoryQuotaStore {
    async fn check_limit(&self, user_id: Uuid) -> Result<QuotaDecision, AppError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "store unreachable"
            )));
        }
        let accounts = self.accounts.lock().unwrap();
        Ok(evaluate(accounts.get(&user_id), Utc::now()))
    }

    async fn read_plan(&self, user_id: Uuid) -> Result<QuotaDecision, AppError> {
        self.check_limit(user_id).await
    }

    async fn record_usage(
        &self,
        user_id: Uuid,
        model: &str,
        token_count: i64,
    ) -> Result<(), AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "store unreachable"
            )));
        }
        self.usage.lock().unwrap().push(UsageRecord {
            usage_id: Uuid::new_v4(),
            user_id,
            model: model.to_string(),
            token_count,
            recorded_utc: Utc::now(),
        });
        if let Some(state) = self.accounts.lock().unwrap().get_mut(&user_id) {
            state.tokens_used += token_count;
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}
