//! Quota decision logic.
//!
//! The decision itself is a pure function of the account state and the
//! current time, so the pre-call check and the `/api/me` read always agree
//! on the same store snapshot.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Why a request was refused by the quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    NoAccount,
    AccountInactive,
    PeriodExpired,
    NoPlan,
    LimitExhausted,
}

impl DenialReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::NoAccount => "no_account",
            DenialReason::AccountInactive => "account_inactive",
            DenialReason::PeriodExpired => "period_expired",
            DenialReason::NoPlan => "no_plan",
            DenialReason::LimitExhausted => "limit_exhausted",
        }
    }
}

/// Outcome of evaluating a subject's plan against recorded consumption.
#[derive(Debug, Clone, Serialize)]
pub struct QuotaDecision {
    pub allowed: bool,
    pub plan: String,
    pub remaining: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenialReason>,
}

impl QuotaDecision {
    pub fn allowed(plan: impl Into<String>, remaining: i64) -> Self {
        Self {
            allowed: true,
            plan: plan.into(),
            remaining,
            reason: None,
        }
    }

    pub fn denied(plan: impl Into<String>, reason: DenialReason) -> Self {
        Self {
            allowed: false,
            plan: plan.into(),
            remaining: 0,
            reason: Some(reason),
        }
    }
}

/// Account state assembled from the external store's account, plan and
/// usage tables.
#[derive(Debug, Clone, Default)]
pub struct AccountState {
    pub active: bool,
    pub plan_id: Option<String>,
    pub plan_active: bool,
    pub token_limit: Option<i64>,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    /// Tokens consumed within the current billing period.
    pub tokens_used: i64,
}

/// Decide whether a subject may consume more tokens right now.
///
/// A request is authorized only while consumption is strictly below the
/// plan's limit; consumption at or beyond the limit (the latter can happen
/// under concurrent load) is denied without panicking.
pub fn evaluate(state: Option<&AccountState>, now: DateTime<Utc>) -> QuotaDecision {
    let Some(state) = state else {
        return QuotaDecision::denied("none", DenialReason::NoAccount);
    };

    let plan = state.plan_id.clone().unwrap_or_else(|| "none".to_string());

    if !state.active {
        return QuotaDecision::denied(plan, DenialReason::AccountInactive);
    }

    if let Some(period_end) = state.current_period_end {
        if now > period_end {
            return QuotaDecision::denied(plan, DenialReason::PeriodExpired);
        }
    }

    if state.plan_id.is_none() || !state.plan_active {
        return QuotaDecision::denied(plan, DenialReason::NoPlan);
    }

    let token_limit = match state.token_limit {
        Some(limit) if limit > 0 => limit,
        _ => return QuotaDecision::denied(plan, DenialReason::NoPlan),
    };

    if state.tokens_used >= token_limit {
        return QuotaDecision::denied(plan, DenialReason::LimitExhausted);
    }

    QuotaDecision::allowed(plan, token_limit - state.tokens_used)
}
