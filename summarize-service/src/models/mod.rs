//! Domain models for the summarization gateway.

mod account;
mod quota;
mod usage;

pub use account::{AccountRow, PlanRow};
pub use quota::{evaluate, AccountState, DenialReason, QuotaDecision};
pub use usage::UsageRecord;
