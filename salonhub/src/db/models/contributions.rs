//! Database layer models for the contribution ledger.

use crate::types::UserId;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// One point-granting (or removing) event to append to the ledger.
#[derive(Debug, Clone)]
pub struct ContributionEntryCreateDBRequest {
    pub user_id: UserId,
    pub action: String,
    /// Signed delta; negative values remove points.
    pub points: i64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ContributionEntryDBResponse {
    pub id: i64,
    pub user_id: UserId,
    pub action: String,
    pub points: i64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}
