//! Database layer models for the organic visitor queue.

use crate::types::{QueueItemId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle of a queue entry. The selector only ever drives
/// `pending -> assigned`; `expired` and `converted` exist for manual curation
/// and are never transitioned to by application code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "queue_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Pending,
    Assigned,
    Expired,
    Converted,
}

/// One anonymous arrival. Attribution fields are stored verbatim from the
/// request query string, absent parameters as NULL.
#[derive(Debug, Clone)]
pub struct QueueArrivalDBRequest {
    pub visitor_id: Uuid,
    pub source: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct QueueItemDBResponse {
    pub id: QueueItemId,
    pub visitor_id: Uuid,
    pub source: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub status: QueueStatus,
    pub assigned_to: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
}

/// Queue item joined with the assigned member's display name (admin view).
#[derive(Debug, Clone, FromRow)]
pub struct QueueItemWithUserDB {
    pub id: QueueItemId,
    pub visitor_id: Uuid,
    pub source: Option<String>,
    pub status: QueueStatus,
    pub assigned_to: Option<UserId>,
    pub assigned_display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, FromRow)]
pub struct QueueStatsDB {
    pub pending: i64,
    pub assigned: i64,
}
