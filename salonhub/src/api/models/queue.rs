//! API models for the redirect entry point and the admin queue/overview.

use crate::db::models::queue::{QueueItemWithUserDB, QueueStatsDB, QueueStatus};
use crate::types::{QueueItemId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Query parameters of the public redirect endpoint. All optional; `ref`
/// switches to the explicit-referral path, the rest is organic attribution
/// stored verbatim.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct RedirectQuery {
    /// Referral code of the member to credit directly
    #[serde(rename = "ref")]
    pub referral_code: Option<String>,
    pub source: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QueueItemResponse {
    #[schema(value_type = Uuid)]
    pub id: QueueItemId,
    pub visitor_id: Uuid,
    pub source: Option<String>,
    pub status: QueueStatus,
    #[schema(value_type = Option<Uuid>)]
    pub assigned_to: Option<UserId>,
    pub assigned_display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
}

impl From<QueueItemWithUserDB> for QueueItemResponse {
    fn from(item: QueueItemWithUserDB) -> Self {
        Self {
            id: item.id,
            visitor_id: item.visitor_id,
            source: item.source,
            status: item.status,
            assigned_to: item.assigned_to,
            assigned_display_name: item.assigned_display_name,
            created_at: item.created_at,
            assigned_at: item.assigned_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct QueueStatsResponse {
    pub pending: i64,
    pub assigned: i64,
}

impl From<QueueStatsDB> for QueueStatsResponse {
    fn from(stats: QueueStatsDB) -> Self {
        Self {
            pending: stats.pending,
            assigned: stats.assigned,
        }
    }
}

/// Admin queue view: counters plus the latest arrivals.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminQueueResponse {
    pub stats: QueueStatsResponse,
    pub items: Vec<QueueItemResponse>,
}

/// Result of a manual placement trigger.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlacementResponse {
    /// The member the item is now assigned to, if any pool member was eligible
    #[schema(value_type = Option<Uuid>)]
    pub assigned_to: Option<UserId>,
}

/// Admin overview counters.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminStatsResponse {
    pub total_users: i64,
    pub new_users_today: i64,
    pub new_users_week: i64,
    pub new_users_month: i64,
    pub pending_queue: i64,
    pub placements_today: i64,
    pub total_posts: i64,
    pub total_comments: i64,
}
