//! Database layer models for member notifications.

use crate::types::{NotificationId, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Notification kinds emitted by application flows.
pub mod kinds {
    pub const COMMENT: &str = "comment";
    pub const BEST_ANSWER: &str = "best_answer";
    pub const LIKE: &str = "like";
    pub const PLACEMENT: &str = "placement";
    pub const SYSTEM: &str = "system";
}

#[derive(Debug, Clone)]
pub struct NotificationCreateDBRequest {
    pub user_id: UserId,
    pub kind: String,
    pub title: String,
    pub content: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct NotificationDBResponse {
    pub id: NotificationId,
    pub user_id: UserId,
    pub kind: String,
    pub title: String,
    pub content: Option<String>,
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
