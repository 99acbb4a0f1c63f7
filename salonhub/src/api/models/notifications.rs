//! API models for member notifications.

use crate::db::models::notifications::NotificationDBResponse;
use crate::types::NotificationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationResponse {
    #[schema(value_type = Uuid)]
    pub id: NotificationId,
    pub kind: String,
    pub title: String,
    pub content: Option<String>,
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<NotificationDBResponse> for NotificationResponse {
    fn from(notification: NotificationDBResponse) -> Self {
        Self {
            id: notification.id,
            kind: notification.kind,
            title: notification.title,
            content: notification.content,
            link: notification.link,
            is_read: notification.is_read,
            created_at: notification.created_at,
        }
    }
}

/// Notification list plus the unread badge count.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationListResponse {
    pub data: Vec<NotificationResponse>,
    pub unread_count: i64,
}
