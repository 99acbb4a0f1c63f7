//! Database layer models for Q&A feed comments.

use crate::types::{CommentId, PostId, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct CommentCreateDBRequest {
    pub post_id: PostId,
    pub user_id: UserId,
    pub content: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct CommentDBResponse {
    pub id: CommentId,
    pub post_id: PostId,
    pub user_id: UserId,
    pub content: String,
    pub is_best_answer: bool,
    pub likes_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Comment joined with its author's public profile fields.
#[derive(Debug, Clone, FromRow)]
pub struct CommentWithAuthorDB {
    pub id: CommentId,
    pub post_id: PostId,
    pub user_id: UserId,
    pub content: String,
    pub is_best_answer: bool,
    pub likes_count: i64,
    pub created_at: DateTime<Utc>,
    pub author_display_name: Option<String>,
    pub author_contribution_points: i64,
}
