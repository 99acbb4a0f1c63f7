//! Database layer models for Q&A feed posts.

use crate::types::{PostId, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct PostCreateDBRequest {
    pub user_id: UserId,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct PostDBResponse {
    pub id: PostId,
    pub user_id: UserId,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub is_answered: bool,
    pub likes_count: i64,
    pub comments_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Post joined with its author's public profile fields.
#[derive(Debug, Clone, FromRow)]
pub struct PostWithAuthorDB {
    pub id: PostId,
    pub user_id: UserId,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub is_answered: bool,
    pub likes_count: i64,
    pub comments_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_display_name: Option<String>,
    pub author_contribution_points: i64,
}

/// Feed ordering options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PostSort {
    #[default]
    Newest,
    Popular,
    Unanswered,
}

#[derive(Debug, Clone)]
pub struct PostFilter {
    pub tag: Option<String>,
    pub sort: PostSort,
    pub skip: i64,
    pub limit: i64,
}
