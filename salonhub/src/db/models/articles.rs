//! Database layer models for learning-hub articles.

use crate::types::ArticleId;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct ArticleCreateDBRequest {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub category: String,
    pub order_index: i64,
    pub is_published: bool,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct ArticleUpdateDBRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub order_index: Option<i64>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ArticleDBResponse {
    pub id: ArticleId,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub category: String,
    pub order_index: i64,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ArticleFilter {
    /// When false, only published articles are returned (public listing).
    pub include_unpublished: bool,
    pub category: Option<String>,
    pub skip: i64,
    pub limit: i64,
}
