//! API models for learning-hub articles.

use crate::db::models::articles::ArticleDBResponse;
use crate::types::ArticleId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ArticleCreateRequest {
    pub title: String,
    pub slug: String,
    /// Markdown source, stored and served verbatim
    pub content: String,
    pub category: String,
    #[serde(default)]
    pub order_index: i64,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ArticleUpdateRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub order_index: Option<i64>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListArticlesQuery {
    /// Restrict to one category slug
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ArticleResponse {
    #[schema(value_type = Uuid)]
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

impl From<ArticleDBResponse> for ArticleResponse {
    fn from(article: ArticleDBResponse) -> Self {
        Self {
            id: article.id,
            title: article.title,
            slug: article.slug,
            content: article.content,
            category: article.category,
            order_index: article.order_index,
            is_published: article.is_published,
            created_at: article.created_at,
            updated_at: article.updated_at,
        }
    }
}
