//! API models for the Q&A feed.

use crate::db::models::{
    comments::CommentWithAuthorDB,
    posts::{PostSort, PostWithAuthorDB},
};
use crate::types::{CommentId, PostId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Posts carry at most this many tags; extras are dropped silently.
pub const MAX_TAGS_PER_POST: usize = 3;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PostCreateRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CommentCreateRequest {
    pub content: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PostSortParam {
    #[default]
    Newest,
    Popular,
    Unanswered,
}

impl From<PostSortParam> for PostSort {
    fn from(sort: PostSortParam) -> Self {
        match sort {
            PostSortParam::Newest => PostSort::Newest,
            PostSortParam::Popular => PostSort::Popular,
            PostSortParam::Unanswered => PostSort::Unanswered,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListPostsQuery {
    /// Restrict to posts carrying this tag
    pub tag: Option<String>,
    /// Feed ordering: newest (default), popular, or unanswered
    pub sort: Option<PostSortParam>,
}

/// Author fields embedded in feed responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthorSummary {
    #[schema(value_type = Uuid)]
    pub id: UserId,
    pub display_name: Option<String>,
    pub contribution_points: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostResponse {
    #[schema(value_type = Uuid)]
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub is_answered: bool,
    pub likes_count: i64,
    pub comments_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author: AuthorSummary,
}

impl From<PostWithAuthorDB> for PostResponse {
    fn from(post: PostWithAuthorDB) -> Self {
        Self {
            id: post.id,
            title: post.title,
            content: post.content,
            tags: post.tags,
            is_answered: post.is_answered,
            likes_count: post.likes_count,
            comments_count: post.comments_count,
            created_at: post.created_at,
            updated_at: post.updated_at,
            author: AuthorSummary {
                id: post.user_id,
                display_name: post.author_display_name,
                contribution_points: post.author_contribution_points,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommentResponse {
    #[schema(value_type = Uuid)]
    pub id: CommentId,
    #[schema(value_type = Uuid)]
    pub post_id: PostId,
    pub content: String,
    pub is_best_answer: bool,
    pub likes_count: i64,
    pub created_at: DateTime<Utc>,
    pub author: AuthorSummary,
}

impl From<CommentWithAuthorDB> for CommentResponse {
    fn from(comment: CommentWithAuthorDB) -> Self {
        Self {
            id: comment.id,
            post_id: comment.post_id,
            content: comment.content,
            is_best_answer: comment.is_best_answer,
            likes_count: comment.likes_count,
            created_at: comment.created_at,
            author: AuthorSummary {
                id: comment.user_id,
                display_name: comment.author_display_name,
                contribution_points: comment.author_contribution_points,
            },
        }
    }
}

/// A post with its full comment thread.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostDetailResponse {
    pub post: PostResponse,
    pub comments: Vec<CommentResponse>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LikeTargetParam {
    Post,
    Comment,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LikeToggleRequest {
    pub target_type: LikeTargetParam,
    pub target_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LikeToggleResponse {
    /// Whether the like now exists (true) or was removed (false)
    pub liked: bool,
    pub likes_count: i64,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BestAnswerRequest {
    #[schema(value_type = Uuid)]
    pub comment_id: CommentId,
}
