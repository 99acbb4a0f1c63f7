//! Q&A feed endpoints: posts, comments, likes, best answers.
//!
//! Every qualifying action credits contribution points through the scoring
//! ledger as a best-effort side effect after the primary mutation commits.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};

use crate::{
    api::models::{
        feed::{
            BestAnswerRequest, CommentCreateRequest, CommentResponse, LikeTargetParam, LikeToggleRequest, LikeToggleResponse,
            ListPostsQuery, PostCreateRequest, PostDetailResponse, PostResponse, MAX_TAGS_PER_POST,
        },
        pagination::{PaginatedResponse, Pagination},
        users::CurrentUser,
    },
    db::{
        handlers::{
            likes::{LikeTarget, Likes},
            Comments, Notifications, Posts,
        },
        models::{
            comments::CommentCreateDBRequest,
            notifications::{kinds, NotificationCreateDBRequest},
            posts::{PostCreateDBRequest, PostFilter},
        },
    },
    errors::{Error, Result},
    scoring,
    types::{PostId, UserId},
    AppState,
};

/// Best-effort notification; a failure must never fail the feed action that
/// triggered it.
async fn notify(state: &AppState, request: NotificationCreateDBRequest) {
    let result = match state.db.acquire().await {
        Ok(mut conn) => Notifications::new(&mut conn).create(&request).await.map(|_| ()),
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::warn!("Failed to create '{}' notification: {e}", request.kind);
    }
}

/// Create a post
#[utoipa::path(
    post,
    path = "/posts",
    tag = "feed",
    request_body = PostCreateRequest,
    responses(
        (status = 201, description = "Post created", body = PostResponse),
        (status = 400, description = "Missing title or content"),
        (status = 401, description = "Unauthorized"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_post(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<PostCreateRequest>,
) -> Result<(StatusCode, Json<PostResponse>)> {
    let title = request.title.trim().to_string();
    if title.is_empty() {
        return Err(Error::Validation {
            field: "title",
            message: "Enter a title".to_string(),
        });
    }
    let content = request.content.trim().to_string();
    if content.is_empty() {
        return Err(Error::Validation {
            field: "content",
            message: "Enter the post body".to_string(),
        });
    }

    // At most three tags, empties dropped
    let tags: Vec<String> = request
        .tags
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .take(MAX_TAGS_PER_POST)
        .collect();

    let post_id = {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        Posts::new(&mut conn)
            .create(&PostCreateDBRequest {
                user_id: current_user.id,
                title,
                content,
                tags,
            })
            .await?
            .id
    };

    scoring::award_action_best_effort(&state.db, current_user.id, "post_create", None).await;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let post = Posts::new(&mut conn)
        .get_with_author(post_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Post".to_string(),
            id: post_id.to_string(),
        })?;

    Ok((StatusCode::CREATED, Json(PostResponse::from(post))))
}

/// List posts
#[utoipa::path(
    get,
    path = "/posts",
    tag = "feed",
    params(ListPostsQuery, Pagination),
    responses(
        (status = 200, description = "Feed page", body = PaginatedResponse<PostResponse>),
        (status = 401, description = "Unauthorized"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_posts(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListPostsQuery>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<PostResponse>>> {
    let (skip, limit) = (pagination.skip(), pagination.limit());
    let filter = PostFilter {
        tag: query.tag.filter(|t| !t.trim().is_empty()),
        sort: query.sort.unwrap_or_default().into(),
        skip,
        limit,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Posts::new(&mut conn);

    let posts = repo.list(&filter).await?;
    let total_count = repo.count(&filter).await?;

    Ok(Json(PaginatedResponse::new(
        posts.into_iter().map(PostResponse::from).collect(),
        total_count,
        skip,
        limit,
    )))
}

/// Get one post with its comment thread
#[utoipa::path(
    get,
    path = "/posts/{id}",
    tag = "feed",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post and comments", body = PostDetailResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Post not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_post(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<PostId>,
) -> Result<Json<PostDetailResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let post = Posts::new(&mut conn).get_with_author(id).await?.ok_or_else(|| Error::NotFound {
        resource: "Post".to_string(),
        id: id.to_string(),
    })?;

    let comments = Comments::new(&mut conn).list_for_post(id).await?;

    Ok(Json(PostDetailResponse {
        post: PostResponse::from(post),
        comments: comments.into_iter().map(CommentResponse::from).collect(),
    }))
}

/// Comment on a post
#[utoipa::path(
    post,
    path = "/posts/{id}/comments",
    tag = "feed",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = CommentCreateRequest,
    responses(
        (status = 201, description = "Comment created", body = CommentResponse),
        (status = 400, description = "Empty comment"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Post not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_comment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(post_id): Path<PostId>,
    Json(request): Json<CommentCreateRequest>,
) -> Result<(StatusCode, Json<CommentResponse>)> {
    let content = request.content.trim().to_string();
    if content.is_empty() {
        return Err(Error::Validation {
            field: "content",
            message: "Enter your answer".to_string(),
        });
    }

    let (comment_id, post_owner) = {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

        let post = Posts::new(&mut conn).get_by_id(post_id).await?.ok_or_else(|| Error::NotFound {
            resource: "Post".to_string(),
            id: post_id.to_string(),
        })?;

        let comment = Comments::new(&mut conn)
            .create(&CommentCreateDBRequest {
                post_id,
                user_id: current_user.id,
                content,
            })
            .await?;

        (comment.id, post.user_id)
    };

    scoring::award_action_best_effort(&state.db, current_user.id, "comment_create", None).await;

    if post_owner != current_user.id {
        notify(
            &state,
            NotificationCreateDBRequest {
                user_id: post_owner,
                kind: kinds::COMMENT.to_string(),
                title: "New answer on your question".to_string(),
                content: None,
                link: Some(format!("/feed/{post_id}")),
            },
        )
        .await;
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let comments = Comments::new(&mut conn).list_for_post(post_id).await?;
    let comment = comments
        .into_iter()
        .find(|c| c.id == comment_id)
        .ok_or_else(|| Error::NotFound {
            resource: "Comment".to_string(),
            id: comment_id.to_string(),
        })?;

    Ok((StatusCode::CREATED, Json(CommentResponse::from(comment))))
}

/// Toggle a like on a post or comment
#[utoipa::path(
    post,
    path = "/likes",
    tag = "feed",
    request_body = LikeToggleRequest,
    responses(
        (status = 200, description = "Like toggled", body = LikeToggleResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Target not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn toggle_like(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<LikeToggleRequest>,
) -> Result<Json<LikeToggleResponse>> {
    let target = match request.target_type {
        LikeTargetParam::Post => LikeTarget::Post,
        LikeTargetParam::Comment => LikeTarget::Comment,
    };

    let result = {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        Likes::new(&mut conn)
            .toggle(current_user.id, target, request.target_id)
            .await
            .map_err(|e| match e {
                crate::db::errors::DbError::NotFound => Error::NotFound {
                    resource: "Like target".to_string(),
                    id: request.target_id.to_string(),
                },
                other => Error::Database(other),
            })?
    };

    // A fresh like on someone else's content earns them points; removing a
    // like does not claw anything back.
    if result.liked && result.owner_id != current_user.id {
        scoring::award_action_best_effort(&state.db, result.owner_id, "like_received", None).await;
        notify(
            &state,
            NotificationCreateDBRequest {
                user_id: result.owner_id,
                kind: kinds::LIKE.to_string(),
                title: "Your contribution received a like".to_string(),
                content: None,
                link: None,
            },
        )
        .await;
    }

    Ok(Json(LikeToggleResponse {
        liked: result.liked,
        likes_count: result.likes_count,
    }))
}

/// Mark a comment as the best answer (post owner only)
#[utoipa::path(
    post,
    path = "/posts/{id}/best-answer",
    tag = "feed",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = BestAnswerRequest,
    responses(
        (status = 200, description = "Best answer marked"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only the post owner can mark a best answer"),
        (status = 404, description = "Post or comment not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn mark_best_answer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(post_id): Path<PostId>,
    Json(request): Json<BestAnswerRequest>,
) -> Result<StatusCode> {
    let answer_author: UserId = {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

        let post = Posts::new(&mut conn).get_by_id(post_id).await?.ok_or_else(|| Error::NotFound {
            resource: "Post".to_string(),
            id: post_id.to_string(),
        })?;

        if post.user_id != current_user.id {
            return Err(Error::InsufficientPermissions {
                action: "mark best answers on",
                resource: "this post".to_string(),
            });
        }

        let comment = Comments::new(&mut conn)
            .set_best_answer(post_id, request.comment_id)
            .await
            .map_err(|e| match e {
                crate::db::errors::DbError::NotFound => Error::NotFound {
                    resource: "Comment".to_string(),
                    id: request.comment_id.to_string(),
                },
                other => Error::Database(other),
            })?;

        comment.user_id
    };

    scoring::award_action_best_effort(&state.db, answer_author, "best_answer", None).await;

    if answer_author != current_user.id {
        notify(
            &state,
            NotificationCreateDBRequest {
                user_id: answer_author,
                kind: kinds::BEST_ANSWER.to_string(),
                title: "Your answer was marked as the best answer".to_string(),
                content: None,
                link: Some(format!("/feed/{post_id}")),
            },
        )
        .await;
    }

    Ok(StatusCode::NO_CONTENT)
}
