//! Learning-hub article endpoints: public reading and admin CRUD.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};

use crate::{
    api::models::{
        articles::{ArticleCreateRequest, ArticleResponse, ArticleUpdateRequest, ListArticlesQuery},
        pagination::{PaginatedResponse, Pagination},
    },
    auth::RequiresAdmin,
    db::{
        handlers::{Articles, Repository},
        models::articles::{ArticleCreateDBRequest, ArticleFilter, ArticleUpdateDBRequest},
    },
    errors::{Error, Result},
    types::ArticleId,
    AppState,
};

/// List published articles (public)
#[utoipa::path(
    get,
    path = "/articles",
    tag = "articles",
    params(ListArticlesQuery, Pagination),
    responses(
        (status = 200, description = "Published articles ordered by category and index", body = PaginatedResponse<ArticleResponse>),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<ListArticlesQuery>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<ArticleResponse>>> {
    list_with_filter(&state, query.category, pagination, false).await
}

/// Read one published article by slug (public)
#[utoipa::path(
    get,
    path = "/articles/{slug}",
    tag = "articles",
    params(("slug" = String, Path, description = "Article slug")),
    responses(
        (status = 200, description = "The article", body = ArticleResponse),
        (status = 404, description = "No published article under this slug"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_article(State(state): State<AppState>, Path(slug): Path<String>) -> Result<Json<ArticleResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let article = Articles::new(&mut conn)
        .get_by_slug(&slug, false)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Article".to_string(),
            id: slug,
        })?;

    Ok(Json(ArticleResponse::from(article)))
}

/// List all articles including drafts (admin only)
#[utoipa::path(
    get,
    path = "/admin/articles",
    tag = "admin",
    params(ListArticlesQuery, Pagination),
    responses(
        (status = 200, description = "All articles", body = PaginatedResponse<ArticleResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn admin_list_articles(
    State(state): State<AppState>,
    _admin: RequiresAdmin,
    Query(query): Query<ListArticlesQuery>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<ArticleResponse>>> {
    list_with_filter(&state, query.category, pagination, true).await
}

async fn list_with_filter(
    state: &AppState,
    category: Option<String>,
    pagination: Pagination,
    include_unpublished: bool,
) -> Result<Json<PaginatedResponse<ArticleResponse>>> {
    let (skip, limit) = (pagination.skip(), pagination.limit());
    let filter = ArticleFilter {
        include_unpublished,
        category: category.filter(|c| !c.trim().is_empty()),
        skip,
        limit,
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let articles = Articles::new(&mut conn).list(&filter).await?;

    // The count is page-local; article sets are small enough that clients
    // paginate blindly
    let total_count = articles.len() as i64;

    Ok(Json(PaginatedResponse::new(
        articles.into_iter().map(ArticleResponse::from).collect(),
        total_count,
        skip,
        limit,
    )))
}

/// Create an article (admin only)
#[utoipa::path(
    post,
    path = "/admin/articles",
    tag = "admin",
    request_body = ArticleCreateRequest,
    responses(
        (status = 201, description = "Article created", body = ArticleResponse),
        (status = 400, description = "Missing fields"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 409, description = "Slug already in use"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn admin_create_article(
    State(state): State<AppState>,
    _admin: RequiresAdmin,
    Json(request): Json<ArticleCreateRequest>,
) -> Result<(StatusCode, Json<ArticleResponse>)> {
    let slug = request.slug.trim().to_lowercase();
    if slug.is_empty() {
        return Err(Error::Validation {
            field: "slug",
            message: "Enter a slug".to_string(),
        });
    }
    if request.title.trim().is_empty() {
        return Err(Error::Validation {
            field: "title",
            message: "Enter a title".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let article = Articles::new(&mut conn)
        .create(&ArticleCreateDBRequest {
            title: request.title.trim().to_string(),
            slug,
            content: request.content,
            category: request.category,
            order_index: request.order_index,
            is_published: request.is_published,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ArticleResponse::from(article))))
}

/// Update an article (admin only)
#[utoipa::path(
    patch,
    path = "/admin/articles/{id}",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Article ID")),
    request_body = ArticleUpdateRequest,
    responses(
        (status = 200, description = "Updated article", body = ArticleResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Article not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn admin_update_article(
    State(state): State<AppState>,
    _admin: RequiresAdmin,
    Path(id): Path<ArticleId>,
    Json(request): Json<ArticleUpdateRequest>,
) -> Result<Json<ArticleResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let article = Articles::new(&mut conn)
        .update(
            id,
            &ArticleUpdateDBRequest {
                title: request.title,
                slug: request.slug.map(|s| s.trim().to_lowercase()),
                content: request.content,
                category: request.category,
                order_index: request.order_index,
                is_published: request.is_published,
            },
        )
        .await
        .map_err(|e| match e {
            crate::db::errors::DbError::NotFound => Error::NotFound {
                resource: "Article".to_string(),
                id: id.to_string(),
            },
            other => Error::Database(other),
        })?;

    Ok(Json(ArticleResponse::from(article)))
}

/// Delete an article (admin only)
#[utoipa::path(
    delete,
    path = "/admin/articles/{id}",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Article ID")),
    responses(
        (status = 204, description = "Article deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Article not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn admin_delete_article(
    State(state): State<AppState>,
    _admin: RequiresAdmin,
    Path(id): Path<ArticleId>,
) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let deleted = Articles::new(&mut conn).delete(id).await?;
    if !deleted {
        return Err(Error::NotFound {
            resource: "Article".to_string(),
            id: id.to_string(),
        });
    }

    Ok(StatusCode::NO_CONTENT)
}
