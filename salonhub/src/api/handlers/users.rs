//! Member profile, leaderboard and admin user-management endpoints.

use axum::{
    extract::{Path, Query, State},
    response::Json,
};

use crate::{
    api::models::{
        pagination::{PaginatedResponse, Pagination},
        users::{
            AdminUserUpdateRequest, ContributionEntryResponse, CurrentUser, LeaderboardEntry, PointsAdjustmentRequest,
            ProfileUpdateRequest, UserResponse, UserStatsResponse,
        },
    },
    auth::RequiresAdmin,
    db::{
        handlers::{users::UserFilter, Contributions, Repository, Users},
        models::users::UserUpdateDBRequest,
    },
    errors::{Error, Result},
    scoring,
    types::UserId,
    AppState,
};

/// Outbound referral destinations must be plain web URLs.
fn validate_referral_url(raw: &str) -> Result<()> {
    let parsed = url::Url::parse(raw).map_err(|_| Error::Validation {
        field: "referral_url",
        message: "Enter a valid URL".to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::Validation {
            field: "referral_url",
            message: "Only http(s) URLs are accepted".to_string(),
        });
    }

    Ok(())
}

/// Get the authenticated member's profile
#[utoipa::path(
    get,
    path = "/users/me",
    tag = "users",
    responses(
        (status = 200, description = "The caller's profile", body = UserResponse),
        (status = 401, description = "Unauthorized"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_me(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<UserResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let user = Users::new(&mut conn)
        .get_by_id(current_user.id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "User".to_string(),
            id: current_user.id.to_string(),
        })?;

    Ok(Json(UserResponse::from(user)))
}

/// Update the authenticated member's profile (display name, referral URL)
#[utoipa::path(
    patch,
    path = "/users/me",
    tag = "users",
    request_body = ProfileUpdateRequest,
    responses(
        (status = 200, description = "Updated profile", body = UserResponse),
        (status = 400, description = "Invalid referral URL"),
        (status = 401, description = "Unauthorized"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_me(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<ProfileUpdateRequest>,
) -> Result<Json<UserResponse>> {
    if let Some(url) = request.referral_url.as_deref() {
        validate_referral_url(url)?;
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let user = Users::new(&mut conn)
        .update(
            current_user.id,
            &UserUpdateDBRequest {
                display_name: request.display_name,
                referral_url: request.referral_url,
                password_hash: None,
            },
        )
        .await?;

    Ok(Json(UserResponse::from(user)))
}

/// Get the authenticated member's aggregated stats
#[utoipa::path(
    get,
    path = "/users/me/stats",
    tag = "users",
    responses(
        (status = 200, description = "Profile stats", body = UserStatsResponse),
        (status = 401, description = "Unauthorized"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_my_stats(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<UserStatsResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let stats = Users::new(&mut conn)
        .stats(current_user.id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "User".to_string(),
            id: current_user.id.to_string(),
        })?;

    Ok(Json(UserStatsResponse::from(stats)))
}

/// List the authenticated member's contribution history
#[utoipa::path(
    get,
    path = "/users/me/contributions",
    tag = "users",
    params(Pagination),
    responses(
        (status = 200, description = "Ledger entries, newest first", body = PaginatedResponse<ContributionEntryResponse>),
        (status = 401, description = "Unauthorized"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_my_contributions(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<ContributionEntryResponse>>> {
    let (skip, limit) = (pagination.skip(), pagination.limit());
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Contributions::new(&mut conn);

    let entries = repo.list_for_user(current_user.id, skip, limit).await?;
    let total_count = repo.count_for_user(current_user.id).await?;

    Ok(Json(PaginatedResponse::new(
        entries.into_iter().map(ContributionEntryResponse::from).collect(),
        total_count,
        skip,
        limit,
    )))
}

/// Contribution leaderboard (public)
#[utoipa::path(
    get,
    path = "/leaderboard",
    tag = "users",
    params(Pagination),
    responses(
        (status = 200, description = "Top members by contribution points", body = Vec<LeaderboardEntry>),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn leaderboard(State(state): State<AppState>, Query(pagination): Query<Pagination>) -> Result<Json<Vec<LeaderboardEntry>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let rows = Users::new(&mut conn).leaderboard(pagination.limit()).await?;

    Ok(Json(rows.into_iter().map(LeaderboardEntry::from).collect()))
}

/// List all members (admin only)
#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "admin",
    params(Pagination),
    responses(
        (status = 200, description = "Members, newest first", body = PaginatedResponse<UserResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn admin_list_users(
    State(state): State<AppState>,
    _admin: RequiresAdmin,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<UserResponse>>> {
    let (skip, limit) = (pagination.skip(), pagination.limit());
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut conn);

    let users = repo.list(&UserFilter::new(skip, limit)).await?;
    let total_count = repo.count().await?;

    Ok(Json(PaginatedResponse::new(
        users.into_iter().map(UserResponse::from).collect(),
        total_count,
        skip,
        limit,
    )))
}

/// Toggle a member's admin flag (admin only)
#[utoipa::path(
    patch,
    path = "/admin/users/{id}",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Member ID")),
    request_body = AdminUserUpdateRequest,
    responses(
        (status = 200, description = "Updated member", body = UserResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Member not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn admin_update_user(
    State(state): State<AppState>,
    _admin: RequiresAdmin,
    Path(id): Path<UserId>,
    Json(request): Json<AdminUserUpdateRequest>,
) -> Result<Json<UserResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let user = Users::new(&mut conn).set_admin(id, request.is_admin).await.map_err(|e| match e {
        crate::db::errors::DbError::NotFound => Error::NotFound {
            resource: "User".to_string(),
            id: id.to_string(),
        },
        other => Error::Database(other),
    })?;

    Ok(Json(UserResponse::from(user)))
}

/// Manually adjust a member's contribution points (admin only)
#[utoipa::path(
    post,
    path = "/admin/users/{id}/points",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Member ID")),
    request_body = PointsAdjustmentRequest,
    responses(
        (status = 201, description = "Ledger entry created", body = ContributionEntryResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Member not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn admin_adjust_points(
    State(state): State<AppState>,
    _admin: RequiresAdmin,
    Path(id): Path<UserId>,
    Json(request): Json<PointsAdjustmentRequest>,
) -> Result<(axum::http::StatusCode, Json<ContributionEntryResponse>)> {
    {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        Users::new(&mut conn).get_by_id(id).await?.ok_or_else(|| Error::NotFound {
            resource: "User".to_string(),
            id: id.to_string(),
        })?;
    }

    let description = request.description.or_else(|| Some("Admin manual adjustment".to_string()));
    let entry = scoring::adjust_manual(&state.db, id, request.points, description).await?;

    Ok((axum::http::StatusCode::CREATED, Json(ContributionEntryResponse::from(entry))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use serde_json::json;
    use sqlx::PgPool;

    #[test]
    fn test_referral_url_validation() {
        assert!(validate_referral_url("https://partner.example/r/abc").is_ok());
        assert!(validate_referral_url("http://partner.example").is_ok());
        assert!(validate_referral_url("ftp://partner.example").is_err());
        assert!(validate_referral_url("javascript:alert(1)").is_err());
        assert!(validate_referral_url("not a url").is_err());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_me_requires_authentication(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        app.get("/api/v1/users/me").await.assert_status_unauthorized();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_me_sets_referral_url(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, false).await;
        let (name, value) = auth_cookie(&user);

        let response = app
            .patch("/api/v1/users/me")
            .add_header(name, value)
            .json(&json!({ "referral_url": "https://partner.example/r/mine" }))
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["referral_url"], "https://partner.example/r/mine");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_me_rejects_non_http_url(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, false).await;
        let (name, value) = auth_cookie(&user);

        let response = app
            .patch("/api/v1/users/me")
            .add_header(name, value)
            .json(&json!({ "referral_url": "javascript:alert(1)" }))
            .await;

        response.assert_status_bad_request();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_admin_routes_reject_regular_members(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, false).await;
        let target = create_test_user(&pool, false).await;
        let (name, value) = auth_cookie(&user);

        let response = app
            .patch(&format!("/api/v1/admin/users/{}", target.id))
            .add_header(name, value)
            .json(&json!({ "is_admin": true }))
            .await;

        response.assert_status_forbidden();

        // No side effect
        let is_admin = sqlx::query_scalar::<_, bool>("SELECT is_admin FROM users WHERE id = $1")
            .bind(target.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert!(!is_admin);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_admin_can_toggle_admin_flag(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, true).await;
        let target = create_test_user(&pool, false).await;
        let (name, value) = auth_cookie(&admin);

        let response = app
            .patch(&format!("/api/v1/admin/users/{}", target.id))
            .add_header(name, value)
            .json(&json!({ "is_admin": true }))
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["is_admin"], true);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_admin_point_adjustment_writes_ledger(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, true).await;
        let target = create_test_user(&pool, false).await;
        let (name, value) = auth_cookie(&admin);

        let response = app
            .post(&format!("/api/v1/admin/users/{}/points", target.id))
            .add_header(name, value)
            .json(&json!({ "points": -7 }))
            .await;

        response.assert_status(axum::http::StatusCode::CREATED);
        let body: serde_json::Value = response.json();
        assert_eq!(body["action"], "manual_adjust_sub");
        assert_eq!(body["points"], -7);

        let points = sqlx::query_scalar::<_, i64>("SELECT contribution_points FROM users WHERE id = $1")
            .bind(target.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(points, -7);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_leaderboard_is_public(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        create_test_user(&pool, false).await;

        let response = app.get("/api/v1/leaderboard").await;
        response.assert_status_ok();
        let body: Vec<serde_json::Value> = response.json();
        assert_eq!(body.len(), 1);
        assert_eq!(body[0]["rank"], 1);
    }
}
