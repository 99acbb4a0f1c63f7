//! Settings endpoints: the placement ratio and the contribution point table.
//!
//! Reads are open to any authenticated member; writes are admin-only and
//! replace the whole record (last write wins).

use axum::{extract::State, response::Json};

use crate::{
    api::models::users::CurrentUser,
    auth::RequiresAdmin,
    db::{
        handlers::Settings,
        models::settings::{ContributionPointsSettings, PlacementSettings},
    },
    errors::{Error, Result},
    AppState,
};

/// Read the placement settings
#[utoipa::path(
    get,
    path = "/settings/placement",
    tag = "settings",
    responses(
        (status = 200, description = "Current placement settings", body = PlacementSettings),
        (status = 401, description = "Unauthorized"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_placement_settings(State(state): State<AppState>, _current_user: CurrentUser) -> Result<Json<PlacementSettings>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let settings = Settings::new(&mut conn).placement().await?;

    Ok(Json(settings))
}

/// Replace the placement settings (admin only)
#[utoipa::path(
    put,
    path = "/settings/placement",
    tag = "settings",
    request_body = PlacementSettings,
    responses(
        (status = 200, description = "Stored settings (ratio clamped into [0, 1])", body = PlacementSettings),
        (status = 400, description = "Ratio is not a number"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn put_placement_settings(
    State(state): State<AppState>,
    _admin: RequiresAdmin,
    Json(request): Json<PlacementSettings>,
) -> Result<Json<PlacementSettings>> {
    if !request.admin_ratio.is_finite() {
        return Err(Error::Validation {
            field: "admin_ratio",
            message: "Enter a number between 0 and 1".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let stored = Settings::new(&mut conn).upsert_placement(request).await?;

    Ok(Json(stored))
}

/// Read the contribution point table
#[utoipa::path(
    get,
    path = "/settings/contribution-points",
    tag = "settings",
    responses(
        (status = 200, description = "Per-action point values", body = ContributionPointsSettings),
        (status = 401, description = "Unauthorized"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_contribution_points(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> Result<Json<ContributionPointsSettings>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let settings = Settings::new(&mut conn).contribution_points().await?;

    Ok(Json(settings))
}

/// Replace the contribution point table (admin only)
#[utoipa::path(
    put,
    path = "/settings/contribution-points",
    tag = "settings",
    request_body = ContributionPointsSettings,
    responses(
        (status = 200, description = "Stored table", body = ContributionPointsSettings),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn put_contribution_points(
    State(state): State<AppState>,
    _admin: RequiresAdmin,
    Json(request): Json<ContributionPointsSettings>,
) -> Result<Json<ContributionPointsSettings>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let mut repo = Settings::new(&mut conn);
    repo.upsert_contribution_points(&request).await?;
    let stored = repo.contribution_points().await?;

    Ok(Json(stored))
}

#[cfg(test)]
mod tests {
    use crate::test_utils::*;
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_non_admin_mutation_is_rejected_without_side_effect(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, false).await;
        let (name, value) = auth_cookie(&user);

        let response = app
            .put("/api/v1/settings/placement")
            .add_header(name.clone(), value.clone())
            .json(&json!({ "admin_ratio": 0.9 }))
            .await;
        response.assert_status_forbidden();

        let response = app
            .put("/api/v1/settings/contribution-points")
            .add_header(name.clone(), value.clone())
            .json(&json!({ "post_create": 100 }))
            .await;
        response.assert_status_forbidden();

        // No record was created or altered
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM settings").fetch_one(&pool).await.unwrap();
        assert_eq!(count, 0);

        // Reads still serve the defaults
        let body: serde_json::Value = app.get("/api/v1/settings/placement").add_header(name, value).await.json();
        assert_eq!(body["admin_ratio"], 0.2);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_anonymous_settings_access_is_unauthorized(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        app.get("/api/v1/settings/placement").await.assert_status_unauthorized();
        app.put("/api/v1/settings/placement")
            .json(&json!({ "admin_ratio": 0.9 }))
            .await
            .assert_status_unauthorized();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_admin_updates_ratio_with_clamping(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, true).await;
        let (name, value) = auth_cookie(&admin);

        let response = app
            .put("/api/v1/settings/placement")
            .add_header(name.clone(), value.clone())
            .json(&json!({ "admin_ratio": 2.5 }))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["admin_ratio"], 1.0);

        let body: serde_json::Value = app.get("/api/v1/settings/placement").add_header(name, value).await.json();
        assert_eq!(body["admin_ratio"], 1.0);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_admin_updates_point_table(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, true).await;
        let (name, value) = auth_cookie(&admin);

        let response = app
            .put("/api/v1/settings/contribution-points")
            .add_header(name.clone(), value.clone())
            .json(&json!({ "best_answer": 50 }))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        // Stored value wins, untouched defaults survive the merge
        assert_eq!(body["best_answer"], 50);
        assert_eq!(body["post_create"], 5);
    }
}
