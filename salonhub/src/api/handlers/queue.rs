//! Admin endpoints for the organic queue and the overview dashboard.

use axum::{
    extract::{Path, State},
    response::Json,
};

use crate::{
    api::models::queue::{AdminQueueResponse, AdminStatsResponse, PlacementResponse, QueueItemResponse, QueueStatsResponse},
    auth::RequiresAdmin,
    db::handlers::{Comments, Posts, Queue, Users},
    errors::{Error, Result},
    placement,
    types::QueueItemId,
    AppState,
};

/// How many arrivals the admin queue view shows.
const RECENT_QUEUE_LIMIT: i64 = 20;

/// Queue counters and the latest arrivals (admin only)
#[utoipa::path(
    get,
    path = "/admin/queue",
    tag = "admin",
    responses(
        (status = 200, description = "Queue stats and recent arrivals", body = AdminQueueResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn admin_queue_view(State(state): State<AppState>, _admin: RequiresAdmin) -> Result<Json<AdminQueueResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Queue::new(&mut conn);

    let stats = repo.stats().await?;
    let items = repo.list_recent(RECENT_QUEUE_LIMIT).await?;

    Ok(Json(AdminQueueResponse {
        stats: QueueStatsResponse::from(stats),
        items: items.into_iter().map(QueueItemResponse::from).collect(),
    }))
}

/// Manually run placement for one queue item (admin only)
#[utoipa::path(
    post,
    path = "/admin/queue/{id}/assign",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Queue item ID")),
    responses(
        (status = 200, description = "Placement executed; assigned_to is null when no pool member was eligible", body = PlacementResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Queue item not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn admin_assign_queue_item(
    State(state): State<AppState>,
    _admin: RequiresAdmin,
    Path(id): Path<QueueItemId>,
) -> Result<Json<PlacementResponse>> {
    let assigned_to = placement::execute_auto_placement(&state.db, id).await.map_err(|e| match e {
        crate::db::errors::DbError::NotFound => Error::NotFound {
            resource: "Queue item".to_string(),
            id: id.to_string(),
        },
        other => Error::Database(other),
    })?;

    Ok(Json(PlacementResponse { assigned_to }))
}

/// Overview counters for the admin dashboard (admin only)
#[utoipa::path(
    get,
    path = "/admin/stats",
    tag = "admin",
    responses(
        (status = 200, description = "Site-wide counters", body = AdminStatsResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin only"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn admin_stats(State(state): State<AppState>, _admin: RequiresAdmin) -> Result<Json<AdminStatsResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let user_counts = Users::new(&mut conn).counts().await?;
    let mut queue_repo = Queue::new(&mut conn);
    let queue_stats = queue_repo.stats().await?;
    let placements_today = queue_repo.placements_today().await?;
    let total_posts = Posts::new(&mut conn).count_all().await?;
    let total_comments = Comments::new(&mut conn).count_all().await?;

    Ok(Json(AdminStatsResponse {
        total_users: user_counts.total_users,
        new_users_today: user_counts.new_today,
        new_users_week: user_counts.new_week,
        new_users_month: user_counts.new_month,
        pending_queue: queue_stats.pending,
        placements_today,
        total_posts,
        total_comments,
    }))
}

#[cfg(test)]
mod tests {
    use crate::test_utils::*;
    use sqlx::PgPool;
    use uuid::Uuid;

    #[sqlx::test]
    #[test_log::test]
    async fn test_queue_view_requires_admin(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, false).await;
        let (name, value) = auth_cookie(&user);

        app.get("/api/v1/admin/queue").await.assert_status_unauthorized();
        app.get("/api/v1/admin/queue").add_header(name, value).await.assert_status_forbidden();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_manual_assignment_resolves_pending_item(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, true).await;
        let member = create_eligible_member(&pool, false, "https://partner.example/r/m").await;
        set_admin_ratio(&pool, 0.0).await;

        // An organic visit with no eligible members at the time would stay
        // pending; seed one directly
        let queue_id = enqueue_visitor(&pool).await;

        let (name, value) = auth_cookie(&admin);
        let response = app
            .post(&format!("/api/v1/admin/queue/{queue_id}/assign"))
            .add_header(name.clone(), value.clone())
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["assigned_to"], member.id.to_string());

        // Queue view reflects the assignment
        let view: serde_json::Value = app.get("/api/v1/admin/queue").add_header(name, value).await.json();
        assert_eq!(view["stats"]["assigned"], 1);
        assert_eq!(view["items"][0]["status"], "assigned");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_manual_assignment_unknown_item_is_404(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, true).await;
        let (name, value) = auth_cookie(&admin);

        app.post(&format!("/api/v1/admin/queue/{}/assign", Uuid::new_v4()))
            .add_header(name, value)
            .await
            .assert_status_not_found();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_admin_stats_counts(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, true).await;
        create_test_user(&pool, false).await;
        enqueue_visitor(&pool).await;

        let (name, value) = auth_cookie(&admin);
        let body: serde_json::Value = app.get("/api/v1/admin/stats").add_header(name, value).await.json();

        assert_eq!(body["total_users"], 2);
        assert_eq!(body["pending_queue"], 1);
        assert_eq!(body["placements_today"], 0);
        assert_eq!(body["total_posts"], 0);
    }
}
