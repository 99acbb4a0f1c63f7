//! Notification endpoints for the authenticated member.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};

use crate::{
    api::models::{
        notifications::{NotificationListResponse, NotificationResponse},
        pagination::Pagination,
        users::CurrentUser,
    },
    db::handlers::Notifications,
    errors::{Error, Result},
    types::NotificationId,
    AppState,
};

/// List the caller's notifications with the unread badge count
#[utoipa::path(
    get,
    path = "/notifications",
    tag = "notifications",
    params(Pagination),
    responses(
        (status = 200, description = "Notifications, newest first", body = NotificationListResponse),
        (status = 401, description = "Unauthorized"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_notifications(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(pagination): Query<Pagination>,
) -> Result<Json<NotificationListResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Notifications::new(&mut conn);

    let notifications = repo.list_for_user(current_user.id, pagination.skip(), pagination.limit()).await?;
    let unread_count = repo.unread_count(current_user.id).await?;

    Ok(Json(NotificationListResponse {
        data: notifications.into_iter().map(NotificationResponse::from).collect(),
        unread_count,
    }))
}

/// Mark one notification read
#[utoipa::path(
    post,
    path = "/notifications/{id}/read",
    tag = "notifications",
    params(("id" = Uuid, Path, description = "Notification ID")),
    responses(
        (status = 204, description = "Marked read"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Not the caller's notification"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<NotificationId>,
) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let marked = Notifications::new(&mut conn).mark_read(id, current_user.id).await?;
    if !marked {
        return Err(Error::NotFound {
            resource: "Notification".to_string(),
            id: id.to_string(),
        });
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Mark all of the caller's notifications read
#[utoipa::path(
    post,
    path = "/notifications/read-all",
    tag = "notifications",
    responses(
        (status = 204, description = "All marked read"),
        (status = 401, description = "Unauthorized"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn mark_all_notifications_read(State(state): State<AppState>, current_user: CurrentUser) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    Notifications::new(&mut conn).mark_all_read(current_user.id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::db::handlers::Notifications;
    use crate::db::models::notifications::{kinds, NotificationCreateDBRequest};
    use crate::test_utils::*;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_and_mark_read_flow(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, false).await;
        let (name, value) = auth_cookie(&user);

        let mut conn = pool.acquire().await.unwrap();
        let created = Notifications::new(&mut conn)
            .create(&NotificationCreateDBRequest {
                user_id: user.id,
                kind: kinds::SYSTEM.to_string(),
                title: "Welcome".to_string(),
                content: None,
                link: None,
            })
            .await
            .unwrap();
        drop(conn);

        let body: serde_json::Value = app.get("/api/v1/notifications").add_header(name.clone(), value.clone()).await.json();
        assert_eq!(body["unread_count"], 1);
        assert_eq!(body["data"][0]["title"], "Welcome");

        app.post(&format!("/api/v1/notifications/{}/read", created.id))
            .add_header(name.clone(), value.clone())
            .await
            .assert_status(axum::http::StatusCode::NO_CONTENT);

        let body: serde_json::Value = app.get("/api/v1/notifications").add_header(name, value).await.json();
        assert_eq!(body["unread_count"], 0);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_cannot_mark_other_members_notification(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        let owner = create_test_user(&pool, false).await;
        let other = create_test_user(&pool, false).await;

        let mut conn = pool.acquire().await.unwrap();
        let created = Notifications::new(&mut conn)
            .create(&NotificationCreateDBRequest {
                user_id: owner.id,
                kind: kinds::SYSTEM.to_string(),
                title: "Private".to_string(),
                content: None,
                link: None,
            })
            .await
            .unwrap();
        drop(conn);

        let (name, value) = auth_cookie(&other);
        app.post(&format!("/api/v1/notifications/{}/read", created.id))
            .add_header(name, value)
            .await
            .assert_status_not_found();
    }
}
