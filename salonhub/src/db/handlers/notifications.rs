//! Database repository for member notifications.

use crate::db::{
    errors::Result,
    models::notifications::{NotificationCreateDBRequest, NotificationDBResponse},
};
use crate::types::{abbrev_uuid, NotificationId, UserId};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

pub struct Notifications<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Notifications<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id), kind = %request.kind), err)]
    pub async fn create(&mut self, request: &NotificationCreateDBRequest) -> Result<NotificationDBResponse> {
        let notification = sqlx::query_as::<_, NotificationDBResponse>(
            r#"
            INSERT INTO notifications (id, user_id, kind, title, content, link)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.user_id)
        .bind(&request.kind)
        .bind(&request.title)
        .bind(&request.content)
        .bind(&request.link)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(notification)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn list_for_user(&mut self, user_id: UserId, skip: i64, limit: i64) -> Result<Vec<NotificationDBResponse>> {
        let notifications = sqlx::query_as::<_, NotificationDBResponse>(
            r#"
            SELECT * FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            OFFSET $2
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(skip)
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(notifications)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn unread_count(&mut self, user_id: UserId) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT is_read")
            .bind(user_id)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(count)
    }

    /// Mark one notification read. Scoped to the owner so a member cannot
    /// touch someone else's notifications.
    #[instrument(skip(self), fields(notification_id = %abbrev_uuid(&id), user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn mark_read(&mut self, id: NotificationId, user_id: UserId) -> Result<bool> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn mark_all_read(&mut self, user_id: UserId) -> Result<u64> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND NOT is_read")
            .bind(user_id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::{Repository, Users};
    use crate::db::models::{notifications::kinds, users::UserCreateDBRequest};
    use sqlx::PgPool;

    async fn create_member(pool: &PgPool) -> UserId {
        let mut conn = pool.acquire().await.unwrap();
        let mut users = Users::new(&mut conn);
        users
            .create(&UserCreateDBRequest {
                email: format!("{}@example.com", Uuid::new_v4()),
                display_name: None,
                password_hash: None,
                referral_code: crate::auth::utils::generate_referral_code(),
                referrer_id: None,
                is_admin: false,
            })
            .await
            .unwrap()
            .id
    }

    fn notification(user_id: UserId) -> NotificationCreateDBRequest {
        NotificationCreateDBRequest {
            user_id,
            kind: kinds::COMMENT.to_string(),
            title: "New answer on your question".to_string(),
            content: None,
            link: Some("/feed/123".to_string()),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_mark_read_is_scoped_to_owner(pool: PgPool) {
        let owner = create_member(&pool).await;
        let other = create_member(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Notifications::new(&mut conn);

        let created = repo.create(&notification(owner)).await.unwrap();
        assert_eq!(repo.unread_count(owner).await.unwrap(), 1);

        // Someone else cannot mark it read
        assert!(!repo.mark_read(created.id, other).await.unwrap());
        assert_eq!(repo.unread_count(owner).await.unwrap(), 1);

        assert!(repo.mark_read(created.id, owner).await.unwrap());
        assert_eq!(repo.unread_count(owner).await.unwrap(), 0);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_mark_all_read(pool: PgPool) {
        let owner = create_member(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Notifications::new(&mut conn);

        repo.create(&notification(owner)).await.unwrap();
        repo.create(&notification(owner)).await.unwrap();

        assert_eq!(repo.mark_all_read(owner).await.unwrap(), 2);
        assert_eq!(repo.unread_count(owner).await.unwrap(), 0);
    }
}
