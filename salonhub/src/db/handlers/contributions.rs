//! Database repository for the contribution points ledger.
//!
//! The ledger pairs an append-only audit trail (`contribution_history`) with a
//! denormalized counter on `users`. The two are written in one transaction and
//! the counter uses an atomic in-database increment, so concurrent credits for
//! the same member never lose updates.

use crate::db::{
    errors::{DbError, Result},
    models::contributions::{ContributionEntryCreateDBRequest, ContributionEntryDBResponse},
};
use crate::types::{abbrev_uuid, UserId};
use sqlx::{Connection, PgConnection};
use tracing::instrument;

pub struct Contributions<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Contributions<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Append one audit row and apply the delta to the member's cumulative
    /// counter. Both happen or neither does.
    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id), action = %request.action), err)]
    pub async fn record(&mut self, request: &ContributionEntryCreateDBRequest) -> Result<ContributionEntryDBResponse> {
        let mut tx = self.db.begin().await?;

        let entry = sqlx::query_as::<_, ContributionEntryDBResponse>(
            r#"
            INSERT INTO contribution_history (user_id, action, points, description)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(request.user_id)
        .bind(&request.action)
        .bind(request.points)
        .bind(&request.description)
        .fetch_one(&mut *tx)
        .await?;

        // Atomic increment: no read-then-write, so concurrent credits cannot
        // clobber each other.
        let updated = sqlx::query(
            "UPDATE users SET contribution_points = contribution_points + $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(request.user_id)
        .bind(request.points)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        tx.commit().await?;

        Ok(entry)
    }

    /// A member's ledger, newest first.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn list_for_user(&mut self, user_id: UserId, skip: i64, limit: i64) -> Result<Vec<ContributionEntryDBResponse>> {
        let entries = sqlx::query_as::<_, ContributionEntryDBResponse>(
            r#"
            SELECT * FROM contribution_history
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            OFFSET $2
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(skip)
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(entries)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn count_for_user(&mut self, user_id: UserId) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM contribution_history WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::{Repository, Users};
    use crate::db::models::users::UserCreateDBRequest;
    use sqlx::PgPool;
    use uuid::Uuid;

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

    #[sqlx::test]
    #[test_log::test]
    async fn test_record_appends_history_and_increments_counter(pool: PgPool) {
        let user_id = create_member(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Contributions::new(&mut conn);

        let entry = repo
            .record(&ContributionEntryCreateDBRequest {
                user_id,
                action: "best_answer".to_string(),
                points: 30,
                description: None,
            })
            .await
            .unwrap();

        assert_eq!(entry.action, "best_answer");
        assert_eq!(entry.points, 30);

        let points = sqlx::query_scalar::<_, i64>("SELECT contribution_points FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(points, 30);
        assert_eq!(repo.count_for_user(user_id).await.unwrap(), 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_negative_delta_removes_points(pool: PgPool) {
        let user_id = create_member(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Contributions::new(&mut conn);

        for (action, points) in [("post_create", 5_i64), ("manual_adjust_sub", -3)] {
            repo.record(&ContributionEntryCreateDBRequest {
                user_id,
                action: action.to_string(),
                points,
                description: None,
            })
            .await
            .unwrap();
        }

        let points = sqlx::query_scalar::<_, i64>("SELECT contribution_points FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(points, 2);

        let entries = repo.list_for_user(user_id, 0, 10).await.unwrap();
        assert_eq!(entries.len(), 2);
        // Newest first
        assert_eq!(entries[0].action, "manual_adjust_sub");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_record_for_unknown_user_fails_without_history(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Contributions::new(&mut conn);

        let err = repo
            .record(&ContributionEntryCreateDBRequest {
                user_id: Uuid::new_v4(),
                action: "post_create".to_string(),
                points: 5,
                description: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));

        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM contribution_history")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
