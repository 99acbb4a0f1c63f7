//! Contribution scoring: the ledger updater in front of the repositories.
//!
//! Community handlers call [`award_action_best_effort`] after their primary
//! mutation commits. Points are a side effect, never a transactional
//! requirement: a ledger failure is logged and the post/comment/like that
//! triggered it still succeeds. Point values come from the admin-editable
//! `contribution_points` settings record, read fresh per operation.

use sqlx::PgPool;
use tracing::instrument;

use crate::{
    db::{
        errors::{DbError, Result},
        handlers::{Contributions, Settings},
        models::contributions::{ContributionEntryCreateDBRequest, ContributionEntryDBResponse},
    },
    types::{abbrev_uuid, UserId},
};

/// Ledger actions for admin manual adjustments.
pub const MANUAL_ADJUST_ADD: &str = "manual_adjust_add";
pub const MANUAL_ADJUST_SUB: &str = "manual_adjust_sub";

/// Credit a named community action at its configured point value.
#[instrument(skip(db, description), fields(user_id = %abbrev_uuid(&user_id), action), err)]
pub async fn award_action(db: &PgPool, user_id: UserId, action: &str, description: Option<String>) -> Result<ContributionEntryDBResponse> {
    let mut conn = db.acquire().await.map_err(DbError::from)?;

    let points = Settings::new(&mut conn).contribution_points().await?.points_for(action);

    Contributions::new(&mut conn)
        .record(&ContributionEntryCreateDBRequest {
            user_id,
            action: action.to_string(),
            points,
            description,
        })
        .await
}

/// [`award_action`], but a failure is logged instead of propagated. Use this
/// from handlers whose primary action must not be blocked by point crediting.
pub async fn award_action_best_effort(db: &PgPool, user_id: UserId, action: &str, description: Option<String>) {
    if let Err(e) = award_action(db, user_id, action, description).await {
        tracing::warn!("Failed to credit '{action}' points to {}: {e}", abbrev_uuid(&user_id));
    }
}

/// Admin manual adjustment: a signed delta recorded through the same ledger as
/// everything else so it shows up in the audit trail.
#[instrument(skip(db, description), fields(user_id = %abbrev_uuid(&user_id), points), err)]
pub async fn adjust_manual(db: &PgPool, user_id: UserId, points: i64, description: Option<String>) -> Result<ContributionEntryDBResponse> {
    let action = if points >= 0 { MANUAL_ADJUST_ADD } else { MANUAL_ADJUST_SUB };

    let mut conn = db.acquire().await.map_err(DbError::from)?;
    Contributions::new(&mut conn)
        .record(&ContributionEntryCreateDBRequest {
            user_id,
            action: action.to_string(),
            points,
            description,
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::{Repository, Settings, Users};
    use crate::db::models::{settings::ContributionPointsSettings, users::UserCreateDBRequest};
    use sqlx::PgPool;
    use uuid::Uuid;

    async fn create_member(pool: &PgPool) -> UserId {
        let mut conn = pool.acquire().await.unwrap();
        Users::new(&mut conn)
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

    async fn points_of(pool: &PgPool, user_id: UserId) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT contribution_points FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_best_answer_credits_thirty_points_with_one_audit_row(pool: PgPool) {
        let user_id = create_member(&pool).await;
        assert_eq!(points_of(&pool, user_id).await, 0);

        let entry = award_action(&pool, user_id, "best_answer", None).await.unwrap();
        assert_eq!(entry.action, "best_answer");
        assert_eq!(entry.points, 30);

        assert_eq!(points_of(&pool, user_id).await, 30);

        let mut conn = pool.acquire().await.unwrap();
        let history = Contributions::new(&mut conn).list_for_user(user_id, 0, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, "best_answer");
        assert_eq!(history[0].points, 30);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_award_uses_configured_point_values(pool: PgPool) {
        let user_id = create_member(&pool).await;

        let mut conn = pool.acquire().await.unwrap();
        let mut table = ContributionPointsSettings::default();
        table.0.insert("post_create".to_string(), 8);
        Settings::new(&mut conn).upsert_contribution_points(&table).await.unwrap();
        drop(conn);

        let entry = award_action(&pool, user_id, "post_create", None).await.unwrap();
        assert_eq!(entry.points, 8);
        assert_eq!(points_of(&pool, user_id).await, 8);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_manual_adjustment_picks_action_by_sign(pool: PgPool) {
        let user_id = create_member(&pool).await;

        let add = adjust_manual(&pool, user_id, 15, Some("Admin manual adjustment".to_string())).await.unwrap();
        assert_eq!(add.action, MANUAL_ADJUST_ADD);

        let sub = adjust_manual(&pool, user_id, -5, Some("Admin manual adjustment".to_string())).await.unwrap();
        assert_eq!(sub.action, MANUAL_ADJUST_SUB);

        assert_eq!(points_of(&pool, user_id).await, 10);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_best_effort_award_swallows_failures(pool: PgPool) {
        // Unknown member: the underlying record fails, but nothing propagates
        award_action_best_effort(&pool, Uuid::new_v4(), "post_create", None).await;
    }
}
