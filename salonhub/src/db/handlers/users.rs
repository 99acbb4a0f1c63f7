//! Database repository for member accounts.

use crate::types::{abbrev_uuid, UserId};
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::users::{LeaderboardRowDB, UserCreateDBRequest, UserDBResponse, UserStatsDB, UserUpdateDBRequest},
};
use sqlx::{FromRow, PgConnection};
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing users
#[derive(Debug, Clone)]
pub struct UserFilter {
    pub skip: i64,
    pub limit: i64,
}

impl UserFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit }
    }
}

/// Signup counts for the admin overview.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct UserCountsDB {
    pub total_users: i64,
    pub new_today: i64,
    pub new_week: i64,
    pub new_month: i64,
}

pub struct Users<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Users<'c> {
    type CreateRequest = UserCreateDBRequest;
    type UpdateRequest = UserUpdateDBRequest;
    type Response = UserDBResponse;
    type Id = UserId;
    type Filter = UserFilter;

    #[instrument(skip(self, request), fields(email = %request.email), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        // Always generate a new ID for users
        let user_id = Uuid::new_v4();

        let user = sqlx::query_as::<_, UserDBResponse>(
            r#"
            INSERT INTO users (id, email, display_name, password_hash, referral_code, referrer_id, is_admin)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&request.email)
        .bind(&request.display_name)
        .bind(&request.password_hash)
        .bind(&request.referral_code)
        .bind(request.referrer_id)
        .bind(request.is_admin)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(user)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let user = sqlx::query_as::<_, UserDBResponse>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let users = sqlx::query_as::<_, UserDBResponse>("SELECT * FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2")
            .bind(filter.limit)
            .bind(filter.skip)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(users)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(&mut *self.db).await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        // Atomic update with conditional field updates
        let user = sqlx::query_as::<_, UserDBResponse>(
            r#"
            UPDATE users SET
                display_name = COALESCE($2, display_name),
                referral_url = COALESCE($3, referral_url),
                password_hash = COALESCE($4, password_hash),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.display_name)
        .bind(&request.referral_url)
        .bind(&request.password_hash)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(user)
    }
}

impl<'c> Users<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, email), err)]
    pub async fn get_by_email(&mut self, email: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, UserDBResponse>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user)
    }

    /// Look a member up by referral code. Codes are stored uppercase and
    /// matched case-insensitively, so `abc123` finds `ABC123`.
    #[instrument(skip(self, code), err)]
    pub async fn get_by_referral_code(&mut self, code: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, UserDBResponse>("SELECT * FROM users WHERE referral_code = $1")
            .bind(code.trim().to_uppercase())
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user)
    }

    /// Flip the admin flag on a member.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    pub async fn set_admin(&mut self, id: UserId, is_admin: bool) -> Result<UserDBResponse> {
        let user = sqlx::query_as::<_, UserDBResponse>(
            "UPDATE users SET is_admin = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(is_admin)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(user)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    pub async fn record_login(&mut self, id: UserId) -> Result<()> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(())
    }

    /// Members eligible for auto-placement in one pool: admin (or general)
    /// accounts with a non-empty outbound referral URL.
    #[instrument(skip(self), err)]
    pub async fn placement_candidates(&mut self, admin_pool: bool) -> Result<Vec<UserId>> {
        let ids = sqlx::query_scalar::<_, UserId>(
            "SELECT id FROM users WHERE is_admin = $1 AND referral_url IS NOT NULL AND referral_url <> ''",
        )
        .bind(admin_pool)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(ids)
    }

    /// Top members by contribution points, with ties sharing a rank.
    #[instrument(skip(self), err)]
    pub async fn leaderboard(&mut self, limit: i64) -> Result<Vec<LeaderboardRowDB>> {
        let rows = sqlx::query_as::<_, LeaderboardRowDB>(
            r#"
            SELECT id, display_name, contribution_points, total_downlines,
                   RANK() OVER (ORDER BY contribution_points DESC) AS rank
            FROM users
            ORDER BY contribution_points DESC, created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(rows)
    }

    /// Aggregated profile stats for one member.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    pub async fn stats(&mut self, id: UserId) -> Result<Option<UserStatsDB>> {
        let stats = sqlx::query_as::<_, UserStatsDB>(
            r#"
            SELECT
                u.contribution_points,
                u.total_downlines,
                (SELECT COUNT(*) FROM posts p WHERE p.user_id = u.id) AS posts_count,
                (SELECT COUNT(*) FROM comments c WHERE c.user_id = u.id) AS comments_count,
                (SELECT COUNT(*) FROM comments c WHERE c.user_id = u.id AND c.is_best_answer) AS best_answers_count,
                (SELECT COUNT(*) + 1 FROM users o WHERE o.contribution_points > u.contribution_points) AS rank
            FROM users u
            WHERE u.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(stats)
    }

    /// Signup counts for the admin overview page.
    #[instrument(skip(self), err)]
    pub async fn counts(&mut self) -> Result<UserCountsDB> {
        let counts = sqlx::query_as::<_, UserCountsDB>(
            r#"
            SELECT
                COUNT(*) AS total_users,
                COUNT(*) FILTER (WHERE created_at >= date_trunc('day', NOW())) AS new_today,
                COUNT(*) FILTER (WHERE created_at >= NOW() - INTERVAL '7 days') AS new_week,
                COUNT(*) FILTER (WHERE created_at >= NOW() - INTERVAL '30 days') AS new_month
            FROM users
            "#,
        )
        .fetch_one(&mut *self.db)
        .await?;

        Ok(counts)
    }

    #[instrument(skip(self), err)]
    pub async fn count(&mut self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *self.db)
            .await?;

        Ok(count)
    }
}
