//! Database layer models for member accounts.

use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Request to create a user row. The referral code must already be generated
/// and unique; the repository does not retry on collisions.
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub email: String,
    pub display_name: Option<String>,
    pub password_hash: Option<String>,
    pub referral_code: String,
    pub referrer_id: Option<UserId>,
    pub is_admin: bool,
}

/// Partial update applied with COALESCE semantics: `None` leaves the column
/// untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdateDBRequest {
    pub display_name: Option<String>,
    pub referral_url: Option<String>,
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserDBResponse {
    pub id: UserId,
    pub email: String,
    pub display_name: Option<String>,
    pub password_hash: Option<String>,
    pub referral_url: Option<String>,
    pub referrer_id: Option<UserId>,
    pub referral_code: String,
    pub contribution_points: i64,
    pub total_downlines: i64,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// One leaderboard row, ranked over all members by contribution points.
#[derive(Debug, Clone, FromRow)]
pub struct LeaderboardRowDB {
    pub id: UserId,
    pub display_name: Option<String>,
    pub contribution_points: i64,
    pub total_downlines: i64,
    pub rank: i64,
}

/// Aggregated per-member stats for the profile page.
#[derive(Debug, Clone, FromRow)]
pub struct UserStatsDB {
    pub contribution_points: i64,
    pub total_downlines: i64,
    pub posts_count: i64,
    pub comments_count: i64,
    pub best_answers_count: i64,
    pub rank: i64,
}
