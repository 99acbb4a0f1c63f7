//! API models for member accounts.

use crate::db::models::users::{LeaderboardRowDB, UserDBResponse, UserStatsDB};
use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The authenticated caller, reconstructed from the session cookie.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    #[schema(value_type = Uuid)]
    pub id: UserId,
    pub email: String,
    pub display_name: Option<String>,
    pub is_admin: bool,
}

/// Public view of a member account. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    #[schema(value_type = Uuid)]
    pub id: UserId,
    pub email: String,
    pub display_name: Option<String>,
    pub referral_url: Option<String>,
    pub referral_code: String,
    pub contribution_points: i64,
    pub total_downlines: i64,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<UserDBResponse> for UserResponse {
    fn from(user: UserDBResponse) -> Self {
        Self {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
            referral_url: user.referral_url,
            referral_code: user.referral_code,
            contribution_points: user.contribution_points,
            total_downlines: user.total_downlines,
            is_admin: user.is_admin,
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        }
    }
}

impl From<UserResponse> for CurrentUser {
    fn from(user: UserResponse) -> Self {
        Self {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
            is_admin: user.is_admin,
        }
    }
}

/// One row of the contribution leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeaderboardEntry {
    #[schema(value_type = Uuid)]
    pub id: UserId,
    pub display_name: Option<String>,
    pub contribution_points: i64,
    pub total_downlines: i64,
    pub rank: i64,
}

impl From<LeaderboardRowDB> for LeaderboardEntry {
    fn from(row: LeaderboardRowDB) -> Self {
        Self {
            id: row.id,
            display_name: row.display_name,
            contribution_points: row.contribution_points,
            total_downlines: row.total_downlines,
            rank: row.rank,
        }
    }
}

/// Aggregated profile stats shown on the member settings page.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserStatsResponse {
    pub contribution_points: i64,
    pub total_downlines: i64,
    pub posts_count: i64,
    pub comments_count: i64,
    pub best_answers_count: i64,
    pub rank: i64,
}

impl From<UserStatsDB> for UserStatsResponse {
    fn from(stats: UserStatsDB) -> Self {
        Self {
            contribution_points: stats.contribution_points,
            total_downlines: stats.total_downlines,
            posts_count: stats.posts_count,
            comments_count: stats.comments_count,
            best_answers_count: stats.best_answers_count,
            rank: stats.rank,
        }
    }
}

/// Self-service profile update.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ProfileUpdateRequest {
    pub display_name: Option<String>,
    /// Outbound referral destination; must be an http(s) URL
    pub referral_url: Option<String>,
}

/// Admin-only update of another member.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AdminUserUpdateRequest {
    pub is_admin: bool,
}

/// Admin manual point adjustment; the sign decides the ledger action.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PointsAdjustmentRequest {
    pub points: i64,
    pub description: Option<String>,
}

/// One ledger line in a member's contribution history.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContributionEntryResponse {
    pub id: i64,
    pub action: String,
    pub points: i64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<crate::db::models::contributions::ContributionEntryDBResponse> for ContributionEntryResponse {
    fn from(entry: crate::db::models::contributions::ContributionEntryDBResponse) -> Self {
        Self {
            id: entry.id,
            action: entry.action,
            points: entry.points,
            description: entry.description,
            created_at: entry.created_at,
        }
    }
}
