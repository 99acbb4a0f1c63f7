//! Database repository for post/comment likes.

use crate::db::errors::{DbError, Result};
use crate::types::{abbrev_uuid, UserId};
use sqlx::{Connection, FromRow, PgConnection};
use tracing::instrument;
use uuid::Uuid;

/// What a like points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeTarget {
    Post,
    Comment,
}

impl LikeTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            LikeTarget::Post => "post",
            LikeTarget::Comment => "comment",
        }
    }
}

/// Result of a toggle: whether the like now exists, the target's new counter
/// value, and the target's author (so the caller can credit points on a fresh
/// like).
#[derive(Debug, Clone, Copy)]
pub struct ToggleResultDB {
    pub liked: bool,
    pub likes_count: i64,
    pub owner_id: UserId,
}

#[derive(Debug, FromRow)]
struct CounterRow {
    likes_count: i64,
    user_id: UserId,
}

pub struct Likes<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Likes<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Toggle a like. The like row and the denormalized counter on the target
    /// move together in one transaction; a missing target is NotFound.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id), target = target.as_str()), err)]
    pub async fn toggle(&mut self, user_id: UserId, target: LikeTarget, target_id: Uuid) -> Result<ToggleResultDB> {
        let mut tx = self.db.begin().await?;

        let existing = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM likes WHERE user_id = $1 AND target_type = $2 AND target_id = $3",
        )
        .bind(user_id)
        .bind(target.as_str())
        .bind(target_id)
        .fetch_optional(&mut *tx)
        .await?;

        let delta: i64 = if existing.is_some() { -1 } else { 1 };

        // Touch the counter first: this also verifies the target exists and
        // tells us whose content was liked.
        let counter_sql = match target {
            LikeTarget::Post => {
                "UPDATE posts SET likes_count = likes_count + $2, updated_at = NOW() WHERE id = $1 RETURNING likes_count, user_id"
            }
            LikeTarget::Comment => "UPDATE comments SET likes_count = likes_count + $2 WHERE id = $1 RETURNING likes_count, user_id",
        };
        let counter = sqlx::query_as::<_, CounterRow>(counter_sql)
            .bind(target_id)
            .bind(delta)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(DbError::NotFound)?;

        match existing {
            Some(like_id) => {
                sqlx::query("DELETE FROM likes WHERE id = $1").bind(like_id).execute(&mut *tx).await?;
            }
            None => {
                sqlx::query("INSERT INTO likes (id, user_id, target_type, target_id) VALUES ($1, $2, $3, $4)")
                    .bind(Uuid::new_v4())
                    .bind(user_id)
                    .bind(target.as_str())
                    .bind(target_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;

        Ok(ToggleResultDB {
            liked: existing.is_none(),
            likes_count: counter.likes_count,
            owner_id: counter.user_id,
        })
    }
}
