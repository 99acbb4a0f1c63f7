//! Organic-visitor auto-placement.
//!
//! An anonymous arrival sits in `organic_queue` as `pending` until the
//! selector routes it to a member: with probability `admin_ratio` the eligible
//! pool is restricted to admins, otherwise to general members, and within the
//! chosen pool one member with a non-empty outbound referral URL is picked
//! uniformly at random.
//!
//! The status transition and the chosen member's `total_downlines` increment
//! commit as one transaction, so the counter always equals the number of queue
//! items assigned to that member. Re-running the selector on an already
//! assigned item is a no-op that returns the existing assignee.

use rand::prelude::RngExt;
use rand::rng;
use sqlx::{FromRow, PgPool};
use tracing::instrument;

use crate::{
    db::{
        errors::{DbError, Result},
        handlers::{Notifications, Settings, Users},
        models::{
            notifications::{kinds, NotificationCreateDBRequest},
            queue::QueueStatus,
        },
    },
    types::{abbrev_uuid, QueueItemId, UserId},
};

/// Which pool the ratio coin flip selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementPool {
    Admin,
    General,
}

/// Flip the weighted coin: admin pool with probability `admin_ratio`.
///
/// The ratio must already be clamped into [0, 1]; the settings repository
/// guarantees that for stored records.
pub fn choose_pool<R: RngExt + ?Sized>(rng: &mut R, admin_ratio: f64) -> PlacementPool {
    if rng.random_bool(admin_ratio) {
        PlacementPool::Admin
    } else {
        PlacementPool::General
    }
}

/// Uniform pick over the candidate slice.
pub fn pick_uniform<'a, T, R: RngExt + ?Sized>(rng: &mut R, candidates: &'a [T]) -> Option<&'a T> {
    if candidates.is_empty() {
        None
    } else {
        Some(&candidates[rng.random_range(0..candidates.len())])
    }
}

#[derive(Debug, FromRow)]
struct LockedQueueItem {
    status: QueueStatus,
    assigned_to: Option<UserId>,
}

/// Assign one pending queue item to an eligible member.
///
/// Returns the assigned member's id, `None` when the chosen pool is empty (the
/// item stays `pending` and can be re-triggered later), or `DbError::NotFound`
/// for an unknown item id.
#[instrument(skip(db), fields(queue_id = %abbrev_uuid(&queue_id)), err)]
pub async fn execute_auto_placement(db: &PgPool, queue_id: QueueItemId) -> Result<Option<UserId>> {
    let mut tx = db.begin().await.map_err(DbError::from)?;

    // Row lock: a concurrent invocation on the same item waits here and then
    // sees the assigned status below.
    let item = sqlx::query_as::<_, LockedQueueItem>("SELECT status, assigned_to FROM organic_queue WHERE id = $1 FOR UPDATE")
        .bind(queue_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::NotFound)?;

    match item.status {
        QueueStatus::Pending => {}
        // Already assigned: idempotent no-op, hand back the existing assignee
        QueueStatus::Assigned => return Ok(item.assigned_to),
        // Expired/converted items are out of the selector's hands
        QueueStatus::Expired | QueueStatus::Converted => return Ok(None),
    }

    // Settings are read fresh inside the transaction; nothing is cached
    // process-wide, so an admin ratio change applies to the very next arrival.
    let ratio = Settings::new(&mut tx).placement().await?.admin_ratio;
    let admin_pool = choose_pool(&mut rng(), ratio) == PlacementPool::Admin;

    let candidates = Users::new(&mut tx).placement_candidates(admin_pool).await?;
    let Some(&chosen) = pick_uniform(&mut rng(), &candidates) else {
        // Empty pool: the item stays pending for a later (manual) re-trigger
        tx.commit().await.map_err(DbError::from)?;
        return Ok(None);
    };

    sqlx::query(
        "UPDATE organic_queue SET status = 'assigned', assigned_to = $2, assigned_at = NOW() WHERE id = $1 AND status = 'pending'",
    )
    .bind(queue_id)
    .bind(chosen)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE users SET total_downlines = total_downlines + 1, updated_at = NOW() WHERE id = $1")
        .bind(chosen)
        .execute(&mut *tx)
        .await?;

    tx.commit().await.map_err(DbError::from)?;

    notify_placement(db, chosen).await;

    Ok(Some(chosen))
}

/// Tell the member about their new downline. Best-effort: the placement has
/// already committed and must not be unwound by a notification failure.
async fn notify_placement(db: &PgPool, user_id: UserId) {
    let request = NotificationCreateDBRequest {
        user_id,
        kind: kinds::PLACEMENT.to_string(),
        title: "An organic visitor was placed with you".to_string(),
        content: None,
        link: Some("/settings".to_string()),
    };

    let result = match db.acquire().await {
        Ok(mut conn) => Notifications::new(&mut conn).create(&request).await.map(|_| ()),
        Err(e) => Err(DbError::from(e)),
    };

    if let Err(e) = result {
        tracing::warn!("Failed to create placement notification for {}: {e}", abbrev_uuid(&user_id));
    }
}
