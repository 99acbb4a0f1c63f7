//! Database repository for the organic visitor queue.

use crate::db::{
    errors::Result,
    models::queue::{QueueArrivalDBRequest, QueueItemDBResponse, QueueItemWithUserDB, QueueStatsDB},
};
use crate::types::{abbrev_uuid, QueueItemId};
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

pub struct Queue<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Queue<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Record one anonymous arrival as a pending entry. Attribution values go
    /// in verbatim; no validation beyond what the schema enforces.
    #[instrument(skip(self, request), fields(visitor_id = %abbrev_uuid(&request.visitor_id)), err)]
    pub async fn insert_arrival(&mut self, request: &QueueArrivalDBRequest) -> Result<QueueItemDBResponse> {
        let item = sqlx::query_as::<_, QueueItemDBResponse>(
            r#"
            INSERT INTO organic_queue (id, visitor_id, source, utm_source, utm_medium, utm_campaign)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.visitor_id)
        .bind(&request.source)
        .bind(&request.utm_source)
        .bind(&request.utm_medium)
        .bind(&request.utm_campaign)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(item)
    }

    #[instrument(skip(self), fields(queue_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: QueueItemId) -> Result<Option<QueueItemDBResponse>> {
        let item = sqlx::query_as::<_, QueueItemDBResponse>("SELECT * FROM organic_queue WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(item)
    }

    /// Latest arrivals with the assigned member's display name, for the admin
    /// queue view.
    #[instrument(skip(self), err)]
    pub async fn list_recent(&mut self, limit: i64) -> Result<Vec<QueueItemWithUserDB>> {
        let items = sqlx::query_as::<_, QueueItemWithUserDB>(
            r#"
            SELECT q.id, q.visitor_id, q.source, q.status, q.assigned_to,
                   u.display_name AS assigned_display_name,
                   q.created_at, q.assigned_at
            FROM organic_queue q
            LEFT JOIN users u ON u.id = q.assigned_to
            ORDER BY q.created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(items)
    }

    #[instrument(skip(self), err)]
    pub async fn stats(&mut self) -> Result<QueueStatsDB> {
        let stats = sqlx::query_as::<_, QueueStatsDB>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'assigned') AS assigned
            FROM organic_queue
            "#,
        )
        .fetch_one(&mut *self.db)
        .await?;

        Ok(stats)
    }

    /// Assignments made since local midnight, for the admin overview.
    #[instrument(skip(self), err)]
    pub async fn placements_today(&mut self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM organic_queue WHERE status = 'assigned' AND assigned_at >= date_trunc('day', NOW())",
        )
        .fetch_one(&mut *self.db)
        .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::queue::QueueStatus;
    use sqlx::PgPool;

    fn arrival(visitor_id: Uuid) -> QueueArrivalDBRequest {
        QueueArrivalDBRequest {
            visitor_id,
            source: Some("organic".to_string()),
            utm_source: Some("newsletter".to_string()),
            utm_medium: None,
            utm_campaign: None,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_insert_arrival_is_pending(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Queue::new(&mut conn);

        let visitor = Uuid::new_v4();
        let item = repo.insert_arrival(&arrival(visitor)).await.unwrap();

        assert_eq!(item.status, QueueStatus::Pending);
        assert_eq!(item.visitor_id, visitor);
        assert_eq!(item.source.as_deref(), Some("organic"));
        assert_eq!(item.utm_source.as_deref(), Some("newsletter"));
        assert!(item.utm_medium.is_none());
        assert!(item.assigned_to.is_none());
        assert!(item.assigned_at.is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_repeat_visits_create_separate_entries(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Queue::new(&mut conn);

        let visitor = Uuid::new_v4();
        repo.insert_arrival(&arrival(visitor)).await.unwrap();
        repo.insert_arrival(&arrival(visitor)).await.unwrap();

        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.assigned, 0);
    }
}
