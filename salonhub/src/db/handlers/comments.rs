//! Database repository for Q&A feed comments.

use crate::db::{
    errors::{DbError, Result},
    models::comments::{CommentCreateDBRequest, CommentDBResponse, CommentWithAuthorDB},
};
use crate::types::{abbrev_uuid, CommentId, PostId};
use sqlx::{Connection, PgConnection};
use tracing::instrument;
use uuid::Uuid;

pub struct Comments<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Comments<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Insert a comment and bump the post's denormalized comment counter in
    /// the same transaction.
    #[instrument(skip(self, request), fields(post_id = %abbrev_uuid(&request.post_id)), err)]
    pub async fn create(&mut self, request: &CommentCreateDBRequest) -> Result<CommentDBResponse> {
        let mut tx = self.db.begin().await?;

        let comment = sqlx::query_as::<_, CommentDBResponse>(
            r#"
            INSERT INTO comments (id, post_id, user_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.post_id)
        .bind(request.user_id)
        .bind(&request.content)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE posts SET comments_count = comments_count + 1, updated_at = NOW() WHERE id = $1")
            .bind(request.post_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(comment)
    }

    #[instrument(skip(self), fields(comment_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: CommentId) -> Result<Option<CommentDBResponse>> {
        let comment = sqlx::query_as::<_, CommentDBResponse>("SELECT * FROM comments WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(comment)
    }

    /// All comments on a post, oldest first, with author profile fields.
    #[instrument(skip(self), fields(post_id = %abbrev_uuid(&post_id)), err)]
    pub async fn list_for_post(&mut self, post_id: PostId) -> Result<Vec<CommentWithAuthorDB>> {
        let comments = sqlx::query_as::<_, CommentWithAuthorDB>(
            r#"
            SELECT c.id, c.post_id, c.user_id, c.content, c.is_best_answer, c.likes_count, c.created_at,
                   u.display_name AS author_display_name,
                   u.contribution_points AS author_contribution_points
            FROM comments c
            INNER JOIN users u ON u.id = c.user_id
            WHERE c.post_id = $1
            ORDER BY c.created_at ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(comments)
    }

    /// Mark one comment as the post's best answer. Any previous best answer on
    /// the post is cleared first and the post is flagged answered, all in one
    /// transaction. Returns the newly marked comment.
    #[instrument(skip(self), fields(post_id = %abbrev_uuid(&post_id), comment_id = %abbrev_uuid(&comment_id)), err)]
    pub async fn set_best_answer(&mut self, post_id: PostId, comment_id: CommentId) -> Result<CommentDBResponse> {
        let mut tx = self.db.begin().await?;

        // Reset existing best answers on the post before setting a new one
        sqlx::query("UPDATE comments SET is_best_answer = FALSE WHERE post_id = $1 AND is_best_answer")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        let comment = sqlx::query_as::<_, CommentDBResponse>(
            "UPDATE comments SET is_best_answer = TRUE WHERE id = $1 AND post_id = $2 RETURNING *",
        )
        .bind(comment_id)
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::NotFound)?;

        sqlx::query("UPDATE posts SET is_answered = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(comment)
    }

    #[instrument(skip(self), err)]
    pub async fn count_all(&mut self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comments")
            .fetch_one(&mut *self.db)
            .await?;

        Ok(count)
    }
}
