//! Database repository for Q&A feed posts.

use crate::db::{
    errors::{DbError, Result},
    models::posts::{PostCreateDBRequest, PostDBResponse, PostFilter, PostSort, PostWithAuthorDB},
};
use crate::types::{abbrev_uuid, PostId};
use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

const POST_WITH_AUTHOR_COLUMNS: &str = r#"
    p.id, p.user_id, p.title, p.content, p.tags, p.is_answered,
    p.likes_count, p.comments_count, p.created_at, p.updated_at,
    u.display_name AS author_display_name,
    u.contribution_points AS author_contribution_points
"#;

pub struct Posts<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Posts<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id)), err)]
    pub async fn create(&mut self, request: &PostCreateDBRequest) -> Result<PostDBResponse> {
        let post = sqlx::query_as::<_, PostDBResponse>(
            r#"
            INSERT INTO posts (id, user_id, title, content, tags)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.user_id)
        .bind(&request.title)
        .bind(&request.content)
        .bind(&request.tags)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(post)
    }

    #[instrument(skip(self), fields(post_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: PostId) -> Result<Option<PostDBResponse>> {
        let post = sqlx::query_as::<_, PostDBResponse>("SELECT * FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(post)
    }

    #[instrument(skip(self), fields(post_id = %abbrev_uuid(&id)), err)]
    pub async fn get_with_author(&mut self, id: PostId) -> Result<Option<PostWithAuthorDB>> {
        let sql = format!(
            "SELECT {POST_WITH_AUTHOR_COLUMNS} FROM posts p INNER JOIN users u ON u.id = p.user_id WHERE p.id = $1"
        );
        let post = sqlx::query_as::<_, PostWithAuthorDB>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(post)
    }

    /// Feed listing with tag filter and sort. `Unanswered` restricts the set
    /// rather than just reordering it, matching the original feed behavior.
    #[instrument(skip(self, filter), fields(sort = ?filter.sort, tag = ?filter.tag), err)]
    pub async fn list(&mut self, filter: &PostFilter) -> Result<Vec<PostWithAuthorDB>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {POST_WITH_AUTHOR_COLUMNS} FROM posts p INNER JOIN users u ON u.id = p.user_id WHERE TRUE"
        ));

        if let Some(tag) = &filter.tag {
            qb.push(" AND ");
            qb.push_bind(tag);
            qb.push(" = ANY(p.tags)");
        }
        if filter.sort == PostSort::Unanswered {
            qb.push(" AND NOT p.is_answered");
        }

        qb.push(match filter.sort {
            PostSort::Popular => " ORDER BY p.likes_count DESC, p.comments_count DESC, p.created_at DESC",
            PostSort::Newest | PostSort::Unanswered => " ORDER BY p.created_at DESC",
        });
        qb.push(" LIMIT ");
        qb.push_bind(filter.limit);
        qb.push(" OFFSET ");
        qb.push_bind(filter.skip);

        let posts = qb.build_query_as::<PostWithAuthorDB>().fetch_all(&mut *self.db).await?;

        Ok(posts)
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &PostFilter) -> Result<i64> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM posts p WHERE TRUE");

        if let Some(tag) = &filter.tag {
            qb.push(" AND ");
            qb.push_bind(tag);
            qb.push(" = ANY(p.tags)");
        }
        if filter.sort == PostSort::Unanswered {
            qb.push(" AND NOT p.is_answered");
        }

        let count: i64 = qb.build_query_scalar().fetch_one(&mut *self.db).await?;

        Ok(count)
    }

    #[instrument(skip(self), fields(post_id = %abbrev_uuid(&id)), err)]
    pub async fn mark_answered(&mut self, id: PostId) -> Result<()> {
        let result = sqlx::query("UPDATE posts SET is_answered = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }

    #[instrument(skip(self), err)]
    pub async fn count_all(&mut self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts")
            .fetch_one(&mut *self.db)
            .await?;

        Ok(count)
    }
}
