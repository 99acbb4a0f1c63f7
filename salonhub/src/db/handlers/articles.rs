//! Database repository for learning-hub articles.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::articles::{ArticleCreateDBRequest, ArticleDBResponse, ArticleFilter, ArticleUpdateDBRequest},
};
use crate::types::{abbrev_uuid, ArticleId};
use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

pub struct Articles<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Articles<'c> {
    type CreateRequest = ArticleCreateDBRequest;
    type UpdateRequest = ArticleUpdateDBRequest;
    type Response = ArticleDBResponse;
    type Id = ArticleId;
    type Filter = ArticleFilter;

    #[instrument(skip(self, request), fields(slug = %request.slug), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let article = sqlx::query_as::<_, ArticleDBResponse>(
            r#"
            INSERT INTO articles (id, title, slug, content, category, order_index, is_published)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.title)
        .bind(&request.slug)
        .bind(&request.content)
        .bind(&request.category)
        .bind(request.order_index)
        .bind(request.is_published)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(article)
    }

    #[instrument(skip(self), fields(article_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let article = sqlx::query_as::<_, ArticleDBResponse>("SELECT * FROM articles WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(article)
    }

    #[instrument(skip(self, filter), fields(category = ?filter.category), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM articles WHERE TRUE");

        if !filter.include_unpublished {
            qb.push(" AND is_published");
        }
        if let Some(category) = &filter.category {
            qb.push(" AND category = ");
            qb.push_bind(category);
        }

        qb.push(" ORDER BY category, order_index, created_at");
        qb.push(" LIMIT ");
        qb.push_bind(filter.limit);
        qb.push(" OFFSET ");
        qb.push_bind(filter.skip);

        let articles = qb.build_query_as::<ArticleDBResponse>().fetch_all(&mut *self.db).await?;

        Ok(articles)
    }

    #[instrument(skip(self), fields(article_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1").bind(id).execute(&mut *self.db).await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(article_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let article = sqlx::query_as::<_, ArticleDBResponse>(
            r#"
            UPDATE articles SET
                title = COALESCE($2, title),
                slug = COALESCE($3, slug),
                content = COALESCE($4, content),
                category = COALESCE($5, category),
                order_index = COALESCE($6, order_index),
                is_published = COALESCE($7, is_published),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.title)
        .bind(&request.slug)
        .bind(&request.content)
        .bind(&request.category)
        .bind(request.order_index)
        .bind(request.is_published)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(article)
    }
}

impl<'c> Articles<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Fetch an article by slug. The public reader only sees published ones.
    #[instrument(skip(self, slug), err)]
    pub async fn get_by_slug(&mut self, slug: &str, include_unpublished: bool) -> Result<Option<ArticleDBResponse>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM articles WHERE slug = ");
        qb.push_bind(slug);
        if !include_unpublished {
            qb.push(" AND is_published");
        }

        let article = qb.build_query_as::<ArticleDBResponse>().fetch_optional(&mut *self.db).await?;

        Ok(article)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    fn article(slug: &str, published: bool) -> ArticleCreateDBRequest {
        ArticleCreateDBRequest {
            title: "Getting started".to_string(),
            slug: slug.to_string(),
            content: "# Welcome".to_string(),
            category: "getting-started".to_string(),
            order_index: 0,
            is_published: published,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_public_listing_hides_unpublished(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Articles::new(&mut conn);

        repo.create(&article("published", true)).await.unwrap();
        repo.create(&article("draft", false)).await.unwrap();

        let public = repo
            .list(&ArticleFilter {
                include_unpublished: false,
                category: None,
                skip: 0,
                limit: 50,
            })
            .await
            .unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].slug, "published");

        let all = repo
            .list(&ArticleFilter {
                include_unpublished: true,
                category: None,
                skip: 0,
                limit: 50,
            })
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_get_by_slug_respects_publication(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Articles::new(&mut conn);

        repo.create(&article("draft", false)).await.unwrap();

        assert!(repo.get_by_slug("draft", false).await.unwrap().is_none());
        assert!(repo.get_by_slug("draft", true).await.unwrap().is_some());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_publishes_article(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Articles::new(&mut conn);

        let created = repo.create(&article("about", false)).await.unwrap();
        let updated = repo
            .update(
                created.id,
                &ArticleUpdateDBRequest {
                    is_published: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(updated.is_published);
        assert_eq!(updated.slug, "about");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_slug_is_a_unique_violation(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Articles::new(&mut conn);

        repo.create(&article("dup", true)).await.unwrap();
        let err = repo.create(&article("dup", true)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }
}
