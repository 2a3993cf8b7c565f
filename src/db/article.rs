use super::DBClient;
use crate::dtos::ArticleDto;
use crate::localized::LocalizedText;
use crate::models::{Article, ArticleStatus};
use sqlx::types::Json;
use uuid::Uuid;

const ARTICLE_COLUMNS: &str = "id, author_id, title, content, status, category_id, \
     subcategory_id, featured_image, view_count, created_at, updated_at";

// Joined shape served to clients: author name and aggregated tag names come
// along with the row.
const ARTICLE_DTO_SELECT: &str = r#"
    SELECT a.id,
           u.name AS author_name,
           a.title,
           a.content,
           a.status,
           a.category_id,
           a.subcategory_id,
           COALESCE(array_agg(t.name ORDER BY t.name)
                    FILTER (WHERE t.name IS NOT NULL), '{}') AS tags,
           a.featured_image,
           a.view_count,
           a.created_at,
           a.updated_at
    FROM articles a
    INNER JOIN users u ON a.author_id = u.id
    LEFT JOIN article_tags links ON links.article_id = a.id
    LEFT JOIN tags t ON t.id = links.tag_id
"#;

/// Article database operations trait
pub trait ArticleExt {
    /// Raw article row, no joins. Used for ownership and status checks.
    async fn get_article(&self, article_id: i64) -> Result<Option<Article>, sqlx::Error>;

    /// Joined article view with author name and tags.
    async fn get_article_dto(&self, article_id: i64) -> Result<Option<ArticleDto>, sqlx::Error>;

    /// Paginated listing, newest first, optionally filtered by status and/or
    /// author. The public feed is `(Some(Approved), None)`.
    async fn list_articles(
        &self,
        status: Option<ArticleStatus>,
        author_id: Option<Uuid>,
        page: i64,
        limit: i64,
    ) -> Result<Vec<ArticleDto>, sqlx::Error>;

    /// Total count under the same filter as `list_articles`.
    async fn count_articles(
        &self,
        status: Option<ArticleStatus>,
        author_id: Option<Uuid>,
    ) -> Result<i64, sqlx::Error>;

    /// Insert a PENDING article and connect-or-create its tags, atomically.
    async fn create_article(
        &self,
        author_id: Uuid,
        title: &LocalizedText,
        content: &LocalizedText,
        category_id: i32,
        subcategory_id: Option<i32>,
        tags: &[String],
        featured_image: Option<&str>,
    ) -> Result<ArticleDto, sqlx::Error>;

    /// Owner-gated content update. Replaces the full tag set; a `Some`
    /// featured image replaces the stored one, `None` keeps it.
    async fn update_article(
        &self,
        article_id: i64,
        author_id: Uuid,
        title: &LocalizedText,
        content: &LocalizedText,
        category_id: i32,
        subcategory_id: Option<i32>,
        tags: &[String],
        featured_image: Option<&str>,
    ) -> Result<ArticleDto, sqlx::Error>;

    /// Moderation status write. The transition itself is validated by the
    /// caller; this only persists it.
    async fn set_article_status(
        &self,
        article_id: i64,
        status: ArticleStatus,
    ) -> Result<Article, sqlx::Error>;

    /// Owner-gated hard delete. Returns the stored image URL, if any, so the
    /// caller can remove the hosted file afterwards.
    async fn delete_article(
        &self,
        article_id: i64,
        author_id: Uuid,
    ) -> Result<Option<String>, sqlx::Error>;

    /// Bump the denormalized view counter, returning the new value.
    async fn increment_view_count(&self, article_id: i64) -> Result<i64, sqlx::Error>;
}

impl ArticleExt for DBClient {
    async fn get_article(&self, article_id: i64) -> Result<Option<Article>, sqlx::Error> {
        let query = format!("SELECT {} FROM articles WHERE id = $1", ARTICLE_COLUMNS);
        sqlx::query_as::<_, Article>(&query)
            .bind(article_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_article_dto(&self, article_id: i64) -> Result<Option<ArticleDto>, sqlx::Error> {
        let query = format!("{} WHERE a.id = $1 GROUP BY a.id, u.name", ARTICLE_DTO_SELECT);
        sqlx::query_as::<_, ArticleDto>(&query)
            .bind(article_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn list_articles(
        &self,
        status: Option<ArticleStatus>,
        author_id: Option<Uuid>,
        page: i64,
        limit: i64,
    ) -> Result<Vec<ArticleDto>, sqlx::Error> {
        let offset = (page - 1) * limit;

        let query = format!(
            r#"{}
            WHERE ($1::article_status IS NULL OR a.status = $1)
              AND ($2::uuid IS NULL OR a.author_id = $2)
            GROUP BY a.id, u.name
            ORDER BY a.created_at DESC
            LIMIT $3 OFFSET $4
            "#,
            ARTICLE_DTO_SELECT
        );
        sqlx::query_as::<_, ArticleDto>(&query)
            .bind(status)
            .bind(author_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
    }

    async fn count_articles(
        &self,
        status: Option<ArticleStatus>,
        author_id: Option<Uuid>,
    ) -> Result<i64, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM articles a
            WHERE ($1::article_status IS NULL OR a.status = $1)
              AND ($2::uuid IS NULL OR a.author_id = $2)
            "#,
        )
        .bind(status)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn create_article(
        &self,
        author_id: Uuid,
        title: &LocalizedText,
        content: &LocalizedText,
        category_id: i32,
        subcategory_id: Option<i32>,
        tags: &[String],
        featured_image: Option<&str>,
    ) -> Result<ArticleDto, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let article_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO articles
                (author_id, title, content, status, category_id, subcategory_id, featured_image)
            VALUES ($1, $2, $3, 'pending', $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(author_id)
        .bind(Json(title))
        .bind(Json(content))
        .bind(category_id)
        .bind(subcategory_id)
        .bind(featured_image)
        .fetch_one(&mut *tx)
        .await?;

        connect_tags(&mut tx, article_id, tags).await?;

        tx.commit().await?;

        let dto = self.get_article_dto(article_id).await?;
        dto.ok_or(sqlx::Error::RowNotFound)
    }

    async fn update_article(
        &self,
        article_id: i64,
        author_id: Uuid,
        title: &LocalizedText,
        content: &LocalizedText,
        category_id: i32,
        subcategory_id: Option<i32>,
        tags: &[String],
        featured_image: Option<&str>,
    ) -> Result<ArticleDto, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE articles
            SET title = $1,
                content = $2,
                category_id = $3,
                subcategory_id = $4,
                featured_image = COALESCE($5, featured_image),
                updated_at = NOW()
            WHERE id = $6 AND author_id = $7
            "#,
        )
        .bind(Json(title))
        .bind(Json(content))
        .bind(category_id)
        .bind(subcategory_id)
        .bind(featured_image)
        .bind(article_id)
        .bind(author_id)
        .execute(&mut *tx)
        .await?;

        // Zero rows means the article is missing or owned by someone else;
        // the caller distinguishes which.
        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        // Full tag-set replacement: disconnect everything, then reconnect.
        sqlx::query("DELETE FROM article_tags WHERE article_id = $1")
            .bind(article_id)
            .execute(&mut *tx)
            .await?;

        connect_tags(&mut tx, article_id, tags).await?;

        tx.commit().await?;

        let dto = self.get_article_dto(article_id).await?;
        dto.ok_or(sqlx::Error::RowNotFound)
    }

    async fn set_article_status(
        &self,
        article_id: i64,
        status: ArticleStatus,
    ) -> Result<Article, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE articles
            SET status = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING {}
            "#,
            ARTICLE_COLUMNS
        );
        sqlx::query_as::<_, Article>(&query)
            .bind(status)
            .bind(article_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn delete_article(
        &self,
        article_id: i64,
        author_id: Uuid,
    ) -> Result<Option<String>, sqlx::Error> {
        let deleted: Option<(Option<String>,)> = sqlx::query_as(
            r#"
            DELETE FROM articles
            WHERE id = $1 AND author_id = $2
            RETURNING featured_image
            "#,
        )
        .bind(article_id)
        .bind(author_id)
        .fetch_optional(&self.pool)
        .await?;

        match deleted {
            Some((featured_image,)) => Ok(featured_image),
            None => Err(sqlx::Error::RowNotFound),
        }
    }

    async fn increment_view_count(&self, article_id: i64) -> Result<i64, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            r#"
            UPDATE articles
            SET view_count = view_count + 1
            WHERE id = $1
            RETURNING view_count
            "#,
        )
        .bind(article_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

/// Connect-or-create each tag by name and link it to the article.
///
/// The upsert keeps tag names unique without a pre-read; re-linking an
/// existing pair is ignored.
async fn connect_tags(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    article_id: i64,
    tags: &[String],
) -> Result<(), sqlx::Error> {
    for name in tags {
        let tag_id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO tags (name)
            VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            "#,
        )
        .bind(name)
        .fetch_one(&mut **tx)
        .await?;

        sqlx::query(
            "INSERT INTO article_tags (article_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(article_id)
        .bind(tag_id)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}
