use super::DBClient;
use uuid::Uuid;

/// Whether a view event should bump the global counter.
///
/// Known users count once (only when no prior view record exists for the
/// pair); anonymous hits count every time. The resulting metric is
/// unique-per-known-user, unconditional-per-anonymous-hit.
pub fn view_counts(known_user: bool, first_view_for_pair: bool) -> bool {
    !known_user || first_view_for_pair
}

/// Engagement (views, favorites, bookmarks) operations trait
pub trait EngagementExt {
    /// Strict favorite toggle: deletes the pair if present, creates it
    /// otherwise. Returns the new state (true = now favorited).
    async fn toggle_favorite(&self, user_id: Uuid, article_id: i64) -> Result<bool, sqlx::Error>;

    async fn favorite_exists(&self, user_id: Uuid, article_id: i64) -> Result<bool, sqlx::Error>;

    /// Strict bookmark toggle, same semantics as `toggle_favorite`.
    async fn toggle_bookmark(&self, user_id: Uuid, article_id: i64) -> Result<bool, sqlx::Error>;

    async fn bookmark_exists(&self, user_id: Uuid, article_id: i64) -> Result<bool, sqlx::Error>;

    /// Record a view and return the article's current counter. A known user's
    /// repeat view leaves the counter untouched; anonymous views always bump.
    async fn record_view(
        &self,
        article_id: i64,
        user_id: Option<Uuid>,
    ) -> Result<i64, sqlx::Error>;
}

impl EngagementExt for DBClient {
    async fn toggle_favorite(&self, user_id: Uuid, article_id: i64) -> Result<bool, sqlx::Error> {
        toggle_pair(&self.pool, "favorite_articles", user_id, article_id).await
    }

    async fn favorite_exists(&self, user_id: Uuid, article_id: i64) -> Result<bool, sqlx::Error> {
        pair_exists(&self.pool, "favorite_articles", user_id, article_id).await
    }

    async fn toggle_bookmark(&self, user_id: Uuid, article_id: i64) -> Result<bool, sqlx::Error> {
        toggle_pair(&self.pool, "bookmarks", user_id, article_id).await
    }

    async fn bookmark_exists(&self, user_id: Uuid, article_id: i64) -> Result<bool, sqlx::Error> {
        pair_exists(&self.pool, "bookmarks", user_id, article_id).await
    }

    async fn record_view(
        &self,
        article_id: i64,
        user_id: Option<Uuid>,
    ) -> Result<i64, sqlx::Error> {
        let should_count = match user_id {
            Some(user_id) => {
                // ON CONFLICT DO NOTHING makes the insert race-safe; only the
                // request that actually landed the row counts the view.
                let result = sqlx::query(
                    r#"
                    INSERT INTO article_views (user_id, article_id)
                    VALUES ($1, $2)
                    ON CONFLICT (user_id, article_id) DO NOTHING
                    "#,
                )
                .bind(user_id)
                .bind(article_id)
                .execute(&self.pool)
                .await?;

                view_counts(true, result.rows_affected() > 0)
            }
            None => view_counts(false, false),
        };

        if should_count {
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
        } else {
            let count: i64 = sqlx::query_scalar("SELECT view_count FROM articles WHERE id = $1")
                .bind(article_id)
                .fetch_one(&self.pool)
                .await?;
            Ok(count)
        }
    }
}

// The two toggle tables share the same (user_id, article_id) shape and unique
// constraint; only the table name differs. Table names come from the constants
// above, never from request input.
async fn toggle_pair(
    pool: &sqlx::Pool<sqlx::Postgres>,
    table: &str,
    user_id: Uuid,
    article_id: i64,
) -> Result<bool, sqlx::Error> {
    let delete = format!(
        "DELETE FROM {} WHERE user_id = $1 AND article_id = $2",
        table
    );
    let result = sqlx::query(&delete)
        .bind(user_id)
        .bind(article_id)
        .execute(pool)
        .await?;

    if result.rows_affected() > 0 {
        // Pair existed: the toggle turned it off.
        return Ok(false);
    }

    let insert = format!(
        "INSERT INTO {} (user_id, article_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        table
    );
    sqlx::query(&insert)
        .bind(user_id)
        .bind(article_id)
        .execute(pool)
        .await?;

    Ok(true)
}

async fn pair_exists(
    pool: &sqlx::Pool<sqlx::Postgres>,
    table: &str,
    user_id: Uuid,
    article_id: i64,
) -> Result<bool, sqlx::Error> {
    let query = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE user_id = $1 AND article_id = $2)",
        table
    );
    sqlx::query_scalar(&query)
        .bind(user_id)
        .bind(article_id)
        .fetch_one(pool)
        .await
}

#[cfg(test)]
mod tests {
    use super::view_counts;

    #[test]
    fn known_user_counts_only_first_view() {
        assert!(view_counts(true, true));
        assert!(!view_counts(true, false));
    }

    #[test]
    fn anonymous_views_always_count() {
        assert!(view_counts(false, true));
        assert!(view_counts(false, false));
    }
}
