use super::DBClient;
use crate::models::{Category, Subcategory};

/// Category/subcategory operations trait
pub trait CategoryExt {
    async fn create_category(&self, name: &str) -> Result<Category, sqlx::Error>;

    async fn get_category(&self, category_id: i32) -> Result<Option<Category>, sqlx::Error>;

    async fn get_categories(&self) -> Result<Vec<Category>, sqlx::Error>;

    /// Delete a category. Refuses while articles still reference the category
    /// or any of its subcategories.
    async fn delete_category(&self, category_id: i32) -> Result<(), sqlx::Error>;

    async fn create_subcategory(
        &self,
        category_id: i32,
        name: &str,
    ) -> Result<Subcategory, sqlx::Error>;

    async fn get_subcategories(&self, category_id: i32) -> Result<Vec<Subcategory>, sqlx::Error>;

    /// Delete a subcategory. Refuses while articles still reference it.
    async fn delete_subcategory(&self, subcategory_id: i32) -> Result<(), sqlx::Error>;
}

impl CategoryExt for DBClient {
    async fn create_category(&self, name: &str) -> Result<Category, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name) VALUES ($1) RETURNING id, name, created_at",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_category(&self, category_id: i32) -> Result<Option<Category>, sqlx::Error> {
        sqlx::query_as::<_, Category>("SELECT id, name, created_at FROM categories WHERE id = $1")
            .bind(category_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_categories(&self) -> Result<Vec<Category>, sqlx::Error> {
        sqlx::query_as::<_, Category>("SELECT id, name, created_at FROM categories ORDER BY name")
            .fetch_all(&self.pool)
            .await
    }

    async fn delete_category(&self, category_id: i32) -> Result<(), sqlx::Error> {
        let referenced: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM articles
                WHERE category_id = $1
                   OR subcategory_id IN
                      (SELECT id FROM subcategories WHERE category_id = $1)
            )
            "#,
        )
        .bind(category_id)
        .fetch_one(&self.pool)
        .await?;

        if referenced {
            return Err(sqlx::Error::Protocol(
                "Category is still referenced by articles".into(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM subcategories WHERE category_id = $1")
            .bind(category_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(category_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        tx.commit().await?;

        Ok(())
    }

    async fn create_subcategory(
        &self,
        category_id: i32,
        name: &str,
    ) -> Result<Subcategory, sqlx::Error> {
        sqlx::query_as::<_, Subcategory>(
            r#"
            INSERT INTO subcategories (category_id, name)
            VALUES ($1, $2)
            RETURNING id, category_id, name, created_at
            "#,
        )
        .bind(category_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_subcategories(&self, category_id: i32) -> Result<Vec<Subcategory>, sqlx::Error> {
        sqlx::query_as::<_, Subcategory>(
            r#"
            SELECT id, category_id, name, created_at
            FROM subcategories
            WHERE category_id = $1
            ORDER BY name
            "#,
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn delete_subcategory(&self, subcategory_id: i32) -> Result<(), sqlx::Error> {
        let referenced: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM articles WHERE subcategory_id = $1)",
        )
        .bind(subcategory_id)
        .fetch_one(&self.pool)
        .await?;

        if referenced {
            return Err(sqlx::Error::Protocol(
                "Subcategory is still referenced by articles".into(),
            ));
        }

        let result = sqlx::query("DELETE FROM subcategories WHERE id = $1")
            .bind(subcategory_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }
}
