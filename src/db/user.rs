use super::DBClient;
use crate::models::{SubscriptionStatus, User, UserRole};
use chrono::{DateTime, Utc};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, name, phone, email, password, role, subscription_status, \
     subscription_start, subscription_end, last_billed_at, subscribed_at, activated_at, \
     billing_ref, created_at, updated_at";

/// User database operations trait
pub trait UserExt {
    /// Get single user by ID, phone, or email.
    /// Returns Option - Some(user) if found, None if not found.
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error>;

    /// Get paginated list of all users, newest first.
    async fn get_users(&self, page: u32, limit: usize) -> Result<Vec<User>, sqlx::Error>;

    /// Get total count of all users.
    async fn get_user_count(&self) -> Result<i64, sqlx::Error>;

    /// Create a new reader with an ACTIVE subscription window (trial or paid).
    async fn save_reader(
        &self,
        name: &str,
        phone: &str,
        password: &str,
        subscription_start: DateTime<Utc>,
        subscription_end: DateTime<Utc>,
    ) -> Result<User, sqlx::Error>;

    /// Create an admin-provisioned WRITER or ADMIN account.
    async fn save_staff(
        &self,
        name: &str,
        phone: &str,
        email: Option<&str>,
        password: &str,
        role: UserRole,
    ) -> Result<User, sqlx::Error>;

    /// Set the subscription status. Re-setting the current status is a no-op
    /// write, which keeps racing lazy-expiry readers harmless.
    async fn set_subscription_status(
        &self,
        user_id: Uuid,
        status: SubscriptionStatus,
    ) -> Result<User, sqlx::Error>;

    /// Apply a billing outcome in one UPDATE: status ACTIVE, new window,
    /// optional last-billed stamp.
    async fn apply_billing(
        &self,
        user_id: Uuid,
        subscription_start: DateTime<Utc>,
        subscription_end: DateTime<Utc>,
        last_billed_at: Option<DateTime<Utc>>,
    ) -> Result<User, sqlx::Error>;

    /// Flip to UNSUBSCRIBE, leaving the date trail intact.
    async fn mark_unsubscribed(&self, user_id: Uuid) -> Result<User, sqlx::Error>;
}

impl UserExt for DBClient {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        let mut user: Option<User> = None;

        if let Some(user_id) = user_id {
            let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
            user = sqlx::query_as::<_, User>(&query)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        } else if let Some(phone) = phone {
            let query = format!("SELECT {} FROM users WHERE phone = $1", USER_COLUMNS);
            user = sqlx::query_as::<_, User>(&query)
                .bind(phone)
                .fetch_optional(&self.pool)
                .await?;
        } else if let Some(email) = email {
            let query = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
            user = sqlx::query_as::<_, User>(&query)
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        }

        Ok(user)
    }

    async fn get_users(&self, page: u32, limit: usize) -> Result<Vec<User>, sqlx::Error> {
        let offset = (page - 1) * limit as u32;

        let query = format!(
            "SELECT {} FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            USER_COLUMNS
        );
        let users = sqlx::query_as::<_, User>(&query)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    async fn get_user_count(&self) -> Result<i64, sqlx::Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn save_reader(
        &self,
        name: &str,
        phone: &str,
        password: &str,
        subscription_start: DateTime<Utc>,
        subscription_end: DateTime<Utc>,
    ) -> Result<User, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO users
                (name, phone, password, role, subscription_status,
                 subscription_start, subscription_end, subscribed_at, activated_at)
            VALUES ($1, $2, $3, 'reader', 'active', $4, $5, NOW(), NOW())
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(name)
            .bind(phone)
            .bind(password)
            .bind(subscription_start)
            .bind(subscription_end)
            .fetch_one(&self.pool)
            .await?;

        Ok(user)
    }

    async fn save_staff(
        &self,
        name: &str,
        phone: &str,
        email: Option<&str>,
        password: &str,
        role: UserRole,
    ) -> Result<User, sqlx::Error> {
        // Staff accounts carry no subscription window; status stays at the
        // column default (inactive) and is never consulted for them.
        let query = format!(
            r#"
            INSERT INTO users (name, phone, email, password, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(name)
            .bind(phone)
            .bind(email)
            .bind(password)
            .bind(role)
            .fetch_one(&self.pool)
            .await?;

        Ok(user)
    }

    async fn set_subscription_status(
        &self,
        user_id: Uuid,
        status: SubscriptionStatus,
    ) -> Result<User, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE users
            SET subscription_status = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(status)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(user)
    }

    async fn apply_billing(
        &self,
        user_id: Uuid,
        subscription_start: DateTime<Utc>,
        subscription_end: DateTime<Utc>,
        last_billed_at: Option<DateTime<Utc>>,
    ) -> Result<User, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE users
            SET subscription_status = 'active',
                subscription_start = $1,
                subscription_end = $2,
                last_billed_at = COALESCE($3, last_billed_at),
                activated_at = COALESCE(activated_at, NOW()),
                updated_at = NOW()
            WHERE id = $4
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(subscription_start)
            .bind(subscription_end)
            .bind(last_billed_at)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(user)
    }

    async fn mark_unsubscribed(&self, user_id: Uuid) -> Result<User, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE users
            SET subscription_status = 'unsubscribe', updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(user)
    }
}
