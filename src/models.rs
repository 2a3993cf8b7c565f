use crate::localized::LocalizedText;
use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

/// User role enumeration for role-based access control.
///
/// Stored in the database as the PostgreSQL ENUM type "user_role".
/// Role is immutable after creation in the common path: readers self-register,
/// writers and admins are provisioned by an admin.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Reader,
    Writer,
    Admin,
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::Reader => "reader",
            UserRole::Writer => "writer",
            UserRole::Admin => "admin",
        }
    }
}

/// Subscription lifecycle states.
///
/// Stored as the PostgreSQL ENUM type "subscription_status". ACTIVE is the
/// only state that grants access to gated content; the remaining states are
/// reached through billing events and the lazy expiry check.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "subscription_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Inactive,
    Pending,
    Unsubscribe,
    Renew,
}

impl SubscriptionStatus {
    pub fn to_str(&self) -> &str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Inactive => "inactive",
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Unsubscribe => "unsubscribe",
            SubscriptionStatus::Renew => "renew",
        }
    }
}

/// Moderation states of an article.
///
/// Stored as the PostgreSQL ENUM type "article_status". Writers submit into
/// PENDING; admins move articles to APPROVED or REJECTED, and soft-delete by
/// flipping to DISABLED. Only APPROVED articles appear in the public feed.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "article_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    Pending,
    Approved,
    Rejected,
    Disabled,
}

impl ArticleStatus {
    pub fn to_str(&self) -> &str {
        match self {
            ArticleStatus::Pending => "pending",
            ArticleStatus::Approved => "approved",
            ArticleStatus::Rejected => "rejected",
            ArticleStatus::Disabled => "disabled",
        }
    }
}

/// User model representing the users table.
///
/// Subscription state is embedded on the user row rather than split into its
/// own table: one subscriber, one subscription, mutated in place by billing
/// events. `password` stores the argon2 hash, never plain text.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub password: String,
    pub role: UserRole,
    pub subscription_status: SubscriptionStatus,
    pub subscription_start: Option<DateTime<Utc>>,
    pub subscription_end: Option<DateTime<Utc>>,
    pub last_billed_at: Option<DateTime<Utc>>,
    pub subscribed_at: Option<DateTime<Utc>>,
    pub activated_at: Option<DateTime<Utc>>,
    // External billing gateway reference, kept verbatim for reconciliation.
    pub billing_ref: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Article row with localized title/content stored as JSONB maps.
///
/// The JSONB columns decode into `Json<LocalizedText>` here at the storage
/// boundary; the rest of the code only ever sees `LocalizedText`.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Article {
    pub id: i64,
    pub author_id: Uuid,
    pub title: Json<LocalizedText>,
    pub content: Json<LocalizedText>,
    pub status: ArticleStatus,
    pub category_id: i32,
    pub subcategory_id: Option<i32>,
    pub featured_image: Option<String>,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Category of the sports-news taxonomy. Has many subcategories.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Subcategory; belongs to exactly one category.
///
/// Tags have no model of their own: they are deduplicated by name in the
/// store and only ever surface as plain name lists on articles.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct Subcategory {
    pub id: i32,
    pub category_id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
