use crate::localized::{Lang, LocalizedText};
use crate::models::{ArticleStatus, User, UserRole};
use crate::subscription::Eligibility;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use validator::Validate;

// DTOs define the structure of data exchanged with clients, kept separate from
// database models to control exactly what is exposed.

// ============================================================================
// Authentication DTOs
// ============================================================================

/// Login request - identifier is a phone number or an email address.
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoginDto {
    #[validate(length(min = 1, message = "Phone or email is required"))]
    pub identifier: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Reader self-service signup.
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct SignupDto {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    #[validate(length(min = 9, message = "Phone number is required"))]
    pub phone: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    #[validate(
        length(min = 1, message = "Confirm Password is required"),
        must_match(other = "password", message = "passwords do not match")
    )]
    #[serde(rename = "confirmPassword")]
    pub password_confirm: String,
}

/// Admin-side account provisioning for writers and admins.
#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionUserDto {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    #[validate(length(min = 9, message = "Phone number is required"))]
    pub phone: String,

    #[validate(email(message = "Email is invalid"))]
    pub email: Option<String>,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    pub role: UserRole,
}

/// Login success response; the token also travels as an HttpOnly cookie.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponseDto {
    pub status: String,
    pub token: String,
    pub name: String,
    pub role: String,
}

/// Generic success response.
#[derive(Serialize, Deserialize)]
pub struct Response {
    pub status: &'static str,
    pub message: String,
}

// ============================================================================
// User response DTOs (filtered data for clients)
// ============================================================================

/// Client-safe user view; excludes the password hash and billing references.
#[derive(Debug, Serialize, Deserialize)]
pub struct FilterUserDto {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub role: String,
    #[serde(rename = "subscriptionStatus")]
    pub subscription_status: String,
    #[serde(rename = "subscriptionStart")]
    pub subscription_start: Option<DateTime<Utc>>,
    #[serde(rename = "subscriptionEnd")]
    pub subscription_end: Option<DateTime<Utc>>,
    #[serde(rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

impl FilterUserDto {
    pub fn filter_user(user: &User) -> Self {
        FilterUserDto {
            id: user.id.to_string(),
            name: user.name.to_owned(),
            phone: user.phone.to_owned(),
            email: user.email.to_owned(),
            role: user.role.to_str().to_string(),
            subscription_status: user.subscription_status.to_str().to_string(),
            subscription_start: user.subscription_start,
            subscription_end: user.subscription_end,
            created_at: user.created_at,
        }
    }

    pub fn filter_users(users: &[User]) -> Vec<FilterUserDto> {
        users.iter().map(FilterUserDto::filter_user).collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserListResponseDto {
    pub status: String,
    pub users: Vec<FilterUserDto>,
    pub results: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponseDto {
    pub status: String,
    pub user: FilterUserDto,
}

// ============================================================================
// Subscriber DTOs
// ============================================================================

/// First-touch onboarding request: get-or-create by phone.
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct RegisterTrialDto {
    #[validate(length(min = 9, message = "Phone number is required"))]
    pub phone: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    pub name: Option<String>,
}

#[derive(Serialize, Deserialize, Validate, Debug)]
pub struct PhoneQueryDto {
    #[validate(length(min = 9, message = "Phone number is required"))]
    pub phone: String,
}

#[derive(Serialize, Deserialize, Validate, Debug)]
pub struct ChargeQueryDto {
    #[validate(length(min = 9, message = "Phone number is required"))]
    pub phone: String,

    #[validate(range(min = 1, max = 366))]
    #[serde(rename = "periodDays")]
    pub period_days: Option<i64>,
}

#[derive(Serialize, Deserialize, Validate, Debug)]
pub struct RenewRequestDto {
    #[validate(length(min = 9, message = "Phone number is required"))]
    pub phone: String,

    #[validate(range(min = 1, max = 366))]
    #[serde(rename = "durationDays")]
    pub duration_days: Option<i64>,
}

/// Current subscription snapshot returned by the subscriber endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubscriberSnapshotDto {
    pub phone: String,
    pub name: String,
    pub status: String,
    #[serde(rename = "subscriptionStart")]
    pub subscription_start: Option<DateTime<Utc>>,
    #[serde(rename = "subscriptionEnd")]
    pub subscription_end: Option<DateTime<Utc>>,
    #[serde(rename = "lastBilledAt")]
    pub last_billed_at: Option<DateTime<Utc>>,
    pub eligible: bool,
}

impl SubscriberSnapshotDto {
    pub fn from_user(user: &User, eligibility: Eligibility) -> Self {
        SubscriberSnapshotDto {
            phone: user.phone.to_owned(),
            name: user.name.to_owned(),
            status: user.subscription_status.to_str().to_string(),
            subscription_start: user.subscription_start,
            subscription_end: user.subscription_end,
            last_billed_at: user.last_billed_at,
            eligible: eligibility.eligible,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubscriberResponseDto {
    pub status: String,
    pub subscriber: SubscriberSnapshotDto,
    #[serde(rename = "isNewUser", skip_serializing_if = "Option::is_none")]
    pub is_new_user: Option<bool>,
}

// ============================================================================
// Article DTOs
// ============================================================================

/// Fixed page size of every paginated article listing.
pub const ARTICLE_PAGE_SIZE: i64 = 10;

/// Full article row joined with author name and aggregated tag names.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct ArticleDto {
    pub id: i64,
    #[serde(rename = "authorName")]
    pub author_name: String,
    pub title: Json<LocalizedText>,
    pub content: Json<LocalizedText>,
    pub status: ArticleStatus,
    #[serde(rename = "categoryId")]
    pub category_id: i32,
    #[serde(rename = "subcategoryId")]
    pub subcategory_id: Option<i32>,
    pub tags: Vec<String>,
    #[serde(rename = "featuredImage")]
    pub featured_image: Option<String>,
    #[serde(rename = "viewCount")]
    pub view_count: i64,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Article as the public feed serves it: localized fields resolved to a single
/// language with English fallback.
#[derive(Debug, Serialize, Deserialize)]
pub struct FeedArticleDto {
    pub id: i64,
    pub title: String,
    pub content: String,
    #[serde(rename = "categoryId")]
    pub category_id: i32,
    #[serde(rename = "subcategoryId")]
    pub subcategory_id: Option<i32>,
    pub tags: Vec<String>,
    #[serde(rename = "featuredImage")]
    pub featured_image: Option<String>,
    #[serde(rename = "viewCount")]
    pub view_count: i64,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl FeedArticleDto {
    pub fn resolve(article: &ArticleDto, lang: Lang) -> Self {
        FeedArticleDto {
            id: article.id,
            title: article.title.resolve(lang).to_string(),
            content: article.content.resolve(lang).to_string(),
            category_id: article.category_id,
            subcategory_id: article.subcategory_id,
            tags: article.tags.clone(),
            featured_image: article.featured_image.clone(),
            view_count: article.view_count,
            created_at: article.created_at,
        }
    }
}

/// Paginated feed contract: fixed page size, hasMore flag, total count.
#[derive(Debug, Serialize, Deserialize)]
pub struct FeedResponseDto {
    pub status: String,
    pub articles: Vec<FeedArticleDto>,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
    #[serde(rename = "totalCount")]
    pub total_count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ArticleResponseDto {
    pub status: String,
    pub data: ArticleDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ArticleListResponseDto {
    pub status: String,
    pub articles: Vec<ArticleDto>,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
    #[serde(rename = "totalCount")]
    pub total_count: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct FeedQueryParams {
    #[validate(range(min = 1))]
    pub page: Option<i64>,

    pub lang: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdminArticlesQuery {
    #[validate(range(min = 1))]
    pub page: Option<i64>,

    pub status: Option<ArticleStatus>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct WriterArticlesQuery {
    #[validate(range(min = 1))]
    pub page: Option<i64>,
}

/// Body of the public single-article fetch.
#[derive(Debug, Deserialize, Validate)]
pub struct ArticleReadDto {
    #[validate(range(min = 1))]
    pub id: i64,

    pub lang: Option<String>,
}

/// Unique-aware view recording request.
#[derive(Debug, Deserialize, Validate)]
pub struct RecordViewDto {
    #[validate(range(min = 1))]
    #[serde(rename = "articleId")]
    pub article_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ViewCountResponseDto {
    pub status: String,
    #[serde(rename = "viewCount")]
    pub view_count: i64,
}

/// Admin moderation decision.
#[derive(Debug, Deserialize, Validate)]
pub struct ReviewDto {
    #[validate(range(min = 1))]
    pub id: i64,

    pub status: ArticleStatus,
}

// ============================================================================
// Engagement DTOs
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct ToggleDto {
    #[validate(range(min = 1))]
    #[serde(rename = "articleId")]
    pub article_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct EngagementStatusQuery {
    #[validate(range(min = 1))]
    #[serde(rename = "articleId")]
    pub article_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToggleResponseDto {
    pub status: String,
    pub active: bool,
}

// ============================================================================
// Category DTOs
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryDto {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubcategoryDto {
    #[validate(range(min = 1))]
    #[serde(rename = "categoryId")]
    pub category_id: i32,

    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CategoryWithSubsDto {
    pub id: i32,
    pub name: String,
    pub subcategories: Vec<crate::models::Subcategory>,
}

#[derive(Debug, Serialize)]
pub struct CategoryListResponseDto {
    pub status: String,
    pub categories: Vec<CategoryWithSubsDto>,
}

// ============================================================================
// Pagination & misc DTOs
// ============================================================================

/// Generic pagination query parameters for admin listings.
#[derive(Serialize, Deserialize, Validate, Debug)]
pub struct RequestQueryDto {
    #[validate(range(min = 1))]
    pub page: Option<usize>,

    #[validate(range(min = 1, max = 50))]
    pub limit: Option<usize>,
}

/// Request body shipped to the outbound notification channel.
#[derive(Debug, Serialize)]
pub struct ChannelMessage {
    pub text: String,
    #[serde(rename = "image_url", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Image host upload response.
#[derive(Debug, Deserialize)]
pub struct ImageUploadResponse {
    pub url: String,
}
