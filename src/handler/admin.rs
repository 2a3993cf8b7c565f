use crate::{
    AppState,
    db::{ArticleExt, CategoryExt, UserExt},
    dtos::{
        ARTICLE_PAGE_SIZE, AdminArticlesQuery, ArticleListResponseDto, CreateCategoryDto,
        CreateSubcategoryDto, FilterUserDto, ProvisionUserDto, RequestQueryDto, Response,
        ReviewDto, UserListResponseDto, UserResponseDto,
    },
    error::{ErrorMessage, HttpError},
    middleware::AuthenticatedUser,
    models::{Article, ArticleStatus, UserRole},
    moderation::{notification_text, transition_allowed},
};
use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use validator::Validate;

use tracing::instrument;

/// Router for the admin area. Sits behind the admin area guard.
pub fn admin_handler() -> Router<AppState> {
    Router::new()
        .route("/articles", get(list_articles).put(review_article))
        .route("/articles/{article_id}", delete(disable_article))
        .route("/categories", post(create_category))
        .route("/categories/{category_id}", delete(delete_category))
        .route("/subcategories", post(create_subcategory))
        .route("/subcategories/{subcategory_id}", delete(delete_subcategory))
        .route("/users", get(list_users).post(provision_user))
}

/// Paginated article listing across all statuses, optionally filtered.
#[instrument(skip(app_state))]
pub async fn list_articles(
    Query(params): Query<AdminArticlesQuery>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    params.validate().map_err(|e| {
        tracing::error!("Invalid admin listing input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let page = params.page.unwrap_or(1);

    let articles = app_state
        .db_client
        .list_articles(params.status, None, page, ARTICLE_PAGE_SIZE)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing articles: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let total_count = app_state
        .db_client
        .count_articles(params.status, None)
        .await
        .map_err(|e| {
            tracing::error!("DB error, counting articles: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    Ok(Json(ArticleListResponseDto {
        status: "success".to_string(),
        articles,
        has_more: page * ARTICLE_PAGE_SIZE < total_count,
        total_count,
    }))
}

/// Moderation decision. Idempotent: re-applying the status an article already
/// carries succeeds without side effects.
///
/// Approval dispatches the channel notification in a background task; the
/// approval itself is the commit point and never waits on — or fails with —
/// the notification.
#[instrument(skip(app_state, user, body), fields(reviewer = %user.user.id))]
pub async fn review_article(
    State(app_state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<ReviewDto>,
) -> Result<impl IntoResponse, HttpError> {
    // The area guard already vetted the session; the review operation still
    // owns its own authorization contract.
    if user.user.role != UserRole::Admin {
        return Err(HttpError::unauthorized(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    body.validate().map_err(|e| {
        tracing::error!("Invalid review input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let article = app_state
        .db_client
        .get_article(body.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting article: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::ArticleNotFound.to_string()))?;

    if !transition_allowed(article.status, body.status) {
        tracing::error!(
            article_id = article.id,
            from = article.status.to_str(),
            to = body.status.to_str(),
            "disallowed status transition"
        );
        return Err(HttpError::bad_request(format!(
            "Cannot move article from {} to {}",
            article.status.to_str(),
            body.status.to_str()
        )));
    }

    let previous_status = article.status;

    let updated = app_state
        .db_client
        .set_article_status(body.id, body.status)
        .await
        .map_err(|e| {
            tracing::error!("DB error, setting article status: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    if updated.status == ArticleStatus::Approved && previous_status != ArticleStatus::Approved {
        dispatch_approval_notification(app_state.clone(), &updated);
    }

    tracing::info!(article_id = updated.id, status = updated.status.to_str(), "article reviewed");
    Ok(Json(Response {
        status: "success",
        message: format!("Article is now {}", updated.status.to_str()),
    }))
}

/// Fire-and-forget channel post carrying the localized body and the image
/// URL. Failures are logged and swallowed; the approval already committed.
fn dispatch_approval_notification(app_state: AppState, article: &Article) {
    let text = notification_text(&article.title, &article.content);
    let image_url = article.featured_image.clone();
    let article_id = article.id;

    tokio::spawn(async move {
        if let Err(e) = app_state
            .http_client
            .notify_channel(&app_state.env.channel_api_url, &text, image_url.as_deref())
            .await
        {
            tracing::error!(article_id, "Failed to deliver approval notification: {}", e);
        } else {
            tracing::info!(article_id, "approval notification delivered");
        }
    });
}

/// Admin soft delete: flips the article to DISABLED. The record and its
/// hosted image stay put — reversibility is the point of this path.
#[instrument(skip(app_state))]
pub async fn disable_article(
    Path(article_id): Path<i64>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let article = app_state
        .db_client
        .get_article(article_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting article: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::ArticleNotFound.to_string()))?;

    if !transition_allowed(article.status, ArticleStatus::Disabled) {
        return Err(HttpError::bad_request(format!(
            "Cannot disable a {} article",
            article.status.to_str()
        )));
    }

    app_state
        .db_client
        .set_article_status(article_id, ArticleStatus::Disabled)
        .await
        .map_err(|e| {
            tracing::error!("DB error, disabling article: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(article_id, "article disabled");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(app_state, body))]
pub async fn create_category(
    State(app_state): State<AppState>,
    Json(body): Json<CreateCategoryDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid category input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let category = app_state
        .db_client
        .create_category(&body.name)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.is_unique_violation() {
                    return HttpError::unique_constraint_violation(
                        "Category already exists".to_string(),
                    );
                }
            }
            tracing::error!("DB error, creating category: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(category_id = category.id, "category created");
    Ok((StatusCode::CREATED, Json(category)))
}

/// Deletes a category together with its subcategories. Refused with 409 while
/// any article still references them.
#[instrument(skip(app_state))]
pub async fn delete_category(
    Path(category_id): Path<i32>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .db_client
        .delete_category(category_id)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                HttpError::not_found(ErrorMessage::CategoryNotFound.to_string())
            }
            sqlx::Error::Protocol(message) => {
                HttpError::unique_constraint_violation(message.to_string())
            }
            e => {
                tracing::error!("DB error, deleting category: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    tracing::info!(category_id, "category deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(app_state, body))]
pub async fn create_subcategory(
    State(app_state): State<AppState>,
    Json(body): Json<CreateSubcategoryDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid subcategory input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    app_state
        .db_client
        .get_category(body.category_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting category: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::CategoryNotFound.to_string()))?;

    let subcategory = app_state
        .db_client
        .create_subcategory(body.category_id, &body.name)
        .await
        .map_err(|e| {
            tracing::error!("DB error, creating subcategory: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(subcategory_id = subcategory.id, "subcategory created");
    Ok((StatusCode::CREATED, Json(subcategory)))
}

#[instrument(skip(app_state))]
pub async fn delete_subcategory(
    Path(subcategory_id): Path<i32>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    app_state
        .db_client
        .delete_subcategory(subcategory_id)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                HttpError::not_found(ErrorMessage::CategoryNotFound.to_string())
            }
            sqlx::Error::Protocol(message) => {
                HttpError::unique_constraint_violation(message.to_string())
            }
            e => {
                tracing::error!("DB error, deleting subcategory: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        })?;

    tracing::info!(subcategory_id, "subcategory deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Paginated list of all users.
#[instrument(skip(app_state))]
pub async fn list_users(
    Query(query_params): Query<RequestQueryDto>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    query_params.validate().map_err(|e| {
        tracing::error!("Invalid list_users input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let page = query_params.page.unwrap_or(1);
    let limit = query_params.limit.unwrap_or(10);

    let users = app_state
        .db_client
        .get_users(page as u32, limit)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting users: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let user_count = app_state.db_client.get_user_count().await.map_err(|e| {
        tracing::error!("DB error, getting user count: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    Ok(Json(UserListResponseDto {
        status: "success".to_string(),
        users: FilterUserDto::filter_users(&users),
        results: user_count,
    }))
}

/// Provision a WRITER or ADMIN account. Reader accounts only ever come from
/// self-service signup, so that role is rejected here.
#[instrument(skip(app_state, user, body), fields(admin = %user.user.id))]
pub async fn provision_user(
    State(app_state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<ProvisionUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid provision input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    if body.role == UserRole::Reader {
        return Err(HttpError::bad_request(
            "Readers register through signup, not provisioning".to_string(),
        ));
    }

    let hash_password = crate::utils::password::hash(&body.password).map_err(|e| {
        tracing::error!("Password hashing error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    let result = app_state
        .db_client
        .save_staff(
            &body.name,
            &body.phone,
            body.email.as_deref(),
            &hash_password,
            body.role,
        )
        .await;

    match result {
        Ok(created) => {
            tracing::info!(user_id = %created.id, role = created.role.to_str(), "staff account provisioned");
            Ok((
                StatusCode::CREATED,
                Json(UserResponseDto {
                    status: "success".to_string(),
                    user: FilterUserDto::filter_user(&created),
                }),
            ))
        }
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            tracing::error!("DB error, provisioning user, unique violation: {}", db_err);
            Err(HttpError::unique_constraint_violation(
                "An account with this phone or email already exists".to_string(),
            ))
        }
        Err(e) => {
            tracing::error!("DB error, provisioning user: {}", e);
            Err(HttpError::server_error(
                ErrorMessage::ServerError.to_string(),
            ))
        }
    }
}
