use crate::{
    AppState,
    db::{ArticleExt, EngagementExt},
    dtos::{EngagementStatusQuery, ToggleDto, ToggleResponseDto},
    error::{ErrorMessage, HttpError},
    middleware::AuthenticatedUser,
    models::ArticleStatus,
};
use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
};
use uuid::Uuid;
use validator::Validate;

use tracing::instrument;

/// Router for reader engagement: favorite and bookmark check/toggle.
/// Sits behind the reader area guard.
pub fn engagement_handler() -> Router<AppState> {
    Router::new()
        .route("/favorites", get(favorite_status).post(toggle_favorite))
        .route("/bookmarks", get(bookmark_status).post(toggle_bookmark))
}

#[derive(Clone, Copy)]
enum Kind {
    Favorite,
    Bookmark,
}

#[instrument(skip(app_state, user), fields(user_id = %user.user.id))]
pub async fn favorite_status(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<AppState>,
    Query(params): Query<EngagementStatusQuery>,
) -> Result<impl IntoResponse, HttpError> {
    params.validate().map_err(|e| {
        tracing::error!("Invalid favorite status input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    status(app_state, Kind::Favorite, user.user.id, params.article_id).await
}

#[instrument(skip(app_state, user, body), fields(user_id = %user.user.id))]
pub async fn toggle_favorite(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<AppState>,
    Json(body): Json<ToggleDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid favorite toggle input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    toggle(app_state, Kind::Favorite, user.user.id, body.article_id).await
}

#[instrument(skip(app_state, user), fields(user_id = %user.user.id))]
pub async fn bookmark_status(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<AppState>,
    Query(params): Query<EngagementStatusQuery>,
) -> Result<impl IntoResponse, HttpError> {
    params.validate().map_err(|e| {
        tracing::error!("Invalid bookmark status input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    status(app_state, Kind::Bookmark, user.user.id, params.article_id).await
}

#[instrument(skip(app_state, user, body), fields(user_id = %user.user.id))]
pub async fn toggle_bookmark(
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<AppState>,
    Json(body): Json<ToggleDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid bookmark toggle input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    toggle(app_state, Kind::Bookmark, user.user.id, body.article_id).await
}

async fn status(
    app_state: AppState,
    kind: Kind,
    user_id: Uuid,
    article_id: i64,
) -> Result<axum::response::Response, HttpError> {
    let active = match kind {
        Kind::Favorite => app_state.db_client.favorite_exists(user_id, article_id).await,
        Kind::Bookmark => app_state.db_client.bookmark_exists(user_id, article_id).await,
    }
    .map_err(|e| {
        tracing::error!("DB error, checking engagement pair: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    Ok(Json(ToggleResponseDto {
        status: "success".to_string(),
        active,
    })
    .into_response())
}

/// Strict toggle: callers cannot request a target state, only flip the pair.
async fn toggle(
    app_state: AppState,
    kind: Kind,
    user_id: Uuid,
    article_id: i64,
) -> Result<axum::response::Response, HttpError> {
    // Only APPROVED articles can be engaged with.
    app_state
        .db_client
        .get_article(article_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting article: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .filter(|a| a.status == ArticleStatus::Approved)
        .ok_or_else(|| HttpError::not_found(ErrorMessage::ArticleNotFound.to_string()))?;

    let active = match kind {
        Kind::Favorite => app_state.db_client.toggle_favorite(user_id, article_id).await,
        Kind::Bookmark => app_state.db_client.toggle_bookmark(user_id, article_id).await,
    }
    .map_err(|e| {
        tracing::error!("DB error, toggling engagement pair: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    Ok(Json(ToggleResponseDto {
        status: "success".to_string(),
        active,
    })
    .into_response())
}
