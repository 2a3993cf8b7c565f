use crate::{
    AppState,
    db::{ArticleExt, CategoryExt, EngagementExt},
    dtos::{
        ARTICLE_PAGE_SIZE, ArticleReadDto, CategoryListResponseDto, CategoryWithSubsDto,
        FeedArticleDto, FeedQueryParams, FeedResponseDto, RecordViewDto, ViewCountResponseDto,
    },
    error::{ErrorMessage, HttpError},
    localized::Lang,
    middleware::maybe_identity,
    models::ArticleStatus,
};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use validator::Validate;

use tracing::instrument;

/// Router for the public article surface: the APPROVED feed, single-article
/// reads, the view endpoint and the category listing.
pub fn article_handler() -> Router<AppState> {
    Router::new()
        .route("/articles", get(get_feed).post(read_article))
        .route("/articles/view", post(record_view))
        .route("/categories", get(get_categories))
}

fn parse_lang(lang: Option<&str>) -> Lang {
    lang.and_then(|code| code.parse().ok()).unwrap_or_default()
}

/// Paginated public feed. Only APPROVED articles, fixed page size.
#[instrument(skip(app_state))]
pub async fn get_feed(
    Query(params): Query<FeedQueryParams>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    params.validate().map_err(|e| {
        tracing::error!("Invalid feed input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let page = params.page.unwrap_or(1);
    let lang = parse_lang(params.lang.as_deref());

    let articles = app_state
        .db_client
        .list_articles(Some(ArticleStatus::Approved), None, page, ARTICLE_PAGE_SIZE)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing feed: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let total_count = app_state
        .db_client
        .count_articles(Some(ArticleStatus::Approved), None)
        .await
        .map_err(|e| {
            tracing::error!("DB error, counting feed: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let has_more = page * ARTICLE_PAGE_SIZE < total_count;

    let response = Json(FeedResponseDto {
        status: "success".to_string(),
        articles: articles
            .iter()
            .map(|a| FeedArticleDto::resolve(a, lang))
            .collect(),
        has_more,
        total_count,
    });

    Ok(response)
}

/// Single-article read. Counts as an anonymous view: the counter bumps
/// unconditionally on every hit of this endpoint.
#[instrument(skip(app_state))]
pub async fn read_article(
    State(app_state): State<AppState>,
    Json(body): Json<ArticleReadDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid article read input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let lang = parse_lang(body.lang.as_deref());

    let article = app_state
        .db_client
        .get_article_dto(body.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting article: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .filter(|a| a.status == ArticleStatus::Approved)
        .ok_or_else(|| HttpError::not_found(ErrorMessage::ArticleNotFound.to_string()))?;

    let view_count = app_state
        .db_client
        .increment_view_count(article.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, incrementing view count: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let mut resolved = FeedArticleDto::resolve(&article, lang);
    resolved.view_count = view_count;

    Ok(Json(resolved))
}

/// Unique-aware view recording. A logged-in reader counts once per article;
/// anonymous hits count every time.
#[instrument(skip(app_state, cookie_jar, req_headers))]
pub async fn record_view(
    cookie_jar: CookieJar,
    req_headers: HeaderMap,
    State(app_state): State<AppState>,
    Json(body): Json<RecordViewDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid view input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let article = app_state
        .db_client
        .get_article(body.article_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting article: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .filter(|a| a.status == ArticleStatus::Approved)
        .ok_or_else(|| HttpError::not_found(ErrorMessage::ArticleNotFound.to_string()))?;

    let viewer = maybe_identity(&cookie_jar, &req_headers, &app_state)
        .await
        .map(|user| user.id);

    let view_count = app_state
        .db_client
        .record_view(article.id, viewer)
        .await
        .map_err(|e| {
            tracing::error!("DB error, recording view: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    Ok(Json(ViewCountResponseDto {
        status: "success".to_string(),
        view_count,
    }))
}

/// Public category/subcategory listing for the navigation surface.
#[instrument(skip(app_state))]
pub async fn get_categories(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let categories = app_state.db_client.get_categories().await.map_err(|e| {
        tracing::error!("DB error, listing categories: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    let mut listed = Vec::with_capacity(categories.len());
    for category in categories {
        let subcategories = app_state
            .db_client
            .get_subcategories(category.id)
            .await
            .map_err(|e| {
                tracing::error!("DB error, listing subcategories: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            })?;
        listed.push(CategoryWithSubsDto {
            id: category.id,
            name: category.name,
            subcategories,
        });
    }

    Ok(Json(CategoryListResponseDto {
        status: "success".to_string(),
        categories: listed,
    }))
}
