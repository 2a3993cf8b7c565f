use crate::{
    AppState,
    db::{ArticleExt, CategoryExt},
    dtos::{
        ARTICLE_PAGE_SIZE, ArticleListResponseDto, ArticleResponseDto, WriterArticlesQuery,
    },
    error::{ErrorMessage, HttpError},
    localized::LocalizedText,
    middleware::AuthenticatedUser,
};
use axum::{
    Extension, Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use validator::Validate;

use tracing::instrument;

/// Router for the writer area. Sits behind the writer area guard.
pub fn writer_handler() -> Router<AppState> {
    Router::new()
        .route("/articles", get(my_articles).post(submit_article))
        .route(
            "/articles/{article_id}",
            put(update_article).delete(delete_article),
        )
}

/// Fields of the multipart article form. Localized title/content arrive as
/// JSON-encoded strings, tags as one comma-separated field, the image as an
/// optional file part.
struct ArticleForm {
    title: Option<LocalizedText>,
    content: Option<LocalizedText>,
    category_id: Option<i32>,
    subcategory_id: Option<i32>,
    tags: Vec<String>,
    image: Option<(String, Vec<u8>)>,
}

async fn parse_article_form(mut multipart: Multipart) -> Result<ArticleForm, HttpError> {
    let mut form = ArticleForm {
        title: None,
        content: None,
        category_id: None,
        subcategory_id: None,
        tags: Vec::new(),
        image: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HttpError::bad_request(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| HttpError::bad_request(e.to_string()))?;
                // The localized map is deserialized exactly once, here at the
                // request boundary.
                form.title = Some(
                    serde_json::from_str(&text)
                        .map_err(|_| HttpError::bad_request("title must be a localized map"))?,
                );
            }
            "content" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| HttpError::bad_request(e.to_string()))?;
                form.content = Some(
                    serde_json::from_str(&text)
                        .map_err(|_| HttpError::bad_request("content must be a localized map"))?,
                );
            }
            "categoryId" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| HttpError::bad_request(e.to_string()))?;
                form.category_id = Some(
                    text.trim()
                        .parse()
                        .map_err(|_| HttpError::bad_request("categoryId must be a number"))?,
                );
            }
            "subcategoryId" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| HttpError::bad_request(e.to_string()))?;
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    form.subcategory_id = Some(trimmed.parse().map_err(|_| {
                        HttpError::bad_request("subcategoryId must be a number")
                    })?);
                }
            }
            "tags" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| HttpError::bad_request(e.to_string()))?;
                for tag in text.split(',') {
                    let tag = tag.trim();
                    if !tag.is_empty() && !form.tags.iter().any(|t| t == tag) {
                        form.tags.push(tag.to_string());
                    }
                }
            }
            "image" => {
                let file_name = field
                    .file_name()
                    .unwrap_or("featured-image")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| HttpError::bad_request(e.to_string()))?;
                if !bytes.is_empty() {
                    form.image = Some((file_name, bytes.to_vec()));
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

fn require_localized(
    title: Option<LocalizedText>,
    content: Option<LocalizedText>,
) -> Result<(LocalizedText, LocalizedText), HttpError> {
    match (title, content) {
        (Some(title), Some(content)) if title.has_english() && content.has_english() => {
            Ok((title, content))
        }
        _ => Err(HttpError::bad_request(
            ErrorMessage::MissingEnglishText.to_string(),
        )),
    }
}

/// Upload the form's image to the external host. Required path: submission
/// fails outright when the upload does — there is no article-without-image
/// fallback.
async fn upload_form_image(
    app_state: &AppState,
    image: Option<(String, Vec<u8>)>,
) -> Result<Option<String>, HttpError> {
    match image {
        Some((file_name, bytes)) => {
            let url = app_state
                .http_client
                .upload_image(
                    &app_state.env.image_api_url,
                    &app_state.env.image_api_key,
                    &file_name,
                    bytes,
                )
                .await?;
            Ok(Some(url))
        }
        None => Ok(None),
    }
}

fn delete_image_background(app_state: AppState, image_url: String) {
    // Hosted file removal is best effort; an orphaned file is acceptable, a
    // blocked request is not.
    tokio::spawn(async move {
        if let Err(e) = app_state
            .http_client
            .delete_image(
                &app_state.env.image_api_url,
                &app_state.env.image_api_key,
                &image_url,
            )
            .await
        {
            tracing::warn!(image_url = %image_url, "Failed to delete hosted image: {}", e);
        }
    });
}

/// Paginated listing of the writer's own articles, any status.
#[instrument(skip(app_state, user), fields(user_id = %user.user.id))]
pub async fn my_articles(
    Query(params): Query<WriterArticlesQuery>,
    Extension(user): Extension<AuthenticatedUser>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    params.validate().map_err(|e| {
        tracing::error!("Invalid writer listing input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let page = params.page.unwrap_or(1);
    let author_id = user.user.id;

    let articles = app_state
        .db_client
        .list_articles(None, Some(author_id), page, ARTICLE_PAGE_SIZE)
        .await
        .map_err(|e| {
            tracing::error!("DB error, listing writer articles: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let total_count = app_state
        .db_client
        .count_articles(None, Some(author_id))
        .await
        .map_err(|e| {
            tracing::error!("DB error, counting writer articles: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    Ok(Json(ArticleListResponseDto {
        status: "success".to_string(),
        articles,
        has_more: page * ARTICLE_PAGE_SIZE < total_count,
        total_count,
    }))
}

/// Submit a new article into PENDING.
#[instrument(skip(app_state, user, multipart), fields(user_id = %user.user.id))]
pub async fn submit_article(
    State(app_state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpError> {
    let form = parse_article_form(multipart).await?;
    let (title, content) = require_localized(form.title, form.content)?;

    let category_id = form
        .category_id
        .ok_or_else(|| HttpError::bad_request("categoryId is required"))?;

    app_state
        .db_client
        .get_category(category_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting category: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::CategoryNotFound.to_string()))?;

    // Image first: the article row is only written once the upload succeeded,
    // so a stored article never points at a missing file.
    let featured_image = upload_form_image(&app_state, form.image).await?;

    let article = app_state
        .db_client
        .create_article(
            user.user.id,
            &title,
            &content,
            category_id,
            form.subcategory_id,
            &form.tags,
            featured_image.as_deref(),
        )
        .await
        .map_err(|e| {
            tracing::error!("DB error, creating article: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(article_id = article.id, "article submitted");
    Ok((
        StatusCode::CREATED,
        Json(ArticleResponseDto {
            status: "success".to_string(),
            data: article,
        }),
    ))
}

/// Edit an own article. Replaces the full tag set; a new image replaces the
/// stored one with the old file removed only after the record points at the
/// new URL.
#[instrument(skip(app_state, user, multipart), fields(user_id = %user.user.id))]
pub async fn update_article(
    Path(article_id): Path<i64>,
    State(app_state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpError> {
    let existing = app_state
        .db_client
        .get_article(article_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting article: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::ArticleNotFound.to_string()))?;

    if existing.author_id != user.user.id {
        tracing::error!(article_id, "non-owner update attempt");
        return Err(HttpError::unauthorized(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    let form = parse_article_form(multipart).await?;
    let (title, content) = require_localized(form.title, form.content)?;

    let category_id = form
        .category_id
        .ok_or_else(|| HttpError::bad_request("categoryId is required"))?;

    // New image first, record second, old file last.
    let new_image = upload_form_image(&app_state, form.image).await?;

    let article = app_state
        .db_client
        .update_article(
            article_id,
            user.user.id,
            &title,
            &content,
            category_id,
            form.subcategory_id,
            &form.tags,
            new_image.as_deref(),
        )
        .await
        .map_err(|e| {
            tracing::error!("DB error, updating article: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    if new_image.is_some() {
        if let Some(old_image) = existing.featured_image {
            delete_image_background(app_state.clone(), old_image);
        }
    }

    tracing::info!(article_id, "article updated");
    Ok(Json(ArticleResponseDto {
        status: "success".to_string(),
        data: article,
    }))
}

/// Hard delete of an own article: the row goes first, then the hosted image.
/// Irreversible, unlike the admin's status flip.
#[instrument(skip(app_state, user), fields(user_id = %user.user.id))]
pub async fn delete_article(
    Path(article_id): Path<i64>,
    State(app_state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, HttpError> {
    let existing = app_state
        .db_client
        .get_article(article_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting article: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::ArticleNotFound.to_string()))?;

    if existing.author_id != user.user.id {
        tracing::error!(article_id, "non-owner delete attempt");
        return Err(HttpError::unauthorized(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    let featured_image = app_state
        .db_client
        .delete_article(article_id, user.user.id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, deleting article: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    if let Some(image_url) = featured_image {
        delete_image_background(app_state, image_url);
    }

    tracing::info!(article_id, "article hard-deleted");
    Ok(StatusCode::NO_CONTENT)
}
