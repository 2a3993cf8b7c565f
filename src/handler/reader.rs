use crate::{
    AppState,
    dtos::{FilterUserDto, SubscriberResponseDto, SubscriberSnapshotDto, UserResponseDto},
    error::HttpError,
    middleware::AuthenticatedUser,
    subscription::evaluate_eligibility,
};
use axum::{Extension, Json, Router, response::IntoResponse, routing::get};
use chrono::Utc;

use tracing::instrument;

/// Router for the reader profile area. Sits behind the reader area guard, so
/// everything here already passed the eligibility check.
pub fn reader_handler() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me))
        .route("/subscription", get(my_subscription))
}

/// Current reader's profile.
#[instrument(skip(user), fields(user_id = %user.user.id))]
pub async fn get_me(
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, HttpError> {
    let filtered_user = FilterUserDto::filter_user(&user.user);

    tracing::info!("get_me successful");
    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        user: filtered_user,
    }))
}

/// Current reader's subscription snapshot, from the already-guarded identity.
#[instrument(skip(user), fields(user_id = %user.user.id))]
pub async fn my_subscription(
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, HttpError> {
    let user = user.user;
    let eligibility =
        evaluate_eligibility(user.subscription_status, user.subscription_end, Utc::now());

    Ok(Json(SubscriberResponseDto {
        status: "success".to_string(),
        subscriber: SubscriberSnapshotDto::from_user(&user, eligibility),
        is_new_user: None,
    }))
}
