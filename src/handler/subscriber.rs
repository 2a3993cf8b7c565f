use crate::{
    AppState,
    db::UserExt,
    dtos::{
        ChargeQueryDto, PhoneQueryDto, RegisterTrialDto, RenewRequestDto, SubscriberResponseDto,
        SubscriberSnapshotDto,
    },
    error::{ErrorMessage, HttpError},
    middleware::{SESSION_COOKIE, maybe_identity},
    subscription::{
        self, DEFAULT_PERIOD_DAYS, apply_lazy_expiry, evaluate_eligibility, trial_window,
    },
    utils::password,
};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::Utc;
use validator::Validate;

use tracing::instrument;

/// Router for subscriber and billing endpoints.
///
/// These are the endpoints the SMS onboarding flow and the billing gateway
/// call; none of them sit behind an area guard.
pub fn subscriber_handler() -> Router<AppState> {
    Router::new()
        .route(
            "/subscribers",
            get(register_or_login_query).post(register_or_login),
        )
        .route("/subscribers/status", get(subscription_status))
        .route("/subscribers/renew", post(renew_subscriber))
        .route("/charge-subscriber", get(charge_subscriber))
        .route("/cancel-subscription", get(cancel_subscription))
}

/// GET variant of the first-touch endpoint; the SMS gateway can only issue
/// GETs with query parameters.
#[instrument(skip(app_state, params), fields(phone = %params.phone))]
pub async fn register_or_login_query(
    State(app_state): State<AppState>,
    Query(params): Query<RegisterTrialDto>,
) -> Result<impl IntoResponse, HttpError> {
    register_trial(app_state, params).await
}

#[instrument(skip(app_state, body), fields(phone = %body.phone))]
pub async fn register_or_login(
    State(app_state): State<AppState>,
    Json(body): Json<RegisterTrialDto>,
) -> Result<impl IntoResponse, HttpError> {
    register_trial(app_state, body).await
}

/// Idempotent get-or-create: a known phone falls through to credential
/// verification, a new phone gets a READER account with the trial window.
/// Either way the caller ends up authenticated with a session cookie.
async fn register_trial(
    app_state: AppState,
    body: RegisterTrialDto,
) -> Result<axum::response::Response, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid subscriber input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let existing = app_state
        .db_client
        .get_user(None, Some(&body.phone), None)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting subscriber: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let (user, is_new_user) = match existing {
        Some(user) => {
            let password_matched =
                password::compare(&body.password, &user.password).map_err(|e| {
                    tracing::error!("Password error: {}", e);
                    HttpError::unauthorized(ErrorMessage::InvalidCredentials.to_string())
                })?;

            if !password_matched {
                tracing::error!("password mismatch on subscriber endpoint");
                return Err(HttpError::unauthorized(
                    ErrorMessage::InvalidCredentials.to_string(),
                ));
            }

            let user = apply_lazy_expiry(&app_state.db_client, user).await?;
            (user, false)
        }
        None => {
            let hash_password = password::hash(&body.password).map_err(|e| {
                tracing::error!("Password hashing error: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            })?;

            let name = body.name.as_deref().unwrap_or(&body.phone);
            let window = trial_window(Utc::now());

            let user = app_state
                .db_client
                .save_reader(name, &body.phone, &hash_password, window.start, window.end)
                .await
                .map_err(|e| {
                    tracing::error!("DB error, saving trial subscriber: {}", e);
                    HttpError::server_error(ErrorMessage::ServerError.to_string())
                })?;

            tracing::info!(user_id = %user.id, "trial subscriber registered");
            (user, true)
        }
    };

    let eligibility =
        evaluate_eligibility(user.subscription_status, user.subscription_end, Utc::now());

    let json_response = Json(SubscriberResponseDto {
        status: "success".to_string(),
        subscriber: SubscriberSnapshotDto::from_user(&user, eligibility),
        is_new_user: Some(is_new_user),
    });

    // Authenticate in the same round trip: the first-touch flow has no
    // separate login step.
    let login = crate::handler::auth::login_response(&app_state, &user, true)?;
    let status = if is_new_user {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    let mut response = (status, json_response).into_response();
    for value in login.headers().get_all(header::SET_COOKIE) {
        response
            .headers_mut()
            .append(header::SET_COOKIE, value.clone());
    }
    Ok(response)
}

/// Current subscription snapshot. Reading it runs the lazy expiry check, so a
/// lapsed ACTIVE subscriber comes back INACTIVE from this endpoint.
#[instrument(skip(app_state))]
pub async fn subscription_status(
    State(app_state): State<AppState>,
    Query(params): Query<PhoneQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    params.validate().map_err(|e| {
        tracing::error!("Invalid status input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let user = app_state
        .db_client
        .get_user(None, Some(&params.phone), None)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting subscriber: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::SubscriberNotFound.to_string()))?;

    let user = apply_lazy_expiry(&app_state.db_client, user).await?;
    let eligibility =
        evaluate_eligibility(user.subscription_status, user.subscription_end, Utc::now());

    Ok(Json(SubscriberResponseDto {
        status: "success".to_string(),
        subscriber: SubscriberSnapshotDto::from_user(&user, eligibility),
        is_new_user: None,
    }))
}

/// Billing gateway charge callback.
#[instrument(skip(app_state))]
pub async fn charge_subscriber(
    State(app_state): State<AppState>,
    Query(params): Query<ChargeQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    params.validate().map_err(|e| {
        tracing::error!("Invalid charge input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let period_days = params.period_days.unwrap_or(DEFAULT_PERIOD_DAYS);
    let user = subscription::charge(&app_state.db_client, &params.phone, period_days).await?;

    let eligibility =
        evaluate_eligibility(user.subscription_status, user.subscription_end, Utc::now());
    tracing::info!(user_id = %user.id, "subscriber charged");

    Ok(Json(SubscriberResponseDto {
        status: "success".to_string(),
        subscriber: SubscriberSnapshotDto::from_user(&user, eligibility),
        is_new_user: None,
    }))
}

#[instrument(skip(app_state, body), fields(phone = %body.phone))]
pub async fn renew_subscriber(
    State(app_state): State<AppState>,
    Json(body): Json<RenewRequestDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid renew input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let duration_days = body.duration_days.unwrap_or(DEFAULT_PERIOD_DAYS);
    let user = subscription::renew(&app_state.db_client, &body.phone, duration_days).await?;

    let eligibility =
        evaluate_eligibility(user.subscription_status, user.subscription_end, Utc::now());
    tracing::info!(user_id = %user.id, "subscription renewed");

    Ok(Json(SubscriberResponseDto {
        status: "success".to_string(),
        subscriber: SubscriberSnapshotDto::from_user(&user, eligibility),
        is_new_user: None,
    }))
}

/// Explicit unsubscribe. When the request carries a valid session for the
/// same subscriber (the self-service path), the session cookie is cleared in
/// the same response.
#[instrument(skip(app_state, cookie_jar, req_headers))]
pub async fn cancel_subscription(
    cookie_jar: CookieJar,
    req_headers: HeaderMap,
    State(app_state): State<AppState>,
    Query(params): Query<PhoneQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    params.validate().map_err(|e| {
        tracing::error!("Invalid cancel input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let user = subscription::cancel(&app_state.db_client, &params.phone).await?;
    tracing::info!(user_id = %user.id, "subscription cancelled");

    let eligibility =
        evaluate_eligibility(user.subscription_status, user.subscription_end, Utc::now());

    let json_response = Json(SubscriberResponseDto {
        status: "success".to_string(),
        subscriber: SubscriberSnapshotDto::from_user(&user, eligibility),
        is_new_user: None,
    });

    let mut response = json_response.into_response();

    let session_user = maybe_identity(&cookie_jar, &req_headers, &app_state).await;
    if session_user.is_some_and(|s| s.id == user.id) {
        let cleared = Cookie::build((SESSION_COOKIE, ""))
            .path("/")
            .max_age(time::Duration::ZERO)
            .http_only(true)
            .build();
        response
            .headers_mut()
            .append(header::SET_COOKIE, cleared.to_string().parse().unwrap());
    }

    Ok(response)
}
