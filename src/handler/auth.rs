use crate::{
    AppState,
    db::UserExt,
    dtos::{LoginDto, LoginResponseDto, Response, SignupDto},
    error::{ErrorMessage, HttpError},
    middleware::SESSION_COOKIE,
    models::{User, UserRole},
    subscription::{apply_lazy_expiry, evaluate_eligibility, trial_window},
    utils::{password, token},
};
use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::post,
};
use axum_extra::extract::cookie::Cookie;
use chrono::Utc;
use validator::Validate;

use tracing::instrument;

/// Router for authentication endpoints
pub fn auth_handler() -> Router<AppState> {
    Router::new()
        .route("/reader/login", post(reader_login))
        .route("/writer/login", post(writer_login))
        .route("/admin/login", post(admin_login))
        .route("/signup", post(signup))
        .route("/logout", post(logout))
}

/// Reader self-service signup: creates an ACTIVE account with a 3-day trial
/// window and logs the new reader in.
#[instrument(skip(app_state, body), fields(phone = %body.phone))]
pub async fn signup(
    State(app_state): State<AppState>,
    Json(body): Json<SignupDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid signup input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let hash_password = password::hash(&body.password).map_err(|e| {
        tracing::error!("Password hashing error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    let window = trial_window(Utc::now());

    let result = app_state
        .db_client
        .save_reader(&body.name, &body.phone, &hash_password, window.start, window.end)
        .await;

    match result {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "signup successful");
            let response = login_response(&app_state, &user, true)?;
            Ok((StatusCode::CREATED, response))
        }
        Err(sqlx::Error::Database(db_err)) => {
            if db_err.is_unique_violation() {
                tracing::error!("DB error, saving reader, unique violation: {}", db_err);
                Err(HttpError::unique_constraint_violation(
                    "An account with this phone number already exists".to_string(),
                ))
            } else {
                tracing::error!("DB error, saving reader: {}", db_err);
                Err(HttpError::server_error(
                    ErrorMessage::ServerError.to_string(),
                ))
            }
        }
        Err(e) => {
            tracing::error!("DB error, saving reader: {}", e);
            Err(HttpError::server_error(
                ErrorMessage::ServerError.to_string(),
            ))
        }
    }
}

#[instrument(skip(app_state, body), fields(identifier = %body.identifier))]
pub async fn reader_login(
    State(app_state): State<AppState>,
    Json(body): Json<LoginDto>,
) -> Result<impl IntoResponse, HttpError> {
    let user = authenticate(&app_state, &body, UserRole::Reader).await?;

    // Expiry enforcement is the same pure check everywhere, login included.
    let user = apply_lazy_expiry(&app_state.db_client, user).await?;
    let eligibility =
        evaluate_eligibility(user.subscription_status, user.subscription_end, Utc::now());
    if !eligibility.eligible {
        tracing::info!(user_id = %user.id, "reader login blocked, subscription inactive");
        return Err(HttpError::unauthorized(
            ErrorMessage::SubscriptionInactive.to_string(),
        ));
    }

    tracing::info!(user_id = %user.id, "reader login successful");
    login_response(&app_state, &user, true)
}

#[instrument(skip(app_state, body), fields(identifier = %body.identifier))]
pub async fn writer_login(
    State(app_state): State<AppState>,
    Json(body): Json<LoginDto>,
) -> Result<impl IntoResponse, HttpError> {
    let user = authenticate(&app_state, &body, UserRole::Writer).await?;
    tracing::info!(user_id = %user.id, "writer login successful");
    login_response(&app_state, &user, false)
}

#[instrument(skip(app_state, body), fields(identifier = %body.identifier))]
pub async fn admin_login(
    State(app_state): State<AppState>,
    Json(body): Json<LoginDto>,
) -> Result<impl IntoResponse, HttpError> {
    let user = authenticate(&app_state, &body, UserRole::Admin).await?;
    tracing::info!(user_id = %user.id, "admin login successful");
    login_response(&app_state, &user, false)
}

/// Clear the session cookie.
#[instrument]
pub async fn logout() -> Result<impl IntoResponse, HttpError> {
    let cleared = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .http_only(true)
        .build();

    let mut headers = HeaderMap::new();
    headers.append(header::SET_COOKIE, cleared.to_string().parse().unwrap());

    let json_response = axum::response::Json(Response {
        status: "success",
        message: "Logout successful".to_string(),
    });

    let mut response = json_response.into_response();
    response.headers_mut().extend(headers);
    tracing::info!("logout successful");
    Ok(response)
}

/// Credential check shared by the three login variants.
///
/// Lookup is by phone unless the identifier contains '@'. Every failure —
/// unknown identifier, wrong password, role mismatch — collapses into the
/// same generic InvalidCredentials message.
async fn authenticate(
    app_state: &AppState,
    body: &LoginDto,
    required_role: UserRole,
) -> Result<User, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid login input: {}", e);
        HttpError::unauthorized(ErrorMessage::InvalidCredentials.to_string())
    })?;

    let result = if body.identifier.contains('@') {
        app_state
            .db_client
            .get_user(None, None, Some(&body.identifier))
            .await
    } else {
        app_state
            .db_client
            .get_user(None, Some(&body.identifier), None)
            .await
    }
    .map_err(|e| {
        tracing::error!("DB error, getting user: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    let user = result.ok_or_else(|| {
        tracing::error!("User not found");
        HttpError::unauthorized(ErrorMessage::InvalidCredentials.to_string())
    })?;

    let password_matched = password::compare(&body.password, &user.password).map_err(|e| {
        tracing::error!("Password error: {}", e);
        HttpError::unauthorized(ErrorMessage::InvalidCredentials.to_string())
    })?;

    if !password_matched {
        tracing::error!("password mismatch");
        return Err(HttpError::unauthorized(
            ErrorMessage::InvalidCredentials.to_string(),
        ));
    }

    if user.role != required_role {
        tracing::error!(user_id = %user.id, "role mismatch on login");
        return Err(HttpError::unauthorized(
            ErrorMessage::InvalidCredentials.to_string(),
        ));
    }

    Ok(user)
}

/// Issue a session token and attach it as the session cookie.
///
/// Reader cookies carry a 24h max-age on top of the 2h token expiry; the
/// token's signed expiry stays the sole validity authority, the longer cookie
/// just keeps the transport alive across the renewal flow.
pub fn login_response(
    app_state: &AppState,
    user: &User,
    reader_session: bool,
) -> Result<axum::response::Response, HttpError> {
    let contact = user.email.as_deref().unwrap_or(&user.phone);

    let session_token = token::create_token(
        &user.id.to_string(),
        contact,
        user.role,
        app_state.env.jwt_secret.as_bytes(),
        app_state.env.jwt_maxage,
    )
    .map_err(|e| {
        tracing::error!("Token creation error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    let mut cookie_builder = Cookie::build((SESSION_COOKIE, session_token.clone()))
        .path("/")
        .http_only(true)
        .secure(true);

    if reader_session {
        cookie_builder = cookie_builder.max_age(time::Duration::seconds(
            app_state.env.reader_cookie_maxage,
        ));
    }

    let cookie = cookie_builder.build();

    let json_response = axum::response::Json(LoginResponseDto {
        status: "success".to_string(),
        token: session_token,
        name: user.name.clone(),
        role: user.role.to_str().to_string(),
    });

    let mut headers = HeaderMap::new();
    headers.append(header::SET_COOKIE, cookie.to_string().parse().unwrap());

    let mut response = json_response.into_response();
    response.headers_mut().extend(headers);
    Ok(response)
}
