use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    db::UserExt,
    error::{ErrorMessage, HttpError},
    guard::{GuardDecision, GuardIdentity, ProtectedArea, decide},
    models::{User, UserRole},
    subscription::{apply_lazy_expiry, evaluate_eligibility},
    utils::token,
};

/// Name of the session cookie. The cookie is transport only; the signed token
/// inside it is the sole validity authority.
pub const SESSION_COOKIE: &str = "token";

/// Request extension carrying the authenticated user.
///
/// Inserted by the area guards after a successful decision; downstream
/// handlers extract it with `Extension<AuthenticatedUser>`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
}

/// Resolve the current identity from the session cookie or Authorization
/// header. Any failure — missing token, bad signature, expired token, user
/// gone — is "no identity", never an error.
pub async fn maybe_identity(
    cookie_jar: &CookieJar,
    req_headers: &axum::http::HeaderMap,
    app_state: &AppState,
) -> Option<User> {
    let raw_token = cookie_jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .or_else(|| {
            req_headers
                .get(header::AUTHORIZATION)
                .and_then(|auth_header| auth_header.to_str().ok())
                .and_then(|auth_value| {
                    auth_value
                        .strip_prefix("Bearer ")
                        .map(|token| token.to_owned())
                })
        })?;

    let claims = token::resolve_token(raw_token, app_state.env.jwt_secret.as_bytes())?;

    let user_id = uuid::Uuid::parse_str(&claims.sub).ok()?;

    app_state
        .db_client
        .get_user(Some(user_id), None, None)
        .await
        .ok()
        .flatten()
}

/// Guard for the reader area: role READER plus a live subscription.
pub async fn reader_guard(
    cookie_jar: CookieJar,
    State(app_state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, HttpError> {
    area_guard(ProtectedArea::Reader, cookie_jar, app_state, req, next).await
}

/// Guard for the writer area: role WRITER.
pub async fn writer_guard(
    cookie_jar: CookieJar,
    State(app_state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, HttpError> {
    area_guard(ProtectedArea::Writer, cookie_jar, app_state, req, next).await
}

/// Guard for the admin area: role ADMIN.
pub async fn admin_guard(
    cookie_jar: CookieJar,
    State(app_state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, HttpError> {
    area_guard(ProtectedArea::Admin, cookie_jar, app_state, req, next).await
}

/// Shared guard body: resolve identity, compute eligibility for reader areas
/// (with the lazy-expiry write), then act on the pure guard decision. All
/// failures are silent redirects to the area's entry point — the response
/// never distinguishes a missing token from a bad one or a wrong role.
async fn area_guard(
    area: ProtectedArea,
    cookie_jar: CookieJar,
    app_state: AppState,
    mut req: Request,
    next: Next,
) -> Result<Response, HttpError> {
    let user = maybe_identity(&cookie_jar, req.headers(), &app_state).await;

    let (identity, user) = match user {
        Some(user) => {
            let user = if area == ProtectedArea::Reader && user.role == UserRole::Reader {
                apply_lazy_expiry(&app_state.db_client, user).await?
            } else {
                user
            };

            let eligibility = (area == ProtectedArea::Reader).then(|| {
                evaluate_eligibility(
                    user.subscription_status,
                    user.subscription_end,
                    chrono::Utc::now(),
                )
            });

            (
                Some(GuardIdentity {
                    role: user.role,
                    eligibility,
                }),
                Some(user),
            )
        }
        None => (None, None),
    };

    match decide(area, identity.as_ref()) {
        GuardDecision::Allow => {
            // The guard only allows with a resolved identity, so this user is
            // always present here.
            let user = user.ok_or_else(|| {
                HttpError::unauthorized(ErrorMessage::UserNotAuthenticated.to_string())
            })?;
            req.extensions_mut().insert(AuthenticatedUser { user });
            Ok(next.run(req).await)
        }
        GuardDecision::Redirect(target) => Ok(Redirect::to(target).into_response()),
    }
}
