//! POST /api/register, POST /api/login, POST /api/logout, GET /api/user

use crate::gate::{CurrentIdentity, SESSION_COOKIE, session_token};
use crate::response::ApiError;
use crate::state::AppState;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use identity::{Credentials, Registration, SessionToken};
use serde_json::json;
use storage::User;
use tracing::info;

/// Response header that also carries the session token, for non-browser clients.
pub const SESSION_HEADER: &str = "x-session-token";

pub async fn register(
    State(state): State<AppState>,
    Json(registration): Json<Registration>,
) -> Result<Response, ApiError> {
    let (user, token) = state
        .identity_task(move |id| {
            let user = id.register(&registration)?;
            let token = id.issue_session(&user)?;
            Ok((user, token))
        })
        .await?;
    info!(user_id = user.id, "registered and signed in");
    Ok(signed_in(StatusCode::CREATED, &user, &token))
}

pub async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Response, ApiError> {
    let (user, token) = state
        .identity_task(move |id| {
            let user = id.authenticate(&credentials)?;
            let token = id.issue_session(&user)?;
            Ok((user, token))
        })
        .await?;
    info!(user_id = user.id, "signed in");
    Ok(signed_in(StatusCode::OK, &user, &token))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if let Some(token) = session_token(&headers) {
        state
            .identity_task(move |id| id.revoke_session(&token))
            .await?;
    }
    let clear = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    Ok((
        StatusCode::OK,
        [(SET_COOKIE, clear)],
        Json(json!({ "message": "Logged out" })),
    )
        .into_response())
}

pub async fn current_user(
    Extension(current): Extension<CurrentIdentity>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(current.require()?))
}

fn signed_in(status: StatusCode, user: &User, token: &SessionToken) -> Response {
    let cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax");
    (
        status,
        [
            (SET_COOKIE, cookie),
            (HeaderName::from_static(SESSION_HEADER), token.to_string()),
        ],
        Json(user),
    )
        .into_response()
}
