//! Access gate middleware.
//!
//! For each request that matches the route table:
//!
//! 1. resolve the caller's identity from the session token;
//! 2. ask [`policy::evaluate`] whether that identity may reach the route's class;
//! 3. on allow, check the body against the route's input contract;
//! 4. hand the identity and placeholder bindings to the handler through
//!    request extensions.
//!
//! Requests that match no route pass through untouched, so axum answers 404
//! or 405 as usual.

use crate::api::InputContract;
use crate::response::ApiError;
use crate::state::AppState;
use crate::validate::Violation;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE};
use axum::http::{self, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use identity::SessionToken;
use policy::{Decision, Method, Params};
use std::sync::Arc;
use storage::User;
use tracing::{debug, warn};

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "carekeeper_sid";

/// The identity resolved for this request, if any.
#[derive(Debug, Clone, Default)]
pub struct CurrentIdentity(pub Option<User>);

impl CurrentIdentity {
    /// The signed-in user, or an unauthenticated denial.
    pub fn require(self) -> Result<User, ApiError> {
        self.0
            .ok_or(ApiError::Denied(policy::Denial::Unauthenticated))
    }
}

/// Placeholder bindings of the matched route.
#[derive(Debug, Clone, Default)]
pub struct RouteParams(pub Params);

impl RouteParams {
    /// Integer placeholder, e.g. the `:id` in `/api/medications/:id`.
    pub fn id(&self, name: &str) -> Result<i64, ApiError> {
        self.0
            .get(name)
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| ApiError::Validation(Violation::field(name, format!("Invalid {name}"))))
    }
}

pub async fn access_gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(method) = route_method(request.method()) else {
        return next.run(request).await;
    };
    let path = request.uri().path().to_owned();

    let Some(resolved) = state.routes.resolve(method, &path) else {
        return next.run(request).await;
    };
    let class = resolved.route.class;
    let endpoint = resolved.route.endpoint.endpoint;
    let input = resolved.route.endpoint.input;
    let params = resolved.params;

    let identity = match session_token(request.headers()) {
        Some(token) => resolve_identity(&state, token).await,
        None => None,
    };

    let principal = identity.as_ref().map(User::principal);
    if let Decision::Deny(denial) = policy::evaluate(principal.as_ref(), class, Utc::now()) {
        debug!(
            %method,
            path = %path,
            ?endpoint,
            %denial,
            user_id = identity.as_ref().map(|u| u.id),
            "access denied"
        );
        return ApiError::Denied(denial).into_response();
    }

    let mut request = match input {
        Some(contract) => match check_body(request, contract, state.body_limit).await {
            Ok(request) => request,
            Err(err) => {
                debug!(%method, path = %path, ?endpoint, error = %err, "rejected request body");
                return err.into_response();
            }
        },
        None => request,
    };

    request.extensions_mut().insert(CurrentIdentity(identity));
    request.extensions_mut().insert(RouteParams(params));
    next.run(request).await
}

/// Table method for an incoming request. axum answers HEAD with the GET
/// handler, so HEAD is gated as GET. Methods the table has no entry for are
/// never routed to a handler.
fn route_method(method: &http::Method) -> Option<Method> {
    if method == http::Method::HEAD {
        return Some(Method::Get);
    }
    method.as_str().parse().ok()
}

/// Look the token up with the identity provider. Any failure, including a
/// timeout, resolves to no identity.
async fn resolve_identity(state: &AppState, token: SessionToken) -> Option<User> {
    let provider = Arc::clone(&state.identity);
    let lookup = tokio::task::spawn_blocking(move || provider.current_identity(&token));

    match tokio::time::timeout(state.resolve_timeout, lookup).await {
        Ok(Ok(Ok(user))) => user,
        Ok(Ok(Err(e))) => {
            warn!(error = %e, "identity lookup failed, treating request as unauthenticated");
            None
        }
        Ok(Err(e)) => {
            warn!(error = %e, "identity lookup task failed, treating request as unauthenticated");
            None
        }
        Err(_) => {
            warn!(
                timeout_ms = state.resolve_timeout.as_millis() as u64,
                "identity lookup timed out, treating request as unauthenticated"
            );
            None
        }
    }
}

async fn check_body(
    request: Request,
    contract: InputContract,
    limit: usize,
) -> Result<Request, ApiError> {
    let is_json = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    if !is_json {
        return Err(ApiError::Validation(Violation::new(
            "Content-Type must be application/json",
        )));
    }

    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, limit).await.map_err(|_| {
        ApiError::Validation(Violation::new("Request body is too large or unreadable"))
    })?;
    contract.check(&bytes).map_err(ApiError::Validation)?;

    Ok(Request::from_parts(parts, Body::from(bytes)))
}

/// Session token from `Authorization: Bearer` or the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<SessionToken> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(SessionToken::new(token));
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| SessionToken::new(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(session_token(&headers), Some(SessionToken::new("abc123")));
    }

    #[test]
    fn test_cookie_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; carekeeper_sid=tok; other=1"),
        );
        assert_eq!(session_token(&headers), Some(SessionToken::new("tok")));
    }

    #[test]
    fn test_no_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic Zm9v"));
        headers.insert(COOKIE, HeaderValue::from_static("carekeeper_sid="));
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn test_head_is_gated_as_get() {
        assert_eq!(route_method(&http::Method::HEAD), Some(Method::Get));
        assert_eq!(route_method(&http::Method::PATCH), Some(Method::Patch));
        assert_eq!(route_method(&http::Method::OPTIONS), None);
    }

    #[test]
    fn test_route_params_id() {
        let table = crate::api::route_table().unwrap();
        let ok = table.resolve(Method::Delete, "/api/medications/42").unwrap();
        assert_eq!(RouteParams(ok.params).id("id").unwrap(), 42);

        let bad = table.resolve(Method::Delete, "/api/medications/abc").unwrap();
        assert!(matches!(
            RouteParams(bad.params).id("id"),
            Err(ApiError::Validation(_))
        ));
    }
}
