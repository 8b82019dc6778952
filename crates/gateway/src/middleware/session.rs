//! Anonymous session cookie
//!
//! Every request carries a [`SessionToken`] extension. Callers arriving
//! without a usable cookie get a fresh token and a `Set-Cookie` header.

use axum::{
    extract::{Request, State},
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue, Method,
    },
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::AppState;

const MAX_TOKEN_LEN: usize = 128;

/// Session token of the current request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(pub String);

/// Attach the caller's session token, minting one when absent
pub async fn ensure_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    let session = &state.config.session;
    let existing = read_cookie(request.headers(), &session.cookie_name);
    let minted = existing.is_none();
    let token = existing.unwrap_or_else(|| Uuid::new_v4().simple().to_string());

    request.extensions_mut().insert(SessionToken(token.clone()));
    let mut response = next.run(request).await;

    if minted {
        let cookie = format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            session.cookie_name, token, session.lifetime_secs
        );
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => tracing::warn!(error = %e, "Session cookie is not a valid header value"),
        }
    }

    response
}

/// Value of cookie `name`, if present and shaped like a token we issue
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
        .filter(|value| is_token(value))
        .map(str::to_string)
}

fn is_token(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_TOKEN_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
