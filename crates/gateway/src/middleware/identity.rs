//! Caller identity extraction
//!
//! A non-empty identity header from the fronting identity provider selects a
//! durable identity. Everyone else is anonymous and keyed by session token.

use axum::{extract::FromRequestParts, http::request::Parts};
use newsdesk_common::{errors::AppError, preferences::Identity, validation::sanitize};
use uuid::Uuid;

use super::session::{read_cookie, SessionToken};
use crate::AppState;

/// Identity of the current caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub Identity);

impl Caller {
    pub fn identity(&self) -> &Identity {
        &self.0
    }

    pub fn user_id(&self) -> Option<&str> {
        self.0.user_id()
    }
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = &state.config.session;

        let user = parts
            .headers
            .get(session.user_header.as_str())
            .and_then(|value| value.to_str().ok())
            .map(sanitize)
            .filter(|user| !user.is_empty());

        if let Some(user) = user {
            return Ok(Caller(Identity::User(user)));
        }

        let token = parts
            .extensions
            .get::<SessionToken>()
            .map(|token| token.0.clone())
            .or_else(|| read_cookie(&parts.headers, &session.cookie_name))
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());

        Ok(Caller(Identity::Anonymous(token)))
    }
}
