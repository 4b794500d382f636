//! Bearer token check for the temperature API
//!
//! Preflight `OPTIONS` requests carry no credentials. They pass through so
//! the CORS layer can answer them.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::api::types::Envelope;

/// The token every device and dashboard request must present
#[derive(Clone)]
pub struct ApiToken(Arc<str>);

impl ApiToken {
    pub fn new(token: impl Into<Arc<str>>) -> Self {
        Self(token.into())
    }

    /// Accepts `Authorization: Bearer <token>`; the scheme is case-insensitive
    pub fn verify(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let value = headers
            .get(header::AUTHORIZATION)
            .ok_or(AuthError::MissingToken)?
            .to_str()
            .map_err(|_| AuthError::InvalidFormat)?;

        let (scheme, presented) = value.split_once(' ').ok_or(AuthError::InvalidFormat)?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return Err(AuthError::InvalidFormat);
        }

        if presented.trim() != &*self.0 {
            return Err(AuthError::InvalidToken);
        }

        Ok(())
    }
}

pub async fn require_token(State(token): State<ApiToken>, request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    match token.verify(request.headers()) {
        Ok(()) => next.run(request).await,
        Err(err) => {
            debug!("rejected {} {}: {}", request.method(), request.uri().path(), err);
            err.into_response()
        }
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingToken,

    #[error("Invalid Authorization format (expected: Bearer <token>)")]
    InvalidFormat,

    #[error("Invalid token")]
    InvalidToken,
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingToken | AuthError::InvalidFormat => StatusCode::UNAUTHORIZED,
            AuthError::InvalidToken => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(Envelope::error(self.to_string()))).into_response()
    }
}
