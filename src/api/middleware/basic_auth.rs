//! HTTP basic auth gate for the admin routes.
//!
//! With no credentials configured the gate is open; start-up logs a
//! warning in that case.

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, Request, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use subtle::ConstantTimeEq;

const REALM: &str = "Basic realm=\"admin\"";

/// Expected admin user and password.
#[derive(Clone, Default)]
pub struct AdminCredentials {
    user: Option<String>,
    pass: Option<String>,
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("user", &self.user)
            .field("configured", &self.is_configured())
            .finish()
    }
}

impl AdminCredentials {
    /// Gate requiring `user` / `pass`. Either missing leaves the gate open.
    #[must_use]
    pub const fn new(user: Option<String>, pass: Option<String>) -> Self {
        Self { user, pass }
    }

    /// `true` when both halves are configured.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.user.is_some() && self.pass.is_some()
    }

    /// Checks an `Authorization` header value in constant time.
    #[must_use]
    pub fn accepts(&self, authorization: Option<&str>) -> bool {
        let (Some(user), Some(pass)) = (&self.user, &self.pass) else {
            return true;
        };
        let Some(encoded) = authorization.and_then(|v| v.strip_prefix("Basic ")) else {
            return false;
        };
        let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
            return false;
        };
        let expected = format!("{user}:{pass}");
        bool::from(decoded.as_slice().ct_eq(expected.as_bytes()))
    }
}

fn challenge() -> Response {
    let mut response = (StatusCode::UNAUTHORIZED, "authentication required").into_response();
    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(REALM));
    response
}

/// Rejects requests without valid admin credentials.
pub async fn require_basic_auth(
    State(credentials): State<AdminCredentials>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    if !credentials.accepts(authorization) {
        tracing::warn!(path = %request.uri().path(), "admin request rejected");
        return challenge();
    }

    next.run(request).await
}
