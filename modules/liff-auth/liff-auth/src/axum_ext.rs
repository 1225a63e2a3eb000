//! Axum middleware and extractors for the LIFF guard.
//!
//! ```ignore
//! let auth = Arc::new(LiffAuth::builder(cfg).user_store(store).build()?);
//! let app = Router::new()
//!     .route("/me", get(me))
//!     .layer(axum::middleware::from_fn_with_state(auth, liff_auth_middleware));
//!
//! async fn me(AuthenticatedUser(user): AuthenticatedUser) -> Json<User> {
//!     Json(user)
//! }
//! ```

use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use liff_auth_sdk::User;
use serde_json::json;

use crate::domain::{GuardError, RequestCredentials};
use crate::registry::LiffAuth;

const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";

/// Outcome of the guard check, stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub Option<User>);

/// Extractor for handlers that require a logged-in user.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// No user resolved for the request.
    Unauthenticated,
    /// `liff_auth_middleware` did not run for this route.
    MissingMiddleware,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated => problem(
                StatusCode::UNAUTHORIZED,
                "Unauthorized",
                "Missing, invalid or expired credentials",
            ),
            Self::MissingMiddleware => problem(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
                "CurrentUser not found - auth middleware not configured",
            ),
        }
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AuthRejection::MissingMiddleware)
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<CurrentUser>() {
            Some(CurrentUser(Some(user))) => Ok(Self(user.clone())),
            Some(CurrentUser(None)) => Err(AuthRejection::Unauthenticated),
            None => Err(AuthRejection::MissingMiddleware),
        }
    }
}

/// Runs the default guard for every request and records the result as
/// [`CurrentUser`].
///
/// Anonymous and rejected requests pass through with `CurrentUser(None)`;
/// handlers decide whether that is acceptable. Only infrastructure failures
/// short-circuit the request.
pub async fn liff_auth_middleware(
    State(auth): State<Arc<LiffAuth>>,
    mut req: Request,
    next: Next,
) -> Response {
    let credentials = RequestCredentials::from_headers(req.headers(), &auth.config().token);

    let mut guard = match auth.guard(credentials) {
        Ok(guard) => guard,
        Err(e) => {
            tracing::error!(error = %e, "auth guard not available");
            return problem(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
                "Internal authentication error",
            );
        }
    };

    match guard.check().await {
        Ok(user) => {
            req.extensions_mut().insert(CurrentUser(user));
            next.run(req).await
        }
        Err(e) => guard_error_to_response(&e),
    }
}

fn guard_error_to_response(err: &GuardError) -> Response {
    if err.is_unavailable() {
        return problem(
            StatusCode::SERVICE_UNAVAILABLE,
            "Service Unavailable",
            "Authentication service unavailable",
        );
    }
    problem(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal Server Error",
        "Internal authentication error",
    )
}

fn problem(status: StatusCode, title: &str, detail: &str) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, PROBLEM_CONTENT_TYPE)],
        Json(json!({
            "type": "about:blank",
            "title": title,
            "status": status.as_u16(),
            "detail": detail,
        })),
    )
        .into_response()
}
