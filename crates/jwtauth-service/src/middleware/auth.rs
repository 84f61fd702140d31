//! Authentication middleware for protected routes.
//!
//! Extracts the bearer token from the `Authorization` header, verifies it,
//! and stores the [`VerifiedToken`] in request extensions for handlers.
//! Handlers must not run for a rejected request.

use crate::bearer::{extract_bearer, BearerError};
use crate::errors::ServiceError;
use crate::observability::metrics::record_auth_rejection;
use crate::verifier::BearerVerifier;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use jwtauth::{StandardClaims, VerifiedToken};
use std::sync::Arc;
use tracing::instrument;

/// Whether requests without credentials may pass.
///
/// Only an absent `Authorization` header counts as anonymous. A header that
/// is present but unusable is always rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthPolicy {
    pub allow_anonymous: bool,
}

impl AuthPolicy {
    /// Every request must carry a valid token.
    #[must_use]
    pub const fn required() -> Self {
        Self {
            allow_anonymous: false,
        }
    }

    /// Requests without an `Authorization` header pass unauthenticated.
    #[must_use]
    pub const fn allow_anonymous() -> Self {
        Self {
            allow_anonymous: true,
        }
    }
}

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    pub verifier: Arc<dyn BearerVerifier>,
    pub policy: AuthPolicy,
}

impl AuthState {
    pub fn new(verifier: Arc<dyn BearerVerifier>, policy: AuthPolicy) -> Self {
        Self { verifier, policy }
    }
}

/// Authentication middleware.
///
/// # Response
///
/// - 401 Unauthorized if the header is unusable or the token is rejected
/// - Continues with `VerifiedToken` in extensions if the token verifies
/// - Continues without one if the header is absent and anonymous access is
///   allowed
#[instrument(skip_all, name = "jwtauth.service.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let header = match req.headers().get(AUTHORIZATION) {
        None => None,
        Some(value) => Some(value.to_str().map_err(|_| reject_bearer(BearerError::Malformed))?),
    };

    if header.is_none() && state.policy.allow_anonymous {
        tracing::debug!(target: "jwtauth.service.middleware.auth", "Anonymous request allowed");
        return Ok(next.run(req).await);
    }

    let token = extract_bearer(header).map_err(reject_bearer)?;

    let verified = state.verifier.verify_bearer(token).map_err(|e| {
        record_auth_rejection("verify");
        tracing::debug!(target: "jwtauth.service.middleware.auth", error = %e, "Token rejected");
        ServiceError::from(e)
    })?;

    req.extensions_mut().insert(verified);

    Ok(next.run(req).await)
}

fn reject_bearer(err: BearerError) -> ServiceError {
    record_auth_rejection("bearer");
    tracing::debug!(
        target: "jwtauth.service.middleware.auth",
        reason = err.reason_code(),
        "Invalid Authorization header"
    );
    ServiceError::from(err)
}

/// Extension trait for reading the verified token from a request.
pub trait ClaimsExt {
    /// The verified token, or `None` for anonymous requests and routes
    /// without the middleware.
    fn verified_token(&self) -> Option<&VerifiedToken>;

    /// Registered claims of the verified token.
    fn claims(&self) -> Option<&StandardClaims> {
        self.verified_token().map(VerifiedToken::claims)
    }
}

impl<B> ClaimsExt for axum::extract::Request<B> {
    fn verified_token(&self) -> Option<&VerifiedToken> {
        self.extensions().get::<VerifiedToken>()
    }
}
