//! Echo of the caller's verified claims.

use crate::errors::ServiceError;
use axum::{Extension, Json};
use jwtauth::VerifiedToken;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct WhoamiResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claims: Option<Value>,
}

/// `GET /v1/whoami`
///
/// Returns the full verified payload, or `authenticated: false` for an
/// anonymous request.
pub async fn whoami(
    token: Option<Extension<VerifiedToken>>,
) -> Result<Json<WhoamiResponse>, ServiceError> {
    let Some(Extension(token)) = token else {
        return Ok(Json(WhoamiResponse {
            authenticated: false,
            claims: None,
        }));
    };

    let claims: Value = token.custom_claims().map_err(|e| {
        tracing::error!(target: "jwtauth.service.whoami", error = %e, "Verified payload is not JSON");
        ServiceError::Internal
    })?;

    Ok(Json(WhoamiResponse {
        authenticated: true,
        claims: Some(claims),
    }))
}
