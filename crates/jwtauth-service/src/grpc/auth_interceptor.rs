//! gRPC authentication interceptor.
//!
//! Reads the bearer token from the `authorization` metadata, verifies it
//! synchronously (verification never blocks on the network; keys come from
//! the registry's in-memory snapshot) and attaches the [`VerifiedToken`] to
//! the request extensions.
//!
//! Every failure is `UNAUTHENTICATED`. The message names the adapter-level
//! problem or the rejection reason; internal verifier failures get a generic
//! message.

use crate::bearer::{extract_bearer, BearerError};
use crate::middleware::AuthPolicy;
use crate::observability::metrics::record_auth_rejection;
use crate::verifier::{BearerVerifier, VerifyError};
use jwtauth::VerifiedToken;
use std::sync::Arc;
use tonic::{service::Interceptor, Request, Status};
use tracing::instrument;

#[derive(Clone)]
pub struct GrpcAuthInterceptor {
    verifier: Arc<dyn BearerVerifier>,
    policy: AuthPolicy,
}

impl GrpcAuthInterceptor {
    /// Create an interceptor that requires a valid token on every call.
    pub fn new(verifier: Arc<dyn BearerVerifier>) -> Self {
        Self {
            verifier,
            policy: AuthPolicy::required(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: AuthPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl Interceptor for GrpcAuthInterceptor {
    #[instrument(skip_all, name = "jwtauth.service.grpc.auth")]
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        let header = match request.metadata().get("authorization") {
            None => None,
            Some(value) => Some(
                value
                    .to_str()
                    .map_err(|_| reject_bearer(BearerError::Malformed))?,
            ),
        };

        if header.is_none() && self.policy.allow_anonymous {
            tracing::debug!(target: "jwtauth.service.grpc.auth", "Anonymous call allowed");
            return Ok(request);
        }

        let token = extract_bearer(header).map_err(reject_bearer)?;

        let verified = self.verifier.verify_bearer(token).map_err(|e| {
            record_auth_rejection("verify");
            match e {
                VerifyError::Rejected(reason) => {
                    tracing::debug!(
                        target: "jwtauth.service.grpc.auth",
                        reason = reason.reason_code(),
                        "Token rejected"
                    );
                    Status::unauthenticated(reason.to_string())
                }
                VerifyError::Internal(detail) => {
                    tracing::error!(target: "jwtauth.service.grpc.auth", error = %detail, "Verifier failed");
                    Status::unauthenticated("Unknown auth error")
                }
            }
        })?;

        request.extensions_mut().insert(verified);
        Ok(request)
    }
}

fn reject_bearer(err: BearerError) -> Status {
    record_auth_rejection("bearer");
    tracing::debug!(
        target: "jwtauth.service.grpc.auth",
        reason = err.reason_code(),
        "Invalid authorization metadata"
    );
    Status::unauthenticated(err.to_string())
}

/// The token verified by [`GrpcAuthInterceptor`], if any.
pub fn verified_token<T>(request: &Request<T>) -> Option<&VerifiedToken> {
    request.extensions().get::<VerifiedToken>()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use jwtauth::{AuthError, KeySet, Verifier};
    use jwtauth_test_utils::{TestClaimsBuilder, TestKeypair};
    use tonic::Code;

    fn interceptor(keypair: &TestKeypair) -> GrpcAuthInterceptor {
        let jwk = serde_json::from_value(keypair.jwk_json()).unwrap();
        GrpcAuthInterceptor::new(Arc::new(Verifier::new(KeySet::new(vec![jwk]))))
    }

    fn request_with(authorization: Option<&str>) -> Request<()> {
        let mut request = Request::new(());
        if let Some(value) = authorization {
            request
                .metadata_mut()
                .insert("authorization", value.parse().unwrap());
        }
        request
    }

    struct FailingVerifier;

    impl BearerVerifier for FailingVerifier {
        fn verify_bearer(&self, _token: &str) -> Result<VerifiedToken, VerifyError> {
            Err(VerifyError::Internal("key backend unavailable".to_string()))
        }
    }

    #[test]
    fn test_valid_token_attaches_claims() {
        let keypair = TestKeypair::new(1, "k");
        let token = keypair.sign_token(&TestClaimsBuilder::new().for_subject("alice").build());

        let request = interceptor(&keypair)
            .call(request_with(Some(&format!("Bearer {token}"))))
            .unwrap();
        assert_eq!(verified_token(&request).unwrap().subject(), Some("alice"));
    }

    #[test]
    fn test_missing_metadata_is_unauthenticated() {
        let keypair = TestKeypair::new(1, "k");
        let status = interceptor(&keypair).call(request_with(None)).unwrap_err();
        assert_eq!(status.code(), Code::Unauthenticated);
    }

    #[test]
    fn test_wrong_scheme_and_empty_token() {
        let keypair = TestKeypair::new(1, "k");
        for value in ["Basic abc", "Bearer ", "Bearer"] {
            let status = interceptor(&keypair)
                .call(request_with(Some(value)))
                .unwrap_err();
            assert_eq!(status.code(), Code::Unauthenticated, "value: {value:?}");
        }
    }

    #[test]
    fn test_rejected_token_reports_reason() {
        let keypair = TestKeypair::new(1, "k");
        let token = keypair.sign_token(&TestClaimsBuilder::new().expires_in(-60).build());

        let status = interceptor(&keypair)
            .call(request_with(Some(&format!("Bearer {token}"))))
            .unwrap_err();
        assert_eq!(status.code(), Code::Unauthenticated);
        assert_eq!(status.message(), AuthError::ExpiredToken.to_string());
    }

    #[test]
    fn test_internal_failure_hides_detail() {
        let mut interceptor = GrpcAuthInterceptor::new(Arc::new(FailingVerifier));
        let status = interceptor
            .call(request_with(Some("Bearer anything")))
            .unwrap_err();
        assert_eq!(status.code(), Code::Unauthenticated);
        assert!(!status.message().contains("backend"));
    }

    #[test]
    fn test_anonymous_policy() {
        let keypair = TestKeypair::new(1, "k");
        let mut interceptor = interceptor(&keypair).with_policy(AuthPolicy::allow_anonymous());

        let request = interceptor.call(request_with(None)).unwrap();
        assert!(verified_token(&request).is_none());

        let status = interceptor
            .call(request_with(Some("Bearer garbage")))
            .unwrap_err();
        assert_eq!(status.code(), Code::Unauthenticated);
    }
}
