//! Adapter-facing verification seam.
//!
//! Adapters hold an `Arc<dyn BearerVerifier>` so tests and alternative
//! backends can stand in for [`jwtauth::Verifier`].

use jwtauth::{AuthError, KeySource, VerifiedToken, Verifier};
use thiserror::Error;

/// Outcome of a failed verification as seen by an adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// The token was rejected; the reason may be logged.
    #[error("{0}")]
    Rejected(#[from] AuthError),

    /// The verifier itself failed.
    #[error("Verifier failure: {0}")]
    Internal(String),
}

/// Something that turns a raw bearer token into verified claims.
pub trait BearerVerifier: Send + Sync {
    /// Verify `token`.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Rejected`] for authentication failures and
    /// [`VerifyError::Internal`] for everything else.
    fn verify_bearer(&self, token: &str) -> Result<VerifiedToken, VerifyError>;
}

impl<S> BearerVerifier for Verifier<S>
where
    S: KeySource + Send + Sync,
{
    fn verify_bearer(&self, token: &str) -> Result<VerifiedToken, VerifyError> {
        self.verify(token).map_err(VerifyError::Rejected)
    }
}
