//! Token verification pipeline.
//!
//! # Steps
//!
//! 1. Parse the token ([`crate::jws::parse`]) → `InvalidToken`
//! 2. Pick the lookup identifier: the last non-empty `kid` across all
//!    signature sections, or `""`
//! 3. Fetch candidates from the [`KeySource`] → `UnknownKey` when none
//! 4. Try every candidate in lookup order until one verifies a signature
//!    section → `InvalidSignature` when none does
//! 5. Decode the registered claims → `InvalidClaims`
//! 6. `exp` must be present and after now → `ExpiredToken`; a nonzero `nbf`
//!    must not be after now → `NotYetValid`. `iat` is not enforced.
//!
//! Key identifiers are hints, not pointers: a registered key sharing a `kid`
//! with the real signer is simply one more candidate that fails to verify.
//!
//! # Algorithms
//!
//! A key is tried only with algorithms its key type and curve can carry (see
//! [`Jwk::accepts`]). Symmetric algorithms and `none` never verify.

use crate::claims::{StandardClaims, VerifiedToken};
use crate::error::AuthError;
use crate::jwk::{Jwk, KeySource};
use crate::jws::{self, ParsedToken};
use crate::metrics;
use jsonwebtoken::{crypto, Algorithm};
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;
use tracing::{debug, instrument};

/// Verifies bearer tokens against a [`KeySource`].
///
/// Stateless across calls.
#[derive(Debug, Clone)]
pub struct Verifier<S> {
    source: S,
}

impl<S: KeySource> Verifier<S> {
    #[must_use]
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// The key source candidates are looked up in.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Verify `raw` against the current time.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] for the first step that rejects the token.
    #[instrument(skip_all)]
    pub fn verify(&self, raw: &str) -> Result<VerifiedToken, AuthError> {
        self.verify_at(raw, chrono::Utc::now().timestamp())
    }

    /// Verify `raw` as of `now` (Unix seconds).
    ///
    /// # Errors
    ///
    /// Same as [`Verifier::verify`].
    pub fn verify_at(&self, raw: &str, now: i64) -> Result<VerifiedToken, AuthError> {
        let result = self.run_pipeline(raw, now);
        metrics::record_verification(result.as_ref().map(|_| ()));

        match &result {
            Ok(_) => debug!(target: "jwtauth.verifier", "Token verified"),
            Err(e) => debug!(
                target: "jwtauth.verifier",
                reason = e.reason_code(),
                "Token rejected"
            ),
        }
        result
    }

    fn run_pipeline(&self, raw: &str, now: i64) -> Result<VerifiedToken, AuthError> {
        let token = jws::parse(raw)?;

        let kid = token.key_id();
        let candidates = self.source.get_keys(kid);
        if candidates.is_empty() {
            return Err(AuthError::UnknownKey(kid.to_string()));
        }

        if !candidates.iter().any(|key| verifies(&token, key)) {
            return Err(AuthError::InvalidSignature);
        }

        let claims = decode_claims(&token.payload)?;
        validate_times(&claims, now)?;

        Ok(VerifiedToken::new(token.payload, claims))
    }
}

/// Whether any signature section of `token` verifies under `key`.
fn verifies(token: &ParsedToken, key: &Jwk) -> bool {
    let decoding_key = match key.decoding_key() {
        Ok(decoding_key) => decoding_key,
        Err(e) => {
            debug!(
                target: "jwtauth.verifier",
                kty = %key.kty,
                error = %e,
                "Skipping unusable key"
            );
            return false;
        }
    };

    token.signatures.iter().any(|section| {
        let Ok(alg) = Algorithm::from_str(&section.header.alg) else {
            return false;
        };
        if !key.accepts(alg) {
            return false;
        }
        matches!(
            crypto::verify(
                &section.signature_b64,
                &token.signing_input(section),
                &decoding_key,
                alg,
            ),
            Ok(true)
        )
    })
}

/// Decode the registered claims. The payload must be a JSON object.
fn decode_claims(payload: &[u8]) -> Result<StandardClaims, AuthError> {
    let value: Value = serde_json::from_slice(payload).map_err(|_| AuthError::InvalidClaims)?;
    if !value.is_object() {
        return Err(AuthError::InvalidClaims);
    }
    StandardClaims::deserialize(&value).map_err(|_| AuthError::InvalidClaims)
}

/// Check `exp` and `nbf` against `now`.
///
/// # Errors
///
/// `ExpiredToken` when `exp` is absent or not after `now`; `NotYetValid` when
/// a nonzero `nbf` is after `now`.
pub fn validate_times(claims: &StandardClaims, now: i64) -> Result<(), AuthError> {
    match claims.exp {
        Some(exp) if exp > now => {}
        _ => return Err(AuthError::ExpiredToken),
    }

    if let Some(nbf) = claims.nbf {
        if nbf != 0 && nbf > now {
            return Err(AuthError::NotYetValid);
        }
    }

    Ok(())
}
