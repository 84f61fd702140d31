//! Verified claim types.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// Registered claims (RFC 7519 section 4.1).
///
/// Every member is optional on the wire; the verifier separately requires
/// `exp`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    #[serde(default, skip_serializing_if = "Audience::is_empty")]
    pub aud: Audience,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

/// `aud` claim, normalized to a sequence.
///
/// Deserializes from either a single string or an array of strings; always
/// serializes as an array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Audience(Vec<String>);

impl Audience {
    #[must_use]
    pub fn new(values: Vec<String>) -> Self {
        Self(values)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn contains(&self, audience: &str) -> bool {
        self.0.iter().any(|a| a == audience)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<'de> Deserialize<'de> for Audience {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(String),
            Many(Vec<String>),
        }

        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(value) => Self(vec![value]),
            OneOrMany::Many(values) => Self(values),
        })
    }
}

/// Result of a successful verification.
///
/// Holds the verified payload bytes alongside the decoded registered claims.
/// Only the verifier constructs it.
#[derive(Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    raw: Vec<u8>,
    claims: StandardClaims,
}

impl VerifiedToken {
    pub(crate) fn new(raw: Vec<u8>, claims: StandardClaims) -> Self {
        Self { raw, claims }
    }

    /// The verified payload exactly as signed.
    #[must_use]
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    #[must_use]
    pub fn claims(&self) -> &StandardClaims {
        &self.claims
    }

    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.claims.sub.as_deref()
    }

    /// Decode application-specific claims from the verified payload.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the payload does not match `T`.
    pub fn custom_claims<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.raw)
    }
}

impl std::fmt::Debug for VerifiedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifiedToken")
            .field("iss", &self.claims.iss)
            .field("sub", &"[REDACTED]")
            .field("aud", &self.claims.aud)
            .field("exp", &self.claims.exp)
            .field("jti", &self.claims.jti)
            .finish_non_exhaustive()
    }
}
