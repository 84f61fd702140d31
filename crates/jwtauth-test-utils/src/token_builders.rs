//! Builder patterns for test data construction
//!
//! Provides fluent APIs for creating test claims and JSON-serialized tokens.

use crate::crypto_fixtures::TestSigner;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};

/// Builder for creating test JWT claims
///
/// # Example
/// ```rust,ignore
/// let claims = TestClaimsBuilder::new()
///     .for_subject("alice")
///     .with_audience("api")
///     .expires_in(3600)
///     .build();
/// ```
pub struct TestClaimsBuilder {
    claims: Map<String, Value>,
}

impl TestClaimsBuilder {
    /// Create a new claims builder: subject `test-subject`, expiring in one
    /// hour, issued now.
    pub fn new() -> Self {
        let now = Utc::now();
        let mut claims = Map::new();
        claims.insert("sub".to_string(), json!("test-subject"));
        claims.insert(
            "exp".to_string(),
            json!((now + Duration::seconds(3600)).timestamp()),
        );
        claims.insert("iat".to_string(), json!(now.timestamp()));
        Self { claims }
    }

    /// Set the subject
    pub fn for_subject(self, subject: &str) -> Self {
        self.with_claim("sub", json!(subject))
    }

    /// Set the issuer
    pub fn with_issuer(self, issuer: &str) -> Self {
        self.with_claim("iss", json!(issuer))
    }

    /// Set a single-string audience
    pub fn with_audience(self, audience: &str) -> Self {
        self.with_claim("aud", json!(audience))
    }

    /// Set an array audience
    pub fn with_audiences(self, audiences: &[&str]) -> Self {
        self.with_claim("aud", json!(audiences))
    }

    /// Set expiration in seconds from now (negative for already expired)
    pub fn expires_in(self, seconds: i64) -> Self {
        self.expires_at((Utc::now() + Duration::seconds(seconds)).timestamp())
    }

    /// Set an absolute expiration timestamp
    pub fn expires_at(self, timestamp: i64) -> Self {
        self.with_claim("exp", json!(timestamp))
    }

    /// Remove the expiration claim
    pub fn without_expiry(mut self) -> Self {
        self.claims.remove("exp");
        self
    }

    /// Set not-before in seconds from now
    pub fn not_before_in(self, seconds: i64) -> Self {
        self.with_claim("nbf", json!((Utc::now() + Duration::seconds(seconds)).timestamp()))
    }

    /// Set issued-at timestamp
    pub fn issued_at(self, timestamp: i64) -> Self {
        self.with_claim("iat", json!(timestamp))
    }

    /// Set the token identifier
    pub fn with_jti(self, jti: &str) -> Self {
        self.with_claim("jti", json!(jti))
    }

    /// Set an arbitrary claim
    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        Value::Object(self.claims)
    }
}

impl Default for TestClaimsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for JWS JSON serialization tokens (RFC 7515 section 7.2)
///
/// Each signer adds one signature section. `alg` goes in the protected
/// header; `kid` goes in the unprotected header.
///
/// # Example
/// ```rust,ignore
/// let token = JsonTokenBuilder::new(&claims)
///     .sign_with(&first, Some("first"))
///     .sign_with(&second, None)
///     .build();
/// ```
pub struct JsonTokenBuilder {
    payload_b64: String,
    signatures: Vec<Value>,
}

impl JsonTokenBuilder {
    pub fn new(claims: &Value) -> Self {
        Self {
            payload_b64: URL_SAFE_NO_PAD.encode(claims.to_string()),
            signatures: Vec::new(),
        }
    }

    /// Add a signature section, optionally advertising `kid`.
    pub fn sign_with(mut self, signer: &dyn TestSigner, kid: Option<&str>) -> Self {
        let protected_b64 = URL_SAFE_NO_PAD.encode(json!({ "alg": signer.alg() }).to_string());
        let signing_input = format!("{protected_b64}.{}", self.payload_b64);
        let signature = URL_SAFE_NO_PAD.encode(signer.sign_raw(signing_input.as_bytes()));

        let mut section = json!({
            "protected": protected_b64,
            "signature": signature,
        });
        if let Some(kid) = kid {
            section["header"] = json!({ "kid": kid });
        }
        self.signatures.push(section);
        self
    }

    /// General serialization with a `signatures` array (possibly empty).
    pub fn build(self) -> String {
        json!({
            "payload": self.payload_b64,
            "signatures": self.signatures,
        })
        .to_string()
    }

    /// Flattened serialization. Panics unless exactly one signer was added.
    pub fn build_flattened(self) -> String {
        assert_eq!(self.signatures.len(), 1, "flattened form needs one signature");
        let mut token = self.signatures.into_iter().next().expect("one signature");
        token["payload"] = json!(self.payload_b64);
        token.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto_fixtures::TestKeypair;

    #[test]
    fn test_builder_creates_valid_claims() {
        let claims = TestClaimsBuilder::new()
            .for_subject("alice")
            .with_audiences(&["api", "web"])
            .build();

        assert_eq!(claims["sub"], "alice");
        assert_eq!(claims["aud"], json!(["api", "web"]));
        assert!(claims["exp"].as_i64().unwrap() > Utc::now().timestamp());
    }

    #[test]
    fn test_builder_default() {
        let claims = TestClaimsBuilder::default().build();
        assert_eq!(claims["sub"], "test-subject");
    }

    #[test]
    fn test_without_expiry() {
        let claims = TestClaimsBuilder::new().without_expiry().build();
        assert!(claims.get("exp").is_none());
    }

    #[test]
    fn test_json_token_shape() {
        let keypair = TestKeypair::new(1, "k");
        let claims = TestClaimsBuilder::new().build();
        let token: Value = serde_json::from_str(
            &JsonTokenBuilder::new(&claims)
                .sign_with(&keypair, Some("k"))
                .sign_with(&keypair, None)
                .build(),
        )
        .unwrap();

        let signatures = token["signatures"].as_array().unwrap();
        assert_eq!(signatures.len(), 2);
        assert_eq!(signatures[0]["header"]["kid"], "k");
        assert!(signatures[1].get("header").is_none());
    }
}
