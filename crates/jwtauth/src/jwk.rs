//! JSON Web Key model (RFC 7517) and the key lookup trait.
//!
//! Only public key members are modelled. Private members such as `d` are
//! dropped on deserialization, so a key set re-serialized from this model can
//! never leak private material.

use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// Public JSON Web Key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type ("OKP", "EC", "RSA").
    pub kty: String,

    /// Key ID. Neither required nor unique.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kid: String,

    /// Algorithm this key is restricted to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// Intended use ("sig" or "enc").
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,

    /// Permitted operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_ops: Option<Vec<String>>,

    /// Curve name for "OKP" and "EC" keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,

    /// Public key (OKP) or x coordinate (EC), base64url.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,

    /// y coordinate (EC), base64url.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,

    /// Modulus (RSA), base64url.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// Public exponent (RSA), base64url.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
}

impl Jwk {
    /// Whether this key may verify a signature made with `alg`.
    ///
    /// The key type and curve must be able to carry the algorithm, and the
    /// key's own `alg`, `use` and `key_ops` members must not exclude it.
    /// Symmetric algorithms are never accepted.
    #[must_use]
    pub fn accepts(&self, alg: Algorithm) -> bool {
        if let Some(declared) = self.alg.as_deref() {
            if Algorithm::from_str(declared).map_or(true, |a| a != alg) {
                return false;
            }
        }
        if self.key_use.as_deref().is_some_and(|u| u != "sig") {
            return false;
        }
        if let Some(ops) = &self.key_ops {
            if !ops.iter().any(|op| op == "verify") {
                return false;
            }
        }

        let crv = self.crv.as_deref();
        match (self.kty.as_str(), alg) {
            ("OKP", Algorithm::EdDSA) => crv.map_or(true, |c| c == "Ed25519"),
            ("EC", Algorithm::ES256) => crv == Some("P-256"),
            ("EC", Algorithm::ES384) => crv == Some("P-384"),
            (
                "RSA",
                Algorithm::RS256
                | Algorithm::RS384
                | Algorithm::RS512
                | Algorithm::PS256
                | Algorithm::PS384
                | Algorithm::PS512,
            ) => true,
            _ => false,
        }
    }

    /// Build the verification key from the public components.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyFormat` when a required component is missing or the
    /// key type is unsupported, or a base64 error for bad component encoding.
    pub fn decoding_key(&self) -> Result<DecodingKey, JwtError> {
        match self.kty.as_str() {
            "OKP" => DecodingKey::from_ed_components(required(self.x.as_deref())?),
            "EC" => DecodingKey::from_ec_components(
                required(self.x.as_deref())?,
                required(self.y.as_deref())?,
            ),
            "RSA" => DecodingKey::from_rsa_components(
                required(self.n.as_deref())?,
                required(self.e.as_deref())?,
            ),
            _ => Err(ErrorKind::InvalidKeyFormat.into()),
        }
    }
}

fn required(component: Option<&str>) -> Result<&str, JwtError> {
    component.ok_or_else(|| ErrorKind::InvalidKeyFormat.into())
}

/// JWKS document: `{"keys": [...]}`.
///
/// Also the simplest [`KeySource`]: a fixed, in-memory list of keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySet {
    /// Keys in document order.
    pub keys: Vec<Jwk>,
}

impl KeySet {
    /// Create a key set from a list of keys.
    #[must_use]
    pub fn new(keys: Vec<Jwk>) -> Self {
        Self { keys }
    }

    /// Keys whose `kid` equals `kid`, in document order.
    pub fn matching<'a>(&'a self, kid: &'a str) -> impl Iterator<Item = &'a Jwk> + 'a {
        self.keys.iter().filter(move |key| key.kid == kid)
    }
}

/// Anything that can hand out candidate keys for a key identifier.
///
/// Implementations must tolerate and return duplicate identifiers: the
/// verifier tries every returned key rather than trusting `kid` as a unique
/// pointer.
pub trait KeySource {
    /// Every known key whose identifier equals `kid` (possibly none).
    fn get_keys(&self, kid: &str) -> Vec<Jwk>;
}

impl KeySource for KeySet {
    fn get_keys(&self, kid: &str) -> Vec<Jwk> {
        self.matching(kid).cloned().collect()
    }
}

impl<T: KeySource + ?Sized> KeySource for Arc<T> {
    fn get_keys(&self, kid: &str) -> Vec<Jwk> {
        (**self).get_keys(kid)
    }
}

impl<T: KeySource + ?Sized> KeySource for &T {
    fn get_keys(&self, kid: &str) -> Vec<Jwk> {
        (**self).get_keys(kid)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn okp(kid: &str) -> Jwk {
        serde_json::from_value(serde_json::json!({
            "kty": "OKP",
            "kid": kid,
            "crv": "Ed25519",
            "x": "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo",
            "alg": "EdDSA",
            "use": "sig"
        }))
        .unwrap()
    }

    #[test]
    fn test_jwk_deserialization() {
        let jwk = okp("test-key-01");

        assert_eq!(jwk.kty, "OKP");
        assert_eq!(jwk.kid, "test-key-01");
        assert_eq!(jwk.crv.as_deref(), Some("Ed25519"));
        assert_eq!(jwk.alg.as_deref(), Some("EdDSA"));
        assert_eq!(jwk.key_use.as_deref(), Some("sig"));
    }

    #[test]
    fn test_jwk_without_kid_defaults_to_empty() {
        let jwk: Jwk = serde_json::from_str(r#"{"kty":"RSA","n":"AQAB","e":"AQAB"}"#).unwrap();
        assert_eq!(jwk.kid, "");

        let json = serde_json::to_string(&jwk).unwrap();
        assert!(!json.contains("kid"), "empty kid should be omitted");
    }

    #[test]
    fn test_private_members_are_dropped() {
        let jwk: Jwk = serde_json::from_str(
            r#"{"kty":"OKP","crv":"Ed25519","x":"abc","d":"private-scalar"}"#,
        )
        .unwrap();

        let json = serde_json::to_string(&jwk).unwrap();
        assert!(!json.contains("private-scalar"));
        assert!(!json.contains("\"d\""));
    }

    #[test]
    fn test_missing_kty_is_rejected() {
        assert!(serde_json::from_str::<Jwk>(r#"{"kid":"k"}"#).is_err());
    }

    #[test]
    fn test_accepts_matching_family() {
        let jwk = okp("k");
        assert!(jwk.accepts(Algorithm::EdDSA));
        assert!(!jwk.accepts(Algorithm::RS256));
        assert!(!jwk.accepts(Algorithm::ES256));
    }

    #[test]
    fn test_accepts_never_symmetric() {
        let mut jwk = okp("k");
        jwk.alg = None;
        assert!(!jwk.accepts(Algorithm::HS256));
        assert!(!jwk.accepts(Algorithm::HS512));
    }

    #[test]
    fn test_accepts_respects_declared_alg() {
        let rsa: Jwk = serde_json::from_str(
            r#"{"kty":"RSA","alg":"RS256","n":"AQAB","e":"AQAB"}"#,
        )
        .unwrap();
        assert!(rsa.accepts(Algorithm::RS256));
        assert!(!rsa.accepts(Algorithm::PS256));
    }

    #[test]
    fn test_accepts_rejects_encryption_keys() {
        let mut jwk = okp("k");
        jwk.key_use = Some("enc".to_string());
        assert!(!jwk.accepts(Algorithm::EdDSA));
    }

    #[test]
    fn test_accepts_checks_ec_curve() {
        let ec: Jwk =
            serde_json::from_str(r#"{"kty":"EC","crv":"P-256","x":"AA","y":"AA"}"#).unwrap();
        assert!(ec.accepts(Algorithm::ES256));
        assert!(!ec.accepts(Algorithm::ES384));
    }

    #[test]
    fn test_decoding_key_requires_components() {
        let mut jwk = okp("k");
        jwk.x = None;
        assert!(jwk.decoding_key().is_err());

        let unsupported: Jwk = serde_json::from_str(r#"{"kty":"oct","k":"c2VjcmV0"}"#).unwrap();
        assert!(unsupported.decoding_key().is_err());
    }

    #[test]
    fn test_decoding_key_from_okp() {
        assert!(okp("k").decoding_key().is_ok());
    }

    #[test]
    fn test_key_set_lookup_returns_duplicates() {
        let set = KeySet::new(vec![okp("a"), okp("b"), okp("a")]);

        assert_eq!(set.get_keys("a").len(), 2);
        assert_eq!(set.get_keys("b").len(), 1);
        assert!(set.get_keys("c").is_empty());
    }

    #[test]
    fn test_key_source_through_arc_and_ref() {
        let set = Arc::new(KeySet::new(vec![okp("a")]));
        assert_eq!(set.get_keys("a").len(), 1);
        assert_eq!((&*set).get_keys("a").len(), 1);
    }

    #[test]
    fn test_key_set_document_shape() {
        let set: KeySet = serde_json::from_str(
            r#"{"keys":[{"kty":"OKP","kid":"key-1"},{"kty":"OKP","kid":"key-2"}]}"#,
        )
        .unwrap();

        assert_eq!(set.keys.len(), 2);
        assert_eq!(set.keys.first().unwrap().kid, "key-1");
        assert_eq!(set.keys.get(1).unwrap().kid, "key-2");
    }
}
