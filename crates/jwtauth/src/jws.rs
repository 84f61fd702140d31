//! JWS parsing (RFC 7515).
//!
//! Accepts the compact serialization (`header.payload.signature`) and both JSON
//! serializations (general, with a `signatures` array, and flattened). Parsing
//! is purely structural: nothing here touches key material.
//!
//! Every failure maps to [`AuthError::InvalidToken`]; the caller cannot learn
//! which structural rule was violated.

use crate::error::AuthError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Maximum accepted token size in bytes.
///
/// Checked before any decoding so oversized input is rejected cheaply.
pub const MAX_TOKEN_BYTES: usize = 8 * 1024;

/// Header members the verifier acts on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoseHeader {
    /// Signature algorithm name as written in the token.
    pub alg: String,

    /// Key identifier, if the header carries one.
    pub kid: Option<String>,
}

/// One signature over the payload, with its own header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureSection {
    /// Protected and unprotected header members merged.
    pub header: JoseHeader,

    /// Protected header exactly as encoded in the token (may be empty in the
    /// JSON serializations).
    pub protected_b64: String,

    /// Signature, base64url.
    pub signature_b64: String,
}

/// Structurally valid JWS with at least one signature section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedToken {
    /// Decoded payload. Not trustworthy until a signature has been verified.
    pub payload: Vec<u8>,

    /// Payload exactly as encoded in the token.
    pub payload_b64: String,

    /// Signature sections in token order. Never empty.
    pub signatures: Vec<SignatureSection>,
}

impl ParsedToken {
    /// The key identifier used for candidate lookup: the last non-empty `kid`
    /// across all sections, or `""` when no section names one.
    #[must_use]
    pub fn key_id(&self) -> &str {
        self.signatures
            .iter()
            .rev()
            .filter_map(|s| s.header.kid.as_deref())
            .find(|kid| !kid.is_empty())
            .unwrap_or("")
    }

    /// The bytes a section's signature covers:
    /// `BASE64URL(protected) || '.' || BASE64URL(payload)`.
    #[must_use]
    pub fn signing_input(&self, section: &SignatureSection) -> Vec<u8> {
        let mut input =
            Vec::with_capacity(section.protected_b64.len() + 1 + self.payload_b64.len());
        input.extend_from_slice(section.protected_b64.as_bytes());
        input.push(b'.');
        input.extend_from_slice(self.payload_b64.as_bytes());
        input
    }
}

/// Parse a token in either serialization.
///
/// # Errors
///
/// Returns [`AuthError::InvalidToken`] for empty or oversized input, bad
/// base64url, non-object headers, duplicate header members, a missing or
/// non-string `alg`, a non-string `kid`, or zero signature sections.
pub fn parse(raw: &str) -> Result<ParsedToken, AuthError> {
    let raw = raw.trim();
    if raw.is_empty() || raw.len() > MAX_TOKEN_BYTES {
        return Err(AuthError::InvalidToken);
    }

    if raw.starts_with('{') {
        parse_json(raw)
    } else {
        parse_compact(raw)
    }
}

fn parse_compact(raw: &str) -> Result<ParsedToken, AuthError> {
    let mut parts = raw.split('.');
    let (Some(protected), Some(payload), Some(signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::InvalidToken);
    };

    if protected.is_empty() {
        return Err(AuthError::InvalidToken);
    }

    let section = build_section(Some(protected), None, signature)?;
    Ok(ParsedToken {
        payload: decode(payload)?,
        payload_b64: payload.to_string(),
        signatures: vec![section],
    })
}

#[derive(Deserialize)]
struct JsonSerialization {
    payload: String,
    #[serde(default)]
    signatures: Option<Vec<JsonSignature>>,
    #[serde(default)]
    protected: Option<String>,
    #[serde(default)]
    header: Option<Map<String, Value>>,
    #[serde(default)]
    signature: Option<String>,
}

#[derive(Deserialize)]
struct JsonSignature {
    #[serde(default)]
    protected: Option<String>,
    #[serde(default)]
    header: Option<Map<String, Value>>,
    signature: String,
}

fn parse_json(raw: &str) -> Result<ParsedToken, AuthError> {
    let token: JsonSerialization =
        serde_json::from_str(raw).map_err(|_| AuthError::InvalidToken)?;

    let signatures = match (token.signatures, token.signature) {
        (Some(general), None) => general
            .iter()
            .map(|s| build_section(s.protected.as_deref(), s.header.as_ref(), &s.signature))
            .collect::<Result<Vec<_>, _>>()?,
        (None, Some(signature)) => vec![build_section(
            token.protected.as_deref(),
            token.header.as_ref(),
            &signature,
        )?],
        _ => return Err(AuthError::InvalidToken),
    };

    if signatures.is_empty() {
        return Err(AuthError::InvalidToken);
    }

    Ok(ParsedToken {
        payload: decode(&token.payload)?,
        payload_b64: token.payload,
        signatures,
    })
}

fn build_section(
    protected_b64: Option<&str>,
    unprotected: Option<&Map<String, Value>>,
    signature_b64: &str,
) -> Result<SignatureSection, AuthError> {
    let mut members = match protected_b64.filter(|p| !p.is_empty()) {
        Some(encoded) => match serde_json::from_slice::<Value>(&decode(encoded)?) {
            Ok(Value::Object(map)) => map,
            _ => return Err(AuthError::InvalidToken),
        },
        None => Map::new(),
    };

    if let Some(unprotected) = unprotected {
        for (name, value) in unprotected {
            if members.insert(name.clone(), value.clone()).is_some() {
                return Err(AuthError::InvalidToken);
            }
        }
    }

    // Validates the encoding only; verification consumes the base64 form.
    decode(signature_b64)?;

    let alg = match members.get("alg") {
        Some(Value::String(alg)) => alg.clone(),
        _ => return Err(AuthError::InvalidToken),
    };
    let kid = match members.get("kid") {
        None => None,
        Some(Value::String(kid)) => Some(kid.clone()),
        Some(_) => return Err(AuthError::InvalidToken),
    };

    Ok(SignatureSection {
        header: JoseHeader { alg, kid },
        protected_b64: protected_b64.unwrap_or_default().to_string(),
        signature_b64: signature_b64.to_string(),
    })
}

fn decode(segment: &str) -> Result<Vec<u8>, AuthError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| AuthError::InvalidToken)
}
