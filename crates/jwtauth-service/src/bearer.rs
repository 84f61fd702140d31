//! Bearer credential extraction.
//!
//! The scheme is matched case-insensitively and the header is split on the
//! first space only; everything after it is the token, verbatim.

use thiserror::Error;

/// Adapter-level failures, reported separately from verifier rejections.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BearerError {
    #[error("Missing Authorization header")]
    Missing,

    #[error("Bad authorization string")]
    Malformed,

    #[error("Request unauthenticated with bearer")]
    NotBearer,

    #[error("No bearer token")]
    EmptyToken,
}

impl BearerError {
    /// Stable label for logs.
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            BearerError::Missing => "missing",
            BearerError::Malformed => "malformed",
            BearerError::NotBearer => "not_bearer",
            BearerError::EmptyToken => "empty_token",
        }
    }
}

/// Pull the token out of an `Authorization` header value.
///
/// # Errors
///
/// Returns a [`BearerError`] describing why no token could be extracted.
pub fn extract_bearer(header: Option<&str>) -> Result<&str, BearerError> {
    let header = header.ok_or(BearerError::Missing)?;
    let (scheme, token) = header.split_once(' ').ok_or(BearerError::Malformed)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(BearerError::NotBearer);
    }
    if token.is_empty() {
        return Err(BearerError::EmptyToken);
    }

    Ok(token)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_token() {
        assert_eq!(extract_bearer(Some("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        assert_eq!(extract_bearer(Some("bearer tok")), Ok("tok"));
        assert_eq!(extract_bearer(Some("BEARER tok")), Ok("tok"));
    }

    #[test]
    fn test_splits_on_first_space_only() {
        assert_eq!(extract_bearer(Some("Bearer a b")), Ok("a b"));
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(extract_bearer(None), Err(BearerError::Missing));
    }

    #[test]
    fn test_no_second_segment() {
        assert_eq!(extract_bearer(Some("Bearer")), Err(BearerError::Malformed));
        assert_eq!(extract_bearer(Some("")), Err(BearerError::Malformed));
    }

    #[test]
    fn test_other_scheme() {
        assert_eq!(
            extract_bearer(Some("Basic dXNlcjpwYXNz")),
            Err(BearerError::NotBearer)
        );
    }

    #[test]
    fn test_empty_token() {
        assert_eq!(extract_bearer(Some("Bearer ")), Err(BearerError::EmptyToken));
    }

    #[test]
    fn test_reason_codes_are_distinct() {
        let codes = [
            BearerError::Missing.reason_code(),
            BearerError::Malformed.reason_code(),
            BearerError::NotBearer.reason_code(),
            BearerError::EmptyToken.reason_code(),
        ];
        for (i, code) in codes.iter().enumerate() {
            assert!(!codes.iter().skip(i + 1).any(|other| other == code));
        }
    }
}
