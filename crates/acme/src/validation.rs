//! HTTP-01 key-authorization helpers.

#![allow(clippy::module_name_repetitions)]

use std::fmt;

use thiserror::Error;

/// Path prefix under which HTTP-01 responses are served.
pub const WELL_KNOWN_PREFIX: &str = "/.well-known/acme-challenge/";

/// Errors raised while preparing or checking an HTTP-01 response.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Http01Error {
    /// The CA supplied an empty token.
    #[error("HTTP-01 challenge token değeri boş")]
    EmptyToken,
    /// The supplied account thumbprint is empty.
    #[error("HTTP-01 challenge için hesap thumbprint değeri boş olamaz")]
    EmptyThumbprint,
    /// The served body does not match the expected key authorization byte for byte.
    #[error("HTTP-01 challenge yanıtı key-authorization değeriyle eşleşmiyor")]
    BodyMismatch {
        /// Expected key-authorization value.
        expected: String,
        /// Received body, lossily decoded.
        received: String,
    },
}

/// Replaces every character outside `[A-Za-z0-9_-]` with `_`.
///
/// The result is safe to use as a file name inside the challenge directory.
#[must_use]
pub fn sanitize_token(token: &str) -> String {
    token
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

/// `token.thumbprint` value for a single HTTP-01 challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAuthorization {
    token: String,
    value: String,
}

impl KeyAuthorization {
    /// Builds a key authorization from the raw CA token and the account thumbprint.
    ///
    /// The token is sanitised first; both the artifact file name and the
    /// key-authorization value use the sanitised form.
    ///
    /// # Errors
    ///
    /// Returns [`Http01Error`] when the token or thumbprint is empty.
    pub fn new(raw_token: &str, thumbprint: &str) -> Result<Self, Http01Error> {
        if raw_token.is_empty() {
            return Err(Http01Error::EmptyToken);
        }
        if thumbprint.is_empty() {
            return Err(Http01Error::EmptyThumbprint);
        }
        let token = sanitize_token(raw_token);
        let value = format!("{token}.{thumbprint}");
        Ok(Self { token, value })
    }

    /// Sanitised token, also used as the artifact file name.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// HTTP path the CA will fetch.
    #[must_use]
    pub fn resource_path(&self) -> String {
        format!("{WELL_KNOWN_PREFIX}{}", self.token)
    }

    /// Checks a served body against the expected value without any normalisation.
    ///
    /// # Errors
    ///
    /// Returns [`Http01Error::BodyMismatch`] unless `body` equals the key
    /// authorization byte for byte.
    pub fn verify_body(&self, body: &[u8]) -> Result<(), Http01Error> {
        if body == self.value.as_bytes() {
            return Ok(());
        }
        Err(Http01Error::BodyMismatch {
            expected: self.value.clone(),
            received: String::from_utf8_lossy(body).into_owned(),
        })
    }
}

impl fmt::Display for KeyAuthorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sanitize_replaces_disallowed_characters() {
        assert_eq!(sanitize_token("../../etc/passwd"), "______etc_passwd");
        assert_eq!(sanitize_token("a+b=c d"), "a_b_c_d");
        assert_eq!(sanitize_token("Ab-9_x"), "Ab-9_x");
    }

    #[test]
    fn sanitize_is_idempotent() {
        for raw in ["../x", "tök€n", "plain_token-1", "a/b\\c"] {
            let once = sanitize_token(raw);
            assert_eq!(sanitize_token(&once), once);
            assert!(once
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'));
        }
    }

    #[test]
    fn key_authorization_uses_sanitised_token() {
        let key_authorization = KeyAuthorization::new("to/ken", "THUMB").expect("key authz");
        assert_eq!(key_authorization.token(), "to_ken");
        assert_eq!(key_authorization.as_str(), "to_ken.THUMB");
        assert_eq!(
            key_authorization.resource_path(),
            "/.well-known/acme-challenge/to_ken"
        );
        assert_eq!(key_authorization.to_string(), "to_ken.THUMB");
    }

    #[test]
    fn empty_inputs_are_rejected() {
        assert_eq!(KeyAuthorization::new("", "t"), Err(Http01Error::EmptyToken));
        assert_eq!(KeyAuthorization::new("x", ""), Err(Http01Error::EmptyThumbprint));
    }

    #[test]
    fn verify_body_is_byte_exact() {
        let key_authorization = KeyAuthorization::new("token", "thumb").unwrap();
        assert!(key_authorization.verify_body(b"token.thumb").is_ok());

        let err = key_authorization.verify_body(b"token.thumb\n").unwrap_err();
        assert!(matches!(err, Http01Error::BodyMismatch { .. }));
        assert!(key_authorization.verify_body(b" token.thumb").is_err());
        assert!(key_authorization.verify_body(b"").is_err());
    }
}
