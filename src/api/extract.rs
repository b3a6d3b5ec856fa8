//! Credentials carried in the `Authorization` header.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use base64ct::{Base64, Encoding};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

use super::error::ApiError;

/// The token of an `Authorization: Bearer <token>` header.
///
/// # Errors
/// 400 when the header is missing, is not Bearer, or carries an empty token.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::bad_request("missing or malformed bearer token"))
}

/// Client credentials required on the Basic-protected routes.
#[derive(Debug)]
pub struct ClientAuth {
    user: String,
    password: SecretString,
}

impl ClientAuth {
    #[must_use]
    pub fn new(user: String, password: SecretString) -> Self {
        Self { user, password }
    }

    /// # Errors
    /// 401 with a Basic challenge unless the header carries the configured pair.
    pub fn check(&self, headers: &HeaderMap) -> Result<(), ApiError> {
        let (user, password) =
            basic_credentials(headers).ok_or_else(ApiError::basic_auth_required)?;

        // Both halves are always compared so timing does not reveal which one failed.
        let user_ok = digest_eq(user.as_bytes(), self.user.as_bytes());
        let password_ok = digest_eq(password.as_bytes(), self.password.expose_secret().as_bytes());

        if user_ok & password_ok {
            Ok(())
        } else {
            Err(ApiError::basic_auth_required())
        }
    }
}

fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let encoded = headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Basic ")?
        .trim();
    let decoded = String::from_utf8(Base64::decode_vec(encoded).ok()?).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

/// Compare fixed-length digests without an early exit.
fn digest_eq(left: &[u8], right: &[u8]) -> bool {
    let left = Sha256::digest(left);
    let right = Sha256::digest(right);
    left.iter()
        .zip(right.iter())
        .fold(0u8, |acc, (l, r)| acc | (l ^ r))
        == 0
}
