//! Per-request authorization: signature, then expiry, then the one credential
//! the route needs. Nothing is cached and no store is consulted.

use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use super::{
    clock::Clock,
    credentials::Credential,
    token::{AccessClaims, TokenCodec},
};

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum Deny {
    #[error("invalid or malformed token")]
    Malformed,
    #[error("token expired")]
    Expired,
    #[error("permission denied, credential not eligible")]
    Forbidden,
}

#[derive(Clone)]
pub struct Guard {
    codec: Arc<TokenCodec>,
    clock: Arc<dyn Clock>,
}

impl Guard {
    #[must_use]
    pub fn new(codec: Arc<TokenCodec>, clock: Arc<dyn Clock>) -> Self {
        Self { codec, clock }
    }

    /// Decide whether `token` may perform an action gated by `required`.
    ///
    /// On success the decoded claims are returned so the caller can layer
    /// ownership checks on top.
    ///
    /// # Errors
    /// Returns the [`Deny`] reason of the first check that fails.
    pub fn authorize(&self, token: &str, required: Credential) -> Result<AccessClaims, Deny> {
        let claims = self.codec.decode_access(token).map_err(|err| {
            debug!("access token rejected: {err}");
            Deny::Malformed
        })?;

        if claims.is_expired(self.clock.now()) {
            return Err(Deny::Expired);
        }

        if !claims.credentials.contains(required) {
            debug!(subject = %claims.subject, credential = %required, "credential missing");
            return Err(Deny::Forbidden);
        }

        Ok(claims)
    }
}
