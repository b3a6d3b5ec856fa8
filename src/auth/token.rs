//! HS256 access and refresh tokens.
//!
//! Both kinds are compact JWS strings signed with the process-wide secret. The
//! payload `use` claim keeps one kind from being accepted as the other. Decoding
//! verifies the signature only; callers compare `exp` against their own clock.

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::Sha256;
use std::{collections::BTreeMap, fmt, time::Duration};
use thiserror::Error;
use uuid::Uuid;

use super::credentials::{Credential, CredentialSet};

type HmacSha256 = Hmac<Sha256>;

const ALG: &str = "HS256";

/// Shortest accepted signing secret, in bytes.
pub const MIN_SECRET_BYTES: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    Access,
    Refresh,
}

impl fmt::Display for TokenUse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Access => f.write_str("access"),
            Self::Refresh => f.write_str("refresh"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlg(String),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("expected {expected} token, got {found} token")]
    WrongTokenUse { expected: TokenUse, found: TokenUse },
    #[error("unknown credential: {0}")]
    UnknownCredential(String),
    #[error("signing secret must be at least {MIN_SECRET_BYTES} bytes")]
    Key,
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct AccessPayload {
    sub: Uuid,
    credentials: BTreeMap<String, bool>,
    iat: i64,
    exp: i64,
    #[serde(rename = "use")]
    token_use: TokenUse,
}

#[derive(Debug, Serialize, Deserialize)]
struct RefreshPayload {
    sub: Uuid,
    jti: String,
    iat: i64,
    exp: i64,
    #[serde(rename = "use")]
    token_use: TokenUse,
}

#[derive(Deserialize)]
struct UseProbe {
    #[serde(rename = "use")]
    token_use: TokenUse,
}

/// Verified contents of an access token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessClaims {
    pub subject: Uuid,
    pub credentials: CredentialSet,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl AccessClaims {
    #[must_use]
    pub const fn is_expired(&self, now: i64) -> bool {
        now > self.expires_at
    }
}

/// Verified contents of a refresh token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshClaims {
    pub subject: Uuid,
    pub token_id: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl RefreshClaims {
    #[must_use]
    pub const fn is_expired(&self, now: i64) -> bool {
        now > self.expires_at
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug)]
pub struct TokenCodec {
    secret: SecretString,
    access_ttl: i64,
    refresh_ttl: i64,
}

fn ttl_seconds(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, Error> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: DeserializeOwned>(s: &str) -> Result<T, Error> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| Error::Base64)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn new_token_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    Base64UrlUnpadded::encode_string(&bytes)
}

impl TokenCodec {
    /// # Errors
    /// Returns [`Error::Key`] if the secret is shorter than [`MIN_SECRET_BYTES`].
    pub fn new(
        secret: SecretString,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Result<Self, Error> {
        if secret.expose_secret().len() < MIN_SECRET_BYTES {
            return Err(Error::Key);
        }

        Ok(Self {
            secret,
            access_ttl: ttl_seconds(access_ttl),
            refresh_ttl: ttl_seconds(refresh_ttl),
        })
    }

    /// Issue an access/refresh pair for `subject`, both stamped at `now`.
    ///
    /// # Errors
    /// Returns an error if a payload cannot be serialized.
    pub fn issue(
        &self,
        subject: Uuid,
        credentials: &CredentialSet,
        now: i64,
    ) -> Result<TokenPair, Error> {
        let access = AccessPayload {
            sub: subject,
            credentials: credentials
                .iter()
                .map(|credential| (credential.as_str().to_string(), true))
                .collect(),
            iat: now,
            exp: now.saturating_add(self.access_ttl),
            token_use: TokenUse::Access,
        };
        let refresh = RefreshPayload {
            sub: subject,
            jti: new_token_id(),
            iat: now,
            exp: now.saturating_add(self.refresh_ttl),
            token_use: TokenUse::Refresh,
        };

        Ok(TokenPair {
            access: self.sign(&access)?,
            refresh: self.sign(&refresh)?,
        })
    }

    /// Verify an access token and return its claims. Expiry is not checked.
    ///
    /// # Errors
    /// Returns [`Error::InvalidSignature`] for any token not signed by this codec,
    /// and a format error for tokens that are structurally wrong.
    pub fn decode_access(&self, token: &str) -> Result<AccessClaims, Error> {
        let payload: AccessPayload = self.verified_payload(token, TokenUse::Access)?;

        let credentials = payload
            .credentials
            .into_iter()
            .filter(|(_, granted)| *granted)
            .map(|(name, _)| {
                name.parse::<Credential>()
                    .map_err(|err| Error::UnknownCredential(err.0))
            })
            .collect::<Result<CredentialSet, _>>()?;

        Ok(AccessClaims {
            subject: payload.sub,
            credentials,
            issued_at: payload.iat,
            expires_at: payload.exp,
        })
    }

    /// Verify a refresh token and return its claims. Expiry is not checked.
    ///
    /// # Errors
    /// Same failure modes as [`TokenCodec::decode_access`].
    pub fn decode_refresh(&self, token: &str) -> Result<RefreshClaims, Error> {
        let payload: RefreshPayload = self.verified_payload(token, TokenUse::Refresh)?;

        Ok(RefreshClaims {
            subject: payload.sub,
            token_id: payload.jti,
            issued_at: payload.iat,
            expires_at: payload.exp,
        })
    }

    /// Expiry (Unix seconds) embedded in a refresh token.
    ///
    /// # Errors
    /// Same failure modes as [`TokenCodec::decode_refresh`].
    pub fn decode_refresh_expiry(&self, token: &str) -> Result<i64, Error> {
        self.decode_refresh(token).map(|claims| claims.expires_at)
    }

    fn mac(&self) -> Result<HmacSha256, Error> {
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes()).map_err(|_| Error::Key)
    }

    fn sign<T: Serialize>(&self, payload: &T) -> Result<String, Error> {
        let header = Header {
            alg: ALG.to_string(),
            typ: "JWT".to_string(),
        };
        let signing_input = format!("{}.{}", b64e_json(&header)?, b64e_json(payload)?);

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();

        Ok(format!(
            "{signing_input}.{}",
            Base64UrlUnpadded::encode_string(&signature)
        ))
    }

    fn verified_payload<T: DeserializeOwned>(
        &self,
        token: &str,
        expected: TokenUse,
    ) -> Result<T, Error> {
        let mut parts = token.split('.');
        let header_b64 = parts.next().ok_or(Error::TokenFormat)?;
        let payload_b64 = parts.next().ok_or(Error::TokenFormat)?;
        let sig_b64 = parts.next().ok_or(Error::TokenFormat)?;
        if parts.next().is_some() {
            return Err(Error::TokenFormat);
        }

        // Nothing from the token is parsed before the signature checks out.
        let signature =
            Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| Error::InvalidSignature)?;
        let mut mac = self.mac()?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(payload_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| Error::InvalidSignature)?;

        let header: Header = b64d_json(header_b64)?;
        if header.alg != ALG {
            return Err(Error::UnsupportedAlg(header.alg));
        }

        let probe: UseProbe = b64d_json(payload_b64)?;
        if probe.token_use != expected {
            return Err(Error::WrongTokenUse {
                expected,
                found: probe.token_use,
            });
        }

        b64d_json(payload_b64)
    }
}
