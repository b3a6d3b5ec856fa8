//! Sign-up, sign-in, sign-out and renewal.
//!
//! Every issuance re-reads the user's role, so a role change applies at the next
//! sign-in or renewal. The refresh store holds one token per user; a refresh
//! token that no longer matches it is stale even if its signature and expiry
//! are fine.

use regex::Regex;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use super::{
    clock::Clock,
    credentials::{credentials_for_role, Role, UnknownRole},
    password,
    store::{self, RefreshStore},
    token::{self, TokenCodec, TokenPair},
};
use crate::directory::{self, NewUser, User, UserDirectory};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("email already registered")]
    EmailTaken,
    #[error("user not found")]
    UserNotFound,
    #[error("wrong user email address or password")]
    BadPassword,
    #[error("user is blocked")]
    Blocked,
    #[error(transparent)]
    UnknownRole(#[from] UnknownRole),
    #[error("invalid token")]
    InvalidToken,
    #[error("refresh token expired")]
    RefreshExpired,
    #[error("unauthorized, your session was ended earlier")]
    StaleRefresh,
    #[error(transparent)]
    Store(#[from] store::Error),
    #[error(transparent)]
    Directory(#[from] directory::Error),
    #[error("failed to issue tokens: {0}")]
    Token(#[source] token::Error),
    #[error(transparent)]
    Hash(#[from] password::HashError),
    #[error("background task failed: {0}")]
    Task(String),
}

impl SessionError {
    /// True for failures of a dependency rather than of the caller's input.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Store(_) | Self::Directory(_) | Self::Token(_) | Self::Hash(_) | Self::Task(_)
        )
    }
}

/// Normalize an email for lookup and uniqueness checks.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn valid_email(email_normalized: &str) -> bool {
    email_normalized.len() <= 255
        && Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email_normalized))
}

pub struct SessionManager {
    users: Arc<dyn UserDirectory>,
    store: Arc<dyn RefreshStore>,
    codec: Arc<TokenCodec>,
    clock: Arc<dyn Clock>,
}

impl SessionManager {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserDirectory>,
        store: Arc<dyn RefreshStore>,
        codec: Arc<TokenCodec>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            store,
            codec,
            clock,
        }
    }

    /// Create an active account. No tokens are issued.
    ///
    /// # Errors
    /// [`SessionError::InvalidInput`] for a bad email, password or role name,
    /// [`SessionError::EmailTaken`] for a duplicate email.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        role: &str,
    ) -> Result<User, SessionError> {
        let email = normalize_email(email);
        if !valid_email(&email) {
            return Err(SessionError::InvalidInput("invalid email address".to_string()));
        }
        if !password::acceptable_password(password) {
            return Err(SessionError::InvalidInput(format!(
                "password must be between {} and {} characters",
                password::MIN_PASSWORD_LEN,
                password::MAX_PASSWORD_LEN
            )));
        }
        let role: Role = role
            .parse()
            .map_err(|err: UnknownRole| SessionError::InvalidInput(err.to_string()))?;

        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || password::hash_password(&password))
            .await
            .map_err(|err| SessionError::Task(err.to_string()))??;

        let user = self
            .users
            .create(NewUser {
                email,
                password_hash,
                user_role: role,
            })
            .await
            .map_err(|err| match err {
                directory::Error::Conflict => SessionError::EmailTaken,
                other => SessionError::Directory(other),
            })?;

        info!(user = %user.id, role = %role, "user signed up");

        Ok(user)
    }

    /// Check the password and issue a pair, replacing any stored refresh token.
    ///
    /// # Errors
    /// Distinct errors for an unknown email, a wrong password, a blocked user
    /// and a role missing from the registry.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<TokenPair, SessionError> {
        let email = normalize_email(email);
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(SessionError::UserNotFound)?;

        if !self.users.verify_password(&user, password).await? {
            return Err(SessionError::BadPassword);
        }
        if !user.is_active() {
            return Err(SessionError::Blocked);
        }

        let pair = self.issue_for(&user).await?;

        info!(user = %user.id, "user signed in");

        Ok(pair)
    }

    /// Forget the subject's refresh token. The access token may be expired.
    ///
    /// # Errors
    /// [`SessionError::InvalidToken`] if the token does not verify,
    /// [`SessionError::Store`] if the store cannot be reached.
    pub async fn sign_out(&self, access_token: &str) -> Result<(), SessionError> {
        let claims = self.codec.decode_access(access_token).map_err(|err| {
            debug!("sign out with bad token: {err}");
            SessionError::InvalidToken
        })?;

        self.store.delete(claims.subject).await?;

        info!(user = %claims.subject, "user signed out");

        Ok(())
    }

    /// Trade a refresh token for a new pair.
    ///
    /// The access token only identifies the subject, so it may be expired. The
    /// refresh token must belong to the same subject, be unexpired at the
    /// current second and still be the one on record.
    ///
    /// # Errors
    /// [`SessionError::InvalidToken`], [`SessionError::RefreshExpired`] or
    /// [`SessionError::StaleRefresh`] when the tokens do not qualify.
    pub async fn renew(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<TokenPair, SessionError> {
        let now = self.clock.now();

        let access = self.codec.decode_access(access_token).map_err(|err| {
            debug!("renew with bad access token: {err}");
            SessionError::InvalidToken
        })?;
        let refresh = self.codec.decode_refresh(refresh_token).map_err(|err| {
            debug!("renew with bad refresh token: {err}");
            SessionError::InvalidToken
        })?;

        if refresh.subject != access.subject {
            debug!(access = %access.subject, refresh = %refresh.subject, "token subjects differ");
            return Err(SessionError::InvalidToken);
        }
        if refresh.is_expired(now) {
            return Err(SessionError::RefreshExpired);
        }

        let stored = self.store.get(access.subject).await?;
        if stored.as_deref() != Some(refresh_token) {
            return Err(SessionError::StaleRefresh);
        }

        let user = self
            .users
            .find_by_id(access.subject)
            .await?
            .ok_or(SessionError::UserNotFound)?;
        if !user.is_active() {
            return Err(SessionError::Blocked);
        }

        let pair = self.issue_for(&user).await?;

        debug!(user = %user.id, "tokens renewed");

        Ok(pair)
    }

    async fn issue_for(&self, user: &User) -> Result<TokenPair, SessionError> {
        let credentials = credentials_for_role(&user.user_role)?;
        let pair = self
            .codec
            .issue(user.id, &credentials, self.clock.now())
            .map_err(SessionError::Token)?;

        let expires_at = self
            .codec
            .decode_refresh_expiry(&pair.refresh)
            .map_err(SessionError::Token)?;
        self.store.put(user.id, &pair.refresh, expires_at).await?;

        Ok(pair)
    }
}
