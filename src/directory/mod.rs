//! User accounts: lookup for sign-in and renewal, creation for sign-up.

mod memory;
mod postgres;

pub use self::memory::MemoryUserDirectory;
pub use self::postgres::PgUserDirectory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::{credentials::Role, password};

pub const USER_STATUS_BLOCKED: i32 = 0;
pub const USER_STATUS_ACTIVE: i32 = 1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub email: String,
    pub password_hash: String,
    pub user_status: i32,
    /// Stored as text; resolved against the role registry on every issuance.
    pub user_role: String,
}

impl User {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.user_status == USER_STATUS_ACTIVE
    }
}

#[derive(Debug)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub user_role: Role,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("email already registered")]
    Conflict,
    #[error("user directory unavailable: {0}")]
    Database(#[from] sqlx::Error),
    #[error("password verification task failed: {0}")]
    Task(String),
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Emails are matched exactly; callers normalize first.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, Error>;

    /// # Errors
    /// Returns [`Error::Conflict`] if the email is taken.
    async fn create(&self, user: NewUser) -> Result<User, Error>;

    async fn ping(&self) -> Result<(), Error>;

    /// Compare `password` with the stored hash off the async runtime.
    async fn verify_password(&self, user: &User, password: &str) -> Result<bool, Error> {
        let hash = user.password_hash.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || password::verify_password(&password, &hash))
            .await
            .map_err(|err| Error::Task(err.to_string()))
    }
}
