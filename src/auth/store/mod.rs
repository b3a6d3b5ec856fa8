//! Server-side record of the one refresh token each subject may renew with.
//!
//! Writes overwrite, so issuing a new pair silently invalidates the previous
//! refresh token. Entries lapse once the token's own `exp` second has passed,
//! so abandoned sessions disappear without a sweeper.

mod memory;
mod redis;

pub use self::memory::MemoryRefreshStore;
pub use self::redis::RedisRefreshStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
    #[error("refresh store unavailable: {0}")]
    Redis(#[from] ::redis::RedisError),
}

#[async_trait]
pub trait RefreshStore: Send + Sync {
    /// Store `token` as the only valid refresh token of `subject`, readable up
    /// to and including the Unix second `expires_at`.
    async fn put(&self, subject: Uuid, token: &str, expires_at: i64) -> Result<(), Error>;

    async fn get(&self, subject: Uuid) -> Result<Option<String>, Error>;

    /// Remove the entry; absent entries are not an error.
    async fn delete(&self, subject: Uuid) -> Result<(), Error>;

    async fn ping(&self) -> Result<(), Error>;
}
